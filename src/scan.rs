//! scan.rs — parameter grids, result tables and slice-parallel execution.
//!
//! Result tables keep the columnar text shape the plotting side re-reads:
//! whitespace-separated fixed-precision values, `nan` for excluded points,
//! and a blank line between outer-axis row groups.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread;

use crossbeam_channel::unbounded;
use tracing::debug;

use crate::error::{FitError, Result};

/// Inclusive linear grid axis.
#[derive(Clone, Debug)]
pub struct GridAxis {
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl GridAxis {
    pub fn new(min: f64, max: f64, n: usize) -> Self {
        assert!(n >= 2, "a grid axis needs at least two points");
        assert!(max > min, "empty axis range");
        Self { min, max, n }
    }

    /// Grid values with inclusive endpoints.
    pub fn values(&self) -> Vec<f64> {
        let step = (self.max - self.min) / (self.n - 1) as f64;
        (0..self.n).map(|i| self.min + i as f64 * step).collect()
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Running best-fit tracker.
#[derive(Clone, Debug)]
pub struct BestFit {
    pub m2logl: f64,
    pub params: Vec<f64>,
}

impl BestFit {
    pub fn new() -> Self {
        Self {
            m2logl: f64::INFINITY,
            params: Vec::new(),
        }
    }

    /// Keep the point if it improves the minimum.
    pub fn offer(&mut self, m2logl: f64, params: &[f64]) -> bool {
        if m2logl < self.m2logl {
            self.m2logl = m2logl;
            self.params = params.to_vec();
            true
        } else {
            false
        }
    }

    pub fn found(&self) -> bool {
        self.m2logl.is_finite()
    }
}

impl Default for BestFit {
    fn default() -> Self {
        Self::new()
    }
}

/// Columnar result-table writer.
pub struct TableWriter {
    out: BufWriter<File>,
    path: std::path::PathBuf,
    decimals: usize,
}

impl TableWriter {
    /// Create the file (and parent directories) with `decimals` digits per value.
    pub fn create(path: impl AsRef<Path>, decimals: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| FitError::io(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| FitError::io(path, e))?;
        Ok(Self {
            out: BufWriter::new(file),
            path: path.to_path_buf(),
            decimals,
        })
    }

    fn io_err(&self, e: std::io::Error) -> FitError {
        FitError::io(self.path.clone(), e)
    }

    /// Write one row; non-finite values are written as `nan`.
    pub fn row(&mut self, values: &[f64]) -> Result<()> {
        for v in values {
            if v.is_finite() {
                write!(self.out, "{:.*}    ", self.decimals, v).map_err(|e| self.io_err(e))?;
            } else {
                write!(self.out, "nan    ").map_err(|e| self.io_err(e))?;
            }
        }
        writeln!(self.out).map_err(|e| self.io_err(e))
    }

    /// Blank separator between outer-axis row groups.
    pub fn blank_line(&mut self) -> Result<()> {
        writeln!(self.out).map_err(|e| self.io_err(e))
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush().map_err(|e| self.io_err(e))
    }
}

/// Read a columnar table back, skipping blank lines; `nan` parses to NaN.
pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| FitError::io(path, e))?;
    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut row = Vec::new();
        for tok in line.split_whitespace() {
            let v = if tok.eq_ignore_ascii_case("nan") {
                f64::NAN
            } else {
                tok.parse::<f64>().map_err(|_| FitError::List {
                    path: path.to_path_buf(),
                    reason: format!("line {}: bad value {tok:?}", lineno + 1),
                })?
            };
            row.push(v);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Concatenate per-slice tables into one file, in slice order.
pub fn merge_tables(slices: &[impl AsRef<Path>], out: impl AsRef<Path>) -> Result<()> {
    let out = out.as_ref();
    let mut merged = String::new();
    for slice in slices {
        let slice = slice.as_ref();
        let text = fs::read_to_string(slice).map_err(|e| FitError::io(slice, e))?;
        merged.push_str(&text);
        merged.push('\n');
    }
    fs::write(out, merged).map_err(|e| FitError::io(out, e))
}

/// Run `job` for every index in `0..n_jobs` on `workers` threads.
///
/// Jobs are pulled from a shared queue; each job writes its own artifacts, so
/// nothing is returned. The first job error is reported after all workers
/// drain.
pub fn run_slices<F>(n_jobs: usize, workers: usize, job: F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let workers = workers.max(1).min(n_jobs.max(1));
    let (tx, rx) = unbounded::<usize>();
    for i in 0..n_jobs {
        // The channel stays open until all jobs are queued; unbounded sends
        // cannot fail here.
        let _ = tx.send(i);
    }
    drop(tx);

    let (err_tx, err_rx) = unbounded::<FitError>();
    thread::scope(|scope| {
        for w in 0..workers {
            let rx = rx.clone();
            let err_tx = err_tx.clone();
            let job = &job;
            scope.spawn(move || {
                while let Ok(i) = rx.recv() {
                    if let Err(e) = job(i) {
                        let _ = err_tx.send(e);
                    }
                }
                debug!(worker = w, "slice worker drained");
            });
        }
    });
    drop(err_tx);

    match err_rx.try_recv() {
        Ok(e) => Err(e),
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "higgsfit_scan_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn grid_axis_hits_both_endpoints() {
        let axis = GridAxis::new(0.85, 1.2, 100);
        let v = axis.values();
        assert_eq!(v.len(), 100);
        assert!((v[0] - 0.85).abs() < 1e-12);
        assert!((v[99] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn table_round_trips_with_nan_and_blank_lines() {
        let path = unique_path("table.out");
        let mut w = TableWriter::create(&path, 5).unwrap();
        w.row(&[1.0, 2.5, 3.25]).unwrap();
        w.blank_line().unwrap();
        w.row(&[4.0, f64::NAN, 6.0]).unwrap();
        w.finish().unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![1.0, 2.5, 3.25]);
        assert!((rows[1][0] - 4.0).abs() < 1e-12);
        assert!(rows[1][1].is_nan());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn best_fit_tracks_the_minimum() {
        let mut best = BestFit::new();
        assert!(!best.found());
        assert!(best.offer(10.0, &[1.0]));
        assert!(!best.offer(12.0, &[2.0]));
        assert!(best.offer(3.0, &[4.0]));
        assert_eq!(best.params, vec![4.0]);
        assert!((best.m2logl - 3.0).abs() < 1e-12);
    }

    #[test]
    fn slices_all_run_and_merge_in_order() {
        let dir = unique_path("slices");
        std::fs::create_dir_all(&dir).unwrap();
        let count = AtomicUsize::new(0);
        let paths: Vec<_> = (0..6).map(|i| dir.join(format!("slice_{i}.out"))).collect();
        run_slices(6, 3, |i| {
            let mut w = TableWriter::create(&paths[i], 2)?;
            w.row(&[i as f64])?;
            w.finish()?;
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 6);

        let merged = dir.join("merged.out");
        merge_tables(&paths, &merged).unwrap();
        let rows = read_table(&merged).unwrap();
        let first: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        assert_eq!(first, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
