//! likelihood — the experimental likelihood engine.
//!
//! Loads an experiment list once, then evaluates -2logL for XML coupling
//! payloads. The list file names one measurement TOML file per line,
//! relative to the list's own directory; `#` comments and blank lines are
//! allowed.

pub mod measurement;
pub mod userinput;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FitError, Result};
use measurement::{Measurement, MeasurementFile};
use userinput::parse_user_input;

/// SM-prediction uncertainties attached to multivariate measurements.
#[derive(Debug, Deserialize)]
struct SmPredFile {
    /// Relative uncertainty per bin, in signal-strength units.
    sigma: Vec<f64>,
}

/// Bin-correlation matrix attached to multivariate measurements.
#[derive(Debug, Deserialize)]
struct SmCorrFile {
    matrix: Vec<Vec<f64>>,
}

/// The likelihood calculator: owns the loaded dataset.
#[derive(Debug)]
pub struct LikelihoodCalc {
    measurements: Vec<Measurement>,
}

impl LikelihoodCalc {
    /// Load an experiment list and every measurement file it names.
    pub fn read_exp_input(list_path: impl AsRef<Path>) -> Result<Self> {
        let list_path = list_path.as_ref();
        let text =
            fs::read_to_string(list_path).map_err(|e| FitError::io(list_path, e))?;
        let base = list_path.parent().unwrap_or_else(|| Path::new("."));

        let mut measurements = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let path = base.join(line);
            let file = load_measurement_file(&path)?;
            if file.measurement.is_empty() {
                return Err(FitError::List {
                    path: list_path.to_path_buf(),
                    reason: format!("line {}: {line:?} contains no measurements", lineno + 1),
                });
            }
            for raw in &file.measurement {
                measurements.push(raw.compile(&path)?);
            }
        }
        if measurements.is_empty() {
            return Err(FitError::List {
                path: list_path.to_path_buf(),
                reason: "empty experiment list".into(),
            });
        }
        debug!(n = measurements.len(), list = %list_path.display(), "experiment list loaded");
        Ok(Self { measurements })
    }

    /// Attach SM-prediction uncertainties to the multivariate measurements.
    pub fn read_sm_pred(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| FitError::io(path, e))?;
        let pred: SmPredFile = toml::from_str(&text).map_err(|e| FitError::Measurement {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.for_each_multivariate(path, |bins, sm_sigma, _| {
            if pred.sigma.len() != bins {
                return Err(format!(
                    "SM prediction has {} entries for {bins} bins",
                    pred.sigma.len()
                ));
            }
            *sm_sigma = Some(pred.sigma.clone());
            Ok(())
        })
    }

    /// Attach an SM bin-correlation matrix to the multivariate measurements.
    pub fn read_sm_corr(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| FitError::io(path, e))?;
        let corr: SmCorrFile = toml::from_str(&text).map_err(|e| FitError::Measurement {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.for_each_multivariate(path, |bins, _, sm_correlation| {
            if corr.matrix.len() != bins || corr.matrix.iter().any(|r| r.len() != bins) {
                return Err(format!("SM correlation matrix is not {bins}x{bins}"));
            }
            let flat: Vec<f64> = corr.matrix.iter().flatten().copied().collect();
            *sm_correlation = Some(nalgebra::DMatrix::from_row_slice(bins, bins, &flat));
            Ok(())
        })
    }

    fn for_each_multivariate<F>(&mut self, path: &Path, mut apply: F) -> Result<()>
    where
        F: FnMut(
            usize,
            &mut Option<Vec<f64>>,
            &mut Option<nalgebra::DMatrix<f64>>,
        ) -> std::result::Result<(), String>,
    {
        let mut touched = 0;
        for m in &mut self.measurements {
            if let Measurement::Multivariate {
                bins,
                sm_sigma,
                sm_correlation,
                ..
            } = m
            {
                apply(bins.len(), sm_sigma, sm_correlation).map_err(|reason| FitError::Data {
                    path: path.to_path_buf(),
                    reason,
                })?;
                touched += 1;
            }
        }
        if touched == 0 {
            return Err(FitError::Data {
                path: path.to_path_buf(),
                reason: "dataset has no multivariate measurement to attach to".into(),
            });
        }
        Ok(())
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Evaluate -2logL for an XML coupling payload.
    pub fn compute(&self, user_input: &str) -> Result<f64> {
        let eff = parse_user_input(user_input)?;
        let mut total = 0.0;
        for m in &self.measurements {
            total += m.m2logl(&eff)?;
        }
        Ok(total)
    }
}

fn load_measurement_file(path: &Path) -> Result<MeasurementFile> {
    let text = fs::read_to_string(path).map_err(|e| FitError::io(path, e))?;
    toml::from_str(&text).map_err(|e| FitError::Measurement {
        path: path.to_path_buf(),
        source: e,
    })
}
