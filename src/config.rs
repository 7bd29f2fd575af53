//! config.rs — fit configuration.
//!
//! Optional TOML file overriding the solver binary location, the data
//! directory and the electroweak (S, T, U) reference values. A missing file
//! yields the defaults; a malformed file warns and yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::stu::StuReference;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Path of the external `CalcPhys` binary.
    #[serde(default = "SolverConfig::default_bin")]
    pub bin: PathBuf,
}

impl SolverConfig {
    fn default_bin() -> PathBuf {
        PathBuf::from("CalcPhys")
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            bin: Self::default_bin(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FitConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default = "FitConfig::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub stu: StuReference,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            data_dir: Self::default_data_dir(),
            stu: StuReference::default(),
        }
    }
}

impl FitConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data")
    }

    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if !path_obj.exists() {
            return Self::default();
        }
        match fs::read_to_string(path_obj) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("failed to parse config {path}: {err}; using defaults");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read config {path}: {err}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "higgsfit_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = FitConfig::load_or_default("/nonexistent/higgsfit.toml");
        assert_eq!(cfg.solver.bin, PathBuf::from("CalcPhys"));
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert!((cfg.stu.s_cen - 0.06).abs() < 1e-12);
        assert!((cfg.stu.rho_tu + 0.85).abs() < 1e-12);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let path = unique_path("partial.toml");
        fs::write(
            &path,
            "[solver]\nbin = \"/opt/2hdmc/CalcPhys\"\n\n[stu]\ns_cen = 0.05\n",
        )
        .unwrap();
        let cfg = FitConfig::load_or_default(path.to_str().unwrap());
        assert_eq!(cfg.solver.bin, PathBuf::from("/opt/2hdmc/CalcPhys"));
        assert!((cfg.stu.s_cen - 0.05).abs() < 1e-12);
        // Untouched fields fall back to the defaults.
        assert!((cfg.stu.t_sig - 0.12).abs() < 1e-12);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = unique_path("broken.toml");
        fs::write(&path, "this is not toml [").unwrap();
        let cfg = FitConfig::load_or_default(path.to_str().unwrap());
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        let _ = fs::remove_file(&path);
    }
}
