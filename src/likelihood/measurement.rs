//! likelihood/measurement.rs — experimental signal-strength measurements.
//!
//! Measurements are read from TOML files named by an experiment list. Three
//! kinds are supported, mirroring the normal-approximation taxonomy of the
//! published likelihoods:
//!
//! - `normal1d`: one signal strength with asymmetric errors (the variable-
//!   Gaussian approximation);
//! - `normal2d`: a correlated pair, e.g. mu(ggH+ttH) vs mu(VBF+VH);
//! - `multivariate`: N STXS bins with a covariance built from experimental
//!   errors, a bin-correlation matrix, and optional SM-prediction errors.

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::path::Path;

use crate::error::{FitError, Result};
use crate::likelihood::userinput::EffectiveCouplings;
use crate::sm::{self, DecayMode};

/// Production modes with distinct coupling scalings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProdMode {
    Ggh,
    Vbf,
    Wh,
    Zh,
    Tth,
}

impl ProdMode {
    pub fn parse(name: &str) -> Option<ProdMode> {
        Some(match name {
            "ggh" => ProdMode::Ggh,
            "vbf" => ProdMode::Vbf,
            "wh" => ProdMode::Wh,
            "zh" => ProdMode::Zh,
            "tth" => ProdMode::Tth,
            _ => return None,
        })
    }

    /// Cross-section scale factor at the given coupling point.
    pub fn scale(self, eff: &EffectiveCouplings) -> f64 {
        match self {
            ProdMode::Ggh => eff.cglue * eff.cglue,
            // VBF mixes W and Z fusion roughly 74:26 at 13 TeV.
            ProdMode::Vbf => 0.74 * eff.cw * eff.cw + 0.26 * eff.cz * eff.cz,
            ProdMode::Wh => eff.cw * eff.cw,
            ProdMode::Zh => eff.cz * eff.cz,
            ProdMode::Tth => eff.cu * eff.cu,
        }
    }
}

/// Partial-width scale factor of a decay channel.
fn decay_scale(mode: DecayMode, eff: &EffectiveCouplings) -> f64 {
    match mode {
        DecayMode::BB | DecayMode::SS => eff.cd * eff.cd,
        DecayMode::WW => eff.cw * eff.cw,
        DecayMode::GG => eff.cglue * eff.cglue,
        DecayMode::TauTau | DecayMode::MuMu => eff.cl * eff.cl,
        DecayMode::CC => eff.cu * eff.cu,
        DecayMode::ZZ => eff.cz * eff.cz,
        DecayMode::GamGam => eff.cgamma * eff.cgamma,
        DecayMode::ZGam => eff.czgamma * eff.czgamma,
    }
}

/// Total-width rescale: sum of BR-weighted partial widths over the extra-BR
/// depletion factor.
pub fn width_ratio(eff: &EffectiveCouplings) -> f64 {
    let scaled: f64 = sm::width_weights()
        .iter()
        .map(|&(mode, w)| w * decay_scale(mode, eff))
        .sum();
    scaled / (1.0 - eff.br_invisible - eff.br_undetected)
}

/// One observed signal-strength axis: a weighted mix of production channels
/// decaying to a fixed final state.
#[derive(Clone, Debug)]
pub struct Axis {
    pub channels: Vec<(ProdMode, f64)>,
    pub mu: f64,
    pub sigma_p: f64,
    pub sigma_m: f64,
}

impl Axis {
    /// Predicted signal strength at the coupling point.
    pub fn predict(&self, decay: DecayMode, eff: &EffectiveCouplings) -> f64 {
        let wr = width_ratio(eff);
        let dec = decay_scale(decay, eff);
        self.channels
            .iter()
            .map(|&(prod, w)| w * prod.scale(eff) * dec / wr)
            .sum()
    }

    /// Variable-Gaussian sigma at the predicted value.
    ///
    /// sigma(x) = sigma_sym + sigma_var * (x - mu_hat) with
    /// sigma_sym = 2 s+ s- / (s+ + s-), sigma_var = (s+ - s-) / (s+ + s-).
    pub fn sigma_at(&self, x: f64) -> f64 {
        let sum = self.sigma_p + self.sigma_m;
        let sigma_sym = 2.0 * self.sigma_p * self.sigma_m / sum;
        let sigma_var = (self.sigma_p - self.sigma_m) / sum;
        (sigma_sym + sigma_var * (x - self.mu)).max(1e-6)
    }
}

/// One labeled STXS bin of a multivariate measurement.
#[derive(Clone, Debug)]
pub struct StxsBin {
    pub label: String,
    pub decay: DecayMode,
    pub axis: Axis,
}

/// One measurement contributing to -2logL.
#[derive(Clone, Debug)]
pub enum Measurement {
    Normal1d {
        id: String,
        decay: DecayMode,
        axis: Axis,
    },
    Normal2d {
        id: String,
        decay: DecayMode,
        x: Axis,
        y: Axis,
        rho: f64,
    },
    Multivariate {
        id: String,
        bins: Vec<StxsBin>,
        /// Experimental bin-correlation matrix (identity until provided).
        correlation: DMatrix<f64>,
        /// Relative SM-prediction uncertainties per bin, when loaded.
        sm_sigma: Option<Vec<f64>>,
        /// SM-prediction correlation matrix, when loaded.
        sm_correlation: Option<DMatrix<f64>>,
    },
}

impl Measurement {
    pub fn id(&self) -> &str {
        match self {
            Measurement::Normal1d { id, .. }
            | Measurement::Normal2d { id, .. }
            | Measurement::Multivariate { id, .. } => id,
        }
    }

    /// -2logL contribution of this measurement at the coupling point.
    pub fn m2logl(&self, eff: &EffectiveCouplings) -> Result<f64> {
        match self {
            Measurement::Normal1d { decay, axis, .. } => {
                let x = axis.predict(*decay, eff);
                let pull = (x - axis.mu) / axis.sigma_at(x);
                Ok(pull * pull)
            }
            Measurement::Normal2d { decay, x, y, rho, .. } => {
                let px = x.predict(*decay, eff);
                let py = y.predict(*decay, eff);
                let dx = (px - x.mu) / x.sigma_at(px);
                let dy = (py - y.mu) / y.sigma_at(py);
                Ok((dx * dx + dy * dy - 2.0 * rho * dx * dy) / (1.0 - rho * rho))
            }
            Measurement::Multivariate {
                bins,
                correlation,
                sm_sigma,
                sm_correlation,
                ..
            } => {
                let n = bins.len();
                let mut delta = DVector::zeros(n);
                let mut sigma = DVector::zeros(n);
                for (i, bin) in bins.iter().enumerate() {
                    let p = bin.axis.predict(bin.decay, eff);
                    delta[i] = p - bin.axis.mu;
                    sigma[i] = 0.5 * (bin.axis.sigma_p + bin.axis.sigma_m);
                }
                let mut cov = DMatrix::zeros(n, n);
                for i in 0..n {
                    for j in 0..n {
                        cov[(i, j)] = sigma[i] * correlation[(i, j)] * sigma[j];
                    }
                }
                if let Some(sm_sigma) = sm_sigma {
                    for i in 0..n {
                        for j in 0..n {
                            let r = sm_correlation
                                .as_ref()
                                .map(|m| m[(i, j)])
                                .unwrap_or(if i == j { 1.0 } else { 0.0 });
                            cov[(i, j)] += sm_sigma[i] * r * sm_sigma[j];
                        }
                    }
                }
                let inv = cov.try_inverse().ok_or(FitError::SingularCovariance)?;
                Ok((inv * &delta).dot(&delta))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TOML schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MeasurementFile {
    #[serde(default)]
    pub measurement: Vec<RawMeasurement>,
}

#[derive(Debug, Deserialize)]
pub struct RawAxis {
    pub channels: Vec<(String, f64)>,
    pub mu: f64,
    pub sigma_p: f64,
    pub sigma_m: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawBin {
    pub label: String,
    pub decay: String,
    pub channels: Vec<(String, f64)>,
    pub mu: f64,
    pub sigma_p: f64,
    pub sigma_m: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum RawMeasurement {
    #[serde(rename = "normal1d")]
    Normal1d {
        id: String,
        decay: String,
        channels: Vec<(String, f64)>,
        mu: f64,
        sigma_p: f64,
        sigma_m: f64,
    },
    #[serde(rename = "normal2d")]
    Normal2d {
        id: String,
        decay: String,
        x: RawAxis,
        y: RawAxis,
        rho: f64,
    },
    #[serde(rename = "multivariate")]
    Multivariate {
        id: String,
        bins: Vec<RawBin>,
        #[serde(default)]
        correlation: Option<Vec<Vec<f64>>>,
    },
}

fn bad_data(path: &Path, reason: impl Into<String>) -> FitError {
    FitError::Data {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn compile_channels(path: &Path, raw: &[(String, f64)]) -> Result<Vec<(ProdMode, f64)>> {
    if raw.is_empty() {
        return Err(bad_data(path, "measurement with no production channels"));
    }
    let mut channels = Vec::with_capacity(raw.len());
    let mut total = 0.0;
    for (name, w) in raw {
        let prod = ProdMode::parse(name)
            .ok_or_else(|| bad_data(path, format!("unknown production mode {name:?}")))?;
        if *w < 0.0 {
            return Err(bad_data(path, format!("negative channel weight for {name:?}")));
        }
        total += w;
        channels.push((prod, *w));
    }
    if total <= 0.0 {
        return Err(bad_data(path, "channel weights sum to zero"));
    }
    for (_, w) in &mut channels {
        *w /= total;
    }
    Ok(channels)
}

fn compile_decay(path: &Path, name: &str) -> Result<DecayMode> {
    DecayMode::parse(name).ok_or_else(|| bad_data(path, format!("unknown decay channel {name:?}")))
}

fn compile_axis(path: &Path, raw: &RawAxis) -> Result<Axis> {
    check_sigmas(path, raw.sigma_p, raw.sigma_m)?;
    Ok(Axis {
        channels: compile_channels(path, &raw.channels)?,
        mu: raw.mu,
        sigma_p: raw.sigma_p,
        sigma_m: raw.sigma_m,
    })
}

fn check_sigmas(path: &Path, sigma_p: f64, sigma_m: f64) -> Result<()> {
    if sigma_p <= 0.0 || sigma_m <= 0.0 {
        return Err(bad_data(path, "measurement errors must be positive"));
    }
    Ok(())
}

fn compile_correlation(path: &Path, n: usize, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    if rows.len() != n || rows.iter().any(|r| r.len() != n) {
        return Err(bad_data(path, format!("correlation matrix is not {n}x{n}")));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(n, n, &flat))
}

impl RawMeasurement {
    /// Resolve names and normalize weights into a ready measurement.
    pub fn compile(&self, path: &Path) -> Result<Measurement> {
        match self {
            RawMeasurement::Normal1d {
                id,
                decay,
                channels,
                mu,
                sigma_p,
                sigma_m,
            } => {
                check_sigmas(path, *sigma_p, *sigma_m)?;
                Ok(Measurement::Normal1d {
                    id: id.clone(),
                    decay: compile_decay(path, decay)?,
                    axis: Axis {
                        channels: compile_channels(path, channels)?,
                        mu: *mu,
                        sigma_p: *sigma_p,
                        sigma_m: *sigma_m,
                    },
                })
            }
            RawMeasurement::Normal2d { id, decay, x, y, rho } => {
                if rho.abs() >= 1.0 {
                    return Err(bad_data(path, format!("|rho| must be < 1, got {rho}")));
                }
                Ok(Measurement::Normal2d {
                    id: id.clone(),
                    decay: compile_decay(path, decay)?,
                    x: compile_axis(path, x)?,
                    y: compile_axis(path, y)?,
                    rho: *rho,
                })
            }
            RawMeasurement::Multivariate { id, bins, correlation } => {
                if bins.is_empty() {
                    return Err(bad_data(path, "multivariate measurement with no bins"));
                }
                let mut compiled = Vec::with_capacity(bins.len());
                for bin in bins {
                    check_sigmas(path, bin.sigma_p, bin.sigma_m)?;
                    compiled.push(StxsBin {
                        label: bin.label.clone(),
                        decay: compile_decay(path, &bin.decay)?,
                        axis: Axis {
                            channels: compile_channels(path, &bin.channels)?,
                            mu: bin.mu,
                            sigma_p: bin.sigma_p,
                            sigma_m: bin.sigma_m,
                        },
                    });
                }
                let n = compiled.len();
                let correlation = match correlation {
                    Some(rows) => compile_correlation(path, n, rows)?,
                    None => DMatrix::identity(n, n),
                };
                Ok(Measurement::Multivariate {
                    id: id.clone(),
                    bins: compiled,
                    correlation,
                    sm_sigma: None,
                    sm_correlation: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::couplings::ReducedCouplings;
    use crate::likelihood::userinput::parse_user_input;

    fn sm_point() -> EffectiveCouplings {
        let xml = ReducedCouplings::universal(125.09, 1.0, 1.0).user_input_per_channel();
        parse_user_input(&xml).unwrap()
    }

    #[test]
    fn sm_point_predicts_unit_mu() {
        let eff = sm_point();
        let axis = Axis {
            channels: vec![(ProdMode::Ggh, 0.6), (ProdMode::Vbf, 0.4)],
            mu: 1.0,
            sigma_p: 0.1,
            sigma_m: 0.1,
        };
        assert!((axis.predict(DecayMode::GamGam, &eff) - 1.0).abs() < 1e-9);
        assert!((width_ratio(&eff) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric_errors_give_plain_gaussian() {
        let axis = Axis {
            channels: vec![(ProdMode::Ggh, 1.0)],
            mu: 1.0,
            sigma_p: 0.2,
            sigma_m: 0.2,
        };
        assert!((axis.sigma_at(0.5) - 0.2).abs() < 1e-12);
        assert!((axis.sigma_at(1.5) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn asymmetric_errors_widen_toward_the_long_side() {
        let axis = Axis {
            channels: vec![(ProdMode::Ggh, 1.0)],
            mu: 1.0,
            sigma_p: 0.3,
            sigma_m: 0.1,
        };
        assert!(axis.sigma_at(1.4) > axis.sigma_at(1.0));
        assert!(axis.sigma_at(0.6) < axis.sigma_at(1.0));
    }

    #[test]
    fn channel_weights_are_normalized() {
        let path = Path::new("inline");
        let channels =
            compile_channels(path, &[("ggh".into(), 3.0), ("tth".into(), 1.0)]).unwrap();
        let total: f64 = channels.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((channels[0].1 - 0.75).abs() < 1e-12);
    }

    #[test]
    fn correlation_changes_the_2d_chi2() {
        let eff = sm_point();
        let mk = |rho: f64| Measurement::Normal2d {
            id: "t".into(),
            decay: DecayMode::ZZ,
            x: Axis {
                channels: vec![(ProdMode::Ggh, 1.0)],
                mu: 1.2,
                sigma_p: 0.1,
                sigma_m: 0.1,
            },
            y: Axis {
                channels: vec![(ProdMode::Vbf, 1.0)],
                mu: 0.8,
                sigma_p: 0.1,
                sigma_m: 0.1,
            },
            rho,
        };
        let uncorr = mk(0.0).m2logl(&eff).unwrap();
        let corr = mk(0.5).m2logl(&eff).unwrap();
        // Opposite-sign pulls with positive correlation are more significant.
        assert!(corr > uncorr, "corr = {corr}, uncorr = {uncorr}");
    }

    #[test]
    fn multivariate_identity_matches_sum_of_pulls() {
        let eff = sm_point();
        let bins = vec![
            StxsBin {
                label: "zz-ggh".into(),
                decay: DecayMode::ZZ,
                axis: Axis {
                    channels: vec![(ProdMode::Ggh, 1.0)],
                    mu: 1.1,
                    sigma_p: 0.2,
                    sigma_m: 0.2,
                },
            },
            StxsBin {
                label: "gamgam-vbf".into(),
                decay: DecayMode::GamGam,
                axis: Axis {
                    channels: vec![(ProdMode::Vbf, 1.0)],
                    mu: 0.9,
                    sigma_p: 0.1,
                    sigma_m: 0.1,
                },
            },
        ];
        let m = Measurement::Multivariate {
            id: "t".into(),
            bins,
            correlation: DMatrix::identity(2, 2),
            sm_sigma: None,
            sm_correlation: None,
        };
        let expected = (0.1f64 / 0.2).powi(2) + (0.1f64 / 0.1).powi(2);
        let got = m.m2logl(&eff).unwrap();
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }
}
