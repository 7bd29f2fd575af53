//! stu.rs — electroweak oblique-parameter chi-square.
//!
//! chi2 = (X - X0)^T C^-1 (X - X0) for X = (S, T, U), with the covariance
//! built from per-parameter sigmas and a fixed correlation matrix. Reference
//! values default to the 2022 global electroweak fit.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Central values, sigmas and correlations of the (S, T, U) fit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StuReference {
    #[serde(default = "StuReference::default_s_cen")]
    pub s_cen: f64,
    #[serde(default = "StuReference::default_s_sig")]
    pub s_sig: f64,
    #[serde(default = "StuReference::default_t_cen")]
    pub t_cen: f64,
    #[serde(default = "StuReference::default_t_sig")]
    pub t_sig: f64,
    #[serde(default = "StuReference::default_u_cen")]
    pub u_cen: f64,
    #[serde(default = "StuReference::default_u_sig")]
    pub u_sig: f64,
    #[serde(default = "StuReference::default_rho_st")]
    pub rho_st: f64,
    #[serde(default = "StuReference::default_rho_su")]
    pub rho_su: f64,
    #[serde(default = "StuReference::default_rho_tu")]
    pub rho_tu: f64,
}

impl StuReference {
    fn default_s_cen() -> f64 {
        0.06
    }
    fn default_s_sig() -> f64 {
        0.10
    }
    fn default_t_cen() -> f64 {
        0.11
    }
    fn default_t_sig() -> f64 {
        0.12
    }
    fn default_u_cen() -> f64 {
        0.14
    }
    fn default_u_sig() -> f64 {
        0.09
    }
    fn default_rho_st() -> f64 {
        0.90
    }
    fn default_rho_su() -> f64 {
        -0.59
    }
    fn default_rho_tu() -> f64 {
        -0.85
    }
}

impl Default for StuReference {
    fn default() -> Self {
        Self {
            s_cen: Self::default_s_cen(),
            s_sig: Self::default_s_sig(),
            t_cen: Self::default_t_cen(),
            t_sig: Self::default_t_sig(),
            u_cen: Self::default_u_cen(),
            u_sig: Self::default_u_sig(),
            rho_st: Self::default_rho_st(),
            rho_su: Self::default_rho_su(),
            rho_tu: Self::default_rho_tu(),
        }
    }
}

/// Precomputed chi-square form; build once, evaluate per grid point.
#[derive(Clone, Debug)]
pub struct StuChi2 {
    center: Vector3<f64>,
    inv_cov: Matrix3<f64>,
}

impl StuChi2 {
    pub fn new(reference: &StuReference) -> Result<Self> {
        let sig = Matrix3::from_diagonal(&Vector3::new(
            reference.s_sig,
            reference.t_sig,
            reference.u_sig,
        ));
        let corr = Matrix3::new(
            1.0,
            reference.rho_st,
            reference.rho_su,
            reference.rho_st,
            1.0,
            reference.rho_tu,
            reference.rho_su,
            reference.rho_tu,
            1.0,
        );
        let cov = sig * corr * sig;
        let inv_cov = cov.try_inverse().ok_or(FitError::SingularCovariance)?;
        Ok(Self {
            center: Vector3::new(reference.s_cen, reference.t_cen, reference.u_cen),
            inv_cov,
        })
    }

    /// chi2 of a predicted (S, T, U) point.
    pub fn chi2(&self, s: f64, t: f64, u: f64) -> f64 {
        let d = Vector3::new(s, t, u) - self.center;
        (self.inv_cov * d).dot(&d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chi2_vanishes_at_center() {
        let form = StuChi2::new(&StuReference::default()).unwrap();
        let c = StuReference::default();
        assert!(form.chi2(c.s_cen, c.t_cen, c.u_cen).abs() < 1e-12);
    }

    #[test]
    fn uncorrelated_reference_reduces_to_pull_sum() {
        let reference = StuReference {
            rho_st: 0.0,
            rho_su: 0.0,
            rho_tu: 0.0,
            ..StuReference::default()
        };
        let form = StuChi2::new(&reference).unwrap();
        let got = form.chi2(reference.s_cen + reference.s_sig, reference.t_cen, reference.u_cen);
        assert!((got - 1.0).abs() < 1e-9, "one-sigma S pull should give chi2 = 1, got {got}");
    }

    #[test]
    fn perfect_correlation_is_rejected() {
        let reference = StuReference {
            rho_st: 1.0,
            rho_su: 0.0,
            rho_tu: 0.0,
            ..StuReference::default()
        };
        assert!(StuChi2::new(&reference).is_err());
    }

    #[test]
    fn correlations_matter() {
        let corr = StuChi2::new(&StuReference::default()).unwrap();
        let reference = StuReference {
            rho_st: 0.0,
            rho_su: 0.0,
            rho_tu: 0.0,
            ..StuReference::default()
        };
        let diag = StuChi2::new(&reference).unwrap();
        let (s, t, u) = (0.2, -0.1, 0.1);
        assert!((corr.chi2(s, t, u) - diag.chi2(s, t, u)).abs() > 1e-6);
    }
}
