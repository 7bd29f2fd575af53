//! loopamp.rs — one-loop amplitudes for the loop-induced Higgs couplings.
//!
//! Scalar (A0), fermion (A1/2) and vector (A1) loop functions of
//! tau = (mh / 2m)^2, and the photon/gluon coupling scale factors built from
//! them. The tau > 1 branch of f(tau) is complex, hence `num_complex`.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::sm;

/// f(tau): asin^2(sqrt(tau)) below threshold, the complex log branch above.
pub fn ftau(tau: f64) -> Complex64 {
    if tau <= 1.0 {
        let a = tau.sqrt().asin();
        Complex64::new(a * a, 0.0)
    } else {
        let sq = tau.sqrt();
        let sqm1 = (tau - 1.0).sqrt();
        let log_arg = (sq + sqm1) / (sq - sqm1);
        let c = Complex64::new(log_arg.ln(), -PI);
        -(c * c) / 4.0
    }
}

/// Scalar loop amplitude (charged Higgs in h -> gamma gamma).
pub fn a0(tau: f64) -> Complex64 {
    -1.0 / tau * (Complex64::new(1.0, 0.0) - ftau(tau) / tau)
}

/// Spin-1/2 loop amplitude (quarks and leptons).
pub fn a12(tau: f64) -> Complex64 {
    2.0 / tau * (Complex64::new(1.0, 0.0) + (1.0 - 1.0 / tau) * ftau(tau))
}

/// Spin-1 loop amplitude (the W boson).
pub fn a1(tau: f64) -> Complex64 {
    let t = Complex64::new(tau, 0.0);
    -(3.0 * t + 2.0 * t * t + 3.0 * (2.0 * t - 1.0) * ftau(tau)) / (t * t)
}

fn tau_of(hmass: f64, m: f64) -> f64 {
    let x = hmass / (2.0 * m);
    x * x
}

/// h -> gamma gamma amplitude for given fermion/vector scale factors.
///
/// Top, charm, bottom loops weighted by Nc * Q^2, the tau lepton by Q^2, the
/// W by the vector coupling. `cd` covers the down-type fermions including the
/// tau, matching the Yukawa structure of the scans that use this amplitude.
pub fn gamgam_amplitude(hmass: f64, cv: f64, cu: f64, cd: f64) -> Complex64 {
    let a12t = a12(tau_of(hmass, sm::MT));
    let a12c = a12(tau_of(hmass, sm::MC));
    let a12b = a12(tau_of(hmass, sm::MB));
    let a12tau = a12(tau_of(hmass, sm::MTAU));
    let a1w = a1(tau_of(hmass, sm::MW));

    cu * 4.0 / 3.0 * (a12t + a12c) + cd * (1.0 / 3.0) * a12b + cd * a12tau + cv * a1w
}

/// Photon-coupling scale factor C_gamma from the fermion/vector couplings.
pub fn cgamma_effective(hmass: f64, cv: f64, cu: f64, cd: f64) -> f64 {
    let scaled = gamgam_amplitude(hmass, cv, cu, cd);
    let smref = gamgam_amplitude(hmass, 1.0, 1.0, 1.0);
    (scaled.norm_sqr() / smref.norm_sqr()).sqrt()
}

/// Trilinear h-H+-H- coupling from the quartics in the hybrid basis.
///
/// Z3 and Z7 are the usual combinations of lambda_1..lambda_5 at angle beta;
/// g(hH+H-) = -v (Z3 s_ba + Z7 c_ba).
pub fn charged_higgs_trilinear(lambda: &[f64; 5], beta: f64, sinba: f64, cosba: f64) -> f64 {
    let [l1, l2, l3, l4, l5] = *lambda;
    let s2b = (2.0 * beta).sin();
    let z3 = 0.25 * s2b * s2b * (l1 + l2 - 2.0 * (l3 + l4 + l5)) + l3;
    let z7 = -0.5
        * s2b
        * (l1 * beta.sin().powi(2) - l2 * beta.cos().powi(2) + (l3 + l4 + l5) * (2.0 * beta).cos());
    -sm::VEV * (z3 * sinba + z7 * cosba)
}

/// C_gamma including the charged-Higgs scalar loop.
///
/// Ratio of the scaled amplitude plus H± contribution to the pure-SM
/// amplitude (couplings at one, no H± term), per the reduced-coupling
/// definition.
pub fn cgamma_with_charged_higgs(
    hmass: f64,
    cv: f64,
    cu: f64,
    cd: f64,
    m_hpm: f64,
    trilinear: f64,
) -> f64 {
    let scaled = gamgam_amplitude(hmass, cv, cu, cd);
    let hpm = trilinear * a0(tau_of(hmass, m_hpm));
    let smref = gamgam_amplitude(hmass, 1.0, 1.0, 1.0);
    ((scaled + hpm).norm_sqr() / smref.norm_sqr()).sqrt()
}

/// Gluon-coupling scale factor C_g from the top/bottom loop ratio.
///
/// Keeps the destructive top-bottom interference that a naive CU^2 scaling
/// would miss.
pub fn cglue_effective(hmass: f64, cu: f64, cd: f64) -> f64 {
    let a12t = a12(tau_of(hmass, sm::MT));
    let a12b = a12(tau_of(hmass, sm::MB));
    let scaled = cu * a12t + cd * a12b;
    let smref = a12t + a12b;
    (scaled.norm_sqr() / smref.norm_sqr()).sqrt()
}
