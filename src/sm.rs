//! sm.rs — Standard-Model reference constants.
//!
//! Masses and electroweak inputs used by the loop amplitudes, plus the SM
//! branching ratios of a 125 GeV Higgs used to rescale the total width.
//! These are calibration data, not tunables.

/// W boson mass [GeV].
pub const MW: f64 = 80.398;
/// Z boson mass [GeV].
pub const MZ: f64 = 91.1876;
/// Electroweak vacuum expectation value [GeV].
pub const VEV: f64 = 246.0;
/// sin^2 of the weak mixing angle.
pub const SW2: f64 = 0.23116;

/// Top quark mass [GeV].
pub const MT: f64 = 173.1;
/// Bottom quark mass [GeV].
pub const MB: f64 = 4.75;
/// Charm quark mass [GeV].
pub const MC: f64 = 1.4;
/// Tau lepton mass [GeV].
pub const MTAU: f64 = 1.777;

/// SM branching ratios at mh = 125 GeV (LHC Higgs XS WG).
///
/// The raw table does not sum to exactly one; [`width_weights`] renormalizes
/// so that the SM coupling point rescales the total width by exactly 1.
pub const BR_BB: f64 = 0.5809;
pub const BR_WW: f64 = 0.2152;
pub const BR_GG: f64 = 0.0818;
pub const BR_TAUTAU: f64 = 0.06256;
pub const BR_CC: f64 = 0.02884;
pub const BR_ZZ: f64 = 0.02641;
pub const BR_GAMGAM: f64 = 0.00227;
pub const BR_ZGAM: f64 = 0.001541;
pub const BR_MUMU: f64 = 0.000217;
pub const BR_SS: f64 = 0.000246;

/// Higgs decay channels entering the total-width rescale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecayMode {
    BB,
    WW,
    GG,
    TauTau,
    CC,
    ZZ,
    GamGam,
    ZGam,
    MuMu,
    SS,
}

impl DecayMode {
    pub const ALL: [DecayMode; 10] = [
        DecayMode::BB,
        DecayMode::WW,
        DecayMode::GG,
        DecayMode::TauTau,
        DecayMode::CC,
        DecayMode::ZZ,
        DecayMode::GamGam,
        DecayMode::ZGam,
        DecayMode::MuMu,
        DecayMode::SS,
    ];

    /// Raw SM branching ratio of this channel.
    pub fn br(self) -> f64 {
        match self {
            DecayMode::BB => BR_BB,
            DecayMode::WW => BR_WW,
            DecayMode::GG => BR_GG,
            DecayMode::TauTau => BR_TAUTAU,
            DecayMode::CC => BR_CC,
            DecayMode::ZZ => BR_ZZ,
            DecayMode::GamGam => BR_GAMGAM,
            DecayMode::ZGam => BR_ZGAM,
            DecayMode::MuMu => BR_MUMU,
            DecayMode::SS => BR_SS,
        }
    }

    /// Parse the channel name used in measurement files and XML payloads.
    pub fn parse(name: &str) -> Option<DecayMode> {
        Some(match name {
            "bb" => DecayMode::BB,
            "ww" | "WW" => DecayMode::WW,
            "gg" => DecayMode::GG,
            "tautau" => DecayMode::TauTau,
            "cc" => DecayMode::CC,
            "zz" | "ZZ" => DecayMode::ZZ,
            "gammagamma" => DecayMode::GamGam,
            "zgamma" | "Zgamma" => DecayMode::ZGam,
            "mumu" => DecayMode::MuMu,
            "ss" => DecayMode::SS,
            _ => return None,
        })
    }
}

/// Branching ratios renormalized to sum to one.
pub fn width_weights() -> [(DecayMode, f64); 10] {
    let total: f64 = DecayMode::ALL.iter().map(|m| m.br()).sum();
    let mut out = [(DecayMode::BB, 0.0); 10];
    for (slot, &mode) in out.iter_mut().zip(DecayMode::ALL.iter()) {
        *slot = (mode, mode.br() / total);
    }
    out
}
