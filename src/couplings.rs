//! couplings.rs — reduced couplings and the 2HDM mixing-angle maps.
//!
//! A parameter point is a set of dimensionless scale factors relative to the
//! SM prediction. The likelihood engine consumes them as a small XML payload
//! (see [`crate::likelihood::userinput`]); this module builds that payload
//! and maps 2HDM mixing angles onto the scale factors.

use crate::error::{FitError, Result};

/// Yukawa sector of the two-Higgs-doublet model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YukawaType {
    TypeI,
    TypeII,
}

impl YukawaType {
    /// Numeric code used on the external solver command line.
    pub fn code(self) -> u8 {
        match self {
            YukawaType::TypeI => 1,
            YukawaType::TypeII => 2,
        }
    }

    /// Roman-numeral tag used in output file names.
    pub fn tag(self) -> &'static str {
        match self {
            YukawaType::TypeI => "I",
            YukawaType::TypeII => "II",
        }
    }
}

/// Likelihood precision mode carried in the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precision {
    #[default]
    BestQcd,
    Lo,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::BestQcd => "BEST-QCD",
            Precision::Lo => "LO",
        }
    }
}

/// Reduced couplings of the 125 GeV Higgs.
///
/// `cgamma` is the loop-induced photon coupling; `None` leaves it to the
/// likelihood engine to derive from the tree-level factors.
#[derive(Clone, Debug)]
pub struct ReducedCouplings {
    pub mass: f64,
    pub cv: f64,
    pub cu: f64,
    pub cd: f64,
    pub cgamma: Option<f64>,
    pub br_invisible: f64,
    pub br_undetected: f64,
    pub precision: Precision,
}

impl ReducedCouplings {
    /// Fermion-universal point (CV, CF): every fermion scales with CF.
    pub fn universal(mass: f64, cv: f64, cf: f64) -> Self {
        Self {
            mass,
            cv,
            cu: cf,
            cd: cf,
            cgamma: None,
            br_invisible: 0.0,
            br_undetected: 0.0,
            precision: Precision::default(),
        }
    }

    /// Map (cos(beta-alpha), tan(beta)) onto the scale factors.
    ///
    /// Type I:  CV = s_ba, CU = CD = s_ba + c_ba/t_b
    /// Type II: CV = s_ba, CU = s_ba + c_ba/t_b, CD = s_ba - c_ba*t_b
    pub fn from_mixing(ty: YukawaType, mass: f64, cba: f64, tb: f64) -> Result<Self> {
        if tb <= 0.0 {
            return Err(FitError::Couplings(format!("tan(beta) must be > 0, got {tb}")));
        }
        if cba.abs() > 1.0 {
            return Err(FitError::Couplings(format!(
                "cos(beta-alpha) must lie in [-1, 1], got {cba}"
            )));
        }
        let sba = (1.0 - cba * cba).sqrt();
        let (cu, cd) = match ty {
            YukawaType::TypeI => (sba + cba / tb, sba + cba / tb),
            YukawaType::TypeII => (sba + cba / tb, sba - cba * tb),
        };
        Ok(Self {
            mass,
            cv: sba,
            cu,
            cd,
            cgamma: None,
            br_invisible: 0.0,
            br_undetected: 0.0,
            precision: Precision::default(),
        })
    }

    /// Map (alpha, tan(beta)) onto the scale factors.
    ///
    /// CV = sin(beta-alpha); CU = cos(alpha)/sin(beta);
    /// CD = cos(alpha)/sin(beta) (type I) or -sin(alpha)/cos(beta) (type II).
    pub fn from_alpha(ty: YukawaType, mass: f64, alpha: f64, tb: f64) -> Result<Self> {
        if tb <= 0.0 {
            return Err(FitError::Couplings(format!("tan(beta) must be > 0, got {tb}")));
        }
        let beta = tb.atan();
        let cv = (beta - alpha).sin();
        let cu = alpha.cos() / beta.sin();
        let cd = match ty {
            YukawaType::TypeI => cu,
            YukawaType::TypeII => -alpha.sin() / beta.cos(),
        };
        Ok(Self {
            mass,
            cv,
            cu,
            cd,
            cgamma: None,
            br_invisible: 0.0,
            br_undetected: 0.0,
            precision: Precision::default(),
        })
    }

    pub fn with_cgamma(mut self, cgamma: f64) -> Self {
        self.cgamma = Some(cgamma);
        self
    }

    /// Render the per-channel payload used by the (CV, CF) scans:
    /// tt/bb/cc/tautau from the fermion factors, ZZ/WW from CV.
    pub fn user_input_per_channel(&self) -> String {
        format!(
            r#"<?xml version="1.0"?>

<lilithinput>

<reducedcouplings>
  <mass>{mass}</mass>

  <C to="tt">{cu}</C>
  <C to="bb">{cd}</C>
  <C to="cc">{cu}</C>
  <C to="tautau">{cd}</C>
  <C to="ZZ">{cv}</C>
  <C to="WW">{cv}</C>

  <extraBR>
    <BR to="invisible">{inv}</BR>
    <BR to="undetected">{und}</BR>
  </extraBR>

  <precision>{prec}</precision>
</reducedcouplings>

</lilithinput>
"#,
            mass = self.mass,
            cu = self.cu,
            cd = self.cd,
            cv = self.cv,
            inv = self.br_invisible,
            und = self.br_undetected,
            prec = self.precision.as_str(),
        )
    }

    /// Render the grouped payload used by the 2HDM scans: uu/dd/VV, plus an
    /// explicit gammagamma factor when one was derived upstream.
    pub fn user_input_grouped(&self) -> String {
        let gamma_line = match self.cgamma {
            Some(c) => format!("  <C to=\"gammagamma\">{c}</C>\n"),
            None => String::new(),
        };
        format!(
            r#"<?xml version="1.0"?>

<lilithinput>

<reducedcouplings>
  <mass>{mass}</mass>

  <C to="uu">{cu}</C>
  <C to="dd">{cd}</C>
  <C to="VV">{cv}</C>
{gamma}
  <extraBR>
    <BR to="invisible">{inv}</BR>
    <BR to="undetected">{und}</BR>
  </extraBR>

  <precision>{prec}</precision>
</reducedcouplings>

</lilithinput>
"#,
            mass = self.mass,
            cu = self.cu,
            cd = self.cd,
            cv = self.cv,
            gamma = gamma_line,
            inv = self.br_invisible,
            und = self.br_undetected,
            prec = self.precision.as_str(),
        )
    }
}
