//! likelihood/userinput.rs — the XML payload handed to the likelihood engine.
//!
//! The payload is the fixed `<lilithinput><reducedcouplings>` shape built in
//! [`crate::couplings`]; this side parses it back into effective per-channel
//! scale factors. The schema is closed, so a purpose-built scanner is enough.

use crate::error::{FitError, Result};
use crate::loopamp;

/// Per-channel scale factors resolved from a payload.
///
/// Group tags (uu, dd, ll, VV, ff) are applied first, specific tags
/// (tt, cc, bb, tautau, mumu, ZZ, WW) override them. `dd` covers the
/// down-type quarks and the charged leptons, matching the Yukawa structure
/// of the 2HDM types the scans cover. Missing gammagamma/gg factors are
/// derived from the loop amplitudes.
#[derive(Clone, Debug)]
pub struct EffectiveCouplings {
    pub mass: f64,
    pub cw: f64,
    pub cz: f64,
    pub cu: f64,
    pub cd: f64,
    pub cl: f64,
    pub cgamma: f64,
    pub cglue: f64,
    pub czgamma: f64,
    pub br_invisible: f64,
    pub br_undetected: f64,
}

impl EffectiveCouplings {
    /// Vector-boson factor used in loop amplitudes (the W loop).
    pub fn cv(&self) -> f64 {
        self.cw
    }
}

/// Extract the text of the first `<tag>...</tag>` occurrence.
fn tag_text<'a>(s: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = s.find(&open)? + open.len();
    let end = s[start..].find(&close)? + start;
    Some(s[start..end].trim())
}

/// Iterate `<name to="channel">value</name>` occurrences.
fn attr_tags<'a, 'b>(s: &'a str, name: &'b str) -> impl Iterator<Item = Result<(&'a str, &'a str)>> + use<'a, 'b> {
    let open = format!("<{name} to=\"");
    let close = format!("</{name}>");
    let mut rest = s;
    std::iter::from_fn(move || {
        let start = rest.find(&open)?;
        let after_attr = &rest[start + open.len()..];
        let Some(quote) = after_attr.find('"') else {
            rest = "";
            return Some(Err(FitError::UserInput(format!(
                "unterminated {name} attribute"
            ))));
        };
        let channel = &after_attr[..quote];
        let after_quote = &after_attr[quote..];
        let Some(gt) = after_quote.find('>') else {
            rest = "";
            return Some(Err(FitError::UserInput(format!("unterminated {name} tag"))));
        };
        let body = &after_quote[gt + 1..];
        let Some(end) = body.find(&close) else {
            rest = "";
            return Some(Err(FitError::UserInput(format!(
                "missing closing tag for {name} to=\"{channel}\""
            ))));
        };
        let value = body[..end].trim();
        rest = &body[end + close.len()..];
        Some(Ok((channel, value)))
    })
}

fn parse_f64(what: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FitError::UserInput(format!("{what}: not a number: {raw:?}")))
}

/// Parse a `<lilithinput>` payload into effective couplings.
pub fn parse_user_input(xml: &str) -> Result<EffectiveCouplings> {
    let block = tag_text(xml, "reducedcouplings")
        .ok_or_else(|| FitError::UserInput("missing <reducedcouplings> block".into()))?;

    let mass = parse_f64(
        "mass",
        tag_text(block, "mass").ok_or_else(|| FitError::UserInput("missing <mass>".into()))?,
    )?;

    // Defaults: SM point; overridden below in group-then-specific order.
    let (mut cw, mut cz, mut cu, mut cd, mut cl) = (1.0, 1.0, 1.0, 1.0, 1.0);
    let mut cgamma: Option<f64> = None;
    let mut cglue: Option<f64> = None;

    let mut groups: Vec<(&str, f64)> = Vec::new();
    let mut specifics: Vec<(&str, f64)> = Vec::new();
    for item in attr_tags(block, "C") {
        let (channel, raw) = item?;
        let value = parse_f64(&format!("C to=\"{channel}\""), raw)?;
        match channel {
            "ff" | "uu" | "dd" | "ll" | "VV" => groups.push((channel, value)),
            "tt" | "cc" | "bb" | "tautau" | "mumu" | "ZZ" | "WW" => {
                specifics.push((channel, value))
            }
            "gammagamma" => cgamma = Some(value),
            "gg" => cglue = Some(value),
            other => {
                return Err(FitError::UserInput(format!("unknown coupling channel {other:?}")))
            }
        }
    }
    for (channel, v) in groups {
        match channel {
            "ff" => {
                cu = v;
                cd = v;
                cl = v;
            }
            "uu" => cu = v,
            "dd" => {
                cd = v;
                cl = v;
            }
            "ll" => cl = v,
            "VV" => {
                cw = v;
                cz = v;
            }
            _ => unreachable!(),
        }
    }
    for (channel, v) in specifics {
        match channel {
            "tt" | "cc" => cu = v,
            "bb" => cd = v,
            "tautau" | "mumu" => cl = v,
            "ZZ" => cz = v,
            "WW" => cw = v,
            _ => unreachable!(),
        }
    }

    let mut br_invisible = 0.0;
    let mut br_undetected = 0.0;
    for item in attr_tags(block, "BR") {
        let (channel, raw) = item?;
        let value = parse_f64(&format!("BR to=\"{channel}\""), raw)?;
        if !(0.0..1.0).contains(&value) {
            return Err(FitError::UserInput(format!(
                "BR to=\"{channel}\" must lie in [0, 1), got {value}"
            )));
        }
        match channel {
            "invisible" => br_invisible = value,
            "undetected" => br_undetected = value,
            other => return Err(FitError::UserInput(format!("unknown BR channel {other:?}"))),
        }
    }
    if br_invisible + br_undetected >= 1.0 {
        return Err(FitError::UserInput(
            "extra branching ratios must sum below one".into(),
        ));
    }

    let cgamma = cgamma.unwrap_or_else(|| loopamp::cgamma_effective(mass, cw, cu, cd));
    let cglue = cglue.unwrap_or_else(|| loopamp::cglue_effective(mass, cu, cd));

    Ok(EffectiveCouplings {
        mass,
        cw,
        cz,
        cu,
        cd,
        cl,
        czgamma: cgamma,
        cgamma,
        cglue,
        br_invisible,
        br_undetected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::couplings::ReducedCouplings;

    #[test]
    fn per_channel_payload_round_trips() {
        let point = ReducedCouplings::universal(125.38, 1.05, 0.9);
        let eff = parse_user_input(&point.user_input_per_channel()).unwrap();
        assert!((eff.mass - 125.38).abs() < 1e-12);
        assert!((eff.cw - 1.05).abs() < 1e-12);
        assert!((eff.cz - 1.05).abs() < 1e-12);
        assert!((eff.cu - 0.9).abs() < 1e-12);
        assert!((eff.cd - 0.9).abs() < 1e-12);
        assert!((eff.cl - 0.9).abs() < 1e-12);
    }

    #[test]
    fn grouped_payload_applies_dd_to_leptons() {
        let point = ReducedCouplings {
            cd: 0.7,
            ..ReducedCouplings::universal(125.0, 1.0, 1.0)
        };
        let eff = parse_user_input(&point.user_input_grouped()).unwrap();
        assert!((eff.cd - 0.7).abs() < 1e-12);
        assert!((eff.cl - 0.7).abs() < 1e-12);
        assert!((eff.cu - 1.0).abs() < 1e-12);
    }

    #[test]
    fn explicit_gammagamma_wins_over_loop_derivation() {
        let point = ReducedCouplings::universal(125.0, 1.0, 1.0).with_cgamma(1.3);
        let eff = parse_user_input(&point.user_input_grouped()).unwrap();
        assert!((eff.cgamma - 1.3).abs() < 1e-12);
    }

    #[test]
    fn sm_payload_derives_unit_loop_factors() {
        let point = ReducedCouplings::universal(125.09, 1.0, 1.0);
        let eff = parse_user_input(&point.user_input_grouped()).unwrap();
        assert!((eff.cgamma - 1.0).abs() < 1e-9);
        assert!((eff.cglue - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_channel_and_bad_br() {
        let bad = r#"<lilithinput><reducedcouplings>
  <mass>125</mass>
  <C to="xx">1.0</C>
</reducedcouplings></lilithinput>"#;
        assert!(parse_user_input(bad).is_err());

        let bad_br = r#"<lilithinput><reducedcouplings>
  <mass>125</mass>
  <C to="VV">1.0</C>
  <extraBR><BR to="invisible">1.5</BR></extraBR>
</reducedcouplings></lilithinput>"#;
        assert!(parse_user_input(bad_br).is_err());
    }
}
