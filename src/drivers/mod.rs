//! drivers — the analyses, one clap subcommand each.
//!
//! Every driver is a standalone run-once scan: hardcoded defaults surfaced
//! as flags, a columnar result table, a log line with the best fit, and
//! (where the analysis has one) a rendered plot.

pub mod cvcf;
pub mod stu_profile;
pub mod stu_scan;
pub mod theory_line;
pub mod theory_map;

use std::fs;
use std::path::Path;

use crate::couplings::YukawaType;

/// clap value parser for the 2HDM Yukawa type (1 or 2).
pub fn parse_yukawa(s: &str) -> Result<YukawaType, String> {
    match s {
        "1" | "I" => Ok(YukawaType::TypeI),
        "2" | "II" => Ok(YukawaType::TypeII),
        other => Err(format!("2HDM type must be 1 or 2, got {other:?}")),
    }
}

/// Create the output directory if needed.
pub(crate) fn ensure_out_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yukawa_codes_parse() {
        assert_eq!(parse_yukawa("1").unwrap(), YukawaType::TypeI);
        assert_eq!(parse_yukawa("II").unwrap(), YukawaType::TypeII);
        assert!(parse_yukawa("3").is_err());
    }
}
