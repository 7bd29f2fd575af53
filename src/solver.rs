//! solver.rs — the external 2HDM fixed-point solver (`CalcPhys`).
//!
//! One process per parameter point. The solver prints a labeled report; we
//! pull out the quartic couplings, the three theory-consistency flags and the
//! oblique parameters. Label-based extraction tolerates the column drift
//! between solver versions.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::couplings::YukawaType;
use crate::error::{FitError, Result};

/// Input of one solver invocation, in the physical mass basis.
#[derive(Clone, Copy, Debug)]
pub struct SolverInput {
    pub mh: f64,
    pub m_heavy: f64,
    pub m_a: f64,
    pub m_hpm: f64,
    pub sinba: f64,
    pub lambda6: f64,
    pub lambda7: f64,
    pub m12_sq: f64,
    pub tan_beta: f64,
    pub yukawa: YukawaType,
}

impl SolverInput {
    /// Command-line argument vector in solver order.
    pub fn args(&self) -> Vec<String> {
        vec![
            format!("{:.5}", self.mh),
            format!("{:.5}", self.m_heavy),
            format!("{:.5}", self.m_a),
            format!("{:.5}", self.m_hpm),
            format!("{:.8}", self.sinba),
            format!("{:.5}", self.lambda6),
            format!("{:.5}", self.lambda7),
            format!("{:.5}", self.m12_sq),
            format!("{:.5}", self.tan_beta),
            self.yukawa.code().to_string(),
        ]
    }
}

/// Parsed solver report for one parameter point.
#[derive(Clone, Copy, Debug)]
pub struct SolverPoint {
    pub lambda: [f64; 5],
    pub unitarity: bool,
    pub perturbativity: bool,
    pub stability: bool,
    pub s: f64,
    pub t: f64,
    pub u: f64,
}

impl SolverPoint {
    /// All three theory-consistency flags hold.
    pub fn consistent(&self) -> bool {
        self.unitarity && self.perturbativity && self.stability
    }
}

/// Handle on the solver binary.
#[derive(Clone, Debug)]
pub struct CalcPhys {
    bin: PathBuf,
}

impl CalcPhys {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Run the solver for one point and parse its report.
    pub fn run(&self, input: &SolverInput) -> Result<SolverPoint> {
        let output = Command::new(&self.bin)
            .args(input.args())
            .output()
            .map_err(|e| {
                FitError::Solver(format!("failed to launch {}: {e}", self.bin.display()))
            })?;
        if !output.status.success() {
            return Err(FitError::Solver(format!(
                "{} exited with {} for point {:?}",
                self.bin.display(),
                output.status,
                input.args()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_report(&stdout)
    }
}

fn field(value: Option<f64>, label: &str) -> Result<f64> {
    value.ok_or_else(|| FitError::Solver(format!("missing field {label:?} in solver report")))
}

fn flag(value: Option<f64>, label: &str) -> Result<bool> {
    Ok(field(value, label)? != 0.0)
}

/// Parse the labeled solver report.
pub fn parse_report(stdout: &str) -> Result<SolverPoint> {
    let mut lambda = [None; 5];
    let mut unitarity = None;
    let mut perturbativity = None;
    let mut stability = None;
    let (mut s, mut t, mut u) = (None, None, None);

    for line in stdout.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let Ok(value) = rest.trim().parse::<f64>() else {
            continue;
        };
        match key {
            "lambda_1" => lambda[0] = Some(value),
            "lambda_2" => lambda[1] = Some(value),
            "lambda_3" => lambda[2] = Some(value),
            "lambda_4" => lambda[3] = Some(value),
            "lambda_5" => lambda[4] = Some(value),
            "Tree-level unitarity" => unitarity = Some(value),
            "Perturbativity" => perturbativity = Some(value),
            "Stability" => stability = Some(value),
            "S" => s = Some(value),
            "T" => t = Some(value),
            "U" => u = Some(value),
            _ => {}
        }
    }

    Ok(SolverPoint {
        lambda: [
            field(lambda[0], "lambda_1")?,
            field(lambda[1], "lambda_2")?,
            field(lambda[2], "lambda_3")?,
            field(lambda[3], "lambda_4")?,
            field(lambda[4], "lambda_5")?,
        ],
        unitarity: flag(unitarity, "Tree-level unitarity")?,
        perturbativity: flag(perturbativity, "Perturbativity")?,
        stability: flag(stability, "Stability")?,
        s: field(s, "S")?,
        t: field(t, "T")?,
        u: field(u, "U")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
2HDM point in the physical mass basis

 mh:        125.00000
 mH:        800.00000
 mA:        850.00000
 mC:        820.00000
 sin(b-a):    0.99874922
 tan(beta):   2.00000

 Quartic couplings in the generic basis:
 lambda_1:     0.257311
 lambda_2:     0.248190
 lambda_3:     1.035274
 lambda_4:    -0.512033
 lambda_5:    -0.498811

 Theory constraints:
 Tree-level unitarity:  1
 Perturbativity:        1
 Stability:             0

 Oblique parameters:
 S:    0.006410
 T:    0.010317
 U:    0.000766
";

    #[test]
    fn report_fields_parse() {
        let p = parse_report(REPORT).unwrap();
        assert!((p.lambda[0] - 0.257311).abs() < 1e-9);
        assert!((p.lambda[4] + 0.498811).abs() < 1e-9);
        assert!(p.unitarity && p.perturbativity && !p.stability);
        assert!(!p.consistent());
        assert!((p.s - 0.006410).abs() < 1e-9);
        assert!((p.t - 0.010317).abs() < 1e-9);
        assert!((p.u - 0.000766).abs() < 1e-9);
    }

    #[test]
    fn missing_field_is_an_error() {
        let truncated = REPORT.lines().take(12).collect::<Vec<_>>().join("\n");
        assert!(parse_report(&truncated).is_err());
    }

    #[test]
    fn unrelated_labels_are_ignored() {
        // "sin(b-a)" and "mh" must not collide with S/T/U or the lambdas.
        let p = parse_report(REPORT).unwrap();
        assert!((p.u - 0.000766).abs() < 1e-9);
    }

    #[test]
    fn missing_binary_reports_a_solver_error() {
        let solver = CalcPhys::new("/nonexistent/CalcPhys");
        let input = SolverInput {
            mh: 125.0,
            m_heavy: 500.0,
            m_a: 500.0,
            m_hpm: 500.0,
            sinba: 1.0,
            lambda6: 0.0,
            lambda7: 0.0,
            m12_sq: 1e5,
            tan_beta: 2.0,
            yukawa: YukawaType::TypeI,
        };
        match solver.run(&input) {
            Err(FitError::Solver(msg)) => assert!(msg.contains("CalcPhys")),
            other => panic!("expected a solver error, got {other:?}"),
        }
    }
}
