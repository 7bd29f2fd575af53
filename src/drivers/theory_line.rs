//! drivers/theory_line.rs — 1-D tan(beta) consistency line.
//!
//! Fixed masses and mixing, a tan(beta) sweep; each row records the three
//! solver flags and the combined verdict. No plot: the table is the result.

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use crate::config::FitConfig;
use crate::couplings::YukawaType;
use crate::drivers::{ensure_out_dir, parse_yukawa};
use crate::scan::{GridAxis, TableWriter};
use crate::solver::{CalcPhys, SolverInput};

#[derive(Args, Debug)]
pub struct TheoryLineArgs {
    /// 2HDM Yukawa type (1 or 2).
    #[arg(long, default_value = "1", value_parser = parse_yukawa)]
    pub yukawa_type: YukawaType,

    /// Heavy CP-even mass mH [GeV].
    #[arg(long, default_value_t = 550.0)]
    pub mass_heavy: f64,
    /// CP-odd mass mA [GeV].
    #[arg(long, default_value_t = 500.0)]
    pub mass_a: f64,
    /// Charged-Higgs mass mH± [GeV].
    #[arg(long, default_value_t = 780.0)]
    pub mass_hpm: f64,
    /// cos(beta - alpha).
    #[arg(long, default_value_t = 0.1)]
    pub cba: f64,

    #[arg(long, default_value_t = 0.1)]
    pub tb_min: f64,
    #[arg(long, default_value_t = 10.0)]
    pub tb_max: f64,
    #[arg(long, default_value_t = 100)]
    pub tb_steps: usize,

    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,
}

pub fn run(cfg: &FitConfig, args: &TheoryLineArgs) -> Result<(), Box<dyn Error>> {
    let solver = CalcPhys::new(&cfg.solver.bin);
    let tb_axis = GridAxis::new(args.tb_min, args.tb_max, args.tb_steps);
    let sba = (1.0 - args.cba * args.cba).sqrt();

    ensure_out_dir(&args.out_dir)?;
    let stem = format!(
        "theory-line-{:.0}-{:.0}-{:.0}-{}-{}",
        args.mass_a,
        args.mass_heavy,
        args.mass_hpm,
        args.cba,
        args.yukawa_type.tag().to_lowercase()
    );
    let out_table = args.out_dir.join(format!("{stem}.out"));

    info!(
        mass_heavy = args.mass_heavy,
        mass_a = args.mass_a,
        mass_hpm = args.mass_hpm,
        "running tan(beta) line"
    );
    let mut writer = TableWriter::create(&out_table, 5)?;
    for (i, tb) in tb_axis.values().into_iter().enumerate() {
        if i == 0 || (i + 1) % 10 == 0 {
            info!(tb, "progress");
        }
        let m12 = (tb.atan() - args.cba.acos()).cos() * args.mass_heavy / tb.sqrt();
        match solver.run(&SolverInput {
            mh: 125.0,
            m_heavy: args.mass_heavy,
            m_a: args.mass_a,
            m_hpm: args.mass_hpm,
            sinba: sba,
            lambda6: 0.0,
            lambda7: 0.0,
            m12_sq: m12,
            tan_beta: tb,
            yukawa: args.yukawa_type,
        }) {
            Ok(point) => {
                let flags = [
                    point.unitarity as u8 as f64,
                    point.perturbativity as u8 as f64,
                    point.stability as u8 as f64,
                    point.consistent() as u8 as f64,
                ];
                writer.row(&[tb, flags[0], flags[1], flags[2], flags[3]])?;
            }
            Err(e) => {
                warn!(tb, "solver failed: {e}");
                writer.row(&[tb, f64::NAN, f64::NAN, f64::NAN, f64::NAN])?;
            }
        }
    }
    writer.finish()?;

    info!(table = %out_table.display(), "results stored");
    Ok(())
}
