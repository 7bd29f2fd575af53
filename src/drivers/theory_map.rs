//! drivers/theory_map.rs — theory-consistency map at fixed (mH, mA).
//!
//! Scans (mH±, cos(b-a), tan(b)) and records the solver's three
//! consistency flags per point; allowed points keep a unit flag, excluded
//! points carry `nan`. Rendered as a 3-D scatter.

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use crate::config::FitConfig;
use crate::couplings::YukawaType;
use crate::drivers::{ensure_out_dir, parse_yukawa};
use crate::plot;
use crate::scan::{GridAxis, TableWriter, read_table};
use crate::solver::{CalcPhys, SolverInput};

#[derive(Args, Debug)]
pub struct TheoryMapArgs {
    /// 2HDM Yukawa type (1 or 2).
    #[arg(long, default_value = "1", value_parser = parse_yukawa)]
    pub yukawa_type: YukawaType,

    /// Heavy CP-even mass mH [GeV].
    #[arg(long, default_value_t = 200.0)]
    pub mass_heavy: f64,
    /// CP-odd mass mA [GeV].
    #[arg(long, default_value_t = 200.0)]
    pub mass_a: f64,

    #[arg(long, default_value_t = 200.0)]
    pub mhpm_min: f64,
    #[arg(long, default_value_t = 2000.0)]
    pub mhpm_max: f64,
    #[arg(long, default_value_t = 50)]
    pub mhpm_steps: usize,

    #[arg(long, default_value_t = 20)]
    pub cba_steps: usize,
    #[arg(long, default_value_t = 0.1)]
    pub tb_min: f64,
    #[arg(long, default_value_t = 10.0)]
    pub tb_max: f64,
    #[arg(long, default_value_t = 20)]
    pub tb_steps: usize,

    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,
}

/// cos(b-a) scan window per Yukawa type.
fn cba_range(ty: YukawaType) -> (f64, f64) {
    match ty {
        YukawaType::TypeI => (-0.25, 0.25),
        YukawaType::TypeII => (-0.05, 0.05),
    }
}

pub fn run(cfg: &FitConfig, args: &TheoryMapArgs) -> Result<(), Box<dyn Error>> {
    let solver = CalcPhys::new(&cfg.solver.bin);
    let mhpm_axis = GridAxis::new(args.mhpm_min, args.mhpm_max, args.mhpm_steps);
    let (cba_min, cba_max) = cba_range(args.yukawa_type);
    let cba_axis = GridAxis::new(cba_min, cba_max, args.cba_steps);
    let tb_axis = GridAxis::new(args.tb_min, args.tb_max, args.tb_steps);

    ensure_out_dir(&args.out_dir)?;
    let stem = format!(
        "theory-map-{:.0}-{:.0}-{}-{}-{}-{}",
        args.mass_heavy,
        args.mass_a,
        args.mhpm_steps,
        args.cba_steps,
        args.tb_steps,
        args.yukawa_type.tag().to_lowercase()
    );
    let out_table = args.out_dir.join(format!("{stem}.out"));
    let out_plot = args.out_dir.join(format!("{stem}.png"));

    info!(
        mass_heavy = args.mass_heavy,
        mass_a = args.mass_a,
        "running consistency scan"
    );
    let mut writer = TableWriter::create(&out_table, 5)?;
    let mut allowed = 0usize;
    let mut total = 0usize;
    for (i, m_hpm) in mhpm_axis.values().into_iter().enumerate() {
        if i == 0 || (i + 1) % 10 == 0 {
            info!(m_hpm, "outer row");
        }
        for cba in cba_axis.values() {
            for tb in tb_axis.values() {
                total += 1;
                let m12 = (tb.atan() - cba.acos()).cos() * args.mass_heavy / tb.sqrt();
                let sinba = (1.0 - cba * cba).sqrt();
                let consistent = match solver.run(&SolverInput {
                    mh: 125.0,
                    m_heavy: args.mass_heavy,
                    m_a: args.mass_a,
                    m_hpm,
                    sinba,
                    lambda6: 0.0,
                    lambda7: 0.0,
                    m12_sq: m12,
                    tan_beta: tb,
                    yukawa: args.yukawa_type,
                }) {
                    Ok(point) => point.consistent(),
                    Err(e) => {
                        warn!(m_hpm, cba, tb, "solver failed: {e}");
                        false
                    }
                };
                let flag = if consistent {
                    allowed += 1;
                    1.0
                } else {
                    f64::NAN
                };
                writer.row(&[m_hpm, cba, tb, flag])?;
            }
        }
    }
    writer.finish()?;
    info!(allowed, total, "consistency scan finalized");

    info!("plotting");
    let rows = read_table(&out_table)?;
    let points: Vec<(f64, f64, f64, bool)> = rows
        .iter()
        .map(|r| (r[0], r[1], r[2], r[3].is_finite()))
        .collect();
    plot::scatter3d_plot(
        &out_plot,
        &points,
        (mhpm_axis, cba_axis, tb_axis),
        "2HDM theory-consistency map",
    )?;

    info!(table = %out_table.display(), plot = %out_plot.display(), "results stored");
    Ok(())
}
