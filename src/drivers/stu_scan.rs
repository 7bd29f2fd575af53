//! drivers/stu_scan.rs — (mH, mA) scan with profiled nuisances.
//!
//! At each mass point the nuisances (mH±, cos(b-a), tan(b)) are minimized
//! against the oblique-parameter chi-square plus the coupling likelihood;
//! the external solver provides (S, T, U) per trial point.

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use crate::config::FitConfig;
use crate::couplings::{ReducedCouplings, YukawaType};
use crate::drivers::{ensure_out_dir, parse_yukawa};
use crate::likelihood::LikelihoodCalc;
use crate::minimize::{self, Options};
use crate::plot::{self, GridValues, ScatterMap};
use crate::scan::{BestFit, GridAxis, TableWriter, read_table};
use crate::solver::{CalcPhys, SolverInput};
use crate::stu::StuChi2;

#[derive(Args, Debug)]
pub struct StuScanArgs {
    /// 2HDM Yukawa type (1 or 2).
    #[arg(long, default_value = "1", value_parser = parse_yukawa)]
    pub yukawa_type: YukawaType,

    /// Higgs mass to test [GeV].
    #[arg(long, default_value_t = 125.0)]
    pub hmass: f64,

    #[arg(long, default_value_t = 200.0)]
    pub mass_min: f64,
    #[arg(long, default_value_t = 2000.0)]
    pub mass_max: f64,

    /// Grid steps per mass dimension (squared grid).
    #[arg(long, default_value_t = 50)]
    pub grid: usize,

    /// Experiment list for the coupling likelihood.
    #[arg(long)]
    pub exp_list: Option<PathBuf>,

    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,
}

/// Nuisance scan ranges per Yukawa type: (cba, tb).
fn nuisance_ranges(ty: YukawaType) -> ((f64, f64), (f64, f64)) {
    match ty {
        YukawaType::TypeI => ((-0.25, 0.25), (0.1, 10.0)),
        YukawaType::TypeII => ((-0.05, 0.05), (0.1, 10.0)),
    }
}

pub fn run(cfg: &FitConfig, args: &StuScanArgs) -> Result<(), Box<dyn Error>> {
    let exp_list = args
        .exp_list
        .clone()
        .unwrap_or_else(|| cfg.data_dir.join("stu/Run2.list"));

    info!(list = %exp_list.display(), "reading experimental input");
    let calc = LikelihoodCalc::read_exp_input(&exp_list)?;
    let stu_chi2 = StuChi2::new(&cfg.stu)?;
    let solver = CalcPhys::new(&cfg.solver.bin);

    let mass_axis = GridAxis::new(args.mass_min, args.mass_max, args.grid);
    let ((cba_min, cba_max), (tb_min, tb_max)) = nuisance_ranges(args.yukawa_type);
    let bounds = vec![
        (args.mass_min, args.mass_max),
        (cba_min, cba_max),
        (tb_min, tb_max),
    ];

    // -2logL of one nuisance trial at fixed (mH, mA).
    let objective = |x: &[f64], m_heavy: f64, m_a: f64| -> f64 {
        let (m_hpm, cba, tb) = (x[0], x[1], x[2]);
        let m12 = (tb.atan() - cba.acos()).cos() * m_heavy / tb.sqrt();
        let sinba = (1.0 - cba * cba).sqrt();
        let point = match solver.run(&SolverInput {
            mh: args.hmass,
            m_heavy,
            m_a,
            m_hpm,
            sinba,
            lambda6: 0.0,
            lambda7: 0.0,
            m12_sq: m12,
            tan_beta: tb,
            yukawa: args.yukawa_type,
        }) {
            Ok(p) => p,
            Err(e) => {
                warn!(m_heavy, m_a, m_hpm, cba, tb, "solver failed: {e}");
                return f64::INFINITY;
            }
        };
        let chi2_stu = stu_chi2.chi2(point.s, point.t, point.u);
        let couplings =
            match ReducedCouplings::from_mixing(args.yukawa_type, args.hmass, cba, tb) {
                Ok(c) => c,
                Err(_) => return f64::INFINITY,
            };
        let chi2_couplings = match calc.compute(&couplings.user_input_grouped()) {
            Ok(v) => v,
            Err(e) => {
                warn!(cba, tb, "likelihood failed: {e}");
                return f64::INFINITY;
            }
        };
        chi2_stu + chi2_couplings
    };

    ensure_out_dir(&args.out_dir)?;
    let stem = format!(
        "stu-scan-{}-{}",
        args.grid,
        args.yukawa_type.tag().to_lowercase()
    );
    let out_table = args.out_dir.join(format!("{stem}.out"));
    let out_plot = args.out_dir.join(format!("{stem}.png"));

    info!(grid = args.grid, ty = args.yukawa_type.tag(), "running scan");
    let mut writer = TableWriter::create(&out_table, 5)?;
    let mut best = BestFit::new();
    let opts = Options {
        ftol: 1e-3,
        ..Options::default()
    };
    for (i, m_heavy) in mass_axis.values().into_iter().enumerate() {
        if i == 0 || (i + 1) % 10 == 0 {
            info!(m_heavy, "outer row");
        }
        writer.blank_line()?;
        for m_a in mass_axis.values() {
            let x0 = [(m_heavy + m_a) / 2.0, 0.001, 1.001];
            let fit = minimize::minimize(|x| objective(x, m_heavy, m_a), &x0, &bounds, opts);
            if !fit.converged {
                warn!(m_heavy, m_a, nfev = fit.nfev, "could not minimize");
            }
            writer.row(&[m_heavy, m_a, fit.fun, fit.x[0], fit.x[1], fit.x[2]])?;
            best.offer(fit.fun, &[m_heavy, m_a, fit.x[0], fit.x[1], fit.x[2]]);
        }
    }
    if !best.found() {
        return Err("no finite -2logL anywhere on the grid; is the solver reachable?".into());
    }
    // Final best-fit row, separated by a blank line.
    writer.blank_line()?;
    writer.row(&[
        best.params[0],
        best.params[1],
        best.m2logl,
        best.params[2],
        best.params[3],
        best.params[4],
    ])?;
    writer.finish()?;

    info!(
        m_heavy = best.params[0],
        m_a = best.params[1],
        m_hpm = best.params[2],
        cba = best.params[3],
        tb = best.params[4],
        m2logl = best.m2logl,
        "scan finalized; minimum"
    );

    info!("plotting");
    let rows = read_table(&out_table)?;
    // The final row is the appended best fit, not a grid point.
    let grid_rows = &rows[..rows.len() - 1];
    let grid_values = GridValues::from_rows(mass_axis.clone(), mass_axis, grid_rows, 2);
    plot::scatter_map_plot(
        &out_plot,
        &grid_values,
        &ScatterMap {
            caption: "2HDM (mH, mA) plane, STU + couplings",
            x_label: "mH [GeV]",
            y_label: "mA [GeV]",
            vmax: 10.0,
            best_fit: Some((best.params[0], best.params[1])),
        },
    )?;

    info!(table = %out_table.display(), plot = %out_plot.display(), "results stored");
    Ok(())
}
