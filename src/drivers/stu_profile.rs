//! drivers/stu_profile.rs — worker-parallel (mH, mA) profile.
//!
//! The full analysis: outer mH slices run on worker threads, each slice
//! writing its own table. Per (mH, mA) a coarse feasibility grid over
//! (mH±, alpha, tan(b)) is pruned by mass-plane bands, mH± bands and the
//! alignment window, then the surviving minimum seeds a bounded refinement.
//! The photon coupling carries the charged-Higgs loop. Points with no
//! theory-consistent candidate are recorded as `nan`.

use std::error::Error;
use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;
use std::thread;

use clap::Args;
use tracing::{debug, info, warn};

use crate::config::FitConfig;
use crate::couplings::{ReducedCouplings, YukawaType};
use crate::drivers::{ensure_out_dir, parse_yukawa};
use crate::likelihood::LikelihoodCalc;
use crate::loopamp;
use crate::minimize::{self, Options};
use crate::plot::{self, GridValues, ScatterMap};
use crate::scan::{self, GridAxis, TableWriter, read_table};
use crate::solver::{CalcPhys, SolverInput, SolverPoint};
use crate::stu::StuChi2;

#[derive(Args, Debug)]
pub struct StuProfileArgs {
    /// 2HDM Yukawa type (1 or 2).
    #[arg(long, default_value = "1", value_parser = parse_yukawa)]
    pub yukawa_type: YukawaType,

    /// Higgs mass to test [GeV].
    #[arg(long, default_value_t = 125.09)]
    pub hmass: f64,

    #[arg(long, default_value_t = 200.0)]
    pub mass_min: f64,
    #[arg(long, default_value_t = 2000.0)]
    pub mass_max: f64,

    /// Outer-axis (mH) grid steps; one worker slice each.
    #[arg(long, default_value_t = 80)]
    pub mh_steps: usize,
    /// Inner-axis (mA) grid steps.
    #[arg(long, default_value_t = 80)]
    pub ma_steps: usize,
    /// Coarse-grid steps in mH±.
    #[arg(long, default_value_t = 80)]
    pub mhpm_steps: usize,
    /// Coarse-grid steps in alpha.
    #[arg(long, default_value_t = 200)]
    pub alpha_steps: usize,
    /// Coarse-grid steps in tan(beta).
    #[arg(long, default_value_t = 200)]
    pub tb_steps: usize,

    #[arg(long, default_value_t = 0.5)]
    pub tb_min: f64,
    #[arg(long, default_value_t = 10.0)]
    pub tb_max: f64,

    /// -2logL ceiling assigned to theory-inconsistent grid candidates.
    #[arg(long, default_value_t = 100.0)]
    pub ceiling: f64,

    /// Worker threads (0 = all cores).
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Experiment list for the coupling likelihood.
    #[arg(long)]
    pub exp_list: Option<PathBuf>,

    /// Colormap saturation for the plot.
    #[arg(long, default_value_t = 10.0)]
    pub vmax: f64,

    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,
}

/// Mass-plane bands with a plausible (mH, mA) spectrum; everything else is
/// excluded up front.
pub fn mass_plane_allowed(mh: f64, ma: f64) -> bool {
    if mh <= 600.0 {
        ma <= 900.0
    } else if mh <= 700.0 {
        ma <= 1000.0
    } else if mh <= 800.0 {
        ma > 500.0 && ma < 1100.0
    } else if mh <= 900.0 {
        ma > mh - 100.0 && ma < mh + 300.0
    } else {
        ma > mh - 100.0 && ma < mh + 200.0
    }
}

/// Charged-Higgs mass bands compatible with the (mH, mA) point.
pub fn hpm_allowed(mh: f64, ma: f64, mhpm: f64) -> bool {
    if mh < 800.0 {
        mhpm <= mh + 100.0 && mhpm <= ma + 100.0
    } else {
        mhpm > mh - 100.0 && mhpm < mh + 100.0 && mhpm > ma - 200.0 && mhpm < ma + 100.0
    }
}

/// Alignment window: |sin(b-a)| above 0.9, tightened to 0.95 for mH± >= 400.
pub fn alignment_allowed(alpha: f64, tb: f64, mhpm: f64) -> bool {
    let sba = (tb.atan() - alpha).sin().abs();
    if mhpm >= 400.0 { sba > 0.95 } else { sba > 0.9 }
}

struct Profile<'a> {
    calc: &'a LikelihoodCalc,
    stu_chi2: &'a StuChi2,
    solver: &'a CalcPhys,
    yukawa: YukawaType,
    hmass: f64,
    ceiling: f64,
    penalty: f64,
}

impl Profile<'_> {
    fn solve(&self, m_heavy: f64, m_a: f64, m_hpm: f64, alpha: f64, tb: f64) -> Option<SolverPoint> {
        let beta = tb.atan();
        let sinba = (beta - alpha).sin();
        let m12_sq = alpha.cos().powi(2) * m_heavy * m_heavy / tb;
        match self.solver.run(&SolverInput {
            mh: self.hmass,
            m_heavy,
            m_a,
            m_hpm,
            sinba,
            lambda6: 0.0,
            lambda7: 0.0,
            m12_sq,
            tan_beta: tb,
            yukawa: self.yukawa,
        }) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(m_heavy, m_a, m_hpm, alpha, tb, "solver failed: {e}");
                None
            }
        }
    }

    /// -2logL of one nuisance trial; `coarse` trials take the ceiling when
    /// theory-inconsistent, refined trials take a penalty on top.
    fn m2logl(&self, x: &[f64], m_heavy: f64, m_a: f64, coarse: bool) -> f64 {
        let (m_hpm, alpha, tb) = (x[0], x[1], x[2]);
        let Some(point) = self.solve(m_heavy, m_a, m_hpm, alpha, tb) else {
            return self.ceiling;
        };

        let chi2_stu = self.stu_chi2.chi2(point.s, point.t, point.u);

        let beta = tb.atan();
        let sinba = (beta - alpha).sin();
        let cosba = (beta - alpha).cos();
        let couplings =
            match ReducedCouplings::from_alpha(self.yukawa, self.hmass, alpha, tb) {
                Ok(c) => c,
                Err(_) => return self.ceiling,
            };
        let trilinear = loopamp::charged_higgs_trilinear(&point.lambda, beta, sinba, cosba);
        let cgamma = loopamp::cgamma_with_charged_higgs(
            self.hmass,
            couplings.cv,
            couplings.cu,
            couplings.cd,
            m_hpm,
            trilinear,
        );
        let chi2_couplings = match self
            .calc
            .compute(&couplings.with_cgamma(cgamma).user_input_grouped())
        {
            Ok(v) => v,
            Err(e) => {
                warn!(alpha, tb, "likelihood failed: {e}");
                return self.ceiling;
            }
        };

        let total = chi2_stu + chi2_couplings;
        if point.consistent() {
            total
        } else if coarse {
            self.ceiling
        } else {
            total + self.penalty
        }
    }
}

pub fn run(cfg: &FitConfig, args: &StuProfileArgs) -> Result<(), Box<dyn Error>> {
    let exp_list = args
        .exp_list
        .clone()
        .unwrap_or_else(|| cfg.data_dir.join("stu/Run2.list"));

    info!(list = %exp_list.display(), "reading experimental input");
    let calc = LikelihoodCalc::read_exp_input(&exp_list)?;
    let stu_chi2 = StuChi2::new(&cfg.stu)?;
    let solver = CalcPhys::new(&cfg.solver.bin);
    let profile = Profile {
        calc: &calc,
        stu_chi2: &stu_chi2,
        solver: &solver,
        yukawa: args.yukawa_type,
        hmass: args.hmass,
        ceiling: args.ceiling,
        penalty: args.ceiling / 10.0,
    };

    let mh_axis = GridAxis::new(args.mass_min, args.mass_max, args.mh_steps);
    let ma_axis = GridAxis::new(args.mass_min, args.mass_max, args.ma_steps);
    let mhpm_axis = GridAxis::new(args.mass_min, args.mass_max, args.mhpm_steps);
    let alpha_axis = GridAxis::new(-FRAC_PI_2, 0.0, args.alpha_steps);
    let tb_axis = GridAxis::new(args.tb_min, args.tb_max, args.tb_steps);
    let bounds = vec![
        (args.mass_min, args.mass_max),
        (-FRAC_PI_2, 0.0),
        (args.tb_min, args.tb_max),
    ];

    ensure_out_dir(&args.out_dir)?;
    let slice_dir = args.out_dir.join("slices");
    ensure_out_dir(&slice_dir)?;
    let stem = format!(
        "stu-profile-{}-{}-{}-{}-{}-{}",
        args.mh_steps,
        args.ma_steps,
        args.mhpm_steps,
        args.alpha_steps,
        args.tb_steps,
        args.yukawa_type.tag().to_lowercase()
    );
    let slice_paths: Vec<PathBuf> = (0..args.mh_steps)
        .map(|i| slice_dir.join(format!("{stem}-{i}.out")))
        .collect();

    let workers = if args.workers == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        args.workers
    };
    info!(
        workers,
        mh_steps = args.mh_steps,
        ma_steps = args.ma_steps,
        "running scan"
    );

    let mh_values = mh_axis.values();
    let opts = Options {
        ftol: 1e-3,
        ..Options::default()
    };
    scan::run_slices(args.mh_steps, workers, |i| {
        let m_heavy = mh_values[i];
        info!(m_heavy, slice = i, "slice start");
        let mut writer = TableWriter::create(&slice_paths[i], 5)?;
        for m_a in ma_axis.values() {
            if !mass_plane_allowed(m_heavy, m_a) {
                writer.row(&[m_heavy, m_a, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN])?;
                continue;
            }

            // Coarse feasibility grid: find a theory-consistent seed.
            let mut coarse_min = args.ceiling;
            let mut seed = None;
            for m_hpm in mhpm_axis.values() {
                if !hpm_allowed(m_heavy, m_a, m_hpm) {
                    continue;
                }
                for alpha in alpha_axis.values() {
                    for tb in tb_axis.values() {
                        if !alignment_allowed(alpha, tb, m_hpm) {
                            continue;
                        }
                        let v = profile.m2logl(&[m_hpm, alpha, tb], m_heavy, m_a, true);
                        if v < coarse_min {
                            coarse_min = v;
                            seed = Some([m_hpm, alpha, tb]);
                        }
                    }
                }
            }
            let Some(seed) = seed else {
                writer.row(&[m_heavy, m_a, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN])?;
                continue;
            };
            debug!(m_heavy, m_a, coarse_min, "coarse seed found");

            let fit = minimize::minimize(
                |x| profile.m2logl(x, m_heavy, m_a, false),
                &seed,
                &bounds,
                opts,
            );
            if !fit.converged {
                warn!(m_heavy, m_a, nfev = fit.nfev, "could not minimize");
            }
            let sinba_fit = (fit.x[2].atan() - fit.x[1]).sin();
            writer.row(&[m_heavy, m_a, fit.fun, fit.x[0], fit.x[1], fit.x[2], sinba_fit])?;
        }
        writer.finish()?;
        info!(m_heavy, slice = i, "slice done");
        Ok(())
    })?;

    let out_table = args.out_dir.join(format!("{stem}.out"));
    scan::merge_tables(&slice_paths, &out_table)?;
    info!(table = %out_table.display(), "slices merged");

    info!("plotting");
    let rows = read_table(&out_table)?;
    let grid_values = GridValues::from_rows(mh_axis, ma_axis, &rows, 2);
    let best = grid_values
        .points
        .iter()
        .filter(|p| p.2.is_finite())
        .fold(None, |acc: Option<(f64, f64, f64)>, &p| match acc {
            Some(a) if a.2 <= p.2 => Some(a),
            _ => Some(p),
        });
    if let Some((mh, ma, _)) = best {
        info!(m_heavy = mh, m_a = ma, "minimum");
    }
    let out_plot = args.out_dir.join(format!("{stem}.png"));
    plot::scatter_map_plot(
        &out_plot,
        &grid_values,
        &ScatterMap {
            caption: "2HDM (mH, mA) profile, STU + couplings + H± loop",
            x_label: "mH [GeV]",
            y_label: "mA [GeV]",
            vmax: args.vmax,
            best_fit: best.map(|(mh, ma, _)| (mh, ma)),
        },
    )?;

    info!(table = %out_table.display(), plot = %out_plot.display(), "results stored");
    Ok(())
}
