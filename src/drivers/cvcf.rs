//! drivers/cvcf.rs — (CV, CF) grid scan against a published combination.
//!
//! Scans the fermion-universal coupling plane, writes the 3-column table,
//! and renders the CL-band plot with the officially-published contour points
//! overlaid.

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use crate::config::FitConfig;
use crate::couplings::ReducedCouplings;
use crate::drivers::ensure_out_dir;
use crate::likelihood::LikelihoodCalc;
use crate::plot::{self, BandPlot, GridValues, Overlay};
use crate::scan::{BestFit, GridAxis, TableWriter, read_table};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Dataset {
    #[value(name = "atlas-higg-2020-16")]
    AtlasHigg202016,
    #[value(name = "cms-hig-22-001")]
    CmsHig22001,
    #[value(name = "atlas-higg-2018-57-stxs")]
    AtlasHigg201857Stxs,
}

/// Per-dataset scan defaults and plot cosmetics.
struct Preset {
    dir: &'static str,
    stem: &'static str,
    caption: &'static str,
    overlays: &'static [(&'static str, &'static str)],
    official_best: (f64, f64),
    hmass: f64,
    cv: (f64, f64),
    cf: (f64, f64),
    grid: usize,
    bands: usize,
    stxs: bool,
}

impl Dataset {
    fn preset(self) -> Preset {
        match self {
            Dataset::AtlasHigg202016 => Preset {
                dir: "atlas-higg-2020-16",
                stem: "cvcf-atlas-higg-2020-16",
                caption: "ATLAS HIGG-2020-16, Run 2 combination",
                overlays: &[("official.csv", "ATLAS official")],
                official_best: (1.0183206106870228, 1.0045454545454544),
                hmass: 125.38,
                cv: (0.85, 1.2),
                cf: (0.6, 1.6),
                grid: 100,
                bands: 2,
                stxs: false,
            },
            Dataset::CmsHig22001 => Preset {
                dir: "cms-hig-22-001",
                stem: "cvcf-cms-hig-22-001",
                caption: "CMS HIG-22-001, Run 2 combination",
                overlays: &[
                    ("official68.txt", "CMS official 68% CL"),
                    ("official95.txt", "CMS official 95% CL"),
                ],
                official_best: (1.014, 0.921),
                hmass: 125.38,
                cv: (0.9, 1.1),
                cf: (0.75, 1.05),
                grid: 100,
                bands: 3,
                stxs: false,
            },
            Dataset::AtlasHigg201857Stxs => Preset {
                dir: "atlas-higg-2018-57",
                stem: "cvcf-atlas-higg-2018-57-stxs",
                caption: "ATLAS HIGG-2018-57 STXS",
                overlays: &[("official.csv", "ATLAS official")],
                official_best: (1.053485254691689, 1.0492700729927007),
                hmass: 125.09,
                cv: (0.9, 1.2),
                cf: (0.7, 1.4),
                grid: 50,
                bands: 3,
                stxs: true,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct CvcfArgs {
    /// Published combination to fit against.
    #[arg(long, value_enum, default_value = "atlas-higg-2020-16")]
    pub dataset: Dataset,

    /// Higgs mass to test [GeV]; defaults to the dataset's value.
    #[arg(long)]
    pub hmass: Option<f64>,

    #[arg(long)]
    pub cv_min: Option<f64>,
    #[arg(long)]
    pub cv_max: Option<f64>,
    #[arg(long)]
    pub cf_min: Option<f64>,
    #[arg(long)]
    pub cf_max: Option<f64>,

    /// Grid steps per dimension (squared grid).
    #[arg(long)]
    pub grid: Option<usize>,

    /// Directory for the result table and the plot.
    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,
}

pub fn run(cfg: &FitConfig, args: &CvcfArgs) -> Result<(), Box<dyn Error>> {
    let preset = args.dataset.preset();
    let data_dir = cfg.data_dir.join(preset.dir);
    let hmass = args.hmass.unwrap_or(preset.hmass);
    let grid = args.grid.unwrap_or(preset.grid);
    let cv_axis = GridAxis::new(
        args.cv_min.unwrap_or(preset.cv.0),
        args.cv_max.unwrap_or(preset.cv.1),
        grid,
    );
    let cf_axis = GridAxis::new(
        args.cf_min.unwrap_or(preset.cf.0),
        args.cf_max.unwrap_or(preset.cf.1),
        grid,
    );

    info!(dataset = ?args.dataset, hmass, "reading experimental input");
    let mut calc = LikelihoodCalc::read_exp_input(data_dir.join("Run2.list"))?;
    if preset.stxs {
        calc.read_sm_pred(data_dir.join("sm-pred.toml"))?;
        calc.read_sm_corr(data_dir.join("sm-corr.toml"))?;
    }

    ensure_out_dir(&args.out_dir)?;
    let out_table = args.out_dir.join(format!("{}.out", preset.stem));
    let out_plot = args.out_dir.join(format!("{}.png", preset.stem));

    info!(grid, "running scan");
    let mut writer = TableWriter::create(&out_table, 5)?;
    let mut best = BestFit::new();
    for cv in cv_axis.values() {
        writer.blank_line()?;
        for cf in cf_axis.values() {
            let point = ReducedCouplings::universal(hmass, cv, cf);
            let m2logl = calc.compute(&point.user_input_per_channel())?;
            best.offer(m2logl, &[cv, cf]);
            writer.row(&[cv, cf, m2logl])?;
        }
    }
    writer.finish()?;

    info!(
        cv = best.params[0],
        cf = best.params[1],
        m2logl = best.m2logl,
        "scan finalized; minimum at (CV, CF)"
    );

    info!("plotting");
    let rows = read_table(&out_table)?;
    let grid_values = GridValues::from_rows(cv_axis, cf_axis, &rows, 2);
    let overlays = preset
        .overlays
        .iter()
        .map(|&(name, label)| {
            Ok(Overlay {
                points: plot::read_overlay_points(data_dir.join(name))?,
                label: label.to_string(),
            })
        })
        .collect::<Result<Vec<_>, Box<dyn Error>>>()?;
    plot::cl_band_plot(
        &out_plot,
        &grid_values,
        &BandPlot {
            caption: preset.caption,
            x_label: "C_V",
            y_label: "C_F",
            bands: preset.bands,
            best_fit: Some((best.params[0], best.params[1])),
            sm_marker: Some((1.0, 1.0)),
            overlays,
            official_best: Some(preset.official_best),
        },
    )?;

    info!(table = %out_table.display(), plot = %out_plot.display(), "results stored");
    Ok(())
}
