// Entry point: dispatches the analysis subcommands.

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use higgsfit::config::FitConfig;
use higgsfit::drivers::{cvcf, stu_profile, stu_scan, theory_line, theory_map};

#[derive(Parser)]
#[command(name = "higgsfit")]
#[command(about = "Higgs-sector coupling fits and confidence-region plots")]
#[command(version)]
struct Cli {
    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    /// Optional configuration file
    #[arg(long, global = true, default_value = "higgsfit.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// (CV, CF) grid scan against a published combination
    Cvcf(cvcf::CvcfArgs),
    /// (mH, mA) scan with profiled nuisances and the STU constraint
    StuScan(stu_scan::StuScanArgs),
    /// Worker-parallel (mH, mA) profile with theory-consistency pruning
    StuProfile(stu_profile::StuProfileArgs),
    /// Theory-consistency map over (mH±, cos(b-a), tan(b))
    TheoryMap(theory_map::TheoryMapArgs),
    /// 1-D tan(beta) consistency line at fixed masses
    TheoryLine(theory_line::TheoryLineArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(cli.log_level).into())
                .from_env_lossy(),
        )
        .init();

    let cfg = FitConfig::load_or_default(&cli.config);
    match &cli.command {
        Command::Cvcf(args) => cvcf::run(&cfg, args),
        Command::StuScan(args) => stu_scan::run(&cfg, args),
        Command::StuProfile(args) => stu_profile::run(&cfg, args),
        Command::TheoryMap(args) => theory_map::run(&cfg, args),
        Command::TheoryLine(args) => theory_line::run(&cfg, args),
    }
}
