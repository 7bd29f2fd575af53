//! Benchmarks for the likelihood kernel.
//!
//! Run:
//! - cargo bench

use std::fs;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use higgsfit::couplings::ReducedCouplings;
use higgsfit::likelihood::LikelihoodCalc;

const DATASET: &str = r#"
[[measurement]]
id = "gamgam"
kind = "normal2d"
decay = "gammagamma"
rho = -0.13
x = { channels = [["ggh", 1.0]], mu = 1.03, sigma_p = 0.11, sigma_m = 0.11 }
y = { channels = [["vbf", 1.0]], mu = 1.31, sigma_p = 0.26, sigma_m = 0.23 }

[[measurement]]
id = "zz"
kind = "normal2d"
decay = "zz"
rho = -0.21
x = { channels = [["ggh", 1.0]], mu = 0.94, sigma_p = 0.11, sigma_m = 0.10 }
y = { channels = [["vbf", 1.0]], mu = 1.25, sigma_p = 0.50, sigma_m = 0.41 }

[[measurement]]
id = "ww"
kind = "normal1d"
decay = "ww"
channels = [["ggh", 0.88], ["vbf", 0.12]]
mu = 1.05
sigma_p = 0.11
sigma_m = 0.10

[[measurement]]
id = "tautau"
kind = "normal1d"
decay = "tautau"
channels = [["ggh", 0.6], ["vbf", 0.4]]
mu = 0.95
sigma_p = 0.16
sigma_m = 0.15

[[measurement]]
id = "bb"
kind = "normal1d"
decay = "bb"
channels = [["wh", 0.55], ["zh", 0.45]]
mu = 1.02
sigma_p = 0.18
sigma_m = 0.17
"#;

fn setup() -> LikelihoodCalc {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "higgsfit_bench_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("measurements.toml"), DATASET).unwrap();
    let list = dir.join("bench.list");
    fs::write(&list, "measurements.toml\n").unwrap();
    LikelihoodCalc::read_exp_input(&list).unwrap()
}

fn bench_compute(c: &mut Criterion) {
    let calc = setup();
    let mut group = c.benchmark_group("likelihood_compute");
    group.sample_size(50);

    group.bench_function("single_point", |b| {
        let xml = ReducedCouplings::universal(125.09, 1.05, 0.95).user_input_per_channel();
        b.iter(|| black_box(calc.compute(black_box(&xml)).unwrap()))
    });

    group.bench_function("payload_and_point", |b| {
        b.iter(|| {
            let xml = ReducedCouplings::universal(125.09, black_box(1.05), black_box(0.95))
                .user_input_per_channel();
            black_box(calc.compute(&xml).unwrap())
        })
    });

    group.bench_function("grid_row_20", |b| {
        b.iter(|| {
            let mut best = f64::INFINITY;
            for i in 0..20 {
                let cf = 0.6 + i as f64 / 19.0;
                let xml = ReducedCouplings::universal(125.09, 1.0, cf).user_input_per_channel();
                let v = calc.compute(&xml).unwrap();
                if v < best {
                    best = v;
                }
            }
            black_box(best)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_compute);
criterion_main!(benches);
