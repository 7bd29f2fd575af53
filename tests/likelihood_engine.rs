use std::fs;
use std::path::PathBuf;

use higgsfit::couplings::ReducedCouplings;
use higgsfit::likelihood::LikelihoodCalc;

fn unique_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "higgsfit_engine_test_{}_{}",
        name,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&p).unwrap();
    p
}

const DATASET: &str = r#"
[[measurement]]
id = "gamgam-ggh"
kind = "normal1d"
decay = "gammagamma"
channels = [["ggh", 1.0]]
mu = 1.10
sigma_p = 0.10
sigma_m = 0.10

[[measurement]]
id = "zz-pair"
kind = "normal2d"
decay = "zz"
rho = 0.0
x = { channels = [["ggh", 1.0]], mu = 1.00, sigma_p = 0.20, sigma_m = 0.20 }
y = { channels = [["vbf", 1.0]], mu = 1.00, sigma_p = 0.40, sigma_m = 0.40 }
"#;

fn write_dataset(dir: &PathBuf) -> PathBuf {
    fs::write(dir.join("measurements.toml"), DATASET).unwrap();
    let list = dir.join("test.list");
    fs::write(&list, "# inline dataset\nmeasurements.toml\n").unwrap();
    list
}

#[test]
fn sm_point_chi2_matches_hand_computation() {
    let dir = unique_dir("sm");
    let list = write_dataset(&dir);
    let calc = LikelihoodCalc::read_exp_input(&list).unwrap();

    // At the SM point every predicted mu is 1, so only the gamgam
    // measurement pulls: ((1 - 1.1)/0.1)^2 = 1.
    let xml = ReducedCouplings::universal(125.09, 1.0, 1.0).user_input_per_channel();
    let m2logl = calc.compute(&xml).unwrap();
    assert!((m2logl - 1.0).abs() < 1e-9, "m2logl = {m2logl}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn grid_minimum_moves_toward_the_excess() {
    let dir = unique_dir("grid");
    let list = write_dataset(&dir);
    let calc = LikelihoodCalc::read_exp_input(&list).unwrap();

    // The dataset prefers a slight gamma-gamma excess; scanning CV at
    // fixed CF=1 must put the minimum above CV=1 (the photon loop grows
    // with CV).
    let mut best = (0.0, f64::INFINITY);
    for i in 0..60 {
        let cv = 0.8 + 0.4 * i as f64 / 59.0;
        let xml = ReducedCouplings::universal(125.09, cv, 1.0).user_input_per_channel();
        let m2logl = calc.compute(&xml).unwrap();
        if m2logl < best.1 {
            best = (cv, m2logl);
        }
    }
    assert!(best.0 > 1.0, "best CV = {}", best.0);
    assert!(best.1 < 1.0, "best m2logl = {}", best.1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_measurement_file_is_reported_with_its_path() {
    let dir = unique_dir("missing");
    let list = dir.join("broken.list");
    fs::write(&list, "nonexistent.toml\n").unwrap();
    let err = LikelihoodCalc::read_exp_input(&list).unwrap_err();
    assert!(err.to_string().contains("nonexistent.toml"), "err = {err}");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn empty_list_is_rejected() {
    let dir = unique_dir("empty");
    let list = dir.join("empty.list");
    fs::write(&list, "# nothing here\n\n").unwrap();
    assert!(LikelihoodCalc::read_exp_input(&list).is_err());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn sm_pred_needs_a_multivariate_measurement() {
    let dir = unique_dir("smpred");
    let list = write_dataset(&dir);
    let pred = dir.join("sm-pred.toml");
    fs::write(&pred, "sigma = [0.1, 0.1]\n").unwrap();
    let mut calc = LikelihoodCalc::read_exp_input(&list).unwrap();
    assert!(calc.read_sm_pred(&pred).is_err());
    let _ = fs::remove_dir_all(&dir);
}
