//! Estimation engine tests against the built-in catalog

use promptprint::config::AppConfig;
use promptprint::services::Estimator;

fn create_estimator() -> Estimator {
    Estimator::from_config(&AppConfig::builtin()).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}

#[test]
fn test_formulas_hold_for_every_model() {
    let estimator = create_estimator();

    for n in [0usize, 1, 4, 57, 1000, 32_768] {
        for coefficient in estimator.table().iter() {
            let result = estimator.estimate(&coefficient.model_id, n).unwrap();
            let tokens = n as f64;

            assert_close(result.total_energy, tokens * coefficient.energy_per_kilo_token / 1000.0);
            assert_close(result.co2_emissions, result.total_energy * 0.475);
            assert_close(result.estimated_time, coefficient.base_latency / 100.0 * tokens);

            assert!(result.total_energy >= 0.0);
            assert!(result.co2_emissions >= 0.0);
            assert!(result.estimated_time >= 0.0);
        }
    }
}

#[test]
fn test_result_set_follows_catalog_order() {
    let estimator = create_estimator();
    let names: Vec<String> = estimator.estimate_all(10).into_iter().map(|r| r.name).collect();

    assert_eq!(names, AppConfig::builtin().model_ids());
}

#[test]
fn test_llama3_card() {
    let estimator = create_estimator();
    let card = estimator.estimate("Llama 3", 4).unwrap().card();

    assert_eq!(card.energy_per_token, "0.037240 Wh");
    assert_eq!(card.total_energy, "0.1490 Wh");
    assert_eq!(card.co2_emissions, "0.0708 gCO₂e");
    assert_eq!(card.estimated_time, "0.08s");
    assert_eq!(card.token_count, "4");
}

#[test]
fn test_impact_summary_for_whole_catalog() {
    let estimator = create_estimator();
    let results = estimator.estimate_all(1000);
    let summary = estimator.summarize(&results);

    let energy_sum = 37.24 + 2.72 + 15.33 + 6.18 + 40.22;
    let expected_co2 = energy_sum * 0.475;

    assert_close(summary.total_co2, expected_co2);
    assert_close(summary.equivalencies.car_miles, expected_co2 / 404.0);
    assert_close(summary.equivalencies.light_bulb_hours, expected_co2 / 11.0);
    assert_close(summary.equivalencies.smartphone_charges, expected_co2 / 2.3);
    assert_close(summary.equivalencies.tree_seconds, expected_co2 / 0.0138);
    assert_eq!(summary.display.car_miles, format!("{:.4}", expected_co2 / 404.0));
}

#[test]
fn test_equivalency_doubles_with_emissions() {
    let estimator = create_estimator();

    for co2 in [0.0, 0.070756, 1.5, 48.3] {
        let single = estimator.equivalency(co2);
        let double = estimator.equivalency(2.0 * co2);

        assert_close(double.car_miles, 2.0 * single.car_miles);
        assert_close(double.light_bulb_hours, 2.0 * single.light_bulb_hours);
        assert_close(double.smartphone_charges, 2.0 * single.smartphone_charges);
        assert!((double.tree_seconds - 2.0 * single.tree_seconds).abs() < 1e-6);
    }
}

#[test]
fn test_empty_result_set_has_positive_zero_figures() {
    let estimator = create_estimator();
    let summary = estimator.summarize(&[]);

    assert_eq!(summary.total_co2, 0.0);
    assert!(summary.total_co2.is_sign_positive());
    assert_eq!(serde_json::to_value(&summary).unwrap()["totalCo2"], serde_json::json!(0.0));
    assert_eq!(summary.display.car_miles, "0.0000");
    assert_eq!(summary.display.light_bulb_hours, "0.00");
    assert_eq!(summary.display.smartphone_charges, "0.00");
    assert_eq!(summary.display.tree_seconds, "0");
}
