//! Tests for the CLV projection model

use retailscope::pipeline::*;

#[test]
fn test_reference_scenario() {
    let clv = project_clv(50.0, 0.25, 0.60, 0.10).unwrap();
    assert!((clv - 15.0).abs() < 1e-9, "expected 15.0, got {}", clv);
}

#[test]
fn test_near_boundary_is_defined() {
    let scenario = ClvScenario::new(50.0, 0.25, 0.90, 0.0);
    assert!((scenario.denominator() - 0.10).abs() < 1e-12);
    let clv = scenario.project().unwrap();
    assert!(clv.is_finite());
    assert!((clv - 112.5).abs() < 1e-6);
}

#[test]
fn test_zero_denominator_is_undefined() {
    let result = project_clv(50.0, 0.25, 1.0, 0.0);
    assert!(matches!(
        result,
        Err(ClvError::DegenerateDenominator { .. })
    ));

    let surface = sensitivity_surface_over(50.0, 0.0, &[0.5, 1.0], &[0.25]);
    assert!(surface.get(0, 0).is_some());
    assert_eq!(surface.get(0, 1), None);
}

#[test]
fn test_monotone_in_retention() {
    let retention = linspace(0.1, 0.9, 17);
    let curve = retention_curve(50.0, 0.25, 0.10, &retention);
    let values: Vec<f64> = curve.iter().map(|p| p.clv.unwrap()).collect();
    assert!(
        values.windows(2).all(|w| w[1] >= w[0]),
        "CLV should not decrease with retention: {:?}",
        values
    );
}

#[test]
fn test_default_grid_is_fifteen_by_fifteen() {
    let surface = sensitivity_surface(80.0, 0.10, &GridSpec::default());
    assert_eq!(surface.retention_values.len(), 15);
    assert_eq!(surface.margin_values.len(), 15);
    assert_eq!(surface.values.len(), 15);
    assert!(surface.values.iter().flatten().all(|v| v.is_some()));
    assert_eq!(surface.retention_values[0], 0.3);
    assert_eq!(surface.margin_values[14], 0.4);
}

#[test]
fn test_surface_rows_monotone_in_retention() {
    let surface = sensitivity_surface(80.0, 0.10, &GridSpec::default());
    for row in &surface.values {
        let row: Vec<f64> = row.iter().map(|v| v.unwrap()).collect();
        assert!(row.windows(2).all(|w| w[1] >= w[0]));
    }
}

#[test]
fn test_predefined_scenarios_against_baseline() {
    let baseline = ClvScenario::baseline(120.0);
    assert_eq!(baseline.margin_rate, 0.20);
    assert_eq!(baseline.retention_rate, 0.60);
    assert_eq!(baseline.discount_rate, 0.10);

    let scenarios = predefined_scenarios(&baseline);
    let names: Vec<&str> = scenarios.iter().map(|(n, _)| *n).collect();
    assert_eq!(names, vec!["Optimistic", "Aggressive", "Conservative"]);

    let comparisons = compare_scenarios(&baseline, &scenarios);
    let base = baseline.project().unwrap();
    for cmp in &comparisons {
        let clv = cmp.clv.unwrap();
        assert!((cmp.delta.unwrap() - (clv - base)).abs() < 1e-9);
    }
    assert!(comparisons[2].delta_pct.unwrap() < 0.0);
}

#[test]
fn test_initiative_roi_from_scenarios() {
    let baseline = ClvScenario::baseline(100.0);
    let optimistic = predefined_scenarios(&baseline)[0].1;
    let roi = initiative_roi(
        baseline.project().unwrap(),
        optimistic.project().unwrap(),
        200,
        1000.0,
    );
    assert!(roi.value_created > 0.0);
    assert!(roi.roi_pct.is_some());
    assert!(roi.payback_days.unwrap() > 0.0);
}
