use nomograph::{
    AxisSpec, BlockSpec, BuildConfig, Error, GlobalTransform, Log10, Mapping, Nomogram, Role,
    ScaleModel, ScaleType, TickGenerator,
};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_sum_block_solves_the_third_axis() {
    init_logging();
    let build = Nomogram::new()
        .block(
            BlockSpec::sum()
                .axis(Role::F1, AxisSpec::new(0.0, 10.0))
                .axis(Role::F2, AxisSpec::new(0.0, 10.0))
                .axis(Role::F3, AxisSpec::new(0.0, -10.0))
                .isopleth([Some(6.0), Some(2.0), None]),
        )
        .build();

    assert!(build.issues.is_empty(), "{:?}", build.issues);
    // 6 + 2 + (-8) = 0
    let value = build.solved_value(0, 0).unwrap();
    assert!((value + 8.0).abs() < 1e-9);
}

#[test]
fn test_product_block_solves_in_log_space() {
    let build = Nomogram::new()
        .block(
            BlockSpec::product()
                .axis(Role::F1, AxisSpec::new(200.0, 300.0).tag("dH"))
                .axis(Role::F2, AxisSpec::new(0.2, 0.3).scale_type(ScaleType::Linear))
                .axis(Role::F3, AxisSpec::new(500.0, 1500.0))
                .isopleth([Some(240.0), Some(0.24), None]),
        )
        .build();

    assert!(build.issues.is_empty(), "{:?}", build.issues);
    let value = build.solved_value(0, 0).unwrap();
    assert!((value - 1000.0).abs() < 1e-6);
}

#[test]
fn test_compound_block_solves_through_the_curve() {
    // u^2 / 4 + (-2 v) * w + w^2 = 0
    let build = Nomogram::new()
        .block(
            BlockSpec::compound()
                .axis(Role::F1, AxisSpec::new(6.0, 12.0).function(|u: f64| u * u / 4.0))
                .axis(Role::F2, AxisSpec::new(7.0, 15.0).function(|v: f64| -2.0 * v))
                .axis(
                    Role::F3,
                    AxisSpec::new(0.5, 2.0)
                        .function(|w: f64| w)
                        .companion(|w: f64| w * w),
                )
                .isopleth([Some(10.5), None, Some(1.25)]),
        )
        .build();

    assert!(build.issues.is_empty(), "{:?}", build.issues);
    let value = build.solved_value(0, 0).unwrap();
    assert!((value - 11.65).abs() < 1e-6, "got {value}");
}

#[test]
fn test_compound_block_solves_for_the_curve_parameter() {
    let build = Nomogram::new()
        .block(
            BlockSpec::compound()
                .axis(Role::F1, AxisSpec::new(6.0, 12.0).function(|u: f64| u * u / 4.0))
                .axis(Role::F2, AxisSpec::new(7.0, 15.0).function(|v: f64| -2.0 * v))
                .axis(
                    Role::F3,
                    AxisSpec::new(0.5, 2.0)
                        .function(|w: f64| w)
                        .companion(|w: f64| w * w),
                )
                .isopleth([Some(10.5), Some(11.65), None]),
        )
        .build();

    let w = build.solved_value(0, 0).unwrap();
    let residual = 10.5f64.powi(2) / 4.0 - 2.0 * 11.65 * w + w * w;
    assert!(residual.abs() < 1e-5, "w = {w}, residual {residual}");
}

#[test]
fn test_quotient_block_uses_the_turning_axis() {
    let build = Nomogram::new()
        .block(
            BlockSpec::quotient()
                .axis(Role::F1, AxisSpec::new(1.0, 10.0))
                .axis(Role::F2, AxisSpec::new(1.0, 10.0))
                .axis(Role::F3, AxisSpec::new(2.0, 20.0))
                .axis(Role::F4, AxisSpec::new(1.0, 5.0))
                .isopleth([Some(6.0), Some(3.0), Some(4.0), None]),
        )
        .build();

    assert!(build.issues.is_empty(), "{:?}", build.issues);
    // 6 / 3 = 4 / 2
    assert!((build.solved_value(0, 0).unwrap() - 2.0).abs() < 1e-6);
    let isopleth = build.isopleth(0, 0).unwrap();
    assert_eq!(isopleth.path.len(), 2);
    // Both lines pass through the same point on the turning axis.
    let shared = isopleth.path[0]
        .iter()
        .any(|p| isopleth.path[1].iter().any(|q| p.distance(*q) < 1e-9));
    assert!(shared);
}

#[test]
fn test_determinant_block_with_corner_fit() {
    // The sum relation written as det[[0, u, 1], [0.5, -v/2, 1], [1, w, 1]] = 0
    let block = BlockSpec::determinant()
        .fit_corners(true)
        .axis(
            Role::F1,
            AxisSpec::new(0.0, 10.0).homogeneous(|_: f64| 0.0, |u: f64| u, |_: f64| 1.0),
        )
        .axis(
            Role::F2,
            AxisSpec::new(0.0, 10.0).homogeneous(|_: f64| 0.5, |v: f64| -v / 2.0, |_: f64| 1.0),
        )
        .axis(
            Role::F3,
            AxisSpec::new(-20.0, 0.0).homogeneous(|_: f64| 1.0, |w: f64| w, |_: f64| 1.0),
        )
        .isopleth([Some(6.0), None, Some(-8.0)]);
    let build = Nomogram::new().block(block).build();

    assert!(build.issues.is_empty(), "{:?}", build.issues);
    assert!((build.solved_value(0, 0).unwrap() - 2.0).abs() < 1e-6);
}

#[test]
fn test_grid_block_solves_the_surface() {
    let block = BlockSpec::grid(|u: f64, v: f64| u * v)
        .axis(Role::F1, AxisSpec::new(1.0, 10.0))
        .axis(Role::F2, AxisSpec::new(1.0, 5.0))
        .isopleth([Some(3.0), None, Some(12.0)]);
    let build = Nomogram::new().block(block).build();

    assert!(build.issues.is_empty(), "{:?}", build.issues);
    assert!((build.solved_value(0, 0).unwrap() - 4.0).abs() < 1e-6);
    assert!(!build.document.guides.is_empty());
}

#[test]
fn test_non_monotonic_grid_is_reported() {
    let block = BlockSpec::grid(|u: f64, v: f64| (u - 5.0).powi(2) + v)
        .axis(Role::F1, AxisSpec::new(1.0, 10.0))
        .axis(Role::F2, AxisSpec::new(1.0, 5.0));
    let build = Nomogram::new().block(block).build();

    assert_eq!(build.issues.len(), 1);
    assert!(matches!(
        build.issues[0].error,
        Error::NonMonotonicDerivedScale { .. }
    ));
    assert!(build.document.axes.is_empty());
}

#[test]
fn test_known_value_outside_domain_is_rejected() {
    let build = Nomogram::new()
        .block(
            BlockSpec::sum()
                .axis(Role::F1, AxisSpec::new(0.0, 10.0))
                .axis(Role::F2, AxisSpec::new(0.0, 10.0))
                .axis(Role::F3, AxisSpec::new(0.0, -10.0))
                .isopleth([Some(11.0), Some(2.0), None]),
        )
        .build();

    assert_eq!(build.issues.len(), 1);
    assert!(matches!(build.issues[0].error, Error::OutOfDomain { .. }));
    assert!(build.solved_value(0, 0).is_none());
}

#[test]
fn test_manual_ticks_are_the_table_keys() {
    let spec = AxisSpec::new(1.0, 100.0)
        .function(|u: f64| u.ln())
        .scale_type(ScaleType::ManualLine)
        .manual([(2.0, "2"), (7.5, "7.5"), (40.0, "forty")]);
    let scale = spec.build_scale(200).unwrap();
    let ticks = TickGenerator::from_spec(&spec)
        .unwrap()
        .generate(&scale)
        .unwrap();

    let keys = [2.0f64, 7.5, 40.0];
    assert_eq!(ticks.len(), keys.len());
    for (tick, key) in ticks.iter().zip(keys) {
        assert_eq!(tick.value, key);
        assert_eq!(tick.position, key.ln());
    }
}

fn assert_round_trip(domain: (f64, f64), mapping: Arc<dyn Mapping>) {
    let (min, max) = domain;
    let scale = ScaleModel::construct(domain, mapping, None, 200).unwrap();
    for i in 0..=40 {
        let v = min + (max - min) * i as f64 / 40.0;
        let back = scale.value_at(scale.forward(v)).unwrap();
        assert!((back - v).abs() < 1e-6, "{v} came back as {back}");
    }
}

#[test]
fn test_scale_value_at_inverts_forward() {
    // Closed-form inverses and bisected ones alike
    assert_round_trip((0.0, 10.0), Arc::new(|u: f64| u));
    assert_round_trip((1.0, 1000.0), Arc::new(Log10));
    assert_round_trip((0.1, 4.0), Arc::new(|u: f64| u.exp() - u));
    assert_round_trip((-3.0, 2.0), Arc::new(|u: f64| -u.powi(3) - 2.0 * u));
}

#[test]
fn test_document_serializes_to_json() {
    let build = Nomogram::new()
        .page(21.0, 29.7)
        .block(
            BlockSpec::sum()
                .axis(Role::F1, AxisSpec::new(0.0, 10.0).title("a"))
                .axis(Role::F2, AxisSpec::new(0.0, 10.0).title("b"))
                .axis(Role::F3, AxisSpec::new(0.0, -20.0).title("c"))
                .isopleth([Some(4.0), Some(5.0), None]),
        )
        .transform(GlobalTransform::ScalePaper)
        .build();

    let json = serde_json::to_value(&build.document).unwrap();
    assert_eq!(json["width"], 21.0);
    assert_eq!(json["axes"].as_array().unwrap().len(), 3);
    assert_eq!(json["axes"][0]["style"], "line");
    assert_eq!(json["isopleths"][0]["unknown"], "F3");

    let config = serde_json::to_string(&BuildConfig::default()).unwrap();
    assert!(config.contains("curve_samples"));
}
