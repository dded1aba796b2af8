use nomograph::{
    AxisDocument, AxisSpec, BlockSpec, Build, BuildConfig, Error, GlobalTransform, Nomogram, Role,
};

fn left() -> BlockSpec {
    BlockSpec::sum()
        .axis(Role::F1, AxisSpec::new(0.0, 10.0))
        .axis(Role::F2, AxisSpec::new(0.0, 10.0))
        .axis(Role::F3, AxisSpec::new(0.0, -20.0).tag("s"))
}

fn right() -> BlockSpec {
    BlockSpec::sum()
        .axis(Role::F1, AxisSpec::new(0.0, 5.0))
        .axis(Role::F2, AxisSpec::new(0.0, 15.0))
        .axis(Role::F3, AxisSpec::new(0.0, -20.0).tag("s"))
        .size(6.0, 4.0)
        .isopleth([Some(3.0), None, Some(-12.0)])
}

fn tagged<'a>(build: &'a Build, block: usize) -> &'a AxisDocument {
    build
        .document
        .axes_of(block)
        .find(|axis| axis.tag.as_deref() == Some("s"))
        .unwrap()
}

fn assert_same_path(a: &AxisDocument, b: &AxisDocument) {
    assert_eq!(a.path.len(), b.path.len());
    for (p, q) in a.path.iter().zip(&b.path) {
        assert!(p.distance(*q) < 1e-6, "{p:?} vs {q:?}");
    }
}

#[test]
fn test_shared_tag_is_independent_of_declaration_order() {
    let forward = Nomogram::new()
        .page(20.0, 10.0)
        .block(left())
        .block(right())
        .transform(GlobalTransform::ScalePaper)
        .build();
    let backward = Nomogram::new()
        .page(20.0, 10.0)
        .block(right())
        .block(left())
        .transform(GlobalTransform::ScalePaper)
        .build();
    assert!(forward.issues.is_empty(), "{:?}", forward.issues);
    assert!(backward.issues.is_empty(), "{:?}", backward.issues);

    // Within one build both blocks draw the tag on the same segment
    assert_same_path(tagged(&forward, 0), tagged(&forward, 1));
    assert_same_path(tagged(&backward, 0), tagged(&backward, 1));

    // And the page-fitted segment does not depend on which block came first
    assert_same_path(tagged(&forward, 0), tagged(&backward, 1));

    let a = forward.solved_value(1, 0).unwrap();
    let b = backward.solved_value(0, 0).unwrap();
    assert!((a - 9.0).abs() < 1e-6 && (b - 9.0).abs() < 1e-6);
}

#[test]
fn test_first_declared_block_anchors_the_tag() {
    let forward = Nomogram::new().block(left()).block(right()).build();
    let backward = Nomogram::new().block(right()).block(left()).build();
    assert!(forward.issues.is_empty(), "{:?}", forward.issues);
    assert!(backward.issues.is_empty(), "{:?}", backward.issues);

    // Whichever block comes first keeps its own frame
    let alone_left = Nomogram::new().block(left()).build();
    let alone_right = Nomogram::new().block(right()).build();
    assert_same_path(tagged(&forward, 0), tagged(&alone_left, 0));
    assert_same_path(tagged(&backward, 0), tagged(&alone_right, 0));

    assert_same_path(tagged(&forward, 0), tagged(&forward, 1));
    assert_same_path(tagged(&backward, 0), tagged(&backward, 1));

    let a = forward.solved_value(1, 0).unwrap();
    let b = backward.solved_value(0, 0).unwrap();
    assert!((a - 9.0).abs() < 1e-6 && (b - 9.0).abs() < 1e-6);
}

#[test]
fn test_conflicting_block_is_reported_and_skipped() {
    let curved = BlockSpec::sum()
        .axis(Role::F1, AxisSpec::new(0.0, 10.0))
        .axis(Role::F2, AxisSpec::new(0.0, 10.0))
        .axis(
            Role::F3,
            AxisSpec::new(0.0, -20.0).function(|u: f64| -(u * u)).tag("s"),
        );
    let build = Nomogram::new()
        .block(left())
        .block(right())
        .block(curved)
        .build();

    assert_eq!(build.issues.len(), 1);
    let issue = &build.issues[0];
    assert_eq!(issue.block, Some(2));
    assert!(matches!(&issue.error, Error::TagAlignmentConflict { tag, .. } if tag == "s"));
    assert!(issue.to_string().starts_with("block 2"));

    // The other blocks are still drawn and solved
    assert_eq!(build.document.axes_of(0).count(), 3);
    assert_eq!(build.document.axes_of(1).count(), 3);
    assert_eq!(build.document.axes_of(2).count(), 0);
    assert!(build.solved_value(1, 0).is_some());
}

#[test]
fn test_ladder_joins_two_chained_blocks() {
    let celsius = BlockSpec::sum()
        .axis(Role::F1, AxisSpec::new(0.0, 10.0))
        .axis(Role::F2, AxisSpec::new(0.0, 10.0))
        .axis(Role::F3, AxisSpec::new(0.0, -20.0).tag("x"));
    let percent = BlockSpec::sum()
        .axis(Role::F1, AxisSpec::new(0.0, 100.0).tag("y"))
        .axis(Role::F2, AxisSpec::new(0.0, 100.0))
        .axis(Role::F3, AxisSpec::new(0.0, -200.0));
    let ladder = BlockSpec::ladder()
        .axis(Role::F1, AxisSpec::new(0.0, -20.0).tag("x"))
        .axis(Role::F2, AxisSpec::new(0.0, 100.0).tag("y"))
        .isopleth([Some(-10.0), None]);

    let build = Nomogram::new()
        .block(celsius)
        .block(percent)
        .block(ladder)
        .build();
    assert!(build.issues.is_empty(), "{:?}", build.issues);

    // Halfway along one rail is halfway along the other
    assert!((build.solved_value(2, 0).unwrap() - 50.0).abs() < 1e-6);

    let rail = build
        .document
        .axes_of(0)
        .find(|axis| axis.role == Role::F3)
        .unwrap();
    let midpoint = rail.path[0].lerp(rail.path[1], 0.5);
    let rung = &build.isopleth(2, 0).unwrap().path[0];
    assert!(rung[0].distance(midpoint) < 1e-6);

    let other = build
        .document
        .axes_of(1)
        .find(|axis| axis.role == Role::F1)
        .unwrap();
    let midpoint = other.path[0].lerp(other.path[1], 0.5);
    assert!(rung[1].distance(midpoint) < 1e-6);
}

#[test]
fn test_global_rotation_keeps_solutions() {
    let plain = Nomogram::new().block(left()).block(right()).build();
    let rotated = Nomogram::new()
        .block(left())
        .block(right())
        .transform(GlobalTransform::Rotate(90.0))
        .transform(GlobalTransform::ScalePaper)
        .build();
    assert!(rotated.issues.is_empty(), "{:?}", rotated.issues);

    let a = plain.solved_value(1, 0).unwrap();
    let b = rotated.solved_value(1, 0).unwrap();
    assert!((a - b).abs() < 1e-6);

    // A vertical rail turns horizontal
    let path = &tagged(&rotated, 0).path;
    assert!((path[0].y - path[1].y).abs() < 1e-9);
    for point in rotated.document.axes.iter().flat_map(|axis| &axis.path) {
        assert!(point.x > -1e-9 && point.x < 10.0 + 1e-9);
        assert!(point.y > -1e-9 && point.y < 10.0 + 1e-9);
    }
}

#[test]
fn test_singular_global_transform_is_a_page_issue() {
    let build = Nomogram::new()
        .block(left())
        .transform(GlobalTransform::Scale { sx: 1.0, sy: 0.0 })
        .build();
    assert_eq!(build.issues.len(), 1);
    assert_eq!(build.issues[0].block, None);
    assert!(build.issues[0].to_string().starts_with("page"));
    assert_eq!(build.document.axes.len(), 3);
}

fn watts_to_dbw(watts: f64) -> f64 {
    10.0 * watts.log10()
}

fn power_dbw() -> BlockSpec {
    BlockSpec::sum()
        .axis(
            Role::F1,
            AxisSpec::new(watts_to_dbw(5.0), watts_to_dbw(100.0))
                .function(|u: f64| -u)
                .tag("p"),
        )
        .axis(Role::F2, AxisSpec::new(0.0, 10.0))
        .axis(Role::F3, AxisSpec::new(-5.0, 20.0))
}

fn power_watts() -> BlockSpec {
    BlockSpec::single().axis(
        Role::F1,
        AxisSpec::new(5.0, 100.0)
            .function(watts_to_dbw)
            .align(watts_to_dbw)
            .tag("p")
            .title("W"),
    )
}

#[test]
fn test_single_axis_lines_up_with_its_tag() {
    let build = Nomogram::new()
        .block(power_dbw())
        .block(power_watts())
        .transform(GlobalTransform::ScalePaper)
        .build();
    assert!(build.issues.is_empty(), "{:?}", build.issues);

    let dbw = build.document.axes_of(0).find(|axis| axis.role == Role::F1).unwrap();
    let watts = build.document.axes_of(1).next().unwrap();
    let (lo, hi) = (watts_to_dbw(5.0), watts_to_dbw(100.0));
    let on_dbw = |value: f64| dbw.path[0].lerp(dbw.path[1], (value - lo) / (hi - lo));

    // 5 W and 100 W sit on the ends of the dBW axis
    assert!(watts.path[0].distance(dbw.path[0]) < 1e-6);
    assert!(watts.path[1].distance(dbw.path[1]) < 1e-6);

    // Every watt label is drawn where its dBW value is
    assert!(!watts.ticks.is_empty());
    for tick in &watts.ticks {
        let expected = on_dbw(watts_to_dbw(tick.value));
        assert!(tick.anchor.distance(expected) < 1e-6, "{} W at {:?}", tick.value, tick.anchor);
    }
}

#[test]
fn test_aligned_single_axis_needs_its_tag_first() {
    let build = Nomogram::new()
        .block(power_watts())
        .block(power_dbw())
        .build();
    assert_eq!(build.issues.len(), 1);
    assert_eq!(build.issues[0].block, Some(0));
    assert!(matches!(build.issues[0].error, Error::Configuration(_)));
    assert_eq!(build.document.axes_of(0).count(), 0);
    assert_eq!(build.document.axes_of(1).count(), 3);
}

#[test]
fn test_untagged_single_axis_stands_alone() {
    let build = Nomogram::new()
        .block(BlockSpec::single().axis(Role::F1, AxisSpec::new(0.0, 50.0)))
        .build();
    assert!(build.issues.is_empty(), "{:?}", build.issues);
    let axis = build.document.axes_of(0).next().unwrap();
    assert_eq!(axis.path.len(), 2);
    assert!(!axis.ticks.is_empty());
    let length = axis.path[0].distance(axis.path[1]);
    assert!((length - BuildConfig::default().block_height).abs() < 1e-9);
}
