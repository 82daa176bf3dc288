//! Naming and point construction rules seen from outside the crate.

use build_metrics_domain::{
    BuildRun, FieldValue, Point, PointError, Precision, ProjectNameRenderer, UNKNOWN_PROJECT,
    sanitize_tag_key,
};

#[test]
fn derived_names_never_contain_path_separators() {
    let renderer = ProjectNameRenderer::default();
    for path in ["folder/sub/job", "/leading/slash/", "win\\style\\job", "with space/job"] {
        let name = renderer.render(&BuildRun::new(path, 1));
        assert!(!name.contains('/'), "{name}");
        assert!(!name.contains('\\'), "{name}");
    }
}

#[test]
fn override_and_prefix_combine() {
    let renderer = ProjectNameRenderer::new(Some("pre"), Some("custom"));
    assert_eq!(renderer.render(&BuildRun::new("folder/sub/job", 3)), "pre_custom");
}

#[test]
fn blank_project_path_renders_placeholder() {
    let renderer = ProjectNameRenderer::new(None, Some("   "));
    assert_eq!(renderer.render(&BuildRun::new("  ", 3)), UNKNOWN_PROJECT);
}

#[test]
fn sanitizer_only_touches_dashes_when_enabled() {
    assert_eq!(sanitize_tag_key("my-custom-tag", true), "my_custom_tag");
    assert_eq!(sanitize_tag_key("my-custom-tag", false), "my-custom-tag");
    let once = sanitize_tag_key("a-b_c-", true).into_owned();
    assert_eq!(sanitize_tag_key(&once, true), once);
}

#[test]
fn points_need_at_least_one_field() {
    let outcome = Point::builder("build_data").tag("project_name", "app").build();
    assert!(matches!(
        outcome,
        Err(PointError::NoFields { ref measurement }) if measurement == "build_data"
    ));
}

#[test]
fn fields_keep_their_types() -> Result<(), PointError> {
    let point = Point::builder("build_data")
        .field("build_number", 7_i64)
        .field("coverage", 87.5)
        .field("ok", true)
        .field("result", "SUCCESS")
        .timestamp(Precision::Seconds.from_epoch_millis(1_700_000_000_999))
        .build()?;

    assert_eq!(point.fields().get("build_number"), Some(&FieldValue::Integer(7)));
    assert_eq!(point.fields().get("coverage"), Some(&FieldValue::Float(87.5)));
    assert_eq!(point.fields().get("ok"), Some(&FieldValue::Boolean(true)));
    assert_eq!(point.timestamp(), 1_700_000_000);
    Ok(())
}
