use gsc_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// Unused-key lint:
/// 1) unused keys are reported under Warn without error
/// 2) unused keys fail under Fail
/// 3) keys under consumed prefixes are never flagged
/// 4) pointers come back sorted

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let yaml = r#"
sync:
  creation_user: robot
unused_section:
  foo: 123
  bar: 456
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("config load must succeed");

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/unused_section/bar".to_string(), "/unused_section/foo".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = r#"
sync:
  staff_missing_date: conflict
stray: 1
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect_err("fail mode must error");
    let msg = format!("{err:#}");
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "unexpected message: {msg}");
    assert!(msg.contains("/stray"));
}

#[test]
fn consumed_sections_are_clean_even_in_fail_mode() {
    let yaml = r#"
countries:
  GB: ["U.K."]
  US: ["U.S.A.", "USA"]
sync:
  creation_user: robot
  staff_missing_date: no_change
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("all keys consumed");
    assert!(report.is_clean());
    assert_eq!(
        report.consumed_prefixes,
        vec!["/countries".to_string(), "/sync".to_string()]
    );
}

#[test]
fn near_miss_prefix_is_not_consumed() {
    let loaded = load_layered_yaml_from_strings(&["syncs:\n  a: 1\n"]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/syncs/a".to_string()]);
}
