//! The config fingerprint identifies what a run was configured with.
//!
//! GREEN when:
//! - YAML formatting (key order, flow vs block style, comments) does not move
//!   the fingerprint
//! - any value change does
//! - a site overlay changes one leaf and keeps the rest of the base
//! - empty overlay layers are invisible

use gsc_config::{load_layered_yaml_from_strings, LoadedConfig};

const SHIPPED: &str = "
sync:
  creation_user: ih-sync
  staff_missing_date: conflict
countries:
  GB: [U.K., United Kingdom]
  US: [U.S.A., United States]
";

const SHIPPED_REFORMATTED: &str = "
# same content, different layout
countries:
  US:
    - U.S.A.
    - United States
  GB:
    - U.K.
    - United Kingdom
sync: {staff_missing_date: conflict, creation_user: ih-sync}
";

const SITE_OVERLAY: &str = "
sync:
  staff_missing_date: no_change
";

fn load(layers: &[&str]) -> LoadedConfig {
    load_layered_yaml_from_strings(layers).unwrap()
}

#[test]
fn formatting_does_not_move_the_fingerprint() {
    let a = load(&[SHIPPED]);
    let b = load(&[SHIPPED_REFORMATTED]);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn alias_order_is_content() {
    let a = load(&[SHIPPED]);
    let swapped = SHIPPED.replace("[U.K., United Kingdom]", "[United Kingdom, U.K.]");
    let b = load(&[swapped.as_str()]);
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn site_overlay_changes_one_leaf() {
    let base = load(&[SHIPPED]);
    let site = load(&[SHIPPED, SITE_OVERLAY]);
    assert_ne!(base.config_hash, site.config_hash);

    let settings = site.sync_settings().unwrap();
    assert_eq!(
        settings.staff_missing_date(),
        gsc_config::StaffMissingDatePolicy::NoChange
    );
    assert_eq!(settings.creation_user(), "ih-sync");
    assert_eq!(settings.countries.len(), 2);
}

#[test]
fn empty_layers_are_invisible() {
    let plain = load(&[SHIPPED]);
    let padded = load(&["", SHIPPED, "# nothing here\n"]);
    assert_eq!(plain.config_hash, padded.config_hash);
}

#[test]
fn fingerprint_is_sha256_hex() {
    let h = load(&[SHIPPED]).config_hash;
    assert_eq!(h.len(), 64);
    assert!(h.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
}
