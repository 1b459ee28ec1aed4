//! Tests for the `fixture` binary.

use predicates::prelude::*;
use std::fs;

use crate::common::{FixtureProject, toml_blocks};

#[test]
fn test_shared_dependency_declared_once_and_first() {
    let project = FixtureProject::with_shop();
    let stdout = project.generate(&["shop.Offer", "--where", "id = 1"]);

    assert_eq!(toml_blocks(&stdout), vec!["CategoryData", "ProductData", "OfferData"]);
    assert_eq!(stdout.matches("[CategoryData.category_9]").count(), 1);
    assert_eq!(stdout.matches("ref = \"CategoryData.category_9\"").count(), 2);
    assert!(!stdout.contains("category_10"));

    let parsed: toml::Table = toml::from_str(&stdout).unwrap();
    assert_eq!(parsed["OfferData"]["offer_1"]["name"].as_str(), Some("jersey on sale"));
}

#[test]
fn test_all_rows_without_filter() {
    let project = FixtureProject::with_shop();
    let stdout = project.generate(&["shop.Offer"]);

    assert!(stdout.contains("[OfferData.offer_1]"));
    assert!(stdout.contains("[OfferData.offer_2]"));
    assert!(stdout.contains("[CategoryData.category_10]"));
    assert!(stdout.contains("[ProductData.product_2]"));
    assert_eq!(toml_blocks(&stdout).len(), 3);
}

#[test]
fn test_header_names_object_and_handler() {
    let project = FixtureProject::with_shop();
    project
        .fixture()
        .args(["shop.Category", "-w", "id = 9"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "# Fixture data for shop.Category generated by fixturegen (store handler)",
        ))
        .stdout(predicate::str::contains("table = \"categories\""));
}

#[test]
fn test_yaml_template() {
    let project = FixtureProject::with_shop();
    let stdout = project.generate(&["shop.Product", "-w", "id = 1", "--template", "yaml"]);

    let parsed: serde_yaml::Value = serde_yaml::from_str(&stdout).unwrap();
    assert_eq!(parsed["fixture"]["template"].as_str(), Some("yaml"));
    assert_eq!(
        parsed["ProductData"]["rows"]["product_1"]["category_id"]["ref"].as_str(),
        Some("CategoryData.category_9")
    );
    assert_eq!(parsed["ProductData"]["requires"][0].as_str(), Some("CategoryData"));
}

#[test]
fn test_prefix_and_suffix() {
    let project = FixtureProject::with_shop();
    let stdout =
        project.generate(&["shop.Product", "-w", "id = 1", "--prefix", "Fx", "--suffix", "Row"]);
    assert_eq!(toml_blocks(&stdout), vec!["FxCategoryRow", "FxProductRow"]);
}

#[test]
fn test_output_file() {
    let project = FixtureProject::with_shop();
    project
        .fixture()
        .args(["shop.Offer", "-w", "id = 2", "-o", "offer.toml"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(project.path().join("offer.toml")).unwrap();
    assert!(text.contains("[OfferData.offer_2]"));
    assert!(text.contains("[CategoryData.category_10]"));
}

#[test]
fn test_env_directory_searched() {
    let project = FixtureProject::new();
    project.write("shared/shop.json", fixturegen::test_utils::SHOP_JSON);

    project
        .fixture()
        .args(["shop.Category", "-w", "id = 9"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("importable? NO"));

    let stdout = project.generate(&["shop.Category", "-w", "id = 9", "--env", "shared"]);
    assert!(stdout.contains("[CategoryData.category_9]"));
}

#[test]
fn test_nested_module_and_file_form() {
    let project = FixtureProject::new();
    project.write("stores/retail/shop.yaml", &yaml_shop());

    let stdout = project.generate(&["stores.retail.shop.Category", "-w", "id = 10"]);
    assert!(stdout.contains("[CategoryData.category_10]"));

    let stdout = project.generate(&["stores/retail/shop.yaml:Category", "-w", "id = 10"]);
    assert!(stdout.contains("[CategoryData.category_10]"));
}

#[test]
fn test_dsn_supplies_rows() {
    let project = FixtureProject::with_shop();
    project.write(
        "snapshot.json",
        r#"{
  "models": {
    "Category": { "rows": [{ "id": 9, "name": "outerwear" }] },
    "Product": { "rows": [{ "id": 7, "name": "anorak", "category_id": 9 }] }
  }
}"#,
    );

    let stdout = project.generate(&["shop.Product", "--dsn", "file:snapshot.json"]);
    assert!(stdout.contains("[ProductData.product_7]"));
    assert!(stdout.contains("\"outerwear\""));
    assert!(!stdout.contains("jersey"));
}

#[test]
fn test_no_data_exits_2() {
    let project = FixtureProject::with_shop();
    project
        .fixture()
        .args(["shop.Offer", "-w", "id = 99"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("NoData: no data returned for 'shop.Offer' (where id = 99)"));
}

#[test]
fn test_unrecognized_object_exits_2() {
    let project = FixtureProject::with_shop();
    project
        .fixture()
        .arg("shop.Coupon")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("UnrecognizedObject"))
        .stderr(predicate::str::contains("tried handlers: store"));
}

#[test]
fn test_usage_errors_exit_2() {
    let project = FixtureProject::with_shop();

    project
        .fixture()
        .args(["shop.Offer", "--template", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("UsageError: unknown template 'xml'"));

    project
        .fixture()
        .args(["shop.Offer", "--require-handler", "sql"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required handler 'sql' is not registered"));

    project
        .fixture()
        .args(["shop.Offer", "--where", "id ~ 1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("UsageError"));
}

#[test]
fn test_class_name_colliding_with_preamble_exits_2() {
    let project = FixtureProject::new();
    project.write("meta.json", r#"{"models": {"fixture": {"key": "id", "rows": [{"id": 1}]}}}"#);

    project
        .fixture()
        .args(["meta.fixture", "--suffix", ""])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("class name 'fixture'"));

    let stdout = project.generate(&["meta.fixture"]);
    assert!(stdout.contains("[fixtureData.fixture_1]"));
}

#[test]
fn test_missing_object_path_is_usage_error() {
    let project = FixtureProject::new();
    project.fixture().assert().code(2);
}

#[test]
fn test_bad_dsn_is_misconfigured() {
    let project = FixtureProject::with_shop();
    project
        .fixture()
        .args(["shop.Offer", "--dsn", "missing.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("MisconfiguredHandler"))
        .stderr(predicate::str::contains("cannot load DSN 'missing.json'"));
}

#[test]
fn test_circular_reference_exits_1() {
    let project = FixtureProject::new();
    fixturegen::test_utils::StoreFixture::cyclic().write_to(project.path()).unwrap();

    project
        .fixture()
        .args(["staff.Employee", "-w", "id = 1"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("circular reference detected"))
        .stderr(predicate::str::contains("Employee#1 → Employee#2 → Employee#1"));
}

#[test]
fn test_null_reference_is_not_followed() {
    let project = FixtureProject::new();
    fixturegen::test_utils::StoreFixture::cyclic().write_to(project.path()).unwrap();

    let stdout = project.generate(&["staff.Employee", "-w", "id = 3"]);
    assert!(stdout.contains("[EmployeeData.employee_3]"));
    assert!(!stdout.contains("manager_id"));
}

#[test]
fn test_dangling_reference_exits_1() {
    let project = FixtureProject::new();
    project.write(
        "shop.json",
        r#"{
  "models": {
    "Category": { "key": "id", "rows": [] },
    "Product": {
      "key": "id",
      "references": { "category_id": "Category" },
      "rows": [{ "id": 1, "category_id": 404 }]
    }
  }
}"#,
    );

    project
        .fixture()
        .arg("shop.Product")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("record 'Category' with id '404' not found"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let project = FixtureProject::with_shop();
    let output = project
        .fixture()
        .args(["-v", "shop.Offer", "-w", "id = 1"])
        .assert()
        .success();

    let stderr = String::from_utf8_lossy(&output.get_output().stderr);
    assert!(stderr.contains("Generated 3 records in 3 blocks"), "stderr: {stderr}");
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(!stdout.contains("DEBUG"));
}

fn yaml_shop() -> String {
    r"models:
  Category:
    key: id
    rows:
      - { id: 9, name: parkas }
      - { id: 10, name: rebates }
"
    .to_string()
}
