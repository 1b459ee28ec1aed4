//! Tests for layered configuration.

use predicates::prelude::*;

use crate::common::{FixtureProject, toml_blocks};

#[test]
fn test_project_config_applies() {
    let project = FixtureProject::with_shop();
    project.write("fixturegen.toml", "prefix = \"Proj\"\nsuffix = \"\"\n");

    let stdout = project.generate(&["shop.Product", "-w", "id = 1"]);
    assert_eq!(toml_blocks(&stdout), vec!["ProjCategory", "ProjProduct"]);
}

#[test]
fn test_flags_win_over_project_config() {
    let project = FixtureProject::with_shop();
    project.write("fixturegen.toml", "template = \"yaml\"\nsuffix = \"Row\"\n");

    let stdout =
        project.generate(&["shop.Product", "-w", "id = 1", "--template", "toml", "--suffix", "Fx"]);
    assert_eq!(toml_blocks(&stdout), vec!["CategoryFx", "ProductFx"]);
}

#[test]
fn test_config_env_resolved_against_config_dir() {
    let project = FixtureProject::new();
    project.write("data/shop.json", fixturegen::test_utils::SHOP_JSON);
    project.write("conf/fixtures.toml", "env = [\"../data\"]\ntemplate = \"yaml\"\n");

    let stdout = project.generate(&[
        "shop.Category",
        "-w",
        "id = 9",
        "--config",
        "conf/fixtures.toml",
    ]);
    let parsed: serde_yaml::Value = serde_yaml::from_str(&stdout).unwrap();
    assert_eq!(parsed["CategoryData"]["rows"]["category_9"]["name"].as_str(), Some("parkas"));
}

#[test]
fn test_config_dsn_resolved_against_config_dir() {
    let project = FixtureProject::with_shop();
    project.write(
        "conf/snapshot.json",
        r#"{"models": {"Category": {"rows": [{"id": 9, "name": "outerwear"}]}}}"#,
    );
    project.write("conf/fixtures.toml", "dsn = \"file:snapshot.json\"\n");

    let stdout = project.generate(&[
        "shop.Category",
        "-w",
        "id = 9",
        "--config",
        "conf/fixtures.toml",
    ]);
    assert!(stdout.contains("\"outerwear\""));
    assert!(!stdout.contains("parkas"));
}

#[test]
fn test_config_from_environment_variable() {
    let project = FixtureProject::with_shop();
    let config = project.write("alt.toml", "prefix = \"Env\"\n");

    let output = project
        .fixture()
        .env("FIXTUREGEN_CONFIG", &config)
        .args(["shop.Category", "-w", "id = 9"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert_eq!(toml_blocks(&stdout), vec!["EnvCategoryData"]);
}

#[test]
fn test_missing_explicit_config_fails() {
    let project = FixtureProject::with_shop();
    project
        .fixture()
        .args(["shop.Offer", "--config", "nope.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn test_unknown_config_key_rejected() {
    let project = FixtureProject::with_shop();
    project.write("fixturegen.toml", "colour = \"blue\"\n");

    project
        .fixture()
        .arg("shop.Offer")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration error"))
        .stderr(predicate::str::contains("colour"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_global_config_below_project_config() {
    let project = FixtureProject::with_shop();
    project.write_global_config("prefix = \"Global\"\nsuffix = \"G\"\n");
    project.write("fixturegen.toml", "suffix = \"P\"\n");

    let stdout = project.generate(&["shop.Category", "-w", "id = 9"]);
    assert_eq!(toml_blocks(&stdout), vec!["GlobalCategoryP"]);
}
