//! Library-level generation over the store handler.

use fixturegen::config::GenerateOptions;
use fixturegen::core::{FixtureError, find_fixture_error};
use fixturegen::generator::Generator;
use fixturegen::handler::HandlerRegistry;
use fixturegen::test_utils::{ScriptedFactory, StoreFixture, init_test_logging};
use tempfile::TempDir;

fn shop_options() -> (TempDir, GenerateOptions) {
    let temp = TempDir::new().unwrap();
    StoreFixture::shop().write_to(temp.path()).unwrap();
    let options = GenerateOptions::new(temp.path());
    (temp, options)
}

fn kind(err: &anyhow::Error) -> Option<&'static str> {
    find_fixture_error(err).map(FixtureError::kind)
}

#[test]
fn test_store_generation_round_trips_through_toml() {
    init_test_logging(None);
    let (_temp, options) = shop_options();
    let mut generator = Generator::new(options).unwrap();

    let text = generator.resolve("shop.Offer", Some("name = 'jersey on sale'")).unwrap();
    let parsed: toml::Table = toml::from_str(&text).unwrap();

    let classes: Vec<&str> = parsed["fixture"]["classes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c.as_str())
        .collect();
    assert_eq!(classes, ["CategoryData", "ProductData", "OfferData"]);

    assert_eq!(parsed["CategoryData"]["model"].as_str(), Some("shop.Category"));
    assert_eq!(parsed["CategoryData"]["table"].as_str(), Some("categories"));
    assert_eq!(parsed["CategoryData"]["category_9"]["id"].as_integer(), Some(9));

    let offer = &parsed["OfferData"]["offer_1"];
    assert_eq!(offer["product_id"]["ref"].as_str(), Some("ProductData.product_1"));
    assert_eq!(offer["product_id"]["field"].as_str(), Some("id"));
    assert_eq!(offer["category_id"]["ref"].as_str(), Some("CategoryData.category_9"));

    let requires: Vec<&str> = parsed["OfferData"]["requires"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c.as_str())
        .collect();
    assert_eq!(requires, ["ProductData", "CategoryData"]);
}

#[test]
fn test_filter_with_ordering_comparison() {
    let (_temp, options) = shop_options();
    let mut generator = Generator::new(options).unwrap();

    let text = generator.resolve("shop.Category", Some("id >= 10")).unwrap();
    assert!(text.contains("[CategoryData.category_10]"));
    assert!(!text.contains("category_9"));
}

#[test]
fn test_custom_handler_registered_before_store() {
    let (_temp, options) = shop_options();
    let mut registry = HandlerRegistry::with_defaults();
    registry.clear();
    registry.register(ScriptedFactory::new("first").unsupported("driver not installed"));
    registry.register(ScriptedFactory::new("second").recognizing(false));

    let mut generator = Generator::with_registry(options, registry).unwrap();
    let err = generator.resolve("shop.Offer", None).unwrap_err();
    assert_eq!(kind(&err), Some("UnrecognizedObject"));
    // The object exists on disk even though no remaining handler accepts it.
    assert!(err.to_string().contains("importable? YES"));
    assert!(err.to_string().contains("first, second"));
}

#[test]
fn test_require_store_handler() {
    let (_temp, options) = shop_options();
    let options = options.with_required_handlers(["store".to_string()]);
    let mut generator = Generator::new(options).unwrap();
    assert!(generator.resolve("shop.Category", Some("id = 9")).is_ok());
}

#[test]
fn test_model_level_cycle_is_circular_dependency() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("org.json"),
        r#"{
  "models": {
    "Department": {
      "key": "id",
      "references": { "head_id": "Person" },
      "rows": [{ "id": 1, "head_id": 2 }]
    },
    "Person": {
      "key": "id",
      "references": { "department_id": "Department" },
      "rows": [{ "id": 1, "department_id": 1 }, { "id": 2, "department_id": null }]
    }
  }
}"#,
    )
    .unwrap();

    let mut generator = Generator::new(GenerateOptions::new(temp.path())).unwrap();
    let err = generator.resolve("org.Person", Some("id = 1")).unwrap_err();
    assert_eq!(kind(&err), Some("CircularDependency"));
}

#[test]
fn test_variable_override_names_entries() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("blog.toml"),
        r#"[models.Post]
key = "slug"
variable = "entry"
rows = [{ slug = "hello-world", title = "Hello" }]
"#,
    )
    .unwrap();

    let mut generator = Generator::new(GenerateOptions::new(temp.path())).unwrap();
    let text = generator.resolve("blog.Post", None).unwrap();
    assert!(text.contains("[PostData.entry_hello-world]"), "{text}");
}

#[test]
fn test_duplicate_root_keys_render_last_row() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("dup.json"),
        r#"{"models": {
            "Category": {"key": "id", "rows": [
                {"id": 9, "name": "first"},
                {"id": 9, "name": "second"}
            ]},
            "Product": {"key": "id", "references": {"category_id": "Category"}, "rows": [
                {"id": 1, "category_id": 9}
            ]}
        }}"#,
    )
    .unwrap();
    let mut generator = Generator::new(GenerateOptions::new(temp.path())).unwrap();

    let as_root = generator.resolve("dup.Category", None).unwrap();
    let parsed: toml::Table = toml::from_str(&as_root).unwrap();
    assert_eq!(parsed["CategoryData"]["category_9"]["name"].as_str(), Some("second"));
    assert_eq!(as_root.matches("[CategoryData.category_9]").count(), 1);

    let as_reference = generator.resolve("dup.Product", None).unwrap();
    let parsed: toml::Table = toml::from_str(&as_reference).unwrap();
    assert_eq!(parsed["CategoryData"]["category_9"]["name"].as_str(), Some("second"));
}
