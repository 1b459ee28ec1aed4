//! Property tests for block declaration order.
//!
//! Random acyclic model graphs are served by a scripted handler; after
//! discovery every model must be declared after every model it references.

use fixturegen::cache::DependencyCache;
use fixturegen::config::GenerateOptions;
use fixturegen::core::AttrValue;
use fixturegen::generator::Generator;
use fixturegen::handler::HandlerRegistry;
use fixturegen::test_utils::{ScriptedFactory, ScriptedHandler, fk, record};
use proptest::prelude::*;

const MAX_MODELS: usize = 8;

fn model(i: usize) -> String {
    format!("M{i}")
}

/// Whether model `i` references model `j`; only `j < i` edges exist.
fn has_edge(edges: &[bool], i: usize, j: usize) -> bool {
    j < i && edges[i * MAX_MODELS + j]
}

/// One record per model, each referencing record 1 of its target models.
fn dag_handler(n: usize, edges: &[bool], roots: &[bool]) -> ScriptedHandler {
    let mut handler = ScriptedHandler::new("dag.Root");
    for i in 0..n {
        let refs: Vec<(String, AttrValue)> = (0..n)
            .filter(|&j| has_edge(edges, i, j))
            .map(|j| (format!("m{j}_id"), fk(&model(j), 1)))
            .collect();
        let attrs: Vec<(&str, AttrValue)> =
            refs.iter().map(|(name, value)| (name.as_str(), value.clone())).collect();
        let rec = record(&model(i), 1, &attrs);
        handler = if roots[i] {
            handler.with_root(rec)
        } else {
            handler.with_record(rec)
        };
    }
    handler
}

fn discover(handler: ScriptedHandler) -> DependencyCache {
    let mut registry = HandlerRegistry::new();
    registry.register(ScriptedFactory::new("scripted"));
    let mut generator = Generator::with_registry(GenerateOptions::default(), registry).unwrap();
    let mut handler = handler;
    generator.discover(&mut handler, "dag.Root", None).unwrap()
}

fn dag_strategy() -> impl Strategy<Value = (usize, Vec<bool>, Vec<bool>)> {
    (
        2..=MAX_MODELS,
        prop::collection::vec(any::<bool>(), MAX_MODELS * MAX_MODELS),
        prop::collection::vec(any::<bool>(), MAX_MODELS),
    )
        .prop_map(|(n, edges, mut roots)| {
            // At least one root: the last model.
            roots[n - 1] = true;
            (n, edges, roots)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every referenced model is declared before the models referencing it.
    #[test]
    fn prop_dependencies_declared_first((n, edges, roots) in dag_strategy()) {
        let cache = discover(dag_handler(n, &edges, &roots));
        let order = cache.declaration_order().unwrap();

        let mut seen = std::collections::HashSet::new();
        for model_id in &order {
            prop_assert!(seen.insert(model_id.clone()), "{model_id} declared twice");
        }
        prop_assert_eq!(order.len(), cache.model_count());

        let position = |i: usize| order.iter().position(|m| *m == model(i));
        for i in 0..n {
            for j in 0..n {
                if has_edge(&edges, i, j)
                    && let (Some(from), Some(to)) = (position(i), position(j))
                {
                    prop_assert!(to < from, "M{j} must precede M{i} in {order:?}");
                }
            }
        }
    }

    /// With one root model referencing only leaf models, the graph order
    /// and the recency heuristic agree.
    #[test]
    fn prop_single_level_matches_recency(leaves in 1usize..7, reversed in any::<bool>()) {
        let mut indices: Vec<usize> = (0..leaves).collect();
        if reversed {
            indices.reverse();
        }
        let refs: Vec<(String, AttrValue)> =
            indices.iter().map(|&j| (format!("m{j}_id"), fk(&model(j), 1))).collect();
        let attrs: Vec<(&str, AttrValue)> =
            refs.iter().map(|(name, value)| (name.as_str(), value.clone())).collect();

        let mut handler = ScriptedHandler::new("dag.Root").with_root(record("Root", 1, &attrs));
        for j in 0..leaves {
            handler = handler.with_record(record(&model(j), 1, &[]));
        }

        let cache = discover(handler);
        let order = cache.declaration_order().unwrap();
        let recency: Vec<String> =
            cache.recency_order().into_iter().map(str::to_string).collect();
        prop_assert_eq!(order.last().map(String::as_str), Some("Root"));
        prop_assert_eq!(order, recency);
    }
}

#[test]
fn test_multi_level_shared_dependency_order() {
    // Offer → Product → Category and Offer → Category. Category is touched
    // again after Product has been registered.
    let handler = ScriptedHandler::new("shop.Offer")
        .with_root(record(
            "Offer",
            1,
            &[("product_id", fk("Product", 1)), ("category_id", fk("Category", 9))],
        ))
        .with_record(record("Product", 1, &[("category_id", fk("Category", 9))]))
        .with_record(record("Category", 9, &[]));

    let cache = discover(handler);
    assert_eq!(cache.declaration_order().unwrap(), ["Category", "Product", "Offer"]);
}

#[test]
fn test_sibling_roots_keep_dependencies_first() {
    // Two roots of different depth: the recency heuristic alone would put
    // Product (touched last) ahead of Category.
    let handler = ScriptedHandler::new("shop.Mixed")
        .with_root(record("Product", 1, &[("category_id", fk("Category", 9))]))
        .with_root(record("Tag", 1, &[("product_id", fk("Product", 1))]))
        .with_record(record("Category", 9, &[]));

    let cache = discover(handler);
    let order = cache.declaration_order().unwrap();
    let pos = |m: &str| order.iter().position(|o| o == m).unwrap();
    assert!(pos("Category") < pos("Product"));
    assert!(pos("Product") < pos("Tag"));
}
