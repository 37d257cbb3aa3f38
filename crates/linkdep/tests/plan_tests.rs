//! Integration tests for link plans built from resolved orders

use linkdep::{Interface, LinkPlan, Overrides, RegistryManifest};

const MANIFEST: &str = r#"
[[module]]
name = "app"
dependencies = ["hal", "cmsis"]

[[module]]
name = "hal"
dependencies = ["cmsis", { name = "pthread", attributes = ["external"] }]

[[module]]
name = "cmsis"
attributes = ["header_only", "system"]
"#;

#[test]
fn test_plan_from_resolved_order() {
    let manifest = RegistryManifest::from_str(MANIFEST).unwrap();
    let registry = manifest.build_registry().unwrap();
    let overrides = Overrides::new();

    let order = registry.resolve_link_order(["app"], &overrides).unwrap();
    assert_eq!(order.names(), vec!["app", "cmsis", "hal", "cmsis", "pthread"]);

    let plan = LinkPlan::from_order(&registry, &order, &overrides);

    assert_eq!(plan.libraries, vec!["hal", "pthread"]);
    assert_eq!(
        plan.interfaces,
        vec![
            Interface { module: "app".to_string(), system: false },
            Interface { module: "cmsis".to_string(), system: true },
            Interface { module: "hal".to_string(), system: false },
        ]
    );
}

#[test]
fn test_plan_json() {
    let manifest = RegistryManifest::from_str(MANIFEST).unwrap();
    let registry = manifest.build_registry().unwrap();
    let order = registry.resolve_link_order(["app"], &Overrides::new()).unwrap();

    let json = LinkPlan::from_order(&registry, &order, &Overrides::new())
        .to_json()
        .unwrap();
    let parsed: LinkPlan = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.libraries, vec!["hal", "pthread"]);
    assert!(json.contains("\"system\": true"));
}
