//! Resources and Completions Test
//!
//! Fixed and templated resources, blob contents, completion capping and
//! dispatch through a blocking registry configured from JSON options.

mod helpers;

use helpers::init_test_tracing;
use mcpbind::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn catalog() -> Methods {
    let mut methods = Methods::new("catalog");
    methods
        .resource(
            "readme",
            ResourceMarker::new("catalog://readme")
                .description("Catalog overview")
                .mime_type("text/markdown"),
            vec![],
            || -> anyhow::Result<String> { Ok("# Catalog".into()) },
        )
        .resource(
            "logo",
            ResourceMarker::new("catalog://logo.png").mime_type("image/png").blob(),
            vec![],
            || -> anyhow::Result<String> { Ok("iVBORw0KGgo=".into()) },
        )
        .resource(
            "item",
            ResourceMarker::new("catalog://items/{category}/{sku}"),
            vec![Param::new::<String>("category"), Param::new::<String>("sku")],
            |Arg(category): Arg<String>, Arg(sku): Arg<String>| -> anyhow::Result<Vec<String>> {
                Ok(vec![category, sku])
            },
        )
        .completion(
            "skus",
            CompleteMarker::resource("catalog://items/{category}/{sku}"),
            vec![Param::new::<String>("category"), Param::new::<String>("sku")],
            |Arg(category): Arg<String>, Arg(prefix): Arg<String>| -> anyhow::Result<Vec<String>> {
                Ok((0..50)
                    .map(|i| format!("{category}-{prefix}{i:02}"))
                    .collect())
            },
        );
    methods
}

fn registry(options: ProviderOptions) -> SyncRegistry<Stateless> {
    let provider = StatelessSyncProvider::new(vec![Arc::new(catalog())]).with_options(options);
    SyncRegistry::from_provider(&provider).unwrap()
}

#[test]
fn test_fixed_resources_listed_with_metadata() {
    init_test_tracing();
    let registry = registry(ProviderOptions::default());

    let resources = registry.list_resources();
    assert_eq!(resources.len(), 2);
    let readme = resources
        .iter()
        .find(|r| r.uri == "catalog://readme")
        .unwrap();
    assert_eq!(readme.name, "readme");
    assert_eq!(readme.description.as_deref(), Some("Catalog overview"));
    assert_eq!(readme.mime_type.as_deref(), Some("text/markdown"));

    let templates = registry.list_resource_templates();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "item");
}

#[test]
fn test_blob_resource_returns_blob_contents() {
    init_test_tracing();
    let registry = registry(ProviderOptions::default());

    let result = registry
        .read_resource(
            &TransportContext::new(),
            ReadResourceRequest::new("catalog://logo.png"),
        )
        .unwrap();
    assert_eq!(
        result.contents,
        vec![ResourceContents::blob(
            "catalog://logo.png",
            Some("image/png".to_string()),
            "iVBORw0KGgo="
        )]
    );
}

#[test]
fn test_template_with_two_variables_returns_every_text() {
    init_test_tracing();
    let registry = registry(ProviderOptions::default());

    let result = registry
        .read_resource(
            &TransportContext::new(),
            ReadResourceRequest::new("catalog://items/tools/h-100"),
        )
        .unwrap();
    let texts: Vec<_> = result
        .contents
        .iter()
        .map(|c| match c {
            ResourceContents::Text(t) => (t.uri.as_str(), t.text.as_str()),
            other => panic!("unexpected contents {other:?}"),
        })
        .collect();
    assert_eq!(
        texts,
        vec![
            ("catalog://items/tools/h-100", "tools"),
            ("catalog://items/tools/h-100", "h-100")
        ]
    );
}

#[test]
fn test_template_variables_must_match_arguments() {
    init_test_tracing();
    let mut methods = Methods::new("broken");
    methods.resource(
        "page",
        ResourceMarker::new("pages/{slug}"),
        vec![Param::new::<String>("id")],
        |Arg(id): Arg<String>| -> anyhow::Result<String> { Ok(id) },
    );

    let err = StatelessSyncProvider::new(vec![Arc::new(methods)])
        .resource_templates()
        .unwrap_err();
    match err {
        McpError::UriVariableMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, vec!["slug".to_string()]);
            assert_eq!(found, vec!["id".to_string()]);
        }
        other => panic!("expected UriVariableMismatch, got {other:?}"),
    }
}

#[test]
fn test_completion_merges_context_and_caps_values() {
    init_test_tracing();
    let request = CompleteRequest::new(
        CompleteReference::resource("catalog://items/{category}/{sku}"),
        "sku",
        "x",
    )
    .with_context("category", "tools");

    let roomy = registry(ProviderOptions::default())
        .complete(&TransportContext::new(), request.clone())
        .unwrap();
    assert_eq!(roomy.completion.values.len(), 50);
    assert_eq!(roomy.completion.values[0], "tools-x00");
    assert_eq!(roomy.completion.has_more, None);

    let strict = registry(ProviderOptions::strict())
        .complete(&TransportContext::new(), request)
        .unwrap();
    assert_eq!(strict.completion.values.len(), 20);
    assert_eq!(strict.completion.total, Some(50));
    assert_eq!(strict.completion.has_more, Some(true));
}

#[test]
fn test_options_load_from_json_config() {
    init_test_tracing();
    let options: ProviderOptions = serde_json::from_value(json!({
        "generateOutputSchema": false,
        "maxCompletionValues": 5
    }))
    .unwrap();
    assert!(!options.generate_output_schema);
    assert!(!options.deduplicate_names);
    assert_eq!(options.group_separator, "_");

    let request = CompleteRequest::new(
        CompleteReference::resource("catalog://items/{category}/{sku}"),
        "sku",
        "",
    )
    .with_context("category", "garden");
    let result = registry(options)
        .complete(&TransportContext::new(), request)
        .unwrap();
    assert_eq!(result.completion.values.len(), 5);
}

#[test]
fn test_unknown_completion_reference() {
    init_test_tracing();
    let err = registry(ProviderOptions::default())
        .complete(
            &TransportContext::new(),
            CompleteRequest::new(CompleteReference::prompt("nope"), "x", ""),
        )
        .unwrap_err();
    assert!(matches!(err, McpError::UnknownCompletion(_)));
}

#[test]
fn test_numeric_template_variable_binds_typed_argument() {
    init_test_tracing();
    let mut methods = Methods::new("paged");
    methods.resource(
        "page",
        ResourceMarker::new("book://pages/{number}"),
        vec![Param::new::<u32>("number")],
        |Arg(number): Arg<u32>| -> anyhow::Result<String> { Ok(format!("page {}", number + 1)) },
    );
    let provider = StatelessSyncProvider::new(vec![Arc::new(methods)]);
    let registry = SyncRegistry::from_provider(&provider).unwrap();

    let result = registry
        .read_resource(
            &TransportContext::new(),
            ReadResourceRequest::new("book://pages/41"),
        )
        .unwrap();
    match &result.contents[0] {
        ResourceContents::Text(text) => assert_eq!(text.text, "page 42"),
        other => panic!("expected text, got {other:?}"),
    }
}
