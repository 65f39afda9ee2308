//! Tool Dispatch Tests
//!
//! Result packaging for every return mode, error envelopes and error
//! filters, and the first-item rule for stream methods.

use super::{components, exchange};
use crate::{
    binding::{Arg, Param},
    callback::{tool::ToolMarker, ErrorFilter, ERROR_PREFIX},
    component::Methods,
    context::TransportContext,
    error::McpError,
    protocol::{CallToolRequest, CallToolResult},
    provider::{StatefulAsyncProvider, StatefulSyncProvider, StatelessSyncProvider},
    returns::{ReturnMode, ReturnShape, ReturnType},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::{collections::BTreeSet, sync::Arc};

#[derive(Debug, Serialize, schemars::JsonSchema)]
struct Summary {
    total: u32,
    label: String,
}

#[derive(Debug, thiserror::Error)]
#[error("quota exceeded")]
struct QuotaExceeded;

fn call_sync(methods: Methods, request: CallToolRequest) -> crate::McpResult<CallToolResult> {
    let tools = StatelessSyncProvider::new(components(methods)).tools()?;
    tools[0].call(&TransportContext::new(), Arc::new(request))
}

#[test]
fn test_structured_result_keys_match_output_schema() {
    let mut methods = Methods::new("stats");
    methods.tool(
        "summarize",
        ToolMarker::new(),
        vec![],
        || -> anyhow::Result<Summary> {
            Ok(Summary {
                total: 3,
                label: "three".into(),
            })
        },
    );

    let tools = StatelessSyncProvider::new(components(methods)).tools().unwrap();
    let schema = tools[0].tool.output_schema.clone().unwrap();
    assert_eq!(tools[0].callback.mode(), ReturnMode::Structured);

    let result = tools[0]
        .call(&TransportContext::new(), Arc::new(CallToolRequest::new("summarize")))
        .unwrap();
    let structured = result.structured_content.clone().unwrap();

    let schema_keys: BTreeSet<_> = schema["properties"].as_object().unwrap().keys().collect();
    let result_keys: BTreeSet<_> = structured.keys().collect();
    assert_eq!(schema_keys, result_keys);

    let text: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
    assert_eq!(text, json!({"total": 3, "label": "three"}));
}

#[test]
fn test_disabled_output_schema_falls_back_to_text() {
    let mut methods = Methods::new("stats");
    methods.tool(
        "summarize",
        ToolMarker::new().without_output_schema(),
        vec![],
        || -> anyhow::Result<Summary> {
            Ok(Summary {
                total: 1,
                label: "one".into(),
            })
        },
    );

    let result = call_sync(methods, CallToolRequest::new("summarize")).unwrap();
    assert!(result.structured_content.is_none());
    let text: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
    assert_eq!(text["label"], "one");
}

#[test]
fn test_null_text_result_is_literal_null() {
    let mut methods = Methods::new("nothing");
    methods.tool(
        "lookup",
        ToolMarker::new(),
        vec![],
        || -> anyhow::Result<Option<String>> { Ok(None) },
    );

    let result = call_sync(methods, CallToolRequest::new("lookup")).unwrap();
    assert!(!result.is_error());
    assert_eq!(result.first_text(), Some("null"));
}

#[test]
fn test_void_tool_reports_done() {
    let mut methods = Methods::new("void");
    methods.tool(
        "touch",
        ToolMarker::new(),
        vec![],
        || -> anyhow::Result<()> { Ok(()) },
    );

    let tools = StatelessSyncProvider::new(components(methods)).tools().unwrap();
    assert!(tools[0].tool.output_schema.is_none());
    let result = tools[0]
        .call(&TransportContext::new(), Arc::new(CallToolRequest::new("touch")))
        .unwrap();
    assert_eq!(result.first_text(), Some("Done"));
}

#[test]
fn test_tool_result_passes_through_untouched() {
    let mut methods = Methods::new("raw");
    methods.tool(
        "raw",
        ToolMarker::new(),
        vec![],
        || -> anyhow::Result<CallToolResult> {
            Ok(CallToolResult::error("handled by the tool itself"))
        },
    );

    let tools = StatelessSyncProvider::new(components(methods)).tools().unwrap();
    assert!(tools[0].tool.output_schema.is_none());
    let result = tools[0]
        .call(&TransportContext::new(), Arc::new(CallToolRequest::new("raw")))
        .unwrap();
    assert_eq!(result, CallToolResult::error("handled by the tool itself"));
}

#[test]
fn test_handler_error_becomes_prefixed_envelope() {
    let mut methods = Methods::new("fails");
    methods.tool(
        "explode",
        ToolMarker::new(),
        vec![Param::new::<String>("word")],
        |Arg(word): Arg<String>| -> anyhow::Result<String> { anyhow::bail!("{word}") },
    );

    let result = call_sync(
        methods,
        CallToolRequest::new("explode").with_argument("word", "boom"),
    )
    .unwrap();
    assert!(result.is_error());
    assert_eq!(result.first_text(), Some(format!("{ERROR_PREFIX}boom").as_str()));
}

#[test]
fn test_error_filter_lets_other_errors_propagate() {
    let mut methods = Methods::new("quota");
    methods
        .tool(
            "limited",
            ToolMarker::new(),
            vec![],
            || -> Result<String, QuotaExceeded> { Err(QuotaExceeded) },
        )
        .tool(
            "broken",
            ToolMarker::new(),
            vec![],
            || -> anyhow::Result<String> { anyhow::bail!("disk on fire") },
        );

    let tools = StatelessSyncProvider::new(components(methods))
        .with_error_filter(ErrorFilter::of::<QuotaExceeded>())
        .tools()
        .unwrap();
    let ctx = TransportContext::new();

    let caught = tools[0]
        .call(&ctx, Arc::new(CallToolRequest::new("limited")))
        .unwrap();
    assert!(caught.is_error());
    assert_eq!(caught.first_text(), Some("Error invoking method: quota exceeded"));

    let err = tools[1]
        .call(&ctx, Arc::new(CallToolRequest::new("broken")))
        .unwrap_err();
    assert!(matches!(err, McpError::Handler(_)));
    assert_eq!(err.to_string(), "disk on fire");
}

#[test]
fn test_classification_is_stable() {
    let first = ReturnType::classify::<Summary, CallToolResult>(false);
    let second = ReturnType::classify::<Summary, CallToolResult>(false);
    assert_eq!(first, second);
    assert_eq!(first.shape, ReturnShape::Value);
    assert!(!first.passthrough);

    let raw = ReturnType::classify::<CallToolResult, CallToolResult>(true);
    assert_eq!(raw.shape, ReturnShape::Stream);
    assert!(raw.passthrough);
    assert!(ReturnType::classify::<(), CallToolResult>(true).is_void());
}

#[tokio::test]
async fn test_stream_tool_uses_first_item_only() {
    let mut methods = Methods::new("streams");
    methods.tool_stream(
        "ticks",
        ToolMarker::new(),
        vec![],
        || tokio_stream::iter(vec![anyhow::Ok(1u32), Ok(2), Ok(3)]),
    );

    let tools = StatefulAsyncProvider::new(components(methods)).tools().unwrap();
    let (exchange, _rx) = exchange();
    let result = tools[0]
        .call(&exchange, Arc::new(CallToolRequest::new("ticks")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.first_text(), Some("1"));
}

#[tokio::test]
async fn test_empty_stream_yields_nothing_unless_void() {
    let mut methods = Methods::new("streams");
    methods
        .tool_stream(
            "silent",
            ToolMarker::new(),
            vec![],
            || tokio_stream::iter(Vec::<anyhow::Result<String>>::new()),
        )
        .tool_stream(
            "fire_and_forget",
            ToolMarker::new(),
            vec![],
            || tokio_stream::iter(Vec::<anyhow::Result<()>>::new()),
        );

    let tools = StatefulAsyncProvider::new(components(methods)).tools().unwrap();
    let (exchange, _rx) = exchange();

    let silent = tools[0]
        .call(&exchange, Arc::new(CallToolRequest::new("silent")))
        .await
        .unwrap();
    assert!(silent.is_none());

    let void = tools[1]
        .call(&exchange, Arc::new(CallToolRequest::new("fire_and_forget")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(void.first_text(), Some("Done"));
}

#[test]
fn test_sync_tool_with_exchange_sees_session() {
    let mut methods = Methods::new("session");
    methods.tool(
        "whoami",
        ToolMarker::new(),
        vec![],
        |exchange: crate::context::Exchange| -> anyhow::Result<String> {
            Ok(exchange.session_id().unwrap_or("none").to_string())
        },
    );

    let tools = StatefulSyncProvider::new(components(methods)).tools().unwrap();
    let (exchange, _rx) = exchange();
    let result = tools[0]
        .call(&exchange, Arc::new(CallToolRequest::new("whoami")))
        .unwrap();
    assert_eq!(result.first_text(), Some("session-1"));
}
