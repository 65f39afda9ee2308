//! Binding Properties Test
//!
//! Invariants that hold for every bound method regardless of capability:
//! reference identity of the request, null handling, stream semantics,
//! session-only parameters and error filtering.

mod helpers;

use futures_util::stream;
use helpers::{drain, init_test_tracing, test_exchange};
use mcpbind::{prelude::*, ReturnShape, ReturnType};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
#[error("not allowed: {0}")]
struct Forbidden(String);

fn single(methods: Methods) -> Vec<Arc<dyn McpComponent>> {
    vec![Arc::new(methods)]
}

#[tokio::test]
async fn test_request_identity_holds_for_async_prompts() {
    init_test_tracing();
    let seen: Arc<Mutex<Vec<Arc<GetPromptRequest>>>> = Arc::default();
    let sink = Arc::clone(&seen);

    let mut methods = Methods::new("identity");
    methods.prompt_async(
        "mirror",
        PromptMarker::new(),
        vec![],
        move |request: Arc<GetPromptRequest>| {
            sink.lock().unwrap().push(Arc::clone(&request));
            async move { anyhow::Ok(request.name.clone()) }
        },
    );

    let prompts = StatelessAsyncProvider::new(single(methods)).prompts().unwrap();
    let request = Arc::new(GetPromptRequest::new("mirror"));
    prompts[0]
        .callback
        .call(&TransportContext::new(), Arc::clone(&request))
        .await
        .unwrap()
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(Arc::ptr_eq(&seen[0], &request));
}

#[test]
fn test_missing_keys_bind_null_for_every_argument() {
    init_test_tracing();
    let mut methods = Methods::new("nulls");
    methods.tool(
        "describe",
        ToolMarker::new(),
        vec![
            Param::optional::<String>("a"),
            Param::optional::<i64>("b"),
            Param::raw("c", json!({})).required(false),
        ],
        |Arg(a): Arg<Option<String>>,
         Arg(b): Arg<Option<i64>>,
         Arg(c): Arg<serde_json::Value>|
         -> anyhow::Result<serde_json::Value> { Ok(json!([a, b, c])) },
    );

    let tools = StatelessSyncProvider::new(single(methods)).tools().unwrap();
    let result = tools[0]
        .call(
            &TransportContext::new(),
            Arc::new(CallToolRequest::new("describe").with_argument("b", 7)),
        )
        .unwrap();
    assert_eq!(result.first_text(), Some("[null,7,null]"));
}

#[tokio::test]
async fn test_stream_prompt_takes_first_item_and_empty_stream_is_none() {
    init_test_tracing();
    let mut methods = Methods::new("streams");
    methods
        .prompt_stream(
            "first",
            PromptMarker::new(),
            vec![],
            || stream::iter(vec![anyhow::Ok("one".to_string()), Ok("two".to_string())]),
        )
        .prompt_stream(
            "none",
            PromptMarker::new(),
            vec![],
            || stream::iter(Vec::<anyhow::Result<String>>::new()),
        );

    let prompts = StatelessAsyncProvider::new(single(methods)).prompts().unwrap();
    let ctx = TransportContext::new();

    let first = prompts[0]
        .callback
        .call(&ctx, Arc::new(GetPromptRequest::new("first")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.messages, vec![PromptMessage::assistant("one")]);

    let none = prompts[1]
        .callback
        .call(&ctx, Arc::new(GetPromptRequest::new("none")))
        .await
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn test_classification_is_idempotent() {
    let a = ReturnType::classify::<Vec<String>, CallToolResult>(false);
    let b = ReturnType::classify::<Vec<String>, CallToolResult>(false);
    assert_eq!(a, b);
    assert_eq!(a.shape, ReturnShape::Value);
    assert_eq!(
        ReturnType::classify::<String, CallToolResult>(true).shape,
        ReturnShape::Stream
    );
}

#[tokio::test]
async fn test_request_context_progress_uses_request_token() {
    init_test_tracing();
    let mut methods = Methods::new("progress");
    methods.tool_async(
        "work",
        ToolMarker::new(),
        vec![Param::new::<u32>("steps")],
        |ctx: RequestContext, Arg(steps): Arg<u32>| async move {
            for step in 1..=steps {
                ctx.progress(f64::from(step), Some(f64::from(steps)), None)?;
            }
            anyhow::Ok(steps)
        },
    );

    let tools = StatefulAsyncProvider::new(single(methods)).tools().unwrap();
    let (exchange, mut rx) = test_exchange(ClientCapabilities::default());

    let mut meta = JsonObject::new();
    meta.insert("progressToken".into(), json!(5));
    let request = CallToolRequest::new("work")
        .with_argument("steps", 3)
        .with_meta(meta);
    let result = tools[0]
        .call(&exchange, Arc::new(request))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.first_text(), Some("3"));

    let progress: Vec<f64> = drain(&mut rx)
        .into_iter()
        .map(|n| match n {
            ServerNotification::Progress(p) => {
                assert_eq!(p.progress_token, ProgressToken::Number(5));
                p.progress
            }
            other => panic!("unexpected notification {other:?}"),
        })
        .collect();
    assert_eq!(progress, vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_session_parameters_skip_in_stateless_providers() {
    init_test_tracing();
    let mut methods = Methods::new("mixed");
    methods
        .tool(
            "needs_context",
            ToolMarker::new(),
            vec![],
            |_: RequestContext| -> anyhow::Result<()> { Ok(()) },
        )
        .tool(
            "plain",
            ToolMarker::new(),
            vec![],
            |_: TransportContext| -> anyhow::Result<()> { Ok(()) },
        );

    let stateless = StatelessSyncProvider::new(single(methods.clone()))
        .tools()
        .unwrap();
    assert_eq!(stateless.len(), 1);
    assert_eq!(stateless[0].tool.name, "plain");

    let stateful = StatefulSyncProvider::new(single(methods)).tools().unwrap();
    assert_eq!(stateful.len(), 2);
}

#[test]
fn test_error_filter_of_matches_wrapped_errors() {
    init_test_tracing();
    let mut methods = Methods::new("guarded");
    methods
        .tool(
            "delete",
            ToolMarker::new(),
            vec![Param::new::<String>("path")],
            |Arg(path): Arg<String>| -> anyhow::Result<()> {
                Err(anyhow::Error::new(Forbidden(path)).context("delete failed"))
            },
        )
        .tool(
            "crash",
            ToolMarker::new(),
            vec![],
            || -> anyhow::Result<()> { anyhow::bail!("unexpected") },
        );

    let tools = StatelessSyncProvider::new(single(methods))
        .with_error_filter(ErrorFilter::of::<Forbidden>())
        .tools()
        .unwrap();
    let ctx = TransportContext::new();

    let caught = tools[0]
        .call(
            &ctx,
            Arc::new(CallToolRequest::new("delete").with_argument("path", "/etc")),
        )
        .unwrap();
    assert!(caught.is_error());
    assert!(caught
        .first_text()
        .unwrap()
        .starts_with("Error invoking method: "));

    assert!(tools[1]
        .call(&ctx, Arc::new(CallToolRequest::new("crash")))
        .is_err());
}
