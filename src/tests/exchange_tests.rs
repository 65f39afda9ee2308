//! Exchange and Context Tests
//!
//! Handlers that talk back to the client through the session, and handlers
//! that only see transport metadata.

use super::{components, exchange};
use crate::{
    callback::{
        tool::{SyncToolCallback, ToolMarker, ToolReturn},
        Stateless,
    },
    component::Methods,
    context::{ChannelExchange, Exchange, Outcome, RequestContext, TransportContext},
    error::McpError,
    method::Method,
    protocol::{
        CallToolRequest, ClientCapabilities, ElicitAction, ElicitResult, JsonObject,
        ProgressToken, ServerNotification,
    },
    provider::{StatefulAsyncProvider, StatefulSyncProvider, StatelessSyncProvider},
    returns::ReturnMode,
    ErrorFilter,
};
use serde_json::json;
use std::sync::Arc;

fn with_progress_token(request: CallToolRequest, token: &str) -> CallToolRequest {
    let mut meta = JsonObject::new();
    meta.insert("progressToken".into(), json!(token));
    request.with_meta(meta)
}

fn reporting_tool() -> Methods {
    let mut methods = Methods::new("reporter");
    methods.tool_async(
        "crunch",
        ToolMarker::new(),
        vec![],
        |ctx: RequestContext| async move {
            let first = ctx.progress(1.0, Some(2.0), Some("halfway"))?;
            ctx.info("almost there")?;
            ctx.progress(2.0, Some(2.0), None)?;
            anyhow::Ok(if first.is_completed() { "reported" } else { "silent" }.to_string())
        },
    );
    methods
}

#[tokio::test]
async fn test_progress_and_logging_reach_the_client_in_order() {
    let tools = StatefulAsyncProvider::new(components(reporting_tool()))
        .tools()
        .unwrap();
    let (exchange, mut rx) = exchange();

    let request = with_progress_token(CallToolRequest::new("crunch"), "job-7");
    let result = tools[0]
        .call(&exchange, Arc::new(request))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.first_text(), Some("reported"));

    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    assert_eq!(received.len(), 3);
    match &received[0] {
        ServerNotification::Progress(p) => {
            assert_eq!(p.progress_token, ProgressToken::from("job-7"));
            assert_eq!(p.message.as_deref(), Some("halfway"));
        }
        other => panic!("expected progress, got {other:?}"),
    }
    assert!(matches!(received[1], ServerNotification::LoggingMessage(_)));
    assert!(matches!(received[2], ServerNotification::Progress(_)));
}

#[tokio::test]
async fn test_progress_without_token_is_skipped() {
    let tools = StatefulAsyncProvider::new(components(reporting_tool()))
        .tools()
        .unwrap();
    let (exchange, mut rx) = exchange();

    let result = tools[0]
        .call(&exchange, Arc::new(CallToolRequest::new("crunch")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.first_text(), Some("silent"));

    // only the log line was sent
    assert!(matches!(
        rx.try_recv().unwrap(),
        ServerNotification::LoggingMessage(_)
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_elicitation_skipped_when_client_lacks_capability() {
    let mut methods = Methods::new("asker");
    methods.tool_async(
        "confirm",
        ToolMarker::new(),
        vec![],
        |ctx: RequestContext| async move {
            let answer = ctx.elicit("Proceed?", json!({"type": "object"})).await?;
            anyhow::Ok(match answer {
                Outcome::Completed(result) => format!("{:?}", result.action),
                Outcome::Skipped { reason } => reason,
            })
        },
    );
    let tools = StatefulAsyncProvider::new(components(methods)).tools().unwrap();

    let (bare, _rx) = ChannelExchange::new(ClientCapabilities::default());
    let skipped = tools[0]
        .call(&bare.into_exchange(), Arc::new(CallToolRequest::new("confirm")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        skipped.first_text(),
        Some("client does not support elicitation")
    );

    let (capable, _rx) = ChannelExchange::new(ClientCapabilities::full());
    let capable = capable
        .on_elicitation(|_| async { Ok(ElicitResult::decline()) })
        .into_exchange();
    let answered = tools[0]
        .call(&capable, Arc::new(CallToolRequest::new("confirm")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        answered.first_text(),
        Some(format!("{:?}", ElicitAction::Decline).as_str())
    );
}

#[test]
fn test_stateless_tool_reads_transport_context() {
    let mut methods = Methods::new("tenant");
    methods.tool(
        "tenant",
        ToolMarker::new(),
        vec![],
        |ctx: TransportContext| -> anyhow::Result<String> {
            Ok(ctx
                .get("tenant")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string())
        },
    );

    let tools = StatelessSyncProvider::new(components(methods)).tools().unwrap();
    let ctx = TransportContext::new().with("tenant", "acme");
    let result = tools[0]
        .call(&ctx, Arc::new(CallToolRequest::new("tenant")))
        .unwrap();
    assert_eq!(result.first_text(), Some("acme"));

    let empty = tools[0]
        .call(&TransportContext::new(), Arc::new(CallToolRequest::new("tenant")))
        .unwrap();
    assert_eq!(empty.first_text(), Some("unknown"));
}

#[test]
fn test_stateful_transport_context_comes_from_exchange() {
    let mut methods = Methods::new("tenant");
    methods.tool(
        "region",
        ToolMarker::new(),
        vec![],
        |ctx: TransportContext| -> anyhow::Result<String> {
            Ok(ctx.get("region").cloned().unwrap_or_default().to_string())
        },
    );

    let tools = StatefulSyncProvider::new(components(methods)).tools().unwrap();
    let (exchange, _rx) = ChannelExchange::new(ClientCapabilities::default());
    let exchange = exchange
        .with_transport_context(TransportContext::new().with("region", "eu-west"))
        .into_exchange();

    let result = tools[0]
        .call(&exchange, Arc::new(CallToolRequest::new("region")))
        .unwrap();
    assert_eq!(result.first_text(), Some("\"eu-west\""));
}

#[test]
fn test_exchange_parameter_is_the_session() {
    let (session, _rx) = exchange();
    let expected = session.clone();

    let mut methods = Methods::new("session");
    methods.tool(
        "same",
        ToolMarker::new(),
        vec![],
        move |seen: Exchange| -> anyhow::Result<bool> { Ok(seen.same_session(&expected)) },
    );

    let tools = StatefulSyncProvider::new(components(methods)).tools().unwrap();
    let result = tools[0]
        .call(&session, Arc::new(CallToolRequest::new("same")))
        .unwrap();
    assert_eq!(result.first_text(), Some("true"));
}

#[test]
fn test_stateless_callback_rejects_session_parameters() {
    let method = Method::sync(
        "needs_session",
        vec![],
        |_: Exchange| -> anyhow::Result<()> { Ok(()) },
        ToolReturn::returns::<()>(),
    );

    let err = SyncToolCallback::<Stateless>::new(&method, ReturnMode::Void, ErrorFilter::all())
        .err()
        .unwrap();
    assert!(matches!(err, McpError::ExchangeUnavailable { ref method } if method == "needs_session"));
}
