//! Test helpers for integration tests
//!
//! Provides a small component exercising every declaration style, plus
//! session exchanges wired to in-memory channels.

#![allow(dead_code)]

use mcpbind::{prelude::*, ChannelExchange};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use tokio::sync::mpsc;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Shared state the test component mutates
#[derive(Debug, Default)]
pub struct TestContext {
    pub counter: AtomicU32,
}

impl TestContext {
    pub fn increment(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Structured output of the `tally` tool
#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Tally {
    pub input: String,
    pub count: u32,
}

/// Component used across the integration suites.
pub struct TestComponent {
    pub context: Arc<TestContext>,
}

impl TestComponent {
    pub fn new() -> (Arc<Self>, Arc<TestContext>) {
        let context = Arc::new(TestContext::default());
        let component = Arc::new(Self {
            context: Arc::clone(&context),
        });
        (component, context)
    }
}

impl McpComponent for TestComponent {
    fn declare(self: Arc<Self>, methods: &mut Methods) {
        let tally = Arc::clone(&self);
        let record = Arc::clone(&self);

        methods
            .tool(
                "greet",
                ToolMarker::new().description("Echo a name back"),
                vec![Param::new::<String>("name")],
                |Arg(name): Arg<String>| -> anyhow::Result<String> { Ok(name) },
            )
            .tool(
                "tally",
                ToolMarker::new(),
                vec![Param::new::<String>("input")],
                move |Arg(input): Arg<String>| -> anyhow::Result<Tally> {
                    let count = tally.context.increment();
                    Ok(Tally { input, count })
                },
            )
            .tool(
                "fail",
                ToolMarker::new(),
                vec![],
                || -> anyhow::Result<String> { anyhow::bail!("boom") },
            )
            .tool_async(
                "record",
                ToolMarker::new().description("Count a call and return nothing"),
                vec![],
                move || {
                    record.context.increment();
                    async { anyhow::Ok(()) }
                },
            )
            .resource(
                "doc",
                ResourceMarker::new("docs/{id}").name("document"),
                vec![Param::new::<String>("id")],
                |Arg(id): Arg<String>| -> anyhow::Result<String> { Ok(id) },
            )
            .prompt(
                "intro",
                PromptMarker::new().description("Introduce someone"),
                vec![Param::new::<String>("name")],
                |Arg(name): Arg<String>| -> anyhow::Result<String> {
                    Ok(format!("Please welcome {name}."))
                },
            );
    }
}

pub fn components(component: Arc<dyn McpComponent>) -> Vec<Arc<dyn McpComponent>> {
    vec![component]
}

/// A session whose client declared `capabilities`.
pub fn test_exchange(
    capabilities: ClientCapabilities,
) -> (Exchange, mpsc::UnboundedReceiver<ServerNotification>) {
    let (exchange, rx) = ChannelExchange::new(capabilities);
    (
        exchange
            .with_session_id("test-session")
            .with_client_info("test-client", "1.0.0")
            .into_exchange(),
        rx,
    )
}

/// Everything sent so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerNotification>) -> Vec<ServerNotification> {
    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    received
}
