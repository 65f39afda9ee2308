//! Dispatch Benchmarks
//!
//! Cost of building specifications from a component and of binding and
//! invoking a tool per request, for each return mode.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mcpbind::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Serialize, schemars::JsonSchema)]
struct Stats {
    sum: i64,
    count: usize,
}

fn component() -> Arc<dyn McpComponent> {
    let mut methods = Methods::new("bench");
    methods
        .tool(
            "echo",
            ToolMarker::new(),
            vec![Param::new::<String>("message")],
            |Arg(message): Arg<String>| -> anyhow::Result<String> { Ok(message) },
        )
        .tool(
            "stats",
            ToolMarker::new(),
            vec![Param::new::<Vec<i64>>("values")],
            |Arg(values): Arg<Vec<i64>>| -> anyhow::Result<Stats> {
                Ok(Stats {
                    sum: values.iter().sum(),
                    count: values.len(),
                })
            },
        )
        .tool(
            "noop",
            ToolMarker::new(),
            vec![],
            |_: TransportContext, _: Meta| -> anyhow::Result<()> { Ok(()) },
        );
    Arc::new(methods)
}

fn benchmark_provider_build(c: &mut Criterion) {
    let components = vec![component()];

    c.bench_function("provider_build_tools", |b| {
        b.iter(|| {
            let provider = StatelessSyncProvider::new(black_box(components.clone()));
            provider.tools().unwrap()
        })
    });
}

fn benchmark_tool_calls(c: &mut Criterion) {
    let provider = StatelessSyncProvider::new(vec![component()]);
    let registry = SyncRegistry::from_provider(&provider).unwrap();
    let context = TransportContext::new().with("tenant", "bench");

    let requests = [
        (
            "text",
            CallToolRequest::new("echo").with_argument("message", "hello world"),
        ),
        (
            "structured",
            CallToolRequest::new("stats").with_argument("values", json!([1, 2, 3, 4, 5, 6, 7, 8])),
        ),
        ("void", CallToolRequest::new("noop")),
    ];

    let mut group = c.benchmark_group("tool_call");
    for (name, request) in requests {
        let request = Arc::new(request);
        group.bench_function(name, |b| {
            b.iter(|| {
                registry
                    .call_tool(&context, Arc::clone(black_box(&request)))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn benchmark_async_tool_call(c: &mut Criterion) {
    let mut methods = Methods::new("bench_async");
    methods.tool_async(
        "echo",
        ToolMarker::new(),
        vec![Param::new::<String>("message")],
        |Arg(message): Arg<String>| async move { anyhow::Ok(message) },
    );
    let provider = StatelessAsyncProvider::new(vec![Arc::new(methods)]);
    let registry = AsyncRegistry::from_provider(&provider).unwrap();
    let context = TransportContext::new();
    let request = Arc::new(CallToolRequest::new("echo").with_argument("message", "hello"));
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("async_tool_call", |b| {
        b.to_async(&runtime).iter(|| async {
            registry
                .call_tool(&context, Arc::clone(&request))
                .await
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_provider_build,
    benchmark_tool_calls,
    benchmark_async_tool_call
);
criterion_main!(benches);
