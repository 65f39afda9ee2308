//! Cross-module unit tests
//!
//! Each suite wires several modules together the way a hosting runtime would:
//! a component declares methods, a provider builds specifications and a
//! callback is invoked against a hand-built request.

mod exchange_tests;
mod tool_dispatch_tests;

use crate::{
    component::{McpComponent, Methods},
    context::{ChannelExchange, Exchange},
    protocol::{ClientCapabilities, ServerNotification},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wrap a method table as a single-component list.
pub(crate) fn components(methods: Methods) -> Vec<Arc<dyn McpComponent>> {
    vec![Arc::new(methods)]
}

/// An exchange whose client supports everything, plus its notification feed.
pub(crate) fn exchange() -> (Exchange, mpsc::UnboundedReceiver<ServerNotification>) {
    let (exchange, rx) = ChannelExchange::new(ClientCapabilities::full());
    (exchange.with_session_id("session-1").into_exchange(), rx)
}
