//! Providers: scan components and build one specification per method.
//!
//! A provider is a single-shot builder. It collects each component's
//! [`Methods`] table when constructed, then turns the declared methods into
//! specifications on request. Methods that do not fit the provider (an async
//! body in a synchronous provider, a session-bound parameter in a stateless
//! one) are skipped with a warning; methods whose binding is invalid make the
//! whole call fail.

mod client;
mod server;

pub use client::ClientProvider;
pub use server::{
    AsyncProvider, StatefulAsyncProvider, StatefulSyncProvider, StatelessAsyncProvider,
    StatelessSyncProvider, SyncProvider,
};

use crate::{
    callback::tool::ToolMarker,
    component::{McpComponent, Methods},
    error::{McpError, McpResult},
    logging::{log_duplicate_name, log_method_skipped, log_provider_empty},
    method::Method,
    options::ProviderOptions,
};
use std::{collections::HashSet, sync::Arc};

/// What a provider accepts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accepts {
    pub asynchronous: bool,
    pub sessionless: bool,
}

/// State shared by every provider flavor.
#[derive(Debug, Clone)]
pub(crate) struct Scan {
    tables: Vec<Methods>,
    options: ProviderOptions,
    groups: Vec<String>,
}

impl Scan {
    pub(crate) fn new(components: &[Arc<dyn McpComponent>]) -> Self {
        Self {
            tables: components.iter().map(Methods::of).collect(),
            options: ProviderOptions::default(),
            groups: Vec::new(),
        }
    }

    pub(crate) fn options(&self) -> &ProviderOptions {
        &self.options
    }

    pub(crate) fn set_options(&mut self, options: ProviderOptions) {
        self.options = options;
    }

    /// Restrict tools to `groups`; every component must implement all of them.
    pub(crate) fn set_groups(&mut self, groups: Vec<String>) -> McpResult<()> {
        for table in &self.tables {
            if let Some(missing) = groups.iter().find(|g| !table.has_group(g)) {
                return Err(McpError::MissingToolGroup {
                    component: table.component().to_string(),
                    group: missing.clone(),
                });
            }
        }
        self.groups = groups;
        Ok(())
    }

    pub(crate) fn component_count(&self) -> usize {
        self.tables.len()
    }

    /// Methods of one capability that fit the provider, with their binding checked.
    pub(crate) fn eligible<'a, M, R, O>(
        &'a self,
        accepts: Accepts,
        select: impl Fn(&'a Methods) -> Vec<(&'a M, &'a Method<R, O>)>,
    ) -> McpResult<Vec<Eligible<'a, M, R, O>>> {
        let mut found = Vec::new();
        for table in &self.tables {
            for (marker, method) in select(table) {
                if method.is_async() != accepts.asynchronous {
                    let reason = if accepts.asynchronous {
                        "synchronous method in an asynchronous provider"
                    } else {
                        "asynchronous method in a synchronous provider"
                    };
                    log_method_skipped(table.component(), method.name(), reason);
                    continue;
                }
                let plan = method.plan()?;
                if accepts.sessionless && plan.requires_session() {
                    log_method_skipped(
                        table.component(),
                        method.name(),
                        "binds a session-only parameter without a session",
                    );
                    continue;
                }
                found.push(Eligible {
                    component: table.component(),
                    marker,
                    method,
                });
            }
        }
        Ok(found)
    }

    /// Published tool name, or `None` when tool groups exclude the method.
    pub(crate) fn tool_name<R, O>(
        &self,
        found: &Eligible<'_, ToolMarker, R, O>,
    ) -> Option<String> {
        let name = found.marker.effective_name(found.method.name());
        if self.groups.is_empty() {
            return Some(name);
        }
        let group = found
            .marker
            .group
            .as_deref()
            .filter(|g| self.groups.iter().any(|c| c.as_str() == *g));
        match group {
            Some(group) => Some(format!("{group}{}{name}", self.options.group_separator)),
            None => {
                log_method_skipped(
                    found.component,
                    found.method.name(),
                    "not in a configured tool group",
                );
                None
            }
        }
    }
}

/// A method that passed the provider's checks.
pub(crate) struct Eligible<'a, M, R, O> {
    pub component: &'a str,
    pub marker: &'a M,
    pub method: &'a Method<R, O>,
}

/// Tracks published names when deduplication is enabled.
pub(crate) struct Names {
    kind: &'static str,
    enabled: bool,
    seen: HashSet<String>,
}

impl Names {
    pub(crate) fn new(kind: &'static str, options: &ProviderOptions) -> Self {
        Self {
            kind,
            enabled: options.deduplicate_names,
            seen: HashSet::new(),
        }
    }

    /// `false` when `name` was already published and must be dropped.
    pub(crate) fn admit(&mut self, name: &str) -> bool {
        if !self.enabled || self.seen.insert(name.to_string()) {
            return true;
        }
        log_duplicate_name(self.kind, name);
        false
    }
}

pub(crate) fn finish<T>(kind: &str, components: usize, specs: Vec<T>) -> Vec<T> {
    if specs.is_empty() {
        log_provider_empty(kind, components);
    }
    specs
}
