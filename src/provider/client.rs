//! Provider for client-side handlers.

use super::{finish, Accepts, Scan};
use crate::{
    callback::client::{AsyncClientSpecification, SyncClientSpecification},
    component::{DeclaredClient, McpComponent, Methods},
    error::McpResult,
    protocol::{
        CreateMessageRequest, ElicitRequest, LoggingMessageNotification, ProgressNotification,
        PromptsChanged, ResourcesChanged, ToolsChanged,
    },
};
use std::sync::Arc;

/// Builds elicitation, sampling, logging, progress and list-changed handlers.
///
/// Client handlers never see a session, so methods that bind an exchange or
/// a request context are skipped.
#[derive(Debug, Clone)]
pub struct ClientProvider {
    scan: Scan,
}

impl ClientProvider {
    pub fn new(components: Vec<Arc<dyn McpComponent>>) -> Self {
        Self {
            scan: Scan::new(&components),
        }
    }

    /// Blocking handlers for the client message `R`.
    pub fn sync_specifications<R: DeclaredClient>(
        &self,
    ) -> McpResult<Vec<SyncClientSpecification<R>>> {
        let accepts = Accepts {
            asynchronous: false,
            sessionless: true,
        };
        let specs = self
            .scan
            .eligible(accepts, Methods::clients::<R>)?
            .into_iter()
            .map(|found| SyncClientSpecification::build(found.marker, found.method))
            .collect::<McpResult<Vec<_>>>()?;
        Ok(finish(R::KIND, self.scan.component_count(), specs))
    }

    /// Asynchronous handlers for the client message `R`.
    pub fn async_specifications<R: DeclaredClient>(
        &self,
    ) -> McpResult<Vec<AsyncClientSpecification<R>>> {
        let accepts = Accepts {
            asynchronous: true,
            sessionless: true,
        };
        let specs = self
            .scan
            .eligible(accepts, Methods::clients::<R>)?
            .into_iter()
            .map(|found| AsyncClientSpecification::build(found.marker, found.method))
            .collect::<McpResult<Vec<_>>>()?;
        Ok(finish(R::KIND, self.scan.component_count(), specs))
    }

    pub fn elicitation(&self) -> McpResult<Vec<SyncClientSpecification<ElicitRequest>>> {
        self.sync_specifications()
    }

    pub fn elicitation_async(&self) -> McpResult<Vec<AsyncClientSpecification<ElicitRequest>>> {
        self.async_specifications()
    }

    pub fn sampling(&self) -> McpResult<Vec<SyncClientSpecification<CreateMessageRequest>>> {
        self.sync_specifications()
    }

    pub fn sampling_async(
        &self,
    ) -> McpResult<Vec<AsyncClientSpecification<CreateMessageRequest>>> {
        self.async_specifications()
    }

    pub fn logging(
        &self,
    ) -> McpResult<Vec<SyncClientSpecification<LoggingMessageNotification>>> {
        self.sync_specifications()
    }

    pub fn logging_async(
        &self,
    ) -> McpResult<Vec<AsyncClientSpecification<LoggingMessageNotification>>> {
        self.async_specifications()
    }

    pub fn progress(&self) -> McpResult<Vec<SyncClientSpecification<ProgressNotification>>> {
        self.sync_specifications()
    }

    pub fn progress_async(
        &self,
    ) -> McpResult<Vec<AsyncClientSpecification<ProgressNotification>>> {
        self.async_specifications()
    }

    pub fn tools_changed(&self) -> McpResult<Vec<SyncClientSpecification<ToolsChanged>>> {
        self.sync_specifications()
    }

    pub fn tools_changed_async(&self) -> McpResult<Vec<AsyncClientSpecification<ToolsChanged>>> {
        self.async_specifications()
    }

    pub fn prompts_changed(&self) -> McpResult<Vec<SyncClientSpecification<PromptsChanged>>> {
        self.sync_specifications()
    }

    pub fn prompts_changed_async(
        &self,
    ) -> McpResult<Vec<AsyncClientSpecification<PromptsChanged>>> {
        self.async_specifications()
    }

    pub fn resources_changed(
        &self,
    ) -> McpResult<Vec<SyncClientSpecification<ResourcesChanged>>> {
        self.sync_specifications()
    }

    pub fn resources_changed_async(
        &self,
    ) -> McpResult<Vec<AsyncClientSpecification<ResourcesChanged>>> {
        self.async_specifications()
    }
}
