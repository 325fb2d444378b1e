//! Detail drawers for stakeholders, business drivers and data entities.
//!
//! Each drawer owns one background fetch. Closing or dropping the drawer
//! cancels it, and a cancelled fetch never writes its result.

use parking_lot::Mutex;
use reqdesk_api::{Backend, DataEntityDetail, DriverDetail, StakeholderDetail};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Stakeholder,
    Driver,
    DataEntity,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Stakeholder => "stakeholder",
            EntityKind::Driver => "business driver",
            EntityKind::DataEntity => "data entity",
        }
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stakeholder" | "stakeholders" => Ok(EntityKind::Stakeholder),
            "driver" | "drivers" | "business_driver" => Ok(EntityKind::Driver),
            "entity" | "data_entity" | "data-entity" => Ok(EntityKind::DataEntity),
            other => Err(Error::Other(format!("Unknown entity kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> DetailState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, DetailState::Loading)
    }
}

pub struct DetailDrawer<T> {
    entity_id: String,
    state: Arc<Mutex<DetailState<T>>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> DetailDrawer<T> {
    /// Start loading in the background. Must be called inside a tokio runtime.
    pub fn open<F>(entity_id: impl Into<String>, fetch: F) -> Self
    where
        F: Future<Output = reqdesk_api::Result<T>> + Send + 'static,
    {
        let entity_id = entity_id.into();
        let state = Arc::new(Mutex::new(DetailState::Loading));
        let cancel = CancellationToken::new();

        let task_state = state.clone();
        let task_cancel = cancel.clone();
        let task_id = entity_id.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    tracing::debug!("Detail load for {} cancelled", task_id);
                }
                result = fetch => {
                    if task_cancel.is_cancelled() {
                        return;
                    }
                    let next = match result {
                        Ok(detail) => DetailState::Loaded(detail),
                        Err(e) => {
                            tracing::warn!("Failed to load {}: {}", task_id, e);
                            DetailState::Failed(e.user_message())
                        }
                    };
                    *task_state.lock() = next;
                }
            }
        });

        Self {
            entity_id,
            state,
            cancel,
            task: Some(task),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&DetailState<T>) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading()
    }

    /// Stop the fetch; whatever it returns afterwards is discarded
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Wait for the background fetch to settle or be cancelled
    pub async fn settled(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T: Clone> DetailDrawer<T> {
    pub fn snapshot(&self) -> DetailState<T> {
        self.state.lock().clone()
    }
}

impl<T> Drop for DetailDrawer<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A drawer for any of the three entity kinds
pub enum EntityDrawer {
    Stakeholder(DetailDrawer<StakeholderDetail>),
    Driver(DetailDrawer<DriverDetail>),
    DataEntity(DetailDrawer<DataEntityDetail>),
}

impl EntityDrawer {
    pub fn open(
        kind: EntityKind,
        backend: Arc<dyn Backend>,
        project_id: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        let project_id = project_id.into();
        let entity_id = entity_id.into();
        let id = entity_id.clone();
        match kind {
            EntityKind::Stakeholder => EntityDrawer::Stakeholder(DetailDrawer::open(
                entity_id,
                async move { backend.get_stakeholder(&project_id, &id).await },
            )),
            EntityKind::Driver => EntityDrawer::Driver(DetailDrawer::open(
                entity_id,
                async move { backend.get_driver_detail(&project_id, &id).await },
            )),
            EntityKind::DataEntity => EntityDrawer::DataEntity(DetailDrawer::open(
                entity_id,
                async move { backend.get_data_entity_detail(&project_id, &id).await },
            )),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDrawer::Stakeholder(_) => EntityKind::Stakeholder,
            EntityDrawer::Driver(_) => EntityKind::Driver,
            EntityDrawer::DataEntity(_) => EntityKind::DataEntity,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            EntityDrawer::Stakeholder(d) => d.entity_id(),
            EntityDrawer::Driver(d) => d.entity_id(),
            EntityDrawer::DataEntity(d) => d.entity_id(),
        }
    }

    pub fn close(&self) {
        match self {
            EntityDrawer::Stakeholder(d) => d.close(),
            EntityDrawer::Driver(d) => d.close(),
            EntityDrawer::DataEntity(d) => d.close(),
        }
    }

    pub async fn settled(&mut self) {
        match self {
            EntityDrawer::Stakeholder(d) => d.settled().await,
            EntityDrawer::Driver(d) => d.settled().await,
            EntityDrawer::DataEntity(d) => d.settled().await,
        }
    }
}
