mod memory;
pub mod migrator;
mod pool;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_common::{Alert, Rule, Severity};
use serde::Deserialize;

pub use memory::InMemoryStore;
pub use pool::create_pool;
pub use postgres::PgStore;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("alert {0} is already acknowledged")]
    AlreadyAcknowledged(String),
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AlertFilter {
    pub service: Option<String>,
    pub severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AlertFilter {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.service.as_deref().map_or(true, |s| s == alert.service_name)
            && self.severity.map_or(true, |s| s == alert.severity)
            && self.acknowledged.map_or(true, |a| a == alert.acknowledged)
    }
}

/// Persistence for alert history and rule definitions.
///
/// `put_alert` is an upsert keyed by alert id so that a redelivered bus
/// message never produces a second row.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn get_alert(&self, id: &str) -> Result<Alert, StoreError>;

    /// Newest first, ties broken by id.
    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError>;

    async fn acknowledge_alert(
        &self,
        id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError>;

    /// Ordered by creation time, then id.
    async fn get_rules(&self) -> Result<Vec<Rule>, StoreError>;

    async fn put_rule(&self, rule: &Rule) -> Result<(), StoreError>;

    async fn delete_rule(&self, id: &str) -> Result<(), StoreError>;
}
