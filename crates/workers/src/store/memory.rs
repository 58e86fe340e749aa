use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pulse_common::{AckError, Alert, Rule};

use super::{AlertFilter, Store, StoreError};

/// Process-local store used when no database is configured, and by tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    alerts: Arc<DashMap<String, Alert>>,
    rules: Arc<DashMap<String, Rule>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.rules.insert(rule.id.clone(), rule);
        }
        store
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        // First write wins; a redelivered alert must not reset an acknowledgment.
        self.alerts
            .entry(alert.id.clone())
            .or_insert_with(|| alert.clone());
        Ok(())
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, StoreError> {
        self.alerts
            .get(id)
            .map(|a| a.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let mut matched: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| filter.matches(a.value()))
            .map(|a| a.value().clone())
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

        Ok(matched
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn acknowledge_alert(
        &self,
        id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let mut entry = self
            .alerts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.acknowledge(actor, at).map_err(|e| match e {
            AckError::AlreadyAcknowledged(id) => StoreError::AlreadyAcknowledged(id),
            other @ AckError::EmptyActor => StoreError::Invalid(other.to_string()),
        })?;
        Ok(entry.clone())
    }

    async fn get_rules(&self) -> Result<Vec<Rule>, StoreError> {
        let mut rules: Vec<Rule> = self.rules.iter().map(|r| r.value().clone()).collect();
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rules)
    }

    async fn put_rule(&self, rule: &Rule) -> Result<(), StoreError> {
        self.rules.insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn delete_rule(&self, id: &str) -> Result<(), StoreError> {
        self.rules
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
