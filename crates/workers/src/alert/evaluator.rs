use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use pulse_common::{Alert, Clock, MetricSample, Rule, ValidationError};

use super::message::render_message;
use super::state::RuleState;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("invalid sample: {0}")]
    InvalidSample(#[from] ValidationError),
}

/// Holds the active rule set and the cooldown state of every rule.
///
/// The rule set is swapped as a whole behind an `Arc`. An evaluation holds
/// the read side for its whole run, so it never advances state for a rule
/// that a concurrent reload or delete has already dropped.
pub struct Evaluator {
    rules: RwLock<Arc<Vec<Rule>>>,
    states: DashMap<String, RuleState>,
    clock: Arc<dyn Clock>,
}

impl Evaluator {
    pub fn new(rules: Vec<Rule>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules: RwLock::new(Arc::new(rules)),
            states: DashMap::new(),
            clock,
        }
    }

    pub fn rules(&self) -> Arc<Vec<Rule>> {
        self.rules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn rule(&self, id: &str) -> Option<Rule> {
        self.rules().iter().find(|r| r.id == id).cloned()
    }

    /// Replaces the whole rule set. Cooldown state survives for ids still
    /// present and is dropped for the rest.
    pub fn load_rules(&self, rules: Vec<Rule>) {
        let mut guard = self.rules.write().unwrap_or_else(|e| e.into_inner());
        self.states
            .retain(|id, _| rules.iter().any(|r| &r.id == id));
        *guard = Arc::new(rules);
        tracing::info!(count = guard.len(), "rule set loaded");
    }

    /// Inserts or replaces a single rule, keeping its position if it exists.
    pub fn upsert_rule(&self, rule: Rule) {
        let mut guard = self.rules.write().unwrap_or_else(|e| e.into_inner());
        let mut next: Vec<Rule> = guard.as_ref().clone();
        match next.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => next.push(rule),
        }
        *guard = Arc::new(next);
    }

    pub fn remove_rule(&self, id: &str) -> bool {
        let mut guard = self.rules.write().unwrap_or_else(|e| e.into_inner());
        if !guard.iter().any(|r| r.id == id) {
            return false;
        }
        let next: Vec<Rule> = guard.iter().filter(|r| r.id != id).cloned().collect();
        *guard = Arc::new(next);
        self.states.remove(id);
        true
    }

    pub fn state_of(&self, rule_id: &str) -> RuleState {
        self.states
            .get(rule_id)
            .map(|s| *s)
            .unwrap_or(RuleState::Idle)
    }

    /// Whether the rule would currently be suppressed if its condition held.
    pub fn cooling_down(&self, rule: &Rule) -> bool {
        !self
            .state_of(&rule.id)
            .is_eligible(self.clock.now(), rule.cooldown())
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn evaluate(&self, sample: &MetricSample) -> Result<Vec<Alert>, EvalError> {
        sample.validate()?;

        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        let mut fired = Vec::new();

        for rule in rules.iter() {
            if !rule.enabled || rule.service_name != sample.service_name {
                continue;
            }

            let value = sample.value_of(rule.metric_type);
            if !rule.operator.compare(value, rule.threshold) {
                continue;
            }

            let mut state = self.states.entry(rule.id.clone()).or_insert(RuleState::Idle);
            let Some(next) = state.fire(now, rule.cooldown()) else {
                tracing::debug!(rule_id = %rule.id, service = %sample.service_name, "rule in cooldown");
                continue;
            };
            *state = next;
            drop(state);

            fired.push(Alert {
                id: uuid::Uuid::new_v4().to_string(),
                rule_id: Some(rule.id.clone()),
                service_name: sample.service_name.clone(),
                alert_type: rule.metric_type,
                severity: rule.severity,
                message: render_message(rule, &sample.service_name, value),
                value,
                threshold: rule.threshold,
                timestamp: now,
                acknowledged: false,
                acknowledged_by: None,
                acknowledged_at: None,
            });
        }

        Ok(fired)
    }
}
