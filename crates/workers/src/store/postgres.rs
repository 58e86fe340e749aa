use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_common::{Alert, Rule};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{AlertFilter, Store, StoreError};

const ALERT_COLUMNS: &str = "id, rule_id, service_name, alert_type, severity, message, value, \
     threshold, created_at, acknowledged, acknowledged_by, acknowledged_at";

const RULE_COLUMNS: &str = "id, name, description, service_name, metric_type, threshold, \
     operator, severity, enabled, cooldown_secs, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Transient(e.to_string())
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Invalid(format!("{column}: {e}")))
}

fn alert_from_row(row: &PgRow) -> Result<Alert, StoreError> {
    Ok(Alert {
        id: row.try_get("id")?,
        rule_id: row.try_get("rule_id")?,
        service_name: row.try_get("service_name")?,
        alert_type: parse_column(row, "alert_type")?,
        severity: parse_column(row, "severity")?,
        message: row.try_get("message")?,
        value: row.try_get("value")?,
        threshold: row.try_get("threshold")?,
        timestamp: row.try_get("created_at")?,
        acknowledged: row.try_get("acknowledged")?,
        acknowledged_by: row.try_get("acknowledged_by")?,
        acknowledged_at: row.try_get("acknowledged_at")?,
    })
}

fn rule_from_row(row: &PgRow) -> Result<Rule, StoreError> {
    let cooldown: i64 = row.try_get("cooldown_secs")?;
    Ok(Rule {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        service_name: row.try_get("service_name")?,
        metric_type: parse_column(row, "metric_type")?,
        threshold: row.try_get("threshold")?,
        operator: parse_column(row, "operator")?,
        severity: parse_column(row, "severity")?,
        enabled: row.try_get("enabled")?,
        cooldown_secs: u64::try_from(cooldown)
            .map_err(|_| StoreError::Invalid(format!("cooldown_secs: {cooldown}")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn put_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO alerts
               (id, rule_id, service_name, alert_type, severity, message, value, threshold,
                created_at, acknowledged, acknowledged_by, acknowledged_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               ON CONFLICT (id) DO NOTHING"#,
        )
        .bind(&alert.id)
        .bind(&alert.rule_id)
        .bind(&alert.service_name)
        .bind(alert.alert_type.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(alert.value)
        .bind(alert.threshold)
        .bind(alert.timestamp)
        .bind(alert.acknowledged)
        .bind(&alert.acknowledged_by)
        .bind(alert.acknowledged_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, StoreError> {
        let row = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        alert_from_row(&row)
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE ($1::text IS NULL OR service_name = $1)
               AND ($2::text IS NULL OR severity = $2)
               AND ($3::boolean IS NULL OR acknowledged = $3)
             ORDER BY created_at DESC, id ASC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.service.as_deref())
        .bind(filter.severity.map(|s| s.as_str()))
        .bind(filter.acknowledged)
        .bind(i64::from(filter.effective_limit()))
        .bind(i64::from(filter.effective_offset()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(alert_from_row).collect()
    }

    async fn acknowledge_alert(
        &self,
        id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        if actor.trim().is_empty() {
            return Err(StoreError::Invalid("acknowledging actor must not be empty".into()));
        }

        let updated = sqlx::query(&format!(
            "UPDATE alerts SET acknowledged = TRUE, acknowledged_by = $2, acknowledged_at = $3
             WHERE id = $1 AND acknowledged = FALSE
             RETURNING {ALERT_COLUMNS}"
        ))
        .bind(id)
        .bind(actor)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => alert_from_row(&row),
            None => {
                // Either missing or already acknowledged; the lookup tells which.
                let existing = self.get_alert(id).await?;
                Err(StoreError::AlreadyAcknowledged(existing.id))
            }
        }
    }

    async fn get_rules(&self) -> Result<Vec<Rule>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM alert_rules ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(rule_from_row).collect()
    }

    async fn put_rule(&self, rule: &Rule) -> Result<(), StoreError> {
        let cooldown = i64::try_from(rule.cooldown_secs)
            .map_err(|_| StoreError::Invalid(format!("cooldown_secs: {}", rule.cooldown_secs)))?;

        sqlx::query(
            r#"INSERT INTO alert_rules
               (id, name, description, service_name, metric_type, threshold, operator,
                severity, enabled, cooldown_secs, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               ON CONFLICT (id) DO UPDATE SET
                 name = EXCLUDED.name,
                 description = EXCLUDED.description,
                 service_name = EXCLUDED.service_name,
                 metric_type = EXCLUDED.metric_type,
                 threshold = EXCLUDED.threshold,
                 operator = EXCLUDED.operator,
                 severity = EXCLUDED.severity,
                 enabled = EXCLUDED.enabled,
                 cooldown_secs = EXCLUDED.cooldown_secs,
                 updated_at = EXCLUDED.updated_at"#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.service_name)
        .bind(rule.metric_type.as_str())
        .bind(rule.threshold)
        .bind(rule.operator.as_str())
        .bind(rule.severity.as_str())
        .bind(rule.enabled)
        .bind(cooldown)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_rule(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM alert_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
