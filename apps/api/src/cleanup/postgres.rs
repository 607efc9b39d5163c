use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::{ChildKind, ChildRecordRepository};
use crate::models::records::{ChildKey, ChildRecord};

/// Postgres repository over the `goals`, `check_ins` and `notes` tables.
#[derive(Clone)]
pub struct PgChildRecordRepository {
    pool: PgPool,
}

impl PgChildRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn table_for(kind: ChildKind) -> &'static str {
    match kind {
        ChildKind::CheckIns => "check_ins",
        ChildKind::Notes => "notes",
    }
}

#[async_trait]
impl ChildRecordRepository for PgChildRecordRepository {
    /// Fixed `(owner_id, id)` order with no cursor: rows behind a prefix of
    /// live records stay unexamined until that prefix shrinks.
    async fn scan_child_records(&self, kind: ChildKind, limit: usize) -> Result<Vec<ChildRecord>> {
        let sql = format!(
            "SELECT owner_id, id, goal_id, user_id, created_at FROM {} ORDER BY owner_id, id LIMIT $1",
            table_for(kind)
        );
        let records = sqlx::query_as::<_, ChildRecord>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to scan {}", table_for(kind)))?;
        Ok(records)
    }

    async fn goal_exists(&self, user_id: &str, goal_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM goals WHERE user_id = $1 AND id = $2)",
        )
        .bind(user_id)
        .bind(goal_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to look up goal")?;
        Ok(exists)
    }

    async fn delete_child_records(&self, kind: ChildKind, keys: &[ChildKey]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let owners: Vec<String> = keys.iter().map(|k| k.owner_id.clone()).collect();
        let ids: Vec<String> = keys.iter().map(|k| k.id.clone()).collect();

        // A single statement is atomic: either every staged record goes or none do.
        let sql = format!(
            "DELETE FROM {} WHERE (owner_id, id) IN (SELECT * FROM UNNEST($1::text[], $2::text[]))",
            table_for(kind)
        );
        let result = sqlx::query(&sql)
            .bind(&owners)
            .bind(&ids)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete from {}", table_for(kind)))?;
        Ok(result.rows_affected())
    }
}
