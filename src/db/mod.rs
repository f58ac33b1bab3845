use std::future::Future;

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::AnalyticsResult;
use crate::models::*;

#[cfg(test)]
mod memory;
#[cfg(test)]
pub use memory::MemorySource;

/// Read-only access to the inventory data the engine analyses.
pub trait InventorySource: Send + Sync {
    fn fetch_parts(&self) -> impl Future<Output = AnalyticsResult<Vec<Part>>> + Send;

    /// Usage of `part_ids` between `start` and `end`, both inclusive.
    fn fetch_usage(
        &self,
        part_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = AnalyticsResult<Vec<UsageRecord>>> + Send;
}

// ── Postgres ──────────────────────────────────────────────────────────────────

/// Discontinued parts are not inventory and stay out of every report.
const ACTIVE_PARTS_QUERY: &str = r#"
    SELECT part_id::text                       AS part_id,
           name,
           manufacturer_part_number,
           quantity::int8                      AS quantity,
           COALESCE(minimum_quantity, 0)::int8 AS minimum_quantity,
           COALESCE(unit_cost, 0)::float8      AS unit_cost
    FROM parts
    WHERE status = 'active'
    ORDER BY part_id
"#;

impl InventorySource for PgPool {
    async fn fetch_parts(&self) -> AnalyticsResult<Vec<Part>> {
        let parts = sqlx::query_as::<_, Part>(ACTIVE_PARTS_QUERY)
            .fetch_all(self)
            .await?;

        Ok(parts)
    }

    async fn fetch_usage(
        &self,
        part_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalyticsResult<Vec<UsageRecord>> {
        if part_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, UsageRecord>(
            r#"
            SELECT part_id::text     AS part_id,
                   usage_date::date  AS usage_date,
                   quantity::int8    AS quantity
            FROM parts_usage
            WHERE part_id::text = ANY($1)
              AND usage_date::date BETWEEN $2 AND $3
            ORDER BY usage_date ASC
            "#,
        )
        .bind(part_ids)
        .bind(start)
        .bind(end)
        .fetch_all(self)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_query_reads_active_rows_only() {
        let sql: String = ACTIVE_PARTS_QUERY.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(sql.contains("FROM parts WHERE status = 'active'"));
    }
}
