use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One consumption transaction. Several records may share a part and a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageRecord {
    pub part_id: String,
    pub usage_date: NaiveDate,
    pub quantity: i64,
}

#[cfg(test)]
impl UsageRecord {
    pub fn new(part_id: impl Into<String>, usage_date: NaiveDate, quantity: i64) -> Self {
        Self {
            part_id: part_id.into(),
            usage_date,
            quantity,
        }
    }
}
