use serde::{Deserialize, Serialize};

/// Inventory part as read from the upstream parts table.
///
/// Quantities are signed so that corrupt upstream rows surface as
/// `InvalidInput` instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Part {
    pub part_id: String,
    pub name: String,
    pub manufacturer_part_number: Option<String>,
    pub quantity: i64,
    pub minimum_quantity: i64,
    pub unit_cost: f64,
}

impl Part {
    /// Stock value at unit cost.
    pub fn total_value(&self) -> f64 {
        self.quantity as f64 * self.unit_cost
    }

    /// Any stock short of the minimum, empty shelves included.
    pub fn is_below_minimum(&self) -> bool {
        self.quantity < self.minimum_quantity
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Short of the minimum but not empty.
    pub fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.is_below_minimum()
    }
}

#[cfg(test)]
pub(crate) fn part(id: &str, quantity: i64, minimum_quantity: i64, unit_cost: f64) -> Part {
    Part {
        part_id: id.to_string(),
        name: format!("Part {}", id),
        manufacturer_part_number: None,
        quantity,
        minimum_quantity,
        unit_cost,
    }
}
