use serde::{Deserialize, Serialize};

use crate::DATE_TIME_FORMAT;
use crate::host::{OrderRecord, ProductRecord};

/// Read-only projection of a product, used for reporting after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub status: String,
    pub created: String,
}

/// Read-only projection of an order, used for reporting after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: u64,
    pub customer: u64,
    pub total: f64,
    pub status: String,
    pub date: String,
}

impl From<&ProductRecord> for ProductSnapshot {
    fn from(record: &ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            price: record.price,
            status: record.status.clone(),
            created: record.created.format(DATE_TIME_FORMAT).to_string(),
        }
    }
}

impl From<&OrderRecord> for OrderSnapshot {
    fn from(record: &OrderRecord) -> Self {
        Self {
            id: record.id,
            customer: record.customer,
            total: record.total,
            status: record.status.clone(),
            date: record.created.format(DATE_TIME_FORMAT).to_string(),
        }
    }
}
