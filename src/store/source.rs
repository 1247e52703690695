use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::core::error::Result;

/// One row as it arrives from a source, before normalization.
///
/// Every column is optional and loosely typed so that a bad cell only
/// defaults that field. Aliases accept the CSV header spellings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(alias = "Customer ID", alias = "customerId", alias = "customer_id", alias = "Transaction ID", alias = "transactionId")]
    pub id: Option<Value>,
    #[serde(alias = "Date")]
    pub date: Option<Value>,
    #[serde(alias = "Customer Name", alias = "customerName")]
    pub customer_name: Option<Value>,
    #[serde(alias = "Phone Number", alias = "phoneNumber", alias = "phone")]
    pub phone_number: Option<Value>,
    #[serde(alias = "Age")]
    pub age: Option<Value>,
    #[serde(alias = "Customer Region", alias = "Region", alias = "customerRegion")]
    pub region: Option<Value>,
    #[serde(alias = "Gender")]
    pub gender: Option<Value>,
    #[serde(alias = "Product Category", alias = "productCategory")]
    pub product_category: Option<Value>,
    #[serde(alias = "Payment Method", alias = "paymentMethod")]
    pub payment_method: Option<Value>,
    #[serde(alias = "Order Status", alias = "orderStatus")]
    pub order_status: Option<Value>,
    #[serde(alias = "Tags")]
    pub tags: Option<Value>,
    #[serde(alias = "Quantity")]
    pub quantity: Option<Value>,
    #[serde(alias = "Price per Unit", alias = "Unit Price", alias = "unitPrice", alias = "price_per_unit")]
    pub unit_price: Option<Value>,
    #[serde(alias = "Discount Percentage", alias = "discountPercentage")]
    pub discount_percentage: Option<Value>,
    #[serde(alias = "Total Amount", alias = "totalAmount")]
    pub total_amount: Option<Value>,
    #[serde(alias = "Final Amount", alias = "finalAmount")]
    pub final_amount: Option<Value>,
}

/// A raw row plus whether it could not be decoded at all.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub raw: RawRecord,
    pub malformed: bool,
}

impl SourceRow {
    pub fn parsed(raw: RawRecord) -> Self {
        SourceRow { raw, malformed: false }
    }

    pub fn malformed() -> Self {
        SourceRow { raw: RawRecord::default(), malformed: true }
    }
}

pub type RowIter<'a> = Box<dyn Iterator<Item = Result<SourceRow>> + Send + 'a>;

/// Upstream provider of sales rows.
///
/// `rows` failing, or the iterator yielding `Err`, means the source itself is
/// unreadable. Undecodable individual rows come back as `SourceRow::malformed`.
pub trait RecordSource: Send + Sync {
    fn rows(&self) -> Result<RowIter<'_>>;

    fn name(&self) -> String;
}

/// Newline-delimited JSON objects, one sale per line.
pub struct JsonLinesSource {
    pub path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonLinesSource { path: path.into() }
    }
}

impl RecordSource for JsonLinesSource {
    fn rows(&self) -> Result<RowIter<'_>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let iter = reader
            .lines()
            .filter(|line| match line {
                Ok(text) => !text.trim().is_empty(),
                Err(_) => true,
            })
            .map(|line| {
                let line = line?;
                Ok(match serde_json::from_str::<RawRecord>(&line) {
                    Ok(raw) => SourceRow::parsed(raw),
                    Err(_) => SourceRow::malformed(),
                })
            });

        Ok(Box::new(iter))
    }

    fn name(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

/// Rows already in memory.
#[derive(Default, Clone)]
pub struct MemorySource {
    pub rows: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        MemorySource { rows }
    }

    /// Convenience for callers holding JSON values.
    pub fn from_values(values: Vec<Value>) -> Self {
        let rows = values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .collect();
        MemorySource { rows }
    }
}

impl RecordSource for MemorySource {
    fn rows(&self) -> Result<RowIter<'_>> {
        Ok(Box::new(self.rows.iter().cloned().map(|raw| Ok(SourceRow::parsed(raw)))))
    }

    fn name(&self) -> String {
        format!("memory:{} rows", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_header_aliases_are_accepted() {
        let raw: RawRecord = serde_json::from_value(json!({
            "Customer ID": 7,
            "Customer Name": "Asha Verma",
            "Phone Number": "98765 43210",
            "Final Amount": "120.5"
        }))
        .unwrap();

        assert_eq!(raw.id, Some(json!(7)));
        assert_eq!(raw.customer_name, Some(json!("Asha Verma")));
        assert_eq!(raw.final_amount, Some(json!("120.5")));
        assert!(raw.date.is_none());
    }
}
