use std::collections::HashSet;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use crate::core::types::{Record, RecordId, RecordKeys};
use crate::store::source::RawRecord;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d", "%d/%m/%Y"];

/// Converts raw rows into canonical records.
///
/// Lenient on purpose: an unusable cell becomes 0 / empty / absent, the row is
/// kept. `normalize` reports whether any present cell had to be defaulted.
pub struct Normalizer {
    tag_delimiter: char,
}

impl Normalizer {
    pub fn new(tag_delimiter: char) -> Self {
        Normalizer { tag_delimiter }
    }

    /// `row_number` is 1-based and stands in for a missing identifier.
    pub fn normalize(&self, raw: &RawRecord, row_number: u64) -> (Record, bool) {
        let mut defaulted = false;

        let id = match raw.id.as_ref().and_then(as_u64) {
            Some(id) => id,
            None => {
                defaulted |= raw.id.is_some();
                row_number
            }
        };

        let date = raw.date.as_ref().and_then(|v| {
            let parsed = as_text(v).and_then(|s| parse_date(&s));
            defaulted |= parsed.is_none();
            parsed
        });

        let mut number = |value: &Option<Value>| -> Option<f64> {
            match value {
                None | Some(Value::Null) => None,
                Some(v) => match as_f64(v) {
                    Some(n) if n.is_finite() && n >= 0.0 => Some(n),
                    _ => {
                        defaulted = true;
                        None
                    }
                },
            }
        };

        let age = number(&raw.age).unwrap_or(0.0) as u32;
        let quantity = number(&raw.quantity).unwrap_or(0.0) as u64;
        let unit_price = number(&raw.unit_price).unwrap_or(0.0);
        let discount_percentage = number(&raw.discount_percentage).unwrap_or(0.0).min(100.0);
        let total_amount = number(&raw.total_amount).unwrap_or(quantity as f64 * unit_price);
        let final_amount = number(&raw.final_amount)
            .unwrap_or(total_amount * (1.0 - discount_percentage / 100.0));

        let tags = raw
            .tags
            .as_ref()
            .map(|v| self.split_tags(v))
            .unwrap_or_default();

        let record = Record {
            id: RecordId(id),
            date,
            customer_name: text(&raw.customer_name),
            phone_number: text(&raw.phone_number),
            age,
            region: text(&raw.region),
            gender: text(&raw.gender),
            product_category: text(&raw.product_category),
            payment_method: text(&raw.payment_method),
            order_status: text(&raw.order_status),
            tags,
            quantity,
            unit_price,
            discount_percentage,
            total_amount,
            final_amount,
            keys: RecordKeys::default(),
        };

        (record, defaulted)
    }

    fn split_tags(&self, value: &Value) -> Vec<String> {
        let mut tags: Vec<String> = match value {
            Value::Array(items) => items.iter().filter_map(as_text).collect(),
            other => as_text(other)
                .map(|s| s.split(self.tag_delimiter).map(str::to_string).collect())
                .unwrap_or_default(),
        };

        tags.iter_mut().for_each(|t| *t = t.trim().to_string());
        let mut seen = HashSet::new();
        tags.retain(|t| !t.is_empty() && seen.insert(t.to_lowercase()));
        tags
    }
}

fn text(value: &Option<Value>) -> String {
    value
        .as_ref()
        .and_then(as_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse().ok().or_else(|| {
                // identifiers like "CUST-00042"
                let digits = crate::core::types::digits_only(trimmed);
                if digits.is_empty() { None } else { digits.parse().ok() }
            })
        }
        _ => None,
    }
}

/// Parse the date formats seen in sales exports. Timestamps keep their date.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ts| ts.date())
}
