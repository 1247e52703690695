use serde::{Serialize, Deserialize};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use crate::core::error::{Error, ErrorKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn new(id: u64) -> Self {
        RecordId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id)
    }
}

/// Position of a record inside the loaded collection.
pub type Position = u32;

/// One sales transaction, normalized and immutable after load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub date: Option<NaiveDate>,
    pub customer_name: String,
    pub phone_number: String,
    pub age: u32,
    pub region: String,
    pub gender: String,
    pub product_category: String,
    pub payment_method: String,
    pub order_status: String,
    pub tags: Vec<String>,
    pub quantity: u64,
    pub unit_price: f64,
    pub discount_percentage: f64,
    pub total_amount: f64,
    pub final_amount: f64,

    /// Derived by `RecordStore`; anything set here is overwritten on load.
    #[serde(skip)]
    pub keys: RecordKeys,
}

/// Lowercased / digit-only projections computed once at load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordKeys {
    pub name: String,
    pub phone: String,
    pub phone_digits: String,
    pub region: String,
    pub gender: String,
    pub product_category: String,
    pub payment_method: String,
    pub order_status: String,
    pub tags: Vec<String>,
}

impl RecordKeys {
    pub fn from_record(record: &Record) -> Self {
        RecordKeys {
            name: record.customer_name.to_lowercase(),
            phone: record.phone_number.to_lowercase(),
            phone_digits: digits_only(&record.phone_number),
            region: record.region.to_lowercase(),
            gender: record.gender.to_lowercase(),
            product_category: record.product_category.to_lowercase(),
            payment_method: record.payment_method.to_lowercase(),
            order_status: record.order_status.to_lowercase(),
            tags: record.tags.iter().map(|t| t.to_lowercase()).collect(),
        }
    }
}

impl Record {
    /// Amount knocked off by the discount.
    pub fn discount_amount(&self) -> f64 {
        (self.total_amount - self.final_amount).max(0.0)
    }

    /// Lowercased value of an enumerated field. Tags have no single value.
    pub fn field_key(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::Region => Some(&self.keys.region),
            FilterField::Gender => Some(&self.keys.gender),
            FilterField::ProductCategory => Some(&self.keys.product_category),
            FilterField::PaymentMethod => Some(&self.keys.payment_method),
            FilterField::OrderStatus => Some(&self.keys.order_status),
            FilterField::Tags => None,
        }
    }

    /// Display values of a field as stored, used for filter-option enumeration.
    pub fn field_values(&self, field: FilterField) -> Vec<&str> {
        match field {
            FilterField::Region => vec![self.region.as_str()],
            FilterField::Gender => vec![self.gender.as_str()],
            FilterField::ProductCategory => vec![self.product_category.as_str()],
            FilterField::PaymentMethod => vec![self.payment_method.as_str()],
            FilterField::OrderStatus => vec![self.order_status.as_str()],
            FilterField::Tags => self.tags.iter().map(String::as_str).collect(),
        }
    }
}

/// Fields that accept a set of requested values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    Region,
    Gender,
    ProductCategory,
    PaymentMethod,
    OrderStatus,
    Tags,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::Region,
        FilterField::Gender,
        FilterField::ProductCategory,
        FilterField::PaymentMethod,
        FilterField::OrderStatus,
        FilterField::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::Region => "region",
            FilterField::Gender => "gender",
            FilterField::ProductCategory => "productCategory",
            FilterField::PaymentMethod => "paymentMethod",
            FilterField::OrderStatus => "orderStatus",
            FilterField::Tags => "tags",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "region" | "customerregion" => Ok(FilterField::Region),
            "gender" => Ok(FilterField::Gender),
            "productcategory" | "category" => Ok(FilterField::ProductCategory),
            "paymentmethod" | "payment" => Ok(FilterField::PaymentMethod),
            "orderstatus" | "status" => Ok(FilterField::OrderStatus),
            "tags" | "tag" => Ok(FilterField::Tags),
            _ => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Unknown filter field '{}'", s),
            )),
        }
    }
}

/// Keep ASCII digits only.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_projection_strips_formatting() {
        assert_eq!(digits_only("+91 (987) 654-3210"), "919876543210");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn filter_field_parses_loose_names() {
        assert_eq!("Product Category".parse::<FilterField>().unwrap(), FilterField::ProductCategory);
        assert_eq!("payment_method".parse::<FilterField>().unwrap(), FilterField::PaymentMethod);
        assert_eq!("region".parse::<FilterField>().unwrap(), FilterField::Region);
        assert!("colour".parse::<FilterField>().is_err());
    }
}
