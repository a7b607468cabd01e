use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::resp::problem::{problems, Problem};

pub mod db;

pub static PRODUCT_COLLECTION_NAME: &str = "products";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.name.trim().is_empty() {
            return Err(problems::bad_request("Bad product.", "Product name can't be empty."));
        }
        if !(self.price >= 0.0) {
            return Err(problems::bad_request("Bad product.", "Price can't be negative."));
        }
        if let Some(sale_price) = self.sale_price {
            if !(0.0..=self.price).contains(&sale_price) {
                return Err(problems::bad_request(
                    "Bad product.",
                    "Sale price must be between 0 and the regular price.",
                ));
            }
        }
        if self.stock < 0 {
            return Err(problems::bad_request("Bad product.", "Stock can't be negative."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        serde_json::from_value(serde_json::json!({
            "name": "Yamaha C40",
            "price": 2_900_000.0,
            "stock": 4,
            "specs": { "top": "spruce", "strings": "nylon" },
        }))
        .unwrap()
    }

    #[test]
    fn optional_members_default() {
        let product = product();

        assert!(product.images.is_empty());
        assert_eq!(product.sale_price, None);
        assert_eq!(product.specs["strings"], "nylon");
        assert!(product.validate().is_ok());
    }

    #[test]
    fn prices_and_stock_are_validated() {
        let mut on_sale = product();
        on_sale.sale_price = Some(2_500_000.0);
        assert!(on_sale.validate().is_ok());

        on_sale.sale_price = Some(3_000_000.0);
        assert!(on_sale.validate().is_err());

        let mut negative = product();
        negative.price = -1.0;
        assert!(negative.validate().is_err());

        let mut nan = product();
        nan.price = f64::NAN;
        assert!(nan.validate().is_err());

        let mut no_stock = product();
        no_stock.stock = -2;
        assert!(no_stock.validate().is_err());
    }
}
