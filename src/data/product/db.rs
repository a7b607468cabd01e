use bson::oid::ObjectId;
use bson::{doc, Document};
use chrono::Utc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use serde::Deserialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::{Product, PRODUCT_COLLECTION_NAME};
use crate::data::{collect, filter, inserted_id};
use crate::middleware::paging::PageState;
use crate::resp::problem::{problems, Problem};

/// Product as sent by the portal. Unknown members such as `_id` are ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
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
}

impl ProductData {
    pub fn into_product(self) -> Result<Product, Problem> {
        let now = Utc::now();
        let product = Product {
            id: None,
            name: self.name,
            description: self.description,
            price: self.price,
            sale_price: self.sale_price,
            stock: self.stock,
            category: self.category,
            images: self.images,
            specs: self.specs,
            created_at: Some(now),
            updated_at: Some(now),
        };
        product.validate()?;
        Ok(product)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct StockData {
    /// Added to the current stock, negative for sales.
    pub delta: i64,
}

pub fn insufficient_stock(id: ObjectId, delta: i64) -> Problem {
    problems::conflict(
        "Insufficient stock.",
        format!("Stock can't go below zero (change of {}).", delta),
    )
    .insert_str("id", id)
    .to_owned()
}

/// Sets every member except the id and creation time.
fn product_update(product: &Product) -> Result<Document, Problem> {
    let mut set = bson::to_document(product)?;
    set.remove("_id");
    set.remove("createdAt");
    set.insert("updatedAt", Utc::now().to_rfc3339());
    Ok(doc! { "$set": set })
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

#[allow(async_fn_in_trait)]
pub trait ProductDbExt {
    async fn create_product(&self, product: Product) -> Result<Product, Problem>;

    async fn get_product(&self, id: ObjectId) -> Result<Option<Product>, Problem>;

    async fn list_products(
        &self,
        category: Option<String>,
        page: PageState,
    ) -> Result<Vec<Product>, Problem>;

    async fn replace_product(&self, id: ObjectId, product: &Product) -> Result<Option<Product>, Problem>;

    /// Adds `delta` to the stock, as long as the result isn't negative.
    async fn adjust_stock(&self, id: ObjectId, delta: i64) -> Result<Product, Problem>;
}

impl ProductDbExt for Database {
    async fn create_product(&self, mut product: Product) -> Result<Product, Problem> {
        let result = self
            .collection::<Product>(PRODUCT_COLLECTION_NAME)
            .insert_one(&product, None)
            .await?;
        product.id = inserted_id(&result);

        tracing::info!("Created product '{}'", product.name);
        Ok(product)
    }

    async fn get_product(&self, id: ObjectId) -> Result<Option<Product>, Problem> {
        self.collection(PRODUCT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_products(
        &self,
        category: Option<String>,
        page: PageState,
    ) -> Result<Vec<Product>, Problem> {
        let options = page.apply(FindOptions::builder().sort(doc! { "name": 1 }).build());

        let cursor = self
            .collection::<Product>(PRODUCT_COLLECTION_NAME)
            .find(filter::with_optional(doc! {}, "category", category), options)
            .await?;

        collect(cursor).await
    }

    async fn replace_product(&self, id: ObjectId, product: &Product) -> Result<Option<Product>, Problem> {
        self.collection::<Product>(PRODUCT_COLLECTION_NAME)
            .find_one_and_update(filter::by_id(id), product_update(product)?, after_update())
            .await
            .map_err(Problem::from)
    }

    async fn adjust_stock(&self, id: ObjectId, delta: i64) -> Result<Product, Problem> {
        let required = delta.checked_neg().ok_or_else(|| {
            problems::bad_request("Bad stock change.", "Stock delta is out of range.")
        })?;

        let mut query = filter::by_id(id);
        if delta < 0 {
            query.insert("stock", doc! { "$gte": required });
        }

        let updated = self
            .collection::<Product>(PRODUCT_COLLECTION_NAME)
            .find_one_and_update(
                query,
                doc! {
                    "$inc": { "stock": delta },
                    "$set": { "updatedAt": Utc::now().to_rfc3339() },
                },
                after_update(),
            )
            .await?;

        match updated {
            Some(product) => {
                tracing::info!("Stock of '{}' is now {}", product.name, product.stock);
                Ok(product)
            }
            None if self.get_product(id).await?.is_some() => Err(insufficient_stock(id, delta)),
            None => Err(problems::not_found("Product", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn update_keeps_identity_and_creation_time() {
        let product = Product {
            id: Some(ObjectId::new()),
            name: "Capo Kyser".to_string(),
            description: None,
            price: 350_000.0,
            sale_price: None,
            stock: 12,
            category: Some("Phụ kiện".to_string()),
            images: vec![],
            specs: Default::default(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };

        let update = product_update(&product).unwrap();
        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("_id"));
        assert!(!set.contains_key("createdAt"));
        assert!(set.contains_key("updatedAt"));
        assert_eq!(set.get_i64("stock").unwrap(), 12);
    }

    #[test]
    fn product_data_ignores_client_ids() {
        let data: ProductData = serde_json::from_value(serde_json::json!({
            "_id": ObjectId::new().to_hex(),
            "name": "Dây đàn Elixir",
            "price": 420_000.0,
            "stock": 30,
        }))
        .unwrap();

        let product = data.into_product().unwrap();
        assert!(product.id.is_none());
        assert!(product.created_at.is_some());
        assert_eq!(product.stock, 30);
    }

    #[test]
    fn insufficient_stock_is_a_conflict() {
        let problem = insufficient_stock(ObjectId::new(), -3);
        assert_eq!(problem.status, Status::Conflict);
        assert_eq!(problem.title, "Insufficient stock.");
    }
}
