use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;

use crate::data::product::db::{ProductData, ProductDbExt, StockData};
use crate::data::product::Product;
use crate::data::IdParam;
use crate::middleware::paging::PageState;
use crate::resp::json::ApiJson;
use crate::resp::jwt::AuthToken;
use crate::resp::problem::{problems, Problem};
use crate::resp::toast::{Toast, Toasted};

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    params(
        ("category" = Option<String>, Query, description = "Only products of this category"),
        ("page" = Option<u32>, Query, description = "Zero based page"),
        ("len" = Option<u32>, Query, description = "Page length, at most 100"),
    ),
    responses(
        (status = 200, description = "Catalog page sorted by name", body = [Product]),
    )
)]
#[get("/products?<category>")]
#[tracing::instrument(skip(db))]
pub async fn product_list(
    category: Option<String>,
    page: PageState,
    db: &State<Database>,
) -> Result<ApiJson<Vec<Product>>, Problem> {
    Ok(ApiJson(db.list_products(category, page).await?))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "No such product", body = Problem),
    )
)]
#[get("/products/<id>")]
#[tracing::instrument(skip(db))]
pub async fn product_get(
    id: Result<IdParam, Problem>,
    db: &State<Database>,
) -> Result<ApiJson<Product>, Problem> {
    let IdParam(id) = id?;
    let product = db
        .get_product(id)
        .await?
        .ok_or_else(|| problems::not_found("Product", id))?;
    Ok(ApiJson(product))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    request_body = ProductData,
    responses(
        (status = 200, description = "Created product", body = Product),
        (status = 400, description = "Invalid product", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
    )
)]
#[post("/products", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn product_create(
    data: Json<ProductData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Product>>, Problem> {
    auth.require_teacher()?;

    let product = db.create_product(data.into_inner().into_product()?).await?;
    let toast = Toast::success(format!("Đã thêm sản phẩm {}.", product.name));
    Ok(Toasted::new(ApiJson(product), toast))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    request_body = ProductData,
    responses(
        (status = 200, description = "Updated product", body = Product),
        (status = 400, description = "Invalid product", body = Problem),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such product", body = Problem),
    )
)]
#[put("/products/<id>", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn product_update(
    id: Result<IdParam, Problem>,
    data: Json<ProductData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Product>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;

    let product = db
        .replace_product(id, &data.into_inner().into_product()?)
        .await?
        .ok_or_else(|| problems::not_found("Product", id))?;
    Ok(Toasted::new(ApiJson(product), Toast::success("Đã cập nhật sản phẩm.")))
}

#[utoipa::path(
    post,
    path = "/products/{id}/stock",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    request_body = StockData,
    responses(
        (status = 200, description = "Product with adjusted stock", body = Product),
        (status = 403, description = "Caller isn't a teacher", body = Problem),
        (status = 404, description = "No such product", body = Problem),
        (status = 409, description = "Stock would go below zero", body = Problem),
    )
)]
#[post("/products/<id>/stock", format = "json", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn product_stock(
    id: Result<IdParam, Problem>,
    data: Json<StockData>,
    auth: AuthToken,
    db: &State<Database>,
) -> Result<Toasted<ApiJson<Product>>, Problem> {
    auth.require_teacher()?;
    let IdParam(id) = id?;

    let product = db.adjust_stock(id, data.delta).await?;
    let toast = Toast::info(format!("Tồn kho: {}.", product.stock));
    Ok(Toasted::new(ApiJson(product), toast))
}
