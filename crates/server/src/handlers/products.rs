//! Public product catalog endpoints.

use super::numeric_param;
use firin_core::error::{AppError, HttpError};
use firin_core::http::{HttpResponse, RequestContext};
use firin_core::storefront::ProductRepository;
use serde_json::Value;
use std::sync::Arc;

pub struct ProductsController {
    products: Arc<dyn ProductRepository>,
}

impl ProductsController {
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>) -> Arc<Self> {
        Arc::new(Self { products })
    }

    /// `GET /urunler`
    pub async fn list(self: Arc<Self>, _ctx: RequestContext) -> Result<HttpResponse, AppError> {
        let products = self.products.list_active().await?;
        Ok(HttpResponse::success(serde_json::to_value(products).unwrap_or(Value::Null)))
    }

    /// `GET /urunler/one-cikan`
    ///
    /// Registered ahead of `/urunler/{id}`; insertion order is the only
    /// precedence rule the router has.
    pub async fn featured(
        self: Arc<Self>,
        _ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let products = self.products.list_featured().await?;
        Ok(HttpResponse::success(serde_json::to_value(products).unwrap_or(Value::Null)))
    }

    /// `GET /urunler/{id}`
    pub async fn get(self: Arc<Self>, ctx: RequestContext) -> Result<HttpResponse, AppError> {
        let id = numeric_param(&ctx, "id")?;
        let product = self
            .products
            .find_by_id(id)
            .await?
            .ok_or_else(|| HttpError::not_found("product not found"))?;

        Ok(HttpResponse::success(serde_json::to_value(product).unwrap_or(Value::Null)))
    }
}
