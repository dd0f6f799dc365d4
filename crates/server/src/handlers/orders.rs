//! Order endpoints for the back office.

use super::numeric_param;
use crate::audit;
use firin_core::error::{AppError, HttpError};
use firin_core::http::{HttpResponse, RequestContext};
use firin_core::storefront::{OrderRepository, OrderStatus};
use firin_core::validation::{Rule, Ruleset};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct OrdersController {
    orders: Arc<dyn OrderRepository>,
    status_rules: Ruleset,
}

impl OrdersController {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>) -> Arc<Self> {
        let status_rules = Ruleset::new()
            .field("durum", vec![Rule::Required, Rule::Str, Rule::In(OrderStatus::wire_values())]);

        Arc::new(Self { orders, status_rules })
    }

    /// `GET /api/v1/siparisler`
    pub async fn list(self: Arc<Self>, _ctx: RequestContext) -> Result<HttpResponse, AppError> {
        let orders = self.orders.list_recent(50).await?;
        Ok(HttpResponse::success(serde_json::to_value(orders).unwrap_or(Value::Null)))
    }

    /// `GET /api/v1/siparisler/{id}`
    pub async fn get(self: Arc<Self>, ctx: RequestContext) -> Result<HttpResponse, AppError> {
        let id = numeric_param(&ctx, "id")?;
        let order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| HttpError::not_found("order not found"))?;

        Ok(HttpResponse::success(serde_json::to_value(order).unwrap_or(Value::Null)))
    }

    /// `PATCH /api/v1/siparisler/{id}/durum`
    ///
    /// An unknown `durum` value fails validation with a 422 whose error
    /// message lists the accepted values; stored state is untouched.
    pub async fn update_status(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let id = numeric_param(&ctx, "id")?;
        let validated = self.status_rules.validate(&ctx.request.body_object())?;

        let status = validated
            .get("durum")
            .and_then(Value::as_str)
            .and_then(OrderStatus::parse)
            .ok_or_else(|| AppError::internal("validated status failed to parse"))?;

        if !self.orders.update_status(id, status).await? {
            return Err(HttpError::not_found("order not found").into());
        }

        audit::log_update(
            "order",
            id.to_string(),
            ctx.request.client_ip,
            json!({ "durum": status.as_str() }),
        );

        let order = self.orders.find_by_id(id).await?;
        Ok(HttpResponse::success(serde_json::to_value(order).unwrap_or(Value::Null)))
    }
}
