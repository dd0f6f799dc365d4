//! Back-office dashboard data, behind session authentication.

use firin_core::error::AppError;
use firin_core::http::{HttpResponse, RequestContext};
use firin_core::storefront::{MessageRepository, OrderRepository};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct PanelController {
    orders: Arc<dyn OrderRepository>,
    messages: Arc<dyn MessageRepository>,
}

impl PanelController {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        messages: Arc<dyn MessageRepository>,
    ) -> Arc<Self> {
        Arc::new(Self { orders, messages })
    }

    /// `GET /panel/ozet`: the landing summary for a logged-in admin.
    pub async fn summary(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let principal = ctx.require_principal()?;
        let recent_orders = self.orders.list_recent(10).await?;
        let recent_messages = self.messages.list_recent(10).await?;

        Ok(HttpResponse::success(json!({
            "admin": principal.username,
            "recent_orders": serde_json::to_value(recent_orders).unwrap_or(Value::Null),
            "recent_messages": serde_json::to_value(recent_messages).unwrap_or(Value::Null),
        })))
    }
}
