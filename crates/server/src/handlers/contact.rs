//! Contact-form intake and the admin-side message list.

use crate::audit;
use firin_core::error::AppError;
use firin_core::http::{HttpResponse, RequestContext};
use firin_core::storefront::MessageRepository;
use firin_core::validation::{Rule, Ruleset};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ContactController {
    messages: Arc<dyn MessageRepository>,
    create_rules: Ruleset,
}

impl ContactController {
    #[must_use]
    pub fn new(messages: Arc<dyn MessageRepository>) -> Arc<Self> {
        let create_rules = Ruleset::new()
            .field("name", vec![Rule::Required, Rule::Str, Rule::Max(100.0)])
            .field("email", vec![Rule::Required, Rule::Email])
            .field("phone", vec![Rule::Nullable, Rule::Phone])
            .field("message", vec![Rule::Required, Rule::Str, Rule::Min(10.0), Rule::Max(1000.0)])
            .message("message", "min", "the message must be at least 10 characters long");

        Arc::new(Self { messages, create_rules })
    }

    /// `POST /api/v1/iletisim`, rate-limited per IP by middleware.
    pub async fn create(
        self: Arc<Self>,
        ctx: RequestContext,
    ) -> Result<HttpResponse, AppError> {
        let validated = self.create_rules.validate(&ctx.request.body_object())?;

        let name = validated.get("name").and_then(Value::as_str).unwrap_or_default();
        let email = validated.get("email").and_then(Value::as_str).unwrap_or_default();
        let phone = validated.get("phone").and_then(Value::as_str);
        let message = validated.get("message").and_then(Value::as_str).unwrap_or_default();

        let id = self.messages.create(name, email, phone, message).await?;
        audit::log_create("message", id.to_string(), ctx.request.client_ip);

        Ok(HttpResponse::created(json!({ "id": id })))
    }

    /// `GET /api/v1/iletisim`, the bearer-authenticated admin listing.
    pub async fn list(self: Arc<Self>, _ctx: RequestContext) -> Result<HttpResponse, AppError> {
        let messages = self.messages.list_recent(100).await?;
        Ok(HttpResponse::success(serde_json::to_value(messages).unwrap_or(Value::Null)))
    }
}
