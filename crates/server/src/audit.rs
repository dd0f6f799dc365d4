//! Audit logging for back-office mutations and authentication events.
//!
//! Every write operation and every login/logout emits a structured event to
//! the dedicated `audit` tracing target, so security review can filter the
//! trail without parsing application logs.

use serde::Serialize;
use std::net::IpAddr;
use tracing::info;

/// Audit event for a back-office operation.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// ISO 8601 timestamp of the operation
    pub timestamp: String,
    /// Type of operation performed
    pub operation: AuditOperation,
    /// Resource type affected ("order", "message", "admin_user", "token")
    pub resource_type: &'static str,
    /// Resource identifier (id, username, ...)
    pub resource_id: String,
    /// Client IP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Whether the operation succeeded
    pub success: bool,
    /// Optional details (changed fields, parameters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    Create,
    Update,
    Delete,
    Login,
    Logout,
}

impl AuditEvent {
    #[must_use]
    pub fn new(
        operation: AuditOperation,
        resource_type: &'static str,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            operation,
            resource_type,
            resource_id: resource_id.into(),
            client_ip: None,
            success: true,
            details: None,
        }
    }

    #[must_use]
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip.to_string());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    /// Emits the event on the `audit` target at INFO with all fields as
    /// structured data.
    pub fn log(self) {
        info!(
            target: "audit",
            timestamp = %self.timestamp,
            operation = ?self.operation,
            resource_type = self.resource_type,
            resource_id = %self.resource_id,
            client_ip = ?self.client_ip,
            success = self.success,
            details = ?self.details,
            "back_office_audit"
        );
    }
}

/// Logs a successful login.
pub fn log_login(username: &str, ip: IpAddr) {
    AuditEvent::new(AuditOperation::Login, "admin_user", username)
        .with_client_ip(ip)
        .log();
}

/// Logs a failed login attempt. The username is recorded as submitted;
/// whether the account exists is deliberately not distinguishable.
pub fn log_login_failed(username: &str, ip: IpAddr) {
    AuditEvent::new(AuditOperation::Login, "admin_user", username)
        .with_client_ip(ip)
        .failed()
        .log();
}

/// Logs a logout (token invalidation).
pub fn log_logout(username: &str, ip: IpAddr) {
    AuditEvent::new(AuditOperation::Logout, "token", username)
        .with_client_ip(ip)
        .log();
}

/// Logs a successful resource mutation.
pub fn log_update(
    resource_type: &'static str,
    resource_id: impl Into<String>,
    ip: IpAddr,
    details: serde_json::Value,
) {
    AuditEvent::new(AuditOperation::Update, resource_type, resource_id)
        .with_client_ip(ip)
        .with_details(details)
        .log();
}

/// Logs a successful resource creation.
pub fn log_create(resource_type: &'static str, resource_id: impl Into<String>, ip: IpAddr) {
    AuditEvent::new(AuditOperation::Create, resource_type, resource_id)
        .with_client_ip(ip)
        .log();
}
