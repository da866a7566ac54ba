//! Outbound audit events.
//!
//! The core emits one event per security-relevant action and never waits on,
//! or fails because of, what the sink does with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyward_core::IdentityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    TokensRevoked,
    IdentityCreated,
    IdentityDeleted,
    RoleChanged,
    ActivationChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::TokensRevoked => "TOKENS_REVOKED",
            AuditAction::IdentityCreated => "IDENTITY_CREATED",
            AuditAction::IdentityDeleted => "IDENTITY_DELETED",
            AuditAction::RoleChanged => "ROLE_CHANGED",
            AuditAction::ActivationChanged => "ACTIVATION_CHANGED",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    /// `None` for system-initiated actions.
    pub actor: Option<IdentityId>,
    /// Identifier of the affected object, if any.
    pub target: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, actor: Option<IdentityId>) -> Self {
        Self {
            action,
            actor,
            target: None,
            details: serde_json::Value::Null,
            ip_address: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: impl ToString) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}

/// Fire-and-forget destination for audit events.
///
/// Implementations must not panic and must swallow their own failures.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}
