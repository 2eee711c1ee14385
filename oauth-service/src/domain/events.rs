//! # Domain Events
//!
//! Declarative records of things that happened in the authorization core.
//! Nothing in this crate currently consumes these — there is no message
//! queue behind this service — but the shapes are kept ready for whoever
//! wires up an audit stream or webhook fan-out later. Today, durable history
//! is written directly via [`crate::repository::AuditSink`] and the login
//! history repository; these event structs mirror that same information in
//! a form suitable for an event bus.
//!
//! ## Event Catalog
//!
//! | Event | Emitted when |
//! |-------|--------------|
//! | [`AuthorizationCodeIssued`] | `/oauth/authorize` mints a code |
//! | [`AuthorizationCodeRedeemed`] | `/oauth/token` successfully exchanges a code |
//! | [`TokenIssued`] | An access/refresh token pair is minted |
//! | [`TokenRefreshed`] | `/oauth/token` successfully uses `grant_type=refresh_token` |
//! | [`TokenRevoked`] | `/oauth/revoke` invalidates a token |
//! | [`LoginSucceeded`] | SSO callback or dev-login resolves a session |
//! | [`LoginFailed`] | An authentication attempt is rejected |
//! | [`AccessDenied`] | The access-decision engine rejects a principal |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Common shape every domain event must provide.
pub trait DomainEvent {
    /// Stable wire name, e.g. `"authorization_code.issued"`.
    fn event_type(&self) -> &'static str;
    fn occurred_at(&self) -> DateTime<Utc>;
    /// The entity most relevant to this event (typically a user or application id).
    fn aggregate_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCodeIssued {
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub scopes: Vec<String>,
    pub pkce: bool,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for AuthorizationCodeIssued {
    fn event_type(&self) -> &'static str {
        "authorization_code.issued"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCodeRedeemed {
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for AuthorizationCodeRedeemed {
    fn event_type(&self) -> &'static str {
        "authorization_code.redeemed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIssued {
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub scopes: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for TokenIssued {
    fn event_type(&self) -> &'static str {
        "token.issued"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefreshed {
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub rotated: bool,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for TokenRefreshed {
    fn event_type(&self) -> &'static str {
        "token.refreshed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRevoked {
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for TokenRevoked {
    fn event_type(&self) -> &'static str {
        "token.revoked"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSucceeded {
    pub user_id: Uuid,
    pub login_type: String,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for LoginSucceeded {
    fn event_type(&self) -> &'static str {
        "login.succeeded"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

/// Reasons an authentication attempt can fail. `UserNotFound` never appears
/// in a user-facing response — it exists only so internal logging/auditing
/// can distinguish cases without changing what the client sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailureReason {
    UserNotFound,
    AccountInactive,
    UpstreamRejected,
    UpstreamUnreachable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFailed {
    pub user_id: Option<Uuid>,
    pub reason: LoginFailureReason,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for LoginFailed {
    fn event_type(&self) -> &'static str {
        "login.failed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id.unwrap_or(Uuid::nil())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDenied {
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent for AccessDenied {
    fn event_type(&self) -> &'static str {
        "access.denied"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }
}

/// Wraps a [`DomainEvent`] payload with transport metadata, ready for an
/// event bus that doesn't exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub event_type: String,
    pub version: u32,
    pub correlation_id: Option<Uuid>,
    pub payload: T,
    pub timestamp: DateTime<Utc>,
}

impl<T: DomainEvent + Clone> EventEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: payload.event_type().to_string(),
            version: 1,
            correlation_id: None,
            timestamp: payload.occurred_at(),
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failed_event_nil_aggregate_when_user_unknown() {
        let event = LoginFailed {
            user_id: None,
            reason: LoginFailureReason::UserNotFound,
            occurred_at: Utc::now(),
        };
        assert_eq!(event.aggregate_id(), Uuid::nil());
    }

    #[test]
    fn test_token_issued_event_type() {
        let event = TokenIssued {
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            scopes: vec!["openid".into()],
            occurred_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "token.issued");
    }

    #[test]
    fn test_event_envelope_creation() {
        let user_id = Uuid::new_v4();
        let event = LoginSucceeded {
            user_id,
            login_type: "sso".to_string(),
            occurred_at: Utc::now(),
        };
        let envelope = EventEnvelope::new(event);
        assert_eq!(envelope.event_type, "login.succeeded");
        assert_eq!(envelope.version, 1);
        assert!(envelope.correlation_id.is_none());
    }

    #[test]
    fn test_event_envelope_with_correlation_id() {
        let correlation_id = Uuid::new_v4();
        let event = AccessDenied {
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        };
        let envelope = EventEnvelope::new(event).with_correlation_id(correlation_id);
        assert_eq!(envelope.correlation_id, Some(correlation_id));
    }

    #[test]
    fn test_event_serialization() {
        let event = TokenRevoked {
            user_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).expect("serializable");
        assert!(json.contains("user_id"));
    }
}
