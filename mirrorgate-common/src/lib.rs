//! mirrorgate Common Types
//!
//! Shared types used by the backend service and its clients.

pub mod account;
pub mod admin;
pub mod event;

pub use account::{Role, UnknownVariant, UserStatus};
pub use admin::{AdminAction, ActionRequest, ErrorResponse, MessageResponse};
pub use event::{EmailAddress, UserEventData, WebhookEvent, WebhookEventKind};
