use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mirrorgate_common::EmailAddress;
use serde_json::{json, Value};

use crate::identity::{IdentityError, IdentityProvider, ProviderUser};

/// A call made against [`FakeIdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    FindByEmail(String),
    SetBlocked(String, bool),
    Delete(String),
}

/// In-memory identity provider that records every call.
#[derive(Default)]
pub struct FakeIdentityProvider {
    users: Mutex<HashMap<String, ProviderUser>>,
    calls: Mutex<Vec<ProviderCall>>,
    failing: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: &str, email: &str, metadata: Value) {
        let user = ProviderUser {
            id: id.to_string(),
            email_addresses: vec![EmailAddress {
                id: Some(format!("idn_{}", id)),
                email_address: email.to_string(),
            }],
            public_metadata: metadata,
        };
        lock(&self.users).insert(id.to_string(), user);
    }

    pub fn with_user(self, id: &str, email: &str) -> Self {
        self.add_user(id, email, json!({}));
        self
    }

    /// Make every following call fail with an API error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn has_user(&self, id: &str) -> bool {
        lock(&self.users).contains_key(id)
    }

    pub fn metadata(&self, id: &str) -> Option<Value> {
        lock(&self.users).get(id).map(|u| u.public_metadata.clone())
    }

    /// The `blocked` flag in the user's metadata.
    pub fn blocked_flag(&self, id: &str) -> Option<bool> {
        self.metadata(id)
            .and_then(|m| m.get("blocked").and_then(Value::as_bool))
    }

    fn record(&self, call: ProviderCall) -> Result<(), IdentityError> {
        lock(&self.calls).push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(IdentityError::Api("503 Service Unavailable: injected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<ProviderUser>, IdentityError> {
        self.record(ProviderCall::FindByEmail(email.to_string()))?;
        let users = lock(&self.users);
        Ok(users
            .values()
            .find(|u| {
                u.email_addresses
                    .iter()
                    .any(|a| a.email_address.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn set_blocked(&self, user_id: &str, blocked: bool) -> Result<(), IdentityError> {
        self.record(ProviderCall::SetBlocked(user_id.to_string(), blocked))?;
        let mut users = lock(&self.users);
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| IdentityError::NotFound(user_id.to_string()))?;

        if !user.public_metadata.is_object() {
            user.public_metadata = json!({});
        }
        if let Some(map) = user.public_metadata.as_object_mut() {
            map.insert("blocked".to_string(), Value::Bool(blocked));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        self.record(ProviderCall::Delete(user_id.to_string()))?;
        lock(&self.users)
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| IdentityError::NotFound(user_id.to_string()))
    }
}
