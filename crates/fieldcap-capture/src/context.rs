//! Form session collaborator.

use std::sync::{Arc, PoisonError, RwLock};

use crate::store::SlotStore;

/// What the capture layer needs from the surrounding form.
pub trait FormContext: Send + Sync {
    /// Device/case identifier the artifacts belong to. `None` when unset or blank.
    fn identifying_context(&self) -> Option<String>;

    /// Bearer token of the signed-in operator
    fn auth_token(&self) -> Option<String>;

    /// Receives a barcode value decoded by the scanner
    fn accept_decoded_value(&self, value: &str);
}

/// In-memory form session: owns the slot store, the device identifier and
/// the operator's token.
#[derive(Debug)]
pub struct FormSession {
    store: Arc<SlotStore>,
    device_id: RwLock<Option<String>>,
    auth_token: RwLock<Option<String>>,
}

impl FormSession {
    pub fn new(auth_token: Option<String>) -> Self {
        Self {
            store: Arc::new(SlotStore::new()),
            device_id: RwLock::new(None),
            auth_token: RwLock::new(auth_token),
        }
    }

    pub fn store(&self) -> Arc<SlotStore> {
        Arc::clone(&self.store)
    }

    pub fn set_device_id(&self, device_id: impl Into<String>) {
        *self.device_id.write().unwrap_or_else(PoisonError::into_inner) = Some(device_id.into());
    }

    pub fn clear_device_id(&self) {
        *self.device_id.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

fn non_blank(value: &RwLock<Option<String>>) -> Option<String> {
    value
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FormContext for FormSession {
    fn identifying_context(&self) -> Option<String> {
        non_blank(&self.device_id)
    }

    fn auth_token(&self) -> Option<String> {
        non_blank(&self.auth_token)
    }

    fn accept_decoded_value(&self, value: &str) {
        tracing::info!(value, "Device identifier scanned");
        self.set_device_id(value);
    }
}
