use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fieldcap_capture::scanner::{
    CallbackId, DecodeConfig, DecodeEngine, DetectedCallback, EngineError, GrantStatus,
    PermissionApi, PermissionGrant, ProcessedCallback,
};

/// Decode engine driven by the test through [`FakeEngine::detect`].
#[derive(Default)]
pub struct FakeEngine {
    running: AtomicBool,
    next_id: AtomicU64,
    detected: Mutex<HashMap<u64, Arc<dyn Fn(&str) + Send + Sync>>>,
    processed: Mutex<HashMap<u64, ProcessedCallback>>,
}

impl FakeEngine {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn registered(&self) -> usize {
        self.detected.lock().unwrap().len() + self.processed.lock().unwrap().len()
    }

    pub fn detect(&self, value: &str) {
        let callbacks: Vec<_> = self.detected.lock().unwrap().values().cloned().collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

#[async_trait]
impl DecodeEngine for FakeEngine {
    async fn init(&self, _config: &DecodeConfig) -> Result<(), EngineError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), EngineError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), EngineError> {
        if self.running.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::NotRunning)
        }
    }

    fn on_detected(&self, callback: DetectedCallback) -> CallbackId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.detected.lock().unwrap().insert(id, Arc::from(callback));
        CallbackId(id)
    }

    fn on_processed(&self, callback: ProcessedCallback) -> CallbackId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.processed.lock().unwrap().insert(id, callback);
        CallbackId(id)
    }

    fn off(&self, id: CallbackId) {
        self.detected.lock().unwrap().remove(&id.0);
        self.processed.lock().unwrap().remove(&id.0);
    }
}

/// Grants the camera on request.
pub struct GrantOnRequest;

#[async_trait]
impl PermissionApi for GrantOnRequest {
    async fn check_permissions(&self) -> Result<PermissionGrant, EngineError> {
        Ok(PermissionGrant {
            camera: GrantStatus::Prompt,
            storage: None,
        })
    }

    async fn request_permissions(&self) -> Result<PermissionGrant, EngineError> {
        Ok(PermissionGrant {
            camera: GrantStatus::Granted,
            storage: Some(GrantStatus::Granted),
        })
    }
}
