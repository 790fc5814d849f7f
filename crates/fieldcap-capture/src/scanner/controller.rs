//! Barcode scanning session lifecycle.
//!
//! `Idle → PermissionPending → Initializing → Running → Detected`, with
//! `Error` reachable from the permission and initialization steps and
//! `Stopped` reachable from anywhere. Every session carries a generation
//! number and a cancellation token: `stop` cancels the token so pending
//! awaits are abandoned, and engine callbacks from an older generation are
//! ignored.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use fieldcap_core::error::log_error;
use fieldcap_core::{
    CaptureConfig, CaptureError, ErrorMetadata, PlatformCapabilities, ScannerState, VisualStatus,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::engine::{
    CallbackId, DecodeConfig, DecodeEngine, EngineError, FrameResult, PermissionApi,
};
use crate::context::FormContext;

const EVENT_CHANNEL_CAPACITY: usize = 32;

const PERMISSION_DENIED_MESSAGE: &str = "Camera permission was denied";
const PERMISSION_REQUIRED_MESSAGE: &str = "Camera permission is required";
const START_FAILED_MESSAGE: &str = "Please check camera permissions and try again";
const RESTART_FAILED_MESSAGE: &str = "Failed to restart scanner. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScannerEvent {
    StateChanged(ScannerState),
    Decoded(String),
    VisualStatus(VisualStatus),
}

struct Session {
    state: ScannerState,
    last_decoded: Option<String>,
    last_error: Option<String>,
    visual: VisualStatus,
    generation: u64,
    callbacks: Vec<CallbackId>,
    cancel: CancellationToken,
}

struct Inner {
    engine: Arc<dyn DecodeEngine>,
    permissions: Arc<dyn PermissionApi>,
    context: Arc<dyn FormContext>,
    capabilities: PlatformCapabilities,
    session: Mutex<Session>,
    events: broadcast::Sender<ScannerEvent>,
}

/// Owns the camera for the duration of a scan. Dropping the controller stops
/// the session.
pub struct ScannerController {
    inner: Arc<Inner>,
}

impl ScannerController {
    pub fn new(
        engine: Arc<dyn DecodeEngine>,
        permissions: Arc<dyn PermissionApi>,
        context: Arc<dyn FormContext>,
        capabilities: PlatformCapabilities,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                engine,
                permissions,
                context,
                capabilities,
                session: Mutex::new(Session {
                    state: ScannerState::Idle,
                    last_decoded: None,
                    last_error: None,
                    visual: VisualStatus::Steady,
                    generation: 0,
                    callbacks: Vec::new(),
                    cancel: CancellationToken::new(),
                }),
                events,
            }),
        }
    }

    pub fn from_config(
        config: &CaptureConfig,
        engine: Arc<dyn DecodeEngine>,
        permissions: Arc<dyn PermissionApi>,
        context: Arc<dyn FormContext>,
    ) -> Self {
        Self::new(engine, permissions, context, config.capabilities())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> ScannerState {
        self.inner.lock().state
    }

    pub fn last_decoded(&self) -> Option<String> {
        self.inner.lock().last_decoded.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn visual_status(&self) -> VisualStatus {
        self.inner.lock().visual
    }

    /// Start a fresh session, force-stopping any session still in progress.
    ///
    /// Returns `Ok` once the decoder is running or the session was stopped
    /// while starting. Failures leave the controller in `Error`.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let needs_stop = !matches!(self.state(), ScannerState::Idle | ScannerState::Stopped);
        if needs_stop {
            tracing::debug!("Stopping previous scanner session");
            self.stop();
        }

        let (generation, cancel) = {
            let mut session = self.inner.lock();
            if session.state == ScannerState::Stopped {
                self.inner.transition(&mut session, ScannerState::Idle);
            }
            session.last_decoded = None;
            session.last_error = None;
            self.inner.begin_generation(&mut session)
        };

        self.inner.run(generation, cancel, START_FAILED_MESSAGE).await
    }

    /// Restart a failed session from the permission step.
    pub async fn retry(&self) -> Result<(), CaptureError> {
        let (generation, cancel) = {
            let mut session = self.inner.lock();
            if session.state != ScannerState::Error {
                return Err(CaptureError::InvalidState(format!(
                    "Scanner cannot retry from {:?}",
                    session.state
                )));
            }
            session.last_error = None;
            self.inner.begin_generation(&mut session)
        };

        self.inner.stop_engine();
        self.inner.run(generation, cancel, RESTART_FAILED_MESSAGE).await
    }

    /// Cancel the session from any state. Unregisters callbacks and stops the
    /// engine; safe to call repeatedly or before any start.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

impl Drop for ScannerController {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ScannerEvent) {
        let _ = self.events.send(event);
    }

    fn transition(&self, session: &mut Session, next: ScannerState) -> bool {
        if session.state == next {
            return false;
        }
        if !session.state.can_transition_to(next) {
            tracing::warn!(from = ?session.state, to = ?next, "Ignoring invalid scanner transition");
            return false;
        }
        tracing::debug!(from = ?session.state, to = ?next, generation = session.generation, "Scanner state changed");
        session.state = next;
        self.publish(ScannerEvent::StateChanged(next));
        true
    }

    fn set_visual(&self, session: &mut Session, visual: VisualStatus) {
        if session.visual != visual {
            session.visual = visual;
            self.publish(ScannerEvent::VisualStatus(visual));
        }
    }

    fn begin_generation(&self, session: &mut Session) -> (u64, CancellationToken) {
        session.generation += 1;
        session.cancel = CancellationToken::new();
        (session.generation, session.cancel.clone())
    }

    fn stop_engine(&self) {
        if let Err(e) = self.engine.stop() {
            tracing::debug!(error = %e, "Decode engine stop ignored");
        }
    }

    fn stop(&self) {
        let callbacks = {
            let mut session = self.lock();
            session.cancel.cancel();
            self.transition(&mut session, ScannerState::Stopped);
            std::mem::take(&mut session.callbacks)
        };
        for id in callbacks {
            self.engine.off(id);
        }
        self.stop_engine();
    }

    /// Await `fut` unless the session is cancelled first.
    async fn guarded<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Stop the engine unless a newer session already owns it.
    fn release_engine(&self, generation: u64) -> bool {
        let owns_engine = self.lock().generation == generation;
        if owns_engine {
            self.stop_engine();
        }
        owns_engine
    }

    /// Session abandoned mid-way.
    fn abandon(&self, generation: u64) {
        let owns_engine = self.release_engine(generation);
        tracing::debug!(generation, owns_engine, "Scanner session cancelled");
    }

    fn fail(&self, generation: u64, error: CaptureError) -> Result<(), CaptureError> {
        let mut session = self.lock();
        if session.generation != generation || session.cancel.is_cancelled() {
            return Ok(());
        }
        session.last_error = Some(error.client_message());
        self.transition(&mut session, ScannerState::Error);
        drop(session);
        log_error(&error, "Scanner session failed");
        Err(error)
    }

    async fn run(
        self: &Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        failure_message: &str,
    ) -> Result<(), CaptureError> {
        if self.capabilities.requires_explicit_permission {
            {
                let mut session = self.lock();
                if session.generation != generation {
                    return Ok(());
                }
                self.transition(&mut session, ScannerState::PermissionPending);
            }
            match Self::guarded(&cancel, self.negotiate_permission()).await {
                None => return Ok(()),
                Some(Err(e)) => return self.fail(generation, e),
                Some(Ok(())) => {}
            }
        }

        {
            let mut session = self.lock();
            if session.generation != generation || session.cancel.is_cancelled() {
                return Ok(());
            }
            self.transition(&mut session, ScannerState::Initializing);
        }

        // Any engine left over from an earlier session must be released first.
        self.stop_engine();

        let config = DecodeConfig::for_capabilities(self.capabilities);
        let started = Self::guarded(&cancel, async {
            self.engine.init(&config).await?;
            self.engine.start().await
        })
        .await;

        match started {
            None => {
                self.abandon(generation);
                return Ok(());
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, generation, "Failed to initialize camera");
                self.release_engine(generation);
                return self.fail(generation, CaptureError::Device(failure_message.to_string()));
            }
            Some(Ok(())) => {}
        }

        {
            let mut session = self.lock();
            if session.generation != generation || session.cancel.is_cancelled() {
                drop(session);
                self.abandon(generation);
                return Ok(());
            }
            self.transition(&mut session, ScannerState::Running);
            self.set_visual(&mut session, VisualStatus::Steady);
        }
        tracing::info!(generation, "Scanner running");

        self.register_callbacks(generation);
        Ok(())
    }

    async fn negotiate_permission(&self) -> Result<(), CaptureError> {
        let grant = match self.permissions.check_permissions().await {
            Ok(grant) if grant.camera_granted() => Ok(grant),
            Ok(_) => self.permissions.request_permissions().await,
            Err(e) => Err(e),
        };

        match grant {
            Ok(grant) if grant.camera_granted() => {
                if grant.storage_denied() {
                    tracing::warn!("Storage permission denied, continuing");
                }
                Ok(())
            }
            Ok(_) => Err(CaptureError::PermissionDenied(
                PERMISSION_DENIED_MESSAGE.to_string(),
            )),
            Err(EngineError::Permission(reason)) => {
                tracing::debug!(reason = %reason, "Camera permission refused by platform");
                Err(CaptureError::PermissionDenied(
                    PERMISSION_DENIED_MESSAGE.to_string(),
                ))
            }
            // Storage is not needed for live scanning
            Err(EngineError::StoragePermission(reason)) => {
                tracing::warn!(reason = %reason, "Storage permission denied, continuing");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Permission check failed");
                Err(CaptureError::PermissionDenied(
                    PERMISSION_REQUIRED_MESSAGE.to_string(),
                ))
            }
        }
    }

    fn register_callbacks(self: &Arc<Self>, generation: u64) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let detected = self.engine.on_detected(Box::new(move |value: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_detected(generation, value);
            }
        }));

        let weak: Weak<Inner> = Arc::downgrade(self);
        let processed = self
            .engine
            .on_processed(Box::new(move |result: Option<&FrameResult>| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_processed(generation, result);
                }
            }));

        let stale = {
            let mut session = self.lock();
            let live = session.generation == generation && session.state == ScannerState::Running;
            if live {
                session.callbacks.extend([detected, processed]);
            }
            !live
        };
        if stale {
            // Stopped or detected while registering
            self.engine.off(detected);
            self.engine.off(processed);
        }
    }

    fn handle_detected(&self, generation: u64, value: &str) {
        let callbacks = {
            let mut session = self.lock();
            if session.generation != generation || session.state != ScannerState::Running {
                tracing::debug!(generation, "Ignoring detection outside a running session");
                return;
            }
            session.last_decoded = Some(value.to_string());
            self.transition(&mut session, ScannerState::Detected);
            self.set_visual(&mut session, VisualStatus::Success);
            session.cancel.cancel();
            std::mem::take(&mut session.callbacks)
        };

        for id in callbacks {
            self.engine.off(id);
        }
        self.stop_engine();

        tracing::info!(value, "Barcode detected");
        self.context.accept_decoded_value(value);
        self.publish(ScannerEvent::Decoded(value.to_string()));
    }

    fn handle_processed(&self, generation: u64, result: Option<&FrameResult>) {
        if result.is_none() {
            return;
        }
        let mut session = self.lock();
        if session.generation == generation && session.state == ScannerState::Running {
            self.set_visual(&mut session, VisualStatus::Error);
        }
    }
}
