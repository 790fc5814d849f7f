//! Capture source chooser.
//!
//! On platforms that do not route a generic "choose file" action to a
//! disambiguation menu, the operator picks camera, gallery or file manager
//! first. The target input is reconfigured and activated after a short delay so
//! the new attributes are in place before the native picker opens.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fieldcap_core::{CaptureConfig, CaptureError, PlatformCapabilities};
use serde::Serialize;
use tokio::task::JoinHandle;

/// Native file input the chooser configures and activates
pub trait FileInput: Send + Sync {
    fn set_accept(&self, accept: &str);

    /// `None` removes the capture attribute
    fn set_capture(&self, capture: Option<&str>);

    fn activate(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceOption {
    Camera,
    Gallery,
    FileManager,
}

impl SourceOption {
    pub const ALL: [SourceOption; 3] = [
        SourceOption::Camera,
        SourceOption::Gallery,
        SourceOption::FileManager,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceOption::Camera => "Camera",
            SourceOption::Gallery => "Gallery",
            SourceOption::FileManager => "File Manager",
        }
    }

    pub fn accept(self) -> &'static str {
        match self {
            SourceOption::Camera | SourceOption::Gallery => "image/*",
            SourceOption::FileManager => "*/*",
        }
    }

    pub fn capture(self) -> Option<&'static str> {
        match self {
            SourceOption::Camera => Some("environment"),
            SourceOption::Gallery | SourceOption::FileManager => None,
        }
    }
}

struct ChooserState {
    target: Option<Arc<dyn FileInput>>,
    last_selection: Option<SourceOption>,
}

pub struct SourceSelector {
    needs_chooser: bool,
    activation_delay: Duration,
    state: Mutex<ChooserState>,
}

impl SourceSelector {
    pub fn new(capabilities: PlatformCapabilities, activation_delay: Duration) -> Self {
        Self {
            needs_chooser: capabilities.needs_source_chooser,
            activation_delay,
            state: Mutex::new(ChooserState {
                target: None,
                last_selection: None,
            }),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.capabilities(), config.source_chooser_delay())
    }

    fn lock(&self) -> MutexGuard<'_, ChooserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the chooser for `target`, or activate `target` directly when the
    /// platform needs no chooser.
    pub fn open(&self, target: Arc<dyn FileInput>) {
        if !self.needs_chooser {
            tracing::debug!("Source chooser not needed, activating input");
            target.activate();
            return;
        }
        let mut state = self.lock();
        if state.target.is_some() {
            tracing::debug!("Source chooser re-targeted");
        }
        state.target = Some(target);
    }

    pub fn is_open(&self) -> bool {
        self.lock().target.is_some()
    }

    /// Configure the pending input for `option`, close the chooser and
    /// activate the input after the configured delay.
    pub fn select_option(&self, option: SourceOption) -> Result<JoinHandle<()>, CaptureError> {
        let target = {
            let mut state = self.lock();
            let target = state.target.take().ok_or_else(|| {
                CaptureError::InvalidState("Source chooser is not open".to_string())
            })?;
            state.last_selection = Some(option);
            target
        };

        target.set_accept(option.accept());
        target.set_capture(option.capture());
        tracing::debug!(option = option.label(), "Capture source selected");

        let delay = self.activation_delay;
        Ok(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            target.activate();
        }))
    }

    /// Dismiss without activating anything
    pub fn close(&self) {
        self.lock().target = None;
    }

    pub fn last_selection(&self) -> Option<SourceOption> {
        self.lock().last_selection
    }
}
