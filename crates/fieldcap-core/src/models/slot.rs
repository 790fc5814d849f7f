use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::CaptureError;

/// Stable logical role an artifact fills in the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKey {
    IdFront,
    IdBack,
    PhoneBill,
    DeviceFront,
    DeviceBack,
    DeviceLeft,
    DeviceRight,
    DeviceTop,
    DeviceBottom,
    Signature,
    CustomerPhoto,
    Ceir,
}

impl SlotKey {
    pub const ALL: [SlotKey; 12] = [
        SlotKey::IdFront,
        SlotKey::IdBack,
        SlotKey::PhoneBill,
        SlotKey::DeviceFront,
        SlotKey::DeviceBack,
        SlotKey::DeviceLeft,
        SlotKey::DeviceRight,
        SlotKey::DeviceTop,
        SlotKey::DeviceBottom,
        SlotKey::Signature,
        SlotKey::CustomerPhoto,
        SlotKey::Ceir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotKey::IdFront => "id-front",
            SlotKey::IdBack => "id-back",
            SlotKey::PhoneBill => "phone-bill",
            SlotKey::DeviceFront => "device-front",
            SlotKey::DeviceBack => "device-back",
            SlotKey::DeviceLeft => "device-left",
            SlotKey::DeviceRight => "device-right",
            SlotKey::DeviceTop => "device-top",
            SlotKey::DeviceBottom => "device-bottom",
            SlotKey::Signature => "signature",
            SlotKey::CustomerPhoto => "customer-photo",
            SlotKey::Ceir => "ceir",
        }
    }

    /// Default logical file name; the pipeline prefixes it with the identifying context.
    pub fn logical_name(self) -> &'static str {
        match self {
            SlotKey::IdFront => "id_front",
            SlotKey::IdBack => "id_back",
            SlotKey::PhoneBill => "phone_bill",
            SlotKey::DeviceFront => "phone_front",
            SlotKey::DeviceBack => "phone_back",
            SlotKey::DeviceLeft => "phone_left",
            SlotKey::DeviceRight => "phone_right",
            SlotKey::DeviceTop => "phone_top",
            SlotKey::DeviceBottom => "phone_bottom",
            SlotKey::Signature => "signature",
            SlotKey::CustomerPhoto => "customer_photo",
            SlotKey::Ceir => "ceir",
        }
    }
}

impl FromStr for SlotKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid slot key: {}", s))
    }
}

impl Display for SlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Upload status of a single slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Compressing,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    /// Forward transitions of one attempt. Resetting to `Pending` is handled by
    /// [`ArtifactSlot::begin_attempt`] and [`ArtifactSlot::reset`].
    pub fn can_transition_to(self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Pending, Compressing)
                | (Compressing, Uploading)
                | (Compressing, Error)
                | (Uploading, Success)
                | (Uploading, Error)
        )
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, UploadStatus::Compressing | UploadStatus::Uploading)
    }
}

/// One logical document/photo role, mutated in place for the whole form session.
///
/// Invariants: `remote_url` is set iff status is `Success`; `last_error` is set
/// iff status is `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSlot {
    key: SlotKey,
    status: UploadStatus,
    progress: u8,
    remote_url: Option<String>,
    last_error: Option<String>,
    attempt: u64,
    updated_at: DateTime<Utc>,
}

impl ArtifactSlot {
    pub fn new(key: SlotKey) -> Self {
        Self {
            key,
            status: UploadStatus::Pending,
            progress: 0,
            remote_url: None,
            last_error: None,
            attempt: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SlotKey {
        self.key
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Advisory progress, 0-100
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Counter of the most recently initiated attempt
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Start a new attempt for a freshly supplied file. Any previous attempt is
    /// superseded: its later writes carry a stale counter and must be discarded.
    pub fn begin_attempt(&mut self) -> u64 {
        self.attempt += 1;
        self.set(UploadStatus::Pending, 0, None, None);
        self.attempt
    }

    /// Explicit reset of a terminal slot back to `Pending`.
    pub fn reset(&mut self) -> Result<(), CaptureError> {
        if self.status.is_in_flight() {
            return Err(CaptureError::InvalidState(format!(
                "slot {} is {:?}",
                self.key, self.status
            )));
        }
        self.set(UploadStatus::Pending, 0, None, None);
        Ok(())
    }

    pub fn mark_compressing(&mut self) -> Result<(), CaptureError> {
        self.advance(UploadStatus::Compressing)?;
        self.set(UploadStatus::Compressing, 10, None, None);
        Ok(())
    }

    pub fn mark_uploading(&mut self) -> Result<(), CaptureError> {
        self.advance(UploadStatus::Uploading)?;
        self.set(UploadStatus::Uploading, 50, None, None);
        Ok(())
    }

    pub fn mark_success(&mut self, remote_url: String) -> Result<(), CaptureError> {
        self.advance(UploadStatus::Success)?;
        self.set(UploadStatus::Success, 100, Some(remote_url), None);
        Ok(())
    }

    pub fn mark_error(&mut self, message: String) -> Result<(), CaptureError> {
        self.advance(UploadStatus::Error)?;
        self.set(UploadStatus::Error, 0, None, Some(message));
        Ok(())
    }

    fn advance(&self, next: UploadStatus) -> Result<(), CaptureError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(CaptureError::InvalidState(format!(
                "slot {} cannot move from {:?} to {:?}",
                self.key, self.status, next
            )))
        }
    }

    fn set(
        &mut self,
        status: UploadStatus,
        progress: u8,
        remote_url: Option<String>,
        last_error: Option<String>,
    ) {
        self.status = status;
        self.progress = progress;
        self.remote_url = remote_url;
        self.last_error = last_error;
        self.updated_at = Utc::now();
    }
}
