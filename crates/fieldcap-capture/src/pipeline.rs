//! Upload pipeline: validate → compress → upload → record.
//!
//! Each submit starts a new attempt on its slot. Every later write carries the
//! attempt counter it started with and is dropped by the [`SlotStore`] when a
//! newer submit for the same slot has begun, so the slot always reflects the
//! most recently initiated attempt. Different slots never share state and may
//! run concurrently.

use std::sync::Arc;

use bytes::Bytes;
use fieldcap_api_client::{ApiClient, TransportSelector, UploadTransport};
use fieldcap_core::error::log_error;
use fieldcap_core::{CaptureConfig, CaptureError, ErrorMetadata, RawFile, SlotKey, UploadJob};
use fieldcap_processing::{ArtifactCompressor, CompressedArtifact, Compress, CompressionOptions};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::context::{FormContext, FormSession};
use crate::store::SlotStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Operator-facing notifications published by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEvent {
    /// Precondition failure; the slot was not touched
    Rejected { slot: SlotKey, message: String },
    Succeeded {
        slot: SlotKey,
        file_name: String,
        remote_url: String,
    },
    Failed {
        slot: SlotKey,
        file_name: String,
        message: String,
    },
}

impl UploadEvent {
    pub fn slot(&self) -> SlotKey {
        match self {
            UploadEvent::Rejected { slot, .. }
            | UploadEvent::Succeeded { slot, .. }
            | UploadEvent::Failed { slot, .. } => *slot,
        }
    }

    /// Toast-style text for the operator
    pub fn notification(&self) -> String {
        match self {
            UploadEvent::Rejected { message, .. } => message.clone(),
            UploadEvent::Succeeded { file_name, .. } => {
                format!("{} uploaded successfully!", file_name)
            }
            UploadEvent::Failed { file_name, .. } => {
                format!("Failed to upload {}. Please try again.", file_name)
            }
        }
    }
}

/// How a submit that passed its preconditions ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Uploaded { remote_url: String },
    Failed { message: String },
    /// A newer submit for the same slot took over; nothing was written
    Superseded,
}

#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<SlotStore>,
    compressor: Arc<dyn Compress>,
    transport: Arc<dyn UploadTransport>,
    context: Arc<dyn FormContext>,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<SlotStore>,
        compressor: Arc<dyn Compress>,
        transport: Arc<dyn UploadTransport>,
        context: Arc<dyn FormContext>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            compressor,
            transport,
            context,
            events,
        }
    }

    /// Wire the default compressor and the platform's transport for a form session.
    pub fn from_config(config: &CaptureConfig, session: Arc<FormSession>) -> Result<Self, CaptureError> {
        config.validate()?;
        let client = ApiClient::from_config(config)
            .map_err(|e| CaptureError::InvalidConfig(e.to_string()))?;
        let transport = TransportSelector::new(client, config.capabilities());
        tracing::debug!(
            platform = %config.platform,
            strategy = ?transport.strategy(),
            "Upload transport selected"
        );
        let compressor = ArtifactCompressor::new(CompressionOptions::from(config));

        Ok(Self::new(
            session.store(),
            Arc::new(compressor),
            Arc::new(transport),
            session,
        ))
    }

    pub fn store(&self) -> &Arc<SlotStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    /// Upload `raw_file` into `slot_key`. `logical_name` defaults to the
    /// slot's catalogue name; the remote file name is `<context>-<logicalName>`.
    ///
    /// Precondition failures return `Err` and leave the slot unchanged. Every
    /// other failure is recorded on the slot and reported as
    /// [`SubmitOutcome::Failed`].
    pub async fn submit(
        &self,
        slot_key: SlotKey,
        raw_file: RawFile,
        logical_name: Option<&str>,
    ) -> Result<SubmitOutcome, CaptureError> {
        let (context, auth_token) = match self.check_preconditions(slot_key, &raw_file) {
            Ok(values) => values,
            Err(e) => {
                tracing::debug_span!("submit", slot = %slot_key)
                    .in_scope(|| log_error(&e, "Upload rejected"));
                self.publish(UploadEvent::Rejected {
                    slot: slot_key,
                    message: e.client_message(),
                });
                return Err(e);
            }
        };

        let name = logical_name.unwrap_or_else(|| slot_key.logical_name());
        let attempt = self.store.begin_attempt(slot_key);
        let job = UploadJob::new(slot_key, raw_file, &context, name, auth_token, attempt);

        if !self.advance(&job, |slot| slot.mark_compressing())? {
            return Ok(SubmitOutcome::Superseded);
        }
        let artifact = self.compress(&job).await;

        if !self.advance(&job, |slot| slot.mark_uploading())? {
            return Ok(SubmitOutcome::Superseded);
        }
        let result = self
            .transport
            .upload(
                &job.auth_token,
                artifact.data,
                &job.file_name,
                &artifact.mime_type,
            )
            .await;

        match result {
            Ok(remote_url) => {
                let url = remote_url.clone();
                if !self.advance(&job, move |slot| slot.mark_success(url))? {
                    return Ok(SubmitOutcome::Superseded);
                }
                tracing::info!(
                    slot = %slot_key,
                    attempt,
                    job_id = %job.id,
                    remote_url = %remote_url,
                    "Artifact uploaded"
                );
                self.publish(UploadEvent::Succeeded {
                    slot: slot_key,
                    file_name: name.to_string(),
                    remote_url: remote_url.clone(),
                });
                Ok(SubmitOutcome::Uploaded { remote_url })
            }
            Err(e) => {
                tracing::debug!(slot = %slot_key, error = %e, status = ?e.status(), "Transport error");
                let error = CaptureError::Upload(e.user_message());
                let message = error.client_message();
                let recorded = message.clone();
                if !self.advance(&job, move |slot| slot.mark_error(recorded))? {
                    return Ok(SubmitOutcome::Superseded);
                }
                tracing::debug_span!("submit", slot = %slot_key, attempt, job_id = %job.id)
                    .in_scope(|| log_error(&error, "Artifact upload failed"));
                self.publish(UploadEvent::Failed {
                    slot: slot_key,
                    file_name: name.to_string(),
                    message: message.clone(),
                });
                Ok(SubmitOutcome::Failed { message })
            }
        }
    }

    fn check_preconditions(
        &self,
        slot_key: SlotKey,
        raw_file: &RawFile,
    ) -> Result<(String, String), CaptureError> {
        if raw_file.is_empty() {
            return Err(CaptureError::MissingFile);
        }
        let context = self.context.identifying_context().ok_or_else(|| {
            let message = if slot_key == SlotKey::Signature {
                "Please enter the device identifier before saving the signature"
            } else {
                "Please enter the device identifier first"
            };
            CaptureError::MissingContext(message.to_string())
        })?;
        let auth_token = self
            .context
            .auth_token()
            .ok_or(CaptureError::MissingAuthToken)?;
        Ok((context, auth_token))
    }

    fn advance<F>(&self, job: &UploadJob, update: F) -> Result<bool, CaptureError>
    where
        F: FnOnce(&mut fieldcap_core::ArtifactSlot) -> Result<(), CaptureError>,
    {
        let applied = self.store.apply_if_current(job.slot_key, job.attempt, update)?;
        if !applied {
            tracing::debug!(
                slot = %job.slot_key,
                attempt = job.attempt,
                job_id = %job.id,
                "Attempt superseded"
            );
        }
        Ok(applied)
    }

    /// Compression never fails the upload; any error keeps the original blob.
    async fn compress(&self, job: &UploadJob) -> CompressedArtifact {
        let original = job.raw_file.clone();
        if !original.is_image() {
            tracing::debug!(slot = %job.slot_key, mime_type = %original.mime_type, "Not an image, uploading as-is");
            return passthrough(original);
        }
        let compressor = Arc::clone(&self.compressor);
        let data: Bytes = original.data.clone();
        let mime_type = original.mime_type.clone();

        let result =
            tokio::task::spawn_blocking(move || compressor.compress(data, &mime_type)).await;

        match result {
            Ok(Ok(artifact)) => {
                tracing::debug!(
                    slot = %job.slot_key,
                    original_bytes = original.size(),
                    upload_bytes = artifact.data.len(),
                    compressed = artifact.compressed,
                    "Artifact prepared"
                );
                artifact
            }
            Ok(Err(e)) => {
                tracing::warn!(slot = %job.slot_key, error = %e, "Compression failed, uploading original");
                passthrough(original)
            }
            Err(e) => {
                tracing::warn!(slot = %job.slot_key, error = %e, "Compression task failed, uploading original");
                passthrough(original)
            }
        }
    }

    fn publish(&self, event: UploadEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn passthrough(raw_file: RawFile) -> CompressedArtifact {
    CompressedArtifact {
        data: raw_file.data,
        mime_type: raw_file.mime_type,
        compressed: false,
    }
}
