#![allow(dead_code)]

pub mod fixtures;
pub mod scanner;
pub mod transports;

use std::sync::Arc;
use std::time::Duration;

use fieldcap_api_client::{ApiClient, TransportSelector, UploadTransport};
use fieldcap_capture::{FormSession, UploadPipeline};
use fieldcap_core::Platform;
use fieldcap_processing::{ArtifactCompressor, CompressionOptions};

pub const TEST_TOKEN: &str = "tok";
pub const TEST_DEVICE_ID: &str = "356938035643809";

/// Form session with a token and, optionally, a device identifier.
pub fn form_session(device_id: Option<&str>) -> Arc<FormSession> {
    let session = Arc::new(FormSession::new(Some(TEST_TOKEN.to_string())));
    if let Some(device_id) = device_id {
        session.set_device_id(device_id);
    }
    session
}

/// Platform transport talking to `base_url`.
pub fn selector(base_url: &str, platform: Platform) -> TransportSelector {
    selector_with_timeout(base_url, platform, Duration::from_secs(10))
}

pub fn selector_with_timeout(
    base_url: &str,
    platform: Platform,
    timeout: Duration,
) -> TransportSelector {
    let client = ApiClient::new(base_url, timeout).expect("client");
    TransportSelector::new(client, platform.capabilities())
}

pub fn pipeline(session: &Arc<FormSession>, transport: Arc<dyn UploadTransport>) -> UploadPipeline {
    UploadPipeline::new(
        session.store(),
        Arc::new(ArtifactCompressor::new(CompressionOptions::default())),
        transport,
        session.clone(),
    )
}
