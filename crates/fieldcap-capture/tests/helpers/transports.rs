use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use fieldcap_api_client::{TransportError, UploadTransport};
use tokio::sync::{oneshot, Notify};

/// One call seen by a test transport
#[derive(Clone, Debug)]
pub struct UploadCall {
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
}

/// Records what reaches the wire, then delegates to a real transport.
pub struct RecordingTransport<T> {
    inner: T,
    calls: Mutex<Vec<UploadCall>>,
}

impl<T: UploadTransport> RecordingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<T: UploadTransport> UploadTransport for RecordingTransport<T> {
    async fn upload(
        &self,
        auth_token: &str,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(UploadCall {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size: data.len(),
        });
        self.inner.upload(auth_token, data, file_name, mime_type).await
    }
}

/// Each call takes the next scripted step. A gated step waits for its
/// release signal before answering, which lets a test hold one attempt in
/// flight while another completes.
pub struct GatedTransport {
    steps: Mutex<VecDeque<Step>>,
    entered: Arc<Notify>,
}

enum Step {
    Immediate(Result<String, TransportError>),
    Gated(oneshot::Receiver<()>, Result<String, TransportError>),
}

impl GatedTransport {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            entered: Arc::new(Notify::new()),
        }
    }

    pub fn then_ok(self, url: &str) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step::Immediate(Ok(url.to_string())));
        self
    }

    /// Queue a step that answers `result` once the returned sender fires.
    pub fn then_gated(self, result: Result<String, TransportError>) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().unwrap().push_back(Step::Gated(rx, result));
        (self, tx)
    }

    /// Resolves once a call has reached the transport.
    pub fn entered(&self) -> Arc<Notify> {
        self.entered.clone()
    }
}

#[async_trait]
impl UploadTransport for GatedTransport {
    async fn upload(
        &self,
        _auth_token: &str,
        _data: Bytes,
        _file_name: &str,
        _mime_type: &str,
    ) -> Result<String, TransportError> {
        let step = self.steps.lock().unwrap().pop_front();
        self.entered.notify_one();
        match step {
            Some(Step::Immediate(result)) => result,
            Some(Step::Gated(release, result)) => {
                let _ = release.await;
                result
            }
            None => Err(TransportError::MissingFileUrl),
        }
    }
}

/// Backend that accepts connections and never answers. Returns its base URL.
pub async fn silent_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
