use bytes::Bytes;
use uuid::Uuid;

use super::slot::SlotKey;

/// Captured binary as handed over by the file input or camera.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFile {
    pub data: Bytes,
    pub mime_type: String,
}

impl RawFile {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_image(&self) -> bool {
        is_image_mime_type(&self.mime_type)
    }
}

pub fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type.to_lowercase().starts_with("image/")
}

/// Transient value describing one upload attempt. Never persisted.
#[derive(Clone, Debug)]
pub struct UploadJob {
    pub id: Uuid,
    pub slot_key: SlotKey,
    pub raw_file: RawFile,
    /// Full remote file name, `<context>-<logicalName>`
    pub file_name: String,
    pub auth_token: String,
    /// Slot attempt counter captured when the job was created
    pub attempt: u64,
}

impl UploadJob {
    pub fn new(
        slot_key: SlotKey,
        raw_file: RawFile,
        context: &str,
        logical_name: &str,
        auth_token: String,
        attempt: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot_key,
            raw_file,
            file_name: format!("{}-{}", context, logical_name),
            auth_token,
            attempt,
        }
    }
}
