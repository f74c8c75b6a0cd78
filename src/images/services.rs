use std::{fmt, path::Path, str::FromStr, sync::Arc};

use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];
const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpg", "image/jpeg", "image/png", "image/webp"];

/// Which entity family an image belongs to; also the middle key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Course,
    Store,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Course => "course",
            ImageKind::Store => "store",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "course" => Ok(ImageKind::Course),
            "store" => Ok(ImageKind::Store),
            other => anyhow::bail!("unknown image kind {other:?}"),
        }
    }
}

/// Why an upload was refused; the message goes back in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRejection {
    MissingImage,
    Extension,
    ContentType,
}

impl UploadRejection {
    pub fn message(&self) -> &'static str {
        match self {
            UploadRejection::MissingImage => "image data not found",
            UploadRejection::Extension => "image extension not allowed (jpg, jpeg, png, webp)",
            UploadRejection::ContentType => "Content Type is not allowed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    pub id: Uuid,
    pub file_name: String,
}

/// Lowercased extension including the dot, when it is an accepted image type.
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    let ext = format!(".{ext}");
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type.trim().to_ascii_lowercase().as_str())
}

/// Content type served for a stored file, from its extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    match image_extension(file_name).as_deref() {
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        Some(".png") => "image/png",
        Some(".webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// `{kind}_{unix_nanos}{ext}`
pub fn generated_file_name(kind: ImageKind, ext: &str, at: OffsetDateTime) -> String {
    format!("{}_{}{}", kind, at.unix_timestamp_nanos(), ext)
}

/// Storage key `{id}/{kind}/{file_name}`; file names with separators or `..`
/// are rejected.
pub fn object_key(id: Uuid, kind: ImageKind, file_name: &str) -> anyhow::Result<String> {
    anyhow::ensure!(
        !file_name.is_empty()
            && !file_name.contains('/')
            && !file_name.contains('\\')
            && !file_name.contains(".."),
        "invalid image file name {file_name:?}"
    );
    Ok(format!("{id}/{kind}/{file_name}"))
}

/// Upload, lookup and cleanup of entity images.
#[derive(Clone)]
pub struct ImageService {
    storage: Arc<dyn StorageClient>,
    public_base_url: String,
}

impl ImageService {
    pub fn new(storage: Arc<dyn StorageClient>, public_base_url: impl Into<String>) -> Self {
        Self {
            storage,
            public_base_url: public_base_url.into(),
        }
    }

    /// Validates and stores an uploaded image. A missing `id` means a new
    /// entity, so a fresh one is generated.
    pub async fn upload(
        &self,
        kind: ImageKind,
        id: Option<Uuid>,
        original_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> anyhow::Result<Result<UploadedImage, UploadRejection>> {
        let Some(ext) = image_extension(original_name) else {
            warn!(file = original_name, "upload rejected: extension");
            return Ok(Err(UploadRejection::Extension));
        };
        if !is_allowed_content_type(content_type) {
            warn!(content_type, "upload rejected: content type");
            return Ok(Err(UploadRejection::ContentType));
        }

        let id = id.unwrap_or_else(Uuid::new_v4);
        let file_name = generated_file_name(kind, &ext, OffsetDateTime::now_utc());
        let key = object_key(id, kind, &file_name)?;
        self.storage
            .put_object(&key, body, content_type)
            .await
            .with_context(|| format!("store image {key}"))?;

        info!(entity_id = %id, %kind, file = %file_name, "image uploaded");
        Ok(Ok(UploadedImage { id, file_name }))
    }

    pub async fn exists(&self, id: Uuid, kind: ImageKind, file_name: &str) -> anyhow::Result<bool> {
        let Ok(key) = object_key(id, kind, file_name) else {
            return Ok(false);
        };
        self.storage.exists(&key).await
    }

    pub async fn remove(&self, id: Uuid, kind: ImageKind, file_name: &str) -> anyhow::Result<()> {
        let key = object_key(id, kind, file_name)?;
        self.storage
            .delete_object(&key)
            .await
            .with_context(|| format!("remove image {key}"))?;
        info!(entity_id = %id, %kind, file = %file_name, "image removed");
        Ok(())
    }

    /// Bytes and content type of a stored image, `None` when absent.
    pub async fn fetch(
        &self,
        id: Uuid,
        kind: ImageKind,
        file_name: &str,
    ) -> anyhow::Result<Option<(Bytes, &'static str)>> {
        let Ok(key) = object_key(id, kind, file_name) else {
            return Ok(None);
        };
        let body = self.storage.get_object(&key).await?;
        Ok(body.map(|b| (b, content_type_for(file_name))))
    }

    pub fn url(&self, id: Uuid, kind: ImageKind, file_name: &str) -> String {
        format!("{}/{id}/{kind}/{file_name}", self.public_base_url)
    }
}
