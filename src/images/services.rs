use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_FILES: usize = 10;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub filename: String,
}

/// Stores each image under `uploads/<uuid>.<ext>` and returns where it landed.
pub async fn store_images(
    storage: &dyn StorageClient,
    images: Vec<UploadItem>,
) -> anyhow::Result<Vec<StoredImage>> {
    anyhow::ensure!(!images.is_empty(), "no images provided");

    let mut stored = Vec::with_capacity(images.len());
    for img in images {
        let ext = ext_from_mime(&img.content_type).unwrap_or("bin");
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let key = format!("uploads/{filename}");
        storage
            .put_object(&key, img.body, &img.content_type)
            .await
            .with_context(|| format!("put_object {key}"))?;
        stored.push(StoredImage {
            url: storage.public_url(&key),
            filename,
        });
    }
    Ok(stored)
}

pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
