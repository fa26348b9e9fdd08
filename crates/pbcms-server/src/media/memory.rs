//! In-process media store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{MediaError, MediaStore, StoredImage};

/// Keeps image bytes in a map keyed by public id. URLs use the
/// `memory://` scheme and are not served.
#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    images: DashMap<String, Vec<u8>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.images.contains_key(public_id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn describe(public_id: &str, len: usize) -> StoredImage {
        StoredImage {
            secure_url: format!("memory://{public_id}.webp"),
            public_id: public_id.to_string(),
            width: None,
            height: None,
            format: "webp".to_string(),
            bytes: Some(len as u64),
        }
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        public_id: &str,
    ) -> Result<StoredImage, MediaError> {
        let full_id = format!("{folder}/{public_id}");
        let image = Self::describe(&full_id, bytes.len());
        self.images.insert(full_id, bytes);
        Ok(image)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        self.images
            .remove(public_id)
            .map(|_| ())
            .ok_or_else(|| MediaError::NotFound(public_id.to_string()))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<StoredImage, MediaError> {
        let (_, bytes) = self
            .images
            .remove(from)
            .ok_or_else(|| MediaError::NotFound(from.to_string()))?;
        let image = Self::describe(to, bytes.len());
        self.images.insert(to.to_string(), bytes);
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_rename_destroy() {
        let store = MemoryMediaStore::new();
        let image = store
            .upload(vec![1, 2], "pbgroup/services/active", "survey")
            .await
            .unwrap();
        assert_eq!(image.public_id, "pbgroup/services/active/survey");
        assert_eq!(image.secure_url, "memory://pbgroup/services/active/survey.webp");

        let moved = store
            .rename(&image.public_id, "pbgroup/services/inactive/survey")
            .await
            .unwrap();
        assert!(!store.contains(&image.public_id));
        assert!(store.contains(&moved.public_id));

        store.destroy(&moved.public_id).await.unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.destroy(&moved.public_id).await,
            Err(MediaError::NotFound(_))
        ));
    }
}
