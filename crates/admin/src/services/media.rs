//! Uploaded images on local disk.
//!
//! Files land in `MEDIA_DIR` as `<uuid>.<ext>` and both apps serve that
//! directory at `/media`. The format is decided by the file's magic bytes,
//! never by the client's filename or content type.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// URL prefix under which media files are served.
pub const MEDIA_URL_PREFIX: &str = "/media/";

/// Errors from storing or removing media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("the file is empty")]
    Empty,

    #[error("the file is larger than {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("only JPEG, PNG, WebP and GIF images are accepted")]
    UnsupportedType,

    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl ImageFormat {
    /// Recognise a format from the first bytes of the file.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::WebP),
            _ => None,
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// Stores uploads under one directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl MediaStore {
    #[must_use]
    pub const fn new(dir: PathBuf, max_bytes: usize) -> Self {
        Self { dir, max_bytes }
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check an upload without writing it.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Empty`, `MediaError::TooLarge` or
    /// `MediaError::UnsupportedType`.
    pub fn validate(&self, bytes: &[u8]) -> Result<ImageFormat, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }
        ImageFormat::sniff(bytes).ok_or(MediaError::UnsupportedType)
    }

    /// Write an image and return its public URL (`/media/<uuid>.<ext>`).
    ///
    /// # Errors
    ///
    /// Returns a validation error, or `MediaError::Io` if writing fails.
    pub async fn save(&self, bytes: &[u8]) -> Result<String, MediaError> {
        let format = self.validate(bytes)?;
        let file_name = format!("{}.{}", Uuid::new_v4(), format.extension());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        tracing::info!(file = %file_name, size = bytes.len(), "media stored");
        Ok(format!("{MEDIA_URL_PREFIX}{file_name}"))
    }

    /// Remove the file behind a `/media/...` URL. URLs pointing elsewhere
    /// (external images) and already-missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the file exists but cannot be removed.
    pub async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let Some(path) = self.path_for(url) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "media removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a stored file by name. `None` for unknown or foreign names.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the file exists but cannot be read.
    pub async fn read(&self, name: &str) -> Result<Option<(ImageFormat, Vec<u8>)>, MediaError> {
        let Some(path) = self.path_for(&format!("{MEDIA_URL_PREFIX}{name}")) else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(ImageFormat::sniff(&bytes).map(|format| (format, bytes)))
    }

    /// Path for a media URL we issued; `None` for anything else.
    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(MEDIA_URL_PREFIX)?;
        is_stored_file_name(name).then(|| self.dir.join(name))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `<uuid>.<ext>` with one of our extensions, nothing else.
fn is_stored_file_name(name: &str) -> bool {
    let Some((stem, ext)) = name.split_once('.') else {
        return false;
    };
    Uuid::parse_str(stem).is_ok() && matches!(ext, "jpg" | "png" | "webp" | "gif")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn temp_store(max_bytes: usize) -> MediaStore {
        let dir = std::env::temp_dir().join(format!("jw-media-test-{}", Uuid::new_v4()));
        MediaStore::new(dir, max_bytes)
    }

    #[test]
    fn test_sniff_formats() {
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::sniff(PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::sniff(b"RIFF\x10\0\0\0WEBPVP8 "), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::sniff(b"RIFF\x10\0\0\0WAVEfmt "), None);
        assert_eq!(ImageFormat::sniff(b"<svg xmlns="), None);
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_validate_limits() {
        let store = temp_store(16);
        assert!(matches!(store.validate(&[]), Err(MediaError::Empty)));
        assert!(matches!(
            store.validate(&[0xFF; 17]),
            Err(MediaError::TooLarge { max_bytes: 16 })
        ));
        assert!(matches!(store.validate(b"plain text"), Err(MediaError::UnsupportedType)));
        assert_eq!(store.validate(PNG_HEADER).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_only_issued_urls_map_to_files() {
        let store = temp_store(1024);
        let id = Uuid::new_v4();
        assert!(store.path_for(&format!("/media/{id}.png")).is_some());
        assert!(store.path_for("/media/../config.toml").is_none());
        assert!(store.path_for(&format!("/media/{id}.png/../../x")).is_none());
        assert!(store.path_for("https://cdn.example.com/a.png").is_none());
        assert!(store.path_for(&format!("/media/{id}.svg")).is_none());
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let store = temp_store(1024);
        let url = store.save(PNG_HEADER).await.unwrap();
        assert!(url.starts_with(MEDIA_URL_PREFIX));
        assert!(url.ends_with(".png"));

        let path = store.path_for(&url).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG_HEADER);

        let name = url.trim_start_matches(MEDIA_URL_PREFIX);
        let (format, bytes) = store.read(name).await.unwrap().unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(bytes, PNG_HEADER);
        assert!(store.read("../secrets.png").await.unwrap().is_none());

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
        assert!(store.read(name).await.unwrap().is_none());
        // Deleting twice is fine
        store.delete(&url).await.unwrap();

        let _ = tokio::fs::remove_dir_all(store.dir()).await;
    }
}
