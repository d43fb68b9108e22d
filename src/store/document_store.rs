use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::entities::Document;

/// File holding the whole tracker document inside the application directory.
pub const DOCUMENT_FILE: &str = "activities.json";

/// Interface for abstracting storage of the tracker document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the persisted document. `None` means there is no usable data
    /// yet, whether because nothing was ever saved or because the stored
    /// value can't be parsed. Callers treat both the same way.
    async fn load(&self) -> Result<Option<Document>>;

    /// Replaces the persisted document. Last save wins.
    async fn save(&self, document: &Document) -> Result<()>;
}

/// The main realization of [DocumentStore]: one JSON file guarded by advisory
/// file locks.
pub struct JsonDocumentStore {
    path: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(application_dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(application_dir)?;

        Ok(Self {
            path: application_dir.join(DOCUMENT_FILE),
        })
    }

    async fn read_contents(&self) -> Result<Option<String>, std::io::Error> {
        let mut file = match File::open(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        file.lock_shared()?;
        let mut contents = String::new();
        let result = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        result?;
        Ok(Some(contents))
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn load(&self) -> Result<Option<Document>> {
        debug!("Loading document from {:?}", self.path);
        let Some(contents) = self.read_contents().await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Document>(&contents) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                // Treated as no data rather than an error. Might happen after
                // a shutdown cut a write short or the file was edited by hand.
                warn!("Stored document at {:?} is not parseable: {e}", self.path);
                Ok(None)
            }
        }
    }

    async fn save(&self, document: &Document) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(document)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        // Semi-safe acquire-release for the file
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.seek(std::io::SeekFrom::Start(0)).await?;
            file.write_all(&serialized).await?;
            file.flush().await?;
            Ok(())
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::store::entities::{ActivityColor, Document, OpenActivity};

    use super::{DocumentStore, JsonDocumentStore, DOCUMENT_FILE};

    fn sample_document() -> Document {
        let open = OpenActivity::begin(
            Some("Writing".into()),
            Some(ActivityColor::Cyan),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        let finished = OpenActivity::begin(
            Some("Emails".into()),
            Some(ActivityColor::Blue),
            Utc.timestamp_opt(1_699_990_000, 0).unwrap(),
        )
        .finalize(Utc.timestamp_opt(1_699_991_000, 0).unwrap());

        Document {
            activities: vec![finished],
            current: Some(open),
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path())?;

        let document = sample_document();
        store.save(&document).await?;

        assert_eq!(store.load().await?, Some(document));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_no_data() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path())?;

        assert_eq!(store.load().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_is_no_data() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(DOCUMENT_FILE), "{\"activities\": [truncated")?;

        let store = JsonDocumentStore::new(dir.path())?;
        assert_eq!(store.load().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites_longer_previous_document() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path())?;

        store.save(&sample_document()).await?;
        store.save(&Document::default()).await?;

        assert_eq!(store.load().await?, Some(Document::default()));
        Ok(())
    }
}
