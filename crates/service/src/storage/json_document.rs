use std::{io, marker::PhantomData, path::{Path, PathBuf}};
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::errors::StoreError;

/// Generic JSON file-backed document.
///
/// The whole document is read from disk on every access and written back
/// whole on every mutation. A single mutex serializes all access to the
/// file, reads included; nothing is cached between calls.
pub struct JsonDocumentFile<D> {
    lock: Mutex<()>,
    file_path: PathBuf,
    atomic_writes: bool,
    _doc: PhantomData<fn() -> D>,
}

impl<D> JsonDocumentFile<D>
where
    D: serde::Serialize + serde::de::DeserializeOwned + Default,
{
    /// Open the document at `path`. Creates the file with `D::default()` if missing.
    ///
    /// An existing file is not parsed here; a corrupt file surfaces on the first load.
    pub async fn open<P: Into<PathBuf>>(path: P, atomic_writes: bool) -> Result<Self, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::io(parent, e))?;
        }

        let doc = Self { lock: Mutex::new(()), file_path, atomic_writes, _doc: PhantomData };
        match fs::metadata(&doc.file_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %doc.file_path.display(), "creating empty document");
                doc.save(&D::default()).await?;
            }
            Err(e) => return Err(StoreError::io(&doc.file_path, e)),
        }
        Ok(doc)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    async fn load(&self) -> Result<D, StoreError> {
        let bytes = fs::read(&self.file_path).await.map_err(|e| StoreError::io(&self.file_path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::parse(&self.file_path, e))
    }

    async fn save(&self, doc: &D) -> Result<(), StoreError> {
        let data = serde_json::to_vec(doc).map_err(|e| StoreError::parse(&self.file_path, e))?;
        if !self.atomic_writes {
            return fs::write(&self.file_path, data).await.map_err(|e| StoreError::io(&self.file_path, e));
        }

        let tmp = self.temp_path();
        fs::write(&tmp, data).await.map_err(|e| StoreError::io(&tmp, e))?;
        // the rename replaces the inode; carry the target's mode over
        if let Ok(meta) = fs::metadata(&self.file_path).await {
            if let Err(e) = fs::set_permissions(&tmp, meta.permissions()).await {
                warn!(path = %tmp.display(), error = %e, "failed to copy permissions to temp file");
            }
        }
        if let Err(e) = fs::rename(&tmp, &self.file_path).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
            }
            return Err(StoreError::io(&self.file_path, e));
        }
        Ok(())
    }

    /// Sibling of the target so the rename stays on one filesystem.
    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.file_path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Load the document under the lock and hand it to `f` without writing back.
    pub async fn read<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&D) -> T,
    {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        Ok(f(&doc))
    }

    /// Load, mutate and write the document as one critical section.
    ///
    /// If `f` fails the document is not written.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut D) -> Result<T, StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        let out = f(&mut doc)?;
        self.save(&doc).await?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Counters {
        #[serde(default)]
        values: BTreeMap<String, u32>,
    }

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("json_document_{}_{}.json", tag, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn creates_file_and_persists_transactions() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("persist");
        let doc = JsonDocumentFile::<Counters>::open(&tmp, true).await?;
        assert_eq!(tokio::fs::read_to_string(&tmp).await?, r#"{"values":{}}"#);

        doc.transaction(|c| {
            c.values.insert("a".into(), 1);
            Ok(())
        })
        .await?;

        // reopen from disk; existing content is left alone
        let reopened = JsonDocumentFile::<Counters>::open(&tmp, false).await?;
        let a = reopened.read(|c| c.values.get("a").copied()).await?;
        assert_eq!(a, Some(1));
        assert!(tokio::fs::metadata(doc.temp_path()).await.is_err());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_transaction_does_not_write() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("rollback");
        let doc = JsonDocumentFile::<Counters>::open(&tmp, true).await?;
        let res = doc
            .transaction(|c| {
                c.values.insert("lost".into(), 7);
                Err::<(), _>(StoreError::not_found("counter"))
            })
            .await;
        assert!(matches!(res, Err(StoreError::NotFound(_))));
        assert!(doc.read(|c| c.values.is_empty()).await?);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("corrupt");
        tokio::fs::write(&tmp, b"{not json").await?;
        let doc = JsonDocumentFile::<Counters>::open(&tmp, true).await?;
        let res = doc.read(|c| c.values.len()).await;
        assert!(matches!(res, Err(StoreError::Parse(_))));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn atomic_write_keeps_file_mode() -> Result<(), anyhow::Error> {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tmp_path("mode");
        let doc = JsonDocumentFile::<Counters>::open(&tmp, true).await?;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;

        doc.transaction(|c| {
            c.values.insert("a".into(), 1);
            Ok(())
        })
        .await?;
        let mode = tokio::fs::metadata(&tmp).await?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_leaves_file_untouched() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("blocked");
        let doc = JsonDocumentFile::<Counters>::open(&tmp, true).await?;
        // a directory where the temp file should go makes the write fail
        tokio::fs::create_dir(doc.temp_path()).await?;

        let res = doc
            .transaction(|c| {
                c.values.insert("a".into(), 1);
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(StoreError::Io(_))));
        assert_eq!(tokio::fs::read_to_string(&tmp).await?, r#"{"values":{}}"#);

        let _ = tokio::fs::remove_dir(doc.temp_path()).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn removed_file_is_an_io_error() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("removed");
        let doc = JsonDocumentFile::<Counters>::open(&tmp, true).await?;
        tokio::fs::remove_file(&tmp).await?;
        let res = doc.read(|c| c.values.len()).await;
        assert!(matches!(res, Err(StoreError::Io(_))));
        Ok(())
    }
}
