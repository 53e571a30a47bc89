use std::{path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::domain::{User, UserDocument};
use super::repository::UserRepository;
use crate::errors::StoreError;
use crate::storage::json_document::JsonDocumentFile;

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Write through a sibling temp file and rename over the target.
    pub atomic_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { atomic_writes: true }
    }
}

/// File-backed user record store.
///
/// Every operation loads the whole document, applies its change and writes
/// the whole document back, all under one exclusive lock. Reads take the
/// same lock, so no two operations ever interleave.
///
/// The lock belongs to the handle, not the path: two `open` calls on one
/// file do not exclude each other and share the same `.tmp` write path.
/// Share a single `Arc<UserStore>` between all callers.
///
/// Not-found handling is deliberately uneven and kept for compatibility:
/// `upgrade` reports `NotFound`, while `update`, `store_refresh_token` and
/// `revoke_refresh_token` rewrite the unchanged document and succeed.
pub struct UserStore {
    doc: JsonDocumentFile<UserDocument>,
}

impl UserStore {
    /// Open the store at `path`, creating an empty document if the file is missing.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        Self::open_with(path, StoreOptions::default()).await
    }

    pub async fn open_with<P: Into<PathBuf>>(path: P, opts: StoreOptions) -> Result<Arc<Self>, StoreError> {
        let doc = JsonDocumentFile::open(path, opts.atomic_writes).await?;
        Ok(Arc::new(Self { doc }))
    }

    pub fn path(&self) -> &Path {
        self.doc.path()
    }

    /// Insert a new user with id `count + 1` and persist.
    ///
    /// IDs are not a monotonic counter: they only stay unique while records
    /// are never removed from the file.
    pub async fn create(&self, email: &str, password_hash: &[u8]) -> Result<User, StoreError> {
        let user = self
            .doc
            .transaction(|doc| {
                let id = doc.next_id();
                let user = User {
                    email: email.to_string(),
                    id,
                    password: password_hash.to_vec(),
                    ..Default::default()
                };
                if doc.users.insert(id, user.clone()).is_some() {
                    warn!(id, "create replaced an existing record; ids are not dense");
                }
                Ok(user)
            })
            .await?;
        debug!(id = user.id, "user created");
        Ok(user)
    }

    /// Snapshot of all users ordered ascending by id.
    pub async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        self.doc.read(UserDocument::sorted).await
    }

    /// The `id`-th user in id order (1-based).
    ///
    /// This is positional: it matches the record whose id field equals `id`
    /// only while ids run contiguously from 1. Use [`UserStore::find`] for a
    /// lookup by key.
    pub async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        let users = self.list_all().await?;
        if id <= 0 || id as usize > users.len() {
            return Err(StoreError::invalid_id(id));
        }
        Ok(users[(id - 1) as usize].clone())
    }

    /// Direct lookup by id key.
    pub async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.doc.read(|doc| doc.users.get(&id).cloned()).await
    }

    /// First user in id order with exactly this email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.doc
            .read(|doc| doc.sorted().into_iter().find(|u| u.email == email))
            .await
    }

    /// First user in id order holding this refresh token. An empty token matches nobody.
    pub async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.doc
            .read(|doc| doc.sorted().into_iter().find(|u| u.refresh_token == token))
            .await
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        self.doc.read(|doc| doc.users.len()).await
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Replace email and password hash.
    ///
    /// An unknown id is not an error: the document is rewritten unchanged and
    /// an empty `User::default()` is returned.
    pub async fn update(&self, id: i64, email: &str, password_hash: &[u8]) -> Result<User, StoreError> {
        let updated = self
            .doc
            .transaction(|doc| {
                Ok(doc.users.get_mut(&id).map(|user| {
                    user.email = email.to_string();
                    user.password = password_hash.to_vec();
                    user.clone()
                }))
            })
            .await?;
        match updated {
            Some(user) => {
                debug!(id, "user updated");
                Ok(user)
            }
            None => {
                warn!(id, "update of unknown user ignored");
                Ok(User::default())
            }
        }
    }

    /// Set the upgrade flag. Idempotent; `NotFound` for an unknown id.
    pub async fn upgrade(&self, id: i64) -> Result<(), StoreError> {
        self.doc
            .transaction(|doc| {
                let user = doc.users.get_mut(&id).ok_or_else(|| {
                    warn!(id, "upgrade of unknown user");
                    StoreError::not_found("user")
                })?;
                user.is_chirpy_red = true;
                Ok(())
            })
            .await?;
        debug!(id, "user upgraded");
        Ok(())
    }

    /// Persist a refresh token. Unknown ids are silently ignored.
    pub async fn store_refresh_token(&self, id: i64, token: &str) -> Result<(), StoreError> {
        self.set_refresh_token(id, token.to_string()).await
    }

    /// Clear the refresh token. Unknown ids are silently ignored.
    pub async fn revoke_refresh_token(&self, id: i64) -> Result<(), StoreError> {
        self.set_refresh_token(id, String::new()).await
    }

    async fn set_refresh_token(&self, id: i64, token: String) -> Result<(), StoreError> {
        let revoked = token.is_empty();
        let found = self
            .doc
            .transaction(|doc| match doc.users.get_mut(&id) {
                Some(user) => {
                    user.refresh_token = token;
                    Ok(true)
                }
                None => Ok(false),
            })
            .await?;
        if found {
            debug!(id, revoked, "refresh token set");
        } else {
            warn!(id, "refresh token change for unknown user ignored");
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn create(&self, email: &str, password_hash: &[u8]) -> Result<User, StoreError> { self.create(email, password_hash).await }
    async fn list_all(&self) -> Result<Vec<User>, StoreError> { self.list_all().await }
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> { self.get_by_id(id).await }
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> { self.find(id).await }
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> { self.find_by_email(email).await }
    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError> { self.find_by_refresh_token(token).await }
    async fn update(&self, id: i64, email: &str, password_hash: &[u8]) -> Result<User, StoreError> { self.update(id, email, password_hash).await }
    async fn upgrade(&self, id: i64) -> Result<(), StoreError> { self.upgrade(id).await }
    async fn store_refresh_token(&self, id: i64, token: &str) -> Result<(), StoreError> { self.store_refresh_token(id, token).await }
    async fn revoke_refresh_token(&self, id: i64) -> Result<(), StoreError> { self.revoke_refresh_token(id).await }
}
