//! Persistent application settings.
//!
//! Holds the remember-me credentials, the machine-auth hashes issued per
//! username and the servers the backend suggested for future connections.
//!
//! NOTE: when the account is remembered, `last_password` is stored in clear
//! text in the settings file. Anyone able to read the file can read the
//! password.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization/deserialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub should_remember_account: bool,
    pub last_username: Option<String>,
    pub last_password: Option<String>,
    /// Machine-auth hash per username, hex encoded on disk.
    #[serde(with = "hex_map")]
    pub sentry_hashes: HashMap<String, Vec<u8>>,
    pub preferred_servers: Vec<String>,
}

mod hex_map {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        map.iter()
            .map(|(user, hash)| (user, hex::encode(hash)))
            .collect::<HashMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, Vec<u8>>, D::Error> {
        HashMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(user, hash)| hex::decode(&hash).map(|h| (user, h)).map_err(D::Error::custom))
            .collect()
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<Settings>>;

    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept as pretty-printed JSON in a single file.
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<Option<Settings>> {
        match fs::read(&self.path).await {
            Ok(data) => serde_json::from_slice(&data)
                .map(Some)
                .map_err(|e| SettingsError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SettingsError::Io(e)),
        }
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(settings)
            .map_err(|e| SettingsError::Serialization(e.to_string()))?;
        fs::write(&self.path, data).await.map_err(SettingsError::Io)
    }
}

/// Keeps the last saved settings in memory. Used when nothing should touch
/// the disk, and by tests to observe saves.
#[derive(Default)]
pub struct MemorySettingsStore {
    saved: Mutex<Option<Settings>>,
    saves: AtomicUsize,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<Settings> {
        self.saved
            .lock()
            .expect("Mutex should not be poisoned")
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Option<Settings>> {
        Ok(self.saved())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        *self.saved.lock().expect("Mutex should not be poisoned") = Some(settings.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Cached settings backed by a [`SettingsStore`].
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    current: RwLock<Settings>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, settings: Settings) -> Self {
        Self {
            store,
            current: RwLock::new(settings),
        }
    }

    /// Reads the settings from `store`, falling back to defaults when
    /// nothing was saved yet.
    pub async fn load(store: Arc<dyn SettingsStore>) -> Result<Self> {
        let settings = store.load().await?.unwrap_or_else(|| {
            debug!(target: "Session/Settings", "No saved settings, using defaults");
            Settings::default()
        });
        Ok(Self::new(store, settings))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettingsStore::new()), Settings::default())
    }

    pub async fn snapshot(&self) -> Settings {
        self.current.read().await.clone()
    }

    /// Mutates the cached settings. Nothing is persisted until [`save`](Self::save).
    pub async fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut *self.current.write().await)
    }

    pub async fn save(&self) -> Result<()> {
        let snapshot = self.snapshot().await;
        self.store.save(&snapshot).await
    }

    pub async fn sentry_hash(&self, username: &str) -> Option<Vec<u8>> {
        self.current.read().await.sentry_hashes.get(username).cloned()
    }

    /// Username and password when the account is remembered.
    pub async fn remembered_credentials(&self) -> Option<(String, String)> {
        let settings = self.current.read().await;
        if !settings.should_remember_account {
            return None;
        }
        Some((
            settings.last_username.clone()?,
            settings.last_password.clone()?,
        ))
    }

    /// Stored preferred servers; entries that fail to parse are skipped.
    pub async fn preferred_servers(&self) -> Vec<SocketAddr> {
        self.current
            .read()
            .await
            .preferred_servers
            .iter()
            .filter_map(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(target: "Session/Settings", "Ignoring stored server '{raw}': {e}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileSettingsStore::new(
            dir.path().join("nested").join("settings.json"),
        ));
        let service = SettingsService::load(store.clone()).await.unwrap();
        assert_eq!(service.snapshot().await, Settings::default());

        service
            .update(|s| {
                s.should_remember_account = true;
                s.last_username = Some("alice".into());
                s.last_password = Some("pw".into());
                s.sentry_hashes.insert("alice".into(), vec![0xde, 0xad]);
                s.preferred_servers.push("127.0.0.1:27017".into());
            })
            .await;
        service.save().await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"dead\""), "hashes are hex encoded: {raw}");

        let reloaded = SettingsService::load(store).await.unwrap();
        assert_eq!(reloaded.snapshot().await, service.snapshot().await);
        assert_eq!(reloaded.sentry_hash("alice").await, Some(vec![0xde, 0xad]));
        assert_eq!(
            reloaded.remembered_credentials().await,
            Some(("alice".into(), "pw".into()))
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = SettingsService::load(Arc::new(JsonFileSettingsStore::new(path)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SettingsError::Serialization(_)));
    }

    #[tokio::test]
    async fn invalid_preferred_servers_are_skipped() {
        let service = SettingsService::in_memory();
        service
            .update(|s| {
                s.preferred_servers = vec!["not-an-address".into(), "10.0.0.1:27018".into()];
            })
            .await;
        assert_eq!(
            service.preferred_servers().await,
            vec!["10.0.0.1:27018".parse::<SocketAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn remembered_credentials_require_the_flag() {
        let service = SettingsService::in_memory();
        service
            .update(|s| {
                s.last_username = Some("bob".into());
                s.last_password = Some("pw".into());
            })
            .await;
        assert_eq!(service.remembered_credentials().await, None);
    }
}
