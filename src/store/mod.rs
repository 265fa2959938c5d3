// Persisted shortcut store: one JSON file per key under a root directory.
// A save persists first, then raises the in-process signal; writes observed
// on disk from a different writer raise the external-change signal instead.

mod propagator;

pub use propagator::StorePropagator;

use crate::models::Shortcut;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity for the two change-signal channels. Listeners that lag simply
/// collapse the missed signals into one reload.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store watch: {0}")]
    Watch(#[from] notify::Error),
}

/// Durable representation: the collection plus enough provenance to tell a
/// self-write apart from a write by another process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    writer: Uuid,
    rev: u64,
    items: Vec<Shortcut>,
}

/// One process's view of the durable shortcut store. Any number of stores
/// may point at the same root directory; each carries its own writer id so
/// the filesystem watcher can attribute observed writes.
pub struct ShortcutStore {
    root: PathBuf,
    writer: Uuid,
    revs: Mutex<HashMap<String, u64>>,
    in_process_tx: broadcast::Sender<String>,
    external_tx: broadcast::Sender<String>,
    // Held for its side effect: dropping it stops the external watch.
    _watcher: RecommendedWatcher,
}

impl ShortcutStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let writer = Uuid::new_v4();
        let (in_process_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (external_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let watcher = spawn_external_watch(&root, writer, external_tx.clone())?;
        Ok(Self {
            root,
            writer,
            revs: Mutex::new(HashMap::new()),
            in_process_tx,
            external_tx,
            _watcher: watcher,
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Synchronous durable read. A missing file is an empty collection.
    pub fn load(&self, key: &str) -> Result<Vec<Shortcut>, StoreError> {
        let text = match std::fs::read_to_string(self.path_for(key)) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope = serde_json::from_str(&text)?;
        Ok(envelope.items)
    }

    /// Persists `items`, then raises the in-process signal for `key`. The
    /// ordering is load-bearing: listeners reload when the signal arrives,
    /// so the write must be durable before the signal is visible.
    pub fn save(&self, key: &str, items: &[Shortcut]) -> Result<(), StoreError> {
        let rev = {
            let mut revs = self
                .revs
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let rev = revs.entry(key.to_string()).or_insert(0);
            *rev += 1;
            *rev
        };
        let envelope = Envelope {
            writer: self.writer,
            rev,
            items: items.to_vec(),
        };
        // Write-then-rename keeps concurrent readers (and the watcher on the
        // other side) from ever seeing a half-written file.
        let tmp = self.root.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, serde_json::to_vec_pretty(&envelope)?)?;
        std::fs::rename(&tmp, self.path_for(key))?;
        let _ = self.in_process_tx.send(key.to_string());
        Ok(())
    }

    /// Signal raised by this store's own `save` calls.
    pub(crate) fn subscribe_in_process(&self) -> broadcast::Receiver<String> {
        self.in_process_tx.subscribe()
    }

    /// Signal raised when another writer's save is observed on disk.
    pub(crate) fn subscribe_external(&self) -> broadcast::Receiver<String> {
        self.external_tx.subscribe()
    }
}

/// Watches the store root and forwards writes made by other writers as
/// external-change signals. Self-writes never signal here; the in-process
/// path covers them, which is what keeps a save from being delivered twice.
fn spawn_external_watch(
    root: &Path,
    own_writer: Uuid,
    external_tx: broadcast::Sender<String>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut seen: HashMap<String, (Uuid, u64)> = HashMap::new();
    let mut watcher =
        notify::recommended_watcher(move |event: Result<Event, notify::Error>| {
            let event = match event {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, operation = "watch", "store watch error");
                    return;
                }
            };
            if !(event.kind.is_create() || event.kind.is_modify()) {
                return;
            }
            for path in &event.paths {
                let Some(key) = key_for_path(path) else {
                    continue;
                };
                let Ok(text) = std::fs::read_to_string(path) else {
                    continue;
                };
                let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
                    continue;
                };
                let stamp = (envelope.writer, envelope.rev);
                if seen.get(&key) == Some(&stamp) {
                    // Duplicate filesystem event for a write already handled.
                    continue;
                }
                seen.insert(key.clone(), stamp);
                if envelope.writer == own_writer {
                    continue;
                }
                let _ = external_tx.send(key);
            }
        })?;
    watcher.watch(root, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn key_for_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".json").map(str::to_string)
}
