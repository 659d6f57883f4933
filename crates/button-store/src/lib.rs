//! JSON-file persistence for button mapping records.
//!
//! The store owns a single JSON file and serializes access behind a mutex.
//! Reads are tolerant: a missing or malformed file yields the empty store so
//! a damaged config never wedges startup. Writes go through a temp file and
//! an atomic rename.

mod record;

pub use record::{ButtonPatch, ButtonRecord, NewButton, StoreFile};

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use keyspec::{normalize, validate_grammar};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem failure reading or writing the store file.
    #[error("store io: {0}")]
    Io(#[from] io::Error),
    /// The store file could not be serialized.
    #[error("store format: {0}")]
    Format(#[from] serde_json::Error),
    /// No record with the given id.
    #[error("no button with id {0:?}")]
    NotFound(String),
    /// The record violates a structural invariant.
    #[error("invalid button: {0}")]
    Invalid(&'static str),
    /// The action string failed validation.
    #[error("invalid action: {0}")]
    Action(#[from] keyspec::ParseError),
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn next_id() -> String {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("mouse_{}_{}", now_millis(), n)
}

/// Validate and normalize the fields shared by create and update.
fn checked_action(action: &str) -> Result<String> {
    let action = normalize(action);
    validate_grammar(&action)?;
    Ok(action)
}

/// Mutex-guarded store over one JSON file.
pub struct ButtonStore {
    path: PathBuf,
    file: Mutex<StoreFile>,
}

impl ButtonStore {
    /// Open the store at `path`, reading existing records if present.
    ///
    /// A missing or unreadable file starts empty rather than failing; the
    /// problem is logged and the file is rewritten on the next change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = read_or_default(&path);
        debug!(path = %path.display(), buttons = file.buttons.len(), "button_store_opened");
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    /// All records, sorted by `order`.
    pub fn list(&self) -> Vec<ButtonRecord> {
        let file = self.file.lock();
        let mut buttons = file.buttons.clone();
        buttons.sort_by_key(|b| b.order);
        buttons
    }

    /// Look up one record by id.
    pub fn get(&self, id: &str) -> Option<ButtonRecord> {
        let file = self.file.lock();
        file.buttons.iter().find(|b| b.id == id).cloned()
    }

    /// Create a record. The action is normalized and validated; exactly one
    /// of `key_type` / `sequence` must be set.
    pub fn add(&self, new: NewButton) -> Result<ButtonRecord> {
        let action = checked_action(&new.action)?;
        check_trigger(new.key_type.is_some(), new.sequence.as_deref())?;
        let now = now_millis();
        let record = ButtonRecord {
            id: next_id(),
            name: new.name,
            action,
            key_type: new.key_type,
            sequence: new.sequence,
            icon: new.icon,
            order: now,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let mut file = self.file.lock();
        file.buttons.push(record.clone());
        self.persist(&mut file)?;
        Ok(record)
    }

    /// Apply a partial update to a record.
    pub fn update(&self, id: &str, patch: ButtonPatch) -> Result<ButtonRecord> {
        if patch.key_type.is_some() && patch.sequence.is_some() {
            return Err(Error::Invalid("a button cannot set both keyType and sequence"));
        }
        let mut file = self.file.lock();
        let record = file
            .buttons
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let Some(action) = &patch.action {
            record.action = checked_action(action)?;
        }
        if let Some(seq) = &patch.sequence
            && seq.is_empty()
        {
            return Err(Error::Invalid("a sequence needs at least one button"));
        }
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(icon) = patch.icon {
            record.icon = icon;
        }
        if let Some(order) = patch.order {
            record.order = order;
        }
        // Switching trigger kind replaces the other side.
        if let Some(key) = patch.key_type {
            record.key_type = Some(key);
            record.sequence = None;
        } else if let Some(seq) = patch.sequence {
            record.sequence = Some(seq);
            record.key_type = None;
        }
        record.updated_at = Some(now_millis());
        let updated = record.clone();
        self.persist(&mut file)?;
        Ok(updated)
    }

    /// Delete a record by id.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut file = self.file.lock();
        let before = file.buttons.len();
        file.buttons.retain(|b| b.id != id);
        if file.buttons.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        self.persist(&mut file)
    }

    /// Write the store file via a temp file and rename.
    fn persist(&self, file: &mut StoreFile) -> Result<()> {
        file.last_updated = now_millis();
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&*file)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn check_trigger(has_key: bool, sequence: Option<&[mousetap::ButtonKey]>) -> Result<()> {
    match (has_key, sequence) {
        (true, Some(_)) => Err(Error::Invalid("a button cannot set both keyType and sequence")),
        (false, None) => Err(Error::Invalid("a button needs a keyType or a sequence")),
        (false, Some(seq)) if seq.is_empty() => {
            Err(Error::Invalid("a sequence needs at least one button"))
        }
        _ => Ok(()),
    }
}

fn read_or_default(path: &Path) -> StoreFile {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store_file_malformed_starting_empty");
                StoreFile::default()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => StoreFile::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "store_file_unreadable_starting_empty");
            StoreFile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use mousetap::ButtonKey;

    use super::*;

    fn temp_store() -> (ButtonStore, PathBuf) {
        static N: AtomicU64 = AtomicU64::new(0);
        let path = std::env::temp_dir().join(format!(
            "button_store_test_{}_{}.json",
            std::process::id(),
            N.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_file(&path);
        (ButtonStore::open(&path), path)
    }

    fn single(key: ButtonKey, action: &str) -> NewButton {
        NewButton {
            name: "test".into(),
            action: action.into(),
            key_type: Some(key),
            sequence: None,
            icon: String::new(),
        }
    }

    #[test]
    fn add_get_update_delete_roundtrip() {
        let (store, path) = temp_store();
        let rec = store.add(single(ButtonKey::Side1, " Ctrl+C ")).expect("add");
        assert_eq!(rec.action, "ctrl+c");
        assert!(rec.id.starts_with("mouse_"));
        assert_eq!(store.get(&rec.id).expect("get").key_type, Some(ButtonKey::Side1));

        let updated = store
            .update(
                &rec.id,
                ButtonPatch {
                    action: Some("launchpad".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.action, "launchpad");

        // Reopening reads back what was written.
        let reopened = ButtonStore::open(&path);
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].action, "launchpad");

        store.delete(&rec.id).expect("delete");
        assert!(store.list().is_empty());
        assert!(matches!(store.delete(&rec.id), Err(Error::NotFound(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_actions_are_rejected() {
        let (store, path) = temp_store();
        for action in ["", "ctrl++", "1+2+3+", "ctrl+sh ift"] {
            assert!(
                matches!(store.add(single(ButtonKey::Side2, action)), Err(Error::Action(_))),
                "action {action:?} should be rejected"
            );
        }
        // Grammar-valid keywords are accepted; resolution happens at
        // execution time.
        assert!(store.add(single(ButtonKey::Side2, "launchpad")).is_ok());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn trigger_invariant_is_enforced() {
        let (store, path) = temp_store();
        let both = NewButton {
            name: String::new(),
            action: "c".into(),
            key_type: Some(ButtonKey::Side1),
            sequence: Some(vec![ButtonKey::Side1, ButtonKey::Side2]),
            icon: String::new(),
        };
        assert!(matches!(store.add(both), Err(Error::Invalid(_))));

        let neither = NewButton {
            name: String::new(),
            action: "c".into(),
            key_type: None,
            sequence: None,
            icon: String::new(),
        };
        assert!(matches!(store.add(neither), Err(Error::Invalid(_))));

        let empty = NewButton {
            name: String::new(),
            action: "c".into(),
            key_type: None,
            sequence: Some(Vec::new()),
            icon: String::new(),
        };
        assert!(matches!(store.add(empty), Err(Error::Invalid(_))));

        // A singleton sequence is legal.
        let singleton = NewButton {
            name: String::new(),
            action: "c".into(),
            key_type: None,
            sequence: Some(vec![ButtonKey::Side1]),
            icon: String::new(),
        };
        assert!(store.add(singleton).is_ok());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn patch_switches_trigger_kind() {
        let (store, path) = temp_store();
        let rec = store.add(single(ButtonKey::Side1, "c")).expect("add");
        let updated = store
            .update(
                &rec.id,
                ButtonPatch {
                    sequence: Some(vec![ButtonKey::Side1, ButtonKey::Side1]),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.key_type, None);
        assert_eq!(
            updated.sequence,
            Some(vec![ButtonKey::Side1, ButtonKey::Side1])
        );

        let back = store
            .update(
                &rec.id,
                ButtonPatch {
                    key_type: Some(ButtonKey::Middle),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(back.key_type, Some(ButtonKey::Middle));
        assert_eq!(back.sequence, None);

        let conflicting = ButtonPatch {
            key_type: Some(ButtonKey::Middle),
            sequence: Some(vec![ButtonKey::Side1, ButtonKey::Side2]),
            ..Default::default()
        };
        assert!(matches!(
            store.update(&rec.id, conflicting),
            Err(Error::Invalid(_))
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_starts_empty() {
        let (_, path) = temp_store();
        fs::write(&path, b"{not json").expect("write");
        let store = ButtonStore::open(&path);
        assert!(store.list().is_empty());
        // The store remains usable and rewrites the file on change.
        store.add(single(ButtonKey::Side1, "v")).expect("add");
        assert_eq!(ButtonStore::open(&path).list().len(), 1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn list_sorts_by_order() {
        let (store, path) = temp_store();
        let a = store.add(single(ButtonKey::Side1, "a")).expect("add");
        let b = store.add(single(ButtonKey::Side2, "b")).expect("add");
        store
            .update(
                &a.id,
                ButtonPatch {
                    order: Some(u64::MAX),
                    ..Default::default()
                },
            )
            .expect("update");
        let listed = store.list();
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
        let _ = fs::remove_file(&path);
    }
}
