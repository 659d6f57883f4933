use serde::{Deserialize, Serialize};

use mousetap::ButtonKey;

/// One persisted button mapping.
///
/// A record binds either a single button (`key_type`) or an ordered button
/// sequence (`sequence`) to an action string. Exactly one of the two is set;
/// the store enforces this on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonRecord {
    /// Stable identifier, `mouse_<millis>_<n>`.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Normalized action string (chord or system command name).
    pub action: String,
    /// Single-button trigger, mutually exclusive with `sequence`.
    #[serde(rename = "keyType", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<ButtonKey>,
    /// Sequence trigger, mutually exclusive with `key_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<ButtonKey>>,
    /// Display icon name.
    #[serde(default)]
    pub icon: String,
    /// Sort key for display; defaults to the creation timestamp.
    #[serde(default)]
    pub order: u64,
    /// Creation time, unix millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    /// Last modification time, unix millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

/// Fields for creating a record; the store fills in id and timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct NewButton {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Action string; validated and normalized by the store.
    pub action: String,
    /// Single-button trigger.
    #[serde(rename = "keyType", default)]
    pub key_type: Option<ButtonKey>,
    /// Sequence trigger.
    #[serde(default)]
    pub sequence: Option<Vec<ButtonKey>>,
    /// Display icon name.
    #[serde(default)]
    pub icon: String,
}

/// Partial update applied to an existing record.
///
/// Setting `key_type` clears any stored sequence and vice versa; a patch
/// that sets both is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ButtonPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New action string.
    #[serde(default)]
    pub action: Option<String>,
    /// New single-button trigger.
    #[serde(rename = "keyType", default)]
    pub key_type: Option<ButtonKey>,
    /// New sequence trigger.
    #[serde(default)]
    pub sequence: Option<Vec<ButtonKey>>,
    /// New icon name.
    #[serde(default)]
    pub icon: Option<String>,
    /// New sort key.
    #[serde(default)]
    pub order: Option<u64>,
}

/// On-disk layout of the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFile {
    /// Format version.
    pub version: String,
    /// All records, in insertion order.
    #[serde(default)]
    pub buttons: Vec<ButtonRecord>,
    /// Last write time, unix millis.
    #[serde(default)]
    pub last_updated: u64,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
            buttons: Vec::new(),
            last_updated: 0,
        }
    }
}
