//! # Persisted program descriptors.
//!
//! A scene stores the programs it wants running as persisted objects:
//!
//! ```json
//! {
//!   "object_id": "38bffa0e-b3ab-4f5b-854f-b9dc6b52ec0c",
//!   "action": "create",
//!   "persist": true,
//!   "type": "program",
//!   "attributes": {
//!     "name": "arena/py/moving-box",
//!     "instantiate": "client",
//!     "filename": "box.py",
//!     "filetype": "PY",
//!     "env": ["SCENE=${scene}", "NAMESPACE=${namespace}"],
//!     "channels": []
//!   }
//! }
//! ```
//!
//! [`PersistObject`] is the typed form the [`MessageFactory`](crate::MessageFactory)
//! turns into a create-module request. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

use super::message::{Affinity, Channel, FileType, ParentRef};

/// A persisted program object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistObject {
    /// Scene-level object id; becomes the module uuid for `instantiate: "single"`.
    pub object_id: String,
    /// Program attributes.
    pub attributes: ProgramAttributes,
}

/// Launch attributes of a persisted program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramAttributes {
    /// Program name, usually `namespace/program-folder`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instantiate: Option<Affinity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Alternative to `filename`; takes precedence for non-WASM programs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileid: Option<String>,
    #[serde(default)]
    pub filetype: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    /// Explicit API list; `None` means "default for the file type".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apis: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl PersistObject {
    /// Parses a persisted object from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Creates a descriptor with the given id and attributes.
    pub fn new(object_id: impl Into<String>, attributes: ProgramAttributes) -> Self {
        Self {
            object_id: object_id.into(),
            attributes,
        }
    }

    /// Shorthand for the descriptor's affinity.
    pub fn affinity(&self) -> Option<Affinity> {
        self.attributes.instantiate
    }
}
