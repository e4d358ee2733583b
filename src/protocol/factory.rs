//! # Message factory: builds every request the runtime sends.
//!
//! All requests share a base `{object_id: <fresh uuid>, action, type: "req"}`;
//! [`MessageFactory::request`] is the single builder, parameterized by action,
//! behind the create/delete pairs for runtimes and modules.
//!
//! ## Module creation from a persisted descriptor
//! ```text
//! PersistObject + extra vars
//!     ├─► pick module uuid (affinity: single → object_id, else fresh)
//!     ├─► variables = {runtimeid, moduleid} < query < extra
//!     ├─► resolve ${..} in args, env, channel path/topic
//!     ├─► parent: client → this runtime, else descriptor parent (usually none)
//!     ├─► filename: WA → filestore/name/filename, else file|filename
//!     └─► apis: explicit list or file-type default
//! ```

use rand::Rng;
use uuid::Uuid;

use crate::error::FactoryError;
use crate::template::{Variables, resolve};

use super::message::{
    Action, Affinity, Channel, FileType, Message, ModuleData, MsgType, ParentRef, Payload,
    RuntimeData,
};
use super::persist::PersistObject;

/// Runtime type announced to the orchestrator.
pub const RUNTIME_TYPE: &str = "browser";

/// Identity of this runtime as announced to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeIdentity {
    /// Stable for the process lifetime.
    pub uuid: String,
    pub name: String,
    pub max_nmodules: u32,
    pub apis: Vec<String>,
}

impl RuntimeIdentity {
    /// Creates an identity, generating the uuid and name when absent.
    pub fn new(
        uuid: Option<Uuid>,
        name: Option<String>,
        max_nmodules: u32,
        apis: Vec<String>,
    ) -> Self {
        Self {
            uuid: uuid.unwrap_or_else(Uuid::new_v4).to_string(),
            name: name.unwrap_or_else(random_runtime_name),
            max_nmodules,
            apis,
        }
    }
}

/// Builds protocol messages for one runtime.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    runtime: RuntimeIdentity,
    filestore: String,
    query: Variables,
}

impl MessageFactory {
    /// Creates a factory for `runtime`.
    ///
    /// - `filestore`: base location of WASM program files.
    /// - `query`: page query-string variables, above the built-ins and below
    ///   caller variables.
    pub fn new(runtime: RuntimeIdentity, filestore: impl Into<String>, query: Variables) -> Self {
        Self {
            runtime,
            filestore: filestore.into(),
            query,
        }
    }

    /// The runtime this factory speaks for.
    pub fn runtime(&self) -> &RuntimeIdentity {
        &self.runtime
    }

    /// Base request with a fresh correlation id.
    fn request(&self, action: Action, data: Payload) -> Message {
        Message {
            object_id: Uuid::new_v4().to_string(),
            action,
            kind: MsgType::Request,
            data,
        }
    }

    fn runtime_message(&self, action: Action) -> Message {
        let data = RuntimeData {
            uuid: self.runtime.uuid.clone(),
            name: self.runtime.name.clone(),
            max_nmodules: self.runtime.max_nmodules,
            apis: self.runtime.apis.clone(),
            runtime_type: RUNTIME_TYPE.to_string(),
        };
        self.request(action, Payload::Runtime(data))
    }

    /// Register-runtime request.
    pub fn register_runtime(&self) -> Message {
        self.runtime_message(Action::Create)
    }

    /// Delete-runtime request (also the last-will payload).
    pub fn delete_runtime(&self) -> Message {
        self.runtime_message(Action::Delete)
    }

    /// Create-module request for `data`.
    pub fn create_module(&self, data: ModuleData) -> Message {
        self.request(Action::Create, Payload::Module(data))
    }

    /// Delete-module request for a module previously created with `data`.
    pub fn delete_module(&self, data: &ModuleData) -> Message {
        self.request(Action::Delete, Payload::Module(data.clone()))
    }

    /// Builds a create-module request from a persisted descriptor.
    ///
    /// `runtimeid` and `moduleid` default to this runtime and the chosen
    /// module uuid; page query variables override them and `extra` overrides
    /// both.
    ///
    /// # Errors
    /// [`FactoryError::InvalidSingleId`] when the descriptor asks for
    /// `instantiate: "single"` but its `object_id` is not a hyphenated UUID.
    pub fn module_from_persist(
        &self,
        obj: &PersistObject,
        extra: &Variables,
    ) -> Result<Message, FactoryError> {
        let attrs = &obj.attributes;
        let affinity = attrs.instantiate;

        let uuid = match affinity {
            Some(Affinity::Single) => {
                if !is_hyphenated_uuid(&obj.object_id) {
                    return Err(FactoryError::InvalidSingleId {
                        object_id: obj.object_id.clone(),
                    });
                }
                obj.object_id.clone()
            }
            Some(Affinity::Client | Affinity::Multiple) | None => Uuid::new_v4().to_string(),
        };

        let builtins = Variables::from_pairs([
            ("runtimeid", self.runtime.uuid.as_str()),
            ("moduleid", uuid.as_str()),
        ]);
        let vars = builtins.overlay(&self.query).overlay(extra);

        let args = attrs.args.iter().map(|a| resolve(a, &vars)).collect();
        let env = attrs.env.iter().map(|e| resolve(e, &vars)).collect();
        let channels = attrs
            .channels
            .iter()
            .map(|ch| resolve_channel(ch, &vars))
            .collect();

        let parent = match affinity {
            Some(Affinity::Client) => Some(ParentRef {
                uuid: self.runtime.uuid.clone(),
            }),
            _ => attrs.parent.clone(),
        };

        let filename = match attrs.filetype {
            FileType::Wasm => {
                let entry = attrs
                    .filename
                    .as_deref()
                    .or(attrs.file.as_deref())
                    .unwrap_or_default();
                collapse_slashes(&[self.filestore.as_str(), attrs.name.as_str(), entry].join("/"))
            }
            FileType::Python | FileType::Other(_) => attrs
                .file
                .clone()
                .or_else(|| attrs.filename.clone())
                .unwrap_or_default(),
        };

        let apis = attrs
            .apis
            .clone()
            .unwrap_or_else(|| attrs.filetype.default_apis());

        let data = ModuleData {
            uuid,
            name: attrs.name.clone(),
            parent,
            filename,
            fileid: attrs.fileid.clone(),
            filetype: attrs.filetype.clone(),
            location: attrs.location.clone(),
            env,
            args,
            channels,
            apis,
            wait_state: None,
            memory: None,
        };
        Ok(self.create_module(data))
    }
}

fn resolve_channel(ch: &Channel, vars: &Variables) -> Channel {
    let mut out = ch.clone();
    out.path = resolve(&ch.path, vars);
    out.params.topic = resolve(&ch.params.topic, vars);
    out
}

/// `8-4-4-4-12` hex form only; braced, urn and simple forms are refused.
fn is_hyphenated_uuid(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

/// Collapses runs of `/` into one, except a run that directly follows `:`
/// (scheme separators) or starts the string.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev: Option<char> = None;
    let mut collapse = false;

    for c in path.chars() {
        if c == '/' {
            if prev == Some('/') {
                if collapse {
                    continue;
                }
            } else {
                collapse = matches!(prev, Some(p) if p != ':');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn random_runtime_name() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..10)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("rt-{suffix}")
}
