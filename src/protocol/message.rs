//! # Wire messages exchanged with the orchestrator.
//!
//! Every message is a JSON object
//! `{object_id, action: "create"|"delete", type: "req"|"resp", data}`.
//! `object_id` doubles as the correlation id: a response carries the
//! `object_id` of the request it answers.
//!
//! Outbound messages use the typed [`Payload`]; inbound messages keep their
//! `data` as raw JSON ([`InboundMessage`]) because responses carry
//! orchestrator-defined content (`{result, details}`) and may omit `action`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Delete,
}

/// Request or response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgType {
    #[serde(rename = "req")]
    Request,
    #[serde(rename = "resp")]
    Response,
}

/// Result code carried in `data.result` of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultCode {
    Ok,
    Error,
}

/// Program file type.
///
/// Types this runtime has no launch rule for are kept verbatim as
/// [`FileType::Other`]: their filename is used as given and they get no
/// default APIs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    /// WebAssembly module (`WA`), launched from the filestore.
    #[default]
    Wasm,
    /// Python program (`PY`), launched by filename.
    Python,
    Other(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::Wasm => "WA",
            FileType::Python => "PY",
            FileType::Other(s) => s,
        }
    }

    /// APIs a module of this type needs when the descriptor names none.
    pub fn default_apis(&self) -> Vec<String> {
        match self {
            FileType::Wasm => vec!["wasm:unstable".to_string()],
            FileType::Python => vec!["python:python3".to_string()],
            FileType::Other(_) => Vec::new(),
        }
    }
}

impl From<String> for FileType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "WA" => FileType::Wasm,
            "PY" => FileType::Python,
            _ => FileType::Other(s),
        }
    }
}

impl From<FileType> for String {
    fn from(t: FileType) -> Self {
        match t {
            FileType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Instantiation affinity of a persisted module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// One instance system-wide; the descriptor id is the module uuid.
    Single,
    /// One instance per client, owned and torn down by that client.
    Client,
    /// Placed by the orchestrator. Unrecognized values land here too.
    #[serde(other)]
    Multiple,
}

/// Reference to the runtime hosting a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub uuid: String,
}

/// Parameters of a channel binding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelParams {
    #[serde(default)]
    pub topic: String,
}

/// A module's I/O channel: a filesystem-like path bound to a pub/sub topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub params: ChannelParams,
}

/// Runtime description sent on register / delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeData {
    pub uuid: String,
    pub name: String,
    pub max_nmodules: u32,
    pub apis: Vec<String>,
    pub runtime_type: String,
}

/// Module description sent on create / delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleData {
    pub uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileid: Option<String>,
    pub filetype: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub apis: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
}

/// Typed `data` of an outbound message, tagged by `data.type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Runtime(RuntimeData),
    Module(ModuleData),
}

/// A request built by this runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub object_id: String,
    pub action: Action,
    #[serde(rename = "type")]
    pub kind: MsgType,
    pub data: Payload,
}

/// A message received from the bus, with untyped `data`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub object_id: String,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(rename = "type")]
    pub kind: MsgType,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    /// Serializes the message to its JSON wire form.
    pub fn to_json(&self) -> String {
        // Payload has only string keys.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Module data, if this is a module message.
    pub fn module(&self) -> Option<&ModuleData> {
        match &self.data {
            Payload::Module(m) => Some(m),
            Payload::Runtime(_) => None,
        }
    }

    /// Runtime data, if this is a runtime message.
    pub fn runtime(&self) -> Option<&RuntimeData> {
        match &self.data {
            Payload::Runtime(r) => Some(r),
            Payload::Module(_) => None,
        }
    }
}

impl InboundMessage {
    /// Parses an inbound payload.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// True for orchestrator responses.
    pub fn is_response(&self) -> bool {
        self.kind == MsgType::Response
    }

    /// `data.result`, when present and recognised.
    pub fn result(&self) -> Option<ResultCode> {
        self.data
            .get("result")
            .and_then(|r| ResultCode::deserialize(r).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_runtime_payload_shape() {
        let msg = Message {
            object_id: "id-1".into(),
            action: Action::Create,
            kind: MsgType::Request,
            data: Payload::Runtime(RuntimeData {
                uuid: "R1".into(),
                name: "rt-test".into(),
                max_nmodules: 0,
                apis: vec![],
                runtime_type: "browser".into(),
            }),
        };
        let v: Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(
            v,
            json!({
                "object_id": "id-1",
                "action": "create",
                "type": "req",
                "data": {
                    "type": "runtime",
                    "uuid": "R1",
                    "name": "rt-test",
                    "max_nmodules": 0,
                    "apis": [],
                    "runtime_type": "browser"
                }
            })
        );
    }

    #[test]
    fn test_module_payload_omits_absent_fields() {
        let data = ModuleData {
            uuid: "M1".into(),
            name: "arena/py/box".into(),
            parent: None,
            filename: "box.py".into(),
            fileid: None,
            filetype: FileType::Python,
            location: None,
            env: vec!["A=1".into()],
            args: vec![],
            channels: vec![],
            apis: FileType::Python.default_apis(),
            wait_state: None,
            memory: None,
        };
        let msg = Message {
            object_id: "id-2".into(),
            action: Action::Delete,
            kind: MsgType::Request,
            data: Payload::Module(data),
        };
        let v: Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(v["action"], "delete");
        assert_eq!(v["data"]["type"], "module");
        assert_eq!(v["data"]["filetype"], "PY");
        assert_eq!(v["data"]["apis"], json!(["python:python3"]));
        assert!(v["data"].get("parent").is_none());
        assert!(v["data"].get("memory").is_none());
    }

    #[test]
    fn test_inbound_response_result() {
        let msg = InboundMessage::parse(
            r#"{"object_id":"x","action":"create","type":"resp","data":{"result":"ok"}}"#,
        )
        .unwrap();
        assert!(msg.is_response());
        assert_eq!(msg.result(), Some(ResultCode::Ok));

        let msg = InboundMessage::parse(
            r#"{"object_id":"x","action":"create","type":"resp","data":{"result":"error","details":"nope"}}"#,
        )
        .unwrap();
        assert_eq!(msg.result(), Some(ResultCode::Error));
    }

    #[test]
    fn test_inbound_unknown_result_is_none() {
        let msg = InboundMessage::parse(
            r#"{"object_id":"x","action":"create","type":"resp","data":{}}"#,
        )
        .unwrap();
        assert_eq!(msg.result(), None);
    }

    #[test]
    fn test_inbound_response_without_action() {
        let msg =
            InboundMessage::parse(r#"{"object_id":"x","type":"resp","data":{"result":"ok"}}"#)
                .unwrap();
        assert_eq!(msg.action, None);
        assert_eq!(msg.result(), Some(ResultCode::Ok));
    }

    #[test]
    fn test_inbound_rejects_garbage() {
        assert!(InboundMessage::parse("not json").is_err());
        assert!(InboundMessage::parse(r#"{"object_id":"x"}"#).is_err());
    }
}
