//! Orchestrator protocol: wire messages, persisted descriptors and the message factory.
//!
//! ## Contents
//! - [`Message`], [`Payload`], [`ModuleData`], [`RuntimeData`]: the JSON wire model
//! - [`PersistObject`]: a scene's persisted program descriptor
//! - [`MessageFactory`]: builds every request the runtime sends

mod factory;
mod message;
mod persist;

pub use factory::{MessageFactory, RUNTIME_TYPE, RuntimeIdentity};
pub use message::{
    Action, Affinity, Channel, ChannelParams, FileType, InboundMessage, Message, ModuleData,
    MsgType, ParentRef, Payload, ResultCode, RuntimeData,
};
pub use persist::{PersistObject, ProgramAttributes};
