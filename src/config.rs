//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for a runtime client.
//!
//! Config is used in two ways:
//! 1. **Client creation**: `RuntimeBuilder::new(config, transport)`
//! 2. **Topic layout**: [`Config::reg_topic`], [`Config::ctl_topic`], [`Config::dbg_topic`]
//!
//! ## Sentinel values
//! - `uuid = None` → a v4 uuid is generated once, at build time
//! - `name = None` → `rt-<random>` is generated once, at build time
//! - `topics.* = None` → derived from `realm`
//! - capacities of `0` are clamped to 1

use std::time::Duration;

use uuid::Uuid;

/// Explicit topic bases; `None` falls back to the realm layout.
///
/// `ctl` and `dbg` are bases: the runtime uuid is appended as the last level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicOverrides {
    /// Registration request/response topic (default `{realm}/proc/reg`).
    pub reg: Option<String>,
    /// Control topic base (default `{realm}/proc/control`).
    pub ctl: Option<String>,
    /// Debug/stdio topic base (default `{realm}/proc/debug`).
    pub dbg: Option<String>,
}

/// Configuration of one runtime client.
///
/// ## Field semantics
/// - `reg_interval`: fixed delay between registration attempts (no backoff, no cap)
/// - `reload_delay`: wait between deleting and re-creating modules on reload
/// - `page_url`: URL (or bare query string) whose parameters feed module templates
/// - `handle_signals`: run cleanup on SIGINT/SIGTERM/SIGQUIT/Ctrl-C
///
/// ## Notes
/// All fields are public. Prefer the accessors, which apply the sentinel rules.
#[derive(Clone, Debug)]
pub struct Config {
    /// Broker address handed to the transport.
    pub host: String,
    pub username: String,
    pub token: String,

    /// Deployment namespace; first level of every topic.
    pub realm: String,

    /// Runtime uuid; generated when `None`.
    pub uuid: Option<Uuid>,
    /// Runtime display name; generated when `None`.
    pub name: Option<String>,
    /// Maximum concurrent modules announced to the orchestrator.
    pub max_nmodules: u32,
    /// APIs this runtime supports.
    pub apis: Vec<String>,

    pub topics: TopicOverrides,

    /// Delay before re-sending an unanswered registration.
    pub reg_interval: Duration,
    /// Delay between cleanup and restart during a reload.
    pub reload_delay: Duration,

    /// Filestore base for WASM program files.
    pub filestore: String,
    /// Page URL or query string providing template variables.
    pub page_url: Option<String>,

    /// Ask the transport to reconnect by itself.
    pub reconnect: bool,

    /// Event bus ring buffer size.
    pub bus_capacity: usize,
    /// Command queue size of the runtime actor.
    pub command_capacity: usize,
    /// Inbound message queue size between transport and actor.
    pub inbound_capacity: usize,

    /// Run cleanup when the process receives a termination signal.
    pub handle_signals: bool,
}

impl Config {
    /// Registration topic.
    pub fn reg_topic(&self) -> String {
        self.topics
            .reg
            .clone()
            .unwrap_or_else(|| format!("{}/proc/reg", self.realm))
    }

    /// Control topic scoped to `runtime_uuid`.
    pub fn ctl_topic(&self, runtime_uuid: &str) -> String {
        let base = self
            .topics
            .ctl
            .clone()
            .unwrap_or_else(|| format!("{}/proc/control", self.realm));
        format!("{base}/{runtime_uuid}")
    }

    /// Debug/stdio topic scoped to `runtime_uuid`.
    pub fn dbg_topic(&self, runtime_uuid: &str) -> String {
        let base = self
            .topics
            .dbg
            .clone()
            .unwrap_or_else(|| format!("{}/proc/debug", self.realm));
        format!("{base}/{runtime_uuid}")
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Command queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Inbound queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn inbound_capacity_clamped(&self) -> usize {
        self.inbound_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `host = wss://arenaxr.org/mqtt/`, credentials `noauth`
    /// - `realm = "realm"`
    /// - `max_nmodules = 0`, no APIs (this runtime does not execute modules)
    /// - `reg_interval = 5s`, `reload_delay = 1s`
    /// - `filestore = /store/users/`
    /// - `bus_capacity = 1024`, `command_capacity = 64`, `inbound_capacity = 256`
    fn default() -> Self {
        Self {
            host: "wss://arenaxr.org/mqtt/".to_string(),
            username: "noauth".to_string(),
            token: "noauth".to_string(),
            realm: "realm".to_string(),
            uuid: None,
            name: None,
            max_nmodules: 0,
            apis: Vec::new(),
            topics: TopicOverrides::default(),
            reg_interval: Duration::from_secs(5),
            reload_delay: Duration::from_secs(1),
            filestore: "/store/users/".to_string(),
            page_url: None,
            reconnect: true,
            bus_capacity: 1024,
            command_capacity: 64,
            inbound_capacity: 256,
            handle_signals: false,
        }
    }
}
