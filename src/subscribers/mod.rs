//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point; [`SubscriberSet`] fans events out to
//! subscribers without blocking the runtime actor; [`LogWriter`] (feature
//! `logging`) renders events through `tracing`.
//!
//! ```text
//!   Session ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                        │
//!                                            ┌───────────┼──────────┐
//!                                            ▼           ▼          ▼
//!                                        LogWriter    Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
