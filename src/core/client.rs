//! # RuntimeClient: the runtime actor.
//!
//! [`RuntimeClient::run`] connects the transport, registers the runtime and then
//! serves one event at a time until termination.
//!
//! ## Event loop
//! ```text
//! run()
//!   ├─► spawn subscriber listener (Bus ─► SubscriberSet)
//!   ├─► Session::init()  ── connect failure ──► Err(Connect)
//!   └─► loop select! {
//!         token cancelled            ─► cleanup(owned) ─► Ok
//!         OS signal (opt-in)         ─► cleanup(owned) ─► Ok
//!         command                    ─► create / restart / reload / shutdown
//!         all handles dropped        ─► cleanup(owned) ─► Ok
//!         inbound message            ─► Session::on_inbound()
//!         inbound channel closed     ─► Err(TransportClosed)
//!         retry deadline             ─► Session::on_retry_due()
//!         reload deadline            ─► Session::on_reload_due()
//!       }
//! ```
//!
//! ## Rules
//! - Handlers run to completion one at a time; session state has a single owner.
//! - Deadlines are plain `Option<Instant>` values; clearing one cancels it.
//! - Events published before `run` returns are delivered to subscribers before it returns.

use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

use super::handle::Command;
use super::session::Session;
use super::shutdown;

/// Drives one runtime session. Built by [`RuntimeBuilder`](crate::RuntimeBuilder).
pub struct RuntimeClient {
    pub(crate) session: Session,
    pub(crate) commands: mpsc::Receiver<Command>,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
    pub(crate) bus: Bus,
    pub(crate) token: CancellationToken,
    pub(crate) inbound_capacity: usize,
    pub(crate) handle_signals: bool,
}

impl RuntimeClient {
    /// Runs the session to completion.
    ///
    /// Returns `Ok(())` after a cleanup triggered by cancellation, a shutdown
    /// command, a signal or the last handle being dropped.
    ///
    /// # Errors
    /// - [`RuntimeError::Connect`] if the transport refuses the connection (no retry).
    /// - [`RuntimeError::TransportClosed`] if the transport drops the inbound channel.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let RuntimeClient {
            mut session,
            mut commands,
            subscribers,
            bus,
            token,
            inbound_capacity,
            handle_signals,
        } = self;

        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let done = CancellationToken::new();
        let listener = subscriber_listener(&bus, Arc::clone(&subs), done.clone());

        let (inbound_tx, mut inbound) = mpsc::channel(inbound_capacity);
        let result = match session.init(inbound_tx).await {
            Err(e) => Err(e),
            Ok(()) => {
                let mut signal = std::pin::pin!(shutdown::termination(handle_signals));
                loop {
                    tokio::select! {
                        _ = token.cancelled() => {
                            stop(&mut session, &bus, "cancelled", false).await;
                            break Ok(());
                        }
                        name = &mut signal => {
                            stop(&mut session, &bus, name, false).await;
                            break Ok(());
                        }
                        cmd = commands.recv() => match cmd {
                            Some(Command::CreateModule { descriptor, vars }) => {
                                session.create_module_from_persist(descriptor, vars).await;
                            }
                            Some(Command::Restart { all }) => session.restart(all).await,
                            Some(Command::Reload { all }) => session.reload(all).await,
                            Some(Command::Shutdown { all }) => {
                                stop(&mut session, &bus, "shutdown command", all).await;
                                break Ok(());
                            }
                            None => {
                                stop(&mut session, &bus, "handles dropped", false).await;
                                break Ok(());
                            }
                        },
                        msg = inbound.recv() => match msg {
                            Some(msg) => session.on_inbound(msg).await,
                            None => {
                                bus.publish(Event::new(EventKind::TransportClosed));
                                break Err(RuntimeError::TransportClosed);
                            }
                        },
                        _ = deadline(session.retry_deadline()) => session.on_retry_due().await,
                        _ = deadline(session.reload_deadline()) => session.on_reload_due().await,
                    }
                }
            }
        };

        drop(session);
        done.cancel();
        let _ = listener.await;
        if let Ok(set) = Arc::try_unwrap(subs) {
            set.shutdown().await;
        }
        result
    }
}

async fn stop(session: &mut Session, bus: &Bus, reason: &'static str, all: bool) {
    bus.publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
    session.cleanup(all).await;
}

/// Sleeps until `at`, or forever when there is no deadline.
async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Forwards bus events to the subscriber set until `done`, then drains what is
/// already buffered.
fn subscriber_listener(
    bus: &Bus,
    set: Arc<SubscriberSet>,
    done: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = done.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
            }
        }
    })
}
