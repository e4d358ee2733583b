//! OS termination signals as a cleanup trigger.
//!
//! Unix listens for `SIGINT`, `SIGTERM`, `SIGQUIT` and Ctrl-C; other platforms
//! for Ctrl-C only.

#[cfg(unix)]
async fn os_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = tokio::signal::ctrl_c() => "ctrl-c",
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn os_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

/// Resolves to the signal name when `enabled` and a signal arrives; otherwise never.
///
/// A failed handler registration is logged and treated as "no signal will come".
pub(crate) async fn termination(enabled: bool) -> &'static str {
    if enabled {
        match os_signal().await {
            Ok(name) => return name,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "signal handlers unavailable; relying on token and handles"
                );
            }
        }
    }
    std::future::pending().await
}
