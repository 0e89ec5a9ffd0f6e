//! # Process termination signals.
//!
//! [`wait_for_shutdown_signal`] resolves when the process is asked to stop. The
//! `qcvisor` binary passes it to axum's graceful shutdown and then calls
//! [`Hub::shutdown`](crate::Hub::shutdown).
//!
//! Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`. Elsewhere: Ctrl-C.

/// Resolves on the first termination signal.
///
/// Fails only if a signal handler cannot be installed.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = term.recv() => {},
            _ = quit.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
