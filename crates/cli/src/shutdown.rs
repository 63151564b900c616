use std::sync::{Arc, OnceLock};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

/// Presses the console's stop button when the process receives SIGINT or
/// SIGTERM, by cancelling the token every simulation task watches.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    received: Arc<OnceLock<StopSignal>>,
}

impl ShutdownCoordinator {
    pub fn install(token: CancellationToken) -> Self {
        let coordinator = Self {
            token,
            received: Arc::new(OnceLock::new()),
        };

        let token = coordinator.token.clone();
        let received = coordinator.received.clone();
        tokio::spawn(async move {
            let signal = tokio::select! {
                signal = next_signal() => signal,
                _ = token.cancelled() => return,
            };
            info!(?signal, "Stop requested, finishing the current step");
            let _ = received.set(signal);
            token.cancel();
        });

        coordinator
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn received(&self) -> Option<StopSignal> {
        self.received.get().copied()
    }

    /// Exit status for the process once the command has returned.
    pub fn exit_code(&self, failed: bool) -> ExitCode {
        match (self.received(), failed) {
            (Some(StopSignal::Interrupt), _) => ExitCode::Interrupted,
            (Some(StopSignal::Terminate), _) => ExitCode::Terminated,
            (None, true) => ExitCode::Failure,
            (None, false) => ExitCode::Success,
        }
    }
}

async fn next_signal() -> StopSignal {
    let interrupt = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => StopSignal::Interrupt,
        _ = terminate => StopSignal::Terminate,
    }
}

/// 128 + signal number for signal exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
    Interrupted = 130,
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_code_without_signal() {
        let coordinator = ShutdownCoordinator::install(CancellationToken::new());
        assert_eq!(coordinator.received(), None);
        assert_eq!(coordinator.exit_code(false), ExitCode::Success);
        assert_eq!(coordinator.exit_code(true).as_i32(), 1);
        coordinator.token().cancel();
    }

    #[tokio::test]
    async fn signal_wins_over_failure() {
        let coordinator = ShutdownCoordinator::install(CancellationToken::new());
        let _ = coordinator.received.set(StopSignal::Terminate);
        assert_eq!(coordinator.exit_code(true), ExitCode::Terminated);
        coordinator.token().cancel();
    }
}
