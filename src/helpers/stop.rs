use log::info;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Turns the usual termination signals into a [CancellationToken], so that long-running loops
/// (e.g. a sweep over many nodes) can wind down between two units of work.
pub struct SignalHandler {
    tok: CancellationToken,
}

pub fn new() -> SignalHandler {
    SignalHandler {
        tok: CancellationToken::new(),
    }
}

impl SignalHandler {
    pub fn subscribe_stop(&self) -> CancellationToken {
        self.tok.clone()
    }

    /// Must be spawned on a runtime with signal handling enabled.
    /// If a signal stream cannot be registered, the token is cancelled right away.
    pub async fn wait_for_signal(self) {
        let streams = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        );
        let (mut sigterm, mut sigint, mut sighup) = match streams {
            (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
            _ => {
                log::error!("Unable to register signal handlers; stopping...");
                self.tok.cancel();
                return;
            }
        };

        select! {
            _ = sigterm.recv() => info!("Terminated; stopping..."),
            _ = sigint.recv() => info!("Interrupted; stopping..."),
            _ = sighup.recv() => info!("Hangup received; stopping..."), // used by tmux apparently
            _ = self.tok.cancelled() => {},
        }
        self.tok.cancel();
    }
}
