//! Signal handlers for cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Set `cancel` on the first SIGINT/SIGTERM, exit on the second
///
/// The driver checks the flag before starting new work, so uploads already
/// in flight finish and the reports are still written.
pub fn install_cancel_handler(cancel: Arc<AtomicBool>) {
	tokio::spawn(async move {
		let mut interrupted = false;
		loop {
			if !wait_for_signal().await {
				return;
			}
			if interrupted {
				debug!("Second interrupt, exiting immediately");
				std::process::exit(130); // 128 + SIGINT(2)
			}
			interrupted = true;
			cancel.store(true, Ordering::SeqCst);
			warn!("Interrupted: finishing in-flight uploads, press Ctrl-C again to exit now");
		}
	});
}

/// False when no handler could be installed
#[cfg(unix)]
async fn wait_for_signal() -> bool {
	use tokio::signal;

	let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
		Ok(stream) => stream,
		Err(e) => {
			warn!("Failed to setup SIGTERM handler: {}. Only Ctrl-C cancels the run.", e);
			return ctrl_c().await;
		}
	};

	tokio::select! {
		_ = sigterm.recv() => {
			debug!("Received SIGTERM");
			true
		}
		received = ctrl_c() => received,
	}
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
	ctrl_c().await
}

async fn ctrl_c() -> bool {
	match tokio::signal::ctrl_c().await {
		Ok(()) => {
			debug!("Received SIGINT");
			true
		}
		Err(e) => {
			warn!("Failed to setup Ctrl-C handler: {}. The run cannot be cancelled.", e);
			false
		}
	}
}

// vim: ts=4
