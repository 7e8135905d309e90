use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ImageSource;
use crate::fetcher::{ImageListFetcher, lock};

/// Single-slot quiet-period timer in front of the list fetcher.
///
/// Each change restarts the timer; only the last change of a burst reaches
/// the fetcher. The first change seen is the initial mount and is swallowed.
pub struct SearchDebouncer<S> {
    fetcher: Arc<ImageListFetcher<S>>,
    quiet: Duration,
    pending: Mutex<Option<CancellationToken>>,
    ready: AtomicBool,
}

impl<S: ImageSource> SearchDebouncer<S> {
    pub fn new(fetcher: Arc<ImageListFetcher<S>>, quiet: Duration) -> Self {
        Self {
            fetcher,
            quiet,
            pending: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    pub fn on_change(&self, text: &str, limit: u32) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            debug!("search ready");
            return;
        }

        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.pending).replace(token.clone()) {
            previous.cancel();
        }

        let fetcher = Arc::clone(&self.fetcher);
        let quiet = self.quiet;
        let search = Some(text.to_string());
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(quiet) => {
                    // Past this point a newer keystroke only restarts the
                    // timer; the fetcher itself supersedes this request.
                    let outcome = fetcher.fetch_page(0, limit, search).await;
                    debug!(?outcome, "debounced search finished");
                }
            }
        });
    }

    pub fn cancel_pending(&self) {
        if let Some(pending) = lock(&self.pending).take() {
            pending.cancel();
        }
    }
}

impl<S> Drop for SearchDebouncer<S> {
    fn drop(&mut self) {
        if let Some(pending) = lock(&self.pending).take() {
            pending.cancel();
        }
    }
}
