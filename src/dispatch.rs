//! Debounced dispatch of query states
//!
//! A `DebouncedDispatcher` coalesces bursts of submissions into one outbound
//! call. Debounced submissions restart a trailing-edge timer; when it expires
//! the latest submitted state is handed to the sink. Immediate submissions
//! cancel the timer and reach the sink synchronously.
//!
//! Every dispatch carries a `RequestToken` from a monotonically increasing
//! counter, so callers can discard responses that are no longer current.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Identifies one outbound dispatch; later dispatches carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared token counter
#[derive(Debug, Clone, Default)]
pub struct RequestTokens(Arc<AtomicU64>);

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn issue(&self) -> RequestToken {
        RequestToken(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued token, if any.
    pub fn latest(&self) -> Option<RequestToken> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }

    /// True if no dispatch has been issued after `token`.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest() == Some(token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Wait for the quiescence window to pass without new submissions
    Debounced,
    /// Cancel any pending timer and dispatch now
    Immediate,
}

/// One outbound call handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<S> {
    pub token: RequestToken,
    pub state: S,
    pub mode: DispatchMode,
}

/// Receiver of dispatches. Called without any dispatcher lock held.
pub type DispatchSink<S> = Arc<dyn Fn(Dispatch<S>) + Send + Sync>;

struct Pending<S> {
    state: S,
    timer: JoinHandle<()>,
}

struct Inner<S> {
    pending: Option<Pending<S>>,
    /// Bumped on every submission so a superseded timer can tell it lost
    generation: u64,
    closed: bool,
}

struct Shared<S> {
    inner: Mutex<Inner<S>>,
    sink: DispatchSink<S>,
    tokens: RequestTokens,
}

impl<S> Shared<S> {
    fn fire(&self, state: S, mode: DispatchMode) -> RequestToken {
        let token = self.tokens.issue();
        tracing::debug!(%token, ?mode, "dispatching query");
        (self.sink)(Dispatch { token, state, mode });
        token
    }

    fn fire_if_current(&self, generation: u64) {
        let state = {
            let mut inner = self.inner.lock();
            if inner.closed || inner.generation != generation {
                return;
            }
            match inner.pending.take() {
                Some(pending) => pending.state,
                None => return,
            }
        };
        self.fire(state, DispatchMode::Debounced);
    }
}

/// Trailing-edge debouncer with an immediate bypass
///
/// Debounced submissions spawn a timer on the current tokio runtime.
/// Dropping the dispatcher tears it down.
pub struct DebouncedDispatcher<S> {
    window: Duration,
    shared: Arc<Shared<S>>,
}

impl<S: Send + 'static> DebouncedDispatcher<S> {
    pub fn new(window: Duration, sink: DispatchSink<S>) -> Self {
        Self::with_tokens(window, RequestTokens::new(), sink)
    }

    /// Create a dispatcher issuing tokens from a counter the caller shares.
    pub fn with_tokens(window: Duration, tokens: RequestTokens, sink: DispatchSink<S>) -> Self {
        Self {
            window,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    pending: None,
                    generation: 0,
                    closed: false,
                }),
                sink,
                tokens,
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tokens(&self) -> &RequestTokens {
        &self.shared.tokens
    }

    /// Submit a state. Returns the token when the dispatch happened
    /// synchronously (immediate mode); `None` when it was deferred or the
    /// dispatcher is torn down.
    pub fn submit(&self, state: S, mode: DispatchMode) -> Option<RequestToken> {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            tracing::debug!("ignoring submission after teardown");
            return None;
        }
        inner.generation += 1;
        if let Some(pending) = inner.pending.take() {
            pending.timer.abort();
        }

        match mode {
            DispatchMode::Immediate => {
                drop(inner);
                Some(self.shared.fire(state, DispatchMode::Immediate))
            }
            DispatchMode::Debounced => {
                let generation = inner.generation;
                let weak: Weak<Shared<S>> = Arc::downgrade(&self.shared);
                // The window counts from submission, not from the timer's first poll
                let deadline = tokio::time::Instant::now() + self.window;
                let timer = tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.fire_if_current(generation);
                    }
                });
                inner.pending = Some(Pending { state, timer });
                None
            }
        }
    }

    /// Whether a debounced state is waiting for its window to pass.
    pub fn has_pending(&self) -> bool {
        self.shared.inner.lock().pending.is_some()
    }

    /// Dispatch the pending state now, if there is one.
    pub fn flush(&self) -> Option<RequestToken> {
        let state = {
            let mut inner = self.shared.inner.lock();
            if inner.closed {
                return None;
            }
            let pending = inner.pending.take()?;
            inner.generation += 1;
            pending.timer.abort();
            pending.state
        };
        Some(self.shared.fire(state, DispatchMode::Immediate))
    }

    /// Cancel any pending timer; nothing is dispatched afterwards.
    pub fn teardown(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        if let Some(pending) = inner.pending.take() {
            pending.timer.abort();
            tracing::debug!("cancelled pending dispatch on teardown");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.inner.lock().closed
    }
}

impl<S> Drop for DebouncedDispatcher<S> {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.closed = true;
        if let Some(pending) = inner.pending.take() {
            pending.timer.abort();
        }
    }
}
