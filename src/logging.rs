//! Subscriber set-up and the error counter reported in telemetry.
//!
//! Critical conditions are logged at error level with a `critical = true`
//! field; they are counted like any other error.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Shared count of error-level events.
#[derive(Debug, Clone, Default)]
pub struct ErrorCounter(Arc<AtomicU32>);

impl ErrorCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Layer feeding this counter.
    pub fn layer(&self) -> ErrorCountLayer {
        ErrorCountLayer {
            counter: self.clone(),
        }
    }
}

/// Counts every error-level event it sees.
#[derive(Debug, Clone)]
pub struct ErrorCountLayer {
    counter: ErrorCounter,
}

impl<S: Subscriber> Layer<S> for ErrorCountLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.counter.record();
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `default_filter`. If a subscriber is already
/// installed the existing one is kept and the returned counter stays at zero.
pub fn init(default_filter: &str) -> ErrorCounter {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let counter = ErrorCounter::new();

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .with(counter.layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    counter
}
