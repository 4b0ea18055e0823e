use crate::protocol::{ClientMessage, ServerEvent, SessionSetup};
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use voxlink_core::{TransportError, VoxlinkResult};

/// Injectable sleep, so retry tests can record delays instead of waiting.
type SleepFn = Box<dyn Fn(u64) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Outbound half of an open connection.
///
/// Sends are fire-and-forget from the engine's point of view: failures
/// are logged by the caller, never escalated from a capture callback.
#[async_trait]
pub trait OutboundSink: Send + Sync {
    /// Send one message over the open session.
    async fn send(&self, message: ClientMessage) -> VoxlinkResult<()>;
    /// Close the connection. Best-effort.
    async fn close(&self) -> VoxlinkResult<()>;
}

/// An established bidirectional session.
pub struct LiveConnection {
    /// Outbound message sink.
    pub sender: Arc<dyn OutboundSink>,
    /// Inbound server events, already demuxed from the wire envelope.
    pub events: mpsc::Receiver<ServerEvent>,
}

impl std::fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConnection").finish_non_exhaustive()
    }
}

/// The connection factory boundary. Implemented by [`crate::ws::WsTransport`]
/// in production and by scripted mocks in tests.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open one connection with the given setup payload.
    async fn connect(&self, setup: &SessionSetup) -> Result<LiveConnection, TransportError>;
}

/// Bounds for the connect-phase retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub max_attempts: u32,
    /// Base delay in milliseconds; attempt `n` waits `base * n + jitter`.
    pub base_delay_ms: u64,
    /// Upper bound of the random jitter added to each delay.
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_jitter_ms: 250,
        }
    }
}

/// Attempt counter and last failure for one connect phase.
///
/// Lives only for the duration of a single `start()` call; a successful
/// open discards it.
#[derive(Debug)]
pub struct RetryState {
    /// Attempts made so far.
    pub attempt: u32,
    /// The most recent failure.
    pub last_error: Option<TransportError>,
}

/// Connect loop with bounded linear backoff.
///
/// Retriable failures (per [`TransportError::is_retriable`]) are retried
/// up to the policy ceiling; non-retriable failures surface immediately.
pub struct Connector {
    policy: RetryPolicy,
    sleep_fn: Option<SleepFn>,
}

impl Connector {
    /// Creates a connector with the given retry bounds.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleep_fn: None,
        }
    }

    /// Replaces the real sleep with a recording stub. Test hook.
    pub fn with_sleep_fn(mut self, sleep_fn: SleepFn) -> Self {
        self.sleep_fn = Some(sleep_fn);
        self
    }

    async fn do_sleep(&self, ms: u64) {
        if let Some(f) = &self.sleep_fn {
            f(ms).await;
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }

    fn backoff_ms(&self, attempt: u32) -> u64 {
        let jitter = if self.policy.max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.policy.max_jitter_ms)
        };
        self.policy.base_delay_ms.saturating_mul(u64::from(attempt)) + jitter
    }

    /// Opens a connection, retrying transient failures.
    pub async fn connect(
        &self,
        transport: &dyn LiveTransport,
        setup: &SessionSetup,
    ) -> Result<LiveConnection, TransportError> {
        let mut state = RetryState {
            attempt: 0,
            last_error: None,
        };

        while state.attempt < self.policy.max_attempts {
            state.attempt += 1;
            match transport.connect(setup).await {
                Ok(connection) => {
                    info!(attempt = state.attempt, "session connection open");
                    return Ok(connection);
                }
                Err(e) if e.is_retriable() && state.attempt < self.policy.max_attempts => {
                    let delay = self.backoff_ms(state.attempt);
                    warn!(
                        attempt = state.attempt,
                        delay_ms = delay,
                        error = %e,
                        "retriable connection failure, backing off"
                    );
                    state.last_error = Some(e);
                    self.do_sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt = state.attempt, error = %e, "connection failed");
                    return Err(e);
                }
            }
        }

        Err(state
            .last_error
            .unwrap_or_else(|| TransportError::other("connection attempts exhausted")))
    }
}
