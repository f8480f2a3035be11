//! Polling waits.
//!
//! Every interaction in the suite goes through [`PollingWait::until`]: probe
//! the live tree, evaluate a [`Condition`], return as soon as it holds, sleep a
//! fixed poll interval otherwise, give up once the timeout has elapsed.
//!
//! The wait never raises on timeout. It returns a [`WaitOutcome`] and the
//! caller decides what a miss means: page operations that need the element
//! call [`WaitOutcome::into_result`], advisory probes call
//! [`WaitOutcome::unwrap_or_default`].

use crate::condition::{Condition, Probe};
use crate::driver::Driver;
use crate::result::{SuiteError, SuiteResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for primary interactions (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Timeout for advisory visibility probes (2 seconds)
pub const SHORT_WAIT_TIMEOUT_MS: u64 = 2_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// OBSERVED STATE
// =============================================================================

/// What the most recent probe of a condition saw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservedState {
    /// The locator matched nothing
    NotLocated,
    /// Located, but not displayed
    Hidden,
    /// Located and displayed, but disabled or covered by another element
    NotInteractable,
    /// Located, but the condition's own predicate did not hold
    Unsatisfied,
    /// The matched element went stale mid-probe
    Stale,
}

impl ObservedState {
    /// Short description used in error messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotLocated => "not located",
            Self::Hidden => "hidden",
            Self::NotInteractable => "not interactable",
            Self::Unsatisfied => "unsatisfied",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for ObservedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for short advisory probes
    #[must_use]
    pub const fn short() -> Self {
        Self {
            timeout_ms: SHORT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// Result of a polling wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The condition held
    Satisfied {
        /// Value produced by the condition
        value: T,
        /// Time spent waiting
        elapsed: Duration,
    },
    /// The timeout elapsed first
    TimedOut {
        /// Description of the condition
        waited_for: String,
        /// Locator the condition was evaluated against, if any
        locator: Option<String>,
        /// Time spent waiting
        elapsed: Duration,
        /// What the last probe observed
        last_state: ObservedState,
    },
}

impl<T> WaitOutcome<T> {
    /// Whether the condition held
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Time spent waiting
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// The satisfied value, discarding timeout details
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Satisfied { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// The satisfied value or `default`
    pub fn unwrap_or(self, default: T) -> T {
        self.ok().unwrap_or(default)
    }

    /// Transform the satisfied value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WaitOutcome<U> {
        match self {
            Self::Satisfied { value, elapsed } => WaitOutcome::Satisfied {
                value: f(value),
                elapsed,
            },
            Self::TimedOut {
                waited_for,
                locator,
                elapsed,
                last_state,
            } => WaitOutcome::TimedOut {
                waited_for,
                locator,
                elapsed,
                last_state,
            },
        }
    }

    /// The satisfied value, or the error describing why it never arrived.
    ///
    /// A wait that never located anything is [`SuiteError::ElementNotFound`];
    /// one that located its element but never saw the wanted state is
    /// [`SuiteError::Timeout`].
    pub fn into_result(self) -> SuiteResult<T> {
        match self {
            Self::Satisfied { value, .. } => Ok(value),
            Self::TimedOut {
                waited_for,
                locator,
                elapsed,
                last_state,
            } => {
                let elapsed_ms = elapsed.as_millis() as u64;
                match (last_state, locator) {
                    (ObservedState::NotLocated, Some(locator)) => {
                        Err(SuiteError::ElementNotFound {
                            locator,
                            elapsed_ms,
                        })
                    }
                    _ => Err(SuiteError::Timeout {
                        waited_for,
                        elapsed_ms,
                        last_state,
                    }),
                }
            }
        }
    }
}

impl<T: Default> WaitOutcome<T> {
    /// The satisfied value or `T::default()`
    pub fn unwrap_or_default(self) -> T {
        self.ok().unwrap_or_default()
    }
}

// =============================================================================
// POLLING WAIT
// =============================================================================

/// Bounded retry loop resolving a [`Condition`] against a driver
#[derive(Clone, Copy)]
pub struct PollingWait<'a> {
    driver: &'a dyn Driver,
    options: WaitOptions,
}

impl fmt::Debug for PollingWait<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingWait")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> PollingWait<'a> {
    /// Create a wait over `driver`
    #[must_use]
    pub fn new(driver: &'a dyn Driver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// The options this wait runs with
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Same driver, different options
    #[must_use]
    pub const fn with_options(self, options: WaitOptions) -> Self {
        Self {
            driver: self.driver,
            options,
        }
    }

    /// Poll `condition` until it holds or the timeout elapses.
    ///
    /// The condition is probed at least once, even with a zero timeout.
    /// Transient driver errors (stale handles, lookups racing a re-render)
    /// count as "not yet"; any other driver error aborts the wait.
    pub async fn until<C: Condition>(&self, condition: &C) -> SuiteResult<WaitOutcome<C::Output>> {
        let start = Instant::now();
        let timeout = self.options.timeout();
        let poll_interval = self.options.poll_interval();
        let mut attempts: u32 = 0;

        debug!(
            condition = %condition.description(),
            timeout_ms = self.options.timeout_ms,
            "waiting"
        );

        loop {
            attempts += 1;
            let last_state = match condition.probe(self.driver).await {
                Ok(Probe::Satisfied(value)) => {
                    let elapsed = start.elapsed();
                    debug!(
                        condition = %condition.description(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        attempts,
                        "condition satisfied"
                    );
                    return Ok(WaitOutcome::Satisfied { value, elapsed });
                }
                Ok(Probe::Pending(state)) => state,
                Err(err) if err.is_transient() => match err {
                    SuiteError::StaleElement { .. } => ObservedState::Stale,
                    _ => ObservedState::NotLocated,
                },
                Err(err) => return Err(err),
            };
            trace!(condition = %condition.description(), state = %last_state, attempts, "probe pending");

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(
                    condition = %condition.description(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    state = %last_state,
                    attempts,
                    "wait timed out"
                );
                return Ok(WaitOutcome::TimedOut {
                    waited_for: condition.description(),
                    locator: condition.locator().map(ToString::to_string),
                    elapsed,
                    last_state,
                });
            }

            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
