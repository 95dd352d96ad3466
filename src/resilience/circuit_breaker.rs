//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold within rolling window
//! Open → Half-Open: first attempt after reset timeout
//! Half-Open → Closed: trial request succeeds (failure_count reset to 0)
//! Half-Open → Open: trial request fails (reset timeout restarts)
//! ```
//!
//! # Design Decisions
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open (prevents hammering recovering backend)
//! - State lives behind one mutex held only for transitions, never across an await
//! - Admission is an RAII permit: a cancelled trial frees its slot on drop

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

/// Breaker tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Failures inside `rolling_window` that open the circuit.
    pub failure_threshold: u32,
    /// Window failures are counted over.
    pub rolling_window: Duration,
    /// Time the circuit stays open before a trial is admitted.
    pub reset_timeout: Duration,
    /// Deadline for a guarded operation, if any.
    pub operation_timeout: Option<Duration>,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            rolling_window: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
            operation_timeout: None,
        }
    }
}

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
}

/// Why the fallback ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection<E> {
    /// The circuit is open (or a trial is already in flight); the
    /// operation was not invoked.
    ShortCircuited,
    /// The operation returned an error.
    Failed(E),
    /// The operation exceeded the breaker's deadline.
    TimedOut(Duration),
}

/// Result of a guarded call: always a value, never a raw failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation succeeded.
    Completed(T),
    /// The fallback produced the value.
    Fallback(T),
}

impl<T> Outcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Completed(value) | Outcome::Fallback(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Trial,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failures: VecDeque<Instant>,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
    trial_in_flight: bool,
}

/// A three-state circuit breaker guarding one operation key.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                last_failure_time: None,
                last_state_change: Instant::now(),
                trial_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Run `operation` through the breaker, substituting `fallback` on
    /// short-circuit, error, or timeout.
    pub async fn execute<T, E, Op, Fut, Fb>(&self, operation: Op, fallback: Fb) -> Outcome<T>
    where
        Op: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Fb: FnOnce(Rejection<E>) -> T,
    {
        let Some(permit) = self.try_acquire() else {
            return Outcome::Fallback(fallback(Rejection::ShortCircuited));
        };

        let result = match self.settings.operation_timeout {
            Some(limit) => match with_deadline(limit, operation()).await {
                Ok(result) => result.map_err(Rejection::Failed),
                Err(_) => Err(Rejection::TimedOut(limit)),
            },
            None => operation().await.map_err(Rejection::Failed),
        };

        match result {
            Ok(value) => {
                permit.success();
                Outcome::Completed(value)
            }
            Err(rejection) => {
                permit.failure();
                Outcome::Fallback(fallback(rejection))
            }
        }
    }

    /// Ask for admission. `None` means the attempt must be short-circuited.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut inner = self.lock();
        let state = inner.state;
        let admission = match state {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::Open => {
                if inner.last_state_change.elapsed() >= self.settings.reset_timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.trial_in_flight = true;
                    Some(Admission::Trial)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                Some(Admission::Trial)
            }
            CircuitState::HalfOpen => None,
        };
        drop(inner);

        match admission {
            Some(admission) => Some(Permit {
                breaker: self,
                admission,
                settled: false,
            }),
            None => {
                tracing::debug!(breaker = %self.name, "Circuit open, short-circuiting attempt");
                metrics::record_breaker_rejection(&self.name);
                None
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current state and counters.
    pub fn status(&self) -> BreakerStatus {
        let mut inner = self.lock();
        if inner.state == CircuitState::Closed {
            Self::prune(&mut inner, self.settings.rolling_window);
        }
        BreakerStatus {
            state: inner.state,
            failure_count: inner.failures.len() as u32,
            last_failure_time: inner.last_failure_time,
            last_state_change: inner.last_state_change,
        }
    }

    fn on_success(&self, admission: Admission) {
        let mut inner = self.lock();
        if admission == Admission::Trial && inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
            inner.failures.clear();
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    fn on_failure(&self, admission: Admission) {
        let mut inner = self.lock();
        let now = Instant::now();
        inner.last_failure_time = Some(now);

        let state = inner.state;
        match (state, admission) {
            (CircuitState::Closed, _) => {
                inner.failures.push_back(now);
                Self::prune(&mut inner, self.settings.rolling_window);
                if inner.failures.len() as u32 >= self.settings.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            (CircuitState::HalfOpen, Admission::Trial) => {
                inner.trial_in_flight = false;
                inner.failures.push_back(now);
                self.transition(&mut inner, CircuitState::Open);
            }
            // Late result of a call admitted before the circuit opened.
            _ => {}
        }
    }

    fn on_cancel(&self, admission: Admission) {
        if admission == Admission::Trial {
            let mut inner = self.lock();
            if inner.state == CircuitState::HalfOpen {
                inner.trial_in_flight = false;
                tracing::debug!(breaker = %self.name, "Trial attempt cancelled, slot released");
            }
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.last_state_change = Instant::now();

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = from.as_str(),
                failures = inner.failures.len(),
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => {
                tracing::info!(breaker = %self.name, "Circuit breaker half-open (admitting trial)")
            }
            CircuitState::Closed => {
                tracing::info!(breaker = %self.name, "Circuit breaker closed (recovered)")
            }
        }
        metrics::record_breaker_transition(&self.name, to.as_str());
    }

    fn prune(inner: &mut BreakerInner, window: Duration) {
        let now = Instant::now();
        while let Some(&oldest) = inner.failures.front() {
            if now.duration_since(oldest) >= window {
                inner.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Admission to run one guarded attempt.
///
/// Settle it with [`Permit::success`] or [`Permit::failure`]. Dropping it
/// unsettled (the attempt was cancelled) records nothing but frees a
/// half-open trial slot.
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl Permit<'_> {
    /// True when this permit is the single half-open trial.
    pub fn is_trial(&self) -> bool {
        self.admission == Admission::Trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.admission);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.admission);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_cancel(self.admission);
        }
    }
}
