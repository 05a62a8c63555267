//! Backend health reporting.
//!
//! The gateway's `/-/ready` route asks the configured backend for a
//! [`HealthStatus`] and answers 503 only when the backend cannot take
//! appends. A slow backend still serves traffic and reports
//! [`HealthState::Degraded`].

use std::{fmt, time::Duration};

/// What a health check is asked to establish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthProbe {
    /// The engine answers at all.
    Liveness,
    /// The engine can take appends and scans right now.
    Readiness,
}

impl HealthProbe {
    /// Lower-case name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Liveness => "liveness",
            Self::Readiness => "readiness",
        }
    }
}

impl fmt::Display for HealthProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    /// Fully operational.
    Healthy,
    /// Serving, but slower or weaker than expected.
    Degraded,
    /// Not able to serve.
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        })
    }
}

/// Outcome of [`StorageBackend::health_check`](crate::StorageBackend::health_check).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    /// The verdict.
    pub state: HealthState,
    /// Short engine name, such as `"memory"` or `"sled"`.
    pub backend: &'static str,
    /// How long the check took.
    pub elapsed: Duration,
    /// Why the backend is not healthy. `None` when healthy.
    pub reason: Option<String>,
    /// Free-form engine detail, such as an entry count.
    pub detail: Option<String>,
}

impl HealthStatus {
    fn new(
        state: HealthState,
        backend: &'static str,
        elapsed: Duration,
        reason: Option<String>,
    ) -> Self {
        Self { state, backend, elapsed, reason, detail: None }
    }

    /// A passing check.
    #[must_use]
    pub fn healthy(backend: &'static str, elapsed: Duration) -> Self {
        Self::new(HealthState::Healthy, backend, elapsed, None)
    }

    /// A check that passed slowly or partially.
    #[must_use]
    pub fn degraded(backend: &'static str, elapsed: Duration, reason: impl Into<String>) -> Self {
        Self::new(HealthState::Degraded, backend, elapsed, Some(reason.into()))
    }

    /// A failed check.
    #[must_use]
    pub fn unhealthy(backend: &'static str, elapsed: Duration, reason: impl Into<String>) -> Self {
        Self::new(HealthState::Unhealthy, backend, elapsed, Some(reason.into()))
    }

    /// Attaches engine detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Whether the backend can take traffic. Degraded backends still can.
    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.state != HealthState::Unhealthy
    }
}

/// Renders as `sled degraded (slow disk read) in 1.2s`.
impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.backend, self.state)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        write!(f, " in {:?}", self.elapsed)
    }
}
