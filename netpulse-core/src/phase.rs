// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Two-phase receive-timeout state machine.
//!
//! A run starts in `Probing` with an aggressive timeout so an unreachable
//! peer fails fast, and latches into `Steady` with a patient timeout after
//! the first successful exchange. The transition is one-way: once widened,
//! the timeout never narrows again within a run.

use std::time::Duration;

use crate::config::ProbeSettings;

/// Receive-timeout phases of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    /// No exchange has succeeded yet; the receive timeout is short.
    Probing,

    /// At least one exchange succeeded; the receive timeout is wide.
    Steady,
}

impl ProbePhase {
    /// Get the phase name for log lines.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Probing => "Probing",
            Self::Steady => "Steady",
        }
    }
}

impl std::fmt::Display for ProbePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tracks the current phase and maps it to a receive timeout.
#[derive(Debug, Clone)]
pub struct TimeoutSchedule {
    phase: ProbePhase,
    probe_timeout: Duration,
    steady_timeout: Duration,
}

impl TimeoutSchedule {
    /// Create a schedule in the `Probing` phase.
    pub fn new(settings: &ProbeSettings) -> Self {
        Self {
            phase: ProbePhase::Probing,
            probe_timeout: settings.probe_timeout,
            steady_timeout: settings.steady_timeout,
        }
    }

    /// Get the current phase.
    pub fn phase(&self) -> ProbePhase {
        self.phase
    }

    /// The receive timeout for the current phase.
    pub fn current_timeout(&self) -> Duration {
        match self.phase {
            ProbePhase::Probing => self.probe_timeout,
            ProbePhase::Steady => self.steady_timeout,
        }
    }

    /// Latch into the `Steady` phase after a successful exchange.
    ///
    /// Returns true only when the transition happens on this call, so the
    /// caller can re-arm the socket timeout exactly once.
    pub fn widen(&mut self) -> bool {
        if self.phase == ProbePhase::Steady {
            return false;
        }

        tracing::debug!(
            from = ProbePhase::Probing.name(),
            to = ProbePhase::Steady.name(),
            timeout_ms = self.steady_timeout.as_millis() as u64,
            "Receive timeout widened"
        );

        self.phase = ProbePhase::Steady;
        true
    }
}
