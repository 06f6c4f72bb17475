//! Duration budgeting.
//!
//! Clips are offered one at a time in priority order. The budget accepts
//! them until the target run-time is reached, allowing a bounded overshoot
//! once most of the target has been filled.

use clipreel_compilation_model::TransitionPolicy;

/// How far past the target a clip may push the total once the soft floor
/// has been reached.
pub const OVERFLOW_TOLERANCE_SECS: f64 = 30.0;

/// Fraction of the target after which overshoot is bounded.
pub const SOFT_FLOOR_FRACTION: f64 = 0.8;

/// Outcome of offering one candidate to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    /// Include the candidate and keep going.
    Accept,
    /// Include the candidate; the target is reached.
    AcceptAndStop,
    /// Exclude the candidate and stop considering further ones.
    RejectAndStop,
}

impl BudgetDecision {
    pub fn accepts(&self) -> bool {
        matches!(self, Self::Accept | Self::AcceptAndStop)
    }

    pub fn stops(&self) -> bool {
        matches!(self, Self::AcceptAndStop | Self::RejectAndStop)
    }
}

/// Running state of one selection pass.
#[derive(Debug, Clone)]
pub struct TimelineBudget {
    accumulated_secs: f64,
    target_secs: f64,
    overflow_tolerance_secs: f64,
    soft_floor_fraction: f64,
    accepted_clips: usize,
    closed: bool,
}

impl TimelineBudget {
    /// Budget for `target_secs` with the standard tolerance.
    pub fn new(target_secs: f64) -> Self {
        Self::with_tolerance(target_secs, OVERFLOW_TOLERANCE_SECS, SOFT_FLOOR_FRACTION)
    }

    pub fn with_tolerance(
        target_secs: f64,
        overflow_tolerance_secs: f64,
        soft_floor_fraction: f64,
    ) -> Self {
        Self {
            accumulated_secs: 0.0,
            target_secs,
            overflow_tolerance_secs,
            soft_floor_fraction,
            accepted_clips: 0,
            closed: false,
        }
    }

    pub fn accumulated_secs(&self) -> f64 {
        self.accumulated_secs
    }

    pub fn target_secs(&self) -> f64 {
        self.target_secs
    }

    /// Number of real clips accepted so far.
    pub fn accepted_clips(&self) -> usize {
        self.accepted_clips
    }

    /// Whether a stop decision has been made.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Count a title bumper against the running total.
    ///
    /// The bumper is never evaluated: it does not count as an accepted clip,
    /// so the first real clip is still always taken.
    pub fn credit_bumper(&mut self, duration_secs: f64) {
        self.accumulated_secs += duration_secs.max(0.0);
    }

    /// Seconds a clip of `duration_secs` would add to the timeline.
    ///
    /// With crossfades every clip after the first real one shares
    /// `overlap_secs` with its predecessor. Never negative.
    pub fn contribution(&self, duration_secs: f64, transition: TransitionPolicy) -> f64 {
        let added = if self.accepted_clips > 0 {
            duration_secs - transition.overlap_secs()
        } else {
            duration_secs
        };
        added.max(0.0)
    }

    /// Offer a candidate adding `added_secs` and record the decision.
    pub fn evaluate(&mut self, added_secs: f64) -> BudgetDecision {
        if self.closed {
            return BudgetDecision::RejectAndStop;
        }

        let added_secs = added_secs.max(0.0);
        let overflows =
            self.accumulated_secs + added_secs > self.target_secs + self.overflow_tolerance_secs;
        let past_soft_floor =
            self.accumulated_secs >= self.target_secs * self.soft_floor_fraction;

        if self.accepted_clips > 0 && overflows && past_soft_floor {
            self.closed = true;
            return BudgetDecision::RejectAndStop;
        }

        self.accumulated_secs += added_secs;
        self.accepted_clips += 1;

        if self.accumulated_secs >= self.target_secs {
            self.closed = true;
            BudgetDecision::AcceptAndStop
        } else {
            BudgetDecision::Accept
        }
    }
}
