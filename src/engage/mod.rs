//! Adaptive engagement scheduler.
//!
//! A small feedback controller deciding when the agent may speak without
//! being asked. Engagement (the user answering a proactive remark quickly)
//! tightens the firing interval; being ignored loosens it. Both ends are
//! clamped so the agent never spams nor goes permanently silent.
//!
//! All transitions take an explicit `now` so tests can drive the clock;
//! the scheduler itself never reads wall time.

use crate::config::EngagementConfig;
use std::time::{Duration, Instant};

/// How much a single engagement tightens the interval.
const ENGAGE_STEP: Duration = Duration::from_secs(5);
/// How much a single ignore loosens the interval.
const IGNORE_STEP: Duration = Duration::from_secs(10);

/// Mutable scheduler state. Owned exclusively by the main loop; the
/// listener task never touches it.
///
/// Three clocks with distinct jobs. `last_firing` paces proactive turns
/// and resets on every firing, spoken or silent. `last_spoken` moves on
/// every audible remark; the engagement window is measured against it.
/// `pending_since` is the oldest spoken remark still unanswered; the
/// ignore window is measured against it, so neither a silent firing nor
/// a follow-up remark can push the ignore deadline out indefinitely.
#[derive(Debug, Clone, Copy)]
pub struct EngagementState {
    pub last_firing: Instant,
    pub last_spoken: Option<Instant>,
    pub pending_since: Option<Instant>,
    pub current_interval: Duration,
}

#[derive(Debug)]
pub struct EngagementScheduler {
    min_interval: Duration,
    max_interval: Duration,
    engagement_window: Duration,
    ignore_window: Duration,
    state: EngagementState,
}

impl EngagementScheduler {
    #[must_use]
    pub fn new(config: &EngagementConfig, now: Instant) -> Self {
        Self {
            min_interval: Duration::from_secs(config.min_interval_secs),
            max_interval: Duration::from_secs(config.max_interval_secs),
            engagement_window: Duration::from_secs(config.engagement_window_secs),
            ignore_window: Duration::from_secs(config.ignore_window_secs),
            state: EngagementState {
                last_firing: now,
                last_spoken: None,
                pending_since: None,
                current_interval: Duration::from_secs(config.start_interval_secs),
            },
        }
    }

    #[must_use]
    pub fn current_interval(&self) -> Duration {
        self.state.current_interval
    }

    /// Whether a spoken proactive remark is still waiting for the
    /// user's reaction.
    #[must_use]
    pub fn awaiting_engagement(&self) -> bool {
        self.state.pending_since.is_some()
    }

    /// The user spoke. If a proactive remark was pending feedback and the
    /// reply came inside the engagement window, speak more often from now
    /// on. The pending flag clears either way.
    pub fn note_user_speech(&mut self, now: Instant) {
        if self.state.pending_since.take().is_some() {
            // The reply answers the most recent remark, so the window is
            // measured against that one.
            if let Some(spoken) = self.state.last_spoken {
                if now.duration_since(spoken) <= self.engagement_window {
                    self.state.current_interval =
                        (self.state.current_interval.saturating_sub(ENGAGE_STEP))
                            .max(self.min_interval);
                    tracing::debug!(
                        interval_secs = self.state.current_interval.as_secs(),
                        "user engaged; proactive cadence tightened"
                    );
                }
            }
        }
        // User speech resets the silence clock; the next proactive remark
        // waits a full interval from here.
        self.state.last_firing = now;
    }

    /// Per-tick transition. Applies the ignore-window penalty first, then
    /// decides whether a proactive turn fires. Returns `true` when the
    /// caller should run a proactive pipeline turn.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Some(pending) = self.state.pending_since {
            if now.duration_since(pending) > self.ignore_window {
                self.state.current_interval =
                    (self.state.current_interval + IGNORE_STEP).min(self.max_interval);
                self.state.pending_since = None;
                tracing::debug!(
                    interval_secs = self.state.current_interval.as_secs(),
                    "proactive remark ignored; cadence loosened"
                );
            }
        }

        if now.duration_since(self.state.last_firing) > self.state.current_interval {
            self.state.last_firing = now;
            return true;
        }
        false
    }

    /// A proactive turn actually produced audible speech; start watching
    /// for the user's reaction. A follow-up remark while one is already
    /// pending does not extend the ignore deadline.
    pub fn mark_proactive_spoken(&mut self, now: Instant) {
        self.state.last_spoken = Some(now);
        self.state.pending_since.get_or_insert(now);
        self.state.last_firing = now;
    }

    /// Invariant check exposed for tests: the interval never leaves its
    /// configured band.
    #[must_use]
    pub fn interval_in_bounds(&self) -> bool {
        self.state.current_interval >= self.min_interval
            && self.state.current_interval <= self.max_interval
    }
}
