use crate::difficulty::DifficultyProfile;
use rand::Rng;

/// Cadence of the pre-game countdown.
pub const COUNTDOWN_STEP_MS: u64 = 700;
const COUNTDOWN_STEPS: [&str; 4] = ["3", "2", "1", "Go!"];

/// Streak length at which the UI gets notified.
pub const STREAK_NOTICE_MIN: u32 = 3;
/// A "perfect" tap must beat this fraction of the success threshold.
pub const PERFECT_FRACTION: f64 = 0.8;

/// Where to draw the target, as fractions of the play area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionHint {
    pub x: f64,
    pub y: f64,
}

/// Scheduler phase. At most one pending deadline exists at a time and it
/// lives inside the phase itself, so replacing the phase (on restart)
/// cancels it — a stale timer from a previous session can never fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Idle,
    Countdown { step: usize, next_step_at: u64 },
    AwaitingTarget { show_at: u64 },
    TargetVisible { shown_at: u64 },
    GameOver,
}

/// Counters for the session in flight. Reset wholesale when a new session
/// begins; frozen once the phase reaches GameOver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_round: u32,
    pub samples: Vec<f64>,
    pub running: bool,
    pub streak: u32,
    pub best_streak: u32,
    pub consecutive_perfects: u32,
    pub total_perfects: u32,
    pub started_at_ms: u64,
}

/// Outward effects of a scheduler step, consumed by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    CountdownTick(&'static str),
    GoLive,
    TargetShown(PositionHint),
    RoundCompleted {
        round: u32,
        reaction_ms: f64,
        perfect: bool,
    },
    StreakReached(u32),
    PerfectTap,
    GameFinished,
}

/// Drives the round cycle: countdown, randomized target delay, tap, next
/// round, game over after the profile's round count.
#[derive(Debug)]
pub struct RoundScheduler {
    profile: DifficultyProfile,
    phase: Phase,
    state: SessionState,
}

impl RoundScheduler {
    pub fn new(profile: DifficultyProfile) -> Self {
        Self {
            profile: profile.sanitized(),
            phase: Phase::Idle,
            state: SessionState::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.profile
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Start (or restart) a session: wipe all counters and enter the
    /// countdown. Any deadline from a previous session dies with the old
    /// phase value.
    pub fn begin(&mut self, now: u64) -> Vec<RoundEvent> {
        self.state = SessionState {
            started_at_ms: now,
            ..SessionState::default()
        };
        self.phase = Phase::Countdown {
            step: 0,
            next_step_at: now + COUNTDOWN_STEP_MS,
        };
        vec![RoundEvent::CountdownTick(COUNTDOWN_STEPS[0])]
    }

    /// Fire every deadline that has come due. A single poll after a long
    /// stall steps through multiple countdown ticks rather than losing
    /// them.
    pub fn poll<R: Rng>(&mut self, now: u64, rng: &mut R) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        loop {
            match self.phase {
                Phase::Countdown { step, next_step_at } if now >= next_step_at => {
                    let next = step + 1;
                    if next < COUNTDOWN_STEPS.len() {
                        events.push(RoundEvent::CountdownTick(COUNTDOWN_STEPS[next]));
                        self.phase = Phase::Countdown {
                            step: next,
                            next_step_at: next_step_at + COUNTDOWN_STEP_MS,
                        };
                    } else {
                        self.state.running = true;
                        events.push(RoundEvent::GoLive);
                        self.schedule_target(now, rng);
                    }
                }
                Phase::AwaitingTarget { show_at } if now >= show_at => {
                    let hint = PositionHint {
                        x: rng.gen::<f64>(),
                        y: rng.gen::<f64>(),
                    };
                    self.phase = Phase::TargetVisible { shown_at: now };
                    events.push(RoundEvent::TargetShown(hint));
                }
                _ => break,
            }
        }
        events
    }

    /// Handle a tap. Only honored while the target is visible and the
    /// session is running; any other tap is silently dropped.
    pub fn tap<R: Rng>(&mut self, now: u64, rng: &mut R) -> Vec<RoundEvent> {
        let shown_at = match self.phase {
            Phase::TargetVisible { shown_at } if self.state.running => shown_at,
            _ => return Vec::new(),
        };

        let reaction_ms = now.saturating_sub(shown_at) as f64;
        self.state.samples.push(reaction_ms);
        self.state.current_round += 1;

        let threshold = self.profile.perfect_threshold_ms as f64;
        let mut perfect = false;
        let mut events = Vec::new();

        if reaction_ms < threshold {
            self.state.streak += 1;
            self.state.best_streak = self.state.best_streak.max(self.state.streak);
            if reaction_ms < threshold * PERFECT_FRACTION {
                perfect = true;
                self.state.consecutive_perfects += 1;
                self.state.total_perfects += 1;
            }
        } else {
            self.state.streak = 0;
            self.state.consecutive_perfects = 0;
        }

        events.push(RoundEvent::RoundCompleted {
            round: self.state.current_round,
            reaction_ms,
            perfect,
        });
        if reaction_ms < threshold && self.state.streak >= STREAK_NOTICE_MIN {
            events.push(RoundEvent::StreakReached(self.state.streak));
        }
        if perfect {
            events.push(RoundEvent::PerfectTap);
        }

        if self.state.current_round >= self.profile.rounds {
            self.state.running = false;
            self.phase = Phase::GameOver;
            events.push(RoundEvent::GameFinished);
        } else {
            self.schedule_target(now, rng);
        }
        events
    }

    /// Next target appears after a delay drawn uniformly from
    /// [min_delay, max_delay). The profile is sanitized at construction,
    /// so the span is never negative.
    fn schedule_target<R: Rng>(&mut self, now: u64, rng: &mut R) {
        let span = self.profile.max_delay_ms - self.profile.min_delay_ms;
        let delay = if span > 0 {
            self.profile.min_delay_ms + rng.gen_range(0..span)
        } else {
            self.profile.min_delay_ms
        };
        self.phase = Phase::AwaitingTarget {
            show_at: now + delay,
        };
    }
}
