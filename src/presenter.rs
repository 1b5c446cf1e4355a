use crate::scheduler::PositionHint;
use crate::scoring::ScoreSummary;
use crate::stats::{LeaderboardEntry, PlayerStats};

/// Narrow outward interface the engine renders through. The engine never
/// touches a drawing surface directly; the TUI implements this, and tests
/// substitute a recorder.
pub trait Presenter {
    fn show_target(&mut self, hint: PositionHint, size: u32);
    fn hide_target(&mut self);
    fn set_round_label(&mut self, text: String);
    fn set_countdown_label(&mut self, text: String);
    fn notify_streak(&mut self, count: u32);
    fn notify_perfect(&mut self);
    fn render_summary(&mut self, summary: ScoreSummary);
    fn render_leaderboard(&mut self, entries: Vec<LeaderboardEntry>);
    fn render_stats(&mut self, stats: PlayerStats);
}

/// Call log of everything the engine asked a presenter to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    ShowTarget(PositionHint, u32),
    HideTarget,
    RoundLabel(String),
    CountdownLabel(String),
    Streak(u32),
    Perfect,
    Summary(ScoreSummary),
    Leaderboard(Vec<LeaderboardEntry>),
    Stats(PlayerStats),
}

/// Presenter double that records calls for assertions.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub calls: Vec<PresenterCall>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&PresenterCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn last_summary(&self) -> Option<&ScoreSummary> {
        self.calls.iter().rev().find_map(|c| match c {
            PresenterCall::Summary(s) => Some(s),
            _ => None,
        })
    }

    pub fn last_leaderboard(&self) -> Option<&Vec<LeaderboardEntry>> {
        self.calls.iter().rev().find_map(|c| match c {
            PresenterCall::Leaderboard(l) => Some(l),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn show_target(&mut self, hint: PositionHint, size: u32) {
        self.calls.push(PresenterCall::ShowTarget(hint, size));
    }

    fn hide_target(&mut self) {
        self.calls.push(PresenterCall::HideTarget);
    }

    fn set_round_label(&mut self, text: String) {
        self.calls.push(PresenterCall::RoundLabel(text));
    }

    fn set_countdown_label(&mut self, text: String) {
        self.calls.push(PresenterCall::CountdownLabel(text));
    }

    fn notify_streak(&mut self, count: u32) {
        self.calls.push(PresenterCall::Streak(count));
    }

    fn notify_perfect(&mut self) {
        self.calls.push(PresenterCall::Perfect);
    }

    fn render_summary(&mut self, summary: ScoreSummary) {
        self.calls.push(PresenterCall::Summary(summary));
    }

    fn render_leaderboard(&mut self, entries: Vec<LeaderboardEntry>) {
        self.calls.push(PresenterCall::Leaderboard(entries));
    }

    fn render_stats(&mut self, stats: PlayerStats) {
        self.calls.push(PresenterCall::Stats(stats));
    }
}
