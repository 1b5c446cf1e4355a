use crate::app_dirs::AppDirs;
use crate::clock::Clock;
use crate::difficulty::Difficulty;
use crate::presenter::Presenter;
use crate::scheduler::{Phase, RoundEvent, RoundScheduler, SessionState};
use crate::scoring::ScoreSummary;
use crate::stats::{push_capped, LeaderboardEntry, ScoreStore};
use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Orchestrates one game at a time: runs the scheduler, narrates its
/// events to the presenter, and on game over scores the session, updates
/// the store, and appends a history row.
///
/// The store is optional; when it is missing (or any write fails) the game
/// plays on with empty panels.
pub struct Game<C: Clock> {
    clock: C,
    rng: StdRng,
    difficulty: Difficulty,
    scheduler: RoundScheduler,
    store: Option<Box<dyn ScoreStore>>,
    history_path: Option<PathBuf>,
    last_summary: Option<ScoreSummary>,
}

impl<C: Clock> Game<C> {
    pub fn new(clock: C, difficulty: Difficulty, store: Option<Box<dyn ScoreStore>>) -> Self {
        Self::with_seed(clock, difficulty, store, None)
    }

    /// A fixed seed makes the delay/position sequence reproducible.
    pub fn with_seed(
        clock: C,
        difficulty: Difficulty,
        store: Option<Box<dyn ScoreStore>>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            clock,
            rng,
            difficulty,
            scheduler: RoundScheduler::new(difficulty.profile()),
            store,
            history_path: AppDirs::history_path(),
            last_summary: None,
        }
    }

    pub fn set_history_path(&mut self, path: Option<PathBuf>) {
        self.history_path = path;
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn state(&self) -> &SessionState {
        self.scheduler.state()
    }

    pub fn last_summary(&self) -> Option<&ScoreSummary> {
        self.last_summary.as_ref()
    }

    pub fn is_over(&self) -> bool {
        self.scheduler.is_over()
    }

    /// A session is in flight from countdown until game over.
    pub fn in_session(&self) -> bool {
        !matches!(self.phase(), Phase::Idle | Phase::GameOver)
    }

    /// Start (or restart) a session. Rebuilds the scheduler from the
    /// active difficulty, so a profile picked between sessions takes
    /// effect here.
    pub fn start(&mut self, presenter: &mut dyn Presenter) {
        self.scheduler = RoundScheduler::new(self.difficulty.profile());
        self.last_summary = None;
        presenter.hide_target();
        presenter.set_round_label(String::new());
        self.refresh_panels(presenter);
        let events = self.scheduler.begin(self.clock.now_ms());
        self.dispatch(events, presenter);
    }

    /// Advance timers. Call once per UI tick.
    pub fn tick(&mut self, presenter: &mut dyn Presenter) {
        let events = self.scheduler.poll(self.clock.now_ms(), &mut self.rng);
        self.dispatch(events, presenter);
    }

    /// Player tapped. Ignored unless the target is up.
    pub fn tap(&mut self, presenter: &mut dyn Presenter) {
        let events = self.scheduler.tap(self.clock.now_ms(), &mut self.rng);
        self.dispatch(events, presenter);
    }

    /// Difficulty can only change between sessions; returns whether the
    /// change was applied.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.in_session() {
            return false;
        }
        self.difficulty = difficulty;
        true
    }

    /// Wipe the leaderboard and lifetime stats.
    pub fn reset_scores(&mut self, presenter: &mut dyn Presenter) {
        if let Some(store) = &self.store {
            let _ = store.reset_all();
        }
        self.refresh_panels(presenter);
    }

    fn refresh_panels(&self, presenter: &mut dyn Presenter) {
        let (stats, board) = match &self.store {
            Some(store) => (store.load_stats(), store.load_leaderboard()),
            None => Default::default(),
        };
        presenter.render_stats(stats);
        presenter.render_leaderboard(board);
    }

    fn dispatch(&mut self, events: Vec<RoundEvent>, presenter: &mut dyn Presenter) {
        for event in events {
            match event {
                RoundEvent::CountdownTick(text) => {
                    presenter.set_countdown_label(text.to_string());
                }
                RoundEvent::GoLive => {
                    presenter.set_countdown_label(String::new());
                }
                RoundEvent::TargetShown(hint) => {
                    let profile = self.scheduler.profile();
                    let state = self.scheduler.state();
                    presenter.set_round_label(format!(
                        "Round {} / {}",
                        state.current_round + 1,
                        profile.rounds
                    ));
                    presenter.show_target(hint, profile.target_size);
                }
                RoundEvent::RoundCompleted { .. } => {
                    presenter.hide_target();
                }
                RoundEvent::StreakReached(count) => {
                    presenter.notify_streak(count);
                }
                RoundEvent::PerfectTap => {
                    presenter.notify_perfect();
                }
                RoundEvent::GameFinished => {
                    self.finish(presenter);
                }
            }
        }
    }

    /// Game over: score, persist, refresh the panels.
    fn finish(&mut self, presenter: &mut dyn Presenter) {
        let now = self.clock.now_ms();
        let state = self.scheduler.state().clone();
        let duration_secs = now.saturating_sub(state.started_at_ms) as f64 / 1000.0;
        let summary = ScoreSummary::compute(
            &state.samples,
            state.total_perfects,
            state.best_streak,
            duration_secs,
        );

        presenter.set_round_label(String::new());
        presenter.set_countdown_label(String::new());

        if let Some(store) = &self.store {
            let mut board = store.load_leaderboard();
            push_capped(
                &mut board,
                LeaderboardEntry {
                    average_ms: summary.average_ms,
                    iq_estimate: summary.iq_estimate,
                    consistency_pct: summary.consistency_pct,
                    perfects: summary.perfects,
                    timestamp: Local::now(),
                    difficulty: self.difficulty.name(),
                },
            );
            let _ = store.save_leaderboard(&board);

            let mut stats = store.load_stats();
            stats.record_game(summary.average_ms, summary.iq_estimate);
            let _ = store.save_stats(&stats);

            presenter.render_stats(stats);
            presenter.render_leaderboard(board);
        }

        let _ = self.append_history(&summary);
        presenter.render_summary(summary.clone());
        self.last_summary = Some(summary);
    }

    fn append_history(&self, summary: &ScoreSummary) -> Result<(), csv::Error> {
        let Some(path) = &self.history_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !path.exists();
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record([
                "date",
                "difficulty",
                "rounds",
                "avg_ms",
                "iq",
                "consistency_pct",
                "perfects",
                "best_streak",
                "duration_secs",
            ])?;
        }
        writer.write_record([
            Local::now().to_rfc3339(),
            self.difficulty.name(),
            self.scheduler.profile().rounds.to_string(),
            format!("{:.1}", summary.average_ms),
            summary.iq_estimate.to_string(),
            summary.consistency_pct.to_string(),
            summary.perfects.to_string(),
            summary.best_streak.to_string(),
            format!("{:.2}", summary.duration_secs),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::presenter::{PresenterCall, RecordingPresenter};
    use crate::scoring;
    use crate::stats::ScoreDb;

    fn game_with_db(difficulty: Difficulty) -> (Game<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let db = ScoreDb::open_in_memory().unwrap();
        let mut game = Game::with_seed(
            clock.clone(),
            difficulty,
            Some(Box::new(db)),
            Some(42),
        );
        game.set_history_path(None);
        (game, clock)
    }

    /// Tick until the target shows, then tap `reaction_ms` later.
    fn play_round(
        game: &mut Game<ManualClock>,
        clock: &ManualClock,
        presenter: &mut RecordingPresenter,
        reaction_ms: u64,
    ) {
        loop {
            clock.advance(10);
            game.tick(presenter);
            if matches!(game.phase(), Phase::TargetVisible { .. }) {
                break;
            }
            assert!(clock.now_ms() < 600_000, "target never appeared");
        }
        clock.advance(reaction_ms);
        game.tap(presenter);
    }

    fn play_full_game(
        game: &mut Game<ManualClock>,
        clock: &ManualClock,
        presenter: &mut RecordingPresenter,
        reaction_ms: u64,
    ) {
        game.start(presenter);
        while !game.is_over() {
            play_round(game, clock, presenter, reaction_ms);
        }
    }

    #[test]
    fn full_session_produces_summary_and_persists() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();
        let start_ms = clock.now_ms();

        play_full_game(&mut game, &clock, &mut presenter, 200);

        let summary = presenter.last_summary().expect("no summary rendered");
        assert_eq!(summary.average_ms, 200.0);
        assert_eq!(summary.best_streak, 10);
        assert_eq!(summary.perfects, 10);
        assert_eq!(
            summary.iq_estimate,
            scoring::iq_estimate(&vec![200.0; 10], 10)
        );

        // Duration matches the manual clock exactly.
        let expected = (clock.now_ms() - start_ms) as f64 / 1000.0;
        assert!((summary.duration_secs - expected).abs() < 1e-9);

        let board = presenter.last_leaderboard().expect("no leaderboard");
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].average_ms, 200.0);
        assert_eq!(board[0].difficulty, "easy");
    }

    #[test]
    fn countdown_labels_run_in_order() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();
        game.start(&mut presenter);
        for _ in 0..400 {
            clock.advance(10);
            game.tick(&mut presenter);
        }
        let labels: Vec<&str> = presenter
            .calls
            .iter()
            .filter_map(|c| match c {
                PresenterCall::CountdownLabel(t) if !t.is_empty() => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["3", "2", "1", "Go!"]);
    }

    #[test]
    fn tap_outside_target_changes_nothing() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();
        game.start(&mut presenter);

        clock.advance(100); // still counting down
        let before_calls = presenter.calls.len();
        let before_state = game.state().clone();

        game.tap(&mut presenter);

        assert_eq!(presenter.calls.len(), before_calls);
        assert_eq!(*game.state(), before_state);
    }

    #[test]
    fn difficulty_locked_during_session() {
        let (mut game, _clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();

        assert!(game.set_difficulty(Difficulty::Hard));
        game.start(&mut presenter);
        assert!(!game.set_difficulty(Difficulty::Expert));
        assert_eq!(game.difficulty(), Difficulty::Hard);
    }

    #[test]
    fn difficulty_change_applies_to_next_session() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();

        play_full_game(&mut game, &clock, &mut presenter, 200);
        assert!(game.set_difficulty(Difficulty::Medium));
        game.start(&mut presenter);
        // Medium profile: 15 rounds.
        while !game.is_over() {
            play_round(&mut game, &clock, &mut presenter, 150);
        }
        assert_eq!(game.state().samples.len(), 15);
    }

    #[test]
    fn worse_second_game_leaves_bests_untouched() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();

        play_full_game(&mut game, &clock, &mut presenter, 180);
        let first_stats = presenter
            .calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PresenterCall::Stats(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();

        play_full_game(&mut game, &clock, &mut presenter, 450);
        let second_stats = presenter
            .calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PresenterCall::Stats(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();

        assert_eq!(second_stats.best_average_ms, first_stats.best_average_ms);
        assert_eq!(second_stats.best_iq, first_stats.best_iq);
        assert_eq!(second_stats.total_games, first_stats.total_games + 1);
    }

    #[test]
    fn plays_without_a_store() {
        let clock = ManualClock::new();
        let mut game =
            Game::with_seed(clock.clone(), Difficulty::Easy, None, Some(9));
        game.set_history_path(None);
        let mut presenter = RecordingPresenter::new();

        play_full_game(&mut game, &clock, &mut presenter, 220);
        assert!(presenter.last_summary().is_some());
    }

    #[test]
    fn restart_mid_session_resets_counters() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();
        game.start(&mut presenter);
        play_round(&mut game, &clock, &mut presenter, 200);
        assert_eq!(game.state().current_round, 1);

        game.start(&mut presenter);
        assert_eq!(game.state().current_round, 0);
        assert!(game.state().samples.is_empty());
        assert!(!game.is_over());
    }

    #[test]
    fn history_row_appended_per_game() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        game.set_history_path(Some(path.clone()));
        let mut presenter = RecordingPresenter::new();

        play_full_game(&mut game, &clock, &mut presenter, 200);
        play_full_game(&mut game, &clock, &mut presenter, 300);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3); // header + two games
        assert!(lines[0].starts_with("date,difficulty,rounds"));
        assert!(lines[1].contains("easy"));
    }

    #[test]
    fn reset_scores_empties_panels() {
        let (mut game, clock) = game_with_db(Difficulty::Easy);
        let mut presenter = RecordingPresenter::new();
        play_full_game(&mut game, &clock, &mut presenter, 200);

        game.reset_scores(&mut presenter);
        let board = presenter.last_leaderboard().unwrap();
        assert!(board.is_empty());
    }
}
