use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};

use blip::clock::MonotonicClock;
use blip::config::{Config, ConfigStore, FileConfigStore};
use blip::difficulty::Difficulty;
use blip::runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner};
use blip::session::Game;
use blip::stats::{ScoreDb, ScoreStore};
use blip::ui::UiModel;

const TICK_RATE_MS: u64 = 25;

/// reaction-time training tui with streaks, focus scoring, and a local leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A dot appears after a random delay; tap it (space, enter, or click) as fast as you can. Streaks, perfect taps, and a consistency-weighted score feed a local leaderboard."
)]
struct Cli {
    /// difficulty for this run (remembered for next time)
    #[clap(short, long, value_enum)]
    difficulty: Option<Difficulty>,

    /// seed the delay/position sequence for a reproducible game
    #[clap(long)]
    seed: Option<u64>,

    /// wipe the leaderboard and lifetime stats, then exit
    #[clap(long)]
    reset_scores: bool,
}

struct App {
    game: Game<MonotonicClock>,
    ui: UiModel,
    config_store: FileConfigStore,
}

impl App {
    fn new(cli: &Cli) -> Self {
        let config_store = FileConfigStore::new();
        let difficulty = cli
            .difficulty
            .unwrap_or_else(|| config_store.load().difficulty());

        let store: Option<Box<dyn ScoreStore>> = match ScoreDb::new() {
            Ok(db) => Some(Box::new(db)),
            // No database just means no leaderboard; the game still runs.
            Err(_) => None,
        };

        Self {
            game: Game::with_seed(MonotonicClock::new(), difficulty, store, cli.seed),
            ui: UiModel::new(difficulty),
            config_store,
        }
    }

    fn restart(&mut self) {
        self.ui.begin_session(self.game.difficulty());
        self.game.start(&mut self.ui);
    }

    fn pick_difficulty(&mut self, difficulty: Difficulty) {
        if self.game.set_difficulty(difficulty) {
            self.ui.set_difficulty(difficulty);
            let _ = self.config_store.save(&Config::with_difficulty(difficulty));
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.reset_scores {
        let db = ScoreDb::new()?;
        db.reset_all()?;
        println!("leaderboard and stats cleared");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&cli);
    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.restart();

    loop {
        terminal.draw(|f| f.render_widget(&app.ui, f.area()))?;

        match runner.step() {
            GameEvent::Tick => {
                app.game.tick(&mut app.ui);
            }
            GameEvent::Resize => {}
            GameEvent::Click { column, row } => {
                // Only a click on the dot itself counts as a tap.
                if app.ui.hit_test(column, row) {
                    app.game.tap(&mut app.ui);
                }
            }
            GameEvent::Key(key) => match key.code {
                KeyCode::Esc => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char(' ') | KeyCode::Enter => {
                    app.game.tap(&mut app.ui);
                }
                KeyCode::Char('r') => {
                    app.restart();
                }
                KeyCode::Char('s') => {
                    if !app.game.in_session() {
                        app.game.reset_scores(&mut app.ui);
                    }
                }
                KeyCode::Char(c @ '1'..='4') => {
                    let idx = (c as u8 - b'1') as usize;
                    app.pick_difficulty(Difficulty::ALL[idx]);
                }
                _ => {}
            },
        }
    }

    Ok(())
}
