use std::cell::Cell;
use std::time::{Duration, Instant};

use chrono::Local;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};
use time_humanize::HumanTime;
use unicode_width::UnicodeWidthStr;

use crate::difficulty::Difficulty;
use crate::presenter::Presenter;
use crate::scheduler::PositionHint;
use crate::scoring::ScoreSummary;
use crate::stats::{LeaderboardEntry, PlayerStats};

/// How long the transient banners stay up.
const PERFECT_BANNER: Duration = Duration::from_millis(700);
const STREAK_BANNER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
struct Target {
    hint: PositionHint,
    size: u32,
}

/// Render-side state. Implements [`Presenter`] by remembering what the
/// engine asked for; drawing happens separately through the `Widget`
/// impl, once per UI tick.
#[derive(Debug)]
pub struct UiModel {
    difficulty: Difficulty,
    target: Option<Target>,
    round_label: String,
    countdown_label: String,
    streak_banner: Option<(u32, Instant)>,
    perfect_banner: Option<Instant>,
    summary: Option<ScoreSummary>,
    leaderboard: Vec<LeaderboardEntry>,
    stats: PlayerStats,
    // Written during render so mouse clicks can be hit-tested against the
    // dot actually on screen.
    target_rect: Cell<Option<Rect>>,
}

impl UiModel {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            target: None,
            round_label: String::new(),
            countdown_label: String::new(),
            streak_banner: None,
            perfect_banner: None,
            summary: None,
            leaderboard: Vec::new(),
            stats: PlayerStats::default(),
            target_rect: Cell::new(None),
        }
    }

    /// Clear per-session leftovers before a new countdown starts.
    pub fn begin_session(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.target = None;
        self.streak_banner = None;
        self.perfect_banner = None;
        self.summary = None;
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn showing_results(&self) -> bool {
        self.summary.is_some()
    }

    /// Does a click at this terminal cell land on the visible dot?
    pub fn hit_test(&self, column: u16, row: u16) -> bool {
        match self.target_rect.get() {
            Some(rect) => {
                column >= rect.x
                    && column < rect.x + rect.width
                    && row >= rect.y
                    && row < rect.y + rect.height
            }
            None => false,
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(33),
                Constraint::Percentage(34),
                Constraint::Percentage(33),
            ])
            .split(area);

        Paragraph::new(self.round_label.clone())
            .style(Style::default().add_modifier(Modifier::BOLD))
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(
            self.countdown_label.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(format!("difficulty: {}", self.difficulty.name()))
            .style(Style::default().add_modifier(Modifier::DIM))
            .alignment(Alignment::Right)
            .render(chunks[2], buf);
    }

    fn render_play_area(&self, area: Rect, buf: &mut Buffer) {
        self.target_rect.set(None);
        if area.is_empty() {
            return;
        }

        if let Some(target) = self.target {
            // Nominal pixel size scaled to cells; terminal cells are about
            // twice as tall as wide.
            let width = ((target.size / 12) as u16).clamp(1, area.width);
            let height = ((target.size / 24) as u16).clamp(1, area.height);

            let max_x = area.width.saturating_sub(width);
            let max_y = area.height.saturating_sub(height);
            let rect = Rect {
                x: area.x + (target.hint.x * max_x as f64) as u16,
                y: area.y + (target.hint.y * max_y as f64) as u16,
                width,
                height,
            };
            Block::default()
                .style(Style::default().bg(Color::Magenta))
                .render(rect, buf);
            self.target_rect.set(Some(rect));
        }

        let now = Instant::now();
        let mut banners: Vec<Line> = Vec::new();
        if let Some((count, since)) = self.streak_banner {
            if now.duration_since(since) < STREAK_BANNER {
                banners.push(Line::from(Span::styled(
                    format!("Streak! ({})", count),
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                )));
            }
        }
        if let Some(since) = self.perfect_banner {
            if now.duration_since(since) < PERFECT_BANNER {
                banners.push(Line::from(Span::styled(
                    "Perfect!",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                )));
            }
        }
        if !banners.is_empty() {
            let banner_area = Rect {
                height: (banners.len() as u16).min(area.height),
                ..area
            };
            Paragraph::new(banners)
                .alignment(Alignment::Center)
                .render(banner_area, buf);
        }
    }

    fn render_results(&self, summary: &ScoreSummary, area: Rect, buf: &mut Buffer) {
        let mut lines: Vec<Line> = vec![
            Line::from(Span::styled(
                format!("Average reaction: {:.0} ms", summary.average_ms),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("IQ Level: {}", summary.iq_estimate)),
            Line::from(format!("Consistency: {}%", summary.consistency_pct)),
            Line::from(format!("Perfect taps: {}", summary.perfects)),
            Line::from(format!("Best streak: {}", summary.best_streak)),
            Line::from(format!("Game time: {:.1}s", summary.duration_secs)),
            Line::default(),
            Line::from(Span::styled(
                summary.verdict(),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];

        if !self.leaderboard.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "Leaderboard",
                Style::default()
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
            for (i, entry) in self.leaderboard.iter().enumerate() {
                lines.push(Line::from(leaderboard_line(i, entry)));
            }
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "(r)estart  (1-4) difficulty  (s) reset scores  (esc) quit",
            Style::default().add_modifier(Modifier::DIM),
        )));

        // Vertically center the card within the body.
        let content_height = lines.len() as u16;
        let top_pad = area.height.saturating_sub(content_height) / 2;
        let card = Rect {
            y: area.y + top_pad,
            height: content_height.min(area.height),
            ..area
        };
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(card, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        if self.stats.is_empty() {
            return;
        }
        let best_avg = self
            .stats
            .best_average_ms
            .map_or("-".to_string(), |v| format!("{:.0} ms", v));
        let best_iq = self
            .stats
            .best_iq
            .map_or("-".to_string(), |v| v.to_string());
        let text = format!(
            "best avg: {}   best IQ: {}   games played: {}",
            best_avg, best_iq, self.stats.total_games
        );
        // Hand-center so long stat lines truncate from the right edge only.
        let pad = (area.width as usize).saturating_sub(text.width()) / 2;
        Paragraph::new(format!("{}{}", " ".repeat(pad), text))
            .style(Style::default().add_modifier(Modifier::DIM))
            .render(area, buf);
    }
}

fn leaderboard_line(rank: usize, entry: &LeaderboardEntry) -> String {
    let age_secs = (Local::now() - entry.timestamp).num_seconds();
    let age = HumanTime::from(-age_secs);
    format!(
        "#{} {:.0} ms · IQ {} · {}% · {} perfects · {} · {}",
        rank + 1,
        entry.average_ms,
        entry.iq_estimate,
        entry.consistency_pct,
        entry.perfects,
        entry.difficulty,
        age
    )
}

impl Widget for &UiModel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(2)
            .vertical_margin(1)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(3),    // play area / results
                Constraint::Length(1), // lifetime stats
            ])
            .split(area);

        self.render_header(chunks[0], buf);
        match &self.summary {
            Some(summary) => self.render_results(summary, chunks[1], buf),
            None => self.render_play_area(chunks[1], buf),
        }
        self.render_footer(chunks[2], buf);
    }
}

impl Presenter for UiModel {
    fn show_target(&mut self, hint: PositionHint, size: u32) {
        self.target = Some(Target { hint, size });
    }

    fn hide_target(&mut self) {
        self.target = None;
        self.target_rect.set(None);
    }

    fn set_round_label(&mut self, text: String) {
        self.round_label = text;
    }

    fn set_countdown_label(&mut self, text: String) {
        self.countdown_label = text;
    }

    fn notify_streak(&mut self, count: u32) {
        self.streak_banner = Some((count, Instant::now()));
    }

    fn notify_perfect(&mut self) {
        self.perfect_banner = Some(Instant::now());
    }

    fn render_summary(&mut self, summary: ScoreSummary) {
        self.summary = Some(summary);
    }

    fn render_leaderboard(&mut self, entries: Vec<LeaderboardEntry>) {
        self.leaderboard = entries;
    }

    fn render_stats(&mut self, stats: PlayerStats) {
        self.stats = stats;
    }
}
