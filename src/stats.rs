use crate::app_dirs::AppDirs;
use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Leaderboard never holds more than this many entries.
pub const LEADERBOARD_CAP: usize = 5;

/// One persisted leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub average_ms: f64,
    pub iq_estimate: i32,
    pub consistency_pct: u8,
    pub perfects: u32,
    pub timestamp: DateTime<Local>,
    pub difficulty: String,
}

/// Lifetime bests. `best_average_ms` only ever decreases, `best_iq` only
/// ever increases, `total_games` only increments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStats {
    pub best_average_ms: Option<f64>,
    pub best_iq: Option<i32>,
    pub total_games: u32,
}

impl PlayerStats {
    pub fn is_empty(&self) -> bool {
        self.best_average_ms.is_none() && self.best_iq.is_none() && self.total_games == 0
    }

    /// Fold one finished game into the lifetime stats. Worse results leave
    /// the bests untouched.
    pub fn record_game(&mut self, average_ms: f64, iq: i32) {
        self.total_games += 1;
        match self.best_average_ms {
            Some(best) if average_ms >= best => {}
            _ => self.best_average_ms = Some(average_ms),
        }
        match self.best_iq {
            Some(best) if iq <= best => {}
            _ => self.best_iq = Some(iq),
        }
    }
}

/// Insert an entry, keep the board sorted ascending by average reaction
/// time, and drop everything past the cap.
pub fn push_capped(entries: &mut Vec<LeaderboardEntry>, entry: LeaderboardEntry) {
    entries.push(entry);
    *entries = entries
        .drain(..)
        .sorted_by(|a, b| {
            a.average_ms
                .partial_cmp(&b.average_ms)
                .unwrap_or(Ordering::Equal)
        })
        .take(LEADERBOARD_CAP)
        .collect();
}

/// Storage interface for the leaderboard and lifetime stats. Loads fall
/// back to empty defaults so missing or corrupt data never blocks a game.
pub trait ScoreStore {
    fn load_stats(&self) -> PlayerStats;
    fn save_stats(&self, stats: &PlayerStats) -> Result<()>;
    fn load_leaderboard(&self) -> Vec<LeaderboardEntry>;
    fn save_leaderboard(&self, entries: &[LeaderboardEntry]) -> Result<()>;
    fn reset_all(&self) -> Result<()>;
}

/// SQLite-backed store.
#[derive(Debug)]
pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    /// Open (creating if needed) the database at the standard location.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("blip_scores.db"));
        Self::open(&db_path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Throwaway store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS leaderboard (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                average_ms REAL NOT NULL,
                iq INTEGER NOT NULL,
                consistency INTEGER NOT NULL,
                perfects INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                difficulty TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS player_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                best_average_ms REAL,
                best_iq INTEGER,
                total_games INTEGER NOT NULL DEFAULT 0
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_leaderboard_avg ON leaderboard(average_ms)",
            [],
        )?;

        Ok(ScoreDb { conn })
    }
}

impl ScoreStore for ScoreDb {
    fn load_stats(&self) -> PlayerStats {
        let row = self
            .conn
            .query_row(
                "SELECT best_average_ms, best_iq, total_games FROM player_stats WHERE id = 1",
                [],
                |row| {
                    Ok(PlayerStats {
                        best_average_ms: row.get(0)?,
                        best_iq: row.get(1)?,
                        total_games: row.get::<_, i64>(2)?.max(0) as u32,
                    })
                },
            )
            .optional();
        match row {
            Ok(Some(stats)) => stats,
            _ => PlayerStats::default(),
        }
    }

    fn save_stats(&self, stats: &PlayerStats) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO player_stats (id, best_average_ms, best_iq, total_games)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                best_average_ms = excluded.best_average_ms,
                best_iq = excluded.best_iq,
                total_games = excluded.total_games
            "#,
            params![stats.best_average_ms, stats.best_iq, stats.total_games],
        )?;
        Ok(())
    }

    fn load_leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut stmt = match self.conn.prepare(
            r#"
            SELECT average_ms, iq, consistency, perfects, timestamp, difficulty
            FROM leaderboard
            ORDER BY average_ms ASC
            LIMIT ?1
            "#,
        ) {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };

        let rows = stmt.query_map([LEADERBOARD_CAP as i64], |row| {
            let timestamp_str: String = row.get(4)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|t| t.with_timezone(&Local))
                .unwrap_or_else(|_| Local::now());
            Ok(LeaderboardEntry {
                average_ms: row.get(0)?,
                iq_estimate: row.get(1)?,
                consistency_pct: row.get::<_, i64>(2)?.clamp(0, 100) as u8,
                perfects: row.get::<_, i64>(3)?.max(0) as u32,
                timestamp,
                difficulty: row.get(5)?,
            })
        });

        // Unreadable rows are skipped rather than surfaced; a damaged
        // leaderboard degrades to a shorter one.
        match rows {
            Ok(iter) => iter.flatten().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn save_leaderboard(&self, entries: &[LeaderboardEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM leaderboard", [])?;
        for entry in entries.iter().take(LEADERBOARD_CAP) {
            tx.execute(
                r#"
                INSERT INTO leaderboard
                (average_ms, iq, consistency, perfects, timestamp, difficulty)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    entry.average_ms,
                    entry.iq_estimate,
                    entry.consistency_pct as i64,
                    entry.perfects as i64,
                    entry.timestamp.to_rfc3339(),
                    entry.difficulty,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn reset_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM leaderboard", [])?;
        self.conn.execute("DELETE FROM player_stats", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(avg: f64) -> LeaderboardEntry {
        LeaderboardEntry {
            average_ms: avg,
            iq_estimate: 100,
            consistency_pct: 80,
            perfects: 2,
            timestamp: Local::now(),
            difficulty: "easy".to_string(),
        }
    }

    #[test]
    fn push_capped_keeps_five_fastest_sorted() {
        let mut board = Vec::new();
        for avg in [450.0, 300.0, 500.0, 250.0, 400.0, 350.0] {
            push_capped(&mut board, entry(avg));
        }
        assert_eq!(board.len(), LEADERBOARD_CAP);
        let avgs: Vec<f64> = board.iter().map(|e| e.average_ms).collect();
        assert_eq!(avgs, vec![250.0, 300.0, 350.0, 400.0, 450.0]);
    }

    #[test]
    fn record_game_is_monotonic() {
        let mut stats = PlayerStats::default();
        stats.record_game(400.0, 110);
        assert_eq!(stats.best_average_ms, Some(400.0));
        assert_eq!(stats.best_iq, Some(110));
        assert_eq!(stats.total_games, 1);

        // A worse game leaves the bests alone.
        stats.record_game(500.0, 90);
        assert_eq!(stats.best_average_ms, Some(400.0));
        assert_eq!(stats.best_iq, Some(110));
        assert_eq!(stats.total_games, 2);

        // A better game improves them.
        stats.record_game(350.0, 130);
        assert_eq!(stats.best_average_ms, Some(350.0));
        assert_eq!(stats.best_iq, Some(130));
        assert_eq!(stats.total_games, 3);
    }

    #[test]
    fn stats_roundtrip() {
        let db = ScoreDb::open_in_memory().unwrap();
        assert_eq!(db.load_stats(), PlayerStats::default());

        let stats = PlayerStats {
            best_average_ms: Some(312.5),
            best_iq: Some(128),
            total_games: 7,
        };
        db.save_stats(&stats).unwrap();
        assert_eq!(db.load_stats(), stats);

        // Saving again overwrites in place, no duplicate singleton row.
        db.save_stats(&stats).unwrap();
        assert_eq!(db.load_stats(), stats);
    }

    #[test]
    fn leaderboard_roundtrip_preserves_order() {
        let db = ScoreDb::open_in_memory().unwrap();
        assert!(db.load_leaderboard().is_empty());

        let mut board = Vec::new();
        for avg in [420.0, 280.0, 330.0] {
            push_capped(&mut board, entry(avg));
        }
        db.save_leaderboard(&board).unwrap();

        let loaded = db.load_leaderboard();
        let avgs: Vec<f64> = loaded.iter().map(|e| e.average_ms).collect();
        assert_eq!(avgs, vec![280.0, 330.0, 420.0]);
        assert_eq!(loaded[0].difficulty, "easy");
    }

    #[test]
    fn save_leaderboard_enforces_cap() {
        let db = ScoreDb::open_in_memory().unwrap();
        let board: Vec<LeaderboardEntry> =
            (0..8).map(|i| entry(300.0 + i as f64 * 10.0)).collect();
        db.save_leaderboard(&board).unwrap();
        assert_eq!(db.load_leaderboard().len(), LEADERBOARD_CAP);
    }

    #[test]
    fn reset_all_clears_everything() {
        let db = ScoreDb::open_in_memory().unwrap();
        db.save_leaderboard(&[entry(300.0)]).unwrap();
        let mut stats = PlayerStats::default();
        stats.record_game(300.0, 120);
        db.save_stats(&stats).unwrap();

        db.reset_all().unwrap();
        assert!(db.load_leaderboard().is_empty());
        assert!(db.load_stats().is_empty());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.db");
        {
            let db = ScoreDb::open(&path).unwrap();
            db.save_leaderboard(&[entry(275.0)]).unwrap();
        }
        let db = ScoreDb::open(&path).unwrap();
        assert_eq!(db.load_leaderboard().len(), 1);
        assert_eq!(db.load_leaderboard()[0].average_ms, 275.0);
    }
}
