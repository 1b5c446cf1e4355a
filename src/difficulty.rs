use clap::ValueEnum;

/// Selectable difficulty levels, fixed set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Lowercase name used for config files and leaderboard rows.
    pub fn name(&self) -> String {
        self.to_string().to_lowercase()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name() == name.to_lowercase())
    }

    pub fn profile(&self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                rounds: 10,
                target_size: 60,
                min_delay_ms: 400,
                max_delay_ms: 1200,
                perfect_threshold_ms: 300,
            },
            Difficulty::Medium => DifficultyProfile {
                rounds: 15,
                target_size: 50,
                min_delay_ms: 300,
                max_delay_ms: 1000,
                perfect_threshold_ms: 250,
            },
            Difficulty::Hard => DifficultyProfile {
                rounds: 20,
                target_size: 40,
                min_delay_ms: 200,
                max_delay_ms: 800,
                perfect_threshold_ms: 200,
            },
            Difficulty::Expert => DifficultyProfile {
                rounds: 25,
                target_size: 30,
                min_delay_ms: 150,
                max_delay_ms: 600,
                perfect_threshold_ms: 150,
            },
        }
    }
}

/// Per-session tuning. Applied atomically at session start and immutable
/// until the session ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DifficultyProfile {
    pub rounds: u32,
    /// Nominal target size in pixels; the UI scales it to terminal cells.
    pub target_size: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub perfect_threshold_ms: u64,
}

impl DifficultyProfile {
    /// Repair a malformed profile so a sampled delay can never be negative.
    /// `rounds` is forced to at least 1.
    pub fn sanitized(mut self) -> Self {
        if self.max_delay_ms < self.min_delay_ms {
            self.max_delay_ms = self.min_delay_ms;
        }
        if self.rounds == 0 {
            self.rounds = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_name(&d.name()), Some(d));
        }
        assert_eq!(Difficulty::from_name("Expert"), Some(Difficulty::Expert));
        assert_eq!(Difficulty::from_name("nightmare"), None);
    }

    #[test]
    fn profiles_have_sane_delay_bounds() {
        for d in Difficulty::ALL {
            let p = d.profile();
            assert!(p.min_delay_ms <= p.max_delay_ms);
            assert!(p.rounds >= 1);
            assert!(p.perfect_threshold_ms > 0);
        }
    }

    #[test]
    fn harder_profiles_demand_more() {
        let easy = Difficulty::Easy.profile();
        let expert = Difficulty::Expert.profile();
        assert!(expert.rounds > easy.rounds);
        assert!(expert.target_size < easy.target_size);
        assert!(expert.perfect_threshold_ms < easy.perfect_threshold_ms);
    }

    #[test]
    fn sanitized_repairs_inverted_bounds() {
        let broken = DifficultyProfile {
            rounds: 0,
            target_size: 40,
            min_delay_ms: 900,
            max_delay_ms: 300,
            perfect_threshold_ms: 200,
        };
        let fixed = broken.sanitized();
        assert_eq!(fixed.max_delay_ms, 900);
        assert_eq!(fixed.rounds, 1);
    }
}
