//! Pure scoring functions over a session's reaction samples.
//!
//! Everything here is a function of the multiset of samples (plus the
//! perfect-tap count); nothing touches the clock, the store, or the UI.

pub const IQ_FLOOR: i32 = 70;
pub const IQ_CEIL: i32 = 160;

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Population standard deviation (divide by n, not n-1).
pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / count as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// Arithmetic mean reaction time; 0.0 for an empty session.
pub fn average_ms(samples: &[f64]) -> f64 {
    mean(samples).unwrap_or(0.0)
}

/// Inverse relative spread as a percentage in [0, 100].
///
/// Fewer than 2 samples (or a zero average) yields 0 rather than a
/// division blowup.
pub fn consistency_pct(samples: &[f64]) -> u8 {
    if samples.len() < 2 {
        return 0;
    }
    let avg = average_ms(samples);
    if avg <= 0.0 {
        return 0;
    }
    let sd = std_dev(samples).unwrap_or(0.0);
    let pct = (100.0 * (1.0 - sd / avg).max(0.0)).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Composite "IQ" presented to the player. Not a psychometric measure;
/// faster average and tighter spread push it up, each perfect tap adds a
/// small bonus, and the result is clamped to [IQ_FLOOR, IQ_CEIL].
pub fn iq_estimate(samples: &[f64], perfects: u32) -> i32 {
    if samples.is_empty() {
        return IQ_FLOOR;
    }
    let avg = average_ms(samples);
    let sd = std_dev(samples).unwrap_or(0.0);

    let reaction_factor = (150.0 - (avg - 250.0) * 0.2).max(0.0);
    let consistency_factor = if avg > 0.0 {
        (1.0 - sd / avg).max(0.0)
    } else {
        0.0
    };
    let perfect_bonus = perfects as f64 * 2.0;

    let iq = (100.0 + (reaction_factor - 100.0) * 0.7 + consistency_factor * 20.0 + perfect_bonus)
        .round() as i32;
    iq.clamp(IQ_FLOOR, IQ_CEIL)
}

/// Final results of one completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub average_ms: f64,
    pub iq_estimate: i32,
    pub consistency_pct: u8,
    pub perfects: u32,
    pub best_streak: u32,
    pub duration_secs: f64,
}

impl ScoreSummary {
    pub fn compute(samples: &[f64], perfects: u32, best_streak: u32, duration_secs: f64) -> Self {
        Self {
            average_ms: average_ms(samples),
            iq_estimate: iq_estimate(samples, perfects),
            consistency_pct: consistency_pct(samples),
            perfects,
            best_streak,
            duration_secs,
        }
    }

    /// Encouragement line shown under the numbers.
    pub fn verdict(&self) -> &'static str {
        if self.average_ms == 0.0 {
            "Try tapping the dot!"
        } else if self.average_ms > 600.0 {
            "Keep practicing!"
        } else if self.average_ms > 400.0 {
            "Nice! You're quick!"
        } else if self.average_ms > 300.0 {
            "Great job!"
        } else {
            "Incredible reflexes!"
        }
    }
}
