//! Confidence helpers shared by the collector and the scorer

/// Clamp a confidence into [0.0, 1.0]; NaN becomes 0.0
pub fn clamp(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Staleness decay factor using a half-life model
///
/// `0.5^(age / half_life)`; a zero half-life means any age is fully stale.
pub fn staleness_factor(age_ms: u64, half_life_ms: u64) -> f64 {
    if age_ms == 0 {
        return 1.0;
    }
    if half_life_ms == 0 {
        return 0.0;
    }

    let half_lives = age_ms as f64 / half_life_ms as f64;
    0.5_f64.powf(half_lives)
}

/// Confidence of a cached signal of the given age
///
/// Older entries never score higher than fresher ones.
pub fn decayed(confidence: f64, age_ms: u64, half_life_ms: u64) -> f64 {
    clamp(clamp(confidence) * staleness_factor(age_ms, half_life_ms))
}
