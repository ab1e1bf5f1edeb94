//! General utilities shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::protocol_constants::MAX_RAW_VOLUME;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Volume Scaling
// ─────────────────────────────────────────────────────────────────────────────

/// Converts a percentage (clamped to 0-100) to the collaborator's raw 0-65535 scale.
#[must_use]
pub fn percent_to_raw(percent: f64) -> u16 {
    let clamped = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    ((clamped / 100.0) * f64::from(MAX_RAW_VOLUME)).round() as u16
}

/// Converts a raw volume to a percentage of [`MAX_RAW_VOLUME`].
#[must_use]
pub fn raw_to_percent(raw: u16) -> f64 {
    (f64::from(raw) / f64::from(MAX_RAW_VOLUME)) * 100.0
}

/// Clamps an arbitrary raw value into the 0-65535 range.
#[must_use]
pub fn clamp_raw(raw: f64) -> u16 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(MAX_RAW_VOLUME)).round() as u16
}
