//! Fix quality comparator.
//!
//! Decides whether a newly observed fix should replace the fix currently held
//! as best. Time dominates beyond a two-minute window; inside the window,
//! accuracy dominates unless same-source recency tips the balance.
//!
//! # Decision Order
//!
//! ```text
//! current == None                         -> better
//! Δt >  2 min                             -> better   (significantly newer)
//! Δt < -2 min                             -> worse    (significantly older)
//! Δa <  0                                 -> better   (more accurate)
//! Δt >= 0 && Δa <= 0                      -> better   (not older, not less accurate)
//! Δt >= 0 && Δa <= 200m && same source    -> better   (same-source recency)
//! otherwise                               -> worse
//! ```
//!
//! Where `Δt = candidate.timestamp - current.timestamp` and
//! `Δa = candidate.accuracy - current.accuracy`. All thresholds are strict:
//! exactly ±2 minutes is not "significant", and an accuracy loss of exactly
//! 200m is not "significantly less accurate".

use std::time::Duration;

use crate::fix::Fix;

/// Time difference beyond which the newer fix wins regardless of accuracy.
pub const SIGNIFICANT_TIME_DELTA: Duration = Duration::from_secs(2 * 60);

/// Accuracy loss (meters) beyond which a same-source newer fix is rejected.
pub const SIGNIFICANT_ACCURACY_LOSS_METERS: f64 = 200.0;

const SIGNIFICANT_TIME_DELTA_MS: i64 = SIGNIFICANT_TIME_DELTA.as_millis() as i64;

/// Returns true if `candidate` should replace `current`.
///
/// Pure and total: any candidate beats no fix at all.
///
/// # Example
///
/// ```
/// use fixfinder::comparator::is_better;
/// use fixfinder::fix::{Fix, FixSource, FixTime};
///
/// let held = Fix::new(53.5, 10.0, 50.0, FixSource::Network, FixTime::from_millis(0));
/// let gps = Fix::new(53.5, 10.0, 8.0, FixSource::Precise, FixTime::from_millis(5_000));
///
/// assert!(is_better(&gps, None));
/// assert!(is_better(&gps, Some(&held)));
/// assert!(!is_better(&held, Some(&gps)));
/// ```
pub fn is_better(candidate: &Fix, current: Option<&Fix>) -> bool {
    let Some(current) = current else {
        return true;
    };

    let time_delta = candidate.timestamp().delta_millis(current.timestamp());
    if time_delta > SIGNIFICANT_TIME_DELTA_MS {
        // Subject has likely moved since the held fix.
        return true;
    }
    if time_delta < -SIGNIFICANT_TIME_DELTA_MS {
        return false;
    }

    let accuracy_delta = candidate.accuracy() - current.accuracy();
    let is_more_accurate = accuracy_delta < 0.0;
    let is_less_accurate = accuracy_delta > 0.0;
    let is_significantly_less_accurate = accuracy_delta > SIGNIFICANT_ACCURACY_LOSS_METERS;
    let is_not_older = time_delta >= 0;
    let is_same_source = candidate.source() == current.source();

    if is_more_accurate {
        true
    } else if is_not_older && !is_less_accurate {
        true
    } else {
        is_not_older && !is_significantly_less_accurate && is_same_source
    }
}

/// Pick the better of two optional fixes.
///
/// Returns `incumbent` unless `challenger` is better according to [`is_better`].
pub fn pick_better<'a>(incumbent: Option<&'a Fix>, challenger: Option<&'a Fix>) -> Option<&'a Fix> {
    match challenger {
        Some(candidate) if is_better(candidate, incumbent) => Some(candidate),
        _ => incumbent,
    }
}
