//! Alternative ranking.
//!
//! [`rank`] generates simulated secondary candidates for a primary
//! classification. [`normalize`] applies the same output contract to
//! candidates produced by a real model or a mock: no primary type, no
//! duplicates, confidence strictly below the primary, sorted descending.

use std::cmp::Ordering;

use rand::Rng;

use crate::cable::CableType;

use super::geometry::BoundingBox;
use super::result::{unit_confidence, AlternativeDetection};

/// Confidence drop per alternative position.
pub const CONFIDENCE_STEP: f32 = 0.15;
/// Upper bound (exclusive) of the random jitter subtracted per alternative.
pub const MAX_JITTER: f32 = 0.1;
/// Alternatives are never reported below this confidence.
pub const CONFIDENCE_FLOOR: f32 = 0.1;
/// Default cap on reported alternatives.
pub const DEFAULT_MAX_ALTERNATIVES: usize = 3;

/// Simulated alternatives for `primary`.
///
/// The i-th candidate of the pool (`CableType::ALL` without `primary`) gets
/// `max(0.1, primary_confidence - (i + 1) * 0.15 - jitter)`.
pub fn rank<R: Rng + ?Sized>(
    primary: CableType,
    primary_confidence: f32,
    max_alternatives: usize,
    rng: &mut R,
) -> Vec<AlternativeDetection> {
    let pool = CableType::ALL.into_iter().filter(|t| *t != primary);

    let mut alternatives = Vec::new();
    for (i, cable_type) in pool.take(max_alternatives).enumerate() {
        let jitter: f32 = rng.gen_range(0.0..MAX_JITTER);
        let confidence = (primary_confidence - (i as f32 + 1.0) * CONFIDENCE_STEP - jitter)
            .max(CONFIDENCE_FLOOR);
        // The floor can reach a primary that is already near 0.1.
        if confidence >= primary_confidence {
            continue;
        }
        alternatives.push(AlternativeDetection::new(
            cable_type,
            confidence,
            Some(sample_box(rng)),
        ));
    }

    sort_descending(&mut alternatives);
    alternatives
}

/// Bring externally produced candidates into the ranking contract.
pub fn normalize(
    primary: CableType,
    primary_confidence: f32,
    candidates: Vec<AlternativeDetection>,
    max_alternatives: usize,
) -> Vec<AlternativeDetection> {
    let offered = candidates.len();
    let mut kept = screen(primary, primary_confidence, candidates);

    let invalid = offered - kept.len();
    if invalid > 0 {
        log::debug!(
            "dropped {} invalid of {} alternative candidates for {}",
            invalid,
            offered,
            primary
        );
    }
    let truncated = kept.len().saturating_sub(max_alternatives);
    if truncated > 0 {
        log::debug!(
            "truncated {} alternatives for {} to {}",
            truncated,
            primary,
            max_alternatives
        );
    }
    kept.truncate(max_alternatives);
    kept
}

/// Valid candidates only, best first, one per type: drops the primary type,
/// non-finite scores and scores not strictly below the primary.
fn screen(
    primary: CableType,
    primary_confidence: f32,
    candidates: Vec<AlternativeDetection>,
) -> Vec<AlternativeDetection> {
    let mut kept: Vec<AlternativeDetection> = candidates
        .into_iter()
        .filter(|c| c.cable_type() != primary)
        .filter_map(|c| {
            let confidence = unit_confidence(c.confidence())?;
            (confidence < primary_confidence).then(|| c.with_confidence(confidence))
        })
        .collect();

    sort_descending(&mut kept);

    // Sorted, so the first entry per type is its best score.
    let mut seen = [false; CableType::ALL.len()];
    kept.retain(|c| !std::mem::replace(&mut seen[c.cable_type().index()], true));
    kept
}

/// Random box in the region the simulated camera framing favours.
pub(crate) fn sample_box<R: Rng + ?Sized>(rng: &mut R) -> BoundingBox {
    BoundingBox::clamped(
        rng.gen_range(0.1..=0.3),
        rng.gen_range(0.2..=0.4),
        rng.gen_range(0.4..=0.6),
        rng.gen_range(0.2..=0.4),
    )
}

// Stable: ties keep pool order.
fn sort_descending(alternatives: &mut [AlternativeDetection]) {
    alternatives.sort_by(|a, b| {
        b.confidence()
            .partial_cmp(&a.confidence())
            .unwrap_or(Ordering::Equal)
    });
}
