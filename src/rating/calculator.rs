//! Pure Elo calculations for multi-entrant contests
//!
//! Everything in this module is a stateless function of its arguments: pairwise
//! expected score, the linear rank-to-score mapping, expected rank within a
//! field, the field-size K-factor policy and the single-contest rating delta.

use crate::config::{RatingConfig, StatusPenalties};
use crate::types::{OutcomeStatus, Placement};
use skillratings::elo::{expected_score as elo_expected_score, EloRating};

/// Probability that an entity rated `rating_a` beats one rated `rating_b`.
///
/// `1 / (1 + 10^((rating_b - rating_a) / 400))`, so equal ratings give exactly 0.5.
pub fn expected_score(rating_a: i32, rating_b: i32) -> f64 {
    let (score_a, _score_b) = elo_expected_score(
        &EloRating {
            rating: f64::from(rating_a),
        },
        &EloRating {
            rating: f64::from(rating_b),
        },
    );
    score_a
}

/// Map a finishing rank to `[0, 1]`: the winner scores 1.0 and last place 0.0.
///
/// A field of one scores its only rank as 1.0. Ranks that are not finite, below
/// 1 or beyond the field score 0.0. Fractional ranks are accepted so expected
/// ranks share the same scale as actual ones.
pub fn position_score(rank: f64, field_size: usize) -> f64 {
    let n = field_size as f64;
    if field_size == 0 || !rank.is_finite() || rank < 1.0 || rank > n {
        return 0.0;
    }
    if field_size == 1 {
        return 1.0;
    }
    (n - rank) / (n - 1.0)
}

/// `position_score` for a recorded rank, where an absent rank scores 0.0
pub fn classified_score(rank: Option<u32>, field_size: usize) -> f64 {
    rank.map_or(0.0, |rank| position_score(f64::from(rank), field_size))
}

/// Rank this rating is expected to reach against `opponents` (self excluded).
///
/// One plus the sum of each opponent's probability of finishing ahead. Ties
/// split evenly: four equal ratings expect 2.5. With no opponents the result is
/// 1.0, and it tends to 1.0 or to the field size as the rating dominates or is
/// dominated by every opponent. Summation follows slice order.
pub fn expected_rank(rating: i32, opponents: &[i32]) -> f64 {
    1.0 + opponents
        .iter()
        .map(|&opponent| expected_score(opponent, rating))
        .sum::<f64>()
}

/// K-factor for a field of `field_size` entrants.
///
/// Equal to `base_k_factor` at the reference field size, growing with the log of
/// the field and clamped to `[0.5, 1.5]` times the base.
pub fn k_factor_for_field(field_size: usize, config: &RatingConfig) -> f64 {
    let n = field_size.max(1) as f64;
    let reference = config.reference_field_size.max(2) as f64;
    let scale = 0.5 * (1.0 + n.ln() / reference.ln());
    config.base_k_factor * scale.clamp(0.5, 1.5)
}

/// Fixed loss for an unclassified entry, always below `-round(k_factor)` and
/// never smaller than the configured minimum loss
pub fn status_penalty(status: OutcomeStatus, k_factor: f64, penalties: &StatusPenalties) -> i32 {
    let factor = match status {
        OutcomeStatus::Finished => return 0,
        OutcomeStatus::Retired => penalties.retired,
        OutcomeStatus::Dnf => penalties.dnf,
        OutcomeStatus::Disqualified => penalties.disqualified,
    };
    let worst_finish = k_factor.round() as i32;
    (-(k_factor * factor).round() as i32)
        .min(-worst_finish - 1)
        .min(-penalties.minimum_loss)
}

/// Signed rating change for one entrant in one contest.
///
/// Classified entries move by `k_factor * (actual - expected)` with both sides on
/// the `position_score` scale. Unclassified entries take the status penalty
/// regardless of expectation.
pub fn rating_delta(
    placement: Placement,
    expected_rank: f64,
    field_size: usize,
    k_factor: f64,
    penalties: &StatusPenalties,
) -> i32 {
    match placement {
        Placement::Classified { rank } => {
            let actual = classified_score(Some(rank), field_size);
            let expected = position_score(expected_rank, field_size);
            (k_factor * (actual - expected)).round() as i32
        }
        other => status_penalty(other.status(), k_factor, penalties),
    }
}

/// New rating after applying `delta`, clamped to the floor
pub fn apply_floor(old_rating: i32, delta: i32, rating_floor: i32) -> i32 {
    old_rating.saturating_add(delta).max(rating_floor)
}
