//! Rating update engine
//!
//! Applies the calculator across one contest's full result set. Every delta in
//! the returned batch is computed from the same pre-contest snapshot, so
//! per-entrant work runs in parallel and the batch is applied all at once.

use crate::config::RatingConfig;
use crate::rating::calculator::{apply_floor, expected_rank, k_factor_for_field, rating_delta};
use crate::types::{Contest, ContestUpdate, EntityId, EntityKind, Placement, RatingDelta, RatingSnapshot};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::trace;

/// One member of a rated field. Entrants without a placement still count
/// toward everyone else's expected rank but receive no delta.
#[derive(Debug, Clone)]
struct Entrant<'a> {
    entity_id: &'a str,
    rating: i32,
    placement: Option<Placement>,
}

/// Compute driver and team deltas for one contest against `snapshot`.
///
/// Entities missing from the snapshot start at the configured base rating and
/// report it as their old rating. An empty contest yields an empty update.
pub fn update_contest(
    contest: &Contest,
    snapshot: &RatingSnapshot,
    config: &RatingConfig,
) -> ContestUpdate {
    if contest.entries().is_empty() {
        return ContestUpdate::empty(contest.contest_id());
    }

    let drivers: Vec<Entrant> = contest
        .entries()
        .iter()
        .map(|entry| Entrant {
            entity_id: &entry.entity_id,
            rating: snapshot.rating_or(EntityKind::Driver, &entry.entity_id, config.base_rating),
            placement: Some(entry.placement),
        })
        .collect();

    let teams = team_field(contest, snapshot, config);

    ContestUpdate {
        contest_id: contest.contest_id().to_string(),
        drivers: rate_field(contest.contest_id(), EntityKind::Driver, &drivers, config),
        teams: rate_field(contest.contest_id(), EntityKind::Team, &teams, config),
    }
}

/// Teams present in the contest, placed by their best classified entrant.
///
/// Classified teams are ranked 1..m by that entrant's finishing rank. Teams
/// with no classified entrant stay in the field without a placement.
fn team_field<'a>(
    contest: &'a Contest,
    snapshot: &RatingSnapshot,
    config: &RatingConfig,
) -> Vec<Entrant<'a>> {
    let mut best_ranks: Vec<(&'a str, Option<u32>)> = Vec::new();

    for entry in contest.entries() {
        let Some(team_id) = entry.team_id.as_deref() else {
            continue;
        };
        let rank = entry.placement.rank();
        match best_ranks.iter_mut().find(|(id, _)| *id == team_id) {
            Some((_, best)) => {
                *best = match (*best, rank) {
                    (Some(current), Some(rank)) => Some(current.min(rank)),
                    (current, rank) => current.or(rank),
                };
            }
            None => best_ranks.push((team_id, rank)),
        }
    }

    let mut classified: Vec<(u32, &str)> = best_ranks
        .iter()
        .filter_map(|(id, best)| best.map(|rank| (rank, *id)))
        .collect();
    classified.sort();

    best_ranks
        .iter()
        .map(|&(team_id, _)| {
            let placement = classified
                .iter()
                .position(|(_, id)| *id == team_id)
                .map(|index| Placement::Classified {
                    rank: index as u32 + 1,
                });
            Entrant {
                entity_id: team_id,
                rating: snapshot.rating_or(EntityKind::Team, team_id, config.base_rating),
                placement,
            }
        })
        .collect()
}

fn rate_field(
    contest_id: &str,
    kind: EntityKind,
    field: &[Entrant],
    config: &RatingConfig,
) -> BTreeMap<EntityId, RatingDelta> {
    let field_size = field.len();
    let k_factor = k_factor_for_field(field_size, config);
    let ratings: Vec<i32> = field.iter().map(|entrant| entrant.rating).collect();

    let deltas: Vec<RatingDelta> = field
        .par_iter()
        .enumerate()
        .filter_map(|(index, entrant)| {
            let placement = entrant.placement?;
            let opponents: Vec<i32> = ratings
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, rating)| *rating)
                .collect();

            let expected = expected_rank(entrant.rating, &opponents);
            let delta = rating_delta(placement, expected, field_size, k_factor, &config.penalties);
            let new_rating = apply_floor(entrant.rating, delta, config.rating_floor);

            trace!(
                "{} {} in {}: expected rank {:.3}, placement {:?}, {} -> {}",
                kind,
                entrant.entity_id,
                contest_id,
                expected,
                placement,
                entrant.rating,
                new_rating
            );

            Some(RatingDelta {
                entity_id: entrant.entity_id.to_string(),
                kind,
                contest_id: contest_id.to_string(),
                old_rating: entrant.rating,
                new_rating,
                change: new_rating - entrant.rating,
                actual_rank: placement.rank(),
                expected_rank: expected,
            })
        })
        .collect();

    deltas
        .into_iter()
        .map(|delta| (delta.entity_id.clone(), delta))
        .collect()
}
