//! Scoring issued predictions against recorded results

use crate::types::{AccuracyRecord, Contest, PredictionSet};
use serde::{Deserialize, Serialize};

/// Score `prediction` against the finishing order of `contest`.
///
/// Brier score and log loss are averaged over the prediction's entrants,
/// treating "finished first" as the binary outcome. Probabilities are clipped
/// to `[clip, 1 - clip]` before taking logarithms. When no entrant holds rank 1
/// (the winner was later excluded) every outcome is zero and no favourite can
/// be right. Returns `None` when there is nothing to score: an empty
/// prediction, or a contest with no classified finisher.
pub fn evaluate(
    contest: &Contest,
    prediction: &PredictionSet,
    probability_clip: f64,
) -> Option<AccuracyRecord> {
    if prediction.is_empty() || contest.classified().next().is_none() {
        return None;
    }
    let winner = contest.winner().map(|entry| entry.entity_id.as_str());

    let count = prediction.entries.len() as f64;
    let mut brier_total = 0.0;
    let mut log_loss_total = 0.0;

    for entry in &prediction.entries {
        let p = entry.win_probability / 100.0;
        let y = if Some(entry.entity_id.as_str()) == winner {
            1.0
        } else {
            0.0
        };

        brier_total += (p - y).powi(2);

        let clipped = p.clamp(probability_clip, 1.0 - probability_clip);
        log_loss_total -= y * clipped.ln() + (1.0 - y) * (1.0 - clipped).ln();
    }

    let favourites = prediction.favourites(3);
    let correct_winner = favourites
        .first()
        .is_some_and(|favourite| Some(favourite.entity_id.as_str()) == winner);
    let top_3_hits = contest
        .classified()
        .take(3)
        .filter(|entry| {
            favourites
                .iter()
                .any(|favourite| favourite.entity_id == entry.entity_id)
        })
        .count();

    Some(AccuracyRecord {
        contest_id: contest.contest_id().to_string(),
        model_version: prediction.model_version.clone(),
        brier_score: brier_total / count,
        log_loss: log_loss_total / count,
        correct_winner,
        top_3_accuracy: top_3_hits >= 2,
    })
}

/// Aggregate accuracy over many evaluated contests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub count: usize,
    pub mean_brier: f64,
    pub mean_log_loss: f64,
    pub winner_hit_rate: f64,
    pub top_3_hit_rate: f64,
}

impl AccuracySummary {
    pub fn from_records(records: &[AccuracyRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let n = records.len() as f64;
        let rate = |hits: usize| hits as f64 / n;

        Self {
            count: records.len(),
            mean_brier: records.iter().map(|r| r.brier_score).sum::<f64>() / n,
            mean_log_loss: records.iter().map(|r| r.log_loss).sum::<f64>() / n,
            winner_hit_rate: rate(records.iter().filter(|r| r.correct_winner).count()),
            top_3_hit_rate: rate(records.iter().filter(|r| r.top_3_accuracy).count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContestEntry, Placement, PredictionEntry};
    use chrono::NaiveDate;

    const CLIP: f64 = 1e-4;

    fn contest(order: &[&str]) -> Contest {
        let entries = order
            .iter()
            .enumerate()
            .map(|(i, driver)| ContestEntry::finished(*driver, i as u32 + 1))
            .collect();
        Contest::new("monaco", NaiveDate::from_ymd_opt(2024, 5, 26).unwrap(), entries).unwrap()
    }

    fn prediction(entries: &[(&str, f64)]) -> PredictionSet {
        PredictionSet {
            contest_id: "monaco".to_string(),
            model_version: "elo-v1".to_string(),
            entries: entries
                .iter()
                .map(|(id, p)| PredictionEntry {
                    entity_id: id.to_string(),
                    rating: 1500,
                    win_probability: *p,
                })
                .collect(),
        }
    }

    #[test]
    fn test_certain_and_right() {
        let record = evaluate(&contest(&["a", "b"]), &prediction(&[("a", 100.0)]), CLIP).unwrap();
        assert_eq!(record.brier_score, 0.0);
        assert!(record.correct_winner);
        assert!(record.log_loss < 1e-3);
        assert_eq!(record.model_version, "elo-v1");
    }

    #[test]
    fn test_certain_and_wrong() {
        let record = evaluate(&contest(&["b", "a"]), &prediction(&[("a", 100.0)]), CLIP).unwrap();
        assert_eq!(record.brier_score, 1.0);
        assert!(!record.correct_winner);
        // clipped rather than infinite
        assert!((record.log_loss - -(CLIP.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_correct_winner_independent_of_scores() {
        let race = contest(&["a", "b", "c", "d"]);
        let close = prediction(&[("a", 26.0), ("b", 25.0), ("c", 25.0), ("d", 24.0)]);
        let confident_miss = prediction(&[("b", 97.0), ("a", 1.0), ("c", 1.0), ("d", 1.0)]);

        let close = evaluate(&race, &close, CLIP).unwrap();
        let miss = evaluate(&race, &confident_miss, CLIP).unwrap();
        assert!(close.correct_winner);
        assert!(!miss.correct_winner);
        assert!(miss.brier_score > close.brier_score);
        assert!(miss.log_loss > close.log_loss);
    }

    #[test]
    fn test_brier_averages_over_entrants() {
        let record = evaluate(
            &contest(&["a", "b"]),
            &prediction(&[("a", 60.0), ("b", 40.0)]),
            CLIP,
        )
        .unwrap();
        // ((0.6 - 1)^2 + 0.4^2) / 2
        assert!((record.brier_score - 0.16).abs() < 1e-12);
        let expected_log_loss = -(0.6f64.ln() + 0.6f64.ln()) / 2.0;
        assert!((record.log_loss - expected_log_loss).abs() < 1e-12);
    }

    #[test]
    fn test_top_3_needs_two_hits() {
        let race = contest(&["a", "b", "c", "d", "e"]);

        let two_hits = prediction(&[("a", 40.0), ("d", 30.0), ("c", 20.0), ("e", 5.0), ("b", 5.0)]);
        assert!(evaluate(&race, &two_hits, CLIP).unwrap().top_3_accuracy);

        let one_hit = prediction(&[("a", 40.0), ("d", 30.0), ("e", 20.0), ("c", 5.0), ("b", 5.0)]);
        assert!(!evaluate(&race, &one_hit, CLIP).unwrap().top_3_accuracy);
    }

    #[test]
    fn test_nothing_to_score() {
        assert!(evaluate(&contest(&["a"]), &prediction(&[]), CLIP).is_none());

        let all_out = Contest::new(
            "monaco",
            NaiveDate::from_ymd_opt(2024, 5, 26).unwrap(),
            vec![
                ContestEntry::new("a", Placement::Dnf),
                ContestEntry::new("b", Placement::Retired),
            ],
        )
        .unwrap();
        assert!(evaluate(&all_out, &prediction(&[("a", 50.0), ("b", 50.0)]), CLIP).is_none());
    }

    #[test]
    fn test_scored_when_winner_was_excluded() {
        let race = Contest::new(
            "monaco",
            NaiveDate::from_ymd_opt(2024, 5, 26).unwrap(),
            vec![
                ContestEntry::new("a", Placement::Disqualified),
                ContestEntry::finished("b", 2),
                ContestEntry::finished("c", 3),
            ],
        )
        .unwrap();

        let record = evaluate(&race, &prediction(&[("a", 60.0), ("b", 40.0)]), CLIP).unwrap();
        assert!(!record.correct_winner);
        assert!(!record.top_3_accuracy);
        // nobody won, so every outcome is zero: (0.6^2 + 0.4^2) / 2
        assert!((record.brier_score - 0.26).abs() < 1e-12);
        let expected_log_loss = -(0.4f64.ln() + 0.6f64.ln()) / 2.0;
        assert!((record.log_loss - expected_log_loss).abs() < 1e-12);
    }

    #[test]
    fn test_summary_means() {
        let record = |brier: f64, winner: bool, top_3: bool| AccuracyRecord {
            contest_id: "r".to_string(),
            model_version: "elo-v1".to_string(),
            brier_score: brier,
            log_loss: brier * 2.0,
            correct_winner: winner,
            top_3_accuracy: top_3,
        };
        let summary = AccuracySummary::from_records(&[
            record(0.1, true, true),
            record(0.3, false, true),
            record(0.2, false, false),
            record(0.2, true, true),
        ]);

        assert_eq!(summary.count, 4);
        assert!((summary.mean_brier - 0.2).abs() < 1e-12);
        assert!((summary.mean_log_loss - 0.4).abs() < 1e-12);
        assert_eq!(summary.winner_hit_rate, 0.5);
        assert_eq!(summary.top_3_hit_rate, 0.75);

        assert_eq!(AccuracySummary::from_records(&[]), AccuracySummary::default());
    }
}
