//! Picking the best-scoring city of a period.

use crate::aggregate::AggregatedScore;
use crate::record::PeriodLabel;

/// Greatest period present (years numerically, then text labels).
pub fn latest_period(scores: &[AggregatedScore]) -> Option<&PeriodLabel> {
    scores.iter().map(|s| &s.period).max()
}

/// Highest score within `period`. Ties keep the earlier entry; NaN never wins
/// over a real number.
pub fn top_city<'a>(scores: &'a [AggregatedScore], period: &PeriodLabel) -> Option<&'a AggregatedScore> {
    let mut best: Option<&AggregatedScore> = None;
    for s in scores.iter().filter(|s| &s.period == period) {
        best = match best {
            None => Some(s),
            Some(b) if rank(s.score) > rank(b.score) => Some(s),
            keep => keep,
        };
    }
    best
}

fn rank(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(city: &str, period: PeriodLabel, score: f64) -> AggregatedScore {
        AggregatedScore {
            city: city.into(),
            period,
            score,
        }
    }

    #[test]
    fn picks_highest_in_period() {
        let v = vec![
            s("A", PeriodLabel::Year(2022), 0.4),
            s("B", PeriodLabel::Year(2022), 0.7),
            s("C", PeriodLabel::Year(2021), 0.9),
        ];
        let top = top_city(&v, &PeriodLabel::Year(2022)).unwrap();
        assert_eq!(top.city, "B");
        assert!(top_city(&v, &PeriodLabel::Year(1999)).is_none());
    }

    #[test]
    fn ties_keep_first_and_nan_loses() {
        let v = vec![
            s("A", PeriodLabel::Year(2022), f64::NAN),
            s("B", PeriodLabel::Year(2022), 0.5),
            s("C", PeriodLabel::Year(2022), 0.5),
        ];
        assert_eq!(top_city(&v, &PeriodLabel::Year(2022)).unwrap().city, "B");
    }

    #[test]
    fn latest_period_prefers_max_year() {
        let v = vec![
            s("A", PeriodLabel::Year(2019), 0.1),
            s("A", PeriodLabel::Year(2022), 0.1),
            s("A", PeriodLabel::Year(2020), 0.1),
        ];
        assert_eq!(latest_period(&v), Some(&PeriodLabel::Year(2022)));
        assert_eq!(latest_period(&[]), None);
    }
}
