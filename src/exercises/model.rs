use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::Exercise;

pub const MIN_SET_RATING: u8 = 1;
pub const MAX_SET_RATING: u8 = 5;

/// One finished set with the patient's 1-5 rating of how it felt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetError {
    #[error("Set {got} cannot be completed yet, complete set {expected} first")]
    OutOfOrder { expected: usize, got: usize },

    #[error("All {0} sets are already completed")]
    AlreadyComplete(usize),

    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
}

impl Exercise {
    pub fn target_sets(&self) -> usize {
        self.sets.max(0) as usize
    }

    pub fn completed_count(&self) -> usize {
        self.completed_sets.len()
    }

    pub fn is_complete(&self) -> bool {
        self.target_sets() > 0 && self.completed_count() >= self.target_sets()
    }

    /// Mean set rating rounded to two decimals.
    pub fn average_rating(&self) -> Option<f64> {
        average_rating(&self.completed_sets)
    }

    /// Validates completing set `index` and returns the list that would result.
    /// Sets are gap-free: `index` must equal the number already completed.
    pub fn with_completed_set(
        &self,
        index: usize,
        set: CompletedSet,
    ) -> Result<Vec<CompletedSet>, SetError> {
        if !(MIN_SET_RATING..=MAX_SET_RATING).contains(&set.rating) {
            return Err(SetError::RatingOutOfRange);
        }
        let done = self.completed_count();
        if done >= self.target_sets() {
            return Err(SetError::AlreadyComplete(self.target_sets()));
        }
        if index != done {
            return Err(SetError::OutOfOrder {
                expected: done,
                got: index,
            });
        }
        let mut next = self.completed_sets.clone();
        next.push(set);
        Ok(next)
    }
}

pub fn average_rating(sets: &[CompletedSet]) -> Option<f64> {
    if sets.is_empty() {
        return None;
    }
    let sum: u32 = sets.iter().map(|s| s.rating as u32).sum();
    let avg = sum as f64 / sets.len() as f64;
    Some((avg * 100.0).round() / 100.0)
}

/// The notes column holds the set list as JSON text.
pub fn encode_notes(sets: &[CompletedSet]) -> String {
    serde_json::to_string(sets).unwrap_or_else(|_| "[]".to_string())
}

/// Empty or legacy free-text notes decode to an empty list.
pub fn decode_notes(notes: &str) -> Vec<CompletedSet> {
    if notes.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(notes) {
        Ok(sets) => sets,
        Err(e) => {
            warn!(error = %e, "exercise notes are not a set list; ignoring");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    fn exercise(sets: i32) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Heel Slides".into(),
            sets,
            reps: 15,
            duration: 0,
            date: date!(2026 - 01 - 07),
            completed: false,
            completed_sets: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn rated(rating: u8) -> CompletedSet {
        CompletedSet {
            rating,
            comment: None,
        }
    }

    #[test]
    fn sets_complete_in_order_until_target() {
        let mut ex = exercise(3);
        for (i, r) in [4, 5, 4].into_iter().enumerate() {
            assert!(!ex.is_complete());
            ex.completed_sets = ex.with_completed_set(i, rated(r)).unwrap();
        }
        assert!(ex.is_complete());
        assert_eq!(ex.average_rating(), Some(4.33));
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        let ex = exercise(3);
        assert_eq!(
            ex.with_completed_set(1, rated(3)),
            Err(SetError::OutOfOrder {
                expected: 0,
                got: 1
            })
        );
    }

    #[test]
    fn recompleting_an_earlier_set_is_rejected() {
        let mut ex = exercise(3);
        ex.completed_sets = vec![rated(2)];
        assert!(matches!(
            ex.with_completed_set(0, rated(5)),
            Err(SetError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn cannot_exceed_target_sets() {
        let mut ex = exercise(2);
        ex.completed_sets = vec![rated(2), rated(3)];
        assert_eq!(
            ex.with_completed_set(2, rated(3)),
            Err(SetError::AlreadyComplete(2))
        );
    }

    #[test]
    fn rating_must_be_one_to_five() {
        let ex = exercise(1);
        assert_eq!(ex.with_completed_set(0, rated(0)), Err(SetError::RatingOutOfRange));
        assert_eq!(ex.with_completed_set(0, rated(6)), Err(SetError::RatingOutOfRange));
    }

    #[test]
    fn notes_decode_legacy_text_as_empty() {
        assert!(decode_notes("").is_empty());
        assert!(decode_notes("felt tight today").is_empty());
        let sets = vec![
            rated(4),
            CompletedSet {
                rating: 2,
                comment: Some("knee sore".into()),
            },
        ];
        assert_eq!(decode_notes(&encode_notes(&sets)), sets);
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average_rating(&[]), None);
    }
}
