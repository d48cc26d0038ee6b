//! crates/proposal_core/src/quota.rs
//!
//! Daily-quota admission logic. The counter resets lazily: a stored date
//! earlier than today means the stored count no longer applies. There is
//! no scheduled job clearing counters, the reset is computed at read time.

use chrono::NaiveDate;

use crate::domain::Profile;

/// The admission verdict for one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    /// The count that applies today, after the lazy daily reset.
    pub effective_count: u32,
    /// Whether a new generation is permitted.
    pub admitted: bool,
}

/// Evaluates a user's quota state against today's date and the configured
/// ceiling. A stored `last_generation_date` other than `today` (including
/// none at all) zeroes the effective count regardless of the stored value.
pub fn evaluate(profile: &Profile, today: NaiveDate, limit: u32) -> QuotaDecision {
    let effective_count = match profile.last_generation_date {
        Some(date) if date == today => profile.daily_generations_count,
        _ => 0,
    };

    QuotaDecision {
        effective_count,
        admitted: effective_count < limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const LIMIT: u32 = 5;

    fn profile(count: u32, date: Option<NaiveDate>) -> Profile {
        Profile {
            user_id: Uuid::new_v4(),
            daily_generations_count: count,
            last_generation_date: date,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stale_date_resets_effective_count_to_zero() {
        let today = day("2024-05-02");
        let decision = evaluate(&profile(3, Some(day("2024-05-01"))), today, LIMIT);
        assert_eq!(decision.effective_count, 0);
        assert!(decision.admitted);
    }

    #[test]
    fn missing_date_counts_as_zero() {
        let decision = evaluate(&profile(7, None), day("2024-05-02"), LIMIT);
        assert_eq!(decision.effective_count, 0);
        assert!(decision.admitted);
    }

    #[test]
    fn same_day_count_is_kept() {
        let today = day("2024-05-02");
        let decision = evaluate(&profile(4, Some(today)), today, LIMIT);
        assert_eq!(decision.effective_count, 4);
        assert!(decision.admitted);
    }

    #[test]
    fn admission_denied_at_the_ceiling() {
        let today = day("2024-05-02");
        let decision = evaluate(&profile(5, Some(today)), today, LIMIT);
        assert_eq!(decision.effective_count, 5);
        assert!(!decision.admitted);
    }

    #[test]
    fn counts_beyond_the_ceiling_stay_denied() {
        let today = day("2024-05-02");
        assert!(!evaluate(&profile(6, Some(today)), today, LIMIT).admitted);
    }

    #[test]
    fn ceiling_is_a_parameter() {
        let today = day("2024-05-02");
        assert!(evaluate(&profile(5, Some(today)), today, 10).admitted);
        assert!(!evaluate(&profile(1, Some(today)), today, 1).admitted);
    }
}
