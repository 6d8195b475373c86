//! Pure budget math: period arithmetic, threshold evaluation, cost estimation.
//! Reading/writing counters and the usage ledger lives in `dynamo-storage`, built
//! on top of these functions.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{model_by_id, RoleName};

/// First day of the calendar month containing `now`.
pub fn current_period_start(now: DateTime<Utc>) -> NaiveDate {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1).expect("valid calendar month")
}

/// First day of the month following `period_start`.
pub fn next_reset_date(period_start: NaiveDate) -> NaiveDate {
    if period_start.month() == 12 {
        NaiveDate::from_ymd_opt(period_start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(period_start.year(), period_start.month() + 1, 1)
    }
    .expect("valid calendar month")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetEvaluation {
    pub exceeded: bool,
    pub warning: bool,
    pub percent_used: u32,
}

/// `limit` of `None` or `0` means unlimited: always `{exceeded:false, warning:false,
/// percent_used:0}`. Monotone non-decreasing in `used`; `warning` is never `false`
/// while `exceeded` is `true` once a limit is set (both flip together at 100%).
pub fn evaluate_budget(used: u64, limit: Option<u64>) -> BudgetEvaluation {
    let limit = match limit {
        Some(l) if l > 0 => l,
        _ => {
            return BudgetEvaluation {
                exceeded: false,
                warning: false,
                percent_used: 0,
            }
        }
    };
    let percent_used = ((100.0 * used as f64 / limit as f64).round()) as u32;
    let warning = used as f64 >= 0.8 * limit as f64;
    let exceeded = used >= limit;
    BudgetEvaluation {
        exceeded,
        warning,
        percent_used,
    }
}

/// `estimate_cost(model, in, out) = round((in·inputCost + out·outputCost)/1e6 · 1e6) / 1e6`.
/// Unknown model yields `0.0`.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let Some(def) = model_by_id(model) else {
        return 0.0;
    };
    let raw = (input_tokens as f64 * def.input_cost_per_million
        + output_tokens as f64 * def.output_cost_per_million)
        / 1_000_000.0;
    (raw * 1_000_000.0).round() / 1_000_000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub role: RoleName,
    pub period_start: NaiveDate,
    pub current_usage: u64,
    pub monthly_limit: Option<u64>,
    pub remaining: Option<u64>,
    pub percent_used: u32,
    pub warning: bool,
    pub exceeded: bool,
}

pub fn build_budget_status(
    role: RoleName,
    period_start: NaiveDate,
    current_usage: u64,
    monthly_limit: Option<u64>,
) -> BudgetStatus {
    let eval = evaluate_budget(current_usage, monthly_limit);
    let remaining = monthly_limit.map(|l| l.saturating_sub(current_usage).max(0));
    BudgetStatus {
        role,
        period_start,
        current_usage,
        monthly_limit,
        remaining,
        percent_used: eval.percent_used,
        warning: eval.warning,
        exceeded: eval.exceeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_budget_never_warns_or_exceeds() {
        let eval = evaluate_budget(10_000_000, None);
        assert!(!eval.warning && !eval.exceeded);
        let eval = evaluate_budget(10_000_000, Some(0));
        assert!(!eval.warning && !eval.exceeded);
    }

    #[test]
    fn warning_boundary_at_eighty_percent() {
        let limit = 200_000u64;
        let just_under = (limit as f64 * 0.8) as u64 - 1;
        assert!(!evaluate_budget(just_under, Some(limit)).warning);
        let at = (limit as f64 * 0.8) as u64;
        assert!(evaluate_budget(at, Some(limit)).warning);
    }

    #[test]
    fn exceeded_at_limit() {
        let eval = evaluate_budget(200_000, Some(200_000));
        assert!(eval.exceeded);
        assert!(eval.warning);
    }

    #[test]
    fn monotone_non_decreasing_in_used() {
        let limit = Some(1000u64);
        let mut last_percent = 0;
        for used in (0..2000).step_by(50) {
            let eval = evaluate_budget(used, limit);
            assert!(eval.percent_used >= last_percent);
            last_percent = eval.percent_used;
        }
    }

    #[test]
    fn unknown_model_costs_nothing() {
        assert_eq!(estimate_cost("not-a-real-model", 1000, 1000), 0.0);
    }

    #[test]
    fn period_start_is_first_of_month() {
        let now = DateTime::parse_from_rfc3339("2026-07-27T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let start = current_period_start(now);
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(next_reset_date(start), NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
    }

    #[test]
    fn december_rolls_over_to_next_year() {
        let start = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        assert_eq!(next_reset_date(start), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }
}
