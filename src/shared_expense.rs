use crate::schema::{Owner, PoolingAmounts, PoolingMonth, YearOnePayment};
use crate::utils::{months_between, PossessionDate};
use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Serialize};

/// How a flat's first month of participation in the shared-expense pool is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRule {
    /// The first pooling month with a non-zero payment.
    #[default]
    FirstPayment,
    /// The owner's possession month, clamped to the start of the window.
    PossessionDate,
}

/// Calendar year the Aug-Dec pooling window falls in.
pub const DEFAULT_POOLING_YEAR: i32 = 2025;

pub fn first_paid_month(payment: &YearOnePayment) -> Option<PoolingMonth> {
    payment
        .monthly
        .iter()
        .find(|(_, amount)| *amount > 0.0)
        .map(|(month, _)| month)
}

/// Possession before August counts from August; after December (or TBD) means no participation.
pub fn possession_start_month(owner: &Owner, pooling_year: i32) -> Option<PoolingMonth> {
    let PossessionDate::Known(date) = owner.possession() else {
        return None;
    };
    let window_start = NaiveDate::from_ymd_opt(pooling_year, 8, 1)?;

    if months_between(window_start, date) < 0 {
        return Some(PoolingMonth::Aug);
    }
    if date.year() != pooling_year {
        return None;
    }

    u8::try_from(date.month())
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .and_then(PoolingMonth::from_calendar_month)
}

/// Sum of rates from `start` through December, rounded to a whole currency unit.
pub fn shared_expense_from(start: Option<PoolingMonth>, rates: &PoolingAmounts) -> f64 {
    let Some(start) = start else {
        return 0.0;
    };

    let total: f64 = rates
        .iter()
        .filter(|(month, _)| *month >= start)
        .map(|(_, rate)| rate)
        .sum();

    total.round()
}

/// Shared expense owed by a flat that joined the pool at its first paid month.
///
/// A flat with no payment in any pooling month did not participate and owes nothing.
pub fn compute_shared_expense(payment: &YearOnePayment, rates: &PoolingAmounts) -> f64 {
    shared_expense_from(first_paid_month(payment), rates)
}

#[derive(Debug, Clone, Copy)]
pub struct SharedExpenseCalculator {
    rule: ParticipationRule,
    pooling_year: i32,
}

impl SharedExpenseCalculator {
    pub fn new(rule: ParticipationRule, pooling_year: i32) -> Self {
        Self { rule, pooling_year }
    }

    pub fn participation_start(
        &self,
        owner: &Owner,
        payment: &YearOnePayment,
    ) -> Option<PoolingMonth> {
        match self.rule {
            ParticipationRule::FirstPayment => first_paid_month(payment),
            ParticipationRule::PossessionDate => possession_start_month(owner, self.pooling_year),
        }
    }

    pub fn compute(&self, owner: &Owner, payment: &YearOnePayment, rates: &PoolingAmounts) -> f64 {
        shared_expense_from(self.participation_start(owner, payment), rates)
    }
}

impl Default for SharedExpenseCalculator {
    fn default() -> Self {
        Self::new(ParticipationRule::FirstPayment, DEFAULT_POOLING_YEAR)
    }
}
