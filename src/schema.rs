use crate::utils::{parse_possession_date, PossessionDate};
use chrono::Month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five months of the prior-year shared-expense pool, in their fixed order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PoolingMonth {
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl PoolingMonth {
    pub const ALL: [PoolingMonth; 5] = [
        PoolingMonth::Aug,
        PoolingMonth::Sep,
        PoolingMonth::Oct,
        PoolingMonth::Nov,
        PoolingMonth::Dec,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PoolingMonth::Aug => "aug",
            PoolingMonth::Sep => "sep",
            PoolingMonth::Oct => "oct",
            PoolingMonth::Nov => "nov",
            PoolingMonth::Dec => "dec",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PoolingMonth::Aug => "Aug",
            PoolingMonth::Sep => "Sep",
            PoolingMonth::Oct => "Oct",
            PoolingMonth::Nov => "Nov",
            PoolingMonth::Dec => "Dec",
        }
    }

    /// Lower-case names this month goes by in report rows and config maps, preferred first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            PoolingMonth::Aug => &["aug", "august"],
            PoolingMonth::Sep => &["sept", "sep", "september"],
            PoolingMonth::Oct => &["oct", "october"],
            PoolingMonth::Nov => &["nov", "november"],
            PoolingMonth::Dec => &["dec", "december"],
        }
    }

    pub fn calendar_month(&self) -> Month {
        match self {
            PoolingMonth::Aug => Month::August,
            PoolingMonth::Sep => Month::September,
            PoolingMonth::Oct => Month::October,
            PoolingMonth::Nov => Month::November,
            PoolingMonth::Dec => Month::December,
        }
    }

    pub fn from_calendar_month(month: Month) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.calendar_month() == month)
    }
}

/// One amount per pooling month. Used both for payments and for per-month rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoolingAmounts {
    pub aug: f64,
    pub sep: f64,
    pub oct: f64,
    pub nov: f64,
    pub dec: f64,
}

impl PoolingAmounts {
    pub fn get(&self, month: PoolingMonth) -> f64 {
        match month {
            PoolingMonth::Aug => self.aug,
            PoolingMonth::Sep => self.sep,
            PoolingMonth::Oct => self.oct,
            PoolingMonth::Nov => self.nov,
            PoolingMonth::Dec => self.dec,
        }
    }

    pub fn set(&mut self, month: PoolingMonth, value: f64) {
        match month {
            PoolingMonth::Aug => self.aug = value,
            PoolingMonth::Sep => self.sep = value,
            PoolingMonth::Oct => self.oct = value,
            PoolingMonth::Nov => self.nov = value,
            PoolingMonth::Dec => self.dec = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolingMonth, f64)> + '_ {
        PoolingMonth::ALL.into_iter().map(move |m| (m, self.get(m)))
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Owner {
    pub serial_number: u32,
    pub flat_id: String,
    pub name: String,
    /// "Mon-YY" (e.g. "Nov-25") or "TBD".
    pub possession_date: String,
}

impl Owner {
    pub fn possession(&self) -> PossessionDate {
        parse_possession_date(&self.possession_date)
    }
}

/// Prior fiscal year collections (Aug through Dec).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct YearOnePayment {
    pub flat_id: String,
    pub monthly: PoolingAmounts,
    pub paid_total: f64,
    pub outstanding: f64,
    /// Shared expense already computed by the society ledger; wins over recomputation.
    #[serde(default)]
    pub shared_expense_override: Option<f64>,
}

impl YearOnePayment {
    /// Stand-in for a flat with no prior-year payment activity.
    pub fn missing(flat_id: &str) -> Self {
        Self {
            flat_id: flat_id.to_string(),
            monthly: PoolingAmounts::default(),
            paid_total: 0.0,
            outstanding: 0.0,
            shared_expense_override: None,
        }
    }
}

pub const YEAR_TWO_MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Current fiscal year collections (Jan through Dec) with carry-forward and Q1 fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct YearTwoPayment {
    pub flat_id: String,
    pub carry_forward: f64,
    pub q1_payment: f64,
    /// Indexed Jan = 0 through Dec = 11.
    pub monthly: [f64; 12],
    pub paid_total: f64,
    pub outstanding: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub jan_exempt: bool,
    #[serde(default)]
    pub feb_exempt: bool,
}

impl YearTwoPayment {
    /// Stand-in for a flat with no current-year record: nothing paid, full nominal due outstanding.
    pub fn missing(flat_id: &str, nominal_due: f64) -> Self {
        Self {
            flat_id: flat_id.to_string(),
            carry_forward: 0.0,
            q1_payment: 0.0,
            monthly: [0.0; 12],
            paid_total: 0.0,
            outstanding: nominal_due,
            remarks: None,
            jan_exempt: false,
            feb_exempt: false,
        }
    }

    pub fn amount_for(&self, month: Month) -> f64 {
        self.monthly[month.number_from_month() as usize - 1]
    }
}

/// A row of the external expense report. The share is kept raw and cleaned on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRateRow {
    pub month: String,
    pub share_per_owner: serde_json::Value,
}

/// Quarterly due baseline and single-month maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DueSettings {
    pub q1_due: f64,
    pub monthly_maintenance: f64,
}

impl Default for DueSettings {
    fn default() -> Self {
        Self {
            q1_due: 6000.0,
            monthly_maintenance: 2000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Q1Status {
    Covered,
    #[serde(rename = "Partial Covered")]
    PartialCovered,
    Paid,
    #[serde(rename = "Partial Paid")]
    PartialPaid,
    Due,
}

impl Q1Status {
    pub fn label(&self) -> &'static str {
        match self {
            Q1Status::Covered => "Covered",
            Q1Status::PartialCovered => "Partial Covered",
            Q1Status::Paid => "Paid",
            Q1Status::PartialPaid => "Partial Paid",
            Q1Status::Due => "Due",
        }
    }
}

impl fmt::Display for Q1Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum BalancePosition {
    /// Credit carried towards future months.
    Surplus(f64),
    /// Amount still owed.
    Owed(f64),
    Settled,
}

/// Which resolution rule produced a [`Q1Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusBasis {
    /// The flat is on the committee's exemption list.
    Exemption,
    /// Stored outstanding still equals the full effective due.
    UntouchedDue,
    /// Taken from the administrator's remarks.
    Remarks,
    /// Computed from carry-forward and Q1 payment.
    Payments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedStatus {
    pub shared_expense: f64,
    pub carry_forward: f64,
    pub q1_status: Q1Status,
    pub status_basis: StatusBasis,
    /// Quarterly due after month waivers.
    pub effective_due: f64,
    pub lifetime_paid: f64,
    /// Positive is credit, negative is owed.
    pub current_balance: f64,
}

impl DerivedStatus {
    pub fn balance_position(&self) -> BalancePosition {
        if self.current_balance > 0.0 {
            BalancePosition::Surplus(self.current_balance)
        } else if self.current_balance < 0.0 {
            BalancePosition::Owed(self.current_balance.abs())
        } else {
            BalancePosition::Settled
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonthStatus {
    Paid,
    Partial,
    Pending,
}

impl MonthStatus {
    pub fn classify(amount: f64, monthly_maintenance: f64) -> Self {
        if amount >= monthly_maintenance {
            MonthStatus::Paid
        } else if amount > 0.0 {
            MonthStatus::Partial
        } else {
            MonthStatus::Pending
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthEntry {
    pub label: String,
    pub amount: f64,
    pub status: MonthStatus,
}

/// Everything the owner view needs for one flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DashboardData {
    pub owner: Owner,
    pub year_one: YearOnePayment,
    pub year_two: YearTwoPayment,
    pub monthly_rates: PoolingAmounts,
    pub dues: DueSettings,
    pub derived: DerivedStatus,
}

impl DashboardData {
    pub fn year_one_months(&self) -> Vec<MonthEntry> {
        self.year_one
            .monthly
            .iter()
            .map(|(month, amount)| MonthEntry {
                label: month.label().to_string(),
                amount,
                status: MonthStatus::classify(amount, self.dues.monthly_maintenance),
            })
            .collect()
    }

    pub fn year_two_months(&self) -> Vec<MonthEntry> {
        YEAR_TWO_MONTH_LABELS
            .iter()
            .zip(self.year_two.monthly.iter())
            .map(|(label, &amount)| MonthEntry {
                label: label.to_string(),
                amount,
                status: MonthStatus::classify(amount, self.dues.monthly_maintenance),
            })
            .collect()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardData)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pooling_month_order_and_lookup() {
        let keys: Vec<&str> = PoolingMonth::ALL.iter().map(|m| m.key()).collect();
        assert_eq!(keys, vec!["aug", "sep", "oct", "nov", "dec"]);
        assert_eq!(
            PoolingMonth::from_calendar_month(Month::November),
            Some(PoolingMonth::Nov)
        );
        assert_eq!(PoolingMonth::from_calendar_month(Month::January), None);
    }

    #[test]
    fn test_pooling_amounts_accessors() {
        let mut amounts = PoolingAmounts::default();
        amounts.set(PoolingMonth::Nov, 815.0);
        amounts.set(PoolingMonth::Dec, 794.0);
        assert_eq!(amounts.get(PoolingMonth::Nov), 815.0);
        assert_eq!(amounts.total(), 1609.0);
    }

    #[test]
    fn test_q1_status_serializes_to_label() {
        let json = serde_json::to_string(&Q1Status::PartialCovered).unwrap();
        assert_eq!(json, "\"Partial Covered\"");
        assert_eq!(Q1Status::PartialPaid.to_string(), "Partial Paid");
    }

    #[test]
    fn test_balance_position() {
        let mut derived = DerivedStatus {
            shared_expense: 0.0,
            carry_forward: 0.0,
            q1_status: Q1Status::Due,
            status_basis: StatusBasis::Payments,
            effective_due: 6000.0,
            lifetime_paid: 0.0,
            current_balance: -6000.0,
        };
        assert_eq!(derived.balance_position(), BalancePosition::Owed(6000.0));
        derived.current_balance = 250.0;
        assert_eq!(derived.balance_position(), BalancePosition::Surplus(250.0));
        derived.current_balance = 0.0;
        assert_eq!(derived.balance_position(), BalancePosition::Settled);
    }

    #[test]
    fn test_month_status_classification() {
        assert_eq!(MonthStatus::classify(2000.0, 2000.0), MonthStatus::Paid);
        assert_eq!(MonthStatus::classify(500.0, 2000.0), MonthStatus::Partial);
        assert_eq!(MonthStatus::classify(0.0, 2000.0), MonthStatus::Pending);
    }

    #[test]
    fn test_missing_year_two_carries_nominal_due() {
        let p2 = YearTwoPayment::missing("1B3", 6000.0);
        assert_eq!(p2.outstanding, 6000.0);
        assert_eq!(p2.amount_for(Month::March), 0.0);
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = DashboardData::schema_as_json().unwrap();
        assert!(schema_json.contains("q1_status"));
        assert!(schema_json.contains("monthly_rates"));
        assert!(schema_json.contains("Partial Covered"));
    }
}
