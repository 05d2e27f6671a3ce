use crate::amounts::clean_amount;
use crate::schema::{ExpenseRateRow, PoolingAmounts, PoolingMonth};
use log::debug;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fallback per-month expense figures, keyed by whatever month names the config row used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StaticExpenseConfig {
    amounts: BTreeMap<String, f64>,
}

impl StaticExpenseConfig {
    pub fn new(amounts: BTreeMap<String, f64>) -> Self {
        Self { amounts }
    }

    /// Builds from a loosely-typed JSON object; values are cleaned like any other amount.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let amounts = object
            .iter()
            .map(|(key, v)| (key.clone(), clean_amount(v)))
            .collect();
        Some(Self { amounts })
    }

    /// Amount for `month`, accepting any of its aliases as the key. When several are present
    /// the first alias wins ("sept" over "sep").
    pub fn amount_for(&self, month: PoolingMonth) -> f64 {
        month
            .aliases()
            .iter()
            .find_map(|alias| {
                self.amounts
                    .iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(alias))
                    .map(|(_, v)| *v)
            })
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

impl<'de> Deserialize<'de> for StaticExpenseConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| de::Error::custom("expected a map of month names to amounts"))
    }
}

/// Per-month shared-expense rates for the pooling window.
///
/// A report row naming the month wins; otherwise the static config supplies the rate.
/// Always yields all five months.
pub fn resolve_monthly_rates(
    static_config: &StaticExpenseConfig,
    report_rows: &[ExpenseRateRow],
) -> PoolingAmounts {
    let mut rates = PoolingAmounts::default();

    for month in PoolingMonth::ALL {
        let rate = match find_report_row(report_rows, month) {
            Some(row) => clean_amount(&row.share_per_owner),
            None => {
                if !report_rows.is_empty() {
                    debug!(
                        "No expense report row for '{}', using configured amount",
                        month.key()
                    );
                }
                static_config.amount_for(month)
            }
        };
        rates.set(month, rate);
    }

    rates
}

fn find_report_row(rows: &[ExpenseRateRow], month: PoolingMonth) -> Option<&ExpenseRateRow> {
    rows.iter().find(|row| {
        let name = row.month.trim().to_lowercase();
        month
            .aliases()
            .iter()
            .any(|alias| name == *alias || name.contains(alias))
    })
}
