use crate::amounts::clean_amount;
use crate::columns::{RawRecord, CONFIG_KEY, CONFIG_VALUE};
use crate::error::{DuesError, Result};
use crate::rates::StaticExpenseConfig;
use crate::schema::DueSettings;
use crate::shared_expense::{ParticipationRule, SharedExpenseCalculator, DEFAULT_POOLING_YEAR};
use crate::utils::flat_key;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const GENERAL_CONFIG_KEY: &str = "general_config";
pub const EXPENSES_CONFIG_KEY: &str = "expenses_2025";
pub const EXEMPT_FLATS_CONFIG_KEY: &str = "exempt_flats";

/// Flats whose quarterly dues are waived by the committee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExemptFlats {
    flats: BTreeSet<String>,
}

impl ExemptFlats {
    pub fn new<I, S>(flats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            flats: flats
                .into_iter()
                .map(|f| flat_key(f.as_ref()))
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, flat_id: &str) -> bool {
        self.flats.contains(&flat_key(flat_id))
    }

    pub fn len(&self) -> usize {
        self.flats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flats.is_empty()
    }
}

impl From<Vec<String>> for ExemptFlats {
    fn from(flats: Vec<String>) -> Self {
        Self::new(flats)
    }
}

impl From<ExemptFlats> for Vec<String> {
    fn from(exempt: ExemptFlats) -> Self {
        exempt.flats.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub dues: DueSettings,
    /// Per-month expense figures used when the expense report has no row for a month.
    pub static_expenses: StaticExpenseConfig,
    pub exempt_flats: ExemptFlats,
    pub participation: ParticipationRule,
    pub pooling_year: i32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            dues: DueSettings::default(),
            static_expenses: StaticExpenseConfig::default(),
            exempt_flats: ExemptFlats::default(),
            participation: ParticipationRule::default(),
            pooling_year: DEFAULT_POOLING_YEAR,
        }
    }
}

impl MaintenanceConfig {
    /// Reads the key/value rows of the maintenance config table.
    ///
    /// Unknown keys are ignored and malformed values are skipped with a warning, so the
    /// result always holds usable defaults.
    pub fn from_rows(rows: &[RawRecord]) -> Self {
        let mut config = Self::default();

        for row in rows {
            let Some(key) = CONFIG_KEY.text(row) else {
                continue;
            };
            let Some(value) = CONFIG_VALUE.resolve(row).map(decode_embedded_json) else {
                warn!("Config row '{}' has no value, skipping", key);
                continue;
            };

            match key.as_str() {
                GENERAL_CONFIG_KEY => config.apply_general(&value),
                EXPENSES_CONFIG_KEY => match StaticExpenseConfig::from_value(&value) {
                    Some(expenses) => config.static_expenses = expenses,
                    None => warn!("Config row '{}' is not a month map, skipping", key),
                },
                EXEMPT_FLATS_CONFIG_KEY => match value.as_array() {
                    Some(items) => {
                        config.exempt_flats =
                            ExemptFlats::new(items.iter().filter_map(Value::as_str))
                    }
                    None => warn!("Config row '{}' is not a list of flats, skipping", key),
                },
                other => debug!("Ignoring config row '{}'", other),
            }
        }

        config
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dues.q1_due < 0.0 {
            return Err(DuesError::InvalidConfig {
                key: "q1_due".to_string(),
                details: format!("must not be negative, got {}", self.dues.q1_due),
            });
        }
        if self.dues.monthly_maintenance < 0.0 {
            return Err(DuesError::InvalidConfig {
                key: "monthly_maintenance".to_string(),
                details: format!(
                    "must not be negative, got {}",
                    self.dues.monthly_maintenance
                ),
            });
        }
        Ok(())
    }

    pub fn shared_expense_calculator(&self) -> SharedExpenseCalculator {
        SharedExpenseCalculator::new(self.participation, self.pooling_year)
    }

    fn apply_general(&mut self, value: &Value) {
        let defaults = DueSettings::default();
        let positive_or = |field: &str, default: f64| {
            let amount = value.get(field).map(clean_amount).unwrap_or(0.0);
            if amount > 0.0 {
                amount
            } else {
                default
            }
        };

        self.dues = DueSettings {
            q1_due: positive_or("q1_due_amount", defaults.q1_due),
            monthly_maintenance: positive_or(
                "monthly_maintenance_2026",
                defaults.monthly_maintenance,
            ),
        };
    }
}

/// Config values are sometimes stored as JSON text rather than as a JSON column.
fn decode_embedded_json(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PoolingMonth;
    use serde_json::json;

    fn rows(value: Value) -> Vec<RawRecord> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = MaintenanceConfig::default();
        assert_eq!(config.dues.q1_due, 6000.0);
        assert_eq!(config.dues.monthly_maintenance, 2000.0);
        assert!(config.exempt_flats.is_empty());
        assert_eq!(config.participation, ParticipationRule::FirstPayment);
    }

    #[test]
    fn test_from_rows() {
        let config = MaintenanceConfig::from_rows(&rows(json!([
            {"key": "general_config", "value": {"q1_due_amount": 7500, "monthly_maintenance_2026": "2,500"}},
            {"key": "expenses_2025", "value": {"aug": 0, "sept": 663, "oct": 1000, "nov": 815, "dec": 794}},
            {"key": "exempt_flats", "value": ["1a3", "1E1"]},
            {"key": "theme", "value": "dark"}
        ])));

        assert_eq!(config.dues.q1_due, 7500.0);
        assert_eq!(config.dues.monthly_maintenance, 2500.0);
        assert_eq!(config.static_expenses.amount_for(PoolingMonth::Sep), 663.0);
        assert!(config.exempt_flats.contains("1A3"));
        assert!(config.exempt_flats.contains(" 1e1"));
        assert_eq!(config.exempt_flats.len(), 2);
    }

    #[test]
    fn test_zero_general_values_fall_back_to_defaults() {
        let config = MaintenanceConfig::from_rows(&rows(json!([
            {"key": "general_config", "value": {"q1_due_amount": 0}}
        ])));
        assert_eq!(config.dues, DueSettings::default());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let config = MaintenanceConfig::from_rows(&rows(json!([
            {"key": "expenses_2025", "value": 42},
            {"key": "exempt_flats", "value": {"flat": "1A3"}},
            {"value": {"q1_due_amount": 9000}}
        ])));
        assert_eq!(config, MaintenanceConfig::default());
    }

    #[test]
    fn test_value_stored_as_json_text() {
        let config = MaintenanceConfig::from_rows(&rows(json!([
            {"Key": "exempt_flats", "Value": "[\"2B1\"]"}
        ])));
        assert!(config.exempt_flats.contains("2b1"));
    }

    #[test]
    fn test_from_json_validates() {
        let config = MaintenanceConfig::from_json(
            r#"{"dues": {"q1_due": 6000, "monthly_maintenance": 2000}, "exempt_flats": ["1A3"], "participation": "possession_date"}"#,
        )
        .unwrap();
        assert!(config.exempt_flats.contains("1a3"));
        assert_eq!(config.participation, ParticipationRule::PossessionDate);
        assert_eq!(config.pooling_year, DEFAULT_POOLING_YEAR);

        let err = MaintenanceConfig::from_json(
            r#"{"dues": {"q1_due": -1, "monthly_maintenance": 2000}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DuesError::InvalidConfig { .. }));

        let err = MaintenanceConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, DuesError::SerializationError(_)));
    }

    #[test]
    fn test_from_json_fills_partial_sections_with_defaults() {
        let config = MaintenanceConfig::from_json(r#"{"dues": {"q1_due": 7500}}"#).unwrap();
        assert_eq!(config.dues.q1_due, 7500.0);
        assert_eq!(config.dues.monthly_maintenance, 2000.0);

        let config =
            MaintenanceConfig::from_json(r#"{"static_expenses": {"sept": "663", "dec": "794"}}"#)
                .unwrap();
        assert_eq!(config.static_expenses.amount_for(PoolingMonth::Sep), 663.0);
        assert_eq!(config.static_expenses.amount_for(PoolingMonth::Dec), 794.0);
        assert_eq!(config.dues, DueSettings::default());
    }
}
