//! # Society Dues
//!
//! A library for turning loosely-typed maintenance collection records (synced from a
//! spreadsheet-backed store) into a single normalized payment status and balance per flat.
//!
//! ## Core Concepts
//!
//! - **Raw Records**: Rows with drifting column names ("Flat_No", "Flat No", "flat no") and
//!   amounts stored as numbers, "1,234"-style strings or blanks
//! - **Canonical Records**: `Owner`, `YearOnePayment` (Aug-Dec pooling window) and
//!   `YearTwoPayment` (Jan-Dec plus carry-forward and Q1 fields)
//! - **Shared Expense**: Each flat's share of the prior year's pooled costs, charged from the
//!   month the flat started participating
//! - **Q1 Status**: One of Covered, Partial Covered, Paid, Partial Paid or Due, resolved from
//!   exemptions, the stored outstanding figure, remarks and payments, in that order
//!
//! Derivation is a pure function of its inputs: no I/O, no caching, no global state.
//!
//! ## Example
//!
//! ```rust,ignore
//! use society_dues::*;
//!
//! let owner = Owner {
//!     serial_number: 12,
//!     flat_id: "1B3".to_string(),
//!     name: "Sumanta Adhikary".to_string(),
//!     possession_date: "Nov-25".to_string(),
//! };
//!
//! let year_one = YearOnePayment {
//!     monthly: PoolingAmounts { nov: 2000.0, dec: 2000.0, ..Default::default() },
//!     ..YearOnePayment::missing("1B3")
//! };
//! let year_two = YearTwoPayment {
//!     carry_forward: 2391.0,
//!     q1_payment: 4000.0,
//!     outstanding: 0.0,
//!     ..YearTwoPayment::missing("1B3", 6000.0)
//! };
//! let rates = PoolingAmounts { aug: 0.0, sep: 663.0, oct: 1000.0, nov: 815.0, dec: 794.0 };
//!
//! let derived = derive_owner_status(&owner, &year_one, &year_two, &rates, &MaintenanceConfig::default());
//! assert_eq!(derived.shared_expense, 1609.0);
//! assert_eq!(derived.q1_status, Q1Status::Paid);
//! ```

pub mod amounts;
pub mod columns;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod portal;
pub mod rates;
pub mod remarks;
pub mod schema;
pub mod shared_expense;
pub mod status;
pub mod utils;

pub use amounts::clean_amount;
pub use columns::{normalize, ColumnSpec, RawRecord};
pub use config::{ExemptFlats, MaintenanceConfig};
pub use error::{DuesError, Result};
pub use ingestion::RawTables;
pub use portal::{CollectionSummary, PortalDataset, PortalStore};
pub use rates::{resolve_monthly_rates, StaticExpenseConfig};
pub use remarks::parse_remarks_status;
pub use schema::*;
pub use shared_expense::{
    compute_shared_expense, shared_expense_from, ParticipationRule, SharedExpenseCalculator,
};
pub use status::{resolve_owner_status, StatusResolver};
pub use utils::{parse_possession_date, PossessionDate};

use log::debug;

pub struct DuesProcessor;

impl DuesProcessor {
    /// Computes the shared expense under the configured participation rule, then resolves
    /// the owner's status against the configured dues and exemptions.
    pub fn derive(
        owner: &Owner,
        year_one: &YearOnePayment,
        year_two: &YearTwoPayment,
        monthly_rates: &PoolingAmounts,
        config: &MaintenanceConfig,
    ) -> DerivedStatus {
        let calculator = config.shared_expense_calculator();
        let participation_start = calculator.participation_start(owner, year_one);
        let shared_expense = shared_expense_from(participation_start, monthly_rates);

        debug!(
            "Flat {}: participation from {:?} ({:?}), shared expense {}",
            owner.flat_id, participation_start, config.participation, shared_expense
        );

        resolve_owner_status(
            owner,
            year_one,
            year_two,
            shared_expense,
            &config.dues,
            &config.exempt_flats,
        )
    }

    /// Raw tables straight to the owner view for one flat.
    pub fn dashboard_from_raw(tables: &RawTables, flat_id: &str) -> Result<DashboardData> {
        PortalDataset::from_raw(tables).dashboard_for(flat_id)
    }
}

pub fn derive_owner_status(
    owner: &Owner,
    year_one: &YearOnePayment,
    year_two: &YearTwoPayment,
    monthly_rates: &PoolingAmounts,
    config: &MaintenanceConfig,
) -> DerivedStatus {
    DuesProcessor::derive(owner, year_one, year_two, monthly_rates, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner {
            serial_number: 12,
            flat_id: "1B3".to_string(),
            name: "Sumanta Adhikary".to_string(),
            possession_date: "Nov-25".to_string(),
        }
    }

    fn rates() -> PoolingAmounts {
        PoolingAmounts {
            aug: 0.0,
            sep: 663.0,
            oct: 1000.0,
            nov: 815.0,
            dec: 794.0,
        }
    }

    #[test]
    fn test_end_to_end_joined_mid_cycle() {
        let year_one = YearOnePayment {
            monthly: PoolingAmounts {
                nov: 2000.0,
                dec: 2000.0,
                ..Default::default()
            },
            ..YearOnePayment::missing("1B3")
        };
        let year_two = YearTwoPayment {
            carry_forward: 2391.0,
            q1_payment: 4000.0,
            outstanding: 0.0,
            ..YearTwoPayment::missing("1B3", 6000.0)
        };

        let derived = derive_owner_status(
            &owner(),
            &year_one,
            &year_two,
            &rates(),
            &MaintenanceConfig::default(),
        );

        assert_eq!(derived.shared_expense, 1609.0);
        assert_eq!(derived.q1_status, Q1Status::Paid);
        assert_eq!(derived.lifetime_paid, 8000.0);
        assert_eq!(derived.current_balance, 391.0);
    }

    #[test]
    fn test_possession_rule_from_config() {
        let config = MaintenanceConfig {
            participation: ParticipationRule::PossessionDate,
            ..MaintenanceConfig::default()
        };
        let year_one = YearOnePayment::missing("1B3");
        let year_two = YearTwoPayment::missing("1B3", 6000.0);

        let derived = derive_owner_status(&owner(), &year_one, &year_two, &rates(), &config);
        assert_eq!(derived.shared_expense, 1609.0);

        let derived = derive_owner_status(
            &owner(),
            &year_one,
            &year_two,
            &rates(),
            &MaintenanceConfig::default(),
        );
        assert_eq!(derived.shared_expense, 0.0);
    }

    #[test]
    fn test_dashboard_from_raw_reports_unknown_flat() {
        let result = DuesProcessor::dashboard_from_raw(&RawTables::default(), "1B3");
        assert!(matches!(result, Err(DuesError::OwnerNotFound(_))));
    }
}
