use crate::config::MaintenanceConfig;
use crate::derive_owner_status;
use crate::error::{DuesError, Result};
use crate::ingestion::{
    ingest_excess, ingest_expense_report, ingest_owners, ingest_year_one, ingest_year_two,
    RawTables,
};
use crate::rates::resolve_monthly_rates;
use crate::schema::{
    DashboardData, ExpenseRateRow, Owner, PoolingAmounts, YearOnePayment, YearTwoPayment,
};
use crate::utils::{flat_key, normalize_alphanumeric};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CollectionSummary {
    pub total_units: usize,
    pub occupied_units: usize,
    pub year_one_collected: f64,
    pub year_one_outstanding: f64,
    pub year_two_collected: f64,
    /// Year-one collected as a percentage of collected plus outstanding.
    pub collection_rate: f64,
}

/// One consistent snapshot of every table the portal reads.
#[derive(Debug, Clone, Default)]
pub struct PortalDataset {
    owners: Vec<Owner>,
    year_one: BTreeMap<String, YearOnePayment>,
    year_two: BTreeMap<String, YearTwoPayment>,
    expense_report: Vec<ExpenseRateRow>,
    config: MaintenanceConfig,
}

impl PortalDataset {
    /// Payment rows are keyed by flat; when a flat appears twice the first row is kept.
    /// Exempt flats carry no outstanding amount for the current year.
    pub fn new(
        owners: Vec<Owner>,
        year_one: Vec<YearOnePayment>,
        year_two: Vec<YearTwoPayment>,
        expense_report: Vec<ExpenseRateRow>,
        config: MaintenanceConfig,
    ) -> Self {
        let mut year_one_by_flat = BTreeMap::new();
        for payment in year_one {
            year_one_by_flat
                .entry(flat_key(&payment.flat_id))
                .or_insert(payment);
        }

        let mut year_two_by_flat = BTreeMap::new();
        for mut payment in year_two {
            if config.exempt_flats.contains(&payment.flat_id) {
                payment.outstanding = 0.0;
            }
            year_two_by_flat
                .entry(flat_key(&payment.flat_id))
                .or_insert(payment);
        }

        info!(
            "Loaded portal dataset: {} owners, {} year-one and {} year-two payment records, {} expense report rows",
            owners.len(),
            year_one_by_flat.len(),
            year_two_by_flat.len(),
            expense_report.len()
        );

        Self {
            owners,
            year_one: year_one_by_flat,
            year_two: year_two_by_flat,
            expense_report,
            config,
        }
    }

    /// Builds the dataset from raw table rows, reading configuration from the config table.
    pub fn from_raw(tables: &RawTables) -> Self {
        let config = MaintenanceConfig::from_rows(&tables.config);
        Self::from_raw_with_config(tables, config)
    }

    pub fn from_raw_with_config(tables: &RawTables, config: MaintenanceConfig) -> Self {
        let excess = ingest_excess(&tables.excess);
        debug!("Ingested {} excess-amount entries", excess.len());

        let year_one = tables
            .year_one
            .iter()
            .filter_map(|row| ingest_year_one(row, &excess))
            .collect();
        let year_two = tables
            .year_two
            .iter()
            .filter_map(|row| ingest_year_two(row, &excess))
            .collect();

        Self::new(
            ingest_owners(&tables.owners),
            year_one,
            year_two,
            ingest_expense_report(&tables.expense_report),
            config,
        )
    }

    pub fn owners(&self) -> &[Owner] {
        &self.owners
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    pub fn find_owner(&self, flat_id: &str) -> Option<&Owner> {
        let key = flat_key(flat_id);
        self.owners.iter().find(|o| flat_key(&o.flat_id) == key)
    }

    pub fn monthly_rates(&self) -> PoolingAmounts {
        resolve_monthly_rates(&self.config.static_expenses, &self.expense_report)
    }

    /// Derives the owner view for `flat_id`, substituting default records for missing payments.
    pub fn dashboard_for(&self, flat_id: &str) -> Result<DashboardData> {
        let owner = self
            .find_owner(flat_id)
            .ok_or_else(|| DuesError::OwnerNotFound(flat_id.to_string()))?;
        let key = flat_key(&owner.flat_id);

        let year_one = self
            .year_one
            .get(&key)
            .cloned()
            .unwrap_or_else(|| YearOnePayment::missing(&owner.flat_id));
        let year_two = self
            .year_two
            .get(&key)
            .cloned()
            .unwrap_or_else(|| YearTwoPayment::missing(&owner.flat_id, self.config.dues.q1_due));

        let monthly_rates = self.monthly_rates();
        let derived = derive_owner_status(owner, &year_one, &year_two, &monthly_rates, &self.config);

        info!(
            "Built dashboard for flat {}: {} (balance {})",
            owner.flat_id, derived.q1_status, derived.current_balance
        );

        Ok(DashboardData {
            owner: owner.clone(),
            year_one,
            year_two,
            monthly_rates,
            dues: self.config.dues,
            derived,
        })
    }

    /// Owners matching `query` by flat, name or possession date.
    ///
    /// Tries a plain case-insensitive substring, then a substring over letters and digits
    /// only ("1 B 3" finds "1B3"), then requires every whitespace-separated token to appear.
    pub fn search_owners(&self, query: &str) -> Vec<&Owner> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return self.owners.iter().collect();
        }

        let term_normalized = normalize_alphanumeric(&term);
        let tokens: Vec<&str> = term.split_whitespace().collect();

        self.owners
            .iter()
            .filter(|owner| {
                let flat = owner.flat_id.to_lowercase();
                let name = owner.name.to_lowercase();
                let possession = owner.possession_date.to_lowercase();

                if flat.contains(&term) || name.contains(&term) || possession.contains(&term) {
                    return true;
                }

                if !term_normalized.is_empty()
                    && (normalize_alphanumeric(&flat).contains(&term_normalized)
                        || normalize_alphanumeric(&name).contains(&term_normalized))
                {
                    return true;
                }

                let target = format!("{} {} {}", flat, name, possession);
                tokens.iter().all(|token| target.contains(token))
            })
            .collect()
    }

    pub fn collection_summary(&self) -> CollectionSummary {
        let year_one_collected: f64 = self.year_one.values().map(|p| p.paid_total).sum();
        let year_one_outstanding: f64 = self.year_one.values().map(|p| p.outstanding).sum();
        let year_two_collected: f64 = self.year_two.values().map(|p| p.paid_total).sum();

        let possible = year_one_collected + year_one_outstanding;
        let collection_rate = if possible > 0.0 {
            year_one_collected * 100.0 / possible
        } else {
            0.0
        };

        CollectionSummary {
            total_units: self.owners.len(),
            occupied_units: self
                .owners
                .iter()
                .filter(|o| o.possession().is_occupied())
                .count(),
            year_one_collected,
            year_one_outstanding,
            year_two_collected,
            collection_rate,
        }
    }
}

/// Holds the current dataset; an admin sync swaps in a whole new snapshot while readers
/// keep the one they already hold.
#[derive(Debug, Default)]
pub struct PortalStore {
    current: RwLock<Arc<PortalDataset>>,
}

impl PortalStore {
    pub fn new(dataset: PortalDataset) -> Self {
        Self {
            current: RwLock::new(Arc::new(dataset)),
        }
    }

    pub fn snapshot(&self) -> Arc<PortalDataset> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Installs `dataset` and returns the snapshot it replaced.
    pub fn replace(&self, dataset: PortalDataset) -> Arc<PortalDataset> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(dataset))
    }
}
