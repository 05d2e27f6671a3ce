use crate::amounts::clean_optional_amount;
use crate::columns::{self, RawRecord};
use crate::schema::{
    ExpenseRateRow, Owner, PoolingAmounts, PoolingMonth, YearOnePayment, YearTwoPayment,
};
use crate::utils::flat_key;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

/// Rows exactly as fetched from each backing table.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub owners: Vec<RawRecord>,
    pub year_one: Vec<RawRecord>,
    pub year_two: Vec<RawRecord>,
    /// Per-flat carry-forward and shared-expense figures from the society ledger.
    pub excess: Vec<RawRecord>,
    pub expense_report: Vec<RawRecord>,
    pub config: Vec<RawRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExcessEntry {
    pub carry_forward: f64,
    pub shared_expense: f64,
}

/// Excess-table entries keyed by [`flat_key`].
pub type ExcessMap = BTreeMap<String, ExcessEntry>;

pub fn ingest_owner(row: &RawRecord) -> Option<Owner> {
    let flat_id = columns::FLAT_NO.text(row)?;
    let serial = clean_optional_amount(columns::SERIAL_NUMBER.resolve(row));

    Some(Owner {
        serial_number: if serial > 0.0 { serial as u32 } else { 0 },
        flat_id,
        name: columns::OWNER_NAME.text(row).unwrap_or_default(),
        possession_date: columns::POSSESSION_DATE.text(row).unwrap_or_default(),
    })
}

pub fn ingest_owners(rows: &[RawRecord]) -> Vec<Owner> {
    let owners: Vec<Owner> = rows.iter().filter_map(ingest_owner).collect();
    debug!(
        "Ingested {} owners ({} rows without a flat number dropped)",
        owners.len(),
        rows.len() - owners.len()
    );
    owners
}

pub fn ingest_excess(rows: &[RawRecord]) -> ExcessMap {
    rows.iter()
        .filter_map(|row| {
            let flat_id = columns::FLAT_NO.text(row)?;
            let entry = ExcessEntry {
                carry_forward: clean_optional_amount(columns::EXCESS_CARRY_FORWARD.resolve(row)),
                shared_expense: clean_optional_amount(columns::EXPENSE_SHARE.resolve(row)),
            };
            Some((flat_key(&flat_id), entry))
        })
        .collect()
}

pub fn ingest_year_one(row: &RawRecord, excess: &ExcessMap) -> Option<YearOnePayment> {
    let flat_id = columns::FLAT_NO.text(row)?;

    let mut monthly = PoolingAmounts::default();
    for (month, column) in PoolingMonth::ALL.iter().zip(columns::YEAR_ONE_MONTHS.iter()) {
        monthly.set(*month, clean_optional_amount(column.resolve(row)));
    }

    let shared_expense_override = excess
        .get(&flat_key(&flat_id))
        .map(|e| e.shared_expense)
        .filter(|v| *v != 0.0);

    Some(YearOnePayment {
        monthly,
        paid_total: clean_optional_amount(columns::YEAR_ONE_PAID_TOTAL.resolve(row)),
        outstanding: clean_optional_amount(columns::YEAR_ONE_OUTSTANDING.resolve(row)),
        shared_expense_override,
        flat_id,
    })
}

pub fn ingest_year_two(row: &RawRecord, excess: &ExcessMap) -> Option<YearTwoPayment> {
    let flat_id = columns::FLAT_NO.text(row)?;

    let mut monthly = [0.0; 12];
    for (slot, column) in monthly.iter_mut().zip(columns::YEAR_TWO_MONTHS.iter()) {
        *slot = clean_optional_amount(column.resolve(row));
    }

    let ledger_carry_forward = excess
        .get(&flat_key(&flat_id))
        .map(|e| e.carry_forward)
        .filter(|v| *v != 0.0);
    let carry_forward = ledger_carry_forward
        .unwrap_or_else(|| clean_optional_amount(columns::CARRY_FORWARD.resolve(row)));

    Some(YearTwoPayment {
        carry_forward,
        q1_payment: clean_optional_amount(columns::Q1_PAYMENT.resolve(row)),
        monthly,
        paid_total: clean_optional_amount(columns::YEAR_TWO_PAID_TOTAL.resolve(row)),
        outstanding: clean_optional_amount(columns::YEAR_TWO_OUTSTANDING.resolve(row)),
        remarks: columns::REMARKS.text(row),
        jan_exempt: marked_not_applicable(columns::YEAR_TWO_MONTHS[0].resolve(row)),
        feb_exempt: marked_not_applicable(columns::YEAR_TWO_MONTHS[1].resolve(row)),
        flat_id,
    })
}

pub fn ingest_expense_report(rows: &[RawRecord]) -> Vec<ExpenseRateRow> {
    rows.iter()
        .filter_map(|row| {
            Some(ExpenseRateRow {
                month: columns::REPORT_MONTH.text(row)?,
                share_per_owner: columns::EXPENSE_SHARE
                    .resolve(row)
                    .cloned()
                    .unwrap_or(Value::Null),
            })
        })
        .collect()
}

/// A month cell holding "N/A" text instead of an amount.
fn marked_not_applicable(cell: Option<&Value>) -> bool {
    matches!(cell, Some(Value::String(s)) if s.to_lowercase().contains("n/a"))
}
