//! Column-name resolution for raw rows coming out of the spreadsheet-backed store.
//!
//! Column names drift between revisions of the backing tables ("Flat_No", "Flat No",
//! "flat no"). Every read of a raw row goes through [`normalize`] with a list of known
//! candidate names; code past the ingestion boundary only sees canonical records.

use log::trace;
use serde_json::{Map, Value};

/// A loosely-typed row as fetched from a table.
pub type RawRecord = Map<String, Value>;

/// Canonical field name plus the column names it has been stored under.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub canonical: &'static str,
    pub candidates: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(canonical: &'static str, candidates: &'static [&'static str]) -> Self {
        Self {
            canonical,
            candidates,
        }
    }

    pub fn resolve<'a>(&self, record: &'a RawRecord) -> Option<&'a Value> {
        normalize(record, self.canonical, self.candidates)
    }

    /// The column as trimmed text. Null and blank cells are `None`; numbers are rendered.
    pub fn text(&self, record: &RawRecord) -> Option<String> {
        let text = match self.resolve(record)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Looks up `canonical_field` in `record` under any of `candidate_names`.
///
/// Exact key matches are tried first, in candidate order. Failing that, candidates
/// and record keys are compared with whitespace and underscores removed and case
/// folded. A present-but-null cell counts as a match.
pub fn normalize<'a>(
    record: &'a RawRecord,
    canonical_field: &str,
    candidate_names: &[&str],
) -> Option<&'a Value> {
    for name in candidate_names {
        if let Some(value) = record.get(*name) {
            return Some(value);
        }
    }

    for name in candidate_names {
        let wanted = fold_column_name(name);
        if let Some((key, value)) = record
            .iter()
            .find(|(key, _)| fold_column_name(key) == wanted)
        {
            trace!("Column '{}' resolved via loose match on '{}'", canonical_field, key);
            return Some(value);
        }
    }

    trace!("Column '{}' not present in record", canonical_field);
    None
}

fn fold_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

pub const FLAT_NO: ColumnSpec = ColumnSpec::new(
    "flat_id",
    &["Flat_No", "flat_no", "Flat No", "flat no", "FlatNo"],
);
pub const SERIAL_NUMBER: ColumnSpec = ColumnSpec::new("serial_number", &["SN", "sn", "Sn"]);
pub const OWNER_NAME: ColumnSpec = ColumnSpec::new("name", &["Name", "name"]);
pub const POSSESSION_DATE: ColumnSpec = ColumnSpec::new(
    "possession_date",
    &["Possession_Date", "possession_date", "Possession Date"],
);

/// Year-one month columns in pooling order (Aug through Dec).
pub const YEAR_ONE_MONTHS: [ColumnSpec; 5] = [
    ColumnSpec::new("aug", &["Aug_2025", "aug_2025", "Aug", "aug"]),
    ColumnSpec::new(
        "sep",
        &["Sept_2025", "sept_2025", "Sept", "sept", "Sep", "sep"],
    ),
    ColumnSpec::new("oct", &["Oct_2025", "oct_2025", "Oct", "oct"]),
    ColumnSpec::new("nov", &["Nov_2025", "nov_2025", "Nov", "nov"]),
    ColumnSpec::new("dec", &["Dec_2025", "dec_2025", "Dec", "dec"]),
];
pub const YEAR_ONE_PAID_TOTAL: ColumnSpec = ColumnSpec::new(
    "paid_total",
    &["Total_Paid_in_2025", "total_paid_in_2025"],
);
pub const YEAR_ONE_OUTSTANDING: ColumnSpec = ColumnSpec::new(
    "outstanding",
    &["Outstanding_in_2025", "outstanding_in_2025"],
);

/// Year-two month columns, Jan through Dec.
pub const YEAR_TWO_MONTHS: [ColumnSpec; 12] = [
    ColumnSpec::new("jan", &["January_2026", "january_2026", "January", "january"]),
    ColumnSpec::new("feb", &["February_2026", "february_2026", "February", "february"]),
    ColumnSpec::new("mar", &["March_2026", "march_2026", "March", "march"]),
    ColumnSpec::new("apr", &["April_2026", "april_2026", "April", "april"]),
    ColumnSpec::new("may", &["May_2026", "may_2026", "May", "may"]),
    ColumnSpec::new("jun", &["June_2026", "june_2026", "June", "june"]),
    ColumnSpec::new("jul", &["July_2026", "july_2026", "July", "july"]),
    ColumnSpec::new("aug", &["August_2026", "august_2026", "August", "august"]),
    ColumnSpec::new(
        "sep",
        &["September_2026", "september_2026", "September", "september"],
    ),
    ColumnSpec::new("oct", &["October_2026", "october_2026", "October", "october"]),
    ColumnSpec::new("nov", &["November_2026", "november_2026", "November", "november"]),
    ColumnSpec::new("dec", &["December_2026", "december_2026", "December", "december"]),
];
pub const CARRY_FORWARD: ColumnSpec = ColumnSpec::new(
    "carry_forward",
    &["2025_Carry_Forward", "carry_forward_2025"],
);
pub const Q1_PAYMENT: ColumnSpec = ColumnSpec::new("q1_payment", &["Q1_Payment", "q1_payment"]);
pub const YEAR_TWO_PAID_TOTAL: ColumnSpec =
    ColumnSpec::new("paid_total", &["Paid_Till_Date", "paid_till_date"]);
pub const YEAR_TWO_OUTSTANDING: ColumnSpec = ColumnSpec::new(
    "outstanding",
    &["Outstanding_in_2026", "Outstanding", "outstanding"],
);
pub const REMARKS: ColumnSpec = ColumnSpec::new("remarks", &["Remarks", "remarks", "REMARKS"]);

pub const EXCESS_CARRY_FORWARD: ColumnSpec = ColumnSpec::new(
    "carry_forward",
    &["Carry_Forward_to_2026", "carry_forward_to_2026"],
);
pub const EXPENSE_SHARE: ColumnSpec = ColumnSpec::new(
    "share_per_owner",
    &[
        "Expense borne by each Owner",
        "Expense_borne_by_each_Owner",
        "Expense Borne By Each Owner",
        "expense_borne_by_each_owner",
        "Share per Flat",
        "share_per_flat",
    ],
);
pub const REPORT_MONTH: ColumnSpec = ColumnSpec::new("month", &["Month", "month"]);

pub const CONFIG_KEY: ColumnSpec = ColumnSpec::new("key", &["key", "Key"]);
pub const CONFIG_VALUE: ColumnSpec = ColumnSpec::new("value", &["value", "Value"]);
