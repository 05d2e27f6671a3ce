//! Status signals extracted from administrator-entered remark text.
//!
//! Remarks are free-form ("Paid till Q2", "Q1 paid via UPI", "n/a for Jan"). Matching is
//! case-insensitive substring search with a fixed precedence; anything unrecognised
//! resolves to [`Q1Status::Due`].

use crate::schema::Q1Status;

const TILL_QUARTER_PAID: [&str; 8] = [
    "till q4 paid",
    "till q4paid",
    "till q3 paid",
    "till q3paid",
    "till q2 paid",
    "till q2paid",
    "till q1 paid",
    "till q1paid",
];

const QUARTER_PAID: [&str; 8] = [
    "q4 paid", "q4paid", "q3 paid", "q3paid", "q2 paid", "q2paid", "q1 paid", "q1paid",
];

const PAID_TILL: &str = "paid till";
const PAID: &str = "paid";

const JANUARY_WAIVER: &str = "n/a for jan";
const FEBRUARY_WAIVER: &str = "n/a for feb";

pub fn parse_remarks_status(remarks: Option<&str>) -> Q1Status {
    let normalized = normalize(remarks);
    if normalized.is_empty() {
        return Q1Status::Due;
    }

    let quarter_qualified = contains_any(&normalized, &TILL_QUARTER_PAID)
        || contains_any(&normalized, &QUARTER_PAID)
        || normalized.contains(PAID_TILL);

    if quarter_qualified {
        Q1Status::Paid
    } else if normalized.contains(PAID) {
        Q1Status::PartialPaid
    } else {
        Q1Status::Due
    }
}

/// Months the remarks mark as not applicable for this flat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaivedMonths {
    pub january: bool,
    pub february: bool,
}

impl WaivedMonths {
    pub fn count(&self) -> u32 {
        u32::from(self.january) + u32::from(self.february)
    }
}

pub fn waived_months(remarks: Option<&str>) -> WaivedMonths {
    let normalized = normalize(remarks);
    WaivedMonths {
        january: normalized.contains(JANUARY_WAIVER),
        february: normalized.contains(FEBRUARY_WAIVER),
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn normalize(remarks: Option<&str>) -> String {
    remarks.unwrap_or_default().trim().to_lowercase()
}
