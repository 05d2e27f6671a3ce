use chrono::{Datelike, Month, NaiveDate};

/// Possession-date sentinel for flats that have not been handed over yet.
pub const TBD_POSSESSION: &str = "TBD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PossessionDate {
    /// Handover has not happened yet ("TBD").
    Tbd,
    /// First day of the possession month.
    Known(NaiveDate),
    /// Blank or not in "Mon-YY" form.
    Unrecognized,
}

impl PossessionDate {
    pub fn is_occupied(&self) -> bool {
        !matches!(self, PossessionDate::Tbd)
    }
}

/// Parses a free-form month name ("Sept", "september", "DEC") into a calendar month.
pub fn parse_month_name(name: &str) -> Option<Month> {
    let lower = name.trim().to_lowercase();
    let canonical = if lower == "sept" { "sep" } else { lower.as_str() };
    canonical.parse::<Month>().ok()
}

/// Parses possession dates in the "Mon-YY" form used by the owner registry.
///
/// Four-digit years and space or slash separators are accepted as well
/// ("Nov 2025", "Sept/25").
pub fn parse_possession_date(raw: &str) -> PossessionDate {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case(TBD_POSSESSION) {
        return PossessionDate::Tbd;
    }

    let Some((month_part, year_part)) = trimmed.split_once(&['-', ' ', '/'][..]) else {
        return PossessionDate::Unrecognized;
    };

    let Some(month) = parse_month_name(month_part) else {
        return PossessionDate::Unrecognized;
    };

    let year_part = year_part.trim();
    let year = match (year_part.len(), year_part.parse::<i32>()) {
        (2, Ok(yy)) => 2000 + yy,
        (4, Ok(yyyy)) => yyyy,
        _ => return PossessionDate::Unrecognized,
    };

    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
        .map(PossessionDate::Known)
        .unwrap_or(PossessionDate::Unrecognized)
}

/// Months elapsed from `start` to `end`, ignoring the day of month.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Canonical lookup key for a flat code: whitespace removed, upper-cased.
pub fn flat_key(flat_id: &str) -> String {
    flat_id
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Lower-cased with everything except ASCII letters and digits removed.
pub fn normalize_alphanumeric(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
