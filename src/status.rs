use crate::config::ExemptFlats;
use crate::remarks::{parse_remarks_status, waived_months};
use crate::schema::{
    DerivedStatus, DueSettings, Owner, Q1Status, StatusBasis, YearOnePayment, YearTwoPayment,
};

/// Deducted from the quarterly due for each month flagged exempt on the record itself.
pub const EXEMPT_MONTH_ADJUSTMENT: f64 = 2000.0;

const AMOUNT_EPSILON: f64 = 1e-9;

/// Q1 due after January/February waivers.
///
/// Remark waivers ("n/a for jan") deduct one monthly maintenance each; the record's
/// `jan_exempt`/`feb_exempt` flags deduct [`EXEMPT_MONTH_ADJUSTMENT`] each. Both apply
/// independently.
pub fn effective_due(payment: &YearTwoPayment, dues: &DueSettings) -> f64 {
    let waived = waived_months(payment.remarks.as_deref());
    let mut due = dues.q1_due - dues.monthly_maintenance * f64::from(waived.count());

    if payment.jan_exempt {
        due -= EXEMPT_MONTH_ADJUSTMENT;
    }
    if payment.feb_exempt {
        due -= EXEMPT_MONTH_ADJUSTMENT;
    }

    due
}

/// Status from money alone: any Q1 payment counts as paid, otherwise the carry-forward decides.
pub fn status_from_payments(carry_forward: f64, q1_payment: f64, effective_due: f64) -> Q1Status {
    if q1_payment > 0.0 {
        Q1Status::Paid
    } else if carry_forward >= effective_due {
        Q1Status::Covered
    } else if carry_forward > 0.0 {
        Q1Status::PartialCovered
    } else {
        Q1Status::Due
    }
}

pub struct StatusResolver<'a> {
    dues: &'a DueSettings,
    exempt_flats: &'a ExemptFlats,
}

impl<'a> StatusResolver<'a> {
    pub fn new(dues: &'a DueSettings, exempt_flats: &'a ExemptFlats) -> Self {
        Self { dues, exempt_flats }
    }

    /// Combines exemption, untouched-due check, remarks and payments into one status.
    ///
    /// Rules apply in that order and the first one that decides wins. A shared-expense
    /// override on the year-one record replaces `shared_expense`.
    pub fn resolve(
        &self,
        owner: &Owner,
        year_one: &YearOnePayment,
        year_two: &YearTwoPayment,
        shared_expense: f64,
    ) -> DerivedStatus {
        let due = effective_due(year_two, self.dues);
        let carry_forward = year_two.carry_forward;
        let q1_payment = year_two.q1_payment;

        let (q1_status, status_basis) = self.q1_status(owner, year_two, due);

        DerivedStatus {
            shared_expense: year_one.shared_expense_override.unwrap_or(shared_expense),
            carry_forward,
            q1_status,
            status_basis,
            effective_due: due,
            lifetime_paid: year_one.monthly.total() + q1_payment,
            current_balance: carry_forward + q1_payment - due,
        }
    }

    fn q1_status(
        &self,
        owner: &Owner,
        year_two: &YearTwoPayment,
        due: f64,
    ) -> (Q1Status, StatusBasis) {
        if self.exempt_flats.contains(&owner.flat_id) {
            return (Q1Status::Paid, StatusBasis::Exemption);
        }

        if (year_two.outstanding - due).abs() < AMOUNT_EPSILON {
            return (Q1Status::Due, StatusBasis::UntouchedDue);
        }

        match parse_remarks_status(year_two.remarks.as_deref()) {
            Q1Status::Due => (
                status_from_payments(year_two.carry_forward, year_two.q1_payment, due),
                StatusBasis::Payments,
            ),
            from_remarks => (from_remarks, StatusBasis::Remarks),
        }
    }
}

pub fn resolve_owner_status(
    owner: &Owner,
    year_one: &YearOnePayment,
    year_two: &YearTwoPayment,
    shared_expense: f64,
    dues: &DueSettings,
    exempt_flats: &ExemptFlats,
) -> DerivedStatus {
    StatusResolver::new(dues, exempt_flats).resolve(owner, year_one, year_two, shared_expense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PoolingAmounts;

    fn owner(flat_id: &str) -> Owner {
        Owner {
            serial_number: 7,
            flat_id: flat_id.to_string(),
            name: "Test Owner".to_string(),
            possession_date: "Aug-25".to_string(),
        }
    }

    fn year_two(carry_forward: f64, q1_payment: f64, outstanding: f64, remarks: &str) -> YearTwoPayment {
        YearTwoPayment {
            carry_forward,
            q1_payment,
            outstanding,
            remarks: (!remarks.is_empty()).then(|| remarks.to_string()),
            ..YearTwoPayment::missing("1B3", 6000.0)
        }
    }

    fn resolve(p2: &YearTwoPayment, exempt: &ExemptFlats) -> DerivedStatus {
        resolve_owner_status(
            &owner("1B3"),
            &YearOnePayment::missing("1B3"),
            p2,
            0.0,
            &DueSettings::default(),
            exempt,
        )
    }

    #[test]
    fn test_exemption_overrides_everything() {
        let exempt = ExemptFlats::new(["1b3"]);
        let derived = resolve(&year_two(0.0, 0.0, 6000.0, ""), &exempt);
        assert_eq!(derived.q1_status, Q1Status::Paid);
        assert_eq!(derived.status_basis, StatusBasis::Exemption);
        assert_eq!(derived.current_balance, -6000.0);
    }

    #[test]
    fn test_untouched_due_beats_remarks_and_payments() {
        let derived = resolve(&year_two(6000.0, 500.0, 6000.0, "Paid till Q2"), &ExemptFlats::default());
        assert_eq!(derived.q1_status, Q1Status::Due);
        assert_eq!(derived.status_basis, StatusBasis::UntouchedDue);
    }

    #[test]
    fn test_remarks_status_adopted() {
        let derived = resolve(&year_two(0.0, 0.0, 0.0, "Paid till Q2"), &ExemptFlats::default());
        assert_eq!(derived.q1_status, Q1Status::Paid);
        assert_eq!(derived.status_basis, StatusBasis::Remarks);

        let derived = resolve(&year_two(0.0, 0.0, 4000.0, "paid"), &ExemptFlats::default());
        assert_eq!(derived.q1_status, Q1Status::PartialPaid);
    }

    #[test]
    fn test_numeric_fallback() {
        let none = ExemptFlats::default();
        assert_eq!(resolve(&year_two(6000.0, 0.0, 0.0, ""), &none).q1_status, Q1Status::Covered);
        assert_eq!(
            resolve(&year_two(3000.0, 0.0, 3000.0, ""), &none).q1_status,
            Q1Status::PartialCovered
        );
        assert_eq!(resolve(&year_two(0.0, 500.0, 5500.0, ""), &none).q1_status, Q1Status::Paid);
        assert_eq!(resolve(&year_two(0.0, 0.0, 0.0, "note"), &none).q1_status, Q1Status::Due);
    }

    #[test]
    fn test_status_from_payments_table() {
        assert_eq!(status_from_payments(6000.0, 0.0, 6000.0), Q1Status::Covered);
        assert_eq!(status_from_payments(3000.0, 0.0, 6000.0), Q1Status::PartialCovered);
        assert_eq!(status_from_payments(0.0, 500.0, 6000.0), Q1Status::Paid);
        assert_eq!(status_from_payments(0.0, 0.0, 6000.0), Q1Status::Due);
    }

    #[test]
    fn test_effective_due_waivers_stack() {
        let dues = DueSettings::default();
        let mut p2 = year_two(0.0, 0.0, 0.0, "N/A for Jan");
        assert_eq!(effective_due(&p2, &dues), 4000.0);

        p2.remarks = Some("n/a for jan; n/a for feb".to_string());
        assert_eq!(effective_due(&p2, &dues), 2000.0);

        p2.remarks = None;
        p2.feb_exempt = true;
        assert_eq!(effective_due(&p2, &dues), 4000.0);

        p2.remarks = Some("n/a for jan".to_string());
        assert_eq!(effective_due(&p2, &dues), 2000.0);
    }

    #[test]
    fn test_waived_month_moves_untouched_sentinel() {
        let derived = resolve(&year_two(0.0, 0.0, 4000.0, "n/a for jan"), &ExemptFlats::default());
        assert_eq!(derived.effective_due, 4000.0);
        assert_eq!(derived.status_basis, StatusBasis::UntouchedDue);
    }

    #[test]
    fn test_totals_and_override() {
        let p1 = YearOnePayment {
            monthly: PoolingAmounts {
                nov: 2000.0,
                dec: 2000.0,
                ..Default::default()
            },
            shared_expense_override: Some(1609.0),
            ..YearOnePayment::missing("1B3")
        };
        let p2 = year_two(2391.0, 4000.0, 0.0, "");
        let derived = resolve_owner_status(
            &owner("1B3"),
            &p1,
            &p2,
            3272.0,
            &DueSettings::default(),
            &ExemptFlats::default(),
        );
        assert_eq!(derived.shared_expense, 1609.0);
        assert_eq!(derived.lifetime_paid, 8000.0);
        assert_eq!(derived.current_balance, 391.0);
        assert_eq!(derived.carry_forward, 2391.0);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let p2 = year_two(3000.0, 0.0, 3000.0, "");
        let first = resolve(&p2, &ExemptFlats::default());
        let second = resolve(&p2, &ExemptFlats::default());
        assert_eq!(first, second);
    }
}
