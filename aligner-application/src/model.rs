use crate::error::RowNormalizationError;
use aligner_domain::{
    Allocation, AllocationLine, AllocationPlan, CaseId, CaseRecord, CaseStatus, DoctorId, Money,
    Payment,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    /// Pays down the selected cases, spilling any excess onto the doctor's other dues.
    CaseSpecific,
    /// Recorded against the doctor without touching any case.
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub doctor_id: Option<DoctorId>,
    pub amount: Money,
    pub mode: PaymentMode,
    pub selected_case_ids: Vec<CaseId>,
    pub note: Option<String>,
}

impl PaymentRequest {
    pub fn case_specific(
        doctor_id: Option<DoctorId>,
        amount: Money,
        selected_case_ids: Vec<CaseId>,
    ) -> Self {
        Self {
            doctor_id,
            amount,
            mode: PaymentMode::CaseSpecific,
            selected_case_ids,
            note: None,
        }
    }

    pub fn general(doctor_id: Option<DoctorId>, amount: Money) -> Self {
        Self {
            doctor_id,
            amount,
            mode: PaymentMode::General,
            selected_case_ids: Vec::new(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Non-blocking notes shown alongside a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentWarning {
    /// The known dues could not absorb the whole payment.
    AllocationMismatch { unallocated: Money },
    /// Nothing was allocated; the payment stays on the doctor's account.
    Unallocated { amount: Money },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPreview {
    pub request: PaymentRequest,
    pub plan: AllocationPlan,
    /// Plan lines quantized to the currency unit; these are what gets persisted.
    pub allocations: Vec<AllocationLine>,
    pub warnings: Vec<PaymentWarning>,
}

impl PaymentPreview {
    pub fn allocated_total(&self) -> Money {
        self.allocations.iter().map(|line| line.amount).sum()
    }

    pub fn has_mismatch(&self) -> bool {
        self.plan.mismatch
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub allocations: Vec<Allocation>,
    pub preview: PaymentPreview,
}

/// Case row as fetched from storage; every column may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaseRow {
    pub id: u64,
    #[serde(default)]
    pub doctor_id: Option<u64>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub total_cost: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CaseRow {
    /// Builds the case record with its cost floored to `scale` decimal places.
    pub fn normalize(self, scale: u32) -> Result<CaseRecord, RowNormalizationError> {
        let id = CaseId(self.id);
        let total_cost = Money::from_decimal(self.total_cost.unwrap_or(Decimal::ZERO));
        if total_cost.is_negative() {
            return Err(RowNormalizationError::NegativeCost {
                case_id: id,
                cost: total_cost,
            });
        }
        let total_cost = total_cost.floor_to(scale);

        Ok(CaseRecord {
            id,
            doctor_id: self.doctor_id.map(DoctorId),
            patient_name: self.patient_name.unwrap_or_default().trim().to_string(),
            total_cost,
            status: self
                .status
                .as_deref()
                .map(parse_case_status)
                .unwrap_or(CaseStatus::Submitted),
        })
    }
}

/// Prior allocation row; a missing amount counts as zero and the amount is
/// floored to `scale` decimal places.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AllocationRow {
    pub case_id: u64,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

impl AllocationRow {
    pub fn normalize(&self, scale: u32) -> Result<(CaseId, Money), RowNormalizationError> {
        let case_id = CaseId(self.case_id);
        let amount = Money::from_decimal(self.amount.unwrap_or(Decimal::ZERO));
        if amount.is_negative() {
            return Err(RowNormalizationError::NegativeAllocation { case_id, amount });
        }
        Ok((case_id, amount.floor_to(scale)))
    }
}

pub fn parse_case_status(raw: &str) -> CaseStatus {
    let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    match normalized.as_str() {
        "in_treatment" | "in_progress" | "active" => CaseStatus::InTreatment,
        "completed" | "done" => CaseStatus::Completed,
        "cancelled" | "canceled" => CaseStatus::Cancelled,
        _ => CaseStatus::Submitted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn missing_cost_normalizes_to_zero() {
        let row = CaseRow {
            id: 7,
            doctor_id: Some(2),
            ..CaseRow::default()
        };

        let record = row.normalize(2).expect("row should normalize");

        assert_eq!(record.id, CaseId(7));
        assert_eq!(record.doctor_id, Some(DoctorId(2)));
        assert_eq!(record.total_cost, Money::ZERO);
        assert_eq!(record.patient_name, "");
        assert_eq!(record.status, CaseStatus::Submitted);
    }

    #[test]
    fn negative_cost_is_rejected() {
        let row = CaseRow {
            id: 3,
            total_cost: Some(Decimal::new(-100, 0)),
            ..CaseRow::default()
        };

        assert_eq!(
            row.normalize(2),
            Err(RowNormalizationError::NegativeCost {
                case_id: CaseId(3),
                cost: Money::from_i64(-100),
            })
        );
    }

    #[test]
    fn missing_allocation_amount_counts_as_zero() {
        let row = AllocationRow {
            case_id: 4,
            amount: None,
        };
        assert_eq!(row.normalize(2), Ok((CaseId(4), Money::ZERO)));
    }

    #[rstest]
    #[case::cents(2, Money::new(9999, 2))]
    #[case::whole_units(0, Money::from_i64(99))]
    fn cost_is_floored_to_the_currency_scale(#[case] scale: u32, #[case] expected: Money) {
        let row = CaseRow {
            id: 1,
            total_cost: Some(Decimal::new(99_999, 3)),
            ..CaseRow::default()
        };

        let record = row.normalize(scale).expect("row should normalize");

        assert_eq!(record.total_cost, expected);
    }

    #[test]
    fn allocation_amount_is_floored_to_the_currency_scale() {
        let row = AllocationRow {
            case_id: 4,
            amount: Some(Decimal::new(100_005, 3)),
        };
        assert_eq!(row.normalize(2), Ok((CaseId(4), Money::from_i64(100))));
    }

    #[rstest]
    #[case::in_treatment("In Treatment", CaseStatus::InTreatment)]
    #[case::in_progress("in-progress", CaseStatus::InTreatment)]
    #[case::completed(" COMPLETED ", CaseStatus::Completed)]
    #[case::american_spelling("canceled", CaseStatus::Cancelled)]
    #[case::unknown("on_hold", CaseStatus::Submitted)]
    fn parses_loose_status_labels(#[case] raw: &str, #[case] expected: CaseStatus) {
        assert_eq!(parse_case_status(raw), expected);
    }
}
