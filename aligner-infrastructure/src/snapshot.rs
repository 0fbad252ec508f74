//! JSON ledger snapshots: cases, historical payments and an optional pending
//! payment request.
//!
//! ```json
//! {
//!   "cases": [{ "id": 1, "doctor_id": 7, "patient_name": "A. Patel", "total_cost": "1200.00" }],
//!   "payments": [{ "id": 3, "doctor_id": 7, "amount": 200, "allocations": [{ "case_id": 1, "amount": 200 }] }],
//!   "request": { "doctor_id": 7, "amount": "450.00", "case_ids": [1] },
//!   "commit": false
//! }
//! ```

use crate::ledger::InMemoryLedger;
use aligner_application::{
    AllocationRow, CaseRow, LedgerError, PaymentRequest, RowNormalizationError,
};
use aligner_domain::{CaseId, DoctorId, Money, Payment, PaymentId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Row(#[from] RowNormalizationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    cases: Vec<CaseRow>,
    #[serde(default)]
    payments: Vec<SnapshotPayment>,
    #[serde(default)]
    request: Option<SnapshotRequest>,
    #[serde(default)]
    commit: bool,
}

#[derive(Debug, Deserialize)]
struct SnapshotPayment {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    doctor_id: Option<u64>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    allocations: Vec<AllocationRow>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRequest {
    #[serde(default)]
    doctor_id: Option<u64>,
    amount: Decimal,
    #[serde(default)]
    case_ids: Vec<u64>,
    #[serde(default)]
    general: bool,
    #[serde(default)]
    note: Option<String>,
}

impl SnapshotRequest {
    fn into_request(self) -> PaymentRequest {
        let doctor_id = self.doctor_id.map(DoctorId);
        let amount = Money::from_decimal(self.amount);
        let request = if self.general {
            PaymentRequest::general(doctor_id, amount)
        } else {
            PaymentRequest::case_specific(
                doctor_id,
                amount,
                self.case_ids.into_iter().map(CaseId).collect(),
            )
        };
        match self.note {
            Some(note) => request.with_note(note),
            None => request,
        }
    }
}

pub struct LoadedSnapshot {
    pub ledger: InMemoryLedger,
    pub request: Option<PaymentRequest>,
    pub commit: bool,
}

pub fn load_snapshot_file(
    path: impl AsRef<Path>,
    scale: u32,
) -> Result<LoadedSnapshot, SnapshotError> {
    let source = fs::read_to_string(path)?;
    load_snapshot(&source, scale)
}

/// Parses a snapshot. Case costs and historical allocations are floored to
/// `scale` decimal places.
pub fn load_snapshot(source: &str, scale: u32) -> Result<LoadedSnapshot, SnapshotError> {
    let document: SnapshotDocument = serde_json::from_str(source)?;

    let mut ledger = InMemoryLedger::new();
    for row in document.cases {
        ledger.register_case(row.normalize(scale)?)?;
    }

    let mut next_id: u64 = 1;
    for payment in document.payments {
        let id = payment.id.unwrap_or(next_id);
        let following = id
            .checked_add(1)
            .ok_or(LedgerError::PaymentIdsExhausted(PaymentId(id)))?;
        next_id = next_id.max(following);
        let allocations = payment
            .allocations
            .iter()
            .map(|row| row.normalize(scale))
            .collect::<Result<Vec<_>, _>>()?;
        ledger.import_payment(
            Payment {
                id: PaymentId(id),
                doctor_id: payment.doctor_id.map(DoctorId),
                amount: Money::from_decimal(payment.amount.unwrap_or(Decimal::ZERO)),
                note: payment.note,
            },
            &allocations,
        )?;
    }

    tracing::debug!(
        case_count = ledger.cases().count(),
        payment_count = ledger.payments().len(),
        allocation_count = ledger.allocations().len(),
        has_request = document.request.is_some(),
        "Ledger snapshot loaded"
    );

    Ok(LoadedSnapshot {
        ledger,
        request: document.request.map(SnapshotRequest::into_request),
        commit: document.commit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aligner_application::{CaseDirectory, LedgerStore, PaymentMode};
    use aligner_domain::CaseBalance;

    const SNAPSHOT: &str = r#"{
        "cases": [
            { "id": 1, "doctor_id": 7, "patient_name": " A. Patel ", "total_cost": "1200.00", "status": "in_progress" },
            { "id": 2, "doctor_id": 7, "total_cost": 300 },
            { "id": 3, "doctor_id": 7 }
        ],
        "payments": [
            { "id": 3, "doctor_id": 7, "amount": 200, "allocations": [{ "case_id": 1, "amount": "200.00" }, { "case_id": 2 }] }
        ],
        "request": { "doctor_id": 7, "amount": "450.50", "case_ids": [1], "note": "wire" },
        "commit": true
    }"#;

    #[test]
    fn loads_cases_history_and_request() {
        let snapshot = load_snapshot(SNAPSHOT, 2).expect("snapshot should load");

        let balances = snapshot
            .ledger
            .balances_for_doctor(DoctorId(7))
            .expect("balances should load");
        assert_eq!(
            balances,
            vec![
                CaseBalance::new(CaseId(1), Money::from_i64(1000)),
                CaseBalance::new(CaseId(2), Money::from_i64(300)),
                CaseBalance::new(CaseId(3), Money::ZERO),
            ]
        );

        let case = snapshot.ledger.case(CaseId(1)).expect("case 1 exists");
        assert_eq!(case.patient_name, "A. Patel");

        let request = snapshot.request.expect("request should be present");
        assert_eq!(request.mode, PaymentMode::CaseSpecific);
        assert_eq!(request.amount, Money::new(45050, 2));
        assert_eq!(request.selected_case_ids, vec![CaseId(1)]);
        assert_eq!(request.note.as_deref(), Some("wire"));
        assert!(snapshot.commit);
    }

    #[test]
    fn empty_document_is_an_empty_ledger() {
        let snapshot = load_snapshot("{}", 2).expect("snapshot should load");

        assert_eq!(snapshot.ledger.cases().count(), 0);
        assert!(snapshot.request.is_none());
        assert!(!snapshot.commit);
    }

    #[test]
    fn allocation_to_unknown_case_is_rejected() {
        let source = r#"{ "payments": [{ "amount": 10, "allocations": [{ "case_id": 5, "amount": 10 }] }] }"#;

        let result = load_snapshot(source, 2);

        assert!(matches!(
            result,
            Err(SnapshotError::Ledger(LedgerError::UnknownCase(CaseId(5))))
        ));
    }

    #[test]
    fn negative_case_cost_is_rejected() {
        let source = r#"{ "cases": [{ "id": 1, "total_cost": "-5" }] }"#;

        assert!(matches!(
            load_snapshot(source, 2),
            Err(SnapshotError::Row(RowNormalizationError::NegativeCost { .. }))
        ));
    }

    #[test]
    fn last_payment_id_is_rejected_instead_of_overflowing() {
        let source = r#"{ "payments": [{ "id": 18446744073709551615, "amount": 1 }] }"#;

        assert!(matches!(
            load_snapshot(source, 2),
            Err(SnapshotError::Ledger(LedgerError::PaymentIdsExhausted(PaymentId(u64::MAX))))
        ));
    }

    #[test]
    fn sub_cent_costs_are_floored_on_load() {
        let source = r#"{ "cases": [{ "id": 1, "doctor_id": 7, "total_cost": "99.999" }] }"#;

        let snapshot = load_snapshot(source, 2).expect("snapshot should load");

        assert_eq!(snapshot.ledger.remaining(CaseId(1)), Some(Money::new(9999, 2)));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            load_snapshot("{ cases: ", 2),
            Err(SnapshotError::Json(_))
        ));
    }
}
