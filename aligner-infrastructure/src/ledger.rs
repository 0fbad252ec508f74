use aligner_application::{CaseDirectory, LedgerError, LedgerStore, NewPayment};
use aligner_domain::{
    Allocation, CaseBalance, CaseId, CaseRecord, DoctorId, Money, Payment, PaymentId,
    services::{allocated_by_case, outstanding_balances, remaining_balance},
};
use indexmap::IndexMap;

/// Ledger kept entirely in memory. Cases keep insertion order; payments and
/// allocations are append-only.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    cases: IndexMap<CaseId, CaseRecord>,
    payments: Vec<Payment>,
    allocations: Vec<Allocation>,
    next_payment_id: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            next_payment_id: 1,
            ..Self::default()
        }
    }

    pub fn with_cases<I>(cases: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = CaseRecord>,
    {
        let mut ledger = Self::new();
        for case in cases {
            ledger.register_case(case)?;
        }
        Ok(ledger)
    }

    pub fn register_case(&mut self, case: CaseRecord) -> Result<(), LedgerError> {
        if self.cases.contains_key(&case.id) {
            return Err(LedgerError::DuplicateCase(case.id));
        }
        self.cases.insert(case.id, case);
        Ok(())
    }

    /// Loads a payment that already exists elsewhere, keeping its id.
    pub fn import_payment(
        &mut self,
        payment: Payment,
        allocations: &[(CaseId, Money)],
    ) -> Result<(), LedgerError> {
        if self.payments.iter().any(|existing| existing.id == payment.id) {
            return Err(LedgerError::DuplicatePayment(payment.id));
        }
        self.ensure_known_cases(allocations)?;
        let following = payment
            .id
            .0
            .checked_add(1)
            .ok_or(LedgerError::PaymentIdsExhausted(payment.id))?;

        self.next_payment_id = self.next_payment_id.max(following);
        self.append(payment, allocations);
        Ok(())
    }

    fn ensure_known_cases(&self, allocations: &[(CaseId, Money)]) -> Result<(), LedgerError> {
        match allocations
            .iter()
            .find(|(case_id, _)| !self.cases.contains_key(case_id))
        {
            Some((case_id, _)) => Err(LedgerError::UnknownCase(*case_id)),
            None => Ok(()),
        }
    }

    fn append(&mut self, payment: Payment, allocations: &[(CaseId, Money)]) -> Vec<Allocation> {
        let payment_id = payment.id;
        let appended: Vec<Allocation> = allocations
            .iter()
            .map(|(case_id, amount)| Allocation {
                payment_id,
                case_id: *case_id,
                amount: *amount,
            })
            .collect();
        self.payments.push(payment);
        self.allocations.extend_from_slice(&appended);
        appended
    }

    pub fn cases(&self) -> impl Iterator<Item = &CaseRecord> + '_ {
        self.cases.values()
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn allocations_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> impl Iterator<Item = &Allocation> + '_ {
        self.allocations
            .iter()
            .filter(move |allocation| allocation.payment_id == payment_id)
    }

    pub fn remaining(&self, case_id: CaseId) -> Option<Money> {
        let case = self.cases.get(&case_id)?;
        let prior = self
            .allocations
            .iter()
            .filter(|allocation| allocation.case_id == case_id)
            .map(|allocation| allocation.amount);
        Some(remaining_balance(case.total_cost, prior))
    }
}

impl LedgerStore for InMemoryLedger {
    fn balances_for_doctor(&self, doctor_id: DoctorId) -> Result<Vec<CaseBalance>, LedgerError> {
        let cases = self
            .cases
            .values()
            .filter(|case| case.doctor_id == Some(doctor_id));
        Ok(outstanding_balances(cases, &self.allocations))
    }

    fn balance_of(&self, case_id: CaseId) -> Result<Option<CaseBalance>, LedgerError> {
        Ok(self
            .remaining(case_id)
            .map(|remaining| CaseBalance::new(case_id, remaining)))
    }

    fn record_payment_with_allocations(
        &mut self,
        payment: NewPayment,
        allocations: &[(CaseId, Money)],
    ) -> Result<(Payment, Vec<Allocation>), LedgerError> {
        self.ensure_known_cases(allocations)?;
        let id = PaymentId(self.next_payment_id);
        let following = self
            .next_payment_id
            .checked_add(1)
            .ok_or(LedgerError::PaymentIdsExhausted(id))?;

        let payment = Payment {
            id,
            doctor_id: payment.doctor_id,
            amount: payment.amount,
            note: payment.note,
        };
        self.next_payment_id = following;
        let appended = self.append(payment.clone(), allocations);
        tracing::debug!(
            payment_id = %payment.id,
            amount = %payment.amount,
            allocation_count = appended.len(),
            case_count = allocated_by_case(&appended).len(),
            "Payment and allocations appended"
        );
        Ok((payment, appended))
    }
}

impl CaseDirectory for InMemoryLedger {
    fn case(&self, case_id: CaseId) -> Option<&CaseRecord> {
        self.cases.get(&case_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aligner_domain::CaseStatus;
    use rstest::{fixture, rstest};

    fn case(id: u64, doctor: u64, total: i64) -> CaseRecord {
        CaseRecord {
            id: CaseId(id),
            doctor_id: Some(DoctorId(doctor)),
            patient_name: format!("patient {id}"),
            total_cost: Money::from_i64(total),
            status: CaseStatus::InTreatment,
        }
    }

    #[fixture]
    fn ledger() -> InMemoryLedger {
        InMemoryLedger::with_cases([case(1, 1, 300), case(2, 2, 150), case(3, 1, 90)])
            .expect("cases should register")
    }

    #[rstest]
    fn balances_only_cover_the_doctors_cases(ledger: InMemoryLedger) {
        let balances = ledger
            .balances_for_doctor(DoctorId(1))
            .expect("balances should load");

        assert_eq!(
            balances,
            vec![
                CaseBalance::new(CaseId(1), Money::from_i64(300)),
                CaseBalance::new(CaseId(3), Money::from_i64(90)),
            ]
        );
    }

    fn new_payment(amount: i64) -> NewPayment {
        NewPayment {
            doctor_id: Some(DoctorId(1)),
            amount: Money::from_i64(amount),
            note: None,
        }
    }

    #[rstest]
    fn recorded_allocations_reduce_remaining(mut ledger: InMemoryLedger) {
        let (payment, allocations) = ledger
            .record_payment_with_allocations(new_payment(100), &[(CaseId(1), Money::from_i64(100))])
            .expect("payment should record");

        assert_eq!(payment.id, PaymentId(1));
        assert_eq!(
            allocations,
            vec![Allocation {
                payment_id: payment.id,
                case_id: CaseId(1),
                amount: Money::from_i64(100),
            }]
        );
        assert_eq!(ledger.remaining(CaseId(1)), Some(Money::from_i64(200)));
        assert_eq!(ledger.allocations_for_payment(payment.id).count(), 1);
    }

    #[rstest]
    fn rejected_allocation_leaves_no_payment_behind(mut ledger: InMemoryLedger) {
        let result = ledger.record_payment_with_allocations(
            new_payment(10),
            &[(CaseId(1), Money::from_i64(5)), (CaseId(42), Money::from_i64(5))],
        );

        assert_eq!(result, Err(LedgerError::UnknownCase(CaseId(42))));
        assert!(ledger.payments().is_empty());
        assert!(ledger.allocations().is_empty());

        let (retry, _) = ledger
            .record_payment_with_allocations(new_payment(10), &[(CaseId(1), Money::from_i64(10))])
            .expect("retry should record");
        assert_eq!(retry.id, PaymentId(1));
        assert_eq!(ledger.payments().len(), 1);
    }

    #[rstest]
    fn general_payment_records_without_allocations(mut ledger: InMemoryLedger) {
        let (payment, allocations) = ledger
            .record_payment_with_allocations(new_payment(60), &[])
            .expect("payment should record");

        assert!(allocations.is_empty());
        assert_eq!(ledger.payments(), &[payment]);
    }

    #[rstest]
    fn imported_payments_advance_the_id_sequence(mut ledger: InMemoryLedger) {
        ledger
            .import_payment(
                Payment {
                    id: PaymentId(41),
                    doctor_id: Some(DoctorId(2)),
                    amount: Money::from_i64(150),
                    note: None,
                },
                &[(CaseId(2), Money::from_i64(150))],
            )
            .expect("import should succeed");

        let (next, _) = ledger
            .record_payment_with_allocations(new_payment(1), &[])
            .expect("payment should record");

        assert_eq!(next.id, PaymentId(42));
        assert_eq!(ledger.remaining(CaseId(2)), Some(Money::ZERO));
    }

    #[rstest]
    fn importing_the_last_payment_id_is_rejected(mut ledger: InMemoryLedger) {
        let result = ledger.import_payment(
            Payment {
                id: PaymentId(u64::MAX),
                doctor_id: None,
                amount: Money::from_i64(1),
                note: None,
            },
            &[],
        );

        assert_eq!(
            result,
            Err(LedgerError::PaymentIdsExhausted(PaymentId(u64::MAX)))
        );
        assert!(ledger.payments().is_empty());
    }

    #[rstest]
    fn exhausted_id_sequence_rejects_new_payments(mut ledger: InMemoryLedger) {
        ledger
            .import_payment(
                Payment {
                    id: PaymentId(u64::MAX - 1),
                    doctor_id: None,
                    amount: Money::from_i64(1),
                    note: None,
                },
                &[],
            )
            .expect("import should succeed");

        assert_eq!(
            ledger.record_payment_with_allocations(new_payment(1), &[]),
            Err(LedgerError::PaymentIdsExhausted(PaymentId(u64::MAX)))
        );
        assert_eq!(ledger.payments().len(), 1);
    }

    #[rstest]
    fn duplicate_case_registration_fails(mut ledger: InMemoryLedger) {
        assert_eq!(
            ledger.register_case(case(1, 1, 10)),
            Err(LedgerError::DuplicateCase(CaseId(1)))
        );
    }

    #[rstest]
    fn directory_lookup_returns_case_metadata(ledger: InMemoryLedger) {
        let record = ledger.case(CaseId(3)).expect("case should exist");
        assert_eq!(record.patient_name, "patient 3");
        assert!(ledger.case(CaseId(9)).is_none());
    }
}
