use crate::error::LedgerError;
use aligner_domain::{Allocation, CaseBalance, CaseId, CaseRecord, DoctorId, Money, Payment};
use std::collections::HashMap;

/// Payment record before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub doctor_id: Option<DoctorId>,
    pub amount: Money,
    pub note: Option<String>,
}

/// Persists payments and allocations and supplies current case balances.
pub trait LedgerStore: Send + Sync {
    /// Balances of every case billed to `doctor_id`, in directory order.
    fn balances_for_doctor(&self, doctor_id: DoctorId) -> Result<Vec<CaseBalance>, LedgerError>;

    fn balance_of(&self, case_id: CaseId) -> Result<Option<CaseBalance>, LedgerError>;

    /// Records the payment together with its allocations. Either both are
    /// stored or neither is.
    fn record_payment_with_allocations(
        &mut self,
        payment: NewPayment,
        allocations: &[(CaseId, Money)],
    ) -> Result<(Payment, Vec<Allocation>), LedgerError>;
}

pub trait CaseDirectory: Send + Sync {
    fn case(&self, case_id: CaseId) -> Option<&CaseRecord>;
}

impl CaseDirectory for HashMap<CaseId, CaseRecord> {
    fn case(&self, case_id: CaseId) -> Option<&CaseRecord> {
        self.get(&case_id)
    }
}
