use aligner_domain::{AllocationError, CaseId, Money, PaymentId, RoundingError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("case {0} is not known to the ledger")]
    UnknownCase(CaseId),
    #[error("payment {0} is not known to the ledger")]
    UnknownPayment(PaymentId),
    #[error("payment {0} was already recorded")]
    DuplicatePayment(PaymentId),
    #[error("case {0} was already registered")]
    DuplicateCase(CaseId),
    #[error("payment id sequence is exhausted after {0}")]
    PaymentIdsExhausted(PaymentId),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowNormalizationError {
    #[error("case {case_id} has a negative total cost ({cost})")]
    NegativeCost { case_id: CaseId, cost: Money },
    #[error("allocation for case {case_id} has a negative amount ({amount})")]
    NegativeAllocation { case_id: CaseId, amount: Money },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment amount must be positive (found {0})")]
    InvalidAmount(Money),
    #[error("payment amount {amount} has more than {scale} decimal place(s)")]
    ExcessPrecision { amount: Money, scale: u32 },
    #[error("no cases were selected for a case-specific payment")]
    NoCasesSelected,
    #[error("there are no outstanding cases to allocate this payment to")]
    NoBillableCases,
    #[error("case {0} is not an outstanding case of this doctor")]
    UnknownCase(CaseId),
    #[error("case {0} has no remaining balance")]
    CaseAlreadySettled(CaseId),
    #[error("case {0} was selected more than once")]
    DuplicateSelection(CaseId),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Rounding(#[from] RoundingError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
