use aligner_application::{LedgerError, PaymentError};
use aligner_domain::{AllocationError, RoundingError};

/// Message shown to the operator when a payment cannot be submitted.
pub fn format_payment_error(error: &PaymentError) -> String {
    match error {
        PaymentError::InvalidAmount(amount) => {
            format!("Enter a payment amount greater than zero (got {amount}).")
        }
        PaymentError::ExcessPrecision { amount, scale } => {
            format!("Enter the payment amount with at most {scale} decimal place(s) (got {amount}).")
        }
        PaymentError::NoCasesSelected => {
            "Select at least one case, or record this as a general payment.".to_string()
        }
        PaymentError::NoBillableCases => {
            "This doctor has no outstanding cases; record a general payment instead.".to_string()
        }
        PaymentError::UnknownCase(case_id) => {
            format!("Case {case_id} is not an outstanding case for this doctor.")
        }
        PaymentError::CaseAlreadySettled(case_id) => {
            format!("Case {case_id} is already fully paid.")
        }
        PaymentError::DuplicateSelection(case_id) => {
            format!("Case {case_id} was selected more than once.")
        }
        PaymentError::Allocation(err) => format_allocation_error(err),
        PaymentError::Rounding(err) => format_rounding_error(err),
        PaymentError::Ledger(err) => format_ledger_error(err),
    }
}

fn format_allocation_error(error: &AllocationError) -> String {
    match error {
        AllocationError::InvalidAmount(amount) => {
            format!("Enter a payment amount greater than zero (got {amount}).")
        }
        AllocationError::NonPositiveSelectedBalance { case_id } => {
            format!("Case {case_id} is already fully paid.")
        }
        AllocationError::NegativeBalance { case_id, remaining } => {
            format!("Case {case_id} has an invalid balance ({remaining}); check its billing history.")
        }
        AllocationError::DuplicateCase { case_id } => {
            format!("Case {case_id} was selected more than once.")
        }
        AllocationError::ArithmeticOverflow => {
            "The payment amount is too large to allocate.".to_string()
        }
    }
}

fn format_rounding_error(error: &RoundingError) -> String {
    format!("The allocation could not be rounded to currency units ({error}).")
}

fn format_ledger_error(error: &LedgerError) -> String {
    format!("The billing ledger rejected this payment ({error}).")
}
