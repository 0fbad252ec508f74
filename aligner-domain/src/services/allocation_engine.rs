//! Splits one received payment across a doctor's outstanding cases.
//!
//! Selected cases receive a share proportional to their remaining balance,
//! capped at what they owe. Whatever exceeds the selected total is spread
//! evenly over the remaining unselected cases, again capped per case. A
//! payment with no selection is a general payment and allocates nothing.

use crate::model::{
    AllocationLine, AllocationPlan, AllocationSettings, AllocationSource, CaseBalance, CaseId,
    Money, PaymentKind,
};
use fxhash::FxHashSet;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("payment amount must be positive (found {0})")]
    InvalidAmount(Money),
    #[error("selected case {case_id} has no remaining balance")]
    NonPositiveSelectedBalance { case_id: CaseId },
    #[error("case {case_id} has a negative remaining balance ({remaining})")]
    NegativeBalance { case_id: CaseId, remaining: Money },
    #[error("case {case_id} appears more than once")]
    DuplicateCase { case_id: CaseId },
    #[error("allocation arithmetic overflowed")]
    ArithmeticOverflow,
}

/// Structured trace of a finished computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationEvent {
    CaseAllocated {
        case_id: CaseId,
        remaining: Money,
        amount: Money,
        source: AllocationSource,
    },
    OverflowDistributed {
        overflow: Money,
        recipients: usize,
        per_case: Money,
    },
    GeneralPayment {
        amount: Money,
    },
    Mismatch {
        payment_amount: Money,
        allocated_total: Money,
        unallocated: Money,
    },
}

pub trait AllocationObserver: Send + Sync {
    fn observe(&self, event: AllocationEvent);
}

pub struct NoopObserver;

impl AllocationObserver for NoopObserver {
    fn observe(&self, _event: AllocationEvent) {}
}

/// Computes the per-case breakdown of `payment_amount`.
///
/// Lines keep input order: selected cases in selection order, then unselected
/// cases. Cases that end up with nothing produce no line. The plan's
/// `mismatch` flag is set when the allocated total misses the payment by more
/// than `settings.tolerance`, which only happens when the known dues cannot
/// absorb the whole payment.
pub fn compute_allocations(
    payment_amount: Money,
    selected_cases: &[CaseBalance],
    unselected_cases: &[CaseBalance],
    settings: &AllocationSettings,
) -> Result<AllocationPlan, AllocationError> {
    if !payment_amount.is_positive() {
        return Err(AllocationError::InvalidAmount(payment_amount));
    }
    validate_cases(selected_cases, unselected_cases)?;

    if selected_cases.is_empty() {
        return Ok(AllocationPlan::general(payment_amount));
    }

    let selected_total = checked_total(selected_cases.iter().map(|case| case.remaining))?;
    let mut lines = Vec::with_capacity(selected_cases.len() + unselected_cases.len());

    for case in selected_cases {
        let share = proportional_share(payment_amount, case.remaining, selected_total)?;
        push_line(&mut lines, case, share.min(case.remaining), AllocationSource::Selected);
    }

    let overflow = payment_amount
        .checked_sub(selected_total)
        .ok_or(AllocationError::ArithmeticOverflow)?
        .max(Money::ZERO);

    let mut overflow_share = None;
    if overflow.is_positive() && !unselected_cases.is_empty() {
        let per_case = even_share(overflow, unselected_cases.len())?;
        for case in unselected_cases {
            push_line(&mut lines, case, per_case.min(case.remaining), AllocationSource::Overflow);
        }
        overflow_share = Some(per_case);
    }

    let allocated_total = checked_total(lines.iter().map(|line| line.amount))?;
    let gap = payment_amount
        .checked_sub(allocated_total)
        .ok_or(AllocationError::ArithmeticOverflow)?;

    Ok(AllocationPlan {
        kind: PaymentKind::CaseSpecific,
        payment_amount,
        lines,
        selected_total,
        overflow,
        overflow_share,
        allocated_total,
        unallocated: gap.max(Money::ZERO),
        mismatch: gap.abs() > settings.tolerance,
    })
}

/// Runs [`compute_allocations`] and reports the outcome to `observer`.
pub fn compute_allocations_observed(
    payment_amount: Money,
    selected_cases: &[CaseBalance],
    unselected_cases: &[CaseBalance],
    settings: &AllocationSettings,
    observer: &dyn AllocationObserver,
) -> Result<AllocationPlan, AllocationError> {
    let plan = compute_allocations(payment_amount, selected_cases, unselected_cases, settings)?;
    for event in plan_events(&plan, unselected_cases.len()) {
        observer.observe(event);
    }
    Ok(plan)
}

fn plan_events(plan: &AllocationPlan, unselected_count: usize) -> Vec<AllocationEvent> {
    if plan.is_general() {
        return vec![AllocationEvent::GeneralPayment {
            amount: plan.payment_amount,
        }];
    }

    let mut events: Vec<AllocationEvent> = plan
        .lines
        .iter()
        .map(|line| AllocationEvent::CaseAllocated {
            case_id: line.case_id,
            remaining: line.remaining,
            amount: line.amount,
            source: line.source,
        })
        .collect();

    if let Some(per_case) = plan.overflow_share {
        events.push(AllocationEvent::OverflowDistributed {
            overflow: plan.overflow,
            recipients: unselected_count,
            per_case,
        });
    }

    if plan.mismatch {
        events.push(AllocationEvent::Mismatch {
            payment_amount: plan.payment_amount,
            allocated_total: plan.allocated_total,
            unallocated: plan.unallocated,
        });
    }

    events
}

fn validate_cases(
    selected_cases: &[CaseBalance],
    unselected_cases: &[CaseBalance],
) -> Result<(), AllocationError> {
    let mut seen: FxHashSet<CaseId> = FxHashSet::default();

    for case in selected_cases.iter().chain(unselected_cases) {
        if !seen.insert(case.case_id) {
            return Err(AllocationError::DuplicateCase {
                case_id: case.case_id,
            });
        }
        if case.remaining.is_negative() {
            return Err(AllocationError::NegativeBalance {
                case_id: case.case_id,
                remaining: case.remaining,
            });
        }
    }

    if let Some(case) = selected_cases.iter().find(|case| case.remaining.is_zero()) {
        return Err(AllocationError::NonPositiveSelectedBalance {
            case_id: case.case_id,
        });
    }

    Ok(())
}

fn push_line(
    lines: &mut Vec<AllocationLine>,
    case: &CaseBalance,
    amount: Money,
    source: AllocationSource,
) {
    if !amount.is_positive() {
        return;
    }
    lines.push(AllocationLine {
        case_id: case.case_id,
        remaining: case.remaining,
        amount,
        source,
    });
}

// payment * remaining / total; multiplying first keeps exact shares exact.
fn proportional_share(
    payment_amount: Money,
    remaining: Money,
    selected_total: Money,
) -> Result<Money, AllocationError> {
    payment_amount
        .as_decimal()
        .checked_mul(remaining.as_decimal())
        .and_then(|product| product.checked_div(selected_total.as_decimal()))
        .map(Money::from_decimal)
        .ok_or(AllocationError::ArithmeticOverflow)
}

fn even_share(amount: Money, count: usize) -> Result<Money, AllocationError> {
    amount
        .as_decimal()
        .checked_div(Decimal::from(count))
        .map(Money::from_decimal)
        .ok_or(AllocationError::ArithmeticOverflow)
}

fn checked_total(mut amounts: impl Iterator<Item = Money>) -> Result<Money, AllocationError> {
    amounts.try_fold(Money::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or(AllocationError::ArithmeticOverflow)
    })
}
