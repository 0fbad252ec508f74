//! Quantizes an exact allocation plan to the currency's atomic unit.
//!
//! Every line is floored to the unit, then the residual between the target
//! total and the floored sum is handed out one unit at a time to the lines
//! that lost the most to flooring. Ties go to the earlier line. The target is
//! the allocated total rounded to the unit, but never more than the floored
//! payment or the floored balances of the lines, so a line never receives a
//! unit that would push it past its case's remaining balance.

use crate::model::{AllocationLine, AllocationPlan, AllocationSettings, Money};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use thiserror::Error;

pub const MAX_CURRENCY_SCALE: u32 = 22;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoundingError {
    #[error("currency scale {scale} is not supported (max {max_supported})")]
    UnsupportedScale { scale: u32, max_supported: u32 },
    #[error("{units} rounding unit(s) could not be assigned without exceeding a case balance")]
    ResidualNotAbsorbed { units: usize },
    #[error("rounding residual is not a whole number of units")]
    NonIntegralResidual,
}

/// Returns the plan's lines at `settings.scale`. They sum to the allocated
/// total rounded to that scale, capped by the payment and the case balances
/// floored to that scale. Lines that quantize to zero are dropped.
pub fn quantize_plan(
    plan: &AllocationPlan,
    settings: &AllocationSettings,
) -> Result<Vec<AllocationLine>, RoundingError> {
    validate_scale(settings.scale)?;
    if plan.lines.is_empty() {
        return Ok(Vec::new());
    }

    let scale = settings.scale;
    let unit = settings.atomic_unit();
    let caps: Vec<Money> = plan
        .lines
        .iter()
        .map(|line| line.remaining.floor_to(scale))
        .collect();
    let target = plan
        .allocated_total
        .round_to(scale)
        .min(plan.payment_amount.floor_to(scale))
        .min(caps.iter().sum());

    let mut quantized: Vec<AllocationLine> = plan
        .lines
        .iter()
        .zip(&caps)
        .map(|(line, cap)| AllocationLine {
            amount: line.amount.floor_to(scale).min(*cap),
            ..*line
        })
        .collect();

    let floored_total: Money = quantized.iter().map(|line| line.amount).sum();
    let mut residual = residual_units((target - floored_total).max(Money::ZERO), unit)?;

    if residual > 0 {
        let mut candidates: Vec<(usize, Money)> = plan
            .lines
            .iter()
            .zip(&quantized)
            .enumerate()
            .map(|(idx, (exact, floored))| (idx, exact.amount - floored.amount))
            .filter(|(_, dropped)| dropped.is_positive())
            .collect();
        candidates.sort_by(|(idx_a, dropped_a), (idx_b, dropped_b)| {
            dropped_b.cmp(dropped_a).then_with(|| idx_a.cmp(idx_b))
        });

        for (idx, _) in candidates {
            if residual == 0 {
                break;
            }
            let line = &mut quantized[idx];
            if line.amount + unit > caps[idx] {
                continue;
            }
            line.amount += unit;
            residual -= 1;
        }
    }

    if residual > 0 {
        return Err(RoundingError::ResidualNotAbsorbed { units: residual });
    }

    quantized.retain(|line| line.amount.is_positive());
    Ok(quantized)
}

fn residual_units(residual: Money, unit: Money) -> Result<usize, RoundingError> {
    let units: Decimal = residual.as_decimal() / unit.as_decimal();
    if units.fract() != Decimal::ZERO {
        return Err(RoundingError::NonIntegralResidual);
    }
    units.to_usize().ok_or(RoundingError::NonIntegralResidual)
}

fn validate_scale(scale: u32) -> Result<(), RoundingError> {
    if scale <= MAX_CURRENCY_SCALE {
        return Ok(());
    }
    Err(RoundingError::UnsupportedScale {
        scale,
        max_supported: MAX_CURRENCY_SCALE,
    })
}
