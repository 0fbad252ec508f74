use crate::model::{Allocation, CaseBalance, CaseId, CaseRecord, Money};
use fxhash::FxHashMap;

/// Total cost minus everything already allocated, floored at zero.
pub fn remaining_balance<I>(total_cost: Money, prior_allocations: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    let allocated: Money = prior_allocations.into_iter().sum();
    (total_cost - allocated).max(Money::ZERO)
}

/// Sums allocated amounts per case.
pub fn allocated_by_case<'a, I>(allocations: I) -> FxHashMap<CaseId, Money>
where
    I: IntoIterator<Item = &'a Allocation>,
{
    let mut totals: FxHashMap<CaseId, Money> = FxHashMap::default();
    for allocation in allocations {
        *totals.entry(allocation.case_id).or_insert(Money::ZERO) += allocation.amount;
    }
    totals
}

/// Builds one balance per case, in the order the cases are given.
pub fn outstanding_balances<'a, C>(cases: C, allocations: &[Allocation]) -> Vec<CaseBalance>
where
    C: IntoIterator<Item = &'a CaseRecord>,
{
    let allocated = allocated_by_case(allocations);
    cases
        .into_iter()
        .map(|case| {
            let prior = allocated.get(&case.id).copied().unwrap_or(Money::ZERO);
            CaseBalance::new(case.id, remaining_balance(case.total_cost, [prior]))
        })
        .collect()
}
