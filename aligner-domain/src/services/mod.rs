pub mod allocation_engine;
pub mod allocation_rounding;
pub mod balance_derivation;

pub use allocation_engine::{
    AllocationError, AllocationEvent, AllocationObserver, NoopObserver, compute_allocations,
    compute_allocations_observed,
};
pub use allocation_rounding::{MAX_CURRENCY_SCALE, RoundingError, quantize_plan};
pub use balance_derivation::{allocated_by_case, outstanding_balances, remaining_balance};
