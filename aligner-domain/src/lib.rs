#![warn(clippy::uninlined_format_args)]

pub mod model;
pub mod services;

pub use model::{
    Allocation, AllocationLine, AllocationPlan, AllocationSettings, AllocationSource, CaseBalance,
    CaseId, CaseRecord, CaseStatus, DoctorId, Money, Payment, PaymentId, PaymentKind,
    PaymentStatus,
};
pub use services::{
    AllocationError, AllocationEvent, AllocationObserver, MAX_CURRENCY_SCALE, NoopObserver,
    RoundingError, compute_allocations, compute_allocations_observed, quantize_plan,
};
