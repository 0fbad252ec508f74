use aligner_domain::{AllocationEvent, AllocationObserver};

/// Forwards allocation events to `tracing` as structured fields.
pub struct TracingAllocationObserver;

impl AllocationObserver for TracingAllocationObserver {
    fn observe(&self, event: AllocationEvent) {
        match event {
            AllocationEvent::CaseAllocated {
                case_id,
                remaining,
                amount,
                source,
            } => {
                tracing::debug!(
                    case_id = %case_id,
                    remaining = %remaining,
                    amount = %amount,
                    source = ?source,
                    "Case allocated"
                );
            }
            AllocationEvent::OverflowDistributed {
                overflow,
                recipients,
                per_case,
            } => {
                tracing::debug!(
                    overflow = %overflow,
                    recipients,
                    per_case = %per_case,
                    "Overflow spread over unselected cases"
                );
            }
            AllocationEvent::GeneralPayment { amount } => {
                tracing::info!(amount = %amount, "General payment left unallocated");
            }
            AllocationEvent::Mismatch {
                payment_amount,
                allocated_total,
                unallocated,
            } => {
                tracing::warn!(
                    payment_amount = %payment_amount,
                    allocated_total = %allocated_total,
                    unallocated = %unallocated,
                    "Allocations do not add up to the payment"
                );
            }
        }
    }
}
