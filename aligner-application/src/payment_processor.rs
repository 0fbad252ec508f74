use crate::{
    error::PaymentError,
    model::{PaymentMode, PaymentPreview, PaymentReceipt, PaymentRequest, PaymentWarning},
    ports::{LedgerStore, NewPayment},
};
use aligner_domain::{
    AllocationObserver, AllocationSettings, CaseBalance, CaseId, Money,
    compute_allocations_observed, quantize_plan,
};
use fxhash::FxHashSet;

/// Turns operator payment requests into allocation previews and ledger writes.
#[derive(Clone, Copy)]
pub struct PaymentProcessor<'a> {
    observer: &'a dyn AllocationObserver,
    settings: AllocationSettings,
}

struct CasePartition {
    selected: Vec<CaseBalance>,
    unselected: Vec<CaseBalance>,
}

impl<'a> PaymentProcessor<'a> {
    pub fn new(observer: &'a dyn AllocationObserver, settings: AllocationSettings) -> Self {
        Self { observer, settings }
    }

    pub fn settings(&self) -> &AllocationSettings {
        &self.settings
    }

    /// Computes what `request` would allocate against the ledger's current balances.
    pub fn preview(
        &self,
        ledger: &dyn LedgerStore,
        request: &PaymentRequest,
    ) -> Result<PaymentPreview, PaymentError> {
        if !request.amount.is_positive() {
            return Err(PaymentError::InvalidAmount(request.amount));
        }
        let scale = self.settings.scale;
        if request.amount.floor_to(scale) != request.amount {
            return Err(PaymentError::ExcessPrecision {
                amount: request.amount,
                scale,
            });
        }

        let partition = self.partition(ledger, request)?;
        let plan = compute_allocations_observed(
            request.amount,
            &partition.selected,
            &partition.unselected,
            &self.settings,
            self.observer,
        )?;
        let allocations = quantize_plan(&plan, &self.settings)?;

        let mut warnings = Vec::new();
        if plan.is_general() {
            warnings.push(PaymentWarning::Unallocated {
                amount: plan.payment_amount,
            });
        }
        if plan.mismatch {
            tracing::warn!(
                doctor_id = ?request.doctor_id,
                payment_amount = %plan.payment_amount,
                allocated_total = %plan.allocated_total,
                unallocated = %plan.unallocated,
                "Payment exceeds the doctor's known dues"
            );
            warnings.push(PaymentWarning::AllocationMismatch {
                unallocated: plan.unallocated,
            });
        }

        tracing::debug!(
            doctor_id = ?request.doctor_id,
            mode = ?request.mode,
            payment_amount = %plan.payment_amount,
            selected_count = partition.selected.len(),
            unselected_count = partition.unselected.len(),
            line_count = allocations.len(),
            overflow = %plan.overflow,
            "Payment preview computed"
        );

        Ok(PaymentPreview {
            request: request.clone(),
            plan,
            allocations,
            warnings,
        })
    }

    /// Recomputes the preview from fresh balances and records it.
    pub fn submit(
        &self,
        ledger: &mut dyn LedgerStore,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, PaymentError> {
        let preview = self.preview(&*ledger, request)?;
        self.commit(ledger, preview)
    }

    /// Records a preview computed against the ledger's current balances. The
    /// payment and its allocations are written in one call, so a rejected
    /// write leaves the ledger untouched.
    pub fn commit(
        &self,
        ledger: &mut dyn LedgerStore,
        preview: PaymentPreview,
    ) -> Result<PaymentReceipt, PaymentError> {
        let request = &preview.request;
        let lines: Vec<(CaseId, Money)> = preview
            .allocations
            .iter()
            .map(|line| (line.case_id, line.amount))
            .collect();

        let new_payment = NewPayment {
            doctor_id: request.doctor_id,
            amount: request.amount,
            note: request.note.clone(),
        };
        let (payment, allocations) = ledger
            .record_payment_with_allocations(new_payment, &lines)
            .inspect_err(|err| {
                tracing::error!(
                    doctor_id = ?request.doctor_id,
                    amount = %request.amount,
                    allocation_count = lines.len(),
                    error = %err,
                    "Ledger rejected the payment"
                );
            })?;

        tracing::info!(
            payment_id = %payment.id,
            doctor_id = ?payment.doctor_id,
            amount = %payment.amount,
            allocation_count = allocations.len(),
            mismatch = preview.plan.mismatch,
            "Payment recorded"
        );

        Ok(PaymentReceipt {
            payment,
            allocations,
            preview,
        })
    }

    fn partition(
        &self,
        ledger: &dyn LedgerStore,
        request: &PaymentRequest,
    ) -> Result<CasePartition, PaymentError> {
        if request.mode == PaymentMode::General {
            return Ok(CasePartition {
                selected: Vec::new(),
                unselected: Vec::new(),
            });
        }

        let scale = self.settings.scale;
        let at_scale =
            |balance: CaseBalance| CaseBalance::new(balance.case_id, balance.remaining.floor_to(scale));

        let pool = match request.doctor_id {
            Some(doctor_id) => {
                let balances: Vec<CaseBalance> = ledger
                    .balances_for_doctor(doctor_id)?
                    .into_iter()
                    .map(at_scale)
                    .collect();
                if balances.iter().all(|balance| !balance.remaining.is_positive()) {
                    return Err(PaymentError::NoBillableCases);
                }
                Some(balances)
            }
            None => None,
        };

        if request.selected_case_ids.is_empty() {
            return Err(PaymentError::NoCasesSelected);
        }

        let mut chosen: FxHashSet<CaseId> = FxHashSet::default();
        let mut selected = Vec::with_capacity(request.selected_case_ids.len());
        for &case_id in &request.selected_case_ids {
            if !chosen.insert(case_id) {
                return Err(PaymentError::DuplicateSelection(case_id));
            }
            let balance = match &pool {
                Some(pool) => pool.iter().find(|balance| balance.case_id == case_id).copied(),
                None => ledger.balance_of(case_id)?.map(at_scale),
            }
            .ok_or(PaymentError::UnknownCase(case_id))?;
            if !balance.remaining.is_positive() {
                return Err(PaymentError::CaseAlreadySettled(case_id));
            }
            selected.push(balance);
        }

        let unselected = pool
            .unwrap_or_default()
            .into_iter()
            .filter(|balance| {
                !chosen.contains(&balance.case_id) && balance.remaining.is_positive()
            })
            .collect();

        Ok(CasePartition {
            selected,
            unselected,
        })
    }
}
