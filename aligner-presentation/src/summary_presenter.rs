use aligner_application::{
    CaseDirectory, PaymentMode, PaymentPreview, PaymentReceipt, PaymentWarning,
};
use aligner_domain::{AllocationSource, Money, PaymentStatus};
use std::fmt::Write;

const HEADERS: [&str; 6] = ["Case", "Patient", "Source", "Remaining", "Allocated", "After"];

pub struct PaymentSummaryPresenter;

impl PaymentSummaryPresenter {
    /// Plain-text summary of a preview. Amounts are shown at `scale` places.
    pub fn render(preview: &PaymentPreview, directory: &dyn CaseDirectory, scale: u32) -> String {
        let mut out = String::new();
        let request = &preview.request;

        out.push_str("Payment preview\n");
        if let Some(doctor_id) = request.doctor_id {
            let _ = writeln!(out, "Doctor: {doctor_id}");
        }
        let _ = writeln!(out, "Amount: {}", format_amount(request.amount, scale));
        let _ = writeln!(out, "Mode: {}", mode_label(request.mode));
        if let Some(note) = &request.note {
            let _ = writeln!(out, "Memo: {note}");
        }

        if !preview.allocations.is_empty() {
            out.push('\n');
            let rows: Vec<[String; 6]> = preview
                .allocations
                .iter()
                .map(|line| {
                    let case = directory.case(line.case_id);
                    let patient = case
                        .map(|case| case.patient_name.as_str())
                        .filter(|name| !name.is_empty())
                        .unwrap_or("-");
                    let after = case
                        .map(|case| {
                            PaymentStatus::from_balance(case.total_cost, line.remaining - line.amount)
                                .label()
                        })
                        .unwrap_or("-");
                    [
                        line.case_id.to_string(),
                        patient.to_string(),
                        source_label(line.source).to_string(),
                        format_amount(line.remaining, scale),
                        format_amount(line.amount, scale),
                        after.to_string(),
                    ]
                })
                .collect();
            write_table(&mut out, &rows);
        }

        out.push('\n');
        if !preview.plan.is_general() {
            let _ = writeln!(
                out,
                "Selected total: {}",
                format_amount(preview.plan.selected_total, scale)
            );
            let _ = writeln!(out, "Overflow: {}", format_amount(preview.plan.overflow, scale));
        }
        let _ = writeln!(
            out,
            "Allocated: {}",
            format_amount(preview.allocated_total(), scale)
        );

        for warning in &preview.warnings {
            let _ = writeln!(out, "Note: {}", warning_message(warning, scale));
        }

        out
    }

    pub fn render_receipt(receipt: &PaymentReceipt, scale: u32) -> String {
        format!(
            "Recorded payment #{} of {} with {} allocation(s)",
            receipt.payment.id,
            format_amount(receipt.payment.amount, scale),
            receipt.allocations.len()
        )
    }
}

pub fn format_amount(amount: Money, scale: u32) -> String {
    format!(
        "{:.prec$}",
        amount.round_to(scale).as_decimal(),
        prec = scale as usize
    )
}

fn mode_label(mode: PaymentMode) -> &'static str {
    match mode {
        PaymentMode::CaseSpecific => "case-specific",
        PaymentMode::General => "general",
    }
}

fn source_label(source: AllocationSource) -> &'static str {
    match source {
        AllocationSource::Selected => "selected",
        AllocationSource::Overflow => "overflow",
    }
}

fn warning_message(warning: &PaymentWarning, scale: u32) -> String {
    match warning {
        PaymentWarning::AllocationMismatch { unallocated } => format!(
            "{} exceeds the doctor's outstanding dues and was not allocated; please review",
            format_amount(*unallocated, scale)
        ),
        PaymentWarning::Unallocated { amount } => format!(
            "general payment of {}; no case balances change",
            format_amount(*amount, scale)
        ),
    }
}

fn write_table(out: &mut String, rows: &[[String; 6]]) {
    let mut widths = HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = HEADERS.map(str::to_string);
    for row in std::iter::once(&header).chain(rows) {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(idx, (cell, width))| {
                // Amount columns are right-aligned.
                if matches!(idx, 3 | 4) {
                    format!("{cell:>width$}")
                } else {
                    format!("{cell:<width$}")
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
}
