#![warn(clippy::uninlined_format_args)]

mod bootstrap;

use aligner_application::{PaymentPreview, PaymentProcessor};
use aligner_infrastructure::{InMemoryLedger, TracingAllocationObserver, load_snapshot_file};
use aligner_presentation::{PaymentSummaryPresenter, format_payment_error};
use bootstrap::{AppConfig, init_logging};
use std::{borrow::Cow, env, process};

type CliResult<T> = Result<T, Cow<'static, str>>;

static OBSERVER: TracingAllocationObserver = TracingAllocationObserver;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let Some(path) = env::args().nth(1) else {
        return Err("Usage: aligner-interpreter <snapshot.json>".into());
    };

    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    let scale = config.settings.scale;
    let snapshot = load_snapshot_file(&path, scale)
        .map_err(|err| format!("Failed to load '{path}': {err}"))?;

    let Some(request) = snapshot.request else {
        return Err("Snapshot has no `request` to preview".into());
    };

    let processor = PaymentProcessor::new(&OBSERVER, config.settings);
    let mut ledger = snapshot.ledger;

    let preview = processor
        .preview(&ledger, &request)
        .map_err(|err| format_payment_error(&err))?;
    print!("{}", PaymentSummaryPresenter::render(&preview, &ledger, scale));

    if snapshot.commit {
        commit(&processor, &mut ledger, preview, scale)?;
    }

    Ok(())
}

fn commit(
    processor: &PaymentProcessor<'_>,
    ledger: &mut InMemoryLedger,
    preview: PaymentPreview,
    scale: u32,
) -> CliResult<()> {
    let receipt = processor
        .commit(ledger, preview)
        .map_err(|err| format_payment_error(&err))?;
    println!();
    println!("{}", PaymentSummaryPresenter::render_receipt(&receipt, scale));
    Ok(())
}
