#![warn(clippy::uninlined_format_args)]

pub mod error_presenter;
pub mod summary_presenter;

pub use error_presenter::format_payment_error;
pub use summary_presenter::{PaymentSummaryPresenter, format_amount};
