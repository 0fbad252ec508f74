#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod payment_processor;
pub mod ports;

pub use error::{LedgerError, PaymentError, RowNormalizationError};
pub use model::{
    AllocationRow, CaseRow, PaymentMode, PaymentPreview, PaymentReceipt, PaymentRequest,
    PaymentWarning, parse_case_status,
};
pub use payment_processor::PaymentProcessor;
pub use ports::{CaseDirectory, LedgerStore, NewPayment};
