//! Services for vindec-decoder
//!
//! - `decode_orchestrator`: validate, cache lookup, fetch, merge, persist
//! - `vin_formatter`: sectioned text rendering
//! - `submission_recorder`: contact form VIN capture
//! - `connectivity`: upstream reachability probe

pub mod connectivity;
pub mod decode_orchestrator;
pub mod submission_recorder;
pub mod vin_formatter;

pub use connectivity::{check_connectivity, ConnectivityReport, ProbeStatus};
pub use decode_orchestrator::{DecodeError, DecodeOrchestrator, DecodeOutcome};
pub use submission_recorder::{FormSubmission, SubmissionReceipt, SubmissionRecorder};
pub use vin_formatter::format_record;
