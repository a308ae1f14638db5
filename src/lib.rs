pub mod config;
pub mod ir;
pub mod types;
pub mod verify;

pub use verify::{VerificationFailure, VerificationReport, verify, verify_module, verify_with};
