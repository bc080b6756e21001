//! Terminal rendition of the echo form
//!
//! This module provides the submit handler that validates user input,
//! drives the echo requester and hands results to an injectable reporter.

pub mod controller;
pub mod reporter;


pub use controller::{EchoForm, SubmitOutcome};
pub use reporter::{Reporter, ResultView, TerminalReporter};
