use crate::client::EchoResponse;
use std::io::Write;

/// The four display regions of an echo result, defaulted to `""`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultView {
    pub message: String,
    pub version: String,
    pub commit: String,
    pub env: String,
}

impl From<&EchoResponse> for ResultView {
    fn from(response: &EchoResponse) -> Self {
        let [message, version, commit, env] = response.display_fields();
        Self {
            message,
            version,
            commit,
            env,
        }
    }
}

/// Presentation seam between the form and whatever shows it to a person
///
/// The form never prints; everything user-visible goes through here.
pub trait Reporter: Send + Sync {
    /// Clears any previous status and error text
    fn clear(&self);

    fn status(&self, text: &str);

    fn error(&self, text: &str);

    fn result(&self, view: &ResultView);

    /// Called with `true` when a submission starts and `false` when it ends
    fn busy(&self, busy: bool);
}

/// Writes results and status to stdout, errors to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TerminalReporter {
    fn clear(&self) {}

    fn status(&self, text: &str) {
        println!("{text}");
    }

    fn error(&self, text: &str) {
        eprintln!("{text}");
    }

    fn result(&self, view: &ResultView) {
        let mut out = std::io::stdout().lock();
        // Nothing sensible to do if stdout is gone
        let _ = writeln!(
            out,
            "  message: {}\n  version: {}\n  commit:  {}\n  env:     {}",
            view.message, view.version, view.commit, view.env
        );
    }

    fn busy(&self, _busy: bool) {}
}
