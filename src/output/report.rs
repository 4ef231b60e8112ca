use std::io::{self, Stdout, Write};

use crate::core::fetcher::{FetchError, RunSummary};

pub const START_BANNER: &str = "--- Starting model prefetch ---";
pub const SUCCESS_MARKER: &str = "[SUCCESS]";
pub const ERROR_MARKER: &str = "[ERROR]";
pub const OFFLINE_HINT: &str =
    "Models now load from the local cache; the application can run offline.";

/// Operator-facing status lines. Write failures are ignored; the run itself
/// never depends on the console.
pub struct Report<W: Write> {
    out: W,
}

impl Report<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn started(&mut self) {
        let _ = writeln!(self.out, "{START_BANNER}");
    }

    pub fn cached(&mut self, model_id: &str) {
        let _ = writeln!(self.out, "   {SUCCESS_MARKER} Cached {model_id}");
    }

    pub fn failed(&mut self, error: &FetchError) {
        let _ = writeln!(
            self.out,
            "   {ERROR_MARKER} Failed to download {}: {}",
            error.model_id, error.message
        );
    }

    pub fn completed(&mut self, summary: &RunSummary) {
        let _ = writeln!(
            self.out,
            "\n--- Prefetch complete: {} cached, {} failed ---",
            summary.cached(),
            summary.failed()
        );
        let _ = writeln!(self.out, "{OFFLINE_HINT}");
        let _ = self.out.flush();
    }
}
