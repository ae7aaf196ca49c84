//! Thread-safe diagnostic accumulator.

use crate::category::Category;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A thread-safe accumulator for diagnostics emitted across pipeline phases.
///
/// Multiple rayon workers may emit concurrently via [`emit`](Self::emit).
/// The error count is tracked atomically so `has_errors` checks do not lock
/// the diagnostic vector.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates a new empty diagnostic sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Emits a diagnostic into the sink.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        let mut diagnostics = self.diagnostics.lock().unwrap();
        diagnostics.push(diag);
    }

    /// Returns `true` if any error-severity diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Returns the exit code of the first fatal diagnostic, or 0.
    pub fn exit_code(&self) -> i32 {
        let diagnostics = self.diagnostics.lock().unwrap();
        diagnostics
            .iter()
            .find(|d| d.severity == Severity::Error)
            .map(|d| d.category.exit_code())
            .unwrap_or(0)
    }

    /// Returns `true` if any diagnostic of `category` has been emitted.
    pub fn has_category(&self, category: Category) -> bool {
        let diagnostics = self.diagnostics.lock().unwrap();
        diagnostics.iter().any(|d| d.category == category)
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.lock().unwrap();
        std::mem::take(&mut *diagnostics)
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let diagnostics = self.diagnostics.lock().unwrap();
        diagnostics.clone()
    }

    /// Renders every accumulated diagnostic to stderr, one line each.
    pub fn render_to_stderr(&self) {
        let diagnostics = self.diagnostics.lock().unwrap();
        for diag in diagnostics.iter() {
            eprintln!("{diag}");
        }
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_error() -> Diagnostic {
        Diagnostic::error(Category::Input, "bad netlist")
    }

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert_eq!(sink.error_count(), 0);
        assert_eq!(sink.exit_code(), 0);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn emit_error_sets_exit_code() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::note(Category::Placement, "placed 10 cells"));
        sink.emit(Diagnostic::error(Category::Congestion, "did not converge"));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.exit_code(), 3);
    }

    #[test]
    fn first_error_wins_exit_code() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error(Category::Input, "bad json"));
        sink.emit(Diagnostic::error(Category::Placement, "no bel"));
        assert_eq!(sink.exit_code(), 1);
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::warning(Category::Input, "unused input"));
        assert!(!sink.has_errors());
        assert_eq!(sink.exit_code(), 0);
    }

    #[test]
    fn has_category() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::note(Category::Cancelled, "stopping"));
        assert!(sink.has_category(Category::Cancelled));
        assert!(!sink.has_category(Category::Congestion));
    }

    #[test]
    fn take_all_drains() {
        let sink = DiagnosticSink::new();
        sink.emit(make_error());
        assert_eq!(sink.take_all().len(), 1);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn concurrent_emission() {
        let sink = std::sync::Arc::new(DiagnosticSink::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sink = sink.clone();
            handles.push(std::thread::spawn(move || sink.emit(make_error())));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.error_count(), 8);
        assert_eq!(sink.diagnostics().len(), 8);
    }
}
