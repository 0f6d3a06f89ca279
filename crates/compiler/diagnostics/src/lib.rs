//! # Diagnostics for the Tern compiler
//!
//! Structured diagnostics (severity, code, message, span) shared by the
//! MIR layer and its transformation passes, plus ariadne-based rendering.

pub mod diagnostics;
pub mod reporting;

pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollection, DiagnosticSeverity};
pub use reporting::build_diagnostic_message;
