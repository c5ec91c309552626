//! Diagnostic creation, severity management, and rendering.
//!
//! This crate provides structured [`Diagnostic`] messages with severity
//! levels, error codes, optional file/line attribution, and suggested fixes
//! in the form of notes and help text. The thread-safe [`DiagnosticSink`]
//! accumulates diagnostics during a generation run, and [`TerminalRenderer`]
//! formats them for console output.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, SourceLocation};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
