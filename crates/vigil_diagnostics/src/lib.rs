//! Issue types produced by analysis engines and their terminal rendering.
//!
//! An [`Issue`] is the immutable unit of analysis output: a location, a
//! [`Severity`], a code, a message and the [`IssueSource`] engine family that
//! produced it. [`sort_issues`] gives issues their stable presentation order
//! within one engine, and [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod issue;
pub mod renderer;
pub mod severity;

pub use issue::{sort_issues, Issue, IssueSource, IssueSummary};
pub use renderer::{IssueRenderer, TerminalRenderer};
pub use severity::Severity;
