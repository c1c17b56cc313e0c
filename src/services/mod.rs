//! Service layer for the drift watcher.
//!
//! This module contains the components the pipeline drives:
//! - Carrier fetching (`SpecSource`, `HttpSpecSource`)
//! - Document extraction (`Extractor`)
//! - Structural comparison (`DiffEngine`, `ProcessDiffEngine`)
//! - Report formatting (`ReportFormatter`)
//! - Delivery (`Notifier`, `WebhookNotifier`)

mod diff_engine;
mod extractor;
mod formatter;
mod notifier;
mod source;

pub use diff_engine::{DiffEngine, ProcessDiffEngine};
pub use extractor::Extractor;
pub use formatter::ReportFormatter;
pub use notifier::{Notifier, WebhookNotifier};
pub use source::{HttpSpecSource, SpecSource};
