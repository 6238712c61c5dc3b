//! # Diagnostics
//!
//! Components report notable conditions through a [`Reporter`] instead of a
//! global logger. The binary wires in [`TracingReporter`]; tests use
//! [`CollectingReporter`] to assert on what was reported.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{error, info, warn};

/// One column of a table as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub cid: i64,
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A negative vendor timestamp was found and dropped.
    NegativeTimestamp { raw: i64 },
    /// A vendor timestamp could not be represented as a calendar value.
    UnrepresentableTimestamp { raw: i64 },
    /// A profile folder had no history database.
    ProfileSkipped { profile_id: String, reason: String },
    /// Reading a profile failed; the run continues with other profiles.
    ProfileFailed { profile_id: String, error: String },
    /// Schema of one table, captured after a failed history query.
    TableSchema {
        profile_id: String,
        table: String,
        columns: Vec<TableColumn>,
    },
    /// A profile was read successfully.
    ProfileRead { profile_id: String, rows: usize },
}

pub trait Reporter: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::NegativeTimestamp { raw } => {
                warn!("negative timestamp found: {raw}");
            }
            Diagnostic::UnrepresentableTimestamp { raw } => {
                warn!("cannot convert timestamp {raw}: out of range");
            }
            Diagnostic::ProfileSkipped { profile_id, reason } => {
                warn!(profile = %profile_id, "skipping profile: {reason}");
            }
            Diagnostic::ProfileFailed { profile_id, error } => {
                error!(profile = %profile_id, "failed to read history: {error}");
            }
            Diagnostic::TableSchema {
                profile_id,
                table,
                columns,
            } => {
                let columns = serde_json::to_string(&columns).unwrap_or_default();
                info!(profile = %profile_id, "schema of table {table}: {columns}");
            }
            Diagnostic::ProfileRead { profile_id, rows } => {
                info!(profile = %profile_id, "read {rows} history records");
            }
        }
    }
}

/// Keeps every diagnostic in memory, optionally forwarding to another
/// reporter as well.
#[derive(Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<Diagnostic>>,
    forward: Option<Box<dyn Reporter>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(inner: Box<dyn Reporter>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            forward: Some(inner),
        }
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn failed_profiles(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Diagnostic::ProfileFailed { profile_id, .. } => Some(profile_id),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, diagnostic: Diagnostic) {
        if let Some(inner) = &self.forward {
            inner.report(diagnostic.clone());
        }
        if let Ok(mut guard) = self.events.lock() {
            guard.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let reporter = CollectingReporter::new();
        reporter.report(Diagnostic::NegativeTimestamp { raw: -5 });
        reporter.report(Diagnostic::ProfileFailed {
            profile_id: "multitab_1".to_string(),
            error: "boom".to_string(),
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Diagnostic::NegativeTimestamp { raw: -5 });
        assert_eq!(reporter.failed_profiles(), vec!["multitab_1"]);
    }

    #[test]
    fn forwards_to_inner_reporter() {
        let reporter = CollectingReporter::forwarding(Box::new(TracingReporter));
        reporter.report(Diagnostic::ProfileRead {
            profile_id: "multitab_a".to_string(),
            rows: 3,
        });
        assert_eq!(reporter.events().len(), 1);
    }

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let json = serde_json::to_value(Diagnostic::ProfileSkipped {
            profile_id: "multitab_x".to_string(),
            reason: "no history file".to_string(),
        })
        .expect("json");
        assert_eq!(json["kind"], "profile_skipped");
        assert_eq!(json["profile_id"], "multitab_x");
    }
}
