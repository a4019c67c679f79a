//! Non-fatal issues collected over a pipeline run.
//!
//! Unknown stations, unknown post-processing methods, substituted window sizes,
//! masked unit codes and missing input files never abort a run. Each stage
//! records what it substituted or skipped here and carries on with whatever it
//! could align; the CLI prints the collection at the end.
//!
//! ```
//! use peak_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.warn("window", "window size set to 13 by default");
//! diag.error_for("station", "no weather site configured", "HEMYOCK CB 56_24");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A default was substituted and the stage continued.
    Warning,
    /// Something (usually a station) was left out of the run.
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Short grouping key: `station`, `window`, `method`, `units`, `file`, ...
    pub category: String,
    pub message: String,
    /// What the issue is about, usually a station name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, category: &str, message: &str, entity: Option<&str>) -> Self {
        Self {
            severity,
            category: category.to_string(),
            message: message.to_string(),
            entity: entity.map(str::to_string),
        }
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity.as_str(), self.category)?;
        match &self.entity {
            Some(entity) => write!(f, " {entity}: {}", self.message),
            None => write!(f, " {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, category: &str, message: &str) {
        self.push(Severity::Warning, category, message, None);
    }

    pub fn warn_for(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Warning, category, message, Some(entity));
    }

    pub fn error(&mut self, category: &str, message: &str) {
        self.push(Severity::Error, category, message, None);
    }

    pub fn error_for(&mut self, category: &str, message: &str, entity: &str) {
        self.push(Severity::Error, category, message, Some(entity));
    }

    fn push(&mut self, severity: Severity, category: &str, message: &str, entity: Option<&str>) {
        self.issues
            .push(DiagnosticIssue::new(severity, category, message, entity));
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Issue counts per category, split as `(warnings, errors)`.
    pub fn category_counts(&self) -> BTreeMap<&str, (usize, usize)> {
        let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for issue in &self.issues {
            let entry = counts.entry(issue.category.as_str()).or_default();
            match issue.severity {
                Severity::Warning => entry.0 += 1,
                Severity::Error => entry.1 += 1,
            }
        }
        counts
    }

    /// Absorb the issues of a per-station run.
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = [Severity::Warning, Severity::Error]
            .into_iter()
            .map(|severity| (severity, self.count(severity)))
            .filter(|(_, n)| *n > 0)
            .map(|(severity, n)| {
                let plural = if n == 1 { "" } else { "s" };
                format!("{n} {}{plural}", severity.as_str())
            })
            .collect();
        if parts.is_empty() {
            "No issues".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}
