//! Issue, result, and statistics types produced by a lint pass

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ast::SourceRange;
use crate::fixes::RuleFix;

/// Severity levels for reported issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages
    Info,
    /// Warnings that should be addressed
    Warning,
    /// Errors that must be fixed
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// An issue as a rule reports it, before the context stamps the rule id
///
/// The range is optional; issues without one carry zeroed positions in the
/// final [`LintIssue`], meaning "whole file".
#[derive(Debug, Clone)]
pub struct RuleIssue {
    pub severity: Severity,
    pub message: String,
    pub range: Option<SourceRange>,
    pub fix: Option<RuleFix>,
}

impl RuleIssue {
    /// Create a new issue with the given severity
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            range: None,
            fix: None,
        }
    }

    /// Shorthand for an error-severity issue
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Shorthand for a warning-severity issue
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Shorthand for an info-severity issue
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Attach the source range the issue points at
    pub fn at(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Attach a proposed fix
    pub fn with_fix(mut self, fix: RuleFix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Finalize into a [`LintIssue`] attributed to `rule_id`
    pub(crate) fn into_lint_issue(self, rule_id: &str) -> LintIssue {
        let (line, column, end_line, end_column) = match self.range {
            Some(range) => (
                range.start.line,
                range.start.column,
                Some(range.finish.line),
                Some(range.finish.column),
            ),
            None => (0, 0, None, None),
        };
        LintIssue {
            rule_id: rule_id.to_string(),
            severity: self.severity,
            message: self.message,
            line,
            column,
            end_line,
            end_column,
            fix: self.fix,
        }
    }
}

/// A finalized issue in a lint result; never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintIssue {
    /// Id of the rule that produced the issue
    pub rule_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Start line (1-based; 0 when the issue has no position)
    pub line: usize,
    /// Start column (1-based; 0 when the issue has no position)
    pub column: usize,
    /// Optional end position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
    /// Optional proposed fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<RuleFix>,
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.line, self.column, self.severity, self.rule_id, self.message
        )
    }
}

/// Running counts by severity and fixability for one lint result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintStats {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub fixable_errors: usize,
    pub fixable_warnings: usize,
    pub fixable_infos: usize,
}

impl LintStats {
    /// Account for one issue
    pub fn record(&mut self, issue: &LintIssue) {
        let fixable = issue.fix.is_some();
        match issue.severity {
            Severity::Error => {
                self.errors += 1;
                if fixable {
                    self.fixable_errors += 1;
                }
            }
            Severity::Warning => {
                self.warnings += 1;
                if fixable {
                    self.fixable_warnings += 1;
                }
            }
            Severity::Info => {
                self.infos += 1;
                if fixable {
                    self.fixable_infos += 1;
                }
            }
        }
    }

    /// Tally a slice of issues
    pub fn from_issues(issues: &[LintIssue]) -> Self {
        let mut stats = Self::default();
        for issue in issues {
            stats.record(issue);
        }
        stats
    }

    /// Total number of issues counted
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

/// Aggregated outcome of linting one file; immutable once returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintResult {
    /// Path of the linted file
    pub file_path: PathBuf,
    /// All issues, sorted by line, column, then rule id
    pub issues: Vec<LintIssue>,
    /// Severity and fixability tallies
    pub stats: LintStats,
}

impl LintResult {
    /// Build a result from collected issues, sorting them deterministically
    pub fn new(file_path: PathBuf, mut issues: Vec<LintIssue>) -> Self {
        issues.sort_by(|a, b| {
            a.line
                .cmp(&b.line)
                .then_with(|| a.column.cmp(&b.column))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        let stats = LintStats::from_issues(&issues);
        Self {
            file_path,
            issues,
            stats,
        }
    }

    /// Whether the result carries no issues at all
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether the result carries any error-severity issue
    pub fn has_errors(&self) -> bool {
        self.stats.errors > 0
    }
}
