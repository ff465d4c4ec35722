//! Fix descriptors and the batch fix-application contract
//!
//! Rules create [`RuleFix`] values through the context; the engine never
//! applies them on its own. [`apply_fixes`] is the batch contract for
//! collaborators that do: sort by range start, flag any two overlapping
//! fixes as a conflict instead of silently applying both, then apply the
//! survivors from the highest offset down so earlier offsets stay valid.

use serde::{Deserialize, Serialize};

use crate::ast::SourceRange;
use crate::error::LintError;
use crate::result::Result;

/// A proposed text replacement over a source range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFix {
    /// Range to replace (half-open byte offsets)
    pub range: SourceRange,
    /// Replacement text
    pub text: String,
}

impl RuleFix {
    /// Create a fix, rejecting inverted ranges at construction time
    pub fn new(range: SourceRange, text: impl Into<String>) -> Result<Self> {
        if !range.is_well_formed() {
            return Err(LintError::range_error(format!(
                "fix range is inverted: start offset {} > finish offset {}",
                range.start.offset, range.finish.offset
            )));
        }
        Ok(Self {
            range,
            text: text.into(),
        })
    }

    /// Byte span of this fix as (start, end)
    pub fn span(&self) -> (usize, usize) {
        (self.range.start.offset, self.range.finish.offset)
    }

    /// Whether this fix overlaps another fix's range
    pub fn conflicts_with(&self, other: &RuleFix) -> bool {
        self.range.overlaps(&other.range)
    }
}

/// Two fixes whose ranges overlap; the later one was not applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixConflict {
    /// The fix that was kept
    pub kept: RuleFix,
    /// The overlapping fix that was skipped
    pub skipped: RuleFix,
}

/// Outcome of applying a batch of fixes to source text
#[derive(Debug, Clone, PartialEq)]
pub struct FixApplication {
    /// The rewritten source text
    pub text: String,
    /// Fixes that were applied, in ascending range order
    pub applied: Vec<RuleFix>,
    /// Overlapping fixes that were flagged and skipped
    pub conflicts: Vec<FixConflict>,
}

/// Apply a batch of fixes to `source`
///
/// Fails if any fix range is out of bounds for the source or does not fall
/// on character boundaries. Overlap between fixes is not an error; the
/// overlapping fix encountered later (in ascending start order) is recorded
/// as a [`FixConflict`] and skipped.
pub fn apply_fixes(source: &str, fixes: &[RuleFix]) -> Result<FixApplication> {
    for fix in fixes {
        let (start, finish) = fix.span();
        if start > finish {
            return Err(LintError::range_error(format!(
                "fix range is inverted: {start} > {finish}"
            )));
        }
        if finish > source.len() {
            return Err(LintError::range_error(format!(
                "fix range {start}..{finish} exceeds source length {}",
                source.len()
            )));
        }
        if source.get(start..finish).is_none() {
            return Err(LintError::range_error(format!(
                "fix range {start}..{finish} does not fall on character boundaries"
            )));
        }
    }

    let mut ordered: Vec<RuleFix> = fixes.to_vec();
    ordered.sort_by_key(RuleFix::span);

    let mut applied: Vec<RuleFix> = Vec::with_capacity(ordered.len());
    let mut conflicts = Vec::new();
    for fix in ordered {
        match applied.last() {
            Some(previous) if fix.range.start.offset < previous.range.finish.offset => {
                tracing::debug!(
                    span = ?fix.span(),
                    "skipping fix overlapping an earlier fix"
                );
                conflicts.push(FixConflict {
                    kept: previous.clone(),
                    skipped: fix,
                });
            }
            _ => applied.push(fix),
        }
    }

    let mut text = source.to_string();
    for fix in applied.iter().rev() {
        let (start, finish) = fix.span();
        text.replace_range(start..finish, &fix.text);
    }

    Ok(FixApplication {
        text,
        applied,
        conflicts,
    })
}
