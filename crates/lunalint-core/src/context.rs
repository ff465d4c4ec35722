//! Per-(file, rule) contexts
//!
//! One immutable base context per file holds the shared pieces (filename,
//! source text, issue sink, lazy parent table). Each rule receives a derived
//! context built by explicit value construction: the shared pieces are
//! referenced, never copied, and the rule-specific fields (rule id, options)
//! are set directly. Contexts expose no mutators.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::{Node, SourceRange};
use crate::diagnostics::{LintIssue, RuleIssue};
use crate::error::LintError;
use crate::fixes::RuleFix;
use crate::result::Result;

/// Shared per-file state, owned by the engine for one lint pass
pub(crate) struct FileContext<'t> {
    filename: PathBuf,
    cwd: Option<PathBuf>,
    source: &'t str,
    tree: Option<&'t Node>,
    issues: RefCell<Vec<LintIssue>>,
    issue_counts: RefCell<HashMap<String, usize>>,
    max_issues_per_rule: Option<usize>,
    parents: RefCell<Option<HashMap<usize, &'t Node>>>,
}

impl<'t> FileContext<'t> {
    pub(crate) fn new(
        filename: PathBuf,
        cwd: Option<PathBuf>,
        source: &'t str,
        tree: Option<&'t Node>,
        max_issues_per_rule: Option<usize>,
    ) -> Self {
        Self {
            filename,
            cwd,
            source,
            tree,
            issues: RefCell::new(Vec::new()),
            issue_counts: RefCell::new(HashMap::new()),
            max_issues_per_rule,
            parents: RefCell::new(None),
        }
    }

    /// Append an issue without per-rule capping (engine fault path)
    pub(crate) fn push(&self, issue: LintIssue) {
        self.issues.borrow_mut().push(issue);
    }

    /// Drain the collected issues at the end of the pass
    pub(crate) fn take_issues(&self) -> Vec<LintIssue> {
        self.issues.take()
    }
}

/// Stable identity for a node during one pass: its address
fn node_key(node: &Node) -> usize {
    node as *const Node as usize
}

fn index_parents<'t>(parent: &'t Node, map: &mut HashMap<usize, &'t Node>) {
    for child in &parent.children {
        map.insert(node_key(child), parent);
        index_parents(child, map);
    }
}

/// Rule-specific fields overlaid on a base context by [`RuleContext::extend`]
#[derive(Debug, Clone, Default)]
pub struct ContextOverlay {
    pub rule_id: Option<String>,
    pub options: Option<serde_json::Value>,
}

impl ContextOverlay {
    /// Overlay binding a rule id
    pub fn for_rule(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: Some(rule_id.into()),
            options: None,
        }
    }

    /// Attach rule options to the overlay
    pub fn with_options(mut self, options: Option<serde_json::Value>) -> Self {
        self.options = options;
        self
    }
}

/// The context passed into a rule's factory and its handlers
///
/// Immutable; derived contexts share the base's per-file state by reference
/// counting, so `source_text` is never copied per rule.
pub struct RuleContext<'t> {
    file: Rc<FileContext<'t>>,
    rule_id: Option<String>,
    options: Option<serde_json::Value>,
}

impl<'t> RuleContext<'t> {
    /// The shared base context for one file
    pub(crate) fn base(file: Rc<FileContext<'t>>) -> Self {
        Self {
            file,
            rule_id: None,
            options: None,
        }
    }

    /// A context for probing a rule factory at registration time
    pub(crate) fn probe(rule_id: impl Into<String>) -> RuleContext<'static> {
        RuleContext {
            file: Rc::new(FileContext::new(PathBuf::new(), None, "", None, Some(0))),
            rule_id: Some(rule_id.into()),
            options: None,
        }
    }

    /// Derive a new immutable context with `overlay`'s fields set
    ///
    /// The receiver is unchanged; shared per-file state is referenced, not
    /// copied.
    pub fn extend(&self, overlay: ContextOverlay) -> RuleContext<'t> {
        RuleContext {
            file: Rc::clone(&self.file),
            rule_id: overlay.rule_id.or_else(|| self.rule_id.clone()),
            options: overlay.options.or_else(|| self.options.clone()),
        }
    }

    /// Id of the rule this context is bound to (absent on the base context)
    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    /// Path of the file being linted
    pub fn filename(&self) -> &Path {
        &self.file.filename
    }

    /// Working directory the lint run was started from, when known
    pub fn cwd(&self) -> Option<&Path> {
        self.file.cwd.as_deref()
    }

    /// Options configured for this rule, if any
    pub fn options(&self) -> Option<&serde_json::Value> {
        self.options.as_ref()
    }

    /// The full source text of the file
    pub fn source_text(&self) -> &'t str {
        self.file.source
    }

    /// The source text covered by `node` (exclusive end offset)
    pub fn node_text(&self, node: &Node) -> Result<&'t str> {
        self.node_text_around(node, 0, 0)
    }

    /// The source text covered by `node`, widened by `before`/`after` bytes
    pub fn node_text_around(&self, node: &Node, before: usize, after: usize) -> Result<&'t str> {
        let range = node.location;
        let start = range.start.offset.checked_sub(before).ok_or_else(|| {
            LintError::range_error(format!(
                "requested {before} bytes before offset {}, which is negative",
                range.start.offset
            ))
        })?;
        let finish = range.finish.offset.checked_add(after).ok_or_else(|| {
            LintError::range_error(format!(
                "requested {after} bytes after offset {}, which overflows",
                range.finish.offset
            ))
        })?;
        if finish > self.file.source.len() {
            return Err(LintError::range_error(format!(
                "requested end offset {finish} exceeds source length {}",
                self.file.source.len()
            )));
        }
        if start > finish {
            return Err(LintError::range_error(format!(
                "requested range is inverted: {start} > {finish}"
            )));
        }
        self.file.source.get(start..finish).ok_or_else(|| {
            LintError::range_error(format!(
                "range {start}..{finish} does not fall on character boundaries"
            ))
        })
    }

    /// Build a fix replacing `range` with `text`
    ///
    /// Validates the range at construction time: well-formed positions,
    /// `start.offset <= finish.offset`, and within the source bounds.
    pub fn create_fix(&self, range: SourceRange, text: impl Into<String>) -> Result<RuleFix> {
        if range.finish.offset > self.file.source.len() {
            return Err(LintError::range_error(format!(
                "fix finish offset {} exceeds source length {}",
                range.finish.offset,
                self.file.source.len()
            )));
        }
        RuleFix::new(range, text)
    }

    /// Report an issue, stamped with this context's rule id
    ///
    /// Appends to the shared per-file issue list; no other context state
    /// changes. Reports beyond the engine's per-rule cap are dropped.
    pub fn report(&self, issue: RuleIssue) {
        let rule_id = self.rule_id.as_deref().unwrap_or("unknown");
        if let Some(max) = self.file.max_issues_per_rule {
            let mut counts = self.file.issue_counts.borrow_mut();
            let count = counts.entry(rule_id.to_string()).or_insert(0);
            if *count >= max {
                if *count == max {
                    tracing::debug!(rule_id, max, "per-rule issue cap reached, dropping report");
                    *count += 1;
                }
                return;
            }
            *count += 1;
        }
        self.file
            .issues
            .borrow_mut()
            .push(issue.into_lint_issue(rule_id));
    }

    /// Parent of `node` in the tree being linted
    ///
    /// The parent index is built on first call, memoized in a side table
    /// keyed by node address, and owned by this file's pass; the tree itself
    /// is never mutated.
    pub fn parent(&self, node: &'t Node) -> Option<&'t Node> {
        let mut parents = self.file.parents.borrow_mut();
        let map = parents.get_or_insert_with(|| {
            let mut map = HashMap::new();
            if let Some(root) = self.file.tree {
                index_parents(root, &mut map);
            }
            map
        });
        map.get(&node_key(node)).copied()
    }
}
