//! Single-pass traversal and dispatch engine
//!
//! One depth-first walk per file. At each node the engine resolves the
//! public node type, then invokes every listening rule in registration
//! order: simple listeners at visit time, enter handlers before children,
//! exit handlers after, last-entered first-exited for nested nodes of the
//! same type. Every listener invocation runs inside a fault boundary: a
//! panic becomes an error-severity issue attributed to the rule and the
//! current node, and the pass continues for all other rules and nodes.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, span, warn, Level};

use crate::ast::Node;
use crate::context::{ContextOverlay, FileContext, RuleContext};
use crate::diagnostics::{LintIssue, LintResult, Severity};
use crate::error::panic_message;
use crate::node_type::{NodeType, NodeTypeCatalogue, Resolution};
use crate::registry::RuleRegistry;
use crate::result::Result;
use crate::rules::{Listener, ListenerMap, NodeHandler, Rule};

/// Rule id attributed to the parse-failure short circuit
pub const PARSE_RULE_ID: &str = "parse-error";

/// Configuration for a rule engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Working directory exposed to rule contexts
    pub cwd: Option<PathBuf>,
    /// Wall-clock budget per rule per file, enforced between invocations
    ///
    /// The pass is single-threaded, so a listener cannot be preempted
    /// mid-invocation; once a rule's cumulative listener time exceeds the
    /// budget it is muted for the rest of the file and contributes one
    /// error-severity issue.
    pub rule_time_budget: Option<Duration>,
    /// Maximum number of issues a single rule may report per file
    pub max_issues_per_rule: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            rule_time_budget: Some(Duration::from_secs(10)),
            max_issues_per_rule: Some(100),
        }
    }
}

/// The rule engine: owns a registry and runs lint passes against it
///
/// `lint_file` takes `&self` and the registry is read-only during a pass,
/// so callers may lint independent files from multiple threads. Registry
/// mutation (registration, enable/disable, options) happens between passes
/// via [`RuleEngine::registry_mut`].
pub struct RuleEngine {
    registry: RuleRegistry,
    config: EngineConfig,
}

/// Per-file execution state for one rule
struct RuleRunner<'t> {
    rule_id: String,
    ctx: RuleContext<'t>,
    listeners: ListenerMap,
    spent: Duration,
    muted: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enter,
    Exit,
}

impl RuleEngine {
    /// Create an engine with default configuration
    pub fn new(registry: RuleRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(registry: RuleRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// The registry this engine dispatches from
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Mutable registry access, for setup between lint passes
    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lint one file: run every enabled rule over `tree` in a single pass
    ///
    /// `tree` is `None` when the parser failed to produce a tree; the pass
    /// short-circuits into a result holding exactly one parse-failure
    /// issue. Never panics or returns an error: execution faults inside
    /// rules are contained and reported as issues.
    pub fn lint_file(
        &self,
        tree: Option<&Node>,
        source: &str,
        filename: impl AsRef<Path>,
    ) -> LintResult {
        let file_path = filename.as_ref().to_path_buf();
        let lint_span = span!(Level::DEBUG, "lint_file", file = %file_path.display());
        let _enter = lint_span.enter();
        let started = Instant::now();

        let Some(root) = tree else {
            debug!("no syntax tree supplied, short-circuiting");
            let issue = LintIssue {
                rule_id: PARSE_RULE_ID.to_string(),
                severity: Severity::Error,
                message: "no syntax tree was produced for this file".to_string(),
                line: 0,
                column: 0,
                end_line: None,
                end_column: None,
                fix: None,
            };
            return LintResult::new(file_path, vec![issue]);
        };

        let file = Rc::new(FileContext::new(
            file_path.clone(),
            self.config.cwd.clone(),
            source,
            Some(root),
            self.config.max_issues_per_rule,
        ));
        let base = RuleContext::base(Rc::clone(&file));

        // One derived context and one listener map per enabled rule, in
        // registration order. A panicking factory is contained here the
        // same way a panicking listener is during the walk.
        let mut runners: Vec<RuleRunner<'_>> = Vec::new();
        for registered in self.registry.enabled_rules() {
            let rule = &registered.rule;
            let ctx = base.extend(
                ContextOverlay::for_rule(&rule.id).with_options(registered.options.clone()),
            );
            match catch_unwind(AssertUnwindSafe(|| (rule.create)(&ctx))) {
                Ok(listeners) => runners.push(RuleRunner {
                    rule_id: rule.id.clone(),
                    ctx,
                    listeners,
                    spent: Duration::ZERO,
                    muted: false,
                }),
                Err(payload) => {
                    warn!(rule_id = %rule.id, "rule factory panicked, rule skipped for this file");
                    file.push(fault_issue(
                        &rule.id,
                        None,
                        format!("rule factory panicked: {}", panic_message(payload)),
                    ));
                }
            }
        }

        // Node-type batches: direct lookup per node instead of a scan over
        // all rules. Built from the per-file listener maps so runner order
        // (= registration order) is preserved within each batch.
        let mut batches: HashMap<NodeType, Vec<usize>> = HashMap::new();
        for (index, runner) in runners.iter().enumerate() {
            for node_type in runner.listeners.node_types() {
                batches.entry(node_type).or_default().push(index);
            }
        }

        let catalogue = NodeTypeCatalogue::global();
        self.walk(root, &mut runners, &batches, catalogue, &file);

        drop(runners);
        drop(base);
        let issues = file.take_issues();
        debug!(
            issues = issues.len(),
            elapsed = ?started.elapsed(),
            "lint pass complete"
        );
        LintResult::new(file_path, issues)
    }

    fn walk<'t>(
        &self,
        node: &'t Node,
        runners: &mut [RuleRunner<'t>],
        batches: &HashMap<NodeType, Vec<usize>>,
        catalogue: &NodeTypeCatalogue,
        file: &FileContext<'t>,
    ) {
        match catalogue.resolve(node) {
            Resolution::Known(node_type) => {
                if let Some(indices) = batches.get(&node_type) {
                    for &index in indices {
                        self.dispatch(&mut runners[index], node_type, node, Phase::Enter, file);
                    }
                }
                for child in &node.children {
                    self.walk(child, runners, batches, catalogue, file);
                }
                if let Some(indices) = batches.get(&node_type) {
                    for &index in indices {
                        self.dispatch(&mut runners[index], node_type, node, Phase::Exit, file);
                    }
                }
            }
            Resolution::Unknown(tag) => {
                debug!(tag, "tag has no public node type, children still traversed");
                for child in &node.children {
                    self.walk(child, runners, batches, catalogue, file);
                }
            }
        }
    }

    /// Invoke one rule's listener for `node`, inside the fault boundary
    fn dispatch<'t>(
        &self,
        runner: &mut RuleRunner<'t>,
        node_type: NodeType,
        node: &'t Node,
        phase: Phase,
        file: &FileContext<'t>,
    ) {
        if runner.muted {
            return;
        }
        let RuleRunner {
            rule_id,
            ctx,
            listeners,
            spent,
            muted,
        } = runner;
        let Some(listener) = listeners.get_mut(node_type) else {
            return;
        };
        let handler: Option<&mut NodeHandler> = match (listener, phase) {
            (Listener::Simple(handler), Phase::Enter) => Some(handler),
            (Listener::Simple(_), Phase::Exit) => None,
            (Listener::EnterExit { enter, .. }, Phase::Enter) => enter.as_mut(),
            (Listener::EnterExit { exit, .. }, Phase::Exit) => exit.as_mut(),
        };
        let Some(handler) = handler else {
            return;
        };

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| handler(&*ctx, node)));
        *spent += started.elapsed();

        if let Err(payload) = outcome {
            file.push(fault_issue(
                rule_id,
                Some(node),
                format!(
                    "listener for {} panicked: {}",
                    node_type,
                    panic_message(payload)
                ),
            ));
        }

        if let Some(budget) = self.config.rule_time_budget {
            if *spent > budget {
                *muted = true;
                warn!(rule_id = %rule_id, ?budget, "rule exceeded its time budget, muted for this file");
                file.push(budget_issue(rule_id, node, budget));
            }
        }
    }
}

/// Register a rule list and return an engine ready to lint with it
pub fn create_linter(rules: Vec<Rule>) -> Result<RuleEngine> {
    let mut registry = RuleRegistry::new();
    registry.register_rules(rules)?;
    Ok(RuleEngine::new(registry))
}

fn fault_issue(rule_id: &str, node: Option<&Node>, message: String) -> LintIssue {
    let (line, column, end_line, end_column) = match node {
        Some(node) => (
            node.location.start.line,
            node.location.start.column,
            Some(node.location.finish.line),
            Some(node.location.finish.column),
        ),
        None => (0, 0, None, None),
    };
    LintIssue {
        rule_id: rule_id.to_string(),
        severity: Severity::Error,
        message,
        line,
        column,
        end_line,
        end_column,
        fix: None,
    }
}

fn budget_issue(rule_id: &str, node: &Node, budget: Duration) -> LintIssue {
    LintIssue {
        rule_id: rule_id.to_string(),
        severity: Severity::Error,
        message: format!(
            "rule exceeded its time budget of {budget:?}; remaining nodes skipped for this file"
        ),
        line: node.location.start.line,
        column: node.location.start.column,
        end_line: None,
        end_column: None,
        fix: None,
    }
}
