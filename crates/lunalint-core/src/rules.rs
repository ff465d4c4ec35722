//! Rule definitions, listener maps, and their structural validation
//!
//! A rule is metadata plus a factory. The factory runs once per file per
//! rule and returns the listener map for that file; per-file mutable state
//! (a declared/used table, a nesting counter) is created inside the factory
//! body and captured by the handlers it returns.

use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::Node;
use crate::context::RuleContext;
use crate::error::LintError;
use crate::node_type::NodeType;
use crate::result::Result;

/// Categories for organizing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Whitespace and layout preferences
    Formatting,
    /// Style preferences that do not change behavior
    Stylistic,
    /// Checks that catch likely bugs
    Logical,
}

impl RuleCategory {
    /// Return the kebab-case slug used for IDs and filtering
    pub fn slug(&self) -> &'static str {
        match self {
            RuleCategory::Formatting => "formatting",
            RuleCategory::Stylistic => "stylistic",
            RuleCategory::Logical => "logical",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// How a rule's findings can be repaired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fixability {
    /// The rule never produces fixes
    None,
    /// Fixes are safe to apply automatically
    Auto,
    /// Fixes are suggestions requiring review
    Suggestion,
}

impl std::fmt::Display for Fixability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fixability::None => write!(f, "none"),
            Fixability::Auto => write!(f, "auto"),
            Fixability::Suggestion => write!(f, "suggestion"),
        }
    }
}

/// Factory invoked once per file per rule to produce its listener map
pub type RuleFactory = Arc<dyn for<'t> Fn(&RuleContext<'t>) -> ListenerMap + Send + Sync>;

/// A handler invoked when the engine visits a subscribed node
pub type NodeHandler = Box<dyn for<'t> FnMut(&RuleContext<'t>, &'t Node)>;

/// A linting rule: metadata plus the per-file factory
#[derive(Clone)]
pub struct Rule {
    /// Unique identifier within one registry
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Detailed description of what the rule checks
    pub description: String,
    /// Category this rule belongs to
    pub category: RuleCategory,
    /// Whether and how the rule's findings can be fixed
    pub fixable: Fixability,
    /// Documentation URL for the rule
    pub docs_url: String,
    /// Per-file factory producing the rule's listeners
    pub create: RuleFactory,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("fixable", &self.fixable)
            .field("docs_url", &self.docs_url)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Create a new rule with the given parameters
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        category: RuleCategory,
        fixable: Fixability,
        docs_url: impl Into<String>,
        create: RuleFactory,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            category,
            fixable,
            docs_url: docs_url.into(),
            create,
        }
    }

    /// Validate the rule definition
    ///
    /// Failures name the offending field; they are developer mistakes and
    /// are surfaced synchronously to the registrant.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LintError::invalid_rule("id", "cannot be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(LintError::invalid_rule("title", "cannot be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(LintError::invalid_rule("description", "cannot be empty"));
        }
        if self.docs_url.trim().is_empty() {
            return Err(LintError::invalid_rule("docs_url", "cannot be empty"));
        }
        Ok(())
    }
}

/// Validate and return a rule definition
pub fn create_rule(rule: Rule) -> Result<Rule> {
    rule.validate()?;
    Ok(rule)
}

/// A listener registered for one node type
pub enum Listener {
    /// Invoked once per node, at visit time (before children)
    Simple(NodeHandler),
    /// Invoked before and/or after the node's children are visited
    EnterExit {
        enter: Option<NodeHandler>,
        exit: Option<NodeHandler>,
    },
}

impl Listener {
    /// Wrap a plain handler
    pub fn simple(handler: impl for<'t> FnMut(&RuleContext<'t>, &'t Node) + 'static) -> Self {
        Listener::Simple(Box::new(handler))
    }
}

/// Mapping from node types to listeners, in insertion order
///
/// Built with the `on_*` combinators or [`ListenerMap::insert_named`] when
/// keys arrive as strings. Installing a phase for a node type that already
/// has a listener replaces that phase.
#[derive(Default)]
pub struct ListenerMap {
    entries: IndexMap<NodeType, Listener>,
}

impl ListenerMap {
    /// Create an empty listener map
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a simple handler for `node_type`
    pub fn on(
        mut self,
        node_type: NodeType,
        handler: impl for<'t> FnMut(&RuleContext<'t>, &'t Node) + 'static,
    ) -> Self {
        self.entries
            .insert(node_type, Listener::Simple(Box::new(handler)));
        self
    }

    /// Subscribe an enter handler for `node_type`
    pub fn on_enter(
        mut self,
        node_type: NodeType,
        handler: impl for<'t> FnMut(&RuleContext<'t>, &'t Node) + 'static,
    ) -> Self {
        self.set_phase(node_type, Some(Box::new(handler)), None);
        self
    }

    /// Subscribe an exit handler for `node_type`
    pub fn on_exit(
        mut self,
        node_type: NodeType,
        handler: impl for<'t> FnMut(&RuleContext<'t>, &'t Node) + 'static,
    ) -> Self {
        self.set_phase(node_type, None, Some(Box::new(handler)));
        self
    }

    /// Subscribe both enter and exit handlers for `node_type`
    pub fn on_enter_exit(
        mut self,
        node_type: NodeType,
        enter: impl for<'t> FnMut(&RuleContext<'t>, &'t Node) + 'static,
        exit: impl for<'t> FnMut(&RuleContext<'t>, &'t Node) + 'static,
    ) -> Self {
        self.entries.insert(
            node_type,
            Listener::EnterExit {
                enter: Some(Box::new(enter)),
                exit: Some(Box::new(exit)),
            },
        );
        self
    }

    fn set_phase(
        &mut self,
        node_type: NodeType,
        enter: Option<NodeHandler>,
        exit: Option<NodeHandler>,
    ) {
        match self.entries.entry(node_type) {
            indexmap::map::Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Listener::EnterExit {
                    enter: existing_enter,
                    exit: existing_exit,
                } => {
                    if enter.is_some() {
                        *existing_enter = enter;
                    }
                    if exit.is_some() {
                        *existing_exit = exit;
                    }
                }
                simple @ Listener::Simple(_) => {
                    *simple = Listener::EnterExit { enter, exit };
                }
            },
            indexmap::map::Entry::Vacant(vacant) => {
                vacant.insert(Listener::EnterExit { enter, exit });
            }
        }
    }

    /// Insert a listener keyed by a public node-type name
    ///
    /// Resolves `key` through the closed node-type set; an unknown key is a
    /// definition error naming the key, raised before traversal begins.
    pub fn insert_named(&mut self, key: &str, listener: Listener) -> Result<()> {
        let node_type = NodeType::from_str(key)?;
        self.entries.insert(node_type, listener);
        Ok(())
    }

    /// Validate the structural shape of every listener
    ///
    /// An enter/exit pair must carry at least one of the two; violations
    /// name the node type and the missing sub-fields.
    pub fn validate(&self) -> Result<()> {
        for (node_type, listener) in &self.entries {
            if let Listener::EnterExit {
                enter: None,
                exit: None,
            } = listener
            {
                return Err(LintError::invalid_listener(
                    node_type.name(),
                    "enter and exit are both absent; at least one is required",
                ));
            }
        }
        Ok(())
    }

    /// Node types this map subscribes to, in insertion order
    pub fn node_types(&self) -> Vec<NodeType> {
        self.entries.keys().copied().collect()
    }

    /// Number of subscribed node types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no subscriptions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get_mut(&mut self, node_type: NodeType) -> Option<&mut Listener> {
        self.entries.get_mut(&node_type)
    }
}
