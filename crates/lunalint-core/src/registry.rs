//! Rule registry: stores rules and indexes them by node type
//!
//! The index is what makes per-node dispatch cost independent of the total
//! rule count: each node type maps to the ids of the rules listening on it,
//! in registration order, so the engine does a direct lookup per node
//! instead of scanning all rules.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexMap;

use crate::context::RuleContext;
use crate::error::{panic_message, LintError};
use crate::node_type::NodeType;
use crate::result::Result;
use crate::rules::Rule;

/// A rule plus its registration state; owned exclusively by the registry
#[derive(Debug)]
pub struct RegisteredRule {
    /// The rule definition
    pub rule: Rule,
    /// Node types derived from the rule's listener map at registration
    pub node_types: Vec<NodeType>,
    /// Whether the rule participates in lint passes
    pub enabled: bool,
    /// Per-rule option overrides, handed to the rule's contexts
    pub options: Option<serde_json::Value>,
}

/// Registry of rules, indexed by id and by subscribed node type
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: IndexMap<String, RegisteredRule>,
    by_node_type: HashMap<NodeType, Vec<String>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule
    ///
    /// Validates the definition, probes the factory once against a probe
    /// context to derive and validate its listener map, and indexes the
    /// rule under every node type it listens on. A duplicate id is rejected
    /// with the prior registration left untouched.
    pub fn register_rule(&mut self, rule: Rule) -> Result<()> {
        self.register_rule_with_options(rule, None)
    }

    /// Register a rule together with its option overrides
    pub fn register_rule_with_options(
        &mut self,
        rule: Rule,
        options: Option<serde_json::Value>,
    ) -> Result<()> {
        rule.validate()?;
        if self.rules.contains_key(&rule.id) {
            return Err(LintError::duplicate_rule(&rule.id));
        }
        let node_types = Self::probe_node_types(&rule)?;
        self.commit(rule, node_types, options);
        Ok(())
    }

    /// Register a sequence of rules, all-or-nothing
    ///
    /// Every rule in the batch is validated and probed before the registry
    /// is touched; if any rule is invalid or duplicates an id (within the
    /// batch or against existing registrations), nothing is registered.
    pub fn register_rules(&mut self, rules: Vec<Rule>) -> Result<()> {
        let mut staged = Vec::with_capacity(rules.len());
        let mut batch_ids = HashSet::new();
        for rule in rules {
            rule.validate()?;
            if self.rules.contains_key(&rule.id) || !batch_ids.insert(rule.id.clone()) {
                return Err(LintError::duplicate_rule(&rule.id));
            }
            let node_types = Self::probe_node_types(&rule)?;
            staged.push((rule, node_types));
        }
        for (rule, node_types) in staged {
            self.commit(rule, node_types, None);
        }
        Ok(())
    }

    /// Remove a rule from the id index and every node-type index
    pub fn unregister_rule(&mut self, id: &str) -> bool {
        let Some(registered) = self.rules.shift_remove(id) else {
            return false;
        };
        for node_type in &registered.node_types {
            if let Some(ids) = self.by_node_type.get_mut(node_type) {
                ids.retain(|rule_id| rule_id != id);
                if ids.is_empty() {
                    self.by_node_type.remove(node_type);
                }
            }
        }
        tracing::debug!(rule_id = id, "unregistered rule");
        true
    }

    /// Enabled rules listening on `node_type`, in registration order
    ///
    /// Reflects live enable/disable state; a disabled rule drops out of
    /// this view without being unregistered.
    pub fn rules_for_node_type(&self, node_type: NodeType) -> Vec<&RegisteredRule> {
        self.by_node_type
            .get(&node_type)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.rules.get(id))
                    .filter(|registered| registered.enabled)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All node types at least one rule listens on
    pub fn all_node_types(&self) -> Vec<NodeType> {
        self.by_node_type.keys().copied().collect()
    }

    /// All registered rules, enabled or not, in registration order
    pub fn all_rules(&self) -> Vec<&RegisteredRule> {
        self.rules.values().collect()
    }

    /// Look up a rule by id
    pub fn rule_by_id(&self, id: &str) -> Option<&RegisteredRule> {
        self.rules.get(id)
    }

    /// Whether a rule with this id is registered
    pub fn is_registered(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// Enable or disable a rule; `false` for unknown ids
    pub fn set_rule_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.rules.get_mut(id) {
            Some(registered) => {
                registered.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Replace a rule's option overrides; `false` for unknown ids
    pub fn set_rule_options(&mut self, id: &str, options: serde_json::Value) -> bool {
        match self.rules.get_mut(id) {
            Some(registered) => {
                registered.options = Some(options);
                true
            }
            None => false,
        }
    }

    /// Remove every registration
    pub fn clear(&mut self) {
        self.rules.clear();
        self.by_node_type.clear();
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Enabled rules in registration order
    pub(crate) fn enabled_rules(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.values().filter(|registered| registered.enabled)
    }

    /// Run the factory once against a probe context and validate the result
    fn probe_node_types(rule: &Rule) -> Result<Vec<NodeType>> {
        let probe = RuleContext::probe(&rule.id);
        let listeners = catch_unwind(AssertUnwindSafe(|| (rule.create)(&probe))).map_err(
            |payload| {
                LintError::rule_error(
                    &rule.id,
                    format!(
                        "factory panicked during registration: {}",
                        panic_message(payload)
                    ),
                )
            },
        )?;
        listeners.validate()?;
        let node_types = listeners.node_types();
        if node_types.is_empty() {
            tracing::warn!(rule_id = %rule.id, "rule subscribes to no node types");
        }
        Ok(node_types)
    }

    fn commit(&mut self, rule: Rule, node_types: Vec<NodeType>, options: Option<serde_json::Value>) {
        let id = rule.id.clone();
        for node_type in &node_types {
            self.by_node_type
                .entry(*node_type)
                .or_default()
                .push(id.clone());
        }
        tracing::debug!(rule_id = %id, node_types = node_types.len(), "registered rule");
        self.rules.insert(
            id,
            RegisteredRule {
                rule,
                node_types,
                enabled: true,
                options,
            },
        );
    }
}
