//! lunalint core
//!
//! Plugin-first rule engine for linting Lua-flavoured sources with an
//! optional typing layer. An external parser supplies a syntax tree plus
//! the original source text; the engine runs every registered rule over the
//! tree in a single pass, collects diagnostics (and optional fixes), and
//! returns an aggregated result per file.

pub mod ast;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fixes;
pub mod node_type;
pub mod registry;
pub mod result;
pub mod rules;

// Re-export commonly used types
pub use ast::{Node, SourcePosition, SourceRange};
pub use context::{ContextOverlay, RuleContext};
pub use diagnostics::{LintIssue, LintResult, LintStats, RuleIssue, Severity};
pub use engine::{create_linter, EngineConfig, RuleEngine, PARSE_RULE_ID};
pub use error::{ErrorKind, LintError};
pub use fixes::{apply_fixes, FixApplication, FixConflict, RuleFix};
pub use node_type::{NodeType, NodeTypeCatalogue, Resolution};
pub use registry::{RegisteredRule, RuleRegistry};
pub use result::{Result, ResultExt};
pub use rules::{
    create_rule, Fixability, Listener, ListenerMap, NodeHandler, Rule, RuleCategory, RuleFactory,
};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lunalint=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
