//! End-to-end lint runs against hand-built syntax trees

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lunalint_core::{
    apply_fixes, create_linter, EngineConfig, Fixability, LintResult, ListenerMap, Node, NodeType,
    ResultExt, Rule, RuleCategory, RuleContext, RuleEngine, RuleFactory, RuleIssue, RuleRegistry,
    Severity, SourcePosition, SourceRange,
};

fn range(start: usize, finish: usize) -> SourceRange {
    SourceRange::new(
        SourcePosition::new(1, start + 1, start),
        SourcePosition::new(1, finish + 1, finish),
    )
}

fn rule(id: &str, factory: RuleFactory) -> Rule {
    Rule::new(
        id,
        "Test Rule",
        "A rule used by the integration tests",
        RuleCategory::Logical,
        Fixability::None,
        "https://lunalint.dev/rules/test",
        factory,
    )
}

/// `local x = 1`
fn local_declaration_tree() -> Node {
    Node::new("chunk", range(0, 11)).with_child(
        Node::new("local_declaration", range(0, 11))
            .with_child(Node::new("identifier", range(6, 7)).with_name("x"))
            .with_child(Node::new("number", range(10, 11))),
    )
}

#[test]
fn end_to_end_single_warning() {
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::LocalDeclaration, |ctx, node| {
            ctx.report(RuleIssue::warning("declaration found").at(node.location));
        })
    });
    let engine = create_linter(vec![rule("stylistic/flag-locals", factory)]).unwrap();

    let tree = local_declaration_tree();
    let result = engine.lint_file(Some(&tree), "local x = 1", "init.lua");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].rule_id, "stylistic/flag-locals");
    assert_eq!(result.issues[0].severity, Severity::Warning);
    assert_eq!(result.issues[0].line, 1);
    assert_eq!(result.stats.warnings, 1);
    assert_eq!(result.stats.errors, 0);
}

#[test]
fn two_rules_fire_in_registration_order_per_node() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let recorder = |name: &'static str, log: Arc<Mutex<Vec<String>>>| -> RuleFactory {
        Arc::new(move |_ctx: &RuleContext| {
            let log = Arc::clone(&log);
            ListenerMap::new().on(NodeType::Identifier, move |_ctx, node| {
                log.lock()
                    .unwrap()
                    .push(format!("{name}:{}", node.name.as_deref().unwrap_or("?")));
            })
        })
    };

    let engine = create_linter(vec![
        rule("logical/first", recorder("first", Arc::clone(&log))),
        rule("logical/second", recorder("second", Arc::clone(&log))),
    ])
    .unwrap();

    // Two identifier nodes
    let tree = Node::new("chunk", range(0, 10))
        .with_child(Node::new("identifier", range(0, 1)).with_name("a"))
        .with_child(Node::new("identifier", range(4, 5)).with_name("b"));
    engine.lint_file(Some(&tree), "a; b", "init.lua");

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls, ["first:a", "second:a", "first:b", "second:b"]);
}

#[test]
fn enter_exit_follows_stack_discipline_for_nested_same_type_nodes() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let factory: RuleFactory = {
        let log = Arc::clone(&log);
        Arc::new(move |_ctx: &RuleContext| {
            let enter_log = Arc::clone(&log);
            let exit_log = Arc::clone(&log);
            ListenerMap::new().on_enter_exit(
                NodeType::FunctionDeclaration,
                move |_ctx, node| {
                    enter_log
                        .lock()
                        .unwrap()
                        .push(format!("enter:{}", node.name.as_deref().unwrap_or("?")));
                },
                move |_ctx, node| {
                    exit_log
                        .lock()
                        .unwrap()
                        .push(format!("exit:{}", node.name.as_deref().unwrap_or("?")));
                },
            )
        })
    };
    let engine = create_linter(vec![rule("logical/nesting", factory)]).unwrap();

    let tree = Node::new("chunk", range(0, 40)).with_child(
        Node::new("function", range(0, 40)).with_name("outer").with_child(
            Node::new("block", range(15, 36)).with_child(
                Node::new("function", range(15, 36))
                    .with_name("inner")
                    .with_child(Node::new("block", range(33, 33))),
            ),
        ),
    );
    engine.lint_file(Some(&tree), "", "init.lua");

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls, ["enter:outer", "enter:inner", "exit:inner", "exit:outer"]);
}

#[test]
fn panicking_rule_is_isolated_from_other_rules() {
    let panicking: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |_ctx, _node| {
            panic!("listener exploded");
        })
    });
    let healthy: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |ctx, node| {
            ctx.report(RuleIssue::info("saw identifier").at(node.location));
        })
    });

    let engine = create_linter(vec![
        rule("logical/broken", panicking),
        rule("logical/healthy", healthy),
    ])
    .unwrap();

    let tree = Node::new("chunk", range(0, 10))
        .with_child(Node::new("identifier", range(0, 1)).with_name("a"))
        .with_child(Node::new("identifier", range(4, 5)).with_name("b"));
    let result = engine.lint_file(Some(&tree), "a; b", "init.lua");

    // One error per faulting invocation, one info per healthy invocation
    let broken: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.rule_id == "logical/broken")
        .collect();
    let healthy: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.rule_id == "logical/healthy")
        .collect();

    assert_eq!(broken.len(), 2);
    assert!(broken.iter().all(|i| i.severity == Severity::Error));
    assert!(broken[0].message.contains("listener exploded"));
    assert_eq!(healthy.len(), 2);
    assert_eq!(result.stats.errors, 2);
    assert_eq!(result.stats.infos, 2);
}

#[test]
fn slow_rule_is_muted_after_exceeding_its_budget() {
    let slow: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |_ctx, _node| {
            std::thread::sleep(Duration::from_millis(20));
        })
    });

    let mut registry = RuleRegistry::new();
    registry.register_rule(rule("logical/slow", slow)).unwrap();
    let engine = RuleEngine::with_config(
        registry,
        EngineConfig {
            rule_time_budget: Some(Duration::from_millis(1)),
            ..EngineConfig::default()
        },
    );

    let tree = Node::new("chunk", range(0, 20))
        .with_child(Node::new("identifier", range(0, 1)).with_name("a"))
        .with_child(Node::new("identifier", range(4, 5)).with_name("b"))
        .with_child(Node::new("identifier", range(8, 9)).with_name("c"));
    let result = engine.lint_file(Some(&tree), "a; b; c", "init.lua");

    let budget_issues: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.message.contains("time budget"))
        .collect();
    assert_eq!(budget_issues.len(), 1);
    assert_eq!(budget_issues[0].rule_id, "logical/slow");
}

#[test]
fn unknown_tags_are_skipped_but_their_children_are_visited() {
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |ctx, node| {
            ctx.report(RuleIssue::info("reached").at(node.location));
        })
    });
    let engine = create_linter(vec![rule("logical/reach", factory)]).unwrap();

    let tree = Node::new("chunk", range(0, 10)).with_child(
        Node::new("vendor_extension", range(0, 10))
            .with_child(Node::new("identifier", range(2, 3)).with_name("a")),
    );
    let result = engine.lint_file(Some(&tree), "??a?????? ", "init.lua");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].message, "reached");
}

#[test]
fn stateful_rule_gets_fresh_state_per_file() {
    // Counts identifiers per file and reports the count on chunk exit.
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        let count = std::rc::Rc::new(std::cell::Cell::new(0usize));
        let seen = std::rc::Rc::clone(&count);
        ListenerMap::new()
            .on(NodeType::Identifier, move |_ctx, _node| {
                seen.set(seen.get() + 1);
            })
            .on_exit(NodeType::Chunk, move |ctx, node| {
                ctx.report(
                    RuleIssue::info(format!("{} identifiers", count.get())).at(node.location),
                );
            })
    });

    let engine = create_linter(vec![rule("logical/count", factory)]).unwrap();

    let tree = Node::new("chunk", range(0, 10))
        .with_child(Node::new("identifier", range(0, 1)).with_name("a"))
        .with_child(Node::new("identifier", range(4, 5)).with_name("b"));

    let first = engine.lint_file(Some(&tree), "a; b", "init.lua");
    let second = engine.lint_file(Some(&tree), "a; b", "other.lua");

    assert_eq!(first.issues[0].message, "2 identifiers");
    // Fresh state: still 2, not 4
    assert_eq!(second.issues[0].message, "2 identifiers");
}

#[test]
fn context_source_text_and_parent_lookup() {
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |ctx, node| {
            let text = ctx.node_text(node).unwrap();
            let parent_tag = ctx
                .parent(node)
                .map(|parent| parent.tag.clone())
                .unwrap_or_default();
            ctx.report(RuleIssue::info(format!("{text} in {parent_tag}")).at(node.location));
        })
    });
    let engine = create_linter(vec![rule("logical/inspect", factory)]).unwrap();

    let tree = local_declaration_tree();
    let result = engine.lint_file(Some(&tree), "local x = 1", "init.lua");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].message, "x in local_declaration");
}

#[test]
fn rule_recovers_when_context_window_is_out_of_range() {
    // Wants 8 bytes of leading context; the identifier sits at offset 6, so
    // the widened slice underflows and the rule falls back to the bare text.
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |ctx, node| {
            let text = ctx
                .node_text_around(node, 8, 0)
                .log_and_continue()
                .or_else(|| ctx.node_text(node).log_and_continue())
                .unwrap_or_default();
            ctx.report(RuleIssue::info(text).at(node.location));
        })
    });
    let engine = create_linter(vec![rule("logical/window", factory)]).unwrap();

    let tree = local_declaration_tree();
    let result = engine.lint_file(Some(&tree), "local x = 1", "init.lua");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].message, "x");
}

#[test]
fn reported_fixes_round_trip_through_apply_fixes() {
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |ctx, node| {
            let fix = ctx.create_fix(node.location, "renamed").unwrap();
            ctx.report(
                RuleIssue::warning("identifier should be renamed")
                    .at(node.location)
                    .with_fix(fix),
            );
        })
    });
    let engine = create_linter(vec![rule("stylistic/rename", factory)]).unwrap();

    let source = "local x = 1";
    let tree = local_declaration_tree();
    let result = engine.lint_file(Some(&tree), source, "init.lua");

    assert_eq!(result.stats.fixable_warnings, 1);

    let fixes: Vec<_> = result
        .issues
        .iter()
        .filter_map(|issue| issue.fix.clone())
        .collect();
    let outcome = apply_fixes(source, &fixes).unwrap();
    assert_eq!(outcome.text, "local renamed = 1");
}

#[test]
fn lint_result_serde_round_trips_with_fix() {
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::Identifier, |ctx, node| {
            let fix = ctx.create_fix(node.location, "renamed").unwrap();
            ctx.report(
                RuleIssue::warning("identifier should be renamed")
                    .at(node.location)
                    .with_fix(fix),
            );
        })
    });
    let engine = create_linter(vec![rule("stylistic/rename", factory)]).unwrap();

    let tree = local_declaration_tree();
    let result = engine.lint_file(Some(&tree), "local x = 1", "init.lua");

    let json = serde_json::to_string(&result).unwrap();
    let back: LintResult = serde_json::from_str(&json).unwrap();

    assert_eq!(back, result);
    assert_eq!(back.issues[0].fix.as_ref().unwrap().text, "renamed");
    assert_eq!(back.stats.fixable_warnings, 1);
}

#[test]
fn lint_file_is_replayable_and_engine_holds_no_cross_file_state() {
    let factory: RuleFactory = Arc::new(|_ctx: &RuleContext| {
        ListenerMap::new().on(NodeType::LocalDeclaration, |ctx, node| {
            ctx.report(RuleIssue::warning("found").at(node.location));
        })
    });
    let engine = create_linter(vec![rule("stylistic/flag", factory)]).unwrap();

    let tree = local_declaration_tree();
    let first = engine.lint_file(Some(&tree), "local x = 1", "a.lua");
    let second = engine.lint_file(Some(&tree), "local x = 1", "b.lua");

    assert_eq!(first.issues.len(), 1);
    assert_eq!(second.issues.len(), 1);
    assert_eq!(first.stats, second.stats);
}
