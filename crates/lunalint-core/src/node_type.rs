//! Node-type catalogue: the closed set of syntactic categories rules may
//! subscribe to, and the bidirectional mapping to the parser's internal tags
//!
//! Some internal tags are structurally ambiguous (a `function` tag denotes a
//! statement-level declaration when the node carries a name, an anonymous
//! expression otherwise). Those tags resolve through discriminator
//! predicates, evaluated in the order they are declared. A tag with no
//! catalogue entry, or an ambiguous tag for which no predicate matches,
//! resolves to [`Resolution::Unknown`] carrying the raw tag; the engine logs
//! it and keeps traversing.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::ast::Node;
use crate::error::LintError;

/// The closed enumeration of public node types
///
/// The variant name is the public identifier rule authors use in listener
/// maps; [`NodeType::internal_tag`] gives the parser-side tag it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    // Structure
    Chunk,
    Block,
    // Declarations and assignments
    LocalDeclaration,
    Assignment,
    CompoundAssignment,
    FunctionDeclaration,
    FunctionExpression,
    LocalFunction,
    // Calls
    FunctionCall,
    MethodCall,
    // Control flow
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    DoBlock,
    WhileLoop,
    RepeatLoop,
    NumericFor,
    GenericFor,
    IfStatement,
    ElseifClause,
    ElseClause,
    GotoStatement,
    Label,
    // Expressions
    Identifier,
    IndexExpression,
    DotExpression,
    BinaryExpression,
    UnaryExpression,
    ParenExpression,
    TableConstructor,
    TableField,
    // Literals
    NumberLiteral,
    StringLiteral,
    InterpolatedString,
    BooleanLiteral,
    NilLiteral,
    VarargExpression,
    // Function plumbing
    Parameter,
    ParameterList,
    Attribute,
    // Optional typing layer
    TypeAlias,
    TypeAnnotation,
    TypeAssertion,
    TypeReference,
    UnionType,
    IntersectionType,
    OptionalType,
    GenericTypeParameter,
    FunctionType,
    TableType,
}

impl NodeType {
    /// Every member of the closed set
    pub const ALL: [NodeType; 50] = [
        NodeType::Chunk,
        NodeType::Block,
        NodeType::LocalDeclaration,
        NodeType::Assignment,
        NodeType::CompoundAssignment,
        NodeType::FunctionDeclaration,
        NodeType::FunctionExpression,
        NodeType::LocalFunction,
        NodeType::FunctionCall,
        NodeType::MethodCall,
        NodeType::ReturnStatement,
        NodeType::BreakStatement,
        NodeType::ContinueStatement,
        NodeType::DoBlock,
        NodeType::WhileLoop,
        NodeType::RepeatLoop,
        NodeType::NumericFor,
        NodeType::GenericFor,
        NodeType::IfStatement,
        NodeType::ElseifClause,
        NodeType::ElseClause,
        NodeType::GotoStatement,
        NodeType::Label,
        NodeType::Identifier,
        NodeType::IndexExpression,
        NodeType::DotExpression,
        NodeType::BinaryExpression,
        NodeType::UnaryExpression,
        NodeType::ParenExpression,
        NodeType::TableConstructor,
        NodeType::TableField,
        NodeType::NumberLiteral,
        NodeType::StringLiteral,
        NodeType::InterpolatedString,
        NodeType::BooleanLiteral,
        NodeType::NilLiteral,
        NodeType::VarargExpression,
        NodeType::Parameter,
        NodeType::ParameterList,
        NodeType::Attribute,
        NodeType::TypeAlias,
        NodeType::TypeAnnotation,
        NodeType::TypeAssertion,
        NodeType::TypeReference,
        NodeType::UnionType,
        NodeType::IntersectionType,
        NodeType::OptionalType,
        NodeType::GenericTypeParameter,
        NodeType::FunctionType,
        NodeType::TableType,
    ];

    /// The public capitalized identifier for this node type
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Chunk => "Chunk",
            NodeType::Block => "Block",
            NodeType::LocalDeclaration => "LocalDeclaration",
            NodeType::Assignment => "Assignment",
            NodeType::CompoundAssignment => "CompoundAssignment",
            NodeType::FunctionDeclaration => "FunctionDeclaration",
            NodeType::FunctionExpression => "FunctionExpression",
            NodeType::LocalFunction => "LocalFunction",
            NodeType::FunctionCall => "FunctionCall",
            NodeType::MethodCall => "MethodCall",
            NodeType::ReturnStatement => "ReturnStatement",
            NodeType::BreakStatement => "BreakStatement",
            NodeType::ContinueStatement => "ContinueStatement",
            NodeType::DoBlock => "DoBlock",
            NodeType::WhileLoop => "WhileLoop",
            NodeType::RepeatLoop => "RepeatLoop",
            NodeType::NumericFor => "NumericFor",
            NodeType::GenericFor => "GenericFor",
            NodeType::IfStatement => "IfStatement",
            NodeType::ElseifClause => "ElseifClause",
            NodeType::ElseClause => "ElseClause",
            NodeType::GotoStatement => "GotoStatement",
            NodeType::Label => "Label",
            NodeType::Identifier => "Identifier",
            NodeType::IndexExpression => "IndexExpression",
            NodeType::DotExpression => "DotExpression",
            NodeType::BinaryExpression => "BinaryExpression",
            NodeType::UnaryExpression => "UnaryExpression",
            NodeType::ParenExpression => "ParenExpression",
            NodeType::TableConstructor => "TableConstructor",
            NodeType::TableField => "TableField",
            NodeType::NumberLiteral => "NumberLiteral",
            NodeType::StringLiteral => "StringLiteral",
            NodeType::InterpolatedString => "InterpolatedString",
            NodeType::BooleanLiteral => "BooleanLiteral",
            NodeType::NilLiteral => "NilLiteral",
            NodeType::VarargExpression => "VarargExpression",
            NodeType::Parameter => "Parameter",
            NodeType::ParameterList => "ParameterList",
            NodeType::Attribute => "Attribute",
            NodeType::TypeAlias => "TypeAlias",
            NodeType::TypeAnnotation => "TypeAnnotation",
            NodeType::TypeAssertion => "TypeAssertion",
            NodeType::TypeReference => "TypeReference",
            NodeType::UnionType => "UnionType",
            NodeType::IntersectionType => "IntersectionType",
            NodeType::OptionalType => "OptionalType",
            NodeType::GenericTypeParameter => "GenericTypeParameter",
            NodeType::FunctionType => "FunctionType",
            NodeType::TableType => "TableType",
        }
    }

    /// The parser-side tag this node type maps back to
    ///
    /// `FunctionDeclaration` and `FunctionExpression` share the ambiguous
    /// `function` tag; every other mapping is one-to-one.
    pub fn internal_tag(&self) -> &'static str {
        match self {
            NodeType::Chunk => "chunk",
            NodeType::Block => "block",
            NodeType::LocalDeclaration => "local_declaration",
            NodeType::Assignment => "assignment",
            NodeType::CompoundAssignment => "compound_assignment",
            NodeType::FunctionDeclaration => "function",
            NodeType::FunctionExpression => "function",
            NodeType::LocalFunction => "local_function",
            NodeType::FunctionCall => "function_call",
            NodeType::MethodCall => "method_call",
            NodeType::ReturnStatement => "return_statement",
            NodeType::BreakStatement => "break_statement",
            NodeType::ContinueStatement => "continue_statement",
            NodeType::DoBlock => "do_block",
            NodeType::WhileLoop => "while_loop",
            NodeType::RepeatLoop => "repeat_loop",
            NodeType::NumericFor => "numeric_for",
            NodeType::GenericFor => "generic_for",
            NodeType::IfStatement => "if_statement",
            NodeType::ElseifClause => "elseif_clause",
            NodeType::ElseClause => "else_clause",
            NodeType::GotoStatement => "goto_statement",
            NodeType::Label => "label",
            NodeType::Identifier => "identifier",
            NodeType::IndexExpression => "index_expression",
            NodeType::DotExpression => "dot_expression",
            NodeType::BinaryExpression => "binary_expression",
            NodeType::UnaryExpression => "unary_expression",
            NodeType::ParenExpression => "paren_expression",
            NodeType::TableConstructor => "table_constructor",
            NodeType::TableField => "table_field",
            NodeType::NumberLiteral => "number",
            NodeType::StringLiteral => "string",
            NodeType::InterpolatedString => "interpolated_string",
            NodeType::BooleanLiteral => "boolean",
            NodeType::NilLiteral => "nil",
            NodeType::VarargExpression => "vararg",
            NodeType::Parameter => "parameter",
            NodeType::ParameterList => "parameter_list",
            NodeType::Attribute => "attribute",
            NodeType::TypeAlias => "type_alias",
            NodeType::TypeAnnotation => "type_annotation",
            NodeType::TypeAssertion => "type_assertion",
            NodeType::TypeReference => "type_reference",
            NodeType::UnionType => "union_type",
            NodeType::IntersectionType => "intersection_type",
            NodeType::OptionalType => "optional_type",
            NodeType::GenericTypeParameter => "generic_type_parameter",
            NodeType::FunctionType => "function_type",
            NodeType::TableType => "table_type",
        }
    }
}

impl FromStr for NodeType {
    type Err = LintError;

    /// Parse a public identifier; unknown names are a definition error
    /// naming the offending key, caught before traversal ever begins.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| LintError::unknown_node_type(s))
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A structural check deciding which public type an ambiguous tag denotes
#[derive(Clone, Copy)]
pub struct Discriminator {
    /// Predicate evaluated against the node
    pub matches: fn(&Node) -> bool,
    /// Public type the tag resolves to when the predicate holds
    pub node_type: NodeType,
}

enum TagEntry {
    Direct(NodeType),
    Discriminated(&'static [Discriminator]),
}

/// Outcome of resolving a node's tag against the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The tag resolved to a member of the closed set
    Known(NodeType),
    /// No catalogue entry or no matching discriminator; raw tag preserved
    Unknown(&'a str),
}

fn has_name(node: &Node) -> bool {
    node.name.is_some()
}

fn lacks_name(node: &Node) -> bool {
    node.name.is_none()
}

/// Discriminators for the `function` tag, evaluated in declaration order
static FUNCTION_DISCRIMINATORS: [Discriminator; 2] = [
    Discriminator {
        matches: has_name,
        node_type: NodeType::FunctionDeclaration,
    },
    Discriminator {
        matches: lacks_name,
        node_type: NodeType::FunctionExpression,
    },
];

/// Immutable bidirectional mapping between internal tags and public types
pub struct NodeTypeCatalogue {
    by_tag: HashMap<&'static str, TagEntry>,
}

impl NodeTypeCatalogue {
    /// Build the catalogue; constructed once and shared via [`Self::global`]
    pub fn new() -> Self {
        let mut by_tag = HashMap::new();
        for node_type in NodeType::ALL {
            let tag = node_type.internal_tag();
            if tag == "function" {
                by_tag.insert(tag, TagEntry::Discriminated(&FUNCTION_DISCRIMINATORS));
            } else {
                by_tag.insert(tag, TagEntry::Direct(node_type));
            }
        }
        Self { by_tag }
    }

    /// The single shared immutable instance
    pub fn global() -> &'static NodeTypeCatalogue {
        static CATALOGUE: OnceLock<NodeTypeCatalogue> = OnceLock::new();
        CATALOGUE.get_or_init(NodeTypeCatalogue::new)
    }

    /// Map an internal tag to its public type without a node
    ///
    /// Ambiguous tags resolve to their first discriminator target; full
    /// resolution of such tags requires [`Self::resolve`] with the node.
    pub fn to_public(&self, tag: &str) -> Option<NodeType> {
        match self.by_tag.get(tag)? {
            TagEntry::Direct(node_type) => Some(*node_type),
            TagEntry::Discriminated(discriminators) => {
                discriminators.first().map(|d| d.node_type)
            }
        }
    }

    /// Map a public type back to its internal tag
    pub fn to_internal(&self, node_type: NodeType) -> &'static str {
        node_type.internal_tag()
    }

    /// Resolve a node's tag, applying discriminator predicates in order
    pub fn resolve<'a>(&self, node: &'a Node) -> Resolution<'a> {
        match self.by_tag.get(node.tag.as_str()) {
            Some(TagEntry::Direct(node_type)) => Resolution::Known(*node_type),
            Some(TagEntry::Discriminated(discriminators)) => {
                for discriminator in *discriminators {
                    if (discriminator.matches)(node) {
                        return Resolution::Known(discriminator.node_type);
                    }
                }
                tracing::debug!(
                    tag = %node.tag,
                    "no discriminator matched ambiguous tag; raw tag preserved"
                );
                Resolution::Unknown(node.tag.as_str())
            }
            None => Resolution::Unknown(node.tag.as_str()),
        }
    }
}

impl Default for NodeTypeCatalogue {
    fn default() -> Self {
        Self::new()
    }
}
