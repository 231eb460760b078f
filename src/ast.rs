//! The parsed query shapes the execution core recurses over.
//!
//! The lexer/parser that produces a [`Document`] from source text is an
//! external collaborator (see [`DocumentBuilder`]) — this module only
//! defines the AST shapes themselves. `Selection`, `Value` and `Type` are
//! closed tagged unions: callers match on them exhaustively rather than
//! walking a visitor hierarchy.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use arcstr::ArcStr;
use indexmap::IndexMap;

/// An interned, cheaply-cloned name (field name, type name, argument name…).
///
/// Grounded on `juniper::types::name::Name`: a thin `ArcStr` wrapper kept
/// mainly so it can implement [`Borrow<str>`] for `IndexMap`/`HashMap`
/// lookups by `&str` without an intermediate allocation.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Name(ArcStr);

impl Name {
    /// Borrows the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self(ArcStr::from(s))
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self(ArcStr::from(s))
    }
}

impl From<ArcStr> for Name {
    fn from(s: ArcStr) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}

/// A `(line, column)` position in the original query source, 1-indexed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SourcePosition {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl SourcePosition {
    /// Builds a position, mostly for tests that construct ASTs by hand.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// An error produced by an external document builder.
#[derive(Clone, Debug, derive_more::Display, derive_more::Error)]
#[display("{message}")]
pub struct ParseError {
    /// Human-readable description of the failure.
    pub message: String,
    /// Where in the source the failure was detected.
    pub at: SourcePosition,
}

/// Builds a [`Document`] from source text.
///
/// The core never implements a parser itself (see the crate-level docs);
/// hosts plug a concrete lexer/parser in behind this trait. A
/// pre-constructed [`Document`] passed to the executor bypasses this
/// entirely.
pub trait DocumentBuilder: Send + Sync {
    /// Parses `source` into a [`Document`], or fails with a [`ParseError`].
    fn build(&self, source: &str) -> Result<Document, ParseError>;
}

/// A parsed GraphQL document: operations plus named fragments.
#[derive(Clone, Debug, Default)]
pub struct Document {
    /// Operations in source order. Most documents have exactly one.
    pub operations: Vec<Operation>,
    /// Fragment definitions, keyed by name.
    pub fragments: IndexMap<Name, FragmentDefinition>,
}

impl Document {
    /// Looks up an operation by name, or returns the first operation when
    /// `name` is empty, per spec: "if `operationName` is non-empty, look up
    /// by name; else take the first operation."
    pub fn operation(&self, name: Option<&str>) -> Option<&Operation> {
        match name {
            Some(name) if !name.is_empty() => {
                self.operations.iter().find(|op| op.name.as_deref() == Some(name))
            }
            _ => self.operations.first(),
        }
    }
}

/// The root operation kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationType {
    /// `query { … }`
    Query,
    /// `mutation { … }`
    Mutation,
    /// `subscription { … }` — only operation-root dispatch is in scope;
    /// the subscription transport itself is not.
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

/// One `query`/`mutation`/`subscription` block in a [`Document`].
#[derive(Clone, Debug)]
pub struct Operation {
    /// Operation kind.
    pub operation_type: OperationType,
    /// Operation name, if given.
    pub name: Option<Name>,
    /// Declared variables, in source order.
    pub variable_definitions: Vec<VariableDefinition>,
    /// Directives applied to the operation itself (rarely used by C6).
    pub directives: Vec<Directive>,
    /// The operation's root selection set.
    pub selection_set: Vec<Selection>,
    /// Where the operation starts, for top-level error locations.
    pub location: SourcePosition,
}

/// `$name: Type = default` in an operation signature.
#[derive(Clone, Debug)]
pub struct VariableDefinition {
    /// Variable name, without the leading `$`.
    pub name: Name,
    /// Declared type reference.
    pub var_type: Type,
    /// Default value literal, if any.
    pub default_value: Option<Value>,
    /// Where the definition appears, for `VariableCoercionError` locations.
    pub location: SourcePosition,
}

/// A named fragment definition (`fragment Name on Type { … }`).
#[derive(Clone, Debug)]
pub struct FragmentDefinition {
    /// Fragment name.
    pub name: Name,
    /// The type condition (`on Type`).
    pub type_condition: Name,
    /// Directives on the fragment definition itself.
    pub directives: Vec<Directive>,
    /// The fragment's selection set.
    pub selection_set: Vec<Selection>,
}

/// A GraphQL type reference as written in the query (not yet resolved
/// against a schema): `Name`, `[Name]`, `Name!`, `[Name!]!`, …
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Type {
    /// A named type.
    Named(Name),
    /// `[T]`
    List(Box<Type>),
    /// `T!`
    NonNull(Box<Type>),
}

impl Type {
    /// The innermost named type, stripping `List`/`NonNull` wrappers.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(t) | Self::NonNull(t) => t.innermost_name(),
        }
    }
}

/// One entry of a selection set: a field, a fragment spread, or an inline
/// fragment. Closed union, matched exhaustively by the field collector.
#[derive(Clone, Debug)]
pub enum Selection {
    /// `alias: name(args) @directives { selectionSet }`
    Field(Field),
    /// `...FragmentName @directives`
    FragmentSpread {
        /// Name of the referenced fragment definition.
        name: Name,
        /// Directives applied to the spread itself.
        directives: Vec<Directive>,
        /// Where the spread appears.
        location: SourcePosition,
    },
    /// `... on Type @directives { selectionSet }`
    InlineFragment {
        /// The optional type condition; `None` matches the parent type.
        type_condition: Option<Name>,
        /// Directives applied to the inline fragment.
        directives: Vec<Directive>,
        /// The inline fragment's selection set.
        selection_set: Vec<Selection>,
        /// Where the inline fragment appears.
        location: SourcePosition,
    },
}

/// A single `Field` AST node.
#[derive(Clone, Debug)]
pub struct Field {
    /// Optional alias; `response_name()` falls back to `name` without one.
    pub alias: Option<Name>,
    /// Field name as declared on the schema.
    pub name: Name,
    /// Arguments passed at the call site.
    pub arguments: Vec<Argument>,
    /// Directives applied to this field.
    pub directives: Vec<Directive>,
    /// Sub-selection set; `None`/empty for leaf scalar fields.
    pub selection_set: Vec<Selection>,
    /// Where the field appears, used as the canonical error location for
    /// its field group (spec: "the first is canonical for error reporting").
    pub location: SourcePosition,
}

impl Field {
    /// `alias ?? name` — the key used in the response map.
    pub fn response_name(&self) -> &Name {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// `name: value` in an argument list or input object literal.
#[derive(Clone, Debug)]
pub struct Argument {
    /// Argument name.
    pub name: Name,
    /// Argument value literal.
    pub value: Value,
}

/// `@name(args)` as written in the query.
#[derive(Clone, Debug)]
pub struct Directive {
    /// Directive name, without the leading `@`.
    pub name: Name,
    /// Directive arguments.
    pub arguments: Vec<Argument>,
    /// Where the directive appears.
    pub location: SourcePosition,
}

impl Directive {
    /// Looks up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

/// A literal value as written in the query, or a `$variable` reference.
/// Closed union; does not carry variables already resolved (that is
/// [`crate::value::Value`]).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// `$name`
    Variable(Name),
    /// `123`
    Int(i64),
    /// `1.5`
    Float(f64),
    /// `"text"`
    String(String),
    /// `true` / `false`
    Boolean(bool),
    /// `SOME_ENUM_VALUE`
    Enum(Name),
    /// `[a, b, c]`
    List(Vec<Value>),
    /// `{ field: value, … }`
    Object(IndexMap<Name, Value>),
}

impl Value {
    /// Whether this literal is `null` (but not `$variable`, which may or
    /// may not resolve to null).
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// An untyped, host-supplied input value: the shape `inputs` (operation
/// variables) and raw resolver arguments arrive in before [`crate::coercion`]
/// validates them against a schema type. Equivalent to a minimal JSON value,
/// kept in-crate so the core doesn't need a `serde_json` dependency for
/// something this small (wire deserialization itself stays out of scope).
#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    /// Explicit `null`, distinct from "key absent".
    Null,
    /// `true` / `false`.
    Boolean(bool),
    /// Any integral number.
    Int(i64),
    /// Any non-integral number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered list.
    List(Vec<RawInput>),
    /// A map, as input objects and `inputs` top-level maps arrive.
    Object(IndexMap<String, RawInput>),
}

impl RawInput {
    /// Whether this is an iterable list-shaped value, per §4.3: "if input
    /// is an iterable (not a string)". Only [`Self::List`] qualifies —
    /// strings are iterable in many languages but are explicitly excluded
    /// here, and objects are not list-shaped at all.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}
