//! Type metadata: the typed lookups [`crate::schema::model::Schema`]
//! exposes to the execution core.
//!
//! Schema *construction* (building these values from SDL, derive macros,
//! introspection) is out of scope (spec.md §1) — this module only defines
//! the shapes the core reads at execution time, populated however the
//! host likes.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::ast::{self, Name, RawInput};
use crate::source::Source;
use crate::value::Value;

/// Whether a field/enum value is deprecated, with an optional reason.
/// Grounded on `juniper::schema::meta::DeprecationStatus`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum DeprecationStatus {
    /// Not deprecated.
    #[default]
    Current,
    /// Deprecated, with an optional human-readable reason.
    Deprecated(Option<String>),
}

impl DeprecationStatus {
    /// Whether this status marks the item deprecated.
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Self::Deprecated(_))
    }
}

/// A resolved type reference: a named type, wrapped in zero or more
/// `List`/`NonNull` modifiers. Produced by resolving an [`ast::Type`]
/// against a schema's type registry.
#[derive(Clone, Debug)]
pub enum TypeRef {
    /// A named type, looked up in the schema's type registry.
    Named(Name),
    /// `[T]`
    List(Box<TypeRef>),
    /// `T!`
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// The innermost named type's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(t) | Self::NonNull(t) => t.name(),
        }
    }

    /// Whether the outermost modifier is `NonNull`.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNull(t) => write!(f, "{t}!"),
        }
    }
}

/// An error raised by a resolver, or surfaced from the property-name
/// default resolver when no matching property exists.
#[derive(Clone, Debug, derive_more::Display, derive_more::Error)]
#[display("{message}")]
pub struct ResolverError {
    /// Human-readable failure description.
    pub message: String,
    /// The underlying cause's string form, shown only when the host
    /// enables `expose-exceptions`-equivalent behavior.
    #[error(not(source))]
    pub cause: Option<String>,
}

impl ResolverError {
    /// Builds an error with no further cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), cause: None }
    }

    /// Attaches an underlying cause's string form.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// The polymorphic resolver return shape from Design Note §9: a resolver
/// either already has its value (`Ready`) or returns a pending
/// computation (`Deferred`) — the dispatcher branches on this exactly
/// once instead of threading `async`/`await` through every call site.
pub enum FieldResolution {
    /// The resolver already completed synchronously.
    Ready(Result<Source, ResolverError>),
    /// The resolver's result is not available yet.
    Deferred(BoxFuture<'static, Result<Source, ResolverError>>),
}

impl FieldResolution {
    /// Awaits this resolution down to its final value, branching once on
    /// the `Ready`/`Deferred` tag as the dispatcher contract requires.
    pub async fn resolve(self) -> Result<Source, ResolverError> {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(fut) => fut.await,
        }
    }
}

/// Everything a resolver needs to read about the field it is resolving.
/// A reduced, owned view of [`crate::resolve::ResolveFieldContext`] —
/// reduced because [`FieldResolution::Deferred`] futures must be
/// `'static`, so resolvers capture what they need up front rather than
/// borrowing the full per-field context across an `.await`.
pub struct FieldArgs {
    /// The field's resolved, defaulted arguments.
    pub arguments: IndexMap<Name, crate::coercion::CoercedValue>,
    /// The source value the field is resolved against.
    pub source: Option<Source>,
}

/// A field's resolver: given the source value and coerced arguments,
/// produces the raw value the [`crate::complete`] completion algorithm
/// will then shape against the field's return type.
pub trait Resolver: Send + Sync {
    /// Resolves the field, synchronously or asynchronously (see
    /// [`FieldResolution`]).
    fn resolve(&self, args: FieldArgs) -> FieldResolution;
}

/// Adapts a plain closure into a [`Resolver`].
pub struct FnResolver<F>(pub F);

impl<F> Resolver for FnResolver<F>
where
    F: Fn(FieldArgs) -> FieldResolution + Send + Sync,
{
    fn resolve(&self, args: FieldArgs) -> FieldResolution {
        (self.0)(args)
    }
}

/// Reads one named property off a source value, replacing runtime
/// reflection with a trait object a schema builder installs ahead of
/// time (Design Note §9). The default property-name resolver (§4.5)
/// dispatches here when a field has no explicit [`Resolver`].
pub trait PropertyAccessor: Send + Sync {
    /// Reads the property, or fails if it does not apply to this source
    /// (e.g. the source is the wrong concrete type).
    fn get(&self, source: &Source) -> Result<Source, ResolverError>;
}

/// Adapts a plain closure into a [`PropertyAccessor`].
pub struct FnAccessor<F>(pub F);

impl<F> PropertyAccessor for FnAccessor<F>
where
    F: Fn(&Source) -> Result<Source, ResolverError> + Send + Sync,
{
    fn get(&self, source: &Source) -> Result<Source, ResolverError> {
        (self.0)(source)
    }
}

/// One argument definition on a [`FieldDefinition`].
pub struct ArgumentDefinition {
    /// Argument name.
    pub name: Name,
    /// Declared type.
    pub arg_type: TypeRef,
    /// Default value literal, used when the call site and variables both
    /// omit the argument.
    pub default_value: Option<ast::Value>,
}

/// A field definition on an object or interface type.
pub struct FieldDefinition {
    /// Field name as declared on the schema.
    pub name: Name,
    /// Declared arguments, in schema-declaration order.
    pub arguments: Vec<ArgumentDefinition>,
    /// The field's declared return type.
    pub return_type: TypeRef,
    /// Explicit resolver, if the field needs one beyond reading a
    /// property straight off the source value.
    pub resolver: Option<Arc<dyn Resolver>>,
    /// Property accessor used by the default resolver (§4.5) when
    /// `resolver` is `None`.
    pub accessor: Option<Arc<dyn PropertyAccessor>>,
    /// Deprecation status.
    pub deprecation: DeprecationStatus,
}

impl FieldDefinition {
    /// Whether this field is eligible for the scalar fast path (§4.5):
    /// no argument definitions and no explicit resolver. The caller still
    /// has to check the *return* type is a nullable scalar.
    pub fn is_fast_path_eligible(&self) -> bool {
        self.arguments.is_empty() && self.resolver.is_none()
    }
}

/// Scalar leaf type metadata.
pub struct ScalarType {
    /// Type name (`String`, `Int`, or a custom scalar).
    pub name: Name,
    /// Converts a resolved [`Source`] into a response [`Value`] (C5.3).
    pub serialize: Arc<dyn Fn(&Source) -> Result<Value, String> + Send + Sync>,
    /// Coerces a raw, host-supplied input value (C1 `coerceInput`).
    pub parse_value: Arc<dyn Fn(&RawInput) -> Option<Source> + Send + Sync>,
    /// Coerces an AST literal value (C1 `coerceLiteral`).
    pub parse_literal: Arc<dyn Fn(&ast::Value) -> Option<Source> + Send + Sync>,
}

/// One defined value of an [`EnumType`].
#[derive(Clone, Debug)]
pub struct EnumValueDefinition {
    /// The value's name, as written in queries (`SOME_VALUE`).
    pub name: Name,
    /// Deprecation status.
    pub deprecation: DeprecationStatus,
}

/// Enum type metadata.
pub struct EnumType {
    /// Type name.
    pub name: Name,
    /// The defined values.
    pub values: Vec<EnumValueDefinition>,
    /// Converts a resolved [`Source`] (typically the variant name) into a
    /// response value.
    pub serialize: Arc<dyn Fn(&Source) -> Result<Value, String> + Send + Sync>,
    /// Coerces a raw input value (string) into a [`Source`].
    pub parse_value: Arc<dyn Fn(&RawInput) -> Option<Source> + Send + Sync>,
    /// Coerces an AST literal (`ast::Value::Enum`) into a [`Source`].
    pub parse_literal: Arc<dyn Fn(&ast::Value) -> Option<Source> + Send + Sync>,
}

/// Object type metadata.
pub struct ObjectType {
    /// Type name.
    pub name: Name,
    /// Fields declared on this type, keyed by name.
    pub fields: IndexMap<Name, FieldDefinition>,
    /// Interfaces this type implements, by name.
    pub interfaces: Vec<Name>,
    /// Optional `isTypeOf` predicate used during abstract-type completion
    /// (§4.6 step 6).
    pub is_type_of: Option<Arc<dyn Fn(&Source) -> bool + Send + Sync>>,
}

/// Interface type metadata.
pub struct InterfaceType {
    /// Type name.
    pub name: Name,
    /// Fields every implementing object must provide, keyed by name.
    pub fields: IndexMap<Name, FieldDefinition>,
    /// The object types that implement this interface.
    pub possible_types: Vec<Name>,
    /// Resolves a source value to one of `possible_types`.
    pub resolve_type: Arc<dyn Fn(&Source) -> Option<Name> + Send + Sync>,
}

/// Union type metadata.
pub struct UnionType {
    /// Type name.
    pub name: Name,
    /// The object types that are members of this union.
    pub possible_types: Vec<Name>,
    /// Resolves a source value to one of `possible_types`.
    pub resolve_type: Arc<dyn Fn(&Source) -> Option<Name> + Send + Sync>,
}

/// One field of an [`InputObjectType`].
pub struct InputFieldDefinition {
    /// Field name.
    pub name: Name,
    /// Declared type.
    pub input_type: TypeRef,
    /// Default value literal.
    pub default_value: Option<ast::Value>,
}

/// Input object type metadata.
pub struct InputObjectType {
    /// Type name.
    pub name: Name,
    /// Fields, keyed by name, in declaration order.
    pub fields: IndexMap<Name, InputFieldDefinition>,
}

/// A named type as stored in the schema's type registry: the union of all
/// kinds a [`TypeRef::Named`] can point at.
pub enum MetaType {
    /// Scalar leaf type.
    Scalar(ScalarType),
    /// Object type.
    Object(ObjectType),
    /// Interface (abstract) type.
    Interface(InterfaceType),
    /// Union (abstract) type.
    Union(UnionType),
    /// Enum type.
    Enum(EnumType),
    /// Input object type.
    InputObject(InputObjectType),
}

impl MetaType {
    /// The type's name.
    pub fn name(&self) -> &Name {
        match self {
            Self::Scalar(t) => &t.name,
            Self::Object(t) => &t.name,
            Self::Interface(t) => &t.name,
            Self::Union(t) => &t.name,
            Self::Enum(t) => &t.name,
            Self::InputObject(t) => &t.name,
        }
    }

    /// Whether this is an abstract (interface/union) type.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// The set of concrete object type names this (possibly abstract)
    /// type could resolve to at runtime. Object types are their own sole
    /// possible type.
    pub fn possible_types(&self) -> Vec<&Name> {
        match self {
            Self::Object(t) => vec![&t.name],
            Self::Interface(t) => t.possible_types.iter().collect(),
            Self::Union(t) => t.possible_types.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Looks up a field definition declared directly on this type
    /// (object or interface only — unions have no fields of their own).
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        match self {
            Self::Object(t) => t.fields.get(name),
            Self::Interface(t) => t.fields.get(name),
            _ => None,
        }
    }
}
