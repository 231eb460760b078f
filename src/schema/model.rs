//! The `Schema` external collaborator (spec.md §3): root types, a
//! type-name lookup, and a field-name normalizer. Construction (building
//! this from SDL, derive macros, or introspection) is out of scope — a
//! host assembles one however it likes and hands it to the executor.

use fnv::FnvHashMap;

use crate::ast::{Name, Type as AstType};
use crate::schema::meta::{MetaType, TypeRef};

/// Normalizes a query field name before matching it against a source
/// value's properties, used by the default property-name resolver (§4.5).
/// The identity converter is correct for schemas whose field names already
/// match their Rust source field names (or whose accessors are installed
/// explicitly, bypassing name matching entirely).
pub trait FieldNameConverter: Send + Sync {
    /// Converts a schema field name into the name to match source
    /// properties against.
    fn convert(&self, name: &str) -> String;
}

/// A [`FieldNameConverter`] that changes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityConverter;

impl FieldNameConverter for IdentityConverter {
    fn convert(&self, name: &str) -> String {
        name.to_string()
    }
}

/// The type system the execution core reads from: every named type plus
/// the three operation root types.
///
/// Invariant (spec.md §3): once [`Self::initialize`] has been called, the
/// schema must not be mutated for the lifetime of any in-flight
/// execution. This crate upholds that by having every core entry point
/// take `&Schema` — there is no `&mut` path once a host has handed a
/// `Schema` to [`crate::executor::execute`].
pub struct Schema {
    types: FnvHashMap<Name, MetaType>,
    query_type: Name,
    mutation_type: Option<Name>,
    subscription_type: Option<Name>,
    field_name_converter: Box<dyn FieldNameConverter>,
    initialized: bool,
}

impl Schema {
    /// Builds a schema from an already-assembled type registry. Schema
    /// *construction* is out of scope; this constructor is the minimal
    /// seam a host-side builder (or a test) hands finished types through.
    pub fn new(types: FnvHashMap<Name, MetaType>, query_type: Name) -> Self {
        Self {
            types,
            query_type,
            mutation_type: None,
            subscription_type: None,
            field_name_converter: Box::new(IdentityConverter),
            initialized: false,
        }
    }

    /// Sets the mutation root type name.
    pub fn with_mutation_type(mut self, name: Name) -> Self {
        self.mutation_type = Some(name);
        self
    }

    /// Sets the subscription root type name.
    pub fn with_subscription_type(mut self, name: Name) -> Self {
        self.subscription_type = Some(name);
        self
    }

    /// Sets the field-name normalizer used by the default resolver.
    pub fn with_field_name_converter(mut self, converter: impl FieldNameConverter + 'static) -> Self {
        self.field_name_converter = Box::new(converter);
        self
    }

    /// Freezes the schema. Idempotent; calling it more than once is a
    /// no-op. Exists to mirror the initialize-once step C6 runs under its
    /// `"schema"` metrics span before the first execution.
    pub fn initialize(&mut self) -> bool {
        let was_initialized = self.initialized;
        self.initialized = true;
        was_initialized
    }

    /// Whether [`Self::initialize`] has already run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The query root type's name.
    pub fn query_type_name(&self) -> &Name {
        &self.query_type
    }

    /// The mutation root type's name, if the schema has one.
    pub fn mutation_type_name(&self) -> Option<&Name> {
        self.mutation_type.as_ref()
    }

    /// The subscription root type's name, if the schema has one.
    pub fn subscription_type_name(&self) -> Option<&Name> {
        self.subscription_type.as_ref()
    }

    /// Looks up a named type.
    pub fn type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// The field-name normalizer.
    pub fn field_name_converter(&self) -> &dyn FieldNameConverter {
        self.field_name_converter.as_ref()
    }

    /// Resolves an AST type reference against this schema's type
    /// registry, preserving its `List`/`NonNull` wrappers. Does not
    /// validate that the named type actually exists — unknown names
    /// surface as lookup failures later, the same way an unknown field
    /// surfaces as `fieldDef == null` in §4.5.
    pub fn resolve_type_ref(&self, ast_type: &AstType) -> TypeRef {
        match ast_type {
            AstType::Named(name) => TypeRef::Named(name.clone()),
            AstType::List(inner) => TypeRef::List(Box::new(self.resolve_type_ref(inner))),
            AstType::NonNull(inner) => TypeRef::NonNull(Box::new(self.resolve_type_ref(inner))),
        }
    }

    /// Whether `possible_type` is one of `abstract_type`'s possible types
    /// (§4.1 "fragment condition match", §4.6 step 5).
    pub fn is_possible_type(&self, abstract_type: &MetaType, possible_type: &str) -> bool {
        abstract_type.possible_types().iter().any(|n| n.as_str() == possible_type)
    }
}
