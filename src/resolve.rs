//! The Resolver Dispatcher (C4): invokes a field's resolver (or the
//! default property-name accessor) and turns whatever it returns into a
//! [`Source`] handle for [`crate::complete`] to shape, per spec.md §4.5.

use indexmap::IndexMap;

use crate::ast::{self, Document, Name, Operation};
use crate::cancellation::CancellationToken;
use crate::coercion::coerce_arguments;
use crate::collect::FieldGroup;
use crate::error::{ErrorAccumulator, ExecutionError, ExecutionErrorKind, PathSegment};
use crate::metrics::MetricsSink;
use crate::schema::Schema;
use crate::schema::meta::{FieldArgs, FieldDefinition, MetaType, TypeRef};
use crate::source::Source;
use crate::variables::Variables;

/// Everything [`resolve_field`] needs to dispatch one field, gathered up
/// the way a single per-execution context is threaded through the
/// teacher's executor rather than passed as a dozen loose arguments.
pub struct ResolveFieldContext<'a> {
    /// The value the field group is being resolved against.
    pub source: Option<Source>,
    /// The field group driving this resolution; `canonical()` is the AST
    /// node used for argument literals and error locations.
    pub field_group: &'a FieldGroup,
    /// The field's schema definition. `None` means the field does not
    /// exist on `parent_type` (§4.5: skip without error).
    pub field_def: Option<&'a FieldDefinition>,
    /// The concrete object (or interface) type the field is declared on.
    pub parent_type: &'a MetaType,
    /// The opaque root value passed into [`crate::executor::execute`].
    pub root_value: Option<Source>,
    /// The opaque, host-supplied request context.
    pub user_context: Option<Source>,
    /// The schema being executed against.
    pub schema: &'a Schema,
    /// The full parsed document (fragments live here).
    pub document: &'a Document,
    /// The operation being executed.
    pub operation: &'a Operation,
    /// Bound operation variables.
    pub variables: &'a Variables,
    /// Cooperative cancellation signal, polled before dispatch (§5).
    pub cancellation: &'a CancellationToken,
    /// Scoped-timing sink for the field's resolver span.
    pub metrics: &'a dyn MetricsSink,
    /// Where per-field errors accumulate.
    pub errors: &'a ErrorAccumulator,
    /// The response path to this field, including its own response name.
    pub path: Vec<PathSegment>,
}

/// The outcome of dispatching one field: either a raw resolved value ready
/// for [`crate::complete::complete_value`], or `None` when the field was
/// skipped because it has no definition on the parent type.
pub enum Resolution {
    /// The resolver ran (successfully or not) and produced a raw value.
    Value(Source),
    /// The resolver failed; the field completes to `null` with an
    /// accumulated [`ExecutionErrorKind::Resolver`] error.
    Failed,
    /// `field_def` was `None`: the field does not exist on this type and
    /// is silently skipped (§4.5).
    Skipped,
    /// The cancellation token was observed tripped before dispatch.
    Cancelled,
}

/// Resolves one field group against `ctx.source`, per §4.5:
///
/// 1. If there is no field definition, skip.
/// 2. Poll cancellation; if tripped, record a [`ExecutionErrorKind::Cancellation`]
///    error and stop.
/// 3. Coerce the canonical field's call-site arguments against the field's
///    argument definitions.
/// 4. Dispatch to the field's explicit [`crate::schema::meta::Resolver`],
///    or — absent one — the default property-name [`crate::schema::meta::PropertyAccessor`].
/// 5. Await the result if it was [`crate::schema::meta::FieldResolution::Deferred`].
/// 6. On failure, push an [`ExecutionErrorKind::Resolver`] error (with the
///    resolver's message as `cause`) and return [`Resolution::Failed`].
pub async fn resolve_field(ctx: &ResolveFieldContext<'_>) -> Resolution {
    let Some(field_def) = ctx.field_def else {
        return Resolution::Skipped;
    };

    if ctx.cancellation.is_cancelled() {
        ctx.errors.add(ExecutionError::new(
            ExecutionErrorKind::Cancellation,
            vec![ctx.field_group.canonical().location],
        ));
        return Resolution::Cancelled;
    }

    let canonical = ctx.field_group.canonical();
    let arguments = coerce_arguments(ctx.schema, &field_def.arguments, &canonical.arguments, ctx.variables);

    let span = ctx.metrics.start_span(&format!("field:{}", field_def.name));
    let outcome = dispatch(field_def, &ctx.source, arguments).await;
    span.finish();

    match outcome {
        Ok(value) => Resolution::Value(value),
        Err(err) => {
            let mut error = ExecutionError::new(
                ExecutionErrorKind::Resolver { field_name: canonical.response_name().to_string() },
                vec![canonical.location],
            );
            if let Some(cause) = err.cause {
                error = error.with_cause(cause);
            } else {
                error = error.with_cause(&err.message);
            }
            ctx.errors.add(error);
            Resolution::Failed
        }
    }
}

async fn dispatch(
    field_def: &FieldDefinition,
    source: &Option<Source>,
    arguments: IndexMap<Name, crate::coercion::CoercedValue>,
) -> Result<Source, crate::schema::meta::ResolverError> {
    let args = FieldArgs { arguments, source: source.clone() };

    if let Some(resolver) = &field_def.resolver {
        return resolver.resolve(args).resolve().await;
    }

    match (&field_def.accessor, source) {
        (Some(accessor), Some(source)) => accessor.get(source),
        (Some(_), None) | (None, _) => Err(crate::schema::meta::ResolverError::new(format!(
            "No resolver or accessor configured for field \"{}\"",
            field_def.name
        ))),
    }
}

/// Whether the canonical field in `group` is eligible to skip the usual
/// per-field span/error-path machinery entirely (§4.5's scalar fast
/// path): no arguments, no explicit resolver, and a nullable scalar
/// return type.
pub fn is_scalar_fast_path(field_def: &FieldDefinition, schema: &Schema) -> bool {
    if !field_def.is_fast_path_eligible() {
        return false;
    }
    if matches!(field_def.return_type, TypeRef::NonNull(_)) {
        return false;
    }
    matches!(schema.type_by_name(field_def.return_type.name()), Some(MetaType::Scalar(_)))
}
