//! The Value Completer (C5): recursively shapes a resolver's raw [`Source`]
//! output against its declared GraphQL type into a response [`Value`],
//! per spec.md §4.6.

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesOrdered, StreamExt};

use crate::ast::{Document, Name, Operation};
use crate::cancellation::CancellationToken;
use crate::collect::{CollectedFields, FieldGroup, collect_fields};
use crate::error::{ErrorAccumulator, ExecutionError, ExecutionErrorKind, PathSegment};
use crate::metrics::MetricsSink;
use crate::resolve::{Resolution, ResolveFieldContext, is_scalar_fast_path, resolve_field};
use crate::schema::Schema;
use crate::schema::meta::MetaType;
use crate::schema::meta::TypeRef;
use crate::source::Source;
use crate::value::{Object, Value};
use crate::variables::Variables;

/// Everything the completion recursion shares across every field it
/// visits within one execution. Borrowed, not owned, since completion
/// recurses through object/list/abstract types without ever needing to
/// mutate any of it.
pub struct CompletionContext<'a> {
    /// The schema being executed against.
    pub schema: &'a Schema,
    /// The full parsed document (fragments live here).
    pub document: &'a Document,
    /// The operation being executed.
    pub operation: &'a Operation,
    /// Bound operation variables.
    pub variables: &'a Variables,
    /// The opaque root value passed into [`crate::executor::execute`].
    pub root_value: Option<Source>,
    /// The opaque, host-supplied request context.
    pub user_context: Option<Source>,
    /// Cooperative cancellation signal.
    pub cancellation: &'a CancellationToken,
    /// Scoped-timing sink.
    pub metrics: &'a dyn MetricsSink,
    /// Where per-field errors accumulate.
    pub errors: &'a ErrorAccumulator,
}

/// Completes one field group's resolved value against its return type
/// (§4.6), recursing into lists/objects/abstract types as needed.
/// `path` is the response path to this field, already including its own
/// response name — callers append [`PathSegment::Index`] when recursing
/// into list elements.
///
/// Returns `Ok(value)` on success (`value` may itself be [`Value::Null`]
/// for a nullable type), or `Err(())` when a non-null violation must
/// bubble to the nearest nullable ancestor — the caller is responsible
/// for recording exactly one [`ExecutionErrorKind::NonNullViolation`] at
/// that ancestor, not at every level it passes through.
pub fn complete_value<'a>(
    ctx: &'a CompletionContext<'a>,
    field_group: &'a FieldGroup,
    type_ref: &'a TypeRef,
    raw: Option<Source>,
    path: Vec<PathSegment>,
) -> BoxFuture<'a, Result<Value, ()>> {
    async move {
        match type_ref {
            TypeRef::NonNull(inner) => {
                let completed = complete_value(ctx, field_group, inner, raw, path.clone()).await?;
                if completed.is_null() {
                    let field_name = field_group.canonical().response_name().to_string();
                    let mut error = ExecutionError::new(
                        ExecutionErrorKind::NonNullViolation { field_name, type_name: inner.to_string() },
                        vec![field_group.canonical().location],
                    );
                    error.path = path;
                    ctx.errors.add(error);
                    return Err(());
                }
                Ok(completed)
            }
            _ if raw.is_none() => Ok(Value::Null),
            TypeRef::List(inner) => complete_list(ctx, field_group, inner, raw.unwrap(), path).await,
            TypeRef::Named(name) => complete_named(ctx, field_group, name, raw.unwrap(), path).await,
        }
    }
    .boxed()
}

async fn complete_list(
    ctx: &CompletionContext<'_>,
    field_group: &FieldGroup,
    inner: &TypeRef,
    raw: Source,
    path: Vec<PathSegment>,
) -> Result<Value, ()> {
    let Some(items) = crate::source::downcast_ref::<Vec<Source>>(&raw) else {
        let mut error = ExecutionError::new(
            ExecutionErrorKind::TypeMismatch {
                field_name: field_group.canonical().response_name().to_string(),
            },
            vec![field_group.canonical().location],
        )
        .with_cause("User error: expected an IEnumerable list, but resolver returned a non-list value.");
        error.path = path;
        ctx.errors.add(error);
        return Ok(Value::Null);
    };

    let mut pending = FuturesOrdered::new();
    for (index, item) in items.iter().cloned().enumerate() {
        let mut item_path = path.clone();
        item_path.push(PathSegment::Index(index));
        pending.push_back(async move {
            let result = complete_value(ctx, field_group, inner, Some(item), item_path).await;
            (index, result)
        });
    }

    let mut out = Vec::with_capacity(items.len());
    let mut any_failed = false;
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => out.push((index, value)),
            // A non-null violation inside a nullable-typed element is
            // absorbed right here: this element is the nearest enclosing
            // nullable position, so only it becomes null. An element whose
            // own type is non-null has nowhere to absorb it, so the whole
            // list fails instead (§7 NonNullViolation).
            Err(()) if !inner.is_non_null() => out.push((index, Value::Null)),
            Err(()) => any_failed = true,
        }
    }

    if any_failed {
        return Err(());
    }

    out.sort_by_key(|(index, _)| *index);
    Ok(Value::List(out.into_iter().map(|(_, v)| v).collect()))
}

async fn complete_named(
    ctx: &CompletionContext<'_>,
    field_group: &FieldGroup,
    type_name: &str,
    raw: Source,
    path: Vec<PathSegment>,
) -> Result<Value, ()> {
    let Some(meta_type) = ctx.schema.type_by_name(type_name) else {
        return Ok(Value::Null);
    };

    match meta_type {
        MetaType::Scalar(scalar) => match (scalar.serialize)(&raw) {
            Ok(value) => Ok(value),
            Err(message) => {
                let mut error = ExecutionError::new(
                    ExecutionErrorKind::TypeMismatch {
                        field_name: field_group.canonical().response_name().to_string(),
                    },
                    vec![field_group.canonical().location],
                )
                .with_cause(message);
                error.path = path;
                ctx.errors.add(error);
                Ok(Value::Null)
            }
        },
        MetaType::Enum(enum_type) => match (enum_type.serialize)(&raw) {
            Ok(value) => Ok(value),
            Err(_) => Ok(Value::Null),
        },
        MetaType::Object(object_type) => {
            if let Some(is_type_of) = &object_type.is_type_of {
                if !is_type_of(&raw) {
                    let mut error = ExecutionError::new(
                        ExecutionErrorKind::TypeMismatch {
                            field_name: field_group.canonical().response_name().to_string(),
                        },
                        vec![field_group.canonical().location],
                    );
                    error.path = path;
                    ctx.errors.add(error);
                    return Err(());
                }
            }
            complete_object(ctx, field_group, meta_type, raw, path).await
        }
        // §4.6 step 5: "If null, return null." — no error, unlike a
        // `resolveObjectType` result outside the possible-types set.
        MetaType::Interface(interface) => match (interface.resolve_type)(&raw) {
            Some(concrete_name) => complete_abstract(ctx, field_group, meta_type, &concrete_name, raw, path).await,
            None => Ok(Value::Null),
        },
        MetaType::Union(union_type) => match (union_type.resolve_type)(&raw) {
            Some(concrete_name) => complete_abstract(ctx, field_group, meta_type, &concrete_name, raw, path).await,
            None => Ok(Value::Null),
        },
        MetaType::InputObject(_) => Ok(Value::Null),
    }
}

/// Completes a `resolveObjectType` result against the abstract type it was
/// resolved from. §4.6 step 5: "If the result is not in the abstract
/// type's possible-types set, raise a type-mismatch error" — checked here
/// via `ctx.schema.is_possible_type` before trusting `concrete_name` at all,
/// not merely that it names *some* object type in the schema.
async fn complete_abstract(
    ctx: &CompletionContext<'_>,
    field_group: &FieldGroup,
    abstract_type: &MetaType,
    concrete_name: &Name,
    raw: Source,
    path: Vec<PathSegment>,
) -> Result<Value, ()> {
    if !ctx.schema.is_possible_type(abstract_type, concrete_name) {
        let mut error = ExecutionError::new(
            ExecutionErrorKind::TypeMismatch {
                field_name: field_group.canonical().response_name().to_string(),
            },
            vec![field_group.canonical().location],
        );
        error.path = path;
        ctx.errors.add(error);
        return Err(());
    }

    match ctx.schema.type_by_name(concrete_name) {
        Some(concrete_type @ MetaType::Object(_)) => {
            complete_object(ctx, field_group, concrete_type, raw, path).await
        }
        _ => {
            let mut error = ExecutionError::new(
                ExecutionErrorKind::TypeMismatch {
                    field_name: field_group.canonical().response_name().to_string(),
                },
                vec![field_group.canonical().location],
            );
            error.path = path;
            ctx.errors.add(error);
            Err(())
        }
    }
}

/// Unions the selection sets of every field in `field_group` against the
/// concrete object type (§4.6 step 6: sibling occurrences of the same
/// response name may each carry their own sub-selection), collects the
/// resulting sub-fields, and resolves/completes each one.
async fn complete_object(
    ctx: &CompletionContext<'_>,
    field_group: &FieldGroup,
    object_type: &MetaType,
    raw: Source,
    path: Vec<PathSegment>,
) -> Result<Value, ()> {
    let mut sub_fields = CollectedFields::new();
    for field in &field_group.0 {
        collect_fields(
            ctx.schema,
            ctx.document,
            object_type,
            &field.selection_set,
            ctx.variables,
            &mut sub_fields,
        );
    }

    execute_selection_set(ctx, object_type, Some(raw), &sub_fields, path).await
}

/// Resolves and completes every field group in `fields` against `source`,
/// running siblings concurrently but writing their results in
/// first-encounter order (§5, §8). A non-null violation in one sibling
/// does not stop the others from running, but nulls the whole object once
/// any of them fails. `path` is the response path to the object itself
/// (empty at the operation root).
pub async fn execute_selection_set(
    ctx: &CompletionContext<'_>,
    parent_type: &MetaType,
    source: Option<Source>,
    fields: &CollectedFields,
    path: Vec<PathSegment>,
) -> Result<Value, ()> {
    if ctx.cancellation.is_cancelled() {
        let mut error = ExecutionError::new(ExecutionErrorKind::Cancellation, vec![]);
        error.path = path;
        ctx.errors.add(error);
        return Err(());
    }

    let mut pending = FuturesOrdered::new();
    for (response_name, group) in fields {
        let response_name = response_name.clone();
        let mut field_path = path.clone();
        field_path.push(PathSegment::Field(response_name.to_string()));
        pending.push_back(async move {
            let result = execute_one_field(ctx, parent_type, source.clone(), group, field_path).await;
            (response_name, result)
        });
    }

    let mut object = Object::with_capacity(fields.len());
    let mut any_non_null_violation = false;
    while let Some((response_name, result)) = pending.next().await {
        match result {
            Ok(Some(value)) => {
                if !object.contains_key(response_name.as_str()) {
                    object.insert(response_name.to_string(), value);
                }
            }
            Ok(None) => {}
            Err(()) => any_non_null_violation = true,
        }
    }

    if any_non_null_violation { Err(()) } else { Ok(Value::Object(object)) }
}

async fn execute_one_field(
    ctx: &CompletionContext<'_>,
    parent_type: &MetaType,
    source: Option<Source>,
    group: &FieldGroup,
    path: Vec<PathSegment>,
) -> Result<Option<Value>, ()> {
    let field_def = parent_type.field(group.canonical().name.as_str());
    let Some(field_def) = field_def else {
        return Ok(None);
    };

    if is_scalar_fast_path(field_def, ctx.schema) {
        return Ok(Some(fast_path_scalar(ctx, group, field_def, source, path)));
    }

    let resolve_ctx = ResolveFieldContext {
        source,
        field_group: group,
        field_def: Some(field_def),
        parent_type,
        root_value: ctx.root_value.clone(),
        user_context: ctx.user_context.clone(),
        schema: ctx.schema,
        document: ctx.document,
        operation: ctx.operation,
        variables: ctx.variables,
        cancellation: ctx.cancellation,
        metrics: ctx.metrics,
        errors: ctx.errors,
        path: path.clone(),
    };

    match resolve_field(&resolve_ctx).await {
        // A resolver error is already recorded by `resolve_field`; a
        // non-null return type has nothing to absorb it into, so it
        // still has to bubble like any other violation (§7).
        Resolution::Failed if field_def.return_type.is_non_null() => Err(()),
        Resolution::Failed => Ok(Some(Value::Null)),
        Resolution::Value(raw) => {
            absorb_field_violation(field_def, complete_value(ctx, group, &field_def.return_type, Some(raw), path).await)
        }
        Resolution::Cancelled => Err(()),
        Resolution::Skipped => Ok(None),
    }
}

/// The §4.5 scalar shortcut: invokes the property accessor directly and
/// serializes its result, skipping [`ResolveFieldContext`] construction
/// entirely. Eligibility (`is_scalar_fast_path`) already guarantees a
/// nullable scalar return type and no explicit resolver, so this never
/// needs to bubble a non-null violation — a failure here always resolves
/// to `null` plus an accumulated error, exactly like the full dispatch
/// path (§4.5: "Any exception is captured as above but does not
/// short-circuit sibling fields").
fn fast_path_scalar(
    ctx: &CompletionContext<'_>,
    group: &FieldGroup,
    field_def: &crate::schema::meta::FieldDefinition,
    source: Option<Source>,
    path: Vec<PathSegment>,
) -> Value {
    if ctx.cancellation.is_cancelled() {
        let mut error = ExecutionError::new(ExecutionErrorKind::Cancellation, vec![group.canonical().location]);
        error.path = path;
        ctx.errors.add(error);
        return Value::Null;
    }

    let accessor = match (&field_def.accessor, &source) {
        (Some(accessor), Some(source)) => accessor.get(source),
        (Some(_), None) | (None, _) => Err(crate::schema::meta::ResolverError::new(format!(
            "No resolver or accessor configured for field \"{}\"",
            field_def.name
        ))),
    };

    let raw = match accessor {
        Ok(raw) => raw,
        Err(err) => {
            let mut error = ExecutionError::new(
                ExecutionErrorKind::Resolver { field_name: group.canonical().response_name().to_string() },
                vec![group.canonical().location],
            )
            .with_cause(err.cause.unwrap_or(err.message));
            error.path = path;
            ctx.errors.add(error);
            return Value::Null;
        }
    };

    let Some(MetaType::Scalar(scalar)) = ctx.schema.type_by_name(field_def.return_type.name()) else {
        unreachable!("is_scalar_fast_path already confirmed a scalar return type")
    };
    match (scalar.serialize)(&raw) {
        Ok(value) => value,
        Err(message) => {
            let mut error = ExecutionError::new(
                ExecutionErrorKind::TypeMismatch { field_name: group.canonical().response_name().to_string() },
                vec![group.canonical().location],
            )
            .with_cause(message);
            error.path = path;
            ctx.errors.add(error);
            Value::Null
        }
    }
}

/// A field's own declared type is the nearest enclosing nullable position
/// for whatever non-null violation happened while completing it (§7
/// NonNullViolation: "propagates up to the nearest enclosing nullable
/// field"). When that type is itself non-null, there is nothing to
/// absorb the violation into here, so it keeps bubbling to the field one
/// level up instead.
fn absorb_field_violation(
    field_def: &crate::schema::meta::FieldDefinition,
    result: Result<Value, ()>,
) -> Result<Option<Value>, ()> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(()) if !field_def.return_type.is_non_null() => Ok(Some(Value::Null)),
        Err(()) => Err(()),
    }
}
