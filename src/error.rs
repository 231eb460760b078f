//! Per-field error capture (C7) and the result shape the executor returns.

use std::sync::Mutex;

use crate::ast::{Document, Operation, SourcePosition};
use crate::metrics::SpanRecord;
use crate::value::Value;

/// The semantic kind of a per-field [`ExecutionError`], per spec.md §7.
/// `ParseError`/`ValidationError` are not here: they short-circuit before
/// any field runs and are represented by [`GraphQLError`] instead.
#[derive(Clone, Debug, derive_more::Display)]
pub enum ExecutionErrorKind {
    /// A resolver threw/raised; the field resolves to `null`.
    #[display("Error trying to resolve {field_name}.")]
    Resolver {
        /// The field name the failing resolver was attached to.
        field_name: String,
    },
    /// `null` appeared where a non-null type is required.
    #[display("Cannot return null for non-null type. Field: {field_name}, Type: {type_name}!.")]
    NonNullViolation {
        /// The field name that returned null.
        field_name: String,
        /// The non-null type name, without the trailing `!`.
        type_name: String,
    },
    /// An abstract-type resolver returned a type outside the possible set,
    /// or `isTypeOf` rejected the source value.
    #[display("Abstract type could not resolve a concrete type for field {field_name}.")]
    TypeMismatch {
        /// The field name being completed.
        field_name: String,
    },
    /// Operation variable coercion failed.
    #[display("Variable \"${variable_name}\" got invalid value at {path}: {message}")]
    VariableCoercion {
        /// The offending variable's name.
        variable_name: String,
        /// Dot/bracket path into the variable's value where coercion failed.
        path: String,
        /// Description of why coercion failed.
        message: String,
    },
    /// The execution's cancellation token was observed tripped.
    #[display("The operation was cancelled.")]
    Cancellation,
}

/// One error produced during execution, with its source locations and
/// response path.
#[derive(Clone, Debug, derive_more::Display)]
#[display("{kind}")]
pub struct ExecutionError {
    /// What went wrong.
    pub kind: ExecutionErrorKind,
    /// The underlying cause's string form, kept separately from `kind`'s
    /// `Display` so it can be dropped unless `exposeExceptions`-equivalent
    /// behavior (the `expose-exceptions` feature) is enabled by the host.
    pub cause: Option<String>,
    /// `(line, column)` locations derived from the triggering AST node.
    /// Zero or more, per spec.md §3.
    pub locations: Vec<SourcePosition>,
    /// Response-path segments (field names / list indices) from the root
    /// to the field that produced this error, outermost first.
    pub path: Vec<PathSegment>,
}

/// One segment of an [`ExecutionError::path`].
#[derive(Clone, Debug, PartialEq)]
pub enum PathSegment {
    /// A field's response name.
    Field(String),
    /// A list element index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl ExecutionError {
    /// Builds an error with no cause and no path (callers push path
    /// segments as the completion recursion unwinds, see
    /// [`crate::complete`]).
    pub fn new(kind: ExecutionErrorKind, locations: Vec<SourcePosition>) -> Self {
        Self { kind, cause: None, locations, path: Vec::new() }
    }

    /// Attaches the string form of an underlying cause.
    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Prepends a path segment as the error bubbles up through completion.
    pub fn push_path_front(&mut self, segment: PathSegment) {
        self.path.insert(0, segment);
    }

    /// Renders the message a host would show the user, including the
    /// cause when `expose_exceptions` is set.
    pub fn message(&self, expose_exceptions: bool) -> String {
        match (&self.cause, expose_exceptions) {
            (Some(cause), true) => format!("{self}: {cause}"),
            _ => self.to_string(),
        }
    }
}

/// An append-only, thread-safe list of [`ExecutionError`]s (C7).
///
/// `add` is safe for concurrent callers; order across parallel resolvers
/// is not guaranteed, but errors from strictly sequential work (e.g.
/// variable coercion) keep their source order, per spec.md §5.
#[derive(Debug, Default)]
pub struct ErrorAccumulator {
    errors: Mutex<Vec<ExecutionError>>,
}

impl ErrorAccumulator {
    /// A fresh, empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error. Never reorders existing entries.
    pub fn add(&self, error: ExecutionError) {
        self.errors.lock().unwrap().push(error);
    }

    /// Whether any error has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.errors.lock().unwrap().is_empty()
    }

    /// Drains the accumulator, returning errors in append order.
    pub fn into_vec(self) -> Vec<ExecutionError> {
        self.errors.into_inner().unwrap()
    }

    /// Snapshots the errors recorded so far without draining them.
    pub fn snapshot(&self) -> Vec<ExecutionError> {
        self.errors.lock().unwrap().clone()
    }
}

/// A failure that prevents query execution from reaching the per-field
/// error model at all: a missing/ambiguous operation, a parse failure, or
/// a validation failure. Distinct from [`ExecutionError`], which is
/// always attached to a (possibly still partially-populated) result.
#[derive(Clone, Debug, derive_more::Display, derive_more::Error)]
pub enum GraphQLError {
    /// The external document builder failed to parse the source text.
    #[display("{_0}")]
    ParseError(#[error(not(source))] crate::ast::ParseError),
    /// The external validator rejected the document.
    #[display("validation failed with {} error(s)", _0.len())]
    ValidationError(#[error(not(source))] Vec<ExecutionError>),
    /// Neither `operationName` nor a sole operation was available.
    #[display("No operation provided")]
    NoOperationProvided,
    /// `operationName` did not match any operation in the document.
    #[display("Unknown operation name")]
    UnknownOperationName,
    /// `operationName` was empty/absent and the document has more than
    /// one operation.
    #[display("Multiple operations provided")]
    MultipleOperationsProvided,
    /// The schema has no root type for the requested operation kind.
    #[display("Schema has no root type for this operation")]
    NoRootType,
}

/// The executor's top-level output (C6), matching spec.md §6's result
/// shape. `errors` is conceptually absent (not merely empty) when there
/// were none, mirroring the GraphQL-over-HTTP convention of omitting the
/// key entirely; callers check [`Self::errors`] for that.
#[derive(Debug)]
pub struct ExecutionResult {
    /// The response data tree, or `None` when a non-null violation at the
    /// root (or an operation-level failure) nulled the whole thing.
    pub data: Option<Value>,
    /// Per-field errors recorded during execution. Empty when nothing
    /// went wrong.
    errors: Vec<ExecutionError>,
    /// The original query source text, if `execute` was given one
    /// (`None` when the caller passed a pre-parsed [`Document`] instead).
    pub query: Option<String>,
    /// The document the operation was selected from.
    pub document: Document,
    /// The operation that was executed.
    pub operation: Operation,
    /// Spans recorded by the [`crate::metrics::MetricsSink`] during this
    /// execution, in finish order.
    pub perf: Vec<SpanRecord>,
    /// Whether [`ExecutionError::message`] should include the underlying
    /// cause, mirroring the `exposeExceptions` execute option.
    pub expose_exceptions: bool,
}

impl ExecutionResult {
    /// Builds a result, normalizing an empty error vec the same way a
    /// freshly-drained [`ErrorAccumulator`] would be treated by a host
    /// serializer (key omitted rather than `[]`).
    #[expect(clippy::too_many_arguments, reason = "mirrors spec.md §6's result shape 1:1")]
    pub fn new(
        data: Option<Value>,
        errors: Vec<ExecutionError>,
        query: Option<String>,
        document: Document,
        operation: Operation,
        perf: Vec<SpanRecord>,
        expose_exceptions: bool,
    ) -> Self {
        Self { data, errors, query, document, operation, perf, expose_exceptions }
    }

    /// The recorded errors, or `None` when there were none.
    pub fn errors(&self) -> Option<&[ExecutionError]> {
        if self.errors.is_empty() { None } else { Some(&self.errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_preserves_append_order() {
        let acc = ErrorAccumulator::new();
        acc.add(ExecutionError::new(ExecutionErrorKind::Cancellation, vec![]));
        acc.add(ExecutionError::new(
            ExecutionErrorKind::Resolver { field_name: "a".into() },
            vec![],
        ));
        let errors = acc.into_vec();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0].kind, ExecutionErrorKind::Cancellation));
    }

    #[test]
    fn message_includes_cause_only_when_exposed() {
        let err = ExecutionError::new(
            ExecutionErrorKind::Resolver { field_name: "a".into() },
            vec![],
        )
        .with_cause("boom");
        assert_eq!(err.message(false), "Error trying to resolve a.");
        assert_eq!(err.message(true), "Error trying to resolve a.: boom");
    }
}
