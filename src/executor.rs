//! The Executor (C6): the top-level orchestrator that selects an
//! operation, binds variables, drives the recursive completion
//! algorithm, and produces the final [`ExecutionResult`], per spec.md
//! §4.7.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Document, DocumentBuilder, Operation, OperationType, RawInput};
use crate::cancellation::CancellationToken;
use crate::collect::{CollectedFields, collect_fields};
use crate::complete::{CompletionContext, execute_selection_set};
use crate::error::{ErrorAccumulator, ExecutionError, ExecutionResult, GraphQLError};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::schema::Schema;
use crate::source::Source;
use crate::variables::bind_variables;

/// Validates a parsed document against a schema (spec.md §1: out of
/// scope, consumed as an opaque collaborator). The core ships
/// [`NullValidator`] so it's usable stand-alone without pulling in a
/// validation crate.
pub trait DocumentValidator: Send + Sync {
    /// Returns validation errors for `operation`, or an empty vec when
    /// the document is valid.
    fn validate(&self, schema: &Schema, document: &Document, operation: &Operation) -> Vec<ExecutionError>;
}

/// A [`DocumentValidator`] that accepts every document.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullValidator;

impl DocumentValidator for NullValidator {
    fn validate(&self, _schema: &Schema, _document: &Document, _operation: &Operation) -> Vec<ExecutionError> {
        Vec::new()
    }
}

/// Analyzes a document's query complexity before execution (spec.md §1:
/// out of scope). Invoked only when [`ExecuteOptions::complexity_analyzer`]
/// is set.
pub trait ComplexityAnalyzer: Send + Sync {
    /// Checks `operation`'s complexity, failing with a single error when
    /// it is rejected.
    fn analyze(&self, schema: &Schema, document: &Document, operation: &Operation) -> Result<(), ExecutionError>;
}

/// The four lifecycle hook points an execution runs through (§4.7 steps
/// 5 and 9), run sequentially, awaiting each, per Design Note §9.
/// Default no-op bodies let listeners implement only the hooks they
/// care about.
#[async_trait::async_trait]
pub trait ExecutionListener: Send + Sync {
    /// Runs once validation has produced its (possibly empty) error list.
    async fn after_validation(&self, _errors: &[ExecutionError]) {}
    /// Runs immediately before the root selection set starts resolving.
    async fn before_execution(&self) {}
    /// Runs after the root execution has been launched but before it is
    /// awaited, mirroring the source's `beforeExecutionAwaitedAsync` hook.
    async fn before_execution_awaited(&self) {}
    /// Runs once the final [`ExecutionResult`] has been assembled.
    async fn after_execution(&self, _result: &ExecutionResult) {}
}

/// Everything a call to [`execute`] needs, matching spec.md §6's option
/// table. Construct with [`ExecuteOptions::new`] and the `with_*`
/// builder methods for the rest, mirroring [`Schema`]'s own builder
/// shape.
pub struct ExecuteOptions<'a> {
    /// The schema to execute against. Assumed already initialized (see
    /// [`Schema::initialize`]) — schema construction and field-middleware
    /// application happen before an execution, not during one.
    pub schema: &'a Schema,
    /// The root source value passed to top-level resolvers.
    pub root: Option<Source>,
    /// Source text, used only when `document` is absent.
    pub query: Option<&'a str>,
    /// A pre-parsed document; bypasses `document_builder` entirely.
    pub document: Option<Document>,
    /// Parses `query` into a [`Document`] when one isn't supplied
    /// directly. Required whenever `document` is `None`.
    pub document_builder: Option<&'a dyn DocumentBuilder>,
    /// Selects an operation by name; empty/absent selects the document's
    /// sole operation.
    pub operation_name: Option<&'a str>,
    /// Raw, host-supplied variable inputs, keyed by variable name.
    pub inputs: IndexMap<String, RawInput>,
    /// Opaque request-scoped context passed through to every resolver.
    pub user_context: Option<Source>,
    /// Cooperative cancellation signal.
    pub cancellation_token: CancellationToken,
    /// External static-validation collaborator.
    pub validator: &'a dyn DocumentValidator,
    /// External complexity collaborator; `None` skips the analysis step.
    pub complexity_analyzer: Option<&'a dyn ComplexityAnalyzer>,
    /// Lifecycle listeners, run in order.
    pub listeners: &'a [Arc<dyn ExecutionListener>],
    /// Scoped-timing sink.
    pub metrics: &'a dyn MetricsSink,
    /// Whether error messages include the underlying cause's string form.
    pub expose_exceptions: bool,
}

impl<'a> ExecuteOptions<'a> {
    /// The minimal required options: a schema and a root value. Every
    /// other option defaults to a no-op/absent collaborator.
    pub fn new(schema: &'a Schema, root: Option<Source>) -> Self {
        Self {
            schema,
            root,
            query: None,
            document: None,
            document_builder: None,
            operation_name: None,
            inputs: IndexMap::new(),
            user_context: None,
            cancellation_token: CancellationToken::new(),
            validator: &NullValidator,
            complexity_analyzer: None,
            listeners: &[],
            metrics: &NoopMetrics,
            expose_exceptions: cfg!(feature = "expose-exceptions"),
        }
    }

    /// Sets the source text to parse, together with the builder that
    /// parses it. Ignored once [`Self::document`] is set directly.
    pub fn with_query(mut self, query: &'a str, builder: &'a dyn DocumentBuilder) -> Self {
        self.query = Some(query);
        self.document_builder = Some(builder);
        self
    }

    /// Supplies a pre-parsed document, bypassing `query`/`document_builder`.
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Selects an operation by name.
    pub fn with_operation_name(mut self, name: &'a str) -> Self {
        self.operation_name = Some(name);
        self
    }

    /// Sets raw variable inputs.
    pub fn with_inputs(mut self, inputs: IndexMap<String, RawInput>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the opaque per-request user context.
    pub fn with_user_context(mut self, context: Source) -> Self {
        self.user_context = Some(context);
        self
    }

    /// Sets the cancellation signal.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Sets the static-validation collaborator.
    pub fn with_validator(mut self, validator: &'a dyn DocumentValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the complexity-analysis collaborator.
    pub fn with_complexity_analyzer(mut self, analyzer: &'a dyn ComplexityAnalyzer) -> Self {
        self.complexity_analyzer = Some(analyzer);
        self
    }

    /// Sets the lifecycle listeners, run in order.
    pub fn with_listeners(mut self, listeners: &'a [Arc<dyn ExecutionListener>]) -> Self {
        self.listeners = listeners;
        self
    }

    /// Sets the scoped-timing sink.
    pub fn with_metrics(mut self, metrics: &'a dyn MetricsSink) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets whether error messages include the underlying cause.
    pub fn with_expose_exceptions(mut self, expose: bool) -> Self {
        self.expose_exceptions = expose;
        self
    }
}

/// Selects the operation to run (§4.7 step 3): by name when
/// `operation_name` is non-empty, otherwise the document's sole
/// operation. A document with zero or more than one operation and no
/// name given is a result-level failure rather than a silent guess.
fn select_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<&'d Operation, GraphQLError> {
    match operation_name {
        Some(name) if !name.is_empty() => document
            .operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or(GraphQLError::UnknownOperationName),
        _ => match document.operations.len() {
            0 => Err(GraphQLError::NoOperationProvided),
            1 => Ok(&document.operations[0]),
            _ => Err(GraphQLError::MultipleOperationsProvided),
        },
    }
}

/// Looks up the root object type for `operation`'s kind (query,
/// mutation, or subscription), per spec.md §3: "query/mutation/
/// subscription root object types (nullable for the latter two)".
fn root_type_name(schema: &Schema, operation_type: OperationType) -> Option<crate::ast::Name> {
    match operation_type {
        OperationType::Query => Some(schema.query_type_name().clone()),
        OperationType::Mutation => schema.mutation_type_name().cloned(),
        OperationType::Subscription => schema.subscription_type_name().cloned(),
    }
}

/// Runs one execution end to end (§4.7 `execute`): selects the
/// operation, runs complexity analysis and validation, binds variables,
/// then resolves and completes the root selection set.
///
/// Returns `Err(GraphQLError)` only for failures that precede the
/// per-field error model entirely (parse failure, no operation
/// resolvable, no root type for the operation kind). Validation
/// failures, variable-coercion failures, and any per-field error are all
/// folded into a successfully-returned [`ExecutionResult`] whose `errors`
/// is non-empty and whose `data` is `None`, per spec.md §7.
pub async fn execute(options: ExecuteOptions<'_>) -> Result<ExecutionResult, GraphQLError> {
    let metrics = options.metrics;

    options.metrics.start_span("schema").finish();

    let document_span = metrics.start_span("document");
    let (document, query_text) = match options.document {
        Some(document) => (document, options.query.map(str::to_string)),
        None => {
            let query =
                options.query.expect("ExecuteOptions requires either `query` or `document`");
            let builder = options
                .document_builder
                .expect("ExecuteOptions requires a `document_builder` when `query` is given");
            let document = builder.build(query).map_err(GraphQLError::ParseError)?;
            (document, Some(query.to_string()))
        }
    };
    document_span.finish();

    let operation = select_operation(&document, options.operation_name)?.clone();

    if let Some(analyzer) = options.complexity_analyzer {
        let span = metrics.start_span("Analyzing complexity");
        let outcome = analyzer.analyze(options.schema, &document, &operation);
        span.finish();
        if let Err(error) = outcome {
            return Ok(ExecutionResult::new(
                None,
                vec![error],
                query_text,
                document,
                operation,
                metrics.records(),
                options.expose_exceptions,
            ));
        }
    }

    let validation_span = metrics.start_span("Validating document");
    let validation_errors = options.validator.validate(options.schema, &document, &operation);
    validation_span.finish();

    for listener in options.listeners {
        listener.after_validation(&validation_errors).await;
    }

    if !validation_errors.is_empty() {
        return Ok(ExecutionResult::new(
            None,
            validation_errors,
            query_text,
            document,
            operation,
            metrics.records(),
            options.expose_exceptions,
        ));
    }

    let variables = match bind_variables(options.schema, &operation, &options.inputs) {
        Ok(variables) => variables,
        Err(errors) => {
            return Ok(ExecutionResult::new(
                None,
                errors,
                query_text,
                document,
                operation,
                metrics.records(),
                options.expose_exceptions,
            ));
        }
    };

    let Some(root_type_name) = root_type_name(options.schema, operation.operation_type) else {
        return Err(GraphQLError::NoRootType);
    };
    let Some(root_meta_type) = options.schema.type_by_name(root_type_name.as_str()) else {
        return Err(GraphQLError::NoRootType);
    };

    let errors = ErrorAccumulator::new();
    let exec_span = metrics.start_span("Executing operation");

    for listener in options.listeners {
        listener.before_execution().await;
    }

    let completion_ctx = CompletionContext {
        schema: options.schema,
        document: &document,
        operation: &operation,
        variables: &variables,
        root_value: options.root.clone(),
        user_context: options.user_context.clone(),
        cancellation: &options.cancellation_token,
        metrics,
        errors: &errors,
    };

    let mut collected = CollectedFields::new();
    collect_fields(
        options.schema,
        &document,
        root_meta_type,
        &operation.selection_set,
        &variables,
        &mut collected,
    );

    let root_execution =
        execute_selection_set(&completion_ctx, root_meta_type, options.root.clone(), &collected, Vec::new());

    for listener in options.listeners {
        listener.before_execution_awaited().await;
    }

    let outcome = root_execution.await;
    exec_span.finish();

    let data = outcome.ok();
    let result = ExecutionResult::new(
        data,
        errors.into_vec(),
        query_text,
        document,
        operation,
        metrics.records(),
        options.expose_exceptions,
    );

    for listener in options.listeners {
        listener.after_execution(&result).await;
    }

    Ok(result)
}
