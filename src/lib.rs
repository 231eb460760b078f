//! A type-directed GraphQL query execution core.
//!
//! This crate implements the executable part of the October 2016 GraphQL
//! working-draft algorithm — field collection, argument/variable
//! coercion, resolver dispatch, and recursive value completion — against
//! an already-built, already-validated type system. It does not parse
//! queries, validate documents against a schema, or build a schema from
//! SDL/derive macros/introspection: those are external collaborators the
//! host plugs in behind [`ast::DocumentBuilder`], [`executor::DocumentValidator`],
//! and [`schema::Schema`] respectively.
//!
//! The entry point is [`executor::execute`].

pub mod ast;
pub mod cancellation;
pub mod coercion;
pub mod collect;
pub mod complete;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod resolve;
pub mod schema;
pub mod source;
pub mod value;
pub mod variables;

pub use ast::{Document, DocumentBuilder, Name, ParseError, RawInput};
pub use cancellation::CancellationToken;
pub use error::{ExecutionError, ExecutionErrorKind, ExecutionResult, GraphQLError, PathSegment};
pub use executor::{ComplexityAnalyzer, DocumentValidator, ExecuteOptions, ExecutionListener, NullValidator, execute};
pub use metrics::{MetricsSink, NoopMetrics, RecordingMetrics, Span, SpanRecord};
pub use schema::{MetaType, Schema};
pub use source::{Source, source};
pub use value::{Object, Scalar, Value};
pub use variables::Variables;
