//! Integration coverage for the scenarios the execution algorithm is
//! expected to handle end to end: skip directives, aliasing, non-null
//! propagation, fragment type conditions over a union, variable
//! coercion, and sibling concurrency.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use indexmap::IndexMap;

use gql_engine::ast::{
    Argument, Directive, Field, Name, Operation, OperationType, RawInput, Selection,
    SourcePosition, Type as AstType, Value as AstValue, VariableDefinition,
};
use gql_engine::executor::{execute, ExecuteOptions};
use gql_engine::schema::meta::{
    ArgumentDefinition, FieldDefinition, FnAccessor, MetaType, ObjectType, PropertyAccessor,
    ResolverError, ScalarType, TypeRef, UnionType,
};
use gql_engine::source::{downcast_ref, source};
use gql_engine::value::{Scalar, Value};
use gql_engine::{Document, Schema, Source};

fn pos() -> SourcePosition {
    SourcePosition::new(1, 1)
}

fn field(name: &str, alias: Option<&str>) -> Field {
    Field {
        alias: alias.map(Name::from),
        name: Name::from(name),
        arguments: vec![],
        directives: vec![],
        selection_set: vec![],
        location: pos(),
    }
}

fn string_scalar() -> MetaType {
    MetaType::Scalar(ScalarType {
        name: Name::from("String"),
        serialize: Arc::new(|raw| match downcast_ref::<Option<String>>(raw) {
            Some(Some(s)) => Ok(Value::Scalar(Scalar::String(s.clone()))),
            Some(None) => Ok(Value::Null),
            None => downcast_ref::<String>(raw)
                .cloned()
                .map(|s| Value::Scalar(Scalar::String(s)))
                .ok_or_else(|| "not a String".to_string()),
        }),
        parse_value: Arc::new(|raw| match raw {
            RawInput::String(s) => Some(source(s.clone())),
            _ => None,
        }),
        parse_literal: Arc::new(|value| match value {
            AstValue::String(s) => Some(source(s.clone())),
            _ => None,
        }),
    })
}

fn bool_scalar() -> MetaType {
    MetaType::Scalar(ScalarType {
        name: Name::from("Boolean"),
        serialize: Arc::new(|raw| {
            downcast_ref::<bool>(raw)
                .copied()
                .map(|b| Value::Scalar(Scalar::Boolean(b)))
                .ok_or_else(|| "not a bool".to_string())
        }),
        parse_value: Arc::new(|raw| match raw {
            RawInput::Boolean(b) => Some(source(*b)),
            _ => None,
        }),
        parse_literal: Arc::new(|value| match value {
            AstValue::Boolean(b) => Some(source(*b)),
            _ => None,
        }),
    })
}

/// An `Int` scalar that refuses to coerce strings, per spec.md §8
/// scenario 5's "if it refuses strings" branch.
fn strict_int_scalar() -> MetaType {
    MetaType::Scalar(ScalarType {
        name: Name::from("Int"),
        serialize: Arc::new(|raw| {
            downcast_ref::<i32>(raw)
                .copied()
                .map(|i| Value::Scalar(Scalar::Int(i)))
                .ok_or_else(|| "not an i32".to_string())
        }),
        parse_value: Arc::new(|raw| match raw {
            RawInput::Int(i) => Some(source(*i as i32)),
            _ => None,
        }),
        parse_literal: Arc::new(|value| match value {
            AstValue::Int(i) => Some(source(*i as i32)),
            _ => None,
        }),
    })
}

fn string_accessor(value: &'static str) -> Arc<dyn PropertyAccessor> {
    Arc::new(FnAccessor(move |_source: &Source| Ok(source(value.to_string()))))
}

fn document_with_operation(operation: Operation) -> Document {
    Document { operations: vec![operation], fragments: IndexMap::new() }
}

fn query_operation(selection_set: Vec<Selection>) -> Operation {
    Operation {
        operation_type: OperationType::Query,
        name: None,
        variable_definitions: vec![],
        directives: vec![],
        selection_set,
        location: pos(),
    }
}

#[tokio::test]
async fn skip_directive_omits_the_field() {
    let mut fields = IndexMap::new();
    fields.insert(
        Name::from("a"),
        FieldDefinition {
            name: Name::from("a"),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("String")),
            resolver: None,
            accessor: Some(string_accessor("a-value")),
            deprecation: Default::default(),
        },
    );
    fields.insert(
        Name::from("b"),
        FieldDefinition {
            name: Name::from("b"),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("String")),
            resolver: None,
            accessor: Some(string_accessor("b-value")),
            deprecation: Default::default(),
        },
    );
    let mut types = FnvHashMap::default();
    types.insert(Name::from("String"), string_scalar());
    types.insert(
        Name::from("Query"),
        MetaType::Object(ObjectType { name: Name::from("Query"), fields, interfaces: vec![], is_type_of: None }),
    );
    let mut schema = Schema::new(types, Name::from("Query"));
    schema.initialize();

    let mut b_field = field("b", None);
    b_field.directives = vec![Directive {
        name: Name::from("skip"),
        arguments: vec![Argument { name: Name::from("if"), value: AstValue::Boolean(true) }],
        location: pos(),
    }];
    let document = document_with_operation(query_operation(vec![field("a", None), b_field]));

    let options = ExecuteOptions::new(&schema, Some(source("root".to_string()))).with_document(document);
    let result = execute(options).await.unwrap();
    assert!(result.errors().is_none());
    let data = result.data.unwrap();
    let object = data.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert_eq!(object.get("a"), Some(&Value::Scalar(Scalar::String("a-value".into()))));
    assert_eq!(object.get("b"), None);
}

#[tokio::test]
async fn aliases_produce_both_response_keys_in_order() {
    let mut fields = IndexMap::new();
    fields.insert(
        Name::from("a"),
        FieldDefinition {
            name: Name::from("a"),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("String")),
            resolver: None,
            accessor: Some(string_accessor("shared")),
            deprecation: Default::default(),
        },
    );
    let mut types = FnvHashMap::default();
    types.insert(Name::from("String"), string_scalar());
    types.insert(
        Name::from("Query"),
        MetaType::Object(ObjectType { name: Name::from("Query"), fields, interfaces: vec![], is_type_of: None }),
    );
    let mut schema = Schema::new(types, Name::from("Query"));
    schema.initialize();

    let document = document_with_operation(query_operation(vec![
        field("a", Some("x")),
        field("a", Some("y")),
    ]));

    let options = ExecuteOptions::new(&schema, Some(source("root".to_string()))).with_document(document);
    let result = execute(options).await.unwrap();
    assert!(result.errors().is_none());
    let data = result.data.unwrap();
    let object = data.as_object().unwrap();
    let keys: Vec<_> = object.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(object.get("x"), Some(&Value::Scalar(Scalar::String("shared".into()))));
    assert_eq!(object.get("y"), Some(&Value::Scalar(Scalar::String("shared".into()))));
}

#[tokio::test]
async fn non_null_child_violation_nulls_the_nearest_nullable_parent() {
    let mut parent_fields = IndexMap::new();
    parent_fields.insert(
        Name::from("child"),
        FieldDefinition {
            name: Name::from("child"),
            arguments: vec![],
            return_type: TypeRef::NonNull(Box::new(TypeRef::Named(Name::from("String")))),
            resolver: None,
            accessor: Some(Arc::new(FnAccessor(|_: &Source| {
                Ok(source(Option::<String>::None))
            }))),
            deprecation: Default::default(),
        },
    );
    let mut query_fields = IndexMap::new();
    query_fields.insert(
        Name::from("parent"),
        FieldDefinition {
            name: Name::from("parent"),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("Parent")),
            resolver: None,
            accessor: Some(Arc::new(FnAccessor(|_: &Source| Ok(source(()))))),
            deprecation: Default::default(),
        },
    );

    let mut types = FnvHashMap::default();
    types.insert(Name::from("String"), string_scalar());
    types.insert(
        Name::from("Parent"),
        MetaType::Object(ObjectType {
            name: Name::from("Parent"),
            fields: parent_fields,
            interfaces: vec![],
            is_type_of: None,
        }),
    );
    types.insert(
        Name::from("Query"),
        MetaType::Object(ObjectType {
            name: Name::from("Query"),
            fields: query_fields,
            interfaces: vec![],
            is_type_of: None,
        }),
    );
    let mut schema = Schema::new(types, Name::from("Query"));
    schema.initialize();

    let mut parent_selection = field("parent", None);
    parent_selection.selection_set = vec![Selection::Field(field("child", None))];
    let document = document_with_operation(query_operation(vec![parent_selection]));

    let options = ExecuteOptions::new(&schema, Some(source(()))).with_document(document);
    let result = execute(options).await.unwrap();

    let data = result.data.unwrap();
    let object = data.as_object().unwrap();
    assert_eq!(object.get("parent"), Some(&Value::Null));

    let errors = result.errors().unwrap();
    assert_eq!(errors.len(), 1);
    match &errors[0].kind {
        gql_engine::ExecutionErrorKind::NonNullViolation { field_name, .. } => {
            assert_eq!(field_name, "child");
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}

struct Cat {
    meows: bool,
}
struct Dog {
    barks: bool,
}

#[tokio::test]
async fn fragment_type_conditions_select_only_matching_fields() {
    let mut cat_fields = IndexMap::new();
    cat_fields.insert(
        Name::from("meows"),
        FieldDefinition {
            name: Name::from("meows"),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("Boolean")),
            resolver: None,
            accessor: Some(Arc::new(FnAccessor(|source: &Source| {
                downcast_ref::<Cat>(source)
                    .map(|cat| source(cat.meows))
                    .ok_or_else(|| ResolverError::new("not a Cat"))
            }))),
            deprecation: Default::default(),
        },
    );
    let mut dog_fields = IndexMap::new();
    dog_fields.insert(
        Name::from("barks"),
        FieldDefinition {
            name: Name::from("barks"),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("Boolean")),
            resolver: None,
            accessor: Some(Arc::new(FnAccessor(|source: &Source| {
                downcast_ref::<Dog>(source)
                    .map(|dog| source(dog.barks))
                    .ok_or_else(|| ResolverError::new("not a Dog"))
            }))),
            deprecation: Default::default(),
        },
    );

    let mut query_fields = IndexMap::new();
    query_fields.insert(
        Name::from("pets"),
        FieldDefinition {
            name: Name::from("pets"),
            arguments: vec![],
            return_type: TypeRef::List(Box::new(TypeRef::Named(Name::from("Pet")))),
            resolver: None,
            accessor: Some(Arc::new(FnAccessor(|_: &Source| {
                let items: Vec<Source> =
                    vec![source(Cat { meows: true }), source(Dog { barks: true })];
                Ok(source(items))
            }))),
            deprecation: Default::default(),
        },
    );

    let mut types = FnvHashMap::default();
    types.insert(Name::from("Boolean"), bool_scalar());
    types.insert(
        Name::from("Cat"),
        MetaType::Object(ObjectType {
            name: Name::from("Cat"),
            fields: cat_fields,
            interfaces: vec![],
            is_type_of: Some(Arc::new(|source| downcast_ref::<Cat>(source).is_some())),
        }),
    );
    types.insert(
        Name::from("Dog"),
        MetaType::Object(ObjectType {
            name: Name::from("Dog"),
            fields: dog_fields,
            interfaces: vec![],
            is_type_of: Some(Arc::new(|source| downcast_ref::<Dog>(source).is_some())),
        }),
    );
    types.insert(
        Name::from("Pet"),
        MetaType::Union(UnionType {
            name: Name::from("Pet"),
            possible_types: vec![Name::from("Cat"), Name::from("Dog")],
            resolve_type: Arc::new(|source| {
                if downcast_ref::<Cat>(source).is_some() {
                    Some(Name::from("Cat"))
                } else if downcast_ref::<Dog>(source).is_some() {
                    Some(Name::from("Dog"))
                } else {
                    None
                }
            }),
        }),
    );
    types.insert(
        Name::from("Query"),
        MetaType::Object(ObjectType {
            name: Name::from("Query"),
            fields: query_fields,
            interfaces: vec![],
            is_type_of: None,
        }),
    );
    let mut schema = Schema::new(types, Name::from("Query"));
    schema.initialize();

    let mut pets_selection = field("pets", None);
    pets_selection.selection_set = vec![
        Selection::InlineFragment {
            type_condition: Some(Name::from("Cat")),
            directives: vec![],
            selection_set: vec![Selection::Field(field("meows", None))],
            location: pos(),
        },
        Selection::InlineFragment {
            type_condition: Some(Name::from("Dog")),
            directives: vec![],
            selection_set: vec![Selection::Field(field("barks", None))],
            location: pos(),
        },
    ];
    let document = document_with_operation(query_operation(vec![pets_selection]));

    let options = ExecuteOptions::new(&schema, Some(source(()))).with_document(document);
    let result = execute(options).await.unwrap();
    assert!(result.errors().is_none());

    let data = result.data.unwrap();
    let object = data.as_object().unwrap();
    match object.get("pets") {
        Some(Value::List(items)) => {
            assert_eq!(items.len(), 2);
            let cat = items[0].as_object().unwrap();
            assert_eq!(cat.len(), 1);
            assert_eq!(cat.get("meows"), Some(&Value::Scalar(Scalar::Boolean(true))));
            let dog = items[1].as_object().unwrap();
            assert_eq!(dog.len(), 1);
            assert_eq!(dog.get("barks"), Some(&Value::Scalar(Scalar::Boolean(true))));
        }
        other => panic!("expected a list, got {other:?}"),
    }
}

fn schema_with_int_and_double_field() -> Schema {
    let mut query_fields = IndexMap::new();
    query_fields.insert(
        Name::from("double"),
        FieldDefinition {
            name: Name::from("double"),
            arguments: vec![ArgumentDefinition {
                name: Name::from("x"),
                arg_type: TypeRef::NonNull(Box::new(TypeRef::Named(Name::from("Int")))),
                default_value: None,
            }],
            return_type: TypeRef::Named(Name::from("Int")),
            resolver: Some(Arc::new(gql_engine::schema::meta::FnResolver(|args| {
                use gql_engine::coercion::CoercedValue;
                let value = match args.arguments.get("x") {
                    Some(CoercedValue::Leaf(source)) => downcast_ref::<i32>(source).copied().unwrap_or(0),
                    _ => 0,
                };
                gql_engine::schema::meta::FieldResolution::Ready(Ok(source(value * 2)))
            }))),
            accessor: None,
            deprecation: Default::default(),
        },
    );
    let mut types = FnvHashMap::default();
    types.insert(Name::from("Int"), strict_int_scalar());
    types.insert(
        Name::from("Query"),
        MetaType::Object(ObjectType {
            name: Name::from("Query"),
            fields: query_fields,
            interfaces: vec![],
            is_type_of: None,
        }),
    );
    let mut schema = Schema::new(types, Name::from("Query"));
    schema.initialize();
    schema
}

fn double_operation() -> Operation {
    let mut double_field = field("double", None);
    double_field.arguments =
        vec![Argument { name: Name::from("x"), value: AstValue::Variable(Name::from("n")) }];
    Operation {
        operation_type: OperationType::Query,
        name: None,
        variable_definitions: vec![VariableDefinition {
            name: Name::from("n"),
            var_type: AstType::NonNull(Box::new(AstType::Named(Name::from("Int")))),
            default_value: None,
            location: pos(),
        }],
        directives: vec![],
        selection_set: vec![Selection::Field(double_field)],
        location: pos(),
    }
}

#[tokio::test]
async fn variable_coercion_succeeds_for_a_matching_int_input() {
    let schema = schema_with_int_and_double_field();
    let document = document_with_operation(double_operation());
    let mut inputs = IndexMap::new();
    inputs.insert("n".to_string(), RawInput::Int(5));

    let options = ExecuteOptions::new(&schema, None).with_document(document).with_inputs(inputs);
    let result = execute(options).await.unwrap();
    assert!(result.errors().is_none());
    let data = result.data.unwrap();
    let object = data.as_object().unwrap();
    assert_eq!(object.get("double"), Some(&Value::Scalar(Scalar::Int(10))));
}

#[tokio::test]
async fn variable_coercion_fails_at_path_for_a_string_when_int_is_strict() {
    let schema = schema_with_int_and_double_field();
    let document = document_with_operation(double_operation());
    let mut inputs = IndexMap::new();
    inputs.insert("n".to_string(), RawInput::String("5".to_string()));

    let options = ExecuteOptions::new(&schema, None).with_document(document).with_inputs(inputs);
    let result = execute(options).await.unwrap();
    assert!(result.data.is_none());
    let errors = result.errors().unwrap();
    assert_eq!(errors.len(), 1);
    match &errors[0].kind {
        gql_engine::ExecutionErrorKind::VariableCoercion { variable_name, path, .. } => {
            assert_eq!(variable_name, "n");
            assert_eq!(path, "n");
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sibling_resolvers_run_concurrently() {
    fn sleepy_field(name: &str) -> FieldDefinition {
        FieldDefinition {
            name: Name::from(name),
            arguments: vec![],
            return_type: TypeRef::Named(Name::from("String")),
            resolver: Some(Arc::new(gql_engine::schema::meta::FnResolver(|_args| {
                gql_engine::schema::meta::FieldResolution::Deferred(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(source("done".to_string()))
                }))
            }))),
            accessor: None,
            deprecation: Default::default(),
        }
    }

    let mut fields = IndexMap::new();
    fields.insert(Name::from("a"), sleepy_field("a"));
    fields.insert(Name::from("b"), sleepy_field("b"));
    let mut types = FnvHashMap::default();
    types.insert(Name::from("String"), string_scalar());
    types.insert(
        Name::from("Query"),
        MetaType::Object(ObjectType { name: Name::from("Query"), fields, interfaces: vec![], is_type_of: None }),
    );
    let mut schema = Schema::new(types, Name::from("Query"));
    schema.initialize();

    let document = document_with_operation(query_operation(vec![field("a", None), field("b", None)]));
    let options = ExecuteOptions::new(&schema, Some(source(()))).with_document(document);

    let started = Instant::now();
    let result = execute(options).await.unwrap();
    let elapsed = started.elapsed();

    assert!(result.errors().is_none());
    assert!(elapsed < Duration::from_millis(900), "elapsed = {elapsed:?}");
}
