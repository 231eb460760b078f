//! The Value Coercer (C1): converts AST literals and raw host input into
//! typed runtime values, per spec.md §4.3.

use indexmap::IndexMap;

use crate::ast::{self, Name, RawInput};
use crate::schema::Schema;
use crate::schema::meta::TypeRef;
use crate::source::Source;
use crate::variables::Variables;

/// A coerced runtime value: the output of [`coerce_literal`]/[`coerce_input`].
///
/// Distinct from [`crate::value::Value`] (the *response* shape a resolved
/// field is completed into) — this is the shape of an *input*: an
/// already-validated argument or variable, ready to hand to a resolver.
#[derive(Clone)]
pub enum CoercedValue {
    /// Absent, or explicitly `null`.
    Null,
    /// A scalar or enum leaf, as produced by the type's `parseLiteral`/
    /// `parseValue` callback.
    Leaf(Source),
    /// A coerced list.
    List(Vec<CoercedValue>),
    /// A coerced input object.
    Object(IndexMap<Name, CoercedValue>),
}

impl CoercedValue {
    /// Whether this value is null (including "never set").
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Debug for CoercedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Leaf(_) => write!(f, "Leaf(..)"),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Object(fields) => f.debug_tuple("Object").field(fields).finish(),
        }
    }
}

/// Failure coercing a raw, host-supplied input value against a schema
/// type (§4.3 `coerceInput`). Always carries the dot/bracket path to the
/// offending value.
#[derive(Clone, Debug, derive_more::Display, derive_more::Error)]
#[display("{message} (at {path})")]
pub struct InvalidValue {
    /// Dot/bracket path into the input where coercion failed.
    pub path: String,
    /// Description of the failure.
    #[error(not(source))]
    pub message: String,
}

/// `coerceLiteral(type, astValue, variables) -> runtime value` (§4.3).
///
/// Never fails: an AST literal that doesn't fit the declared type
/// coerces to `null` rather than erroring, matching the spec's algorithm
/// (validation is expected to have already rejected such documents).
pub fn coerce_literal(
    schema: &Schema,
    type_ref: &TypeRef,
    ast_value: &ast::Value,
    variables: &Variables,
) -> CoercedValue {
    if let TypeRef::NonNull(inner) = type_ref {
        return coerce_literal(schema, inner, ast_value, variables);
    }
    if ast_value.is_null() {
        return CoercedValue::Null;
    }
    if let ast::Value::Variable(name) = ast_value {
        return variables.value_for(name).cloned().unwrap_or(CoercedValue::Null);
    }
    match type_ref {
        TypeRef::List(inner) => {
            if let ast::Value::List(items) = ast_value {
                CoercedValue::List(
                    items.iter().map(|item| coerce_literal(schema, inner, item, variables)).collect(),
                )
            } else {
                CoercedValue::List(vec![coerce_literal(schema, inner, ast_value, variables)])
            }
        }
        TypeRef::Named(name) => coerce_named_literal(schema, name, ast_value, variables),
        TypeRef::NonNull(_) => unreachable!("stripped above"),
    }
}

fn coerce_named_literal(
    schema: &Schema,
    name: &str,
    ast_value: &ast::Value,
    variables: &Variables,
) -> CoercedValue {
    use crate::schema::meta::MetaType;
    match schema.type_by_name(name) {
        Some(MetaType::Scalar(scalar)) => {
            (scalar.parse_literal)(ast_value).map(CoercedValue::Leaf).unwrap_or(CoercedValue::Null)
        }
        Some(MetaType::Enum(enum_type)) => {
            (enum_type.parse_literal)(ast_value).map(CoercedValue::Leaf).unwrap_or(CoercedValue::Null)
        }
        Some(MetaType::InputObject(input_object)) => {
            let ast::Value::Object(fields) = ast_value else {
                return CoercedValue::Null;
            };
            let mut out = IndexMap::with_capacity(input_object.fields.len());
            for (field_name, field_def) in &input_object.fields {
                let coerced = match fields.get(field_name.as_str()) {
                    Some(value) => coerce_literal(schema, &field_def.input_type, value, variables),
                    None => CoercedValue::Null,
                };
                let coerced = if coerced.is_null() {
                    match &field_def.default_value {
                        Some(default) => {
                            coerce_literal(schema, &field_def.input_type, default, &Variables::empty())
                        }
                        None => coerced,
                    }
                } else {
                    coerced
                };
                out.insert(field_name.clone(), coerced);
            }
            CoercedValue::Object(out)
        }
        _ => CoercedValue::Null,
    }
}

/// `coerceInput(type, rawInput, path) -> runtime value, or InvalidValue`
/// (§4.3). Used to validate operation variables (C2) against their
/// declared types.
pub fn coerce_input(
    schema: &Schema,
    type_ref: &TypeRef,
    raw: Option<&RawInput>,
    path: &str,
) -> Result<CoercedValue, InvalidValue> {
    let is_null = matches!(raw, None | Some(RawInput::Null));
    if let TypeRef::NonNull(inner) = type_ref {
        if is_null {
            return Err(InvalidValue {
                path: path.to_string(),
                message: format!("Expected non-null value for type \"{inner}!\""),
            });
        }
        return coerce_input(schema, inner, raw, path);
    }
    if is_null {
        return Ok(CoercedValue::Null);
    }
    let raw = raw.expect("non-null checked above");
    match type_ref {
        TypeRef::List(inner) => coerce_input_list(schema, inner, raw, path),
        TypeRef::Named(name) => coerce_named_input(schema, name, raw, path),
        TypeRef::NonNull(_) => unreachable!("stripped above"),
    }
}

fn coerce_input_list(
    schema: &Schema,
    inner: &TypeRef,
    raw: &RawInput,
    path: &str,
) -> Result<CoercedValue, InvalidValue> {
    if let RawInput::List(items) = raw {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{index}]");
            out.push(coerce_input(schema, inner, Some(item), &item_path)?);
        }
        Ok(CoercedValue::List(out))
    } else {
        Ok(CoercedValue::List(vec![coerce_input(schema, inner, Some(raw), path)?]))
    }
}

fn coerce_named_input(
    schema: &Schema,
    name: &str,
    raw: &RawInput,
    path: &str,
) -> Result<CoercedValue, InvalidValue> {
    use crate::schema::meta::MetaType;
    match schema.type_by_name(name) {
        Some(MetaType::Scalar(scalar)) => (scalar.parse_value)(raw).map(CoercedValue::Leaf).ok_or_else(|| {
            InvalidValue { path: path.to_string(), message: format!("Expected type \"{name}\"") }
        }),
        Some(MetaType::Enum(enum_type)) => {
            (enum_type.parse_value)(raw).map(CoercedValue::Leaf).ok_or_else(|| InvalidValue {
                path: path.to_string(),
                message: format!("Expected type \"{name}\""),
            })
        }
        Some(MetaType::InputObject(input_object)) => {
            let RawInput::Object(map) = raw else {
                return Err(InvalidValue {
                    path: path.to_string(),
                    message: format!("Expected \"{name}\" to be an object"),
                });
            };
            for key in map.keys() {
                if !input_object.fields.contains_key(key.as_str()) {
                    return Err(InvalidValue {
                        path: format!("{path}.{key}"),
                        message: format!("Field \"{key}\" is not defined by type \"{name}\""),
                    });
                }
            }
            let mut out = IndexMap::with_capacity(input_object.fields.len());
            for (field_name, field_def) in &input_object.fields {
                let field_path = format!("{path}.{field_name}");
                let coerced = match map.get(field_name.as_str()) {
                    Some(value) => coerce_input(schema, &field_def.input_type, Some(value), &field_path)?,
                    None => match &field_def.default_value {
                        Some(default) => {
                            coerce_literal(schema, &field_def.input_type, default, &Variables::empty())
                        }
                        None => coerce_input(schema, &field_def.input_type, None, &field_path)?,
                    },
                };
                out.insert(field_name.clone(), coerced);
            }
            Ok(CoercedValue::Object(out))
        }
        _ => Err(InvalidValue {
            path: path.to_string(),
            message: format!("Unknown input type \"{name}\""),
        }),
    }
}

/// Coerces a field's (or directive's) call-site arguments against its
/// declared argument definitions, falling back to each argument's default
/// value when the call site omits it (§4.5 `coerceArguments`).
pub fn coerce_arguments(
    schema: &Schema,
    arg_defs: &[crate::schema::meta::ArgumentDefinition],
    provided: &[ast::Argument],
    variables: &Variables,
) -> IndexMap<Name, CoercedValue> {
    let mut out = IndexMap::with_capacity(arg_defs.len());
    for def in arg_defs {
        let provided_value = provided.iter().find(|a| a.name == *def.name).map(|a| &a.value);
        let coerced = match provided_value {
            Some(value) => coerce_literal(schema, &def.arg_type, value, variables),
            None => match &def.default_value {
                Some(default) => coerce_literal(schema, &def.arg_type, default, &Variables::empty()),
                None => CoercedValue::Null,
            },
        };
        out.insert(def.name.clone(), coerced);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::meta::{MetaType, ScalarType};
    use crate::source::downcast_ref;
    use fnv::FnvHashMap;
    use std::sync::Arc;

    fn string_only_schema() -> Schema {
        let mut types = FnvHashMap::default();
        types.insert(
            Name::from("String"),
            MetaType::Scalar(ScalarType {
                name: Name::from("String"),
                serialize: Arc::new(|_| Ok(crate::value::Value::Null)),
                parse_value: Arc::new(|raw| match raw {
                    RawInput::String(s) => Some(crate::source::source(s.clone())),
                    _ => None,
                }),
                parse_literal: Arc::new(|value| match value {
                    ast::Value::String(s) => Some(crate::source::source(s.clone())),
                    _ => None,
                }),
            }),
        );
        Schema::new(types, Name::from("Query"))
    }

    #[test]
    fn coerce_literal_unwraps_variable_references() {
        let schema = string_only_schema();
        let mut variables = Variables::empty();
        variables.insert(Name::from("n"), CoercedValue::Leaf(crate::source::source("hi".to_string())));
        let coerced = coerce_literal(
            &schema,
            &TypeRef::Named(Name::from("String")),
            &ast::Value::Variable(Name::from("n")),
            &variables,
        );
        match coerced {
            CoercedValue::Leaf(v) => assert_eq!(downcast_ref::<String>(&v).unwrap(), "hi"),
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[test]
    fn coerce_input_rejects_unknown_input_object_field() {
        let mut fields = IndexMap::new();
        fields.insert(
            Name::from("name"),
            crate::schema::meta::InputFieldDefinition {
                name: Name::from("name"),
                input_type: TypeRef::Named(Name::from("String")),
                default_value: None,
            },
        );
        let mut types = FnvHashMap::default();
        types.insert(
            Name::from("String"),
            MetaType::Scalar(ScalarType {
                name: Name::from("String"),
                serialize: Arc::new(|_| Ok(crate::value::Value::Null)),
                parse_value: Arc::new(|raw| match raw {
                    RawInput::String(s) => Some(crate::source::source(s.clone())),
                    _ => None,
                }),
                parse_literal: Arc::new(|_| None),
            }),
        );
        types.insert(
            Name::from("Filter"),
            MetaType::InputObject(crate::schema::meta::InputObjectType {
                name: Name::from("Filter"),
                fields,
            }),
        );
        let schema = Schema::new(types, Name::from("Query"));

        let mut raw_fields = IndexMap::new();
        raw_fields.insert("nope".to_string(), RawInput::String("x".into()));
        let raw = RawInput::Object(raw_fields);

        let err = coerce_input(&schema, &TypeRef::Named(Name::from("Filter")), Some(&raw), "input")
            .unwrap_err();
        assert_eq!(err.path, "input.nope");
    }

    #[test]
    fn coerce_input_non_null_rejects_null() {
        let schema = string_only_schema();
        let type_ref = TypeRef::NonNull(Box::new(TypeRef::Named(Name::from("String"))));
        let err = coerce_input(&schema, &type_ref, None, "n").unwrap_err();
        assert_eq!(err.path, "n");
    }
}
