//! The Variable Binder (C2): validates and coerces operation variable
//! inputs into a name-keyed map, per spec.md §4.4.

use indexmap::IndexMap;

use crate::ast::{self, Name, Operation, RawInput};
use crate::coercion::{CoercedValue, InvalidValue, coerce_input, coerce_literal};
use crate::error::{ExecutionError, ExecutionErrorKind};
use crate::schema::Schema;

/// Operation variables, bound once per execution and immutable thereafter
/// (spec.md §3).
#[derive(Default)]
pub struct Variables {
    values: IndexMap<Name, CoercedValue>,
}

impl Variables {
    /// An empty variable set, used when coercing default-value literals
    /// (which may not themselves reference variables).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Looks up a bound variable's coerced value.
    pub fn value_for(&self, name: &str) -> Option<&CoercedValue> {
        self.values.get(name)
    }

    /// Inserts a coerced value, overwriting any existing binding.
    pub fn insert(&mut self, name: Name, value: CoercedValue) {
        self.values.insert(name, value);
    }
}

/// Binds every variable declared on `operation` against `inputs`
/// (the host-supplied `inputs` option, §6), per §4.4:
///
/// - Resolve the declared type against the schema.
/// - Coerce the raw input (or `null` if absent) with [`coerce_input`].
/// - If the raw input is null/absent and a default value AST exists, use
///   [`coerce_literal`] against an empty variable set instead.
/// - On failure, attach the declaration's source location and stop —
///   the caller does not proceed to execute any field (§7
///   `VariableCoercionError`).
pub fn bind_variables(
    schema: &Schema,
    operation: &Operation,
    inputs: &IndexMap<String, RawInput>,
) -> Result<Variables, Vec<ExecutionError>> {
    let mut variables = Variables::empty();
    let mut errors = Vec::new();

    for def in &operation.variable_definitions {
        let type_ref = schema.resolve_type_ref(&def.var_type);
        let raw = inputs.get(def.name.as_str());

        let coerced = match (raw, &def.default_value) {
            (None | Some(RawInput::Null), Some(default)) => {
                Ok(coerce_literal(schema, &type_ref, default, &Variables::empty()))
            }
            _ => coerce_input(schema, &type_ref, raw, def.name.as_str()),
        };

        match coerced {
            Ok(value) => variables.insert(def.name.clone(), value),
            Err(InvalidValue { path, message }) => {
                errors.push(ExecutionError::new(
                    ExecutionErrorKind::VariableCoercion {
                        variable_name: def.name.to_string(),
                        path,
                        message,
                    },
                    vec![def.location],
                ));
            }
        }
    }

    if errors.is_empty() { Ok(variables) } else { Err(errors) }
}

/// Coerces a directive argument's boolean value for `@skip`/`@include`
/// (§4.2). Per the Open Question in spec.md §9, a conformant
/// implementation requires an actual boolean after coercion rather than a
/// string-parse fallback; a missing/non-boolean `if` defaults to `false`
/// (include for `@skip`, exclude for `@include`), matching the spec text.
pub fn coerce_directive_if_argument(directive: &ast::Directive, variables: &Variables) -> bool {
    match directive.argument("if") {
        Some(ast::Value::Boolean(b)) => *b,
        Some(ast::Value::Variable(name)) => match variables.value_for(name) {
            Some(CoercedValue::Leaf(source)) => {
                crate::source::downcast_ref::<bool>(source).copied().unwrap_or(false)
            }
            _ => false,
        },
        _ => false,
    }
}
