//! The Field Collector (C3): flattens a selection set into an ordered
//! response-name → [`FieldGroup`] map, applying fragment spreads, inline
//! fragments, and `@skip`/`@include` directives, per spec.md §4.1–§4.2.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::{self, Document, Field, Name, Selection};
use crate::schema::Schema;
use crate::schema::meta::MetaType;
use crate::variables::{Variables, coerce_directive_if_argument};

/// All `Field` AST nodes sharing a response name after collection. The
/// first element is canonical for error reporting (§8 invariant).
#[derive(Clone, Debug, Default)]
pub struct FieldGroup(pub Vec<Field>);

impl FieldGroup {
    /// The canonical field for this group — `group[0]`.
    pub fn canonical(&self) -> &Field {
        &self.0[0]
    }
}

/// Response-name → grouped fields, in first-encounter order (§4.1
/// invariant).
pub type CollectedFields = IndexMap<Name, FieldGroup>;

/// Collects fields reachable from `selection_set` for concrete object type
/// `object_type`, flattening fragment spreads and inline fragments and
/// applying directive filters. Extends (rather than replaces) `into`, so
/// callers can union multiple selection sets (§4.6 step 6: "union the
/// selection sets of all fields in the group").
pub fn collect_fields(
    schema: &Schema,
    document: &Document,
    object_type: &MetaType,
    selection_set: &[Selection],
    variables: &Variables,
    into: &mut CollectedFields,
) {
    let mut visited = HashSet::new();
    collect_fields_inner(schema, document, object_type, selection_set, variables, &mut visited, into);
}

fn collect_fields_inner(
    schema: &Schema,
    document: &Document,
    object_type: &MetaType,
    selection_set: &[Selection],
    variables: &Variables,
    visited_fragments: &mut HashSet<Name>,
    into: &mut CollectedFields,
) {
    for selection in selection_set {
        match selection {
            Selection::Field(field) => {
                if is_excluded_by_directives(&field.directives, variables) {
                    continue;
                }
                into.entry(field.response_name().clone()).or_default().0.push(field.clone());
            }
            Selection::FragmentSpread { name, directives, .. } => {
                if visited_fragments.contains(name) {
                    continue;
                }
                if is_excluded_by_directives(directives, variables) {
                    continue;
                }
                visited_fragments.insert(name.clone());

                let Some(fragment) = document.fragments.get(name.as_str()) else {
                    continue;
                };
                if is_excluded_by_directives(&fragment.directives, variables) {
                    continue;
                }
                if !does_fragment_condition_match(schema, &fragment.type_condition, object_type) {
                    continue;
                }
                collect_fields_inner(
                    schema,
                    document,
                    object_type,
                    &fragment.selection_set,
                    variables,
                    visited_fragments,
                    into,
                );
            }
            Selection::InlineFragment { type_condition, directives, selection_set, .. } => {
                if is_excluded_by_directives(directives, variables) {
                    continue;
                }
                let condition = type_condition.as_deref().unwrap_or(object_type.name());
                if !does_fragment_condition_match(schema, condition, object_type) {
                    continue;
                }
                collect_fields_inner(
                    schema,
                    document,
                    object_type,
                    selection_set,
                    variables,
                    visited_fragments,
                    into,
                );
            }
        }
    }
}

/// `DoesFragmentConditionMatch` (§4.1): true when the condition is empty,
/// names the concrete type itself, or names an abstract type that the
/// concrete type implements/belongs to.
fn does_fragment_condition_match(schema: &Schema, condition: &str, object_type: &MetaType) -> bool {
    if condition.is_empty() {
        return true;
    }
    if object_type.name().as_str() == condition {
        return true;
    }
    match schema.type_by_name(condition) {
        Some(cond_type) if cond_type.is_abstract() => {
            schema.is_possible_type(cond_type, object_type.name())
        }
        _ => false,
    }
}

/// `@skip(if: true)` or `@include(if: false)` excludes the node; either
/// directive excluding it is enough to drop the node (§4.2).
fn is_excluded_by_directives(directives: &[ast::Directive], variables: &Variables) -> bool {
    for directive in directives {
        match directive.name.as_str() {
            "skip" if coerce_directive_if_argument(directive, variables) => return true,
            "include" if !coerce_directive_if_argument(directive, variables) => return true,
            _ => {}
        }
    }
    false
}
