use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use itertools::Itertools;

use crate::error::CompositionError;
use crate::field_set::FieldSet;
use crate::field_set::Fragment;
use crate::field_set::Selection;
use crate::merge::MergedSchema;
use crate::merge::TypeDescriptor;
use crate::merge::TypeKind;

const TYPENAME_FIELD: &str = "__typename";

/// Checks the merged types for inconsistencies between subgraphs. Every check runs, and the
/// errors are returned together.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn validate(schema: &MergedSchema) -> Result<(), Vec<CompositionError>> {
    let mut errors = Vec::new();
    validate_type_kinds(schema, &mut errors);
    validate_interface_fields(schema, &mut errors);
    validate_field_set_references(schema, &mut errors);
    validate_field_ownership(schema, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(errors = errors.len(), "merged schema is invalid");
        Err(errors)
    }
}

fn validate_type_kinds(schema: &MergedSchema, errors: &mut Vec<CompositionError>) {
    for ty in schema.types.values() {
        let kind = ty.declared_kind();
        if ty
            .contributions
            .iter()
            .all(|contribution| contribution.kind == kind)
        {
            continue;
        }
        errors.push(CompositionError::TypeKindConflict {
            type_name: ty.name.clone(),
            declarations: ty
                .contributions
                .iter()
                .map(|contribution| (contribution.graph.to_string(), contribution.kind))
                .collect(),
        });
    }
}

fn validate_interface_fields(schema: &MergedSchema, errors: &mut Vec<CompositionError>) {
    for ty in schema.types.values() {
        for interface_name in &ty.implements {
            let Some(interface) = schema.types.get(interface_name) else {
                continue;
            };
            if interface.kind != TypeKind::Interface {
                continue;
            }
            for field in interface.fields.keys() {
                if ty.fields.contains_key(field) {
                    continue;
                }
                let subgraphs = ty
                    .contributions
                    .iter()
                    .filter(|contribution| contribution.implements.contains(interface_name))
                    .map(|contribution| contribution.graph.to_string())
                    .collect();
                errors.push(CompositionError::MissingInterfaceField {
                    type_name: ty.name.clone(),
                    interface: interface_name.clone(),
                    field: field.clone(),
                    subgraphs,
                });
            }
        }
    }
}

fn validate_field_set_references(schema: &MergedSchema, errors: &mut Vec<CompositionError>) {
    for fragment in schema.types.values().flat_map(|ty| &ty.fragments) {
        let mut path = Vec::new();
        if let Some((field, type_name)) =
            find_dangling_field(schema, &fragment.target, &fragment.field_set, &mut path)
        {
            errors.push(dangling_reference(fragment, field, type_name));
        }
    }
}

/// Resolves `field_set` against `type_name`, returning the first selected field that does not
/// exist, as a dotted path, with the type it was looked up on.
fn find_dangling_field(
    schema: &MergedSchema,
    type_name: &Name,
    field_set: &FieldSet,
    path: &mut Vec<Name>,
) -> Option<(String, Name)> {
    let ty = schema.types.get(type_name);
    for selection in field_set.selections() {
        path.push(selection.name().clone());
        if selection.name().as_str() == TYPENAME_FIELD {
            if let Selection::Nested(..) = selection {
                return Some((path.iter().join("."), type_name.clone()));
            }
            path.pop();
            continue;
        }
        let Some(field) = ty.and_then(|ty| selectable_field(ty, selection.name())) else {
            return Some((path.iter().join("."), type_name.clone()));
        };
        if let Selection::Nested(_, nested) = selection {
            let found = find_dangling_field(schema, field.inner_named_type(), nested, path);
            if found.is_some() {
                return found;
            }
        }
        path.pop();
    }
    None
}

fn selectable_field<'a>(ty: &'a TypeDescriptor, name: &Name) -> Option<&'a Type> {
    match ty.kind {
        TypeKind::Object | TypeKind::Interface => ty.fields.get(name).map(|field| &field.ty),
        TypeKind::Union if ty.is_synthetic_union() => ty.fields.get(name).map(|field| &field.ty),
        _ => None,
    }
}

fn dangling_reference(fragment: &Fragment, field: String, type_name: Name) -> CompositionError {
    let coordinate = fragment
        .citations
        .first()
        .map(|(_, coordinate)| coordinate.clone())
        .unwrap_or_else(|| fragment.scope.to_string());
    CompositionError::DanglingFieldSetReference {
        coordinate,
        selection: fragment.field_set.to_string(),
        field,
        type_name,
        subgraphs: fragment
            .citations
            .iter()
            .map(|(graph, _)| graph)
            .unique()
            .map(ToString::to_string)
            .collect(),
    }
}

fn validate_field_ownership(schema: &MergedSchema, errors: &mut Vec<CompositionError>) {
    for ty in schema.types.values() {
        if !matches!(ty.kind, TypeKind::Object | TypeKind::Interface) {
            continue;
        }
        for field in ty.fields.values() {
            if !field.owners.is_empty() {
                continue;
            }
            errors.push(CompositionError::UnownedField {
                coordinate: format!("{}.{}", ty.name, field.name),
                subgraphs: field.declared_in.iter().map(ToString::to_string).collect(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::merge::merge_subgraphs;
    use crate::options::CompositionOptions;
    use crate::subgraph::SubgraphDefinition;
    use crate::subgraph::parse_subgraphs;

    fn validate_sdl(subgraphs: &[(&str, &str)]) -> Vec<CompositionError> {
        let definitions: Vec<_> = subgraphs
            .iter()
            .map(|(name, sdl)| SubgraphDefinition::new(*name, format!("https://{name}"), *sdl))
            .collect();
        let subgraphs = parse_subgraphs(&definitions).unwrap();
        let merged = merge_subgraphs(&subgraphs, &CompositionOptions::default()).unwrap();
        validate(&merged).err().unwrap_or_default()
    }

    fn codes(errors: &[CompositionError]) -> Vec<&'static str> {
        errors.iter().map(CompositionError::code).collect()
    }

    #[test]
    fn reports_kind_conflicts_with_every_subgraph() {
        let errors = validate_sdl(&[
            ("a", "type Query { foo: Foo } type Foo { id: ID }"),
            ("b", "type Query { bar: Int } input Foo { id: ID }"),
        ]);
        assert_eq!(codes(&errors), vec!["TYPE_KIND_CONFLICT"]);
        assert_eq!(errors[0].subgraphs(), vec!["a", "b"]);
        assert!(errors[0].to_string().contains("\"Foo\""));
    }

    #[test]
    fn reports_missing_interface_fields() {
        let errors = validate_sdl(&[
            ("a", "type Query { node: Node } interface Node { id: ID! }"),
            ("b", "type Query { user: User } interface Node { name: String } type User implements Node { id: ID! }"),
        ]);
        assert_eq!(
            errors,
            vec![CompositionError::MissingInterfaceField {
                type_name: apollo_compiler::name!("User"),
                interface: apollo_compiler::name!("Node"),
                field: apollo_compiler::name!("name"),
                subgraphs: vec!["b".to_owned()],
            }]
        );
    }

    #[test]
    fn reports_dangling_nested_selections() {
        let errors = validate_sdl(&[(
            "a",
            r#"
            type Query { review: Review }
            type Review { author: User @provides(fields: "name { middle }") }
            type User { name: Name }
            type Name { first: String }
            "#,
        )]);
        assert_eq!(codes(&errors), vec!["DANGLING_FIELD_SET_REFERENCE"]);
        let CompositionError::DanglingFieldSetReference {
            coordinate,
            field,
            type_name,
            ..
        } = &errors[0]
        else {
            unreachable!()
        };
        assert_eq!(coordinate, "Review.author");
        assert_eq!(field, "name.middle");
        assert_eq!(type_name.as_str(), "Name");
    }

    #[test]
    fn rejects_selections_below_leaf_fields() {
        let errors = validate_sdl(&[(
            "a",
            r#"
            type Query { book: Book }
            type Book @key(fields: "isbn { value }") { isbn: String! }
            "#,
        )]);
        assert_eq!(codes(&errors), vec!["DANGLING_FIELD_SET_REFERENCE"]);
    }

    #[test]
    fn accepts_typename_and_external_key_fields() {
        let errors = validate_sdl(&[
            ("a", r#"type Query { me: User } type User @key(fields: "id") { id: ID! }"#),
            (
                "b",
                r#"
                extend type User @key(fields: "id __typename") {
                  id: ID! @external
                  reviews: [String]
                }
                "#,
            ),
        ]);
        assert_eq!(errors, vec![]);
    }

    #[test]
    fn reports_fields_nobody_resolves() {
        let errors = validate_sdl(&[(
            "a",
            r#"
            type Query { me: User }
            extend type User @key(fields: "id") { id: ID! @external }
            "#,
        )]);
        assert_eq!(
            errors,
            vec![CompositionError::UnownedField {
                coordinate: "User.id".to_owned(),
                subgraphs: vec!["a".to_owned()],
            }]
        );
    }
}
