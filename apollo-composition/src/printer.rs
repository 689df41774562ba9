//! Serializes a [`ComposedDocument`].
//!
//! Every definition is separated from the next by one empty line. Types print their join
//! directives one per line below the type name, and the fragments they cite right after the type.

use std::fmt;
use std::fmt::Display;

use apollo_compiler::Node;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::Value;

use crate::display_helpers::State;
use crate::join::ComposedDefinition;
use crate::join::ComposedDocument;
use crate::join::ComposedEnumValue;
use crate::join::ComposedField;
use crate::join::ComposedFragment;
use crate::join::ComposedType;
use crate::join::TypeBody;

impl Display for ComposedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = &mut State::new(f);
        // A schema definition needs at least one root operation.
        let has_schema_definition = !self.root_operations.is_empty();
        if has_schema_definition {
            write_schema_definition(state, self)?;
        }
        for (i, definition) in self.definitions.iter().enumerate() {
            if i > 0 || has_schema_definition {
                state.blank_line()?;
            }
            match definition {
                ComposedDefinition::Directive(directive) => {
                    write_directive_definition(state, directive)?
                }
                ComposedDefinition::Type(ty) => write_type(state, ty)?,
            }
        }
        state.new_line()
    }
}

fn write_schema_definition(state: &mut State<'_, '_>, document: &ComposedDocument) -> fmt::Result {
    state.write("schema")?;
    write_directive_lines(state, &document.schema_directives)?;
    state.new_line()?;
    state.block(&document.root_operations, |state, (operation, name)| {
        write!(state, "{operation}: {name}")
    })
}

fn write_description(state: &mut State<'_, '_>, description: &Option<String>) -> fmt::Result {
    if let Some(description) = description {
        state.write(Value::String(description.clone()))?;
        state.new_line()?;
    }
    Ok(())
}

/// Writes each directive on its own line, one level deeper than the current line.
fn write_directive_lines(state: &mut State<'_, '_>, directives: &DirectiveList) -> fmt::Result {
    state.indent_no_new_line();
    for directive in directives.iter() {
        state.new_line()?;
        state.write(&**directive)?;
    }
    state.dedent_no_new_line();
    Ok(())
}

fn write_inline_directives(state: &mut State<'_, '_>, directives: &DirectiveList) -> fmt::Result {
    for directive in directives.iter() {
        write!(state, " {}", **directive)?;
    }
    Ok(())
}

fn write_arguments(
    state: &mut State<'_, '_>,
    arguments: &[Node<InputValueDefinition>],
) -> fmt::Result {
    if arguments.is_empty() {
        return Ok(());
    }
    state.write("(")?;
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            state.write(", ")?;
        }
        if let Some(description) = &argument.description {
            write!(state, "{} ", Value::String(String::from(&**description)))?;
        }
        write!(state, "{}: {}", argument.name, argument.ty)?;
        if let Some(default_value) = &argument.default_value {
            write!(state, " = {}", **default_value)?;
        }
        write_inline_directives(state, &argument.directives)?;
    }
    state.write(")")
}

fn write_directive_definition(
    state: &mut State<'_, '_>,
    directive: &DirectiveDefinition,
) -> fmt::Result {
    if let Some(description) = &directive.description {
        state.write(Value::String(String::from(&**description)))?;
        state.new_line()?;
    }
    write!(state, "directive @{}", directive.name)?;
    write_arguments(state, &directive.arguments)?;
    if directive.repeatable {
        state.write(" repeatable")?;
    }
    state.write(" on ")?;
    state.write_separated(
        directive.locations.iter().map(|location| location.name()),
        " | ",
    )
}

fn write_type(state: &mut State<'_, '_>, ty: &ComposedType) -> fmt::Result {
    write_description(state, &ty.description)?;
    write!(state, "{} {}", ty.kind.keyword(), ty.name)?;
    if !ty.implements.is_empty() {
        state.write(" implements ")?;
        state.write_separated(&ty.implements, " & ")?;
    }
    write_directive_lines(state, &ty.directives)?;

    match &ty.body {
        TypeBody::Empty => {}
        TypeBody::Fields(fields) if fields.is_empty() => {}
        TypeBody::Fields(fields) => {
            open_body(state, &ty.directives)?;
            state.block(fields, write_field)?;
        }
        TypeBody::Members(members) if members.is_empty() => {}
        TypeBody::Members(members) => {
            state.indent_no_new_line();
            state.new_line()?;
            state.write("= ")?;
            state.write_separated(members, " | ")?;
            state.dedent_no_new_line();
        }
        TypeBody::Values(values) if values.is_empty() => {}
        TypeBody::Values(values) => {
            open_body(state, &ty.directives)?;
            state.block(values, write_enum_value)?;
        }
    }

    if !ty.fragments.is_empty() {
        state.blank_line()?;
        write_fragment(state, &ty.fragments[0])?;
        for fragment in &ty.fragments[1..] {
            state.new_line()?;
            write_fragment(state, fragment)?;
        }
    }
    Ok(())
}

/// The opening brace goes on its own line when directives were written below the type name.
fn open_body(state: &mut State<'_, '_>, directives: &DirectiveList) -> fmt::Result {
    if directives.is_empty() {
        state.write(" ")
    } else {
        state.new_line()
    }
}

fn write_field(state: &mut State<'_, '_>, field: &ComposedField) -> fmt::Result {
    write_description(state, &field.description)?;
    state.write(&field.name)?;
    write_arguments(state, &field.arguments)?;
    write!(state, ": {}", field.ty)?;
    if let Some(default_value) = &field.default_value {
        write!(state, " = {}", **default_value)?;
    }
    write_inline_directives(state, &field.directives)
}

fn write_enum_value(state: &mut State<'_, '_>, value: &ComposedEnumValue) -> fmt::Result {
    write_description(state, &value.description)?;
    state.write(&value.name)?;
    write_inline_directives(state, &value.directives)
}

fn write_fragment(state: &mut State<'_, '_>, fragment: &ComposedFragment) -> fmt::Result {
    write!(state, "fragment {} on {}", fragment.name, fragment.type_condition)?;
    write_inline_directives(state, &fragment.directives)?;
    state.new_line()?;
    state.write(&fragment.selection)
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Name;
    use apollo_compiler::ast::Argument;
    use apollo_compiler::ast::Directive;
    use apollo_compiler::ast::Type;
    use apollo_compiler::name;

    use super::*;
    use crate::field_set::FieldSet;
    use crate::merge::TypeKind;

    fn join(graph: Name) -> Node<Directive> {
        Node::new(Directive {
            name: name!("join"),
            arguments: vec![Node::new(Argument {
                name: name!("graph"),
                value: Node::new(Value::Enum(graph)),
            })],
        })
    }

    fn document(definitions: Vec<ComposedDefinition>) -> ComposedDocument {
        ComposedDocument {
            schema_directives: DirectiveList::default(),
            root_operations: vec![("query", name!("Query"))],
            definitions,
        }
    }

    #[test]
    fn prints_types_followed_by_their_fragments() {
        let book = ComposedType {
            description: Some("A book".to_owned()),
            kind: TypeKind::Object,
            name: name!("Book"),
            implements: vec![name!("Product"), name!("Node")],
            directives: DirectiveList(vec![join(name!("books"))]),
            body: TypeBody::Fields(vec![ComposedField {
                description: None,
                name: name!("isbn"),
                arguments: Vec::new(),
                ty: Type::Named(name!("String")).non_null(),
                default_value: None,
                directives: DirectiveList(vec![join(name!("books"))]),
            }]),
            fragments: vec![
                ComposedFragment {
                    name: "local__id_0_Book_isbn".to_owned(),
                    type_condition: name!("Book"),
                    directives: DirectiveList::default(),
                    selection: FieldSet::parse("isbn").unwrap(),
                },
                ComposedFragment {
                    name: "local__id_1_Book_title".to_owned(),
                    type_condition: name!("Book"),
                    directives: DirectiveList::default(),
                    selection: FieldSet::parse("title").unwrap(),
                },
            ],
        };
        let printed = document(vec![ComposedDefinition::Type(book)]).to_string();
        insta::assert_snapshot!(printed, @r#"
        schema
        {
          query: Query
        }

        "A book"
        type Book implements Product & Node
          @join(graph: books)
        {
          isbn: String! @join(graph: books)
        }

        fragment local__id_0_Book_isbn on Book
        { isbn }
        fragment local__id_1_Book_title on Book
        { title }
        "#);
    }

    #[test]
    fn prints_unions_and_bare_types() {
        let union = ComposedType {
            description: None,
            kind: TypeKind::Union,
            name: name!("Thing"),
            implements: Vec::new(),
            directives: DirectiveList(vec![join(name!("product"))]),
            body: TypeBody::Members(vec![name!("Car"), name!("Ikea")]),
            fragments: Vec::new(),
        };
        let input = ComposedType {
            description: None,
            kind: TypeKind::InputObject,
            name: name!("Filter"),
            implements: Vec::new(),
            directives: DirectiveList::default(),
            body: TypeBody::Fields(vec![ComposedField {
                description: None,
                name: name!("exact"),
                arguments: Vec::new(),
                ty: Type::Named(name!("Boolean")),
                default_value: Some(Node::new(Value::Boolean(true))),
                directives: DirectiveList::default(),
            }]),
            fragments: Vec::new(),
        };
        let printed = document(vec![
            ComposedDefinition::Type(union),
            ComposedDefinition::Type(input),
        ])
        .to_string();
        insta::assert_snapshot!(printed, @r#"
        schema
        {
          query: Query
        }

        union Thing
          @join(graph: product)
          = Car | Ikea

        input Filter {
          exact: Boolean = true
        }
        "#);
    }
}
