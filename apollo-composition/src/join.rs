//! Builds the supergraph document: the join directive declarations, the `join__Graph` registry
//! and every merged type annotated with the subgraphs that resolve it.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::Argument;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::name;
use apollo_compiler::ty;
use itertools::Itertools;

use crate::field_set::FieldSet;
use crate::merge::Deprecated;
use crate::merge::EnumValueDescriptor;
use crate::merge::FieldDescriptor;
use crate::merge::MergedSchema;
use crate::merge::TypeDescriptor;
use crate::merge::TypeKind;
use crate::merge::TypeVariant;
use crate::options::CompositionOptions;
use crate::subgraph::GraphRef;

pub(crate) const JOIN_SPEC_URL: &str = "https://lib.apollo.dev/join/v0.1";
pub(crate) const LOCAL_SPEC_URL: &str = "https://lib.apollo.dev/local/v0.1";

const USING_DIRECTIVE_NAME: Name = name!("using");
const JOIN_DIRECTIVE_NAME: Name = name!("join");
const JOIN_KEY_DIRECTIVE_NAME: Name = name!("join__key");
const JOIN_ERROR_DIRECTIVE_NAME: Name = name!("join__error");
const JOIN_LINK_DIRECTIVE_NAME: Name = name!("join__link");
const GRAPH_ENUM_NAME: Name = name!("join__Graph");

/// The supergraph, ready to print.
#[derive(Debug)]
pub(crate) struct ComposedDocument {
    pub(crate) schema_directives: DirectiveList,
    pub(crate) root_operations: Vec<(&'static str, Name)>,
    pub(crate) definitions: Vec<ComposedDefinition>,
}

#[derive(Debug)]
pub(crate) enum ComposedDefinition {
    Directive(Node<DirectiveDefinition>),
    Type(ComposedType),
}

#[derive(Debug)]
pub(crate) struct ComposedType {
    pub(crate) description: Option<String>,
    pub(crate) kind: TypeKind,
    pub(crate) name: Name,
    pub(crate) implements: Vec<Name>,
    pub(crate) directives: DirectiveList,
    pub(crate) body: TypeBody,
    pub(crate) fragments: Vec<ComposedFragment>,
}

#[derive(Debug)]
pub(crate) enum TypeBody {
    Empty,
    Fields(Vec<ComposedField>),
    Members(Vec<Name>),
    Values(Vec<ComposedEnumValue>),
}

/// A field or input field.
#[derive(Debug)]
pub(crate) struct ComposedField {
    pub(crate) description: Option<String>,
    pub(crate) name: Name,
    pub(crate) arguments: Vec<Node<InputValueDefinition>>,
    pub(crate) ty: Type,
    pub(crate) default_value: Option<Node<Value>>,
    pub(crate) directives: DirectiveList,
}

#[derive(Debug)]
pub(crate) struct ComposedEnumValue {
    pub(crate) description: Option<String>,
    pub(crate) name: Name,
    pub(crate) directives: DirectiveList,
}

#[derive(Debug)]
pub(crate) struct ComposedFragment {
    pub(crate) name: String,
    pub(crate) type_condition: Name,
    pub(crate) directives: DirectiveList,
    pub(crate) selection: FieldSet,
}

/// Annotates a validated merge result with join directives.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn synthesize(schema: &MergedSchema, options: &CompositionOptions) -> ComposedDocument {
    let mut definitions = supporting_definitions();
    definitions.push(ComposedDefinition::Type(join_graph_enum_type(&schema.graphs)));
    definitions.extend(
        schema
            .directive_definitions
            .values()
            .map(|definition| {
                ComposedDefinition::Directive(retained_directive(definition, options))
            }),
    );
    definitions.extend(
        schema
            .types
            .values()
            .map(|ty| ComposedDefinition::Type(composed_type(ty, options))),
    );

    ComposedDocument {
        schema_directives: DirectiveList(vec![
            using_applied_directive(JOIN_SPEC_URL),
            using_applied_directive(LOCAL_SPEC_URL),
        ]),
        root_operations: schema.root_operations.clone(),
        definitions,
    }
}

fn composed_type(ty: &TypeDescriptor, options: &CompositionOptions) -> ComposedType {
    let body = match ty.kind {
        TypeKind::Scalar => TypeBody::Empty,
        TypeKind::Object | TypeKind::Interface | TypeKind::InputObject => TypeBody::Fields(
            ty.fields
                .values()
                .map(|field| composed_field(&ty.name, field, options))
                .collect(),
        ),
        TypeKind::Union => TypeBody::Members(ty.members.iter().cloned().collect()),
        TypeKind::Enum => TypeBody::Values(
            ty.values
                .values()
                .map(|value| composed_enum_value(value, options))
                .collect(),
        ),
    };

    ComposedType {
        description: description(&ty.description, options),
        kind: ty.kind,
        name: ty.name.clone(),
        implements: ty.implements.iter().cloned().collect(),
        directives: DirectiveList(ty.variants.iter().map(join_type_applied_directive).collect()),
        body,
        fragments: ty
            .fragments
            .iter()
            .sorted_by_key(|fragment| fragment.name.id)
            .map(|fragment| ComposedFragment {
                name: fragment.name.name.clone(),
                type_condition: fragment.scope.clone(),
                directives: DirectiveList(
                    fragment
                        .key_graphs()
                        .into_iter()
                        .map(|graph| graph_applied_directive(JOIN_KEY_DIRECTIVE_NAME, graph))
                        .collect(),
                ),
                selection: fragment.field_set.clone(),
            })
            .collect(),
    }
}

fn composed_field(
    type_name: &Name,
    field: &FieldDescriptor,
    options: &CompositionOptions,
) -> ComposedField {
    let mut directives: Vec<Node<Directive>> = field
        .owners
        .iter()
        .map(|owner| {
            let mut directive = graph_directive(JOIN_DIRECTIVE_NAME, &owner.graph);
            if let Some(requires) = &owner.requires {
                push_string_argument(&mut directive, name!("requires"), requires);
            }
            if let Some(provides) = &owner.provides {
                push_string_argument(&mut directive, name!("provides"), provides);
            }
            Node::new(directive)
        })
        .collect();
    if !field.divergent.is_empty() {
        directives.push(join_error_applied_directive(type_name, field));
    }
    directives.extend(field.deprecated.as_ref().map(deprecated_applied_directive));

    ComposedField {
        description: description(&field.description, options),
        name: field.name.clone(),
        arguments: field
            .arguments
            .iter()
            .map(|argument| retained_argument(argument, options))
            .collect(),
        ty: field.ty.clone(),
        default_value: field.default_value.clone(),
        directives: DirectiveList(directives),
    }
}

fn composed_enum_value(
    value: &EnumValueDescriptor,
    options: &CompositionOptions,
) -> ComposedEnumValue {
    let mut directives: Vec<Node<Directive>> = value
        .graphs
        .iter()
        .map(|graph| graph_applied_directive(JOIN_DIRECTIVE_NAME, graph))
        .collect();
    directives.extend(value.deprecated.as_ref().map(deprecated_applied_directive));
    ComposedEnumValue {
        description: description(&value.description, options),
        name: value.name.clone(),
        directives: DirectiveList(directives),
    }
}

fn retained_directive(
    definition: &Node<DirectiveDefinition>,
    options: &CompositionOptions,
) -> Node<DirectiveDefinition> {
    let mut definition = definition.clone();
    if !options.include_descriptions {
        let definition = definition.make_mut();
        definition.description = None;
        for argument in &mut definition.arguments {
            *argument = retained_argument(argument, options);
        }
    }
    definition
}

fn retained_argument(
    argument: &Node<InputValueDefinition>,
    options: &CompositionOptions,
) -> Node<InputValueDefinition> {
    let mut argument = argument.clone();
    if !options.include_descriptions && argument.description.is_some() {
        argument.make_mut().description = None;
    }
    argument
}

fn description(description: &Option<String>, options: &CompositionOptions) -> Option<String> {
    description
        .as_ref()
        .filter(|_| options.include_descriptions)
        .cloned()
}

fn graph_directive(name: Name, graph: &GraphRef) -> Directive {
    Directive {
        name,
        arguments: vec![Node::new(Argument {
            name: name!("graph"),
            value: Node::new(Value::Enum(graph.name().clone())),
        })],
    }
}

fn graph_applied_directive(name: Name, graph: &GraphRef) -> Node<Directive> {
    Node::new(graph_directive(name, graph))
}

fn push_string_argument(directive: &mut Directive, name: Name, value: &str) {
    directive.arguments.push(Node::new(Argument {
        name,
        value: Node::new(Value::String(value.to_owned())),
    }));
}

/// @join(graph: <graph>, type: "<type>", requires: "<fragment>")
fn join_type_applied_directive(variant: &TypeVariant) -> Node<Directive> {
    let mut directive = graph_directive(JOIN_DIRECTIVE_NAME, &variant.graph);
    push_string_argument(&mut directive, name!("type"), &variant.type_name);
    if let Some(requires) = &variant.requires {
        push_string_argument(&mut directive, name!("requires"), requires);
    }
    Node::new(directive)
}

/// @join__error(graph: [<graphs>], message: "<message>")
fn join_error_applied_directive(type_name: &Name, field: &FieldDescriptor) -> Node<Directive> {
    let kept = field
        .owners
        .first()
        .map(|owner| &owner.graph)
        .or_else(|| field.declared_in.first());
    let message = format!(
        "\"{type_name}.{}\" is declared differently in {}; the declaration of {} is used",
        field.name,
        field.divergent.iter().join(", "),
        kept.map(ToString::to_string).unwrap_or_default(),
    );
    Node::new(Directive {
        name: JOIN_ERROR_DIRECTIVE_NAME,
        arguments: vec![
            Node::new(Argument {
                name: name!("graph"),
                value: Node::new(Value::List(
                    field
                        .divergent
                        .iter()
                        .map(|graph| Node::new(Value::Enum(graph.name().clone())))
                        .collect(),
                )),
            }),
            Node::new(Argument {
                name: name!("message"),
                value: Node::new(Value::String(message)),
            }),
        ],
    })
}

fn deprecated_applied_directive(deprecated: &Deprecated) -> Node<Directive> {
    let mut directive = Directive {
        name: name!("deprecated"),
        arguments: Vec::new(),
    };
    if let Some(reason) = &deprecated.reason {
        push_string_argument(&mut directive, name!("reason"), reason);
    }
    Node::new(directive)
}

fn using_applied_directive(spec: &str) -> Node<Directive> {
    let mut directive = Directive {
        name: USING_DIRECTIVE_NAME,
        arguments: Vec::new(),
    };
    push_string_argument(&mut directive, name!("spec"), spec);
    Node::new(directive)
}

/// enum join__Graph, one value per subgraph in input order.
fn join_graph_enum_type(graphs: &[(GraphRef, String)]) -> ComposedType {
    let values = graphs
        .iter()
        .map(|(graph, url)| {
            // @join__link(to: {http: {url: "<url>"}})
            let link = Directive {
                name: JOIN_LINK_DIRECTIVE_NAME,
                arguments: vec![Node::new(Argument {
                    name: name!("to"),
                    value: Node::new(Value::Object(vec![(
                        name!("http"),
                        Node::new(Value::Object(vec![(
                            name!("url"),
                            Node::new(Value::String(url.clone())),
                        )])),
                    )])),
                })],
            };
            ComposedEnumValue {
                description: None,
                name: graph.name().clone(),
                directives: DirectiveList(vec![Node::new(link)]),
            }
        })
        .collect();
    ComposedType {
        description: None,
        kind: TypeKind::Enum,
        name: GRAPH_ENUM_NAME,
        implements: Vec::new(),
        directives: DirectiveList::default(),
        body: TypeBody::Values(values),
        fragments: Vec::new(),
    }
}

fn supporting_definitions() -> Vec<ComposedDefinition> {
    vec![
        ComposedDefinition::Directive(Node::new(using_directive_definition())),
        ComposedDefinition::Type(specified_scalar(
            name!("join__FragmentId"),
            "https://lib.apollo.dev/join/v0.1/#join__fragmentid",
        )),
        ComposedDefinition::Type(specified_scalar(
            name!("join__Url"),
            "https://lib.apollo.dev/join/v0.1/#join__url",
        )),
        ComposedDefinition::Type(input_object(
            name!("join__OutboundLinkHttp"),
            name!("url"),
            ty!(join__Url!),
        )),
        ComposedDefinition::Type(input_object(
            name!("join__OutboundLink"),
            name!("http"),
            ty!(join__OutboundLinkHttp),
        )),
        ComposedDefinition::Directive(Node::new(join_key_directive_definition())),
        ComposedDefinition::Directive(Node::new(join_directive_definition())),
        ComposedDefinition::Directive(Node::new(join_error_directive_definition())),
        ComposedDefinition::Directive(Node::new(join_link_directive_definition())),
    ]
}

fn argument_definition(name: Name, ty: Type) -> Node<InputValueDefinition> {
    Node::new(InputValueDefinition {
        description: None,
        name,
        ty: ty.into(),
        default_value: None,
        directives: Default::default(),
    })
}

/// scalar <name> @specifiedBy(url: "<url>")
fn specified_scalar(name: Name, url: &str) -> ComposedType {
    let mut specified_by = Directive {
        name: name!("specifiedBy"),
        arguments: Vec::new(),
    };
    push_string_argument(&mut specified_by, name!("url"), url);
    ComposedType {
        description: None,
        kind: TypeKind::Scalar,
        name,
        implements: Vec::new(),
        directives: DirectiveList(vec![Node::new(specified_by)]),
        body: TypeBody::Empty,
        fragments: Vec::new(),
    }
}

fn input_object(name: Name, field: Name, ty: Type) -> ComposedType {
    ComposedType {
        description: None,
        kind: TypeKind::InputObject,
        name,
        implements: Vec::new(),
        directives: DirectiveList::default(),
        body: TypeBody::Fields(vec![ComposedField {
            description: None,
            name: field,
            arguments: Vec::new(),
            ty,
            default_value: None,
            directives: DirectiveList::default(),
        }]),
        fragments: Vec::new(),
    }
}

/// directive @using(spec: String!, prefix: String) repeatable on SCHEMA
fn using_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        description: None,
        name: USING_DIRECTIVE_NAME,
        arguments: vec![
            argument_definition(name!("spec"), ty!(String!)),
            argument_definition(name!("prefix"), ty!(String)),
        ],
        repeatable: true,
        locations: vec![DirectiveLocation::Schema],
    }
}

/// directive @join__key(graph: join__Graph!) repeatable on FRAGMENT_DEFINITION
fn join_key_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        description: None,
        name: JOIN_KEY_DIRECTIVE_NAME,
        arguments: vec![argument_definition(name!("graph"), ty!(join__Graph!))],
        repeatable: true,
        locations: vec![DirectiveLocation::FragmentDefinition],
    }
}

/// directive @join(
///   graph: join__Graph!,
///   type: String,
///   requires: join__FragmentId,
///   provides: join__FragmentId
/// ) repeatable on OBJECT | INTERFACE | UNION | ENUM | INPUT_OBJECT | SCALAR | FIELD_DEFINITION
///   | INPUT_FIELD_DEFINITION | ENUM_VALUE
fn join_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        description: None,
        name: JOIN_DIRECTIVE_NAME,
        arguments: vec![
            argument_definition(name!("graph"), ty!(join__Graph!)),
            argument_definition(name!("type"), ty!(String)),
            argument_definition(name!("requires"), ty!(join__FragmentId)),
            argument_definition(name!("provides"), ty!(join__FragmentId)),
        ],
        repeatable: true,
        locations: vec![
            DirectiveLocation::Object,
            DirectiveLocation::Interface,
            DirectiveLocation::Union,
            DirectiveLocation::Enum,
            DirectiveLocation::InputObject,
            DirectiveLocation::Scalar,
            DirectiveLocation::FieldDefinition,
            DirectiveLocation::InputFieldDefinition,
            DirectiveLocation::EnumValue,
        ],
    }
}

/// directive @join__error(graph: [join__Graph!]!, message: String) repeatable on OBJECT
///   | INTERFACE | UNION | FIELD_DEFINITION | INPUT_FIELD_DEFINITION
fn join_error_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        description: None,
        name: JOIN_ERROR_DIRECTIVE_NAME,
        arguments: vec![
            argument_definition(name!("graph"), ty!([join__Graph!]!)),
            argument_definition(name!("message"), ty!(String)),
        ],
        repeatable: true,
        locations: vec![
            DirectiveLocation::Object,
            DirectiveLocation::Interface,
            DirectiveLocation::Union,
            DirectiveLocation::FieldDefinition,
            DirectiveLocation::InputFieldDefinition,
        ],
    }
}

/// directive @join__link(to: join__OutboundLink!) on ENUM_VALUE
fn join_link_directive_definition() -> DirectiveDefinition {
    DirectiveDefinition {
        description: None,
        name: JOIN_LINK_DIRECTIVE_NAME,
        arguments: vec![argument_definition(name!("to"), ty!(join__OutboundLink!))],
        repeatable: false,
        locations: vec![DirectiveLocation::EnumValue],
    }
}
