use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Display;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveLocation;
use apollo_compiler::ast::Type;
use apollo_compiler::name;
use apollo_compiler::schema::ExtendedType;
use serde::Deserialize;
use serde::Serialize;

use crate::error::CompositionError;

/// A subgraph as handed to composition: its name, the URL the router reaches it at, and its
/// schema definition language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphDefinition {
    pub name: String,
    pub url: String,
    pub type_defs: String,
}

impl SubgraphDefinition {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        type_defs: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            type_defs: type_defs.into(),
        }
    }
}

/// The `join__Graph` value standing for one subgraph, identified by its position in the input
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphRef {
    index: usize,
    name: Name,
}

impl GraphRef {
    pub fn name(&self) -> &Name {
        &self.name
    }
}

impl Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub(crate) const KEY_DIRECTIVE_NAME: Name = name!("key");
pub(crate) const REQUIRES_DIRECTIVE_NAME: Name = name!("requires");
pub(crate) const PROVIDES_DIRECTIVE_NAME: Name = name!("provides");
pub(crate) const EXTERNAL_DIRECTIVE_NAME: Name = name!("external");
pub(crate) const FIELDS_ARGUMENT_NAME: Name = name!("fields");

pub(crate) const ROOT_OPERATION_TYPES: [(&str, Name); 3] = [
    ("query", name!("Query")),
    ("mutation", name!("Mutation")),
    ("subscription", name!("Subscription")),
];

const FEDERATION_TYPES: [&str; 5] = ["_Any", "_Entity", "_Service", "_FieldSet", "FieldSet"];
const FEDERATION_TYPE_PREFIXES: [&str; 3] = ["federation__", "link__", "join__"];
const FEDERATION_ROOT_FIELDS: [&str; 2] = ["_service", "_entities"];
const BUILT_IN_DIRECTIVES: [&str; 5] = ["skip", "include", "deprecated", "specifiedBy", "oneOf"];

const EXECUTABLE_DIRECTIVE_LOCATIONS: [DirectiveLocation; 8] = [
    DirectiveLocation::Query,
    DirectiveLocation::Mutation,
    DirectiveLocation::Subscription,
    DirectiveLocation::Field,
    DirectiveLocation::FragmentDefinition,
    DirectiveLocation::FragmentSpread,
    DirectiveLocation::InlineFragment,
    DirectiveLocation::VariableDefinition,
];

/// A parsed subgraph. Root operation types are seen under their default names, whatever the
/// subgraph called them.
pub(crate) struct Subgraph {
    pub(crate) graph: GraphRef,
    pub(crate) url: String,
    pub(crate) schema: Schema,
    root_renames: HashMap<Name, Name>,
}

impl Subgraph {
    fn parse(graph: GraphRef, definition: &SubgraphDefinition) -> Result<Self, CompositionError> {
        let schema = Schema::builder()
            .adopt_orphan_extensions()
            .parse(
                definition.type_defs.as_str(),
                format!("{}.graphql", definition.name),
            )
            .build()
            .map_err(|err| CompositionError::InvalidSubgraph {
                subgraph: definition.name.clone(),
                message: err.errors.to_string(),
            })?;

        let schema_definition = &schema.schema_definition;
        let declared_roots = [
            &schema_definition.query,
            &schema_definition.mutation,
            &schema_definition.subscription,
        ];
        let root_renames = declared_roots
            .into_iter()
            .zip(ROOT_OPERATION_TYPES)
            .filter_map(|(declared, (_, default_name))| {
                let declared = declared.as_ref()?;
                (declared.name != default_name).then(|| (declared.name.clone(), default_name))
            })
            .collect();

        Ok(Self {
            graph,
            url: definition.url.clone(),
            schema,
            root_renames,
        })
    }

    pub(crate) fn name(&self) -> &str {
        self.graph.name.as_str()
    }

    /// The name a type of this subgraph is merged under.
    pub(crate) fn type_name(&self, name: &Name) -> Name {
        self.root_renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.clone())
    }

    pub(crate) fn rename_type(&self, ty: &Type) -> Type {
        match ty {
            Type::Named(name) => Type::Named(self.type_name(name)),
            Type::NonNullNamed(name) => Type::NonNullNamed(self.type_name(name)),
            Type::List(inner) => Type::List(Box::new(self.rename_type(inner))),
            Type::NonNullList(inner) => Type::NonNullList(Box::new(self.rename_type(inner))),
        }
    }

    /// User-defined types, in authored order, under their merged names.
    pub(crate) fn types(&self) -> impl Iterator<Item = (Name, &ExtendedType)> {
        self.schema
            .types
            .iter()
            .filter(|(name, ty)| !ty.is_built_in() && is_mergeable_type(name))
            .map(|(name, ty)| (self.type_name(name), ty))
    }

    /// The root operations this subgraph contributes to, by their operation keyword.
    pub(crate) fn root_operations(&self) -> impl Iterator<Item = &'static str> {
        let schema_definition = &self.schema.schema_definition;
        let declared_roots = [
            schema_definition.query.is_some(),
            schema_definition.mutation.is_some(),
            schema_definition.subscription.is_some(),
        ];
        declared_roots
            .into_iter()
            .zip(ROOT_OPERATION_TYPES)
            .filter(|(declared, (_, default_name))| {
                *declared || self.schema.types.contains_key(default_name)
            })
            .map(|(_, (operation, _))| operation)
    }

    pub(crate) fn executable_directives(&self) -> impl Iterator<Item = &Node<DirectiveDefinition>> {
        self.schema
            .directive_definitions
            .values()
            .filter(|directive| is_executable_directive(directive))
    }
}

pub(crate) fn is_federation_root_field(field_name: &str) -> bool {
    FEDERATION_ROOT_FIELDS.contains(&field_name)
}

fn is_mergeable_type(type_name: &str) -> bool {
    if FEDERATION_TYPE_PREFIXES
        .iter()
        .any(|prefix| type_name.starts_with(prefix))
    {
        return false;
    }
    !FEDERATION_TYPES.contains(&type_name)
}

fn is_executable_directive(directive: &DirectiveDefinition) -> bool {
    !BUILT_IN_DIRECTIVES.contains(&directive.name.as_str())
        && directive
            .locations
            .iter()
            .any(|loc| EXECUTABLE_DIRECTIVE_LOCATIONS.contains(loc))
}

/// The raw `fields` argument of a `@key`, `@requires` or `@provides` application.
pub(crate) fn fields_argument(directive: &Directive) -> Option<&str> {
    directive
        .specified_argument_by_name(&FIELDS_ARGUMENT_NAME)
        .and_then(|value| value.as_str())
}

fn graph_name(name: &str) -> Option<Name> {
    if matches!(name, "true" | "false" | "null") {
        return None;
    }
    Name::new(name).ok()
}

/// Parses every subgraph, assigning graph references in input order. All problems are reported
/// together.
pub(crate) fn parse_subgraphs(
    definitions: &[SubgraphDefinition],
) -> Result<Vec<Subgraph>, Vec<CompositionError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut subgraphs = Vec::with_capacity(definitions.len());
    for (index, definition) in definitions.iter().enumerate() {
        let Some(name) = graph_name(&definition.name) else {
            errors.push(CompositionError::InvalidGraphName {
                subgraph: definition.name.clone(),
            });
            continue;
        };
        if !seen.insert(name.clone()) {
            errors.push(CompositionError::DuplicateSubgraphName {
                subgraph: definition.name.clone(),
            });
            continue;
        }
        match Subgraph::parse(GraphRef { index, name }, definition) {
            Ok(subgraph) => subgraphs.push(subgraph),
            Err(err) => errors.push(err),
        }
    }
    if errors.is_empty() {
        Ok(subgraphs)
    } else {
        Err(errors)
    }
}
