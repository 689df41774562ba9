use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast::DirectiveDefinition;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::InputValueDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use indexmap::map::Entry;

use crate::error::CompositionError;
use crate::field_set::FieldSet;
use crate::field_set::Fragment;
use crate::field_set::FragmentIds;
use crate::field_set::FragmentUsage;
use crate::hints::CompositionHint;
use crate::hints::HintCode;
use crate::options::CompositionOptions;
use crate::options::FragmentReuse;
use crate::options::InterfaceDivergence;
use crate::subgraph::EXTERNAL_DIRECTIVE_NAME;
use crate::subgraph::GraphRef;
use crate::subgraph::KEY_DIRECTIVE_NAME;
use crate::subgraph::PROVIDES_DIRECTIVE_NAME;
use crate::subgraph::REQUIRES_DIRECTIVE_NAME;
use crate::subgraph::ROOT_OPERATION_TYPES;
use crate::subgraph::Subgraph;
use crate::subgraph::fields_argument;
use crate::subgraph::is_federation_root_field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TypeKind {
    #[strum(to_string = "scalar type")]
    Scalar,
    #[strum(to_string = "object type")]
    Object,
    #[strum(to_string = "interface type")]
    Interface,
    #[strum(to_string = "union type")]
    Union,
    #[strum(to_string = "enum type")]
    Enum,
    #[strum(to_string = "input object type")]
    InputObject,
}

impl TypeKind {
    fn of(ty: &ExtendedType) -> Self {
        match ty {
            ExtendedType::Scalar(_) => Self::Scalar,
            ExtendedType::Object(_) => Self::Object,
            ExtendedType::Interface(_) => Self::Interface,
            ExtendedType::Union(_) => Self::Union,
            ExtendedType::Enum(_) => Self::Enum,
            ExtendedType::InputObject(_) => Self::InputObject,
        }
    }

    pub(crate) const fn keyword(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Object => "type",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::InputObject => "input",
        }
    }

    const fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::Union)
    }
}

/// A key of a type in one subgraph, with the fragment it was given.
#[derive(Debug, Clone)]
pub(crate) struct KeyUse {
    pub(crate) field_set: FieldSet,
    pub(crate) fragment: String,
}

/// What one subgraph declared for a type.
#[derive(Debug, Clone)]
pub(crate) struct Contribution {
    pub(crate) graph: GraphRef,
    pub(crate) kind: TypeKind,
    pub(crate) keys: Vec<KeyUse>,
    pub(crate) implements: Vec<Name>,
}

impl Contribution {
    fn new(graph: &GraphRef, kind: TypeKind) -> Self {
        Self {
            graph: graph.clone(),
            kind,
            keys: Vec::new(),
            implements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Deprecated {
    pub(crate) reason: Option<String>,
}

impl Deprecated {
    fn of(directives: &DirectiveList) -> Option<Self> {
        directives.get("deprecated").map(|directive| Self {
            reason: directive
                .specified_argument_by_name("reason")
                .and_then(|value| value.as_str())
                .map(str::to_owned),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FieldOwner {
    pub(crate) graph: GraphRef,
    pub(crate) requires: Option<String>,
    pub(crate) provides: Option<String>,
}

/// A field (or input field) of a merged type.
#[derive(Debug, Clone)]
pub(crate) struct FieldDescriptor {
    pub(crate) name: Name,
    pub(crate) description: Option<String>,
    pub(crate) ty: Type,
    pub(crate) arguments: Vec<Node<InputValueDefinition>>,
    pub(crate) default_value: Option<Node<Value>>,
    pub(crate) deprecated: Option<Deprecated>,
    pub(crate) owners: Vec<FieldOwner>,
    /// Every subgraph declaring the field, owners or not.
    pub(crate) declared_in: Vec<GraphRef>,
    /// Subgraphs whose declaration differs from the one retained.
    pub(crate) divergent: Vec<GraphRef>,
}

impl FieldDescriptor {
    fn from_field(field: &FieldDefinition, ty: Type) -> Self {
        Self {
            name: field.name.clone(),
            description: field.description.as_ref().map(|d| String::from(&**d)),
            ty,
            arguments: field.arguments.clone(),
            default_value: None,
            deprecated: Deprecated::of(&field.directives),
            owners: Vec::new(),
            declared_in: Vec::new(),
            divergent: Vec::new(),
        }
    }

    fn from_input_field(field: &InputValueDefinition) -> Self {
        Self {
            name: field.name.clone(),
            description: field.description.as_ref().map(|d| String::from(&**d)),
            ty: (*field.ty).clone(),
            arguments: Vec::new(),
            default_value: field.default_value.clone(),
            deprecated: Deprecated::of(&field.directives),
            owners: Vec::new(),
            declared_in: Vec::new(),
            divergent: Vec::new(),
        }
    }

    fn has_shape(&self, ty: &Type, arguments: &[Node<InputValueDefinition>]) -> bool {
        self.ty == *ty
            && self.arguments.len() == arguments.len()
            && self.arguments.iter().zip(arguments).all(|(a, b)| {
                a.name == b.name && a.ty == b.ty && a.default_value == b.default_value
            })
    }

    fn owner(graph: &GraphRef) -> FieldOwner {
        FieldOwner {
            graph: graph.clone(),
            requires: None,
            provides: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EnumValueDescriptor {
    pub(crate) name: Name,
    pub(crate) description: Option<String>,
    pub(crate) deprecated: Option<Deprecated>,
    pub(crate) graphs: Vec<GraphRef>,
}

/// One type-level ownership record: `graph` can resolve `type_name` (the type itself, or one of
/// the concrete types of an abstract type), fetching it through the `requires` fragment if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeVariant {
    pub(crate) graph: GraphRef,
    pub(crate) type_name: Name,
    pub(crate) requires: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct TypeDescriptor {
    pub(crate) name: Name,
    /// The merged kind. Only differs from the declared kind for interfaces emitted as unions.
    pub(crate) kind: TypeKind,
    pub(crate) description: Option<String>,
    pub(crate) contributions: Vec<Contribution>,
    pub(crate) implements: IndexSet<Name>,
    pub(crate) fields: IndexMap<Name, FieldDescriptor>,
    pub(crate) members: IndexSet<Name>,
    pub(crate) values: IndexMap<Name, EnumValueDescriptor>,
    pub(crate) variants: Vec<TypeVariant>,
    pub(crate) fragments: Vec<Fragment>,
}

impl TypeDescriptor {
    fn new(name: Name, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            description: None,
            contributions: Vec::new(),
            implements: IndexSet::default(),
            fields: IndexMap::default(),
            members: IndexSet::default(),
            values: IndexMap::default(),
            variants: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// The kind of the first declaration, which every other declaration must agree with.
    pub(crate) fn declared_kind(&self) -> TypeKind {
        self.contributions
            .first()
            .map_or(self.kind, |contribution| contribution.kind)
    }

    /// An interface emitted as a union. It keeps the merged interface fields so that field sets
    /// selecting through it still resolve, but they are not printed.
    pub(crate) fn is_synthetic_union(&self) -> bool {
        self.kind == TypeKind::Union && self.declared_kind() == TypeKind::Interface
    }

    /// The declaration of this type by `graph`, ignoring declarations of a conflicting kind.
    pub(crate) fn contribution_from(&self, graph: &GraphRef) -> Option<&Contribution> {
        let kind = self.declared_kind();
        self.contributions
            .iter()
            .find(|contribution| contribution.graph == *graph && contribution.kind == kind)
    }

    #[allow(clippy::too_many_arguments)]
    fn fragment_for(
        &mut self,
        usage: FragmentUsage,
        target: &Name,
        field_set: FieldSet,
        graph: &GraphRef,
        coordinate: String,
        reuse: bool,
        ids: FragmentIds,
    ) -> (String, FragmentIds) {
        if reuse {
            if let Some(fragment) = self
                .fragments
                .iter_mut()
                .find(|fragment| fragment.is_reusable_for(usage, target, &field_set))
            {
                fragment.cite(graph, coordinate);
                return (fragment.name.name.clone(), ids);
            }
        }
        let (name, ids) = ids.mint(&self.name, &field_set);
        tracing::trace!(fragment = %name.name, %coordinate, "minted field set fragment");
        self.fragments.push(Fragment {
            name: name.clone(),
            scope: self.name.clone(),
            target: target.clone(),
            usage,
            field_set,
            citations: vec![(graph.clone(), coordinate)],
        });
        (name.name, ids)
    }
}

/// The result of merging every subgraph, before validation.
#[derive(Debug)]
pub(crate) struct MergedSchema {
    pub(crate) graphs: Vec<(GraphRef, String)>,
    pub(crate) root_operations: Vec<(&'static str, Name)>,
    pub(crate) types: IndexMap<Name, TypeDescriptor>,
    pub(crate) directive_definitions: IndexMap<Name, Node<DirectiveDefinition>>,
    pub(crate) hints: Vec<CompositionHint>,
}

#[derive(Default)]
struct Diagnostics {
    errors: Vec<CompositionError>,
    hints: Vec<CompositionHint>,
}

impl Diagnostics {
    fn malformed_selection(
        &mut self,
        subgraph: &Subgraph,
        coordinate: &str,
        directive: &Name,
        selection: Option<&str>,
        message: String,
    ) {
        self.errors.push(CompositionError::MalformedSelection {
            subgraph: subgraph.name().to_owned(),
            coordinate: coordinate.to_owned(),
            selection: selection.unwrap_or_default().to_owned(),
            message: format!("@{directive}: {message}"),
        });
    }

    /// Parses the `fields` argument of a federation directive, recording an error if it is
    /// missing or malformed.
    fn field_set(
        &mut self,
        subgraph: &Subgraph,
        coordinate: &str,
        directive: &apollo_compiler::ast::Directive,
    ) -> Option<FieldSet> {
        let Some(fields) = fields_argument(directive) else {
            self.malformed_selection(
                subgraph,
                coordinate,
                &directive.name,
                None,
                "missing string argument \"fields\"".to_owned(),
            );
            return None;
        };
        match FieldSet::parse(fields) {
            Ok(field_set) => Some(field_set),
            Err(err) => {
                self.malformed_selection(
                    subgraph,
                    coordinate,
                    &directive.name,
                    Some(fields),
                    err.message,
                );
                None
            }
        }
    }

    fn merge_description(
        &mut self,
        coordinate: &str,
        merged: &mut Option<String>,
        new: Option<&Node<str>>,
    ) {
        let Some(new) = new else {
            return;
        };
        match merged {
            None => *merged = Some(String::from(&**new)),
            Some(existing) if existing.as_str() != &**new => {
                self.hints.push(CompositionHint::new(
                    HintCode::InconsistentDescription,
                    format!("\"{coordinate}\" has different descriptions across subgraphs; keeping the first one"),
                ));
            }
            Some(_) => {}
        }
    }
}

struct Merger<'a> {
    options: &'a CompositionOptions,
    types: IndexMap<Name, TypeDescriptor>,
    directive_definitions: IndexMap<Name, Node<DirectiveDefinition>>,
    root_operations: IndexSet<&'static str>,
    diagnostics: Diagnostics,
}

/// Merges the subgraphs, in input order, into one type map.
///
/// Field sets are extracted along the way; if any of them is malformed the merge fails with every
/// such error.
#[tracing::instrument(level = "trace", skip_all)]
pub(crate) fn merge_subgraphs(
    subgraphs: &[Subgraph],
    options: &CompositionOptions,
) -> Result<MergedSchema, Vec<CompositionError>> {
    let mut merger = Merger {
        options,
        types: IndexMap::default(),
        directive_definitions: IndexMap::default(),
        root_operations: IndexSet::default(),
        diagnostics: Diagnostics::default(),
    };
    let ids = subgraphs
        .iter()
        .fold(FragmentIds::default(), |ids, subgraph| {
            merger.merge_subgraph(subgraph, ids)
        });
    merger.merge_abstract_types(subgraphs, ids);

    let Merger {
        types,
        directive_definitions,
        root_operations,
        diagnostics,
        ..
    } = merger;
    if !diagnostics.errors.is_empty() {
        return Err(diagnostics.errors);
    }
    tracing::debug!(
        types = types.len(),
        hints = diagnostics.hints.len(),
        "merged subgraphs"
    );
    Ok(MergedSchema {
        graphs: subgraphs
            .iter()
            .map(|subgraph| (subgraph.graph.clone(), subgraph.url.clone()))
            .collect(),
        root_operations: ROOT_OPERATION_TYPES
            .into_iter()
            .filter(|(operation, _)| root_operations.contains(operation))
            .collect(),
        types,
        directive_definitions,
        hints: diagnostics.hints,
    })
}

impl Merger<'_> {
    fn merge_subgraph(&mut self, subgraph: &Subgraph, mut ids: FragmentIds) -> FragmentIds {
        tracing::trace!(subgraph = subgraph.name(), "merging subgraph");
        self.root_operations.extend(subgraph.root_operations());

        for (type_name, ty) in subgraph.types() {
            ids = self.merge_type(subgraph, type_name, ty, ids);
        }

        for directive in subgraph.executable_directives() {
            self.directive_definitions
                .entry(directive.name.clone())
                .or_insert_with(|| directive.clone());
        }
        ids
    }

    fn merge_type(
        &mut self,
        subgraph: &Subgraph,
        type_name: Name,
        ty: &ExtendedType,
        ids: FragmentIds,
    ) -> FragmentIds {
        let kind = TypeKind::of(ty);
        let descriptor = self
            .types
            .entry(type_name.clone())
            .or_insert_with(|| TypeDescriptor::new(type_name, kind));
        if descriptor.declared_kind() != kind {
            // Kept for the validator to report, but not merged.
            descriptor
                .contributions
                .push(Contribution::new(&subgraph.graph, kind));
            return ids;
        }

        let diagnostics = &mut self.diagnostics;
        let reuse = self.options.fragment_reuse == FragmentReuse::PerType;
        let coordinate = descriptor.name.to_string();
        diagnostics.merge_description(
            &coordinate,
            &mut descriptor.description,
            ty.description(),
        );

        let mut contribution = Contribution::new(&subgraph.graph, kind);
        let ids = match ty {
            ExtendedType::Object(object) => {
                let ids = merge_keys(
                    descriptor,
                    &mut contribution,
                    subgraph,
                    object.directives.get_all(&KEY_DIRECTIVE_NAME),
                    diagnostics,
                    ids,
                );
                merge_implements(descriptor, &mut contribution, &object.implements_interfaces);
                merge_fields(
                    descriptor,
                    subgraph,
                    &object.fields,
                    diagnostics,
                    reuse,
                    ids,
                )
            }
            ExtendedType::Interface(interface) => {
                let ids = merge_keys(
                    descriptor,
                    &mut contribution,
                    subgraph,
                    interface.directives.get_all(&KEY_DIRECTIVE_NAME),
                    diagnostics,
                    ids,
                );
                merge_implements(
                    descriptor,
                    &mut contribution,
                    &interface.implements_interfaces,
                );
                merge_fields(
                    descriptor,
                    subgraph,
                    &interface.fields,
                    diagnostics,
                    reuse,
                    ids,
                )
            }
            ExtendedType::Union(union) => {
                for member in &union.members {
                    let member = subgraph.type_name(&member.name);
                    descriptor.members.insert(member.clone());
                }
                ids
            }
            ExtendedType::Enum(enum_type) => {
                for (value_name, value) in &enum_type.values {
                    let merged = descriptor
                        .values
                        .entry(value_name.clone())
                        .or_insert_with(|| EnumValueDescriptor {
                            name: value_name.clone(),
                            description: None,
                            deprecated: Deprecated::of(&value.directives),
                            graphs: Vec::new(),
                        });
                    diagnostics.merge_description(
                        &format!("{}.{value_name}", descriptor.name),
                        &mut merged.description,
                        value.description.as_ref(),
                    );
                    merged.graphs.push(subgraph.graph.clone());
                }
                ids
            }
            ExtendedType::InputObject(input) => {
                for (field_name, field) in &input.fields {
                    let coordinate = format!("{}.{field_name}", descriptor.name);
                    let merged = match descriptor.fields.entry(field_name.clone()) {
                        Entry::Occupied(entry) => {
                            let merged = entry.into_mut();
                            if merged.ty != *field.ty || merged.default_value != field.default_value
                            {
                                note_divergence(diagnostics, merged, &coordinate, subgraph);
                            }
                            merged
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(FieldDescriptor::from_input_field(field))
                        }
                    };
                    diagnostics.merge_description(
                        &coordinate,
                        &mut merged.description,
                        field.description.as_ref(),
                    );
                    merged.declared_in.push(subgraph.graph.clone());
                    merged.owners.push(FieldDescriptor::owner(&subgraph.graph));
                }
                ids
            }
            ExtendedType::Scalar(_) => ids,
        };

        if matches!(
            kind,
            TypeKind::Object | TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject
        ) {
            push_own_variants(descriptor, &contribution);
        }
        descriptor.contributions.push(contribution);
        ids
    }

    /// Records which subgraphs can resolve each concrete type of every interface and union.
    ///
    /// This runs once all subgraphs are merged, since an abstract type's concrete types are only
    /// known then. An interface whose declarations disagree is turned into a union here.
    fn merge_abstract_types(&mut self, subgraphs: &[Subgraph], mut ids: FragmentIds) {
        let abstract_types: Vec<Name> = self
            .types
            .values()
            .filter(|ty| ty.kind.is_abstract())
            .map(|ty| ty.name.clone())
            .collect();

        for type_name in abstract_types {
            let possible_types = self.possible_types(&type_name);
            self.split_divergent_interface(&type_name, &possible_types);

            for subgraph in subgraphs {
                let graph = &subgraph.graph;
                // Keys of each concrete type in this subgraph, cloned out so that the abstract
                // type can be updated below.
                let concrete_keys: Vec<(Name, Vec<FieldSet>)> = possible_types
                    .iter()
                    .filter_map(|concrete| {
                        let contribution = self.types.get(concrete)?.contribution_from(graph)?;
                        let keys = contribution
                            .keys
                            .iter()
                            .map(|key| key.field_set.clone())
                            .collect();
                        Some((concrete.clone(), keys))
                    })
                    .collect();

                let Some(descriptor) = self.types.get_mut(&type_name) else {
                    continue;
                };
                if let Some(contribution) = descriptor.contribution_from(graph).cloned() {
                    push_own_variants(descriptor, &contribution);
                }
                for (concrete, keys) in concrete_keys {
                    if keys.is_empty() {
                        descriptor.variants.push(TypeVariant {
                            graph: graph.clone(),
                            type_name: concrete,
                            requires: None,
                        });
                        continue;
                    }
                    for key in keys {
                        let (fragment, next_ids) = descriptor.fragment_for(
                            FragmentUsage::Key,
                            &concrete,
                            key,
                            graph,
                            concrete.to_string(),
                            true,
                            ids,
                        );
                        ids = next_ids;
                        descriptor.variants.push(TypeVariant {
                            graph: graph.clone(),
                            type_name: concrete.clone(),
                            requires: Some(fragment),
                        });
                    }
                }
            }
        }
    }

    /// Concrete types of an abstract type, in merged order.
    fn possible_types(&self, type_name: &Name) -> Vec<Name> {
        let Some(descriptor) = self.types.get(type_name) else {
            return Vec::new();
        };
        match descriptor.kind {
            TypeKind::Union => descriptor.members.iter().cloned().collect(),
            _ => self
                .types
                .values()
                .filter(|ty| ty.kind == TypeKind::Object && ty.implements.contains(type_name))
                .map(|ty| ty.name.clone())
                .collect(),
        }
    }

    fn split_divergent_interface(&mut self, type_name: &Name, possible_types: &[Name]) {
        if self.options.interface_divergence != InterfaceDivergence::SyntheticUnion
            || possible_types.is_empty()
        {
            return;
        }
        let Some(descriptor) = self.types.get_mut(type_name) else {
            return;
        };
        if descriptor.kind != TypeKind::Interface
            || descriptor.fields.values().all(|field| field.divergent.is_empty())
        {
            return;
        }
        tracing::debug!(interface = %type_name, "merging divergent interface as a union");
        descriptor.kind = TypeKind::Union;
        descriptor.implements.clear();
        descriptor.members = possible_types.iter().cloned().collect();
        self.diagnostics.hints.push(CompositionHint::new(
            HintCode::InterfaceMergedAsUnion,
            format!(
                "Interface \"{type_name}\" is declared with incompatible fields across subgraphs and is composed as a union of its implementations"
            ),
        ));
        for ty in self.types.values_mut() {
            ty.implements.shift_remove(type_name);
        }
    }
}

/// Type-level variants of a type in the subgraph that contributed it: one per key, or a single
/// one when the type has no key there.
fn push_own_variants(descriptor: &mut TypeDescriptor, contribution: &Contribution) {
    if contribution.keys.is_empty() {
        descriptor.variants.push(TypeVariant {
            graph: contribution.graph.clone(),
            type_name: descriptor.name.clone(),
            requires: None,
        });
    }
    for key in &contribution.keys {
        descriptor.variants.push(TypeVariant {
            graph: contribution.graph.clone(),
            type_name: descriptor.name.clone(),
            requires: Some(key.fragment.clone()),
        });
    }
}

fn merge_keys<'a>(
    descriptor: &mut TypeDescriptor,
    contribution: &mut Contribution,
    subgraph: &Subgraph,
    keys: impl Iterator<Item = &'a Component<apollo_compiler::ast::Directive>>,
    diagnostics: &mut Diagnostics,
    mut ids: FragmentIds,
) -> FragmentIds {
    let coordinate = descriptor.name.to_string();
    for key in keys {
        let Some(field_set) = diagnostics.field_set(subgraph, &coordinate, key) else {
            continue;
        };
        let target = descriptor.name.clone();
        let (fragment, next_ids) = descriptor.fragment_for(
            FragmentUsage::Key,
            &target,
            field_set.clone(),
            &subgraph.graph,
            coordinate.clone(),
            true,
            ids,
        );
        ids = next_ids;
        contribution.keys.push(KeyUse {
            field_set,
            fragment,
        });
    }
    ids
}

fn merge_implements(
    descriptor: &mut TypeDescriptor,
    contribution: &mut Contribution,
    implements: &IndexSet<ComponentName>,
) {
    for interface in implements {
        descriptor.implements.insert(interface.name.clone());
        contribution.implements.push(interface.name.clone());
    }
}

fn merge_fields(
    descriptor: &mut TypeDescriptor,
    subgraph: &Subgraph,
    fields: &IndexMap<Name, Component<FieldDefinition>>,
    diagnostics: &mut Diagnostics,
    reuse: bool,
    mut ids: FragmentIds,
) -> FragmentIds {
    for (field_name, field) in fields {
        if is_federation_root_field(field_name) {
            continue;
        }
        let coordinate = format!("{}.{field_name}", descriptor.name);
        let ty = subgraph.rename_type(&field.ty);
        let external = field.directives.has(&EXTERNAL_DIRECTIVE_NAME);

        let merged = match descriptor.fields.entry(field_name.clone()) {
            Entry::Vacant(entry) => entry.insert(FieldDescriptor::from_field(field, ty.clone())),
            Entry::Occupied(entry) => {
                let merged = entry.into_mut();
                if external {
                    // External declarations restate a field, they never define its shape.
                } else if merged.owners.is_empty() {
                    let declared_in = std::mem::take(&mut merged.declared_in);
                    *merged = FieldDescriptor {
                        declared_in,
                        ..FieldDescriptor::from_field(field, ty.clone())
                    };
                } else if !merged.has_shape(&ty, &field.arguments) {
                    note_divergence(diagnostics, merged, &coordinate, subgraph);
                }
                merged
            }
        };
        diagnostics.merge_description(
            &coordinate,
            &mut merged.description,
            field.description.as_ref(),
        );
        merged.declared_in.push(subgraph.graph.clone());
        if external {
            continue;
        }

        let mut owner = FieldDescriptor::owner(&subgraph.graph);
        if let Some(requires) = field.directives.get(&REQUIRES_DIRECTIVE_NAME) {
            if let Some(field_set) = diagnostics.field_set(subgraph, &coordinate, requires) {
                let target = descriptor.name.clone();
                let (fragment, next_ids) = descriptor.fragment_for(
                    FragmentUsage::Requires,
                    &target,
                    field_set,
                    &subgraph.graph,
                    coordinate.clone(),
                    reuse,
                    ids,
                );
                ids = next_ids;
                owner.requires = Some(fragment);
            }
        }
        if let Some(provides) = field.directives.get(&PROVIDES_DIRECTIVE_NAME) {
            if let Some(field_set) = diagnostics.field_set(subgraph, &coordinate, provides) {
                let target = ty.inner_named_type().clone();
                let (fragment, next_ids) = descriptor.fragment_for(
                    FragmentUsage::Provides,
                    &target,
                    field_set,
                    &subgraph.graph,
                    coordinate.clone(),
                    reuse,
                    ids,
                );
                ids = next_ids;
                owner.provides = Some(fragment);
            }
        }
        // `descriptor.fields` was borrowed mutably above, look the field up again.
        if let Some(merged) = descriptor.fields.get_mut(field_name) {
            merged.owners.push(owner);
        }
    }
    ids
}

fn note_divergence(
    diagnostics: &mut Diagnostics,
    merged: &mut FieldDescriptor,
    coordinate: &str,
    subgraph: &Subgraph,
) {
    let kept = merged
        .owners
        .first()
        .map(|owner| owner.graph.to_string())
        .or_else(|| merged.declared_in.first().map(ToString::to_string))
        .unwrap_or_default();
    diagnostics.hints.push(CompositionHint::new(
        HintCode::InconsistentFieldShape,
        format!(
            "Field \"{coordinate}\" is declared with a different type or arguments in subgraph \"{}\" than in subgraph \"{kept}\"; keeping the declaration of \"{kept}\"",
            subgraph.name()
        ),
    ));
    merged.divergent.push(subgraph.graph.clone());
}
