//! Parsing and naming of the field sets attached to `@key`, `@requires` and `@provides`.
//!
//! A field set is kept as a small selection tree rather than as the raw string the subgraph
//! authored, so that the canonical text printed in the supergraph does not depend on how the
//! subgraph happened to format it.

use std::fmt;
use std::fmt::Display;

use apollo_compiler::Name;
use apollo_parser::Parser;
use apollo_parser::cst;
use itertools::Itertools;

use crate::subgraph::GraphRef;

/// One node of a field set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// A leaf field, e.g. `id`.
    Field(Name),
    /// A field with a sub-selection, e.g. `name { first last }`.
    Nested(Name, FieldSet),
}

impl Selection {
    pub fn name(&self) -> &Name {
        match self {
            Self::Field(name) | Self::Nested(name, _) => name,
        }
    }
}

/// A non-empty, ordered selection tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSet {
    selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MalformedFieldSet {
    pub message: String,
}

impl MalformedFieldSet {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl FieldSet {
    /// Parses a selection set with optional outer braces, as found in the `fields` argument of
    /// federation directives.
    pub fn parse(source: &str) -> Result<Self, MalformedFieldSet> {
        let tree = Parser::new(source).parse_selection_set();
        if let Some(error) = tree.errors().next() {
            return Err(MalformedFieldSet::new(error.message()));
        }
        Self::from_cst(&tree.field_set())
    }

    fn from_cst(selection_set: &cst::SelectionSet) -> Result<Self, MalformedFieldSet> {
        let mut selections = Vec::new();
        for selection in selection_set.selections() {
            let field = match selection {
                cst::Selection::Field(field) => field,
                cst::Selection::FragmentSpread(_) | cst::Selection::InlineFragment(_) => {
                    return Err(MalformedFieldSet::new(
                        "fragments are not supported in field sets",
                    ));
                }
            };
            let Some(name) = field.name() else {
                return Err(MalformedFieldSet::new("expected a field name"));
            };
            let name = name.text().to_string();
            if field.alias().is_some() {
                return Err(MalformedFieldSet::new(format!(
                    "cannot use an alias for \"{name}\": aliases are not supported in field sets"
                )));
            }
            if field.arguments().is_some() {
                return Err(MalformedFieldSet::new(format!(
                    "cannot pass arguments to \"{name}\": arguments are not supported in field sets"
                )));
            }
            if field.directives().is_some() {
                return Err(MalformedFieldSet::new(format!(
                    "cannot apply directives to \"{name}\": directives are not supported in field sets"
                )));
            }
            let name = Name::new(&name).map_err(|err| MalformedFieldSet::new(err.to_string()))?;
            selections.push(match field.selection_set() {
                Some(nested) => Selection::Nested(name, Self::from_cst(&nested)?),
                None => Selection::Field(name),
            });
        }
        if selections.is_empty() {
            return Err(MalformedFieldSet::new("a field set must select at least one field"));
        }
        Ok(Self { selections })
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Every field name of the tree, depth-first, in authored order.
    pub fn field_names(&self) -> Vec<&Name> {
        let mut names = Vec::new();
        self.collect_field_names(&mut names);
        names
    }

    fn collect_field_names<'a>(&'a self, names: &mut Vec<&'a Name>) {
        for selection in &self.selections {
            names.push(selection.name());
            if let Selection::Nested(_, nested) = selection {
                nested.collect_field_names(names);
            }
        }
    }
}

/// Prints the canonical form, e.g. `{ username name { first last } }`.
impl Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, selection) in self.selections.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match selection {
                Selection::Field(name) => write!(f, "{name}")?,
                Selection::Nested(name, nested) => write!(f, "{name} {nested}")?,
            }
        }
        write!(f, " }}")
    }
}

/// Counter used to number generated fragments.
///
/// The counter is a plain value: minting a name hands back the counter to use for the next one,
/// so the numbering only depends on the order in which the merge asks for names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FragmentIds {
    next: usize,
}

impl FragmentIds {
    pub(crate) fn mint(self, type_name: &Name, field_set: &FieldSet) -> (FragmentName, Self) {
        let id = self.next;
        let name = format!(
            "local__id_{id}_{type_name}_{}",
            field_set.field_names().iter().join("_")
        );
        (FragmentName { id, name }, Self { next: id + 1 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentName {
    pub(crate) id: usize,
    pub(crate) name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentUsage {
    Key,
    Requires,
    Provides,
}

/// A generated fragment definition, printed right after the type it is scoped to.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub(crate) name: FragmentName,
    /// The type in the fragment's type condition.
    pub(crate) scope: Name,
    /// The type the selection is resolved against: the scope itself, the field's output type
    /// for `@provides`, or the concrete type of an abstract type's key.
    pub(crate) target: Name,
    pub(crate) usage: FragmentUsage,
    pub(crate) field_set: FieldSet,
    /// Subgraphs citing this fragment, with the coordinate they cite it from.
    pub(crate) citations: Vec<(GraphRef, String)>,
}

impl Fragment {
    pub(crate) fn is_reusable_for(
        &self,
        usage: FragmentUsage,
        target: &Name,
        field_set: &FieldSet,
    ) -> bool {
        self.usage == usage && self.target == *target && self.field_set == *field_set
    }

    pub(crate) fn cite(&mut self, graph: &GraphRef, coordinate: String) {
        self.citations.push((graph.clone(), coordinate));
    }

    /// Subgraphs using this fragment as an entity key, without repetition.
    pub(crate) fn key_graphs(&self) -> Vec<&GraphRef> {
        if self.usage != FragmentUsage::Key {
            return Vec::new();
        }
        self.citations
            .iter()
            .map(|(graph, _)| graph)
            .unique()
            .collect()
    }
}
