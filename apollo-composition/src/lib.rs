//! ## Usage
//!
//! Composes the schemas of several federated subgraphs into one supergraph document. Every type
//! and field of the supergraph is annotated with the subgraphs able to resolve it, and with the
//! fields those subgraphs need first, so that a router can plan queries across them.
//!
//! ```
//! use apollo_composition::SubgraphDefinition;
//! use apollo_composition::compose;
//!
//! let result = compose(&[SubgraphDefinition::new(
//!     "accounts",
//!     "https://accounts.example.com",
//!     r#"type Query { me: User } type User @key(fields: "id") { id: ID! }"#,
//! )]);
//! assert!(result.supergraph_sdl().is_some());
//! ```
//!
//! Composition is a pure function of its input: the same subgraphs, in the same order, always
//! produce the same bytes.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

mod display_helpers;
pub mod error;
pub mod field_set;
pub mod hints;
mod join;
mod merge;
pub mod options;
mod printer;
pub mod subgraph;
mod validate;

use serde::Serialize;

pub use crate::error::CompositionError;
pub use crate::field_set::FieldSet;
pub use crate::hints::CompositionHint;
pub use crate::merge::TypeKind;
pub use crate::options::CompositionOptions;
pub use crate::subgraph::SubgraphDefinition;

/// Either a supergraph or the reasons it could not be composed, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CompositionResult {
    Success {
        #[serde(rename = "composedSdl")]
        supergraph_sdl: String,
        hints: Vec<CompositionHint>,
    },
    Failure {
        errors: Vec<CompositionError>,
    },
}

impl CompositionResult {
    pub fn supergraph_sdl(&self) -> Option<&str> {
        match self {
            Self::Success { supergraph_sdl, .. } => Some(supergraph_sdl),
            Self::Failure { .. } => None,
        }
    }

    pub fn hints(&self) -> &[CompositionHint] {
        match self {
            Self::Success { hints, .. } => hints,
            Self::Failure { .. } => &[],
        }
    }

    pub fn errors(&self) -> &[CompositionError] {
        match self {
            Self::Success { .. } => &[],
            Self::Failure { errors } => errors,
        }
    }
}

impl From<Result<(String, Vec<CompositionHint>), Vec<CompositionError>>> for CompositionResult {
    fn from(result: Result<(String, Vec<CompositionHint>), Vec<CompositionError>>) -> Self {
        match result {
            Ok((supergraph_sdl, hints)) => Self::Success {
                supergraph_sdl,
                hints,
            },
            Err(errors) => Self::Failure { errors },
        }
    }
}

/// Composes the subgraphs with the default [`CompositionOptions`].
pub fn compose(subgraphs: &[SubgraphDefinition]) -> CompositionResult {
    compose_with_options(subgraphs, &CompositionOptions::default())
}

#[tracing::instrument(level = "debug", skip_all, fields(subgraphs = subgraphs.len()))]
pub fn compose_with_options(
    subgraphs: &[SubgraphDefinition],
    options: &CompositionOptions,
) -> CompositionResult {
    let result = try_compose(subgraphs, options);
    match &result {
        Ok((_, hints)) => tracing::debug!(hints = hints.len(), "composition succeeded"),
        Err(errors) => tracing::debug!(errors = errors.len(), "composition failed"),
    }
    result.into()
}

fn try_compose(
    definitions: &[SubgraphDefinition],
    options: &CompositionOptions,
) -> Result<(String, Vec<CompositionHint>), Vec<CompositionError>> {
    let subgraphs = subgraph::parse_subgraphs(definitions)?;
    let merged = merge::merge_subgraphs(&subgraphs, options)?;
    validate::validate(&merged)?;
    let document = join::synthesize(&merged, options);
    Ok((document.to_string(), merged.hints))
}
