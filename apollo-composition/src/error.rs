use std::fmt::Display;

use apollo_compiler::Name;
use itertools::Itertools;
use serde::Serialize;
use serde::Serializer;

use crate::merge::TypeKind;

/// A single problem found while composing subgraphs.
///
/// Composition never stops at the first error: every stage collects as many errors as it can and
/// hands the full, ordered list back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositionError {
    /// The subgraph document could not be parsed into a type system.
    #[error("[{subgraph}] Invalid subgraph document: {message}")]
    InvalidSubgraph { subgraph: String, message: String },
    #[error("Subgraph name \"{subgraph}\" cannot be used as a value of the join__Graph enum")]
    InvalidGraphName { subgraph: String },
    #[error("More than one subgraph is named \"{subgraph}\"")]
    DuplicateSubgraphName { subgraph: String },
    /// A `@key`, `@requires` or `@provides` string is not a valid field set.
    #[error("[{subgraph}] Malformed field set \"{selection}\" on \"{coordinate}\": {message}")]
    MalformedSelection {
        subgraph: String,
        coordinate: String,
        selection: String,
        message: String,
    },
    #[error(
        "Type \"{type_name}\" is declared with incompatible kinds: {}",
        DisplayDeclarations(.declarations)
    )]
    TypeKindConflict {
        type_name: Name,
        declarations: Vec<(String, TypeKind)>,
    },
    #[error(
        "[{}] Type \"{type_name}\" implements interface \"{interface}\" but does not declare its field \"{field}\"",
        .subgraphs.join(", ")
    )]
    MissingInterfaceField {
        type_name: Name,
        interface: Name,
        field: Name,
        subgraphs: Vec<String>,
    },
    #[error(
        "[{}] Field set \"{selection}\" used by \"{coordinate}\" selects \"{field}\", which does not exist on type \"{type_name}\"",
        .subgraphs.join(", ")
    )]
    DanglingFieldSetReference {
        coordinate: String,
        selection: String,
        field: String,
        type_name: Name,
        subgraphs: Vec<String>,
    },
    #[error(
        "[{}] Field \"{coordinate}\" is marked @external in every subgraph declaring it, so no subgraph resolves it",
        .subgraphs.join(", ")
    )]
    UnownedField {
        coordinate: String,
        subgraphs: Vec<String>,
    },
}

impl CompositionError {
    pub fn code(&self) -> &'static str {
        self.into()
    }

    /// The subgraphs this error is attributed to, in input order.
    pub fn subgraphs(&self) -> Vec<&str> {
        match self {
            Self::InvalidSubgraph { subgraph, .. }
            | Self::InvalidGraphName { subgraph }
            | Self::DuplicateSubgraphName { subgraph }
            | Self::MalformedSelection { subgraph, .. } => vec![subgraph.as_str()],
            Self::TypeKindConflict { declarations, .. } => declarations
                .iter()
                .map(|(subgraph, _)| subgraph.as_str())
                .collect(),
            Self::MissingInterfaceField { subgraphs, .. }
            | Self::DanglingFieldSetReference { subgraphs, .. }
            | Self::UnownedField { subgraphs, .. } => {
                subgraphs.iter().map(String::as_str).collect()
            }
        }
    }
}

struct DisplayDeclarations<'a>(&'a [(String, TypeKind)]);

impl Display for DisplayDeclarations<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let declarations = self
            .0
            .iter()
            .map(|(subgraph, kind)| format!("{kind} in \"{subgraph}\""));
        write!(f, "{}", declarations.format(", "))
    }
}

impl Serialize for CompositionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct SerializedError<'a> {
            message: String,
            code: &'a str,
        }

        SerializedError {
            message: self.to_string(),
            code: self.code(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;

    use super::*;

    #[test]
    fn kind_conflict_names_every_subgraph() {
        let error = CompositionError::TypeKindConflict {
            type_name: name!("Foo"),
            declarations: vec![
                ("a".to_owned(), TypeKind::Object),
                ("b".to_owned(), TypeKind::InputObject),
            ],
        };
        assert_eq!(error.code(), "TYPE_KIND_CONFLICT");
        assert_eq!(error.subgraphs(), vec!["a", "b"]);
        assert_eq!(
            error.to_string(),
            r#"Type "Foo" is declared with incompatible kinds: object type in "a", input object type in "b""#
        );
    }

    #[test]
    fn serializes_message_and_code() {
        let error = CompositionError::DuplicateSubgraphName {
            subgraph: "accounts".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({
                "message": "More than one subgraph is named \"accounts\"",
                "code": "DUPLICATE_SUBGRAPH_NAME",
            })
        );
    }
}
