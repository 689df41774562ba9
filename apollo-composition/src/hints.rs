use serde::Serialize;

/// A non-fatal observation made while merging. Hints never prevent a supergraph from being
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionHint {
    pub code: HintCode,
    pub message: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display, strum_macros::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HintCode {
    /// A field is declared with a different output type or arguments in some subgraphs.
    InconsistentFieldShape,
    InconsistentDescription,
    /// An interface could not be merged and was emitted as a union of its implementations.
    InterfaceMergedAsUnion,
}

impl CompositionHint {
    pub(crate) fn new(code: HintCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
