use serde::Deserialize;

/// Policy decisions composition has to make. The alternatives to the defaults give a smaller or
/// stricter supergraph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositionOptions {
    /// Whether identical `@requires`/`@provides` field sets used at different places of the same
    /// type share one generated fragment. `@key` field sets are always shared.
    ///
    /// Defaults to [`FragmentReuse::PerOccurrence`].
    pub fragment_reuse: FragmentReuse,

    /// What to do with an interface whose subgraph declarations disagree on a field's type.
    ///
    /// Defaults to [`InterfaceDivergence::SyntheticUnion`].
    pub interface_divergence: InterfaceDivergence,

    /// Whether descriptions are printed in the supergraph.
    ///
    /// Defaults to true.
    pub include_descriptions: bool,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            fragment_reuse: FragmentReuse::PerOccurrence,
            interface_divergence: InterfaceDivergence::SyntheticUnion,
            include_descriptions: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentReuse {
    /// Every `@requires`/`@provides` occurrence gets its own fragment.
    #[default]
    PerOccurrence,
    /// Occurrences with the same canonical selection on the same type share a fragment.
    PerType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceDivergence {
    /// Emit a union of the interface's implementations instead of the interface.
    #[default]
    SyntheticUnion,
    /// Keep the interface with the field shapes of the first subgraph declaring each field.
    FirstContributor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_options() {
        let options: CompositionOptions =
            serde_json::from_str(r#"{ "fragment_reuse": "per_type" }"#).unwrap();
        assert_eq!(
            options,
            CompositionOptions {
                fragment_reuse: FragmentReuse::PerType,
                ..Default::default()
            }
        );
    }

    #[test]
    fn rejects_unknown_options() {
        assert!(serde_json::from_str::<CompositionOptions>(r#"{ "reuse": true }"#).is_err());
    }
}
