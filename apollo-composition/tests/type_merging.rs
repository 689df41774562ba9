use apollo_composition::CompositionOptions;
use apollo_composition::CompositionResult;
use apollo_composition::SubgraphDefinition;
use apollo_composition::compose_with_options;
use apollo_composition::hints::HintCode;
use apollo_composition::options::InterfaceDivergence;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::test_helpers::ServiceDefinition;
use crate::test_helpers::block;
use crate::test_helpers::compose_services;
use crate::test_helpers::supergraph_sdl;

#[test]
fn unions_fields_of_an_object_declared_in_two_subgraphs() {
    let sdl = supergraph_sdl(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"type Query { t: T } type T @key(fields: "k") { k: ID! a: Int }"#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"type T @key(fields: "k") { k: ID! b: String }"#,
        },
    ]);
    assert_eq!(
        block(&sdl, "type T"),
        r#"type T
  @join(graph: a, type: "T", requires: "local__id_0_T_k")
  @join(graph: b, type: "T", requires: "local__id_0_T_k")
{
  k: ID! @join(graph: a) @join(graph: b)
  a: Int @join(graph: a)
  b: String @join(graph: b)
}"#
    );
}

#[test]
fn keeps_the_first_shape_of_a_divergent_field() {
    let result = compose_services(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"type Query { t: T } type T @key(fields: "k") { k: ID! size: Int }"#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"extend type T @key(fields: "k") { k: ID! @external size(unit: String): String }"#,
        },
    ]);
    let sdl = result.supergraph_sdl().unwrap();
    assert!(block(sdl, "type T").contains(
        "\n  size: Int @join(graph: a) @join(graph: b) @join__error(graph: [b], message: "
    ));
    let codes: Vec<_> = result.hints().iter().map(|hint| hint.code).collect();
    assert_eq!(codes, vec![HintCode::InconsistentFieldShape]);
    assert!(result.hints()[0].message.contains("\"T.size\""));
}

const DIVERGENT_INTERFACE: [(&str, &str); 2] = [
    (
        "a",
        r#"
        type Query { node: Node }
        interface Node { id: ID! }
        type User implements Node @key(fields: "id") { id: ID! }
        "#,
    ),
    (
        "b",
        r#"
        interface Node { id: String }
        type Post implements Node { id: String }
        "#,
    ),
];

fn compose_divergent_interface(interface_divergence: InterfaceDivergence) -> CompositionResult {
    let definitions: Vec<_> = DIVERGENT_INTERFACE
        .iter()
        .map(|(name, type_defs)| SubgraphDefinition::new(*name, "https://example.com", *type_defs))
        .collect();
    let options = CompositionOptions {
        interface_divergence,
        ..Default::default()
    };
    let result = compose_with_options(&definitions, &options);
    assert!(result.errors().is_empty(), "{:#?}", result.errors());
    result
}

fn hint_codes(result: &CompositionResult) -> Vec<HintCode> {
    result.hints().iter().map(|hint| hint.code).collect()
}

#[test]
fn divergent_interfaces_become_unions_of_their_implementations() {
    let result = compose_divergent_interface(InterfaceDivergence::SyntheticUnion);
    assert_eq!(
        hint_codes(&result),
        vec![
            HintCode::InconsistentFieldShape,
            HintCode::InterfaceMergedAsUnion
        ]
    );
    assert!(result.hints()[1].message.contains("\"Node\""));
    let sdl = result.supergraph_sdl().unwrap();
    assert!(!sdl.contains("interface Node"));
    assert!(!sdl.contains("implements"));
    assert_eq!(
        block(sdl, "union Node"),
        r#"union Node
  @join(graph: a, type: "Node")
  @join(graph: a, type: "User", requires: "local__id_1_Node_id")
  @join(graph: b, type: "Node")
  @join(graph: b, type: "Post")
  = User | Post"#
    );
    assert!(block(sdl, "type User\n").starts_with("type User\n  @join(graph: a"));
}

#[test]
fn divergent_interfaces_can_keep_the_first_declaration() {
    let result = compose_divergent_interface(InterfaceDivergence::FirstContributor);
    assert_eq!(hint_codes(&result), vec![HintCode::InconsistentFieldShape]);
    let sdl = result.supergraph_sdl().unwrap();
    let node = block(sdl, "interface Node");
    assert!(node.contains("\n  id: ID! @join(graph: a) @join(graph: b) @join__error(graph: [b], "));
    assert!(sdl.contains("type User implements Node\n"));
    assert!(sdl.contains("type Post implements Node\n"));
}

#[test]
fn field_sets_select_through_interfaces_merged_as_unions() {
    let result = compose_services(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { review: Review }
                type Review { author: Node @provides(fields: "name") }
                interface Node { id: ID! name: String }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                interface Node { id: String }
                type Post implements Node { id: String }
            "#,
        },
    ]);
    assert!(result.errors().is_empty(), "{:#?}", result.errors());
    assert_eq!(
        hint_codes(&result),
        vec![
            HintCode::InconsistentFieldShape,
            HintCode::InterfaceMergedAsUnion
        ]
    );
    let sdl = result.supergraph_sdl().unwrap();
    assert!(block(sdl, "union Node").ends_with("\n  = Post"));
    assert!(block(sdl, "type Review").contains(
        "\n  author: Node @join(graph: a, provides: \"local__id_0_Review_name\")\n"
    ));
}

#[test]
fn interfaces_stop_implementing_an_interface_merged_as_union() {
    let sdl = supergraph_sdl(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { node: Node }
                interface Node { id: ID! }
                interface Named implements Node { id: ID! name: String }
                type User implements Node & Named { id: ID! name: String }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                interface Node { id: String }
                type Post implements Node { id: String }
            "#,
        },
    ]);
    assert!(!sdl.contains("implements Node"));
    assert!(sdl.contains("\n\ninterface Named\n"));
    assert!(sdl.contains("\n\ntype User implements Named\n"));
    assert!(block(&sdl, "union Node").ends_with("\n  = User | Post"));
}

#[rstest]
#[case::with_descriptions(
    true,
    r#"  users("How many users" first: Int @deprecated(reason: "no")): [Int] @join(graph: a)"#
)]
#[case::without_descriptions(
    false,
    r#"  users(first: Int @deprecated(reason: "no")): [Int] @join(graph: a)"#
)]
fn prints_argument_descriptions_and_directives(
    #[case] include_descriptions: bool,
    #[case] expected: &str,
) {
    let result = compose_with_options(
        &[SubgraphDefinition::new(
            "a",
            "https://a",
            r#"type Query { users("How many users" first: Int @deprecated(reason: "no")): [Int] }"#,
        )],
        &CompositionOptions {
            include_descriptions,
            ..Default::default()
        },
    );
    let sdl = result.supergraph_sdl().unwrap();
    assert!(
        block(sdl, "type Query").lines().any(|line| line == expected),
        "{sdl}"
    );
}

#[test]
fn merges_input_objects_and_enums_per_contributor() {
    let sdl = supergraph_sdl(&[
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                type Query { list(filter: Filter, order: Order): [Int] }
                input Filter { first: Int = 5 }
                enum Order { ASC }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                type Query { other(filter: Filter): Int }
                input Filter { first: Int = 5 after: String }
                enum Order { ASC DESC }
            "#,
        },
    ]);
    assert_eq!(
        block(&sdl, "input Filter"),
        r#"input Filter
  @join(graph: a, type: "Filter")
  @join(graph: b, type: "Filter")
{
  first: Int = 5 @join(graph: a) @join(graph: b)
  after: String @join(graph: b)
}"#
    );
    assert_eq!(
        block(&sdl, "enum Order"),
        r#"enum Order
  @join(graph: a, type: "Order")
  @join(graph: b, type: "Order")
{
  ASC @join(graph: a) @join(graph: b)
  DESC @join(graph: b)
}"#
    );
}

#[test]
fn keeps_the_first_description_and_executable_directive() {
    let services = [
        ServiceDefinition {
            name: "a",
            type_defs: r#"
                directive @transform(from: String!) on FIELD
                type Query { me: User }
                "The person using the API"
                type User { id: ID! }
            "#,
        },
        ServiceDefinition {
            name: "b",
            type_defs: r#"
                directive @transform(to: String) on FIELD | FRAGMENT_SPREAD
                "Someone"
                type User { name: String }
            "#,
        },
    ];
    let result = compose_services(&services);
    let sdl = result.supergraph_sdl().unwrap();
    assert!(sdl.contains("\n\n\"The person using the API\"\ntype User\n"));
    assert!(!sdl.contains("Someone"));
    assert!(sdl.contains("\n\ndirective @transform(from: String!) on FIELD\n\n"));
    let codes: Vec<_> = result.hints().iter().map(|hint| hint.code).collect();
    assert_eq!(codes, vec![HintCode::InconsistentDescription]);
}

#[test]
fn descriptions_can_be_left_out() {
    let result = compose_with_options(
        &[SubgraphDefinition::new(
            "a",
            "https://a",
            r#"
                "Rewrites a field"
                directive @transform("Target name" to: String) on FIELD
                type Query { "The current user" me: String }
            "#,
        )],
        &CompositionOptions {
            include_descriptions: false,
            ..Default::default()
        },
    );
    let sdl = result.supergraph_sdl().unwrap();
    assert!(!sdl.contains("The current user"));
    assert!(!sdl.contains("Rewrites a field"));
    assert!(sdl.contains("\n\ndirective @transform(to: String) on FIELD\n"));
    assert!(sdl.contains("\n  me: String @join(graph: a)\n"));
}
