//! # Template Parser Tests
//!
//! Validates the document tree built from template source and the
//! parse errors raised for malformed tags.

use ember_core::ScriptError;
use ember_script::{DocumentParser, Element, Node, NodeKind, Operand, TemplateParser};
use std::time::Instant;

fn parse(source: &str) -> Result<ember_script::Document, ScriptError> {
    TemplateParser::new().parse(source)
}

#[test]
fn test_plain_text_is_one_node() {
    let doc = parse("<h1>hello</h1>").unwrap();
    assert_eq!(doc.nodes, vec![Node::Text("<h1>hello</h1>".into())]);
    assert!(parse("").unwrap().nodes.is_empty());
}

/// Verifies loop headers, nesting and echo classification in one pass.
#[test]
fn test_loop_and_echo_tree() {
    let t = Instant::now();

    let doc = parse("<ul><% for i = 1 to $n step 2 %><li><%= $i 2 * format %></li><% end %></ul>")
        .unwrap();
    let kinds: Vec<NodeKind> = doc.nodes.iter().map(Node::kind).collect();
    assert_eq!(kinds, vec![NodeKind::Text, NodeKind::For, NodeKind::Text]);

    let Node::For(l) = &doc.nodes[1] else {
        panic!("expected a loop node");
    };
    assert_eq!(l.variable, "i");
    assert_eq!(l.start, Operand::Literal("1".into()));
    assert_eq!(l.end, Operand::Variable("n".into()));
    assert_eq!(l.step, Some(Operand::Literal("2".into())));

    let body = doc.nodes[1].children();
    assert_eq!(body.len(), 3);
    assert_eq!(
        body[1],
        Node::Echo(vec![
            Element::Variable("i".into()),
            Element::Literal("2".into()),
            Element::Operator("*".into()),
            Element::Function("format".into()),
        ])
    );

    let overhead = t.elapsed();
    println!("test_loop_and_echo_tree: Testing Overhead = {:?}", overhead);
}

#[test]
fn test_nested_loops() {
    let doc = parse("<% for i = 1 to 2 %><% for j = 1 to 2 %>x<% end %><% end %>").unwrap();
    assert_eq!(doc.nodes.len(), 1);
    let inner = doc.nodes[0].children();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].kind(), NodeKind::For);
    assert_eq!(inner[0].children(), &[Node::Text("x".into())]);
}

#[test]
fn test_echo_literals() {
    let doc = parse(r#"<%= "a \"quoted\" word" -3.5 - %>"#).unwrap();
    assert_eq!(
        doc.nodes,
        vec![Node::Echo(vec![
            Element::Literal("a \"quoted\" word".into()),
            Element::Literal("-3.5".into()),
            Element::Operator("-".into()),
        ])]
    );
}

#[test]
fn test_parse_errors() {
    let t = Instant::now();

    let cases = [
        "<% for i = 1 to 3 %>never closed",
        "stray <% end %>",
        "<% while x %>",
        "<%= 1 2 +",
        "<% for = 1 to 3 %><% end %>",
        "<% for i = 1 3 %><% end %>",
        r#"<%= "open %>"#,
        "<% %>",
    ];
    for source in cases {
        let err = parse(source).unwrap_err();
        assert!(
            matches!(err, ScriptError::Parse(_)),
            "{:?} should fail to parse, got {:?}",
            source,
            err
        );
    }

    let overhead = t.elapsed();
    println!("test_parse_errors: Testing Overhead = {:?}", overhead);
}
