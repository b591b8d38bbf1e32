use anchor_testing::TestHost;

use anchor_core::h;
use anchor_core::{props, NodeKind, View};

#[test]
fn parses_tag_class_and_id() {
    let view = h("div.card.wide#main", props! {}, Vec::new());
    let View::Node(node) = view else {
        panic!("h builds an element node");
    };
    assert_eq!(node.kind, NodeKind::Element("div".to_string()));
    assert_eq!(
        node.props.get("class"),
        Some(&anchor_core::Value::Str("card wide".to_string()))
    );
    assert_eq!(
        node.props.get("id"),
        Some(&anchor_core::Value::Str("main".to_string()))
    );
}

#[test]
fn a_bare_class_selector_defaults_to_div() {
    let view = h(".card", props! {}, Vec::new());
    let View::Node(node) = view else {
        panic!("h builds an element node");
    };
    assert_eq!(node.kind, NodeKind::Element("div".to_string()));
}

#[test]
fn single_and_multiple_children_normalize() {
    let host = TestHost::immediate();
    host.render(h("div.hoge", props! {}, vec![View::from("only")]));
    assert_eq!(
        host.html(),
        "<div class=\"hoge\">only<!--0--></div><!--root-->"
    );

    host.render(h(
        "div.hoge",
        props! {},
        vec![View::from("a"), View::from("b")],
    ));
    assert_eq!(
        host.html(),
        "<div class=\"hoge\">a<!--0-->b<!--1--></div><!--root-->"
    );
}

#[test]
fn renders_through_the_reconciler() {
    let host = TestHost::immediate();
    host.render(h(
        "section#app",
        props! {"data-kind" => "demo"},
        vec![h("span.badge", props! {}, vec![View::from("7")])],
    ));
    assert_eq!(
        host.html(),
        "<section data-kind=\"demo\" id=\"app\"><span class=\"badge\">7<!--0--></span><!--0--></section><!--root-->"
    );
}
