//! Renders a few trees into the in-memory document and prints the host HTML
//! after every pass, then drives a stateful counter through simulated clicks.

use std::rc::Rc;

use anchor_core::{
    comp, deps, el, props, use_callback, use_effect, use_state, Document, MemoryDocument, Props,
    Root, View,
};
use anchor_runtime_std::StdRunner;

fn app(_props: &Props) -> View {
    el(
        "div",
        props! {
            "class" => "hoge",
            "children" => vec![View::from("fuga1"), View::from("fuga2")],
        },
    )
}

fn counter(_props: &Props) -> View {
    let (count, set_count) = use_state(|| 0);
    let on_click = use_callback(deps![], {
        let set_count = set_count.clone();
        move || set_count.update(|count| count + 1)
    });
    use_effect(deps![count], move |scope| {
        log::info!("count is now {count}");
        scope.on_cleanup(move || log::info!("leaving count {count}"));
    });
    el(
        "div",
        props! {
            "children" => vec![
                View::from(count),
                el("button", props! {
                    "onClick" => on_click,
                    "children" => "click",
                }),
            ],
        },
    )
}

fn main() {
    env_logger::init();

    let doc = Rc::new(MemoryDocument::new());
    let body = doc.create_element("body");
    let runner = StdRunner::new();
    let root = Root::mount(doc.clone(), body, runner.runner());

    let show = |label: &str| println!("{label:<24} {}", doc.inner_html(body));

    root.render(comp!(app));
    show("component");
    root.render(el(
        "div",
        props! {"class" => "hoge", "children" => vec![View::from("piyo1"), View::from("piyo2")]},
    ));
    show("patched texts");
    root.render(el(
        "div",
        props! {"children" => el("div", props! {"children" => "pp"})},
    ));
    show("nested");
    root.render(el("div", props! {"children" => "ok"}));
    show("single child");

    root.render(comp!(counter));
    show("counter mounted");
    let button = doc.find_by_tag(body, "button").expect("button rendered");
    for _ in 0..3 {
        doc.dispatch(button, "onclick");
        runner.run_pending();
    }
    show("after three clicks");

    root.unmount();
    show("unmounted");
}
