use std::cell::RefCell;

use anchor_testing::TestHost;

use anchor_core::{ambient_of, Ambient};
use anchor_core::{comp, el, props, Props, View};

thread_local! {
    static THEME: RefCell<Option<Ambient<String>>> = const { RefCell::new(None) };
    static SEEN: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn theme() -> Ambient<String> {
    THEME.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| ambient_of(|| "default".to_string()))
            .clone()
    })
}

fn consumer(_props: &Props) -> View {
    let current = theme().current();
    SEEN.with(|seen| seen.borrow_mut().push(current.clone()));
    View::from(current)
}

fn dark_provider(_props: &Props) -> View {
    theme().provide("dark".to_string());
    el("div", props! {"children" => comp!(consumer)})
}

fn outer(_props: &Props) -> View {
    el(
        "div",
        props! {"children" => vec![comp!(dark_provider), comp!(consumer)]},
    )
}

#[test]
fn nearest_provider_wins_and_siblings_fall_back() {
    SEEN.with(|seen| seen.borrow_mut().clear());
    let host = TestHost::immediate();
    host.render(comp!(outer));
    assert_eq!(
        SEEN.with(|seen| seen.borrow().clone()),
        vec!["dark".to_string(), "default".to_string()],
        "the provider's subtree sees the binding, the sibling sees the default"
    );
}

fn nested_override(_props: &Props) -> View {
    theme().provide("light".to_string());
    el("div", props! {"children" => comp!(consumer)})
}

fn shadowing(_props: &Props) -> View {
    theme().provide("dark".to_string());
    el(
        "div",
        props! {"children" => vec![comp!(nested_override), comp!(consumer)]},
    )
}

#[test]
fn inner_bindings_shadow_outer_ones() {
    SEEN.with(|seen| seen.borrow_mut().clear());
    let host = TestHost::immediate();
    host.render(comp!(shadowing));
    assert_eq!(
        SEEN.with(|seen| seen.borrow().clone()),
        vec!["light".to_string(), "dark".to_string()]
    );
}

#[test]
#[should_panic(expected = "no active render context")]
fn reading_an_ambient_outside_a_render_panics() {
    let ambient: Ambient<i32> = ambient_of(|| 0);
    let _ = ambient.current();
}

#[test]
fn default_value_is_available_without_a_chain() {
    let ambient: Ambient<i32> = ambient_of(|| 41);
    assert_eq!(ambient.default_value(), 41);
}
