use std::cell::{Cell, RefCell};

use anchor_testing::TestHost;

use anchor_core::{
    comp, deps, el, props, use_callback, use_effect, use_memo, use_pin, use_reducer, use_ref,
    use_state, Dispatch, Handler, PinHandle, Props, Setter, View,
};

thread_local! {
    static PIN: RefCell<Option<PinHandle>> = const { RefCell::new(None) };
    static EFFECT_RUNS: Cell<usize> = const { Cell::new(0) };
    static CLEANUP_RUNS: Cell<usize> = const { Cell::new(0) };
    static ONCE_RUNS: Cell<usize> = const { Cell::new(0) };
    static DEP: Cell<i64> = const { Cell::new(0) };
    static SETTER: RefCell<Option<Setter<i32>>> = const { RefCell::new(None) };
    static DISPATCH: RefCell<Option<Dispatch<i32, i32>>> = const { RefCell::new(None) };
    static RENDERS: Cell<usize> = const { Cell::new(0) };
    static MEMO_COMPUTES: Cell<usize> = const { Cell::new(0) };
}

fn reset_counters() {
    PIN.with(|slot| *slot.borrow_mut() = None);
    EFFECT_RUNS.with(|c| c.set(0));
    CLEANUP_RUNS.with(|c| c.set(0));
    ONCE_RUNS.with(|c| c.set(0));
    DEP.with(|c| c.set(0));
    SETTER.with(|slot| *slot.borrow_mut() = None);
    DISPATCH.with(|slot| *slot.borrow_mut() = None);
    RENDERS.with(|c| c.set(0));
    MEMO_COMPUTES.with(|c| c.set(0));
}

fn captured_pin() -> PinHandle {
    PIN.with(|slot| slot.borrow().clone()).expect("pin captured")
}

// ---- use_effect ----------------------------------------------------------

fn effect_every_pass(_props: &Props) -> View {
    PIN.with(|slot| slot.borrow_mut().replace(use_pin()));
    use_effect(None, |scope| {
        EFFECT_RUNS.with(|c| c.set(c.get() + 1));
        scope.on_cleanup(|| CLEANUP_RUNS.with(|c| c.set(c.get() + 1)));
    });
    let label = format!(
        "{},{}",
        EFFECT_RUNS.with(Cell::get),
        CLEANUP_RUNS.with(Cell::get)
    );
    el("div", props! {"children" => label})
}

#[test]
fn effect_without_deps_reruns_every_patch() {
    reset_counters();
    let mut host = TestHost::immediate();

    host.render(comp!(effect_every_pass));
    assert_eq!(
        host.html(),
        "<div>0,0<!--0--></div><!--effect_every_pass--><!--root-->"
    );

    captured_pin().pin();
    assert_eq!(
        host.html(),
        "<div>1,0<!--0--></div><!--effect_every_pass--><!--root-->"
    );
    captured_pin().pin();
    assert_eq!(
        host.html(),
        "<div>2,1<!--0--></div><!--effect_every_pass--><!--root-->"
    );

    host.unmount();
    assert_eq!(EFFECT_RUNS.with(Cell::get), 3);
    assert_eq!(CLEANUP_RUNS.with(Cell::get), 3, "teardown runs the last cleanup");
}

fn effect_with_deps(_props: &Props) -> View {
    PIN.with(|slot| slot.borrow_mut().replace(use_pin()));
    let dep = DEP.with(Cell::get);
    use_effect(deps![dep], |scope| {
        EFFECT_RUNS.with(|c| c.set(c.get() + 1));
        scope.on_cleanup(|| CLEANUP_RUNS.with(|c| c.set(c.get() + 1)));
    });
    use_effect(deps![], |_scope| {
        ONCE_RUNS.with(|c| c.set(c.get() + 1));
    });
    el(
        "div",
        props! {"children" => vec![
            View::from(format!(
                "{},{},{}",
                EFFECT_RUNS.with(Cell::get),
                CLEANUP_RUNS.with(Cell::get),
                ONCE_RUNS.with(Cell::get)
            )),
            el("button", props! {"children" => "click"}),
        ]},
    )
}

#[test]
fn effect_deps_gate_reruns() {
    reset_counters();
    let mut host = TestHost::immediate();

    host.render(comp!(effect_with_deps));
    assert_eq!(
        host.html(),
        "<div>0,0,0<!--0--><button>click<!--0--></button><!--1--></div><!--effect_with_deps--><!--root-->"
    );

    captured_pin().pin();
    assert_eq!(
        host.html(),
        "<div>1,0,1<!--0--><button>click<!--0--></button><!--1--></div><!--effect_with_deps--><!--root-->"
    );

    // Unchanged dep: neither effect reruns, output is stable.
    captured_pin().pin();
    assert_eq!(
        host.html(),
        "<div>1,0,1<!--0--><button>click<!--0--></button><!--1--></div><!--effect_with_deps--><!--root-->"
    );

    DEP.with(|c| c.set(1));
    captured_pin().pin();
    assert_eq!(EFFECT_RUNS.with(Cell::get), 2);
    assert_eq!(CLEANUP_RUNS.with(Cell::get), 1);
    assert_eq!(ONCE_RUNS.with(Cell::get), 1);

    host.unmount();
    assert_eq!(EFFECT_RUNS.with(Cell::get), 2);
    assert_eq!(CLEANUP_RUNS.with(Cell::get), 2);
    assert_eq!(ONCE_RUNS.with(Cell::get), 1, "[] effects run once per lifetime");
}

fn nested_cleanup_child(_props: &Props) -> View {
    use_effect(deps![], |scope| {
        scope.on_cleanup(|| CLEANUP_RUNS.with(|c| c.set(c.get() + 1)));
    });
    View::from("leaf")
}

fn nested_cleanup_parent(_props: &Props) -> View {
    el("div", props! {"children" => comp!(nested_cleanup_child)})
}

#[test]
fn teardown_runs_descendant_cleanups_exactly_once() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(nested_cleanup_parent));
    assert_eq!(CLEANUP_RUNS.with(Cell::get), 0);

    host.render(el("div", props! {"children" => "gone"}));
    assert_eq!(
        CLEANUP_RUNS.with(Cell::get),
        1,
        "replacing the parent reaches the descendant's cleanup once"
    );
}

// ---- use_state -----------------------------------------------------------

fn stateful(_props: &Props) -> View {
    RENDERS.with(|c| c.set(c.get() + 1));
    let (num, set_num) = use_state(|| 0);
    SETTER.with(|slot| slot.borrow_mut().replace(set_num));
    el("div", props! {"children" => num.to_string()})
}

#[test]
fn state_setter_patches_in_place() {
    reset_counters();
    let host = TestHost::immediate();

    host.render(comp!(stateful));
    assert_eq!(host.html(), "<div>0<!--0--></div><!--stateful--><!--root-->");

    let setter = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    setter.set(1);
    assert_eq!(host.html(), "<div>1<!--0--></div><!--stateful--><!--root-->");
    setter.set(2);
    assert_eq!(host.html(), "<div>2<!--0--></div><!--stateful--><!--root-->");
    setter.update(|v| v + 2);
    assert_eq!(host.html(), "<div>4<!--0--></div><!--stateful--><!--root-->");
}

#[test]
fn setting_an_equal_value_schedules_nothing() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(stateful));
    assert_eq!(RENDERS.with(Cell::get), 1);

    let setter = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    setter.set(0);
    assert_eq!(RENDERS.with(Cell::get), 1, "no-op set must not re-render");
}

#[test]
fn batched_setters_collapse_into_one_patch() {
    reset_counters();
    let host = TestHost::new();
    host.render(comp!(stateful));
    assert_eq!(RENDERS.with(Cell::get), 1);

    let setter = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    setter.set(1);
    setter.set(5);
    assert_eq!(host.html(), "<div>0<!--0--></div><!--stateful--><!--root-->");
    assert!(host.has_pending());

    host.flush();
    assert_eq!(RENDERS.with(Cell::get), 2, "both sets collapse into one update");
    assert_eq!(host.html(), "<div>5<!--0--></div><!--stateful--><!--root-->");
    assert!(!host.has_pending());
}

#[test]
fn an_instance_torn_down_before_the_flush_never_updates() {
    reset_counters();
    let host = TestHost::new();
    host.render(comp!(stateful));
    let setter = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    setter.set(3);
    assert!(host.has_pending());

    // Replace the component before the flush runs.
    host.render(el("div", props! {"children" => "bare"}));
    host.flush();
    assert_eq!(
        RENDERS.with(Cell::get),
        1,
        "the queued update was cancelled by teardown"
    );
    assert_eq!(host.html(), "<div>bare<!--0--></div><!--root-->");
}

// ---- use_reducer ---------------------------------------------------------

fn reducing(_props: &Props) -> View {
    RENDERS.with(|c| c.set(c.get() + 1));
    // The reducer closure captures this render's count, proving the latest
    // one is applied by a dispatch that happens later.
    let renders = RENDERS.with(Cell::get) as i32;
    let (total, dispatch) = use_reducer(
        move |state: &i32, action: i32| state + action * renders,
        || 0,
    );
    DISPATCH.with(|slot| slot.borrow_mut().replace(dispatch));
    el("div", props! {"children" => total.to_string()})
}

#[test]
fn reducer_applies_the_latest_closure() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(reducing));
    assert_eq!(host.html(), "<div>0<!--0--></div><!--reducing--><!--root-->");

    let dispatch = DISPATCH.with(|slot| slot.borrow().clone()).expect("dispatch");
    dispatch.dispatch(1);
    // First dispatch ran the render-1 reducer: 0 + 1*1.
    assert_eq!(host.html(), "<div>1<!--0--></div><!--reducing--><!--root-->");
    dispatch.dispatch(1);
    // The re-render refreshed the reducer: 1 + 1*2.
    assert_eq!(host.html(), "<div>3<!--0--></div><!--reducing--><!--root-->");
}

#[test]
fn dispatching_an_identity_action_schedules_nothing() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(reducing));
    let dispatch = DISPATCH.with(|slot| slot.borrow().clone()).expect("dispatch");
    dispatch.dispatch(0);
    assert_eq!(RENDERS.with(Cell::get), 1, "unchanged state must not re-render");
}

// ---- use_memo / use_callback / use_ref -----------------------------------

fn memoizing(_props: &Props) -> View {
    PIN.with(|slot| slot.borrow_mut().replace(use_pin()));
    let dep = DEP.with(Cell::get);
    let value = use_memo(deps![dep], || {
        MEMO_COMPUTES.with(|c| c.set(c.get() + 1));
        dep * 10
    });
    el("div", props! {"children" => value.to_string()})
}

#[test]
fn memo_recomputes_only_when_deps_change() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(memoizing));
    assert_eq!(MEMO_COMPUTES.with(Cell::get), 1);

    captured_pin().pin();
    assert_eq!(MEMO_COMPUTES.with(Cell::get), 1, "same dep, no recompute");

    DEP.with(|c| c.set(2));
    captured_pin().pin();
    assert_eq!(MEMO_COMPUTES.with(Cell::get), 2);
    assert_eq!(host.html(), "<div>20<!--0--></div><!--memoizing--><!--root-->");
}

thread_local! {
    static LAST_CALLBACK: RefCell<Option<Handler>> = const { RefCell::new(None) };
    static CALLBACK_STABLE: Cell<bool> = const { Cell::new(true) };
}

fn callback_host(_props: &Props) -> View {
    PIN.with(|slot| slot.borrow_mut().replace(use_pin()));
    let dep = DEP.with(Cell::get);
    let handler = use_callback(deps![dep], || {});
    LAST_CALLBACK.with(|last| {
        let mut last = last.borrow_mut();
        if let Some(prev) = last.as_ref() {
            CALLBACK_STABLE.with(|stable| stable.set(*prev == handler));
        }
        *last = Some(handler.clone());
    });
    View::Empty
}

#[test]
fn callback_identity_is_stable_while_deps_hold() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(callback_host));
    captured_pin().pin();
    assert!(
        CALLBACK_STABLE.with(Cell::get),
        "same deps keep the handler identity"
    );
    DEP.with(|cell| cell.set(5));
    captured_pin().pin();
    assert!(
        !CALLBACK_STABLE.with(Cell::get),
        "changed deps produce a new handler"
    );
    drop(host);
}

fn counting_ref(_props: &Props) -> View {
    PIN.with(|slot| slot.borrow_mut().replace(use_pin()));
    let renders = use_ref(|| 0usize);
    renders.update(|count| *count += 1);
    el("div", props! {"children" => renders.get().to_string()})
}

#[test]
fn use_ref_is_stable_across_renders() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(counting_ref));
    assert_eq!(host.html(), "<div>1<!--0--></div><!--counting_ref--><!--root-->");
    captured_pin().pin();
    assert_eq!(host.html(), "<div>2<!--0--></div><!--counting_ref--><!--root-->");
}

// ---- usage errors --------------------------------------------------------

#[test]
#[should_panic(expected = "no active render context")]
fn hooks_outside_a_render_are_a_fatal_usage_error() {
    let _ = use_state(|| 0);
}

fn order_breaker(_props: &Props) -> View {
    PIN.with(|slot| slot.borrow_mut().replace(use_pin()));
    if DEP.with(Cell::get) == 0 {
        let _ = use_ref(|| 0i32);
    } else {
        let _ = use_state(|| 0i32);
    }
    View::Empty
}

#[test]
#[should_panic(expected = "hook order changed between renders")]
fn changing_hook_order_between_renders_panics() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(order_breaker));
    DEP.with(|c| c.set(1));
    captured_pin().pin();
}

thread_local! {
    static NODE_REF: RefCell<Option<anchor_core::NodeRef>> = const { RefCell::new(None) };
}

fn node_ref_host(_props: &Props) -> View {
    let target = anchor_core::use_node_ref();
    NODE_REF.with(|slot| slot.borrow_mut().replace(target.clone()));
    el("div", props! {"ref" => target, "children" => "x"})
}

#[test]
fn use_node_ref_is_slot_stable_and_receives_the_element() {
    reset_counters();
    let host = TestHost::immediate();
    host.render(comp!(node_ref_host));
    let target = NODE_REF.with(|slot| slot.borrow().clone()).expect("ref captured");
    let element = match target.current() {
        Some(anchor_core::RefTarget::Element(id)) => id,
        other => panic!("expected an element target, got {other:?}"),
    };
    assert_eq!(host.document().tag_of(element), "div");
}

fn self_updating(_props: &Props) -> View {
    let (num, set_num) = use_state(|| 0);
    if num == 0 {
        // With a synchronous runner this re-enters the render.
        set_num.set(1);
    }
    View::from(num)
}

#[test]
#[should_panic(expected = "re-entrant component render is not supported")]
fn setting_state_during_render_with_an_immediate_runner_panics() {
    let host = TestHost::immediate();
    host.render(comp!(self_updating));
}

thread_local! {
    static STASHED_DOC: RefCell<Option<(std::rc::Rc<anchor_core::MemoryDocument>, anchor_core::NodeId)>> =
        const { RefCell::new(None) };
    static CLEANUP_SAW_NODES: Cell<Option<bool>> = const { Cell::new(None) };
}

fn snapshot_leaf(_props: &Props) -> View {
    use_effect(deps![], |scope| {
        scope.on_cleanup(|| {
            let present = STASHED_DOC.with(|slot| {
                let borrow = slot.borrow();
                let (doc, body) = borrow.as_ref().expect("document stashed");
                doc.inner_html(*body).contains("leaf")
            });
            CLEANUP_SAW_NODES.with(|seen| seen.set(Some(present)));
        });
    });
    View::from("leaf")
}

#[test]
fn descendant_cleanup_runs_before_host_nodes_are_removed() {
    use anchor_core::{Document, MemoryDocument, Root};
    use anchor_testing::ImmediateRunner;

    let doc = std::rc::Rc::new(MemoryDocument::new());
    let body = doc.create_element("body");
    STASHED_DOC.with(|slot| slot.borrow_mut().replace((doc.clone(), body)));
    CLEANUP_SAW_NODES.with(|seen| seen.set(None));

    let root = Root::mount(doc.clone(), body, std::rc::Rc::new(ImmediateRunner));
    root.render(comp!(snapshot_leaf));
    assert!(doc.inner_html(body).contains("leaf"));

    root.render(el("div", props! {"children" => "other"}));
    assert_eq!(
        CLEANUP_SAW_NODES.with(Cell::get),
        Some(true),
        "the cleanup observed its host nodes still in the tree"
    );
    assert!(!doc.inner_html(body).contains("leaf"));
}
