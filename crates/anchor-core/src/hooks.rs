//! The hooks execution model.
//!
//! Hooks address per-instance slots by call order: the cursor resets to zero
//! when a render begins, so a component must call the same hooks in the same
//! order on every render. Exactly one component may be mid-render at a time;
//! the active instance lives in a thread-local slot installed for the
//! synchronous extent of the render call and restored by an RAII guard, so a
//! panicking render never leaves it dangling.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::ambient::Scope;
use crate::mount::{Instance, WeakInstance};
use crate::owned::Owned;
use crate::runner::PinHandle;
use crate::{Handler, NodeRef, Value};

/// Dependency record for effects, memos and callbacks. `None` re-runs every
/// pass; an empty list runs once; otherwise a shallow pairwise comparison
/// decides.
pub type Deps = Option<Vec<Value>>;

fn deps_changed(record: &Option<Deps>, next: &Deps) -> bool {
    match (record, next) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(None), Some(_)) => true,
        (Some(Some(prev)), Some(next)) => {
            prev.len() != next.len() || prev.iter().zip(next.iter()).any(|(a, b)| a != b)
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<ActiveFrame>> = const { RefCell::new(None) };
}

struct ActiveFrame {
    instance: Instance,
    cursor: Cell<usize>,
}

pub(crate) struct RenderGuard {
    _priv: (),
}

/// Install `instance` as the active hook target. Panics on re-entrant
/// rendering; the returned guard restores the slot even if the render
/// function unwinds.
pub(crate) fn enter_render(instance: Instance) -> RenderGuard {
    ACTIVE.with(|slot| {
        let mut slot = slot
            .try_borrow_mut()
            .unwrap_or_else(|_| panic!("re-entrant component render is not supported"));
        if slot.is_some() {
            panic!("re-entrant component render is not supported");
        }
        *slot = Some(ActiveFrame {
            instance,
            cursor: Cell::new(0),
        });
    });
    RenderGuard { _priv: () }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        ACTIVE.with(|slot| {
            *slot.borrow_mut() = None;
        });
    }
}

fn with_active<R>(f: impl FnOnce(&ActiveFrame) -> R) -> R {
    ACTIVE.with(|slot| {
        let borrow = slot.borrow();
        let frame = borrow
            .as_ref()
            .expect("no active render context; hooks may only be called while a component renders");
        f(frame)
    })
}

pub(crate) fn with_active_scope<R>(f: impl FnOnce(&Rc<Scope>) -> R) -> R {
    with_active(|frame| f(&frame.instance.scope()))
}

impl ActiveFrame {
    /// The slot at the current cursor, created on first use. A type mismatch
    /// means the component changed its hook order between renders.
    fn next_slot<T: 'static>(&self, init: impl FnOnce() -> T) -> Rc<T> {
        let index = self.cursor.get();
        self.cursor.set(index + 1);
        self.instance.inner.slots.slot(index, init)
    }
}

/// Ordered, cursor-addressed storage for one instance's hook slots.
#[derive(Default)]
pub(crate) struct HookStore {
    slots: RefCell<Vec<Rc<dyn Any>>>,
}

impl HookStore {
    fn slot<T: 'static>(&self, index: usize, init: impl FnOnce() -> T) -> Rc<T> {
        let existing = self.slots.borrow().get(index).cloned();
        match existing {
            Some(slot) => slot.downcast::<T>().unwrap_or_else(|_| {
                panic!("hook order changed between renders at slot {index}")
            }),
            None => {
                let created = Rc::new(init());
                let mut slots = self.slots.borrow_mut();
                debug_assert_eq!(index, slots.len());
                slots.push(created.clone());
                created
            }
        }
    }

    /// Run every effect slot's pending cleanup, in slot order.
    pub(crate) fn teardown(&self) {
        let slots: Vec<Rc<dyn Any>> = self.slots.borrow().clone();
        for slot in slots {
            if let Some(effect) = slot.downcast_ref::<EffectSlot>() {
                effect.run_cleanup();
            }
        }
    }
}

// ---- use_ref -------------------------------------------------------------

/// A mutable cell created once per slot; its identity is stable across
/// renders.
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> Owned<T> {
    with_active(|frame| {
        let slot = frame.next_slot(|| Owned::new(init()));
        (*slot).clone()
    })
}

/// Slot-stable object ref for wiring into a `ref` prop.
pub fn use_node_ref() -> NodeRef {
    with_active(|frame| {
        let slot = frame.next_slot(NodeRef::new);
        (*slot).clone()
    })
}

// ---- use_state -----------------------------------------------------------

struct StateSlot<T> {
    value: RefCell<T>,
}

/// Stable setter half of `use_state`. Setting an equal value is a no-op;
/// setting a different one stores it and schedules the owning instance —
/// never a synchronous re-render.
pub struct Setter<T> {
    slot: Rc<StateSlot<T>>,
    instance: WeakInstance,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            instance: self.instance.clone(),
        }
    }
}

impl<T> PartialEq for Setter<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: PartialEq + 'static> Setter<T> {
    pub fn set(&self, next: T) {
        let changed = {
            let mut value = self.slot.value.borrow_mut();
            if *value != next {
                *value = next;
                true
            } else {
                false
            }
        };
        if changed {
            self.instance.schedule();
        }
    }

    /// Updater form: compute the next value from the previous one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let value = self.slot.value.borrow();
            f(&value)
        };
        self.set(next);
    }
}

pub fn use_state<T>(init: impl FnOnce() -> T) -> (T, Setter<T>)
where
    T: Clone + PartialEq + 'static,
{
    with_active(|frame| {
        let slot = frame.next_slot(|| StateSlot {
            value: RefCell::new(init()),
        });
        let setter = Setter {
            slot: Rc::clone(&slot),
            instance: frame.instance.downgrade(),
        };
        let value = slot.value.borrow().clone();
        (value, setter)
    })
}

// ---- use_reducer ---------------------------------------------------------

struct ReducerSlot<S, A> {
    state: RefCell<S>,
    /// Refreshed every render so per-render closures stay current.
    reducer: RefCell<Rc<dyn Fn(&S, A) -> S>>,
}

/// Stable dispatch half of `use_reducer`: applies the latest reducer and
/// schedules iff the result differs.
pub struct Dispatch<S, A> {
    slot: Rc<ReducerSlot<S, A>>,
    instance: WeakInstance,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            instance: self.instance.clone(),
        }
    }
}

impl<S, A> PartialEq for Dispatch<S, A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<S: PartialEq + 'static, A: 'static> Dispatch<S, A> {
    pub fn dispatch(&self, action: A) {
        let reducer = self.slot.reducer.borrow().clone();
        let next = {
            let state = self.slot.state.borrow();
            reducer(&state, action)
        };
        let changed = {
            let mut state = self.slot.state.borrow_mut();
            if *state != next {
                *state = next;
                true
            } else {
                false
            }
        };
        if changed {
            self.instance.schedule();
        }
    }
}

pub fn use_reducer<S, A>(
    reducer: impl Fn(&S, A) -> S + 'static,
    init: impl FnOnce() -> S,
) -> (S, Dispatch<S, A>)
where
    S: Clone + PartialEq + 'static,
    A: 'static,
{
    with_active(|frame| {
        let reducer: Rc<dyn Fn(&S, A) -> S> = Rc::new(reducer);
        let slot = {
            let reducer = Rc::clone(&reducer);
            frame.next_slot(|| ReducerSlot {
                state: RefCell::new(init()),
                reducer: RefCell::new(reducer),
            })
        };
        *slot.reducer.borrow_mut() = reducer;
        let dispatch = Dispatch {
            slot: Rc::clone(&slot),
            instance: frame.instance.downgrade(),
        };
        let state = slot.state.borrow().clone();
        (state, dispatch)
    })
}

// ---- use_memo / use_callback ---------------------------------------------

struct MemoSlot<T> {
    record: RefCell<Option<Deps>>,
    value: RefCell<Option<T>>,
}

/// Recompute only when `deps` changed; a missing previous record always
/// counts as changed.
pub fn use_memo<T: Clone + 'static>(deps: Deps, compute: impl FnOnce() -> T) -> T {
    with_active(|frame| {
        let slot = frame.next_slot(|| MemoSlot::<T> {
            record: RefCell::new(None),
            value: RefCell::new(None),
        });
        let changed = deps_changed(&slot.record.borrow(), &deps);
        if changed {
            *slot.value.borrow_mut() = Some(compute());
            *slot.record.borrow_mut() = Some(deps);
        }
        let value = slot
            .value
            .borrow()
            .clone()
            .expect("memo slot holds a value after compute");
        value
    })
}

/// `use_memo` specialized to handlers, so event callbacks keep their identity
/// while deps are stable.
pub fn use_callback(deps: Deps, f: impl Fn() + 'static) -> Handler {
    use_memo(deps, move || Handler::new(f))
}

// ---- use_effect ----------------------------------------------------------

/// Handed to effects so they can register a cleanup, mirroring the teardown
/// registration shape used throughout this workspace.
#[derive(Default)]
pub struct EffectScope {
    cleanup: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl EffectScope {
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        *self.cleanup.borrow_mut() = Some(Box::new(cleanup));
    }

    fn take_cleanup(&self) -> Option<Box<dyn FnOnce()>> {
        self.cleanup.borrow_mut().take()
    }
}

pub(crate) struct EffectSlot {
    record: RefCell<Option<Deps>>,
    cleanup: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl EffectSlot {
    fn run_cleanup(&self) {
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

impl Drop for EffectSlot {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}

/// Register an effect for this render. It runs after the component's subtree
/// has been patched, and only when `deps` changed since the last run; the
/// previous cleanup runs first. The final cleanup runs on teardown.
pub fn use_effect(deps: Deps, effect: impl FnOnce(&EffectScope) + 'static) {
    with_active(|frame| {
        let slot = frame.next_slot(|| EffectSlot {
            record: RefCell::new(None),
            cleanup: RefCell::new(None),
        });
        frame.instance.push_effect(Box::new(move || {
            let changed = deps_changed(&slot.record.borrow(), &deps);
            if changed {
                slot.run_cleanup();
                let scope = EffectScope::default();
                effect(&scope);
                *slot.cleanup.borrow_mut() = scope.take_cleanup();
                *slot.record.borrow_mut() = Some(deps);
            }
        }));
    });
}

// ---- use_pin -------------------------------------------------------------

/// The instance's schedule-self handle: `pin()` marks it dirty for the next
/// flush, regardless of the prop short-circuit.
pub fn use_pin() -> PinHandle {
    with_active(|frame| PinHandle::new(frame.instance.downgrade()))
}

