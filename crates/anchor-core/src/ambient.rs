//! Ambient value propagation.
//!
//! Every component instance owns one link of a singly linked scope chain;
//! descendants inherit the link, so a value provided on it is visible to the
//! subtree and nowhere else. Consumers search outward and fall back to the
//! ambient's default.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::collections::map::HashMap;
use crate::hooks;

pub(crate) type AmbientKey = usize;

static NEXT_AMBIENT_KEY: AtomicUsize = AtomicUsize::new(1);

fn next_ambient_key() -> AmbientKey {
    NEXT_AMBIENT_KEY.fetch_add(1, Ordering::Relaxed)
}

/// One link of the chain. Created per component mount; bindings are written
/// by `Ambient::provide` during that component's render.
pub(crate) struct Scope {
    parent: Option<Rc<Scope>>,
    bindings: RefCell<HashMap<AmbientKey, Rc<dyn Any>>>,
}

impl Scope {
    pub(crate) fn root() -> Rc<Scope> {
        Rc::new(Scope {
            parent: None,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn child_of(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            parent: Some(Rc::clone(parent)),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    fn bind(&self, key: AmbientKey, value: Rc<dyn Any>) {
        self.bindings.borrow_mut().insert(key, value);
    }

    fn lookup(&self, key: AmbientKey) -> Option<Rc<dyn Any>> {
        if let Some(value) = self.bindings.borrow().get(&key) {
            return Some(Rc::clone(value));
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(key))
    }
}

/// A named ambient value with a default provider.
pub struct Ambient<T: Clone + 'static> {
    key: AmbientKey,
    default: Rc<dyn Fn() -> T>,
}

impl<T: Clone + 'static> Clone for Ambient<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: Rc::clone(&self.default),
        }
    }
}

pub fn ambient_of<T: Clone + 'static>(default: impl Fn() -> T + 'static) -> Ambient<T> {
    Ambient {
        key: next_ambient_key(),
        default: Rc::new(default),
    }
}

impl<T: Clone + 'static> Ambient<T> {
    /// Bind `value` for the subtree below the currently rendering component.
    /// The binding sticks to the instance's scope link until overwritten.
    pub fn provide(&self, value: T) {
        let key = self.key;
        hooks::with_active_scope(|scope| scope.bind(key, Rc::new(value)));
    }

    /// Read the nearest provided value, searching the chain outward from the
    /// currently rendering component; falls back to the default.
    pub fn current(&self) -> T {
        let key = self.key;
        let found = hooks::with_active_scope(|scope| scope.lookup(key));
        match found {
            Some(value) => value
                .downcast_ref::<T>()
                .expect("ambient value type mismatch")
                .clone(),
            None => (self.default)(),
        }
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

