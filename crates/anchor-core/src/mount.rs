//! Mount points and the retained state kept between renders.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ambient::Scope;
use crate::dom::{Document, NodeId};
use crate::hooks::HookStore;
use crate::list::ListRetained;
use crate::runner::Runner;
use crate::{ComponentFn, Props};

static NEXT_INSTANCE_ID: AtomicUsize = AtomicUsize::new(1);

fn next_instance_id() -> usize {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A location in the host tree plus whatever was rendered there last.
///
/// Child mount points are owned by their parent's retained record and die
/// with it.
#[derive(Clone)]
pub struct MountPoint {
    inner: Rc<MountInner>,
}

pub(crate) struct MountInner {
    doc: Rc<dyn Document>,
    container: NodeId,
    anchor: NodeId,
    retained: RefCell<Option<Retained>>,
    runner: Rc<dyn Runner>,
    scope: Rc<Scope>,
}

impl MountPoint {
    pub(crate) fn new(
        doc: Rc<dyn Document>,
        container: NodeId,
        anchor: NodeId,
        runner: Rc<dyn Runner>,
        scope: Rc<Scope>,
    ) -> Self {
        Self {
            inner: Rc::new(MountInner {
                doc,
                container,
                anchor,
                retained: RefCell::new(None),
                runner,
                scope,
            }),
        }
    }

    pub(crate) fn document(&self) -> Rc<dyn Document> {
        Rc::clone(&self.inner.doc)
    }

    pub(crate) fn container(&self) -> NodeId {
        self.inner.container
    }

    /// The marker (or boundary node) content is inserted before.
    pub(crate) fn anchor(&self) -> NodeId {
        self.inner.anchor
    }

    pub(crate) fn runner(&self) -> Rc<dyn Runner> {
        Rc::clone(&self.inner.runner)
    }

    pub(crate) fn scope(&self) -> Rc<Scope> {
        Rc::clone(&self.inner.scope)
    }

    pub(crate) fn retained(&self) -> &RefCell<Option<Retained>> {
        &self.inner.retained
    }

    /// Tear down whatever is currently rendered here.
    pub(crate) fn clear_retained(&self) {
        let retained = self.inner.retained.borrow_mut().take();
        if let Some(retained) = retained {
            retained.teardown(&self.inner.doc, self.inner.container);
        }
    }
}

/// The previous render's bookkeeping, one variant per virtual-node shape.
/// At most one lives per mount point; replacing it runs the old teardown.
pub(crate) enum Retained {
    Text(TextRetained),
    List(ListRetained),
    Element(ElementRetained),
    Component(ComponentRetained),
}

impl Retained {
    /// Recursively run descendants' teardown and effect cleanups, then remove
    /// the host nodes this record contributed.
    pub(crate) fn teardown(self, doc: &Rc<dyn Document>, container: NodeId) {
        match self {
            Retained::Text(text) => {
                doc.remove_child(container, text.node);
            }
            Retained::List(list) => list.teardown(doc, container),
            Retained::Element(element) => {
                for child in &element.children {
                    child.clear_retained();
                    doc.remove_child(element.element, child.anchor());
                }
                doc.remove_child(container, element.element);
            }
            Retained::Component(component) => component.instance.teardown(),
        }
    }
}

pub(crate) struct TextRetained {
    pub(crate) text: String,
    pub(crate) node: NodeId,
}

pub(crate) struct ElementRetained {
    pub(crate) tag: String,
    pub(crate) key: Option<String>,
    pub(crate) element: NodeId,
    /// Last attribute set, `children` excluded, `ref` included.
    pub(crate) attrs: Props,
    pub(crate) children: Vec<MountPoint>,
}

pub(crate) struct ComponentRetained {
    pub(crate) key: Option<String>,
    pub(crate) instance: Instance,
}

/// A live component: render function, latest props, hook slots, and the inner
/// mount point bracketed by the instance's trailing marker.
#[derive(Clone)]
pub struct Instance {
    pub(crate) inner: Rc<InstanceInner>,
}

pub(crate) struct InstanceInner {
    pub(crate) id: usize,
    pub(crate) name: &'static str,
    pub(crate) render: ComponentFn,
    pub(crate) props: RefCell<Props>,
    pub(crate) mount: MountPoint,
    pub(crate) slots: HookStore,
    pub(crate) effects: RefCell<Vec<Box<dyn FnOnce()>>>,
    pub(crate) scope: Rc<Scope>,
    pub(crate) alive: Cell<bool>,
}

impl Instance {
    pub(crate) fn new(
        name: &'static str,
        render: ComponentFn,
        props: Props,
        mount: MountPoint,
        scope: Rc<Scope>,
    ) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                id: next_instance_id(),
                name,
                render,
                props: RefCell::new(props),
                mount,
                slots: HookStore::default(),
                effects: RefCell::new(Vec::new()),
                scope,
                alive: Cell::new(true),
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn is_alive(&self) -> bool {
        self.inner.alive.get()
    }

    pub(crate) fn render_fn(&self) -> ComponentFn {
        self.inner.render
    }

    pub(crate) fn set_props(&self, props: Props) {
        *self.inner.props.borrow_mut() = props;
    }

    pub(crate) fn props_signature_eq(&self, next: &Props) -> bool {
        self.inner.props.borrow().signature_eq(next)
    }

    pub(crate) fn scope(&self) -> Rc<Scope> {
        Rc::clone(&self.inner.scope)
    }

    pub(crate) fn push_effect(&self, effect: Box<dyn FnOnce()>) {
        self.inner.effects.borrow_mut().push(effect);
    }

    /// Mark this instance dirty with its runner.
    pub fn schedule(&self) {
        self.inner.mount.runner().add(self.clone());
    }

    pub(crate) fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.inner))
    }

    /// Teardown: effect cleanups first (in slot order), then the inner
    /// subtree, then the trailing marker. Host nodes are only removed after
    /// every cleanup below has run.
    pub(crate) fn teardown(&self) {
        if !self.inner.alive.replace(false) {
            return;
        }
        log::trace!("unmount component <{}>", self.inner.name);
        self.inner.slots.teardown();
        self.inner.mount.clear_retained();
        let mount = &self.inner.mount;
        mount
            .document()
            .remove_child(mount.container(), mount.anchor());
        self.inner.effects.borrow_mut().clear();
    }
}

#[derive(Clone)]
pub(crate) struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub(crate) fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(|inner| Instance { inner })
    }

    /// Schedule if the instance is still mounted; stale handles are inert.
    pub(crate) fn schedule(&self) {
        if let Some(instance) = self.upgrade() {
            if instance.is_alive() {
                instance.schedule();
            }
        }
    }

    pub(crate) fn ptr_eq(&self, other: &WeakInstance) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}
