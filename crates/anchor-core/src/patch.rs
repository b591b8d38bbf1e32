//! The reconciler core: diff one mount point against its next description.

use std::rc::Rc;

use crate::ambient::Scope;
use crate::hooks::enter_render;
use crate::mount::{
    ComponentRetained, ElementRetained, Instance, MountPoint, Retained, TextRetained,
};
use crate::runner::PinHandle;
use crate::{ComponentFn, NodeKind, Props, RefTarget, Value, VNode, View};

impl MountPoint {
    /// Patch the host tree so this mount point shows `next`. Returns whether
    /// any host mutation (beyond no-op attribute pass-throughs) happened.
    pub fn patch(&self, next: &View) -> bool {
        match next {
            View::Empty => self.patch_text(None),
            View::Text(text) => self.patch_text(Some(text)),
            View::Many(items) => self.patch_list(items),
            View::Node(node) => match node.kind {
                NodeKind::Element(ref tag) => self.patch_element(node, tag.clone()),
                NodeKind::Component { name, render } => self.patch_component(node, name, render),
            },
        }
    }

    fn patch_text(&self, text: Option<&str>) -> bool {
        let mut retained = self.retained().borrow_mut();
        if let (Some(Retained::Text(prev)), Some(next)) = (retained.as_ref(), text) {
            if prev.text == next {
                return false;
            }
        }
        let had_previous = retained.is_some();
        if let Some(prev) = retained.take() {
            prev.teardown(&self.document(), self.container());
        }
        match text {
            None => had_previous,
            Some(text) => {
                let doc = self.document();
                let node = doc.create_text(text);
                doc.insert_before(self.container(), node, Some(self.anchor()));
                *retained = Some(Retained::Text(TextRetained {
                    text: text.to_string(),
                    node,
                }));
                true
            }
        }
    }

    fn patch_element(&self, node: &VNode, tag: String) -> bool {
        let doc = self.document();
        let mut retained = self.retained().borrow_mut();
        let mut changed = false;

        let (element, prev_attrs, mut child_mounts) = match retained.take() {
            Some(Retained::Element(prev)) if prev.tag == tag && prev.key == node.key => {
                (prev.element, prev.attrs, prev.children)
            }
            prev => {
                if let Some(prev) = prev {
                    prev.teardown(&doc, self.container());
                }
                log::trace!("mount element <{tag}>");
                let element = doc.create_element(&tag);
                doc.insert_before(self.container(), element, Some(self.anchor()));
                changed = true;
                (element, Props::new(), Vec::new())
            }
        };

        // Children reconcile before the attribute diff.
        let next_children = node.props.children();
        if next_children.len() < child_mounts.len() {
            for child in child_mounts.drain(next_children.len()..) {
                child.clear_retained();
                doc.remove_child(element, child.anchor());
                changed = true;
            }
        }
        for (index, child_view) in next_children.iter().enumerate() {
            if index == child_mounts.len() {
                let marker = doc.create_marker(&index.to_string());
                doc.insert_before(element, marker, None);
                child_mounts.push(MountPoint::new(
                    Rc::clone(&doc),
                    element,
                    marker,
                    self.runner(),
                    self.scope(),
                ));
            }
            changed |= child_mounts[index].patch(child_view);
        }

        let next_attrs = node.props.attributes();
        for (name, value) in next_attrs.iter() {
            if name == "ref" {
                continue;
            }
            let prev = prev_attrs.get(name);
            if prev == Some(value) {
                continue;
            }
            if value.is_set() {
                if prev.is_some_and(Value::is_set) {
                    remove_prop(&doc, element, name, prev.unwrap());
                }
                set_prop(&doc, element, name, value);
                changed = true;
            } else if prev.is_some_and(Value::is_set) {
                remove_prop(&doc, element, name, prev.unwrap());
                changed = true;
            }
        }
        for (name, prev) in prev_attrs.iter() {
            if name == "ref" || next_attrs.get(name).is_some() {
                continue;
            }
            if prev.is_set() {
                remove_prop(&doc, element, name, prev);
                changed = true;
            }
        }

        // Refs are applied on every pass; only an identity change counts as a
        // mutation.
        if let Some(binding) = node.props.ref_binding() {
            changed |= prev_attrs.get("ref") != next_attrs.get("ref");
            binding.apply(RefTarget::Element(element));
        }

        *retained = Some(Retained::Element(ElementRetained {
            tag,
            key: node.key.clone(),
            element,
            attrs: next_attrs,
            children: child_mounts,
        }));
        changed
    }

    fn patch_component(&self, node: &VNode, name: &'static str, render: ComponentFn) -> bool {
        let doc = self.document();
        let mut retained = self.retained().borrow_mut();
        let kept = match retained.as_ref() {
            Some(Retained::Component(prev))
                if prev.instance.render_fn() == render && prev.key == node.key =>
            {
                Some(prev.instance.clone())
            }
            _ => None,
        };
        if let Some(instance) = kept {
            if instance.props_signature_eq(&node.props) {
                return false;
            }
            drop(retained);
            instance.set_props(node.props.clone());
            return instance.update();
        }
        if let Some(prev) = retained.take() {
            prev.teardown(&doc, self.container());
        }
        log::trace!("mount component <{name}>");
        let marker = doc.create_marker(name);
        doc.insert_before(self.container(), marker, Some(self.anchor()));
        let scope = Scope::child_of(&self.scope());
        let inner = MountPoint::new(
            Rc::clone(&doc),
            self.container(),
            marker,
            self.runner(),
            Rc::clone(&scope),
        );
        let instance = Instance::new(name, render, node.props.clone(), inner, scope);
        *retained = Some(Retained::Component(ComponentRetained {
            key: node.key.clone(),
            instance: instance.clone(),
        }));
        drop(retained);
        instance.update();
        true
    }
}

fn set_prop(doc: &Rc<dyn crate::Document>, element: crate::NodeId, name: &str, value: &Value) {
    match value {
        Value::Handler(handler) => {
            doc.set_handler(element, &name.to_lowercase(), handler.clone());
        }
        _ => doc.set_attribute(element, name, &value.attr_text()),
    }
}

fn remove_prop(doc: &Rc<dyn crate::Document>, element: crate::NodeId, name: &str, prev: &Value) {
    match prev {
        Value::Handler(_) => doc.remove_handler(element, &name.to_lowercase()),
        _ => doc.remove_attribute(element, name),
    }
}

impl Instance {
    /// Re-evaluate this component: render, apply any ref, patch the returned
    /// view into the inner mount point, then run the effects registered
    /// during this render exactly once. Runner-driven updates land here and
    /// bypass the prop short-circuit by construction.
    pub fn update(&self) -> bool {
        if !self.is_alive() {
            return false;
        }
        let props = self.inner.props.borrow().clone();
        self.inner.effects.borrow_mut().clear();
        let view = {
            let guard = enter_render(self.clone());
            let render_props = props.without_ref();
            let view = (self.inner.render)(&render_props);
            drop(guard);
            view
        };
        if let Some(binding) = props.ref_binding() {
            binding.apply(RefTarget::Component(PinHandle::new(self.downgrade())));
        }
        let changed = self.inner.mount.patch(&view);
        let effects: Vec<_> = self.inner.effects.borrow_mut().drain(..).collect();
        for effect in effects {
            effect();
        }
        changed
    }
}

