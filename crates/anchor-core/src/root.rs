//! The root entry point tying a container, the reconciler, and a runner
//! together.

use std::rc::Rc;

use crate::ambient::Scope;
use crate::dom::{Document, NodeId};
use crate::mount::MountPoint;
use crate::runner::Runner;
use crate::View;

/// A mounted root. Dropping it leaves the rendered tree in place; call
/// [`Root::unmount`] to tear everything down. `unmount` consumes the root, so
/// a double unmount cannot be expressed.
pub struct Root {
    doc: Rc<dyn Document>,
    container: NodeId,
    marker: NodeId,
    mount: MountPoint,
}

impl Root {
    /// Clear the container's existing content, append the root marker, and
    /// return a root ready to render into the space before it.
    pub fn mount(doc: Rc<dyn Document>, container: NodeId, runner: Rc<dyn Runner>) -> Root {
        doc.clear_children(container);
        let marker = doc.create_marker("root");
        doc.insert_before(container, marker, None);
        let mount = MountPoint::new(Rc::clone(&doc), container, marker, runner, Scope::root());
        log::debug!("mounted root into node {container}");
        Root {
            doc,
            container,
            marker,
            mount,
        }
    }

    /// Patch the host tree to show `view`. Safe to call repeatedly with
    /// different trees; returns whether anything changed.
    pub fn render(&self, view: impl Into<View>) -> bool {
        self.mount.patch(&view.into())
    }

    /// Tear down all retained state and remove the root marker.
    pub fn unmount(self) {
        log::debug!("unmounting root from node {}", self.container);
        self.mount.clear_retained();
        self.doc.remove_child(self.container, self.marker);
    }
}
