//! A small host harness for exercising the reconciler against an in-memory
//! document.

use std::rc::Rc;
use std::sync::Arc;

use anchor_core::{
    BatchRunner, Document, Instance, MemoryDocument, NodeId, NoopScheduler, Root, Runner, View,
};

/// Runner that applies every update synchronously instead of batching.
/// Torn-down instances are still skipped.
#[derive(Default)]
pub struct ImmediateRunner;

impl Runner for ImmediateRunner {
    fn add(&self, instance: Instance) {
        instance.update();
    }
}

/// A `MemoryDocument` with a mounted root and a runner, bundled for tests.
///
/// [`TestHost::new`] batches updates; call [`TestHost::flush`] to drain them.
/// [`TestHost::immediate`] applies updates synchronously instead.
pub struct TestHost {
    doc: Rc<MemoryDocument>,
    body: NodeId,
    root: Option<Root>,
    batch: Option<Rc<BatchRunner>>,
}

impl TestHost {
    pub fn new() -> Self {
        let runner = BatchRunner::new(Arc::new(NoopScheduler));
        Self::with_runner(runner.clone(), Some(runner))
    }

    pub fn immediate() -> Self {
        Self::with_runner(Rc::new(ImmediateRunner), None)
    }

    fn with_runner(runner: Rc<dyn Runner>, batch: Option<Rc<BatchRunner>>) -> Self {
        let doc = Rc::new(MemoryDocument::new());
        let body = doc.create_element("body");
        let root = Root::mount(doc.clone(), body, runner);
        Self {
            doc,
            body,
            root: Some(root),
            batch,
        }
    }

    pub fn render(&self, view: impl Into<View>) -> bool {
        self.root
            .as_ref()
            .expect("root is still mounted")
            .render(view)
    }

    /// Drain batched updates. A no-op for an immediate host.
    pub fn flush(&self) {
        if let Some(batch) = &self.batch {
            batch.flush();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.batch
            .as_ref()
            .map(|batch| batch.has_pending())
            .unwrap_or(false)
    }

    /// The body's serialized content, the shape assertions compare against.
    pub fn html(&self) -> String {
        self.doc.inner_html(self.body)
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Tear the root down; further renders panic.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            root.unmount();
        }
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}
