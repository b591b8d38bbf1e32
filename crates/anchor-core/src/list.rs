//! Keyed sequence reconciliation.
//!
//! A rendered sequence is bracketed by a pair of boundary markers; each
//! position owns an ordinal marker, and each item's content is anchored at a
//! key marker sitting just before the position's ordinal marker:
//!
//! ```text
//! <!--a.s--> item0… <!--k0--> <!--i0--> item1… <!--k1--> <!--i1--> <!--a.e-->
//! ```
//!
//! Keyed matching keeps an item's mount point (and with it component state
//! and effect cleanups) alive across reorders by physically moving the host
//! nodes between the surrounding ordinal markers.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::collections::map::{HashMap, HashSet};
use crate::dom::{Document, NodeId};
use crate::mount::{MountPoint, Retained};
use crate::View;

const LIST_START: &str = "a.s";
const LIST_END: &str = "a.e";

pub(crate) struct ListRetained {
    pub(crate) start: NodeId,
    pub(crate) end: NodeId,
    /// Ordinal markers, one per position, fixed in document order.
    pub(crate) positions: SmallVec<[NodeId; 8]>,
    pub(crate) items: Vec<ListItem>,
}

pub(crate) struct ListItem {
    pub(crate) mount: MountPoint,
    pub(crate) key: Option<String>,
}

impl ListRetained {
    pub(crate) fn teardown(self, doc: &Rc<dyn Document>, container: NodeId) {
        for item in self.items {
            item.mount.clear_retained();
            doc.remove_child(container, item.mount.anchor());
        }
        for marker in self.positions {
            doc.remove_child(container, marker);
        }
        doc.remove_child(container, self.start);
        doc.remove_child(container, self.end);
    }
}

/// Keyed matching applies only when every item carries a key and no key
/// repeats; otherwise the whole sequence matches positionally.
fn key_valid(items: &[View]) -> bool {
    let mut seen = HashSet::new();
    items.iter().all(|item| match item.key() {
        Some(key) => seen.insert(key.to_string()),
        None => false,
    })
}

/// The host nodes strictly between `from` and `to`: an item's content plus
/// its key marker.
fn range_between(
    doc: &Rc<dyn Document>,
    container: NodeId,
    from: NodeId,
    to: NodeId,
) -> SmallVec<[NodeId; 8]> {
    let mut range = SmallVec::new();
    let mut cursor = doc.next_sibling(container, from);
    while let Some(node) = cursor {
        if node == to {
            break;
        }
        range.push(node);
        cursor = doc.next_sibling(container, node);
    }
    range
}

struct Reusable {
    mount: MountPoint,
    range: SmallVec<[NodeId; 8]>,
}

impl MountPoint {
    pub(crate) fn patch_list(&self, items: &[View]) -> bool {
        let doc = self.document();
        let container = self.container();
        let mut retained = self.retained().borrow_mut();
        let mut changed = false;

        let mut list = match retained.take() {
            Some(Retained::List(list)) => list,
            prev => {
                if let Some(prev) = prev {
                    prev.teardown(&doc, container);
                }
                let start = doc.create_marker(LIST_START);
                doc.insert_before(container, start, Some(self.anchor()));
                let end = doc.create_marker(LIST_END);
                doc.insert_before(container, end, Some(self.anchor()));
                changed = true;
                ListRetained {
                    start,
                    end,
                    positions: SmallVec::new(),
                    items: Vec::new(),
                }
            }
        };

        let keyed = key_valid(items);
        let prev_keys: Vec<Option<String>> =
            list.items.iter().map(|item| item.key.clone()).collect();

        // Salvage previous items whose key survives, capturing their host
        // range before any mutation disturbs sibling order.
        let mut reusable: HashMap<String, Reusable> = HashMap::new();
        if keyed {
            let next_keys: HashSet<&str> = items.iter().filter_map(View::key).collect();
            let mut dropped = Vec::new();
            for (index, item) in list.items.drain(..).enumerate() {
                match item.key.as_deref() {
                    Some(key) if next_keys.contains(key) => {
                        let from = if index == 0 {
                            list.start
                        } else {
                            list.positions[index - 1]
                        };
                        let range = range_between(&doc, container, from, list.positions[index]);
                        reusable.insert(key.to_string(), Reusable { mount: item.mount, range });
                    }
                    _ => dropped.push(item),
                }
            }
            for item in dropped {
                item.mount.clear_retained();
                doc.remove_child(container, item.mount.anchor());
                changed = true;
            }
        } else if items.len() < list.items.len() {
            for item in list.items.drain(items.len()..) {
                item.mount.clear_retained();
                doc.remove_child(container, item.mount.anchor());
                changed = true;
            }
        }

        let mut next_items = Vec::with_capacity(items.len());
        for (index, view) in items.iter().enumerate() {
            if index == list.positions.len() {
                let marker = doc.create_marker(&format!("i{index}"));
                doc.insert_before(container, marker, Some(list.end));
                list.positions.push(marker);
            }
            let position = list.positions[index];
            let key = view.key().map(str::to_string);

            let mount = if keyed {
                match key.as_deref().and_then(|key| reusable.remove(key)) {
                    Some(Reusable { mount, range }) => {
                        let moved = prev_keys.get(index) != Some(&key);
                        if moved {
                            for node in range {
                                doc.insert_before(container, node, Some(position));
                            }
                            changed = true;
                        }
                        mount
                    }
                    None => {
                        changed = true;
                        self.new_item_mount(&doc, container, position, key.as_deref())
                    }
                }
            } else if let Some(existing) = list.items.get(index) {
                existing.mount.clone()
            } else {
                changed = true;
                self.new_item_mount(&doc, container, position, key.as_deref())
            };

            changed |= mount.patch(view);
            next_items.push(ListItem { mount, key });
        }

        list.items = next_items;

        while list.positions.len() > items.len() {
            let marker = list.positions.pop().expect("surplus position marker");
            doc.remove_child(container, marker);
            changed = true;
        }

        *retained = Some(Retained::List(list));
        changed
    }

    fn new_item_mount(
        &self,
        doc: &Rc<dyn Document>,
        container: NodeId,
        position: NodeId,
        key: Option<&str>,
    ) -> MountPoint {
        let marker = doc.create_marker(key.unwrap_or("?"));
        doc.insert_before(container, marker, Some(position));
        MountPoint::new(
            Rc::clone(doc),
            container,
            marker,
            self.runner(),
            self.scope(),
        )
    }
}

