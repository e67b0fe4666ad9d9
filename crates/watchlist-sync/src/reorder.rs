//! Drag-and-drop reordering over plain id sequences
//!
//! `Idle -> Dragging -> (valid | invalid drop) -> Idle`. The controller keeps
//! the provisional order while dragging so the view can show it, and on a
//! valid drop emits the final ordered ids for the container that fired it.
//! No rendering types are involved.

/// The list a gesture happens in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReorderContainer {
    /// The user's watchlists (settings list)
    Watchlists,
    /// Items of one watchlist (list settings)
    Items { watchlist_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub container: ReorderContainer,
    pub dragged: String,
    /// Index of the dragged id when the drag started
    pub origin_index: usize,
    pub original: Vec<String>,
    /// Provisional order shown while dragging
    pub order: Vec<String>,
}

/// Ordered ids to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderCommit {
    pub container: ReorderContainer,
    pub ordered_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Commit(ReorderCommit),
    /// Dropped on itself, outside any container, or in another container.
    /// Carries the order to restore.
    Invalid { restored: Vec<String> },
    /// No drag in progress
    Ignored,
}

#[derive(Debug, Default)]
pub struct ReorderController {
    session: Option<DragSession>,
}

impl ReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Begin dragging `id` within `items`. A previous drag, if any, is dropped.
    /// Returns false (and stays idle) if `id` is not in `items`.
    pub fn start_drag(&mut self, container: ReorderContainer, items: Vec<String>, id: &str) -> bool {
        let Some(origin_index) = items.iter().position(|s| s == id) else {
            self.session = None;
            return false;
        };
        self.session = Some(DragSession {
            container,
            dragged: id.to_string(),
            origin_index,
            order: items.clone(),
            original: items,
        });
        true
    }

    /// Hover over `target` inside `container`; updates the provisional order.
    pub fn drag_over(&mut self, container: &ReorderContainer, target: &str) -> Option<&[String]> {
        let session = self.session.as_mut()?;
        if &session.container == container && target != session.dragged {
            place(&mut session.order, &session.dragged, session.origin_index, target);
        }
        Some(session.order.as_slice())
    }

    /// Finish the gesture. `target` is the container and item under the pointer,
    /// or `None` when released outside any container.
    pub fn drop(&mut self, target: Option<(&ReorderContainer, &str)>) -> DropOutcome {
        let Some(mut session) = self.session.take() else {
            return DropOutcome::Ignored;
        };

        match target {
            Some((container, id))
                if container == &session.container
                    && id != session.dragged
                    && session.order.iter().any(|s| s == id) =>
            {
                place(&mut session.order, &session.dragged, session.origin_index, id);
                DropOutcome::Commit(ReorderCommit {
                    container: session.container,
                    ordered_ids: session.order,
                })
            }
            _ => DropOutcome::Invalid {
                restored: session.original,
            },
        }
    }

    /// Abandon the drag (drag end without drop). Returns the order to restore.
    pub fn cancel(&mut self) -> Option<Vec<String>> {
        self.session.take().map(|s| s.original)
    }
}

/// Move `dragged` next to `target`: after it when the drag started above the
/// target, before it otherwise.
fn place(order: &mut Vec<String>, dragged: &str, origin_index: usize, target: &str) {
    let Some(target_index) = order.iter().position(|s| s == target) else {
        return;
    };
    let Some(from) = order.iter().position(|s| s == dragged) else {
        return;
    };
    let item = order.remove(from);
    // `target` cannot be `dragged`, so it is still present.
    let Some(anchor) = order.iter().position(|s| s == target) else {
        order.insert(from, item);
        return;
    };
    let insert_at = if origin_index < target_index {
        anchor + 1
    } else {
        anchor
    };
    order.insert(insert_at, item);
}
