use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::model::{ResourceId, ResourceKind};
use crate::resource::ResourceModel;
use crate::route::{ListRoute, RouteMatch};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DrawerPhase {
    Closed,
    Open(ResourceId),
}

/// Logical drawer state. Whether the panel is actually drawn is a separate
/// question answered by [`DrawerState::visible_for`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DrawerState {
    pub enabled_by_user: bool,
    pub phase: DrawerPhase,
    pub viewport_wide: bool,
    pub current_route: String,
}

impl DrawerState {
    pub fn is_open(&self) -> bool {
        matches!(self.phase, DrawerPhase::Open(_))
    }

    pub fn target(&self) -> Option<&ResourceId> {
        match &self.phase {
            DrawerPhase::Open(id) => Some(id),
            DrawerPhase::Closed => None,
        }
    }

    pub fn visible_for(&self, route: &ListRoute) -> bool {
        self.enabled_by_user && self.is_open() && self.viewport_wide && route.matches(&self.current_route)
    }
}

type Listener = Box<dyn FnMut(&DrawerState)>;

struct StoreInner {
    state: RefCell<DrawerState>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
}

#[derive(Clone)]
pub struct DrawerStore {
    inner: Rc<StoreInner>,
}

impl Debug for DrawerStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawerStore")
            .field("state", &*self.inner.state.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl DrawerStore {
    pub fn new(enabled_by_user: bool, viewport_wide: bool, current_route: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(DrawerState {
                    enabled_by_user,
                    phase: DrawerPhase::Closed,
                    viewport_wide,
                    current_route: current_route.into(),
                }),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> DrawerState {
        self.inner.state.borrow().clone()
    }

    pub fn set_enabled_by_user(&self, enabled: bool) {
        self.write(|state| state.enabled_by_user = enabled);
    }

    /// Registers a listener that runs synchronously after every change. The
    /// listener is removed when the returned guard is dropped. Listeners must
    /// not subscribe or write to the store themselves.
    pub fn subscribe(&self, listener: impl FnMut(&DrawerState) + 'static) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Box::new(listener)));

        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn write(&self, update: impl FnOnce(&mut DrawerState)) -> bool {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.clone();
            update(&mut *state);
            *state != before
        };
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        let snapshot = self.state();
        for (_, listener) in self.inner.listeners.borrow_mut().iter_mut() {
            listener(&snapshot);
        }
    }
}

#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner
                .listeners
                .borrow_mut()
                .retain(|(listener, _)| *listener != self.id);
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Transition {
    SelectRow(ResourceId),
    CloseDrawer,
    ViewportResize { wide: bool },
    RouteChange(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Effect {
    ReplaceUrl(String),
}

#[derive(Debug, Clone)]
pub struct DrawerController {
    store: DrawerStore,
    route: ListRoute,
}

impl DrawerController {
    pub fn new(store: DrawerStore, cluster: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            store,
            route: ListRoute::new(cluster, kind),
        }
    }

    pub fn route(&self) -> &ListRoute {
        &self.route
    }

    pub fn state(&self) -> DrawerState {
        self.store.state()
    }

    pub fn visible(&self) -> bool {
        self.store.state().visible_for(&self.route)
    }

    pub fn dispatch(&self, transition: Transition) -> Vec<Effect> {
        let mut effects = Vec::new();
        let changed = self.store.write(|state| self.apply(state, transition, &mut effects));
        if changed {
            debug!(route = %self.route.path(), state = ?self.store.state().phase, "drawer transition");
        }
        effects
    }

    /// Applies one event-processing pass. A route change to another list or
    /// page cancels every row selection in the same pass, whatever the order.
    pub fn dispatch_batch(&self, transitions: Vec<Transition>) -> Vec<Effect> {
        let leaves_route = transitions.iter().any(|transition| {
            matches!(transition, Transition::RouteChange(path) if !self.route.matches(path))
        });

        let mut effects = Vec::new();
        self.store.write(|state| {
            for transition in transitions {
                if leaves_route && matches!(transition, Transition::SelectRow(_)) {
                    continue;
                }
                self.apply(state, transition, &mut effects);
            }
        });
        effects
    }

    /// The open target within the latest snapshot. A target that is no longer
    /// listed yields `None`; the drawer itself stays open.
    pub fn resolve_target<'a>(&self, snapshot: &'a [ResourceModel]) -> Option<&'a ResourceModel> {
        let state = self.store.state();
        let target = state.target()?;
        snapshot.iter().find(|model| model.id() == target)
    }

    fn apply(&self, state: &mut DrawerState, transition: Transition, effects: &mut Vec<Effect>) {
        match transition {
            Transition::SelectRow(id) => {
                if !self.can_open(state, &id) || !self.route.matches(&state.current_route) {
                    return;
                }
                let path = self.route.resource_path(&id);
                state.phase = DrawerPhase::Open(id);
                self.replace_url(state, path, effects);
            }
            Transition::CloseDrawer => {
                state.phase = DrawerPhase::Closed;
                if self.route.matches(&state.current_route) {
                    self.replace_url(state, self.route.path(), effects);
                }
            }
            Transition::ViewportResize { wide } => {
                state.viewport_wide = wide;
            }
            Transition::RouteChange(path) => {
                state.phase = match self.route.classify(&path) {
                    RouteMatch::Resource(id) if self.can_open(state, &id) => DrawerPhase::Open(id),
                    _ => DrawerPhase::Closed,
                };
                state.current_route = path;
            }
        }
    }

    fn can_open(&self, state: &DrawerState, id: &ResourceId) -> bool {
        state.enabled_by_user && state.viewport_wide && id.kind == self.route.kind
    }

    fn replace_url(&self, state: &mut DrawerState, path: String, effects: &mut Vec<Effect>) {
        if state.current_route != path {
            state.current_route = path.clone();
            effects.push(Effect::ReplaceUrl(path));
        }
    }
}
