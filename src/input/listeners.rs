use std::collections::HashMap;

/// Global event streams a component can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Pointer-down anywhere in the application. Listeners are passive, they
    /// never stop the event from reaching the rest of the UI.
    PointerDown,
    ViewportResize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Book-keeping of registered listeners for a host.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<ListenerHandle, ListenerKind>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ListenerKind) -> ListenerHandle {
        self.next_id += 1;
        let handle = ListenerHandle(self.next_id);
        self.listeners.insert(handle, kind);
        log::debug!("ListenerRegistry::add: {kind:?} as {handle:?}");
        handle
    }

    /// Returns `false` if `handle` was not registered.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        match self.listeners.remove(&handle) {
            Some(kind) => {
                log::debug!("ListenerRegistry::remove: {kind:?} {handle:?}");
                true
            }
            None => {
                log::warn!("ListenerRegistry::remove: unknown {handle:?}");
                false
            }
        }
    }

    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|registered| *registered == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
