//! Scene notifications
//!
//! Listeners are registered on the scene instance that emits to them and are
//! dropped with it; there is no process-wide registry.

use crate::sim::SceneState;

/// Events a gameplay scene publishes to its listeners
#[derive(Debug, Clone, Copy)]
pub enum SceneEvent<'a> {
    /// The scene finished spawning its entities and is ready to be driven
    Ready { scene: &'a SceneState },
}

impl SceneEvent<'_> {
    /// Topic name as seen by UI overlays
    pub fn topic(&self) -> &'static str {
        match self {
            SceneEvent::Ready { .. } => "current-scene-ready",
        }
    }
}

/// Handle returned by [`SceneEvents::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

type Listener = Box<dyn FnMut(&SceneEvent<'_>)>;

/// Synchronous observer list owned by one scene
#[derive(Default)]
pub struct SceneEvents {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u32,
}

impl std::fmt::Debug for SceneEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEvents")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl SceneEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it is called for every event emitted afterwards
    pub fn subscribe(&mut self, listener: impl FnMut(&SceneEvent<'_>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener in subscription order
    pub fn emit(&mut self, event: &SceneEvent<'_>) {
        log::debug!("Emitting {} to {} listener(s)", event.topic(), self.listeners.len());
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
