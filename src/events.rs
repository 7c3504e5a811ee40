//! Event subscriptions and dispatch.
//!
//! Every listener registration returns a [`Subscription`]; dropping it
//! removes the listener. Components collect their subscriptions (and timer
//! and observer handles, which use the same type) into a [`Teardown`], so a
//! page can be unmounted deterministically.
//!
//! Dispatch follows the DOM model closely enough for the widgets: bubbling
//! events visit the target, each ancestor element, then the document and the
//! window, stopping early when a handler calls [`Event::stop_propagation`].

use crate::dom::{Dom, NodeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyDown,
    Input,
    Blur,
    Submit,
    Scroll,
    Resize,
    MouseEnter,
    MouseLeave,
    TouchStart,
    TouchEnd,
}

impl EventKind {
    pub fn bubbles(self) -> bool {
        matches!(
            self,
            Self::Click | Self::KeyDown | Self::Input | Self::Submit | Self::TouchStart | Self::TouchEnd
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Window,
    Document,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other(String),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Self::Enter,
            " " | "Spacebar" => Self::Space,
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn activates(&self) -> bool {
        matches!(self, Self::Enter | Self::Space)
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub target: Target,
    /// The target whose listeners are currently running.
    pub current: Target,
    pub key: Option<Key>,
    pub shift: bool,
    /// Horizontal pointer position, for touch events.
    pub client_x: f64,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(kind: EventKind, target: Target) -> Self {
        Self {
            kind,
            target,
            current: target,
            key: None,
            shift: false,
            client_x: 0.0,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn key_down(target: Target, key: Key) -> Self {
        let mut event = Self::new(EventKind::KeyDown, target);
        event.key = Some(key);
        event
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_client_x(mut self, x: f64) -> Self {
        self.client_x = x;
        self
    }

    pub fn target_node(&self) -> Option<NodeId> {
        match self.target {
            Target::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Disposer handle. Dropping it runs the disposer exactly once.
#[must_use = "dropping a Subscription disposes it immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    pub fn dispose(mut self) {
        if let Some(f) = self.dispose.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.dispose.take() {
            f();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.dispose.is_some())
            .finish()
    }
}

/// Everything a component registered, released together.
#[derive(Debug, Default)]
#[must_use = "dropping a Teardown unmounts the component"]
pub struct Teardown {
    subscriptions: Vec<Subscription>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn extend(&mut self, other: Teardown) {
        let mut other = other;
        self.subscriptions.append(&mut other.subscriptions);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn dispose(self) {
        drop(self);
    }
}

type Handler = Rc<dyn Fn(&mut Event)>;

struct Listener {
    id: u64,
    target: Target,
    kind: EventKind,
    handler: Handler,
}

/// Registry of event listeners for one page.
#[derive(Default)]
pub struct EventHub {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn listen<F>(self: &Rc<Self>, target: Target, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&mut Event) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push(Listener {
            id,
            target,
            kind,
            handler: Rc::new(handler),
        });
        let hub = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.listeners.borrow_mut().retain(|l| l.id != id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn has_listener(&self, target: Target, kind: EventKind) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|l| l.target == target && l.kind == kind)
    }

    /// Deliver `event` along its propagation path and return it, so callers
    /// can inspect [`Event::default_prevented`].
    pub fn dispatch(&self, dom: &dyn Dom, mut event: Event) -> Event {
        for step in propagation_path(dom, event.target, event.kind.bubbles()) {
            event.current = step;
            // Snapshot so handlers may register or dispose listeners.
            let handlers: Vec<Handler> = self
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.target == step && l.kind == event.kind)
                .map(|l| Rc::clone(&l.handler))
                .collect();
            for handler in handlers {
                handler(&mut event);
            }
            if event.propagation_stopped {
                break;
            }
        }
        event
    }
}

fn propagation_path(dom: &dyn Dom, target: Target, bubbles: bool) -> Vec<Target> {
    if !bubbles {
        return vec![target];
    }
    let mut path = Vec::new();
    if let Target::Node(node) = target {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if dom.tag_name(current).is_some() {
                path.push(Target::Node(current));
            }
            cursor = dom.parent(current);
        }
    }
    if target != Target::Window {
        path.push(Target::Document);
    }
    path.push(Target::Window);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    fn nested() -> (MemoryDocument, NodeId, NodeId) {
        let doc = MemoryDocument::new();
        let body = doc.body().unwrap();
        let outer = doc.append_element(body, "div", &[]).unwrap();
        let inner = doc.append_element(outer, "button", &[]).unwrap();
        (doc, outer, inner)
    }

    #[test]
    fn click_bubbles_to_ancestors_and_document() {
        let (doc, outer, inner) = nested();
        let hub = EventHub::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut subs = Teardown::new();
        for target in [Target::Node(inner), Target::Node(outer), Target::Document] {
            let seen = Rc::clone(&seen);
            subs.push(hub.listen(target, EventKind::Click, move |e| {
                seen.borrow_mut().push(e.current);
            }));
        }
        hub.dispatch(&doc, Event::new(EventKind::Click, Target::Node(inner)));
        assert_eq!(
            *seen.borrow(),
            vec![Target::Node(inner), Target::Node(outer), Target::Document]
        );
    }

    #[test]
    fn stop_propagation_halts_bubbling() {
        let (doc, outer, inner) = nested();
        let hub = EventHub::new();
        let reached = Rc::new(Cell::new(false));
        let _stop = hub.listen(Target::Node(inner), EventKind::Click, |e| e.stop_propagation());
        let flag = Rc::clone(&reached);
        let _outer = hub.listen(Target::Node(outer), EventKind::Click, move |_| flag.set(true));
        hub.dispatch(&doc, Event::new(EventKind::Click, Target::Node(inner)));
        assert!(!reached.get());
    }

    #[test]
    fn non_bubbling_events_stay_on_target() {
        let (doc, outer, inner) = nested();
        let hub = EventHub::new();
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);
        let _outer = hub.listen(Target::Node(outer), EventKind::Blur, move |_| flag.set(true));
        hub.dispatch(&doc, Event::new(EventKind::Blur, Target::Node(inner)));
        assert!(!reached.get());
    }

    #[test]
    fn dropping_subscription_removes_listener() {
        let hub = EventHub::new();
        let sub = hub.listen(Target::Window, EventKind::Scroll, |_| {});
        assert_eq!(hub.listener_count(), 1);
        drop(sub);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn teardown_disposes_everything() {
        let hub = EventHub::new();
        let mut teardown = Teardown::new();
        teardown.push(hub.listen(Target::Window, EventKind::Scroll, |_| {}));
        teardown.push(hub.listen(Target::Document, EventKind::Click, |_| {}));
        assert_eq!(hub.listener_count(), 2);
        teardown.dispose();
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn prevent_default_is_reported() {
        let (doc, _, inner) = nested();
        let hub = EventHub::new();
        let _sub = hub.listen(Target::Node(inner), EventKind::Submit, |e| e.prevent_default());
        let event = hub.dispatch(&doc, Event::new(EventKind::Submit, Target::Node(inner)));
        assert!(event.default_prevented());
    }

    #[test]
    fn key_mapping() {
        assert_eq!(Key::from_dom(" "), Key::Space);
        assert_eq!(Key::from_dom("Esc"), Key::Escape);
        assert!(Key::from_dom("Enter").activates());
        assert_eq!(Key::from_dom("q"), Key::Other("q".into()));
    }
}
