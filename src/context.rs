//! The capabilities a component is started with.
//!
//! A [`Context`] is built once per page and handed by reference to every
//! component's `init` function. Everything in it is reference-counted, so
//! event handlers clone the pieces they need into their closures.

use crate::config::{BehaviorConfig, SiteConfig};
use crate::dom::{Dom, DomError, NodeId};
use crate::env::{AnalyticsSink, KeyValueStore, Location, Viewport, Visibility};
use crate::events::{Event, EventHub, EventKind, Subscription, Target, Teardown};
use crate::schedule::Scheduler;
use std::rc::Rc;
use thiserror::Error;
use tracing::warn;

/// Failures inside a component.
///
/// Missing elements are not errors; components return an empty
/// [`Teardown`] instead.
#[derive(Error, Debug)]
pub enum UiError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Signature shared by every component entry point.
pub type InitFn = fn(&Context) -> Result<Teardown, UiError>;

/// Log a failure from inside an event handler, which has nowhere to
/// propagate it.
pub fn report<E: std::fmt::Display>(component: &str, result: Result<(), E>) {
    if let Err(err) = result {
        warn!(component, error = %err, "handler failed");
    }
}

#[derive(Clone)]
pub struct Context {
    pub config: Rc<SiteConfig>,
    pub dom: Rc<dyn Dom>,
    pub events: Rc<EventHub>,
    pub scheduler: Rc<dyn Scheduler>,
    pub viewport: Rc<dyn Viewport>,
    pub visibility: Rc<dyn Visibility>,
    /// `sessionStorage`.
    pub session: Rc<dyn KeyValueStore>,
    /// `localStorage`.
    pub local: Rc<dyn KeyValueStore>,
    pub analytics: Option<Rc<dyn AnalyticsSink>>,
    pub location: Location,
    /// `document.title`.
    pub title: String,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("location", &self.location)
            .field("events", &self.events)
            .field("analytics", &self.analytics.is_some())
            .finish()
    }
}

impl Context {
    pub fn behavior(&self) -> &BehaviorConfig {
        &self.config.behavior
    }

    /// Viewport is at or above the desktop breakpoint.
    pub fn is_desktop(&self) -> bool {
        self.viewport.width() >= self.config.behavior.desktop_breakpoint
    }

    pub fn listen<F>(&self, target: Target, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&mut Event) + 'static,
    {
        self.events.listen(target, kind, handler)
    }

    pub fn on<F>(&self, node: NodeId, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&mut Event) + 'static,
    {
        self.events.listen(Target::Node(node), kind, handler)
    }

    pub fn dispatch(&self, event: Event) -> Event {
        self.events.dispatch(&*self.dom, event)
    }

    /// Synthesize a click on `node`, like `element.click()`.
    pub fn click(&self, node: NodeId) -> Event {
        self.dispatch(Event::new(EventKind::Click, Target::Node(node)))
    }
}
