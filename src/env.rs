//! Browser capabilities other than the document itself.
//!
//! Each capability is a small trait with an in-memory implementation:
//!
//! | Capability | Trait | In-memory |
//! |------------|-------|-----------|
//! | Window scroll position and size | [`Viewport`] | [`MemoryViewport`] |
//! | Intersection observation | [`Visibility`] | [`MemoryVisibility`], [`ImmediateVisibility`] |
//! | `localStorage` / `sessionStorage` | [`KeyValueStore`] | [`MemoryStore`] |
//! | Analytics collaborator | [`AnalyticsSink`] | [`MemoryAnalytics`], [`LogAnalytics`] |
//!
//! [`Location`] is the parsed page URL.

use crate::dom::NodeId;
use crate::events::Subscription;
use crate::tracking::TrackingEvent;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::info;

// =============================================================================
// Viewport
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

pub trait Viewport {
    /// Vertical scroll offset (`window.scrollY`).
    fn scroll_y(&self) -> f64;
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn scroll_to(&self, top: f64, behavior: ScrollBehavior);
}

#[derive(Debug)]
pub struct MemoryViewport {
    scroll_y: Cell<f64>,
    width: Cell<f64>,
    height: Cell<f64>,
    requests: RefCell<Vec<(f64, ScrollBehavior)>>,
}

impl MemoryViewport {
    pub fn new(width: f64, height: f64) -> Rc<Self> {
        Rc::new(Self {
            scroll_y: Cell::new(0.0),
            width: Cell::new(width),
            height: Cell::new(height),
            requests: RefCell::new(Vec::new()),
        })
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.scroll_y.set(y.max(0.0));
    }

    pub fn set_size(&self, width: f64, height: f64) {
        self.width.set(width);
        self.height.set(height);
    }

    /// Every `scroll_to` call so far, oldest first.
    pub fn scroll_requests(&self) -> Vec<(f64, ScrollBehavior)> {
        self.requests.borrow().clone()
    }
}

impl Viewport for MemoryViewport {
    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn width(&self) -> f64 {
        self.width.get()
    }

    fn height(&self) -> f64 {
        self.height.get()
    }

    fn scroll_to(&self, top: f64, behavior: ScrollBehavior) {
        self.requests.borrow_mut().push((top, behavior));
        self.set_scroll_y(top);
    }
}

// =============================================================================
// Visibility
// =============================================================================

/// Options for one observation, as an `IntersectionObserver` takes them.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserveOptions {
    /// Fraction of the element that must be visible.
    pub threshold: f64,
    pub root_margin: String,
}

impl ObserveOptions {
    pub fn threshold(threshold: f64) -> Self {
        Self {
            threshold,
            root_margin: "0px".to_string(),
        }
    }

    pub fn with_root_margin(mut self, margin: &str) -> Self {
        self.root_margin = margin.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub node: NodeId,
    /// Visible fraction of the element, `0.0..=1.0`.
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityKind {
    /// Real intersection observation.
    Observer,
    /// No observation support; callbacks fire once, immediately.
    Immediate,
}

pub type IntersectionCallback = Rc<dyn Fn(Intersection)>;

pub trait Visibility {
    fn kind(&self) -> VisibilityKind;

    /// Call `callback` whenever `node` crosses `options.threshold`.
    /// Dropping the returned subscription unobserves the node.
    fn observe(
        &self,
        node: NodeId,
        options: &ObserveOptions,
        callback: IntersectionCallback,
    ) -> Subscription;
}

/// Fallback for environments without intersection observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateVisibility;

impl Visibility for ImmediateVisibility {
    fn kind(&self) -> VisibilityKind {
        VisibilityKind::Immediate
    }

    fn observe(
        &self,
        node: NodeId,
        _options: &ObserveOptions,
        callback: IntersectionCallback,
    ) -> Subscription {
        callback(Intersection { node, ratio: 1.0 });
        Subscription::new(|| {})
    }
}

struct Observation {
    id: u64,
    node: NodeId,
    options: ObserveOptions,
    callback: IntersectionCallback,
}

type Observations = Rc<RefCell<Vec<Observation>>>;

/// Observer-backed visibility whose intersections are reported by hand.
#[derive(Default)]
pub struct MemoryVisibility {
    next_id: Cell<u64>,
    observations: Observations,
}

impl fmt::Debug for MemoryVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryVisibility")
            .field("observed", &self.observed_count())
            .finish()
    }
}

impl MemoryVisibility {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Report that `node` is now `ratio` visible.
    ///
    /// Observations whose threshold is met fire. A ratio of zero never
    /// counts as intersecting.
    pub fn report(&self, node: NodeId, ratio: f64) {
        if ratio <= 0.0 {
            return;
        }
        let due: Vec<IntersectionCallback> = self
            .observations
            .borrow()
            .iter()
            .filter(|o| o.node == node && ratio >= o.options.threshold)
            .map(|o| Rc::clone(&o.callback))
            .collect();
        for callback in due {
            callback(Intersection { node, ratio });
        }
    }

    pub fn observed_count(&self) -> usize {
        self.observations.borrow().len()
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.observations.borrow().iter().any(|o| o.node == node)
    }

    /// Options of the first observation on `node`.
    pub fn options_for(&self, node: NodeId) -> Option<ObserveOptions> {
        self.observations
            .borrow()
            .iter()
            .find(|o| o.node == node)
            .map(|o| o.options.clone())
    }
}

impl Visibility for MemoryVisibility {
    fn kind(&self) -> VisibilityKind {
        VisibilityKind::Observer
    }

    fn observe(
        &self,
        node: NodeId,
        options: &ObserveOptions,
        callback: IntersectionCallback,
    ) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.observations.borrow_mut().push(Observation {
            id,
            node,
            options: options.clone(),
            callback,
        });
        let observations: Weak<RefCell<Vec<Observation>>> = Rc::downgrade(&self.observations);
        Subscription::new(move || {
            if let Some(observations) = observations.upgrade() {
                observations.borrow_mut().retain(|o| o.id != id);
            }
        })
    }
}

// =============================================================================
// Storage
// =============================================================================

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_entries(entries: &[(&str, &str)]) -> Rc<Self> {
        let store = Self::default();
        for (k, v) in entries {
            store.set(k, v);
        }
        Rc::new(store)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

// =============================================================================
// Analytics
// =============================================================================

pub trait AnalyticsSink {
    fn track(&self, event: &TrackingEvent);
}

/// Keeps every tracked event for inspection.
#[derive(Debug, Default)]
pub struct MemoryAnalytics {
    events: RefCell<Vec<TrackingEvent>>,
}

impl MemoryAnalytics {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events.borrow().clone()
    }
}

impl AnalyticsSink for MemoryAnalytics {
    fn track(&self, event: &TrackingEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Writes each event as one JSON line to the `leadsite::analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn track(&self, event: &TrackingEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!(target: "leadsite::analytics", "{json}"),
            Err(err) => info!(target: "leadsite::analytics", error = %err, "unserializable event"),
        }
    }
}

// =============================================================================
// Location
// =============================================================================

/// The page URL, split into the parts components look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// `scheme://host[:port]`, empty for bare paths.
    pub origin: String,
    /// Always starts with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    /// Parse an absolute URL or a site-relative path such as
    /// `/contact.html?service=termite-control`.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let input = input.trim();
        let (parsed, origin) = match url::Url::parse(input) {
            Ok(parsed) => {
                let origin = parsed.origin().ascii_serialization();
                let origin = if origin == "null" { String::new() } else { origin };
                (parsed, origin)
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = url::Url::parse("http://localhost/")?;
                (base.join(input)?, String::new())
            }
            Err(err) => return Err(err),
        };
        let query = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self {
            origin,
            path: parsed.path().to_string(),
            query,
        })
    }

    /// Final path segment, empty at a directory root.
    pub fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            origin: String::new(),
            path: "/".to_string(),
            query: Vec::new(),
        }
    }
}
