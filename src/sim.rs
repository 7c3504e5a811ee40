//! In-memory page harness.
//!
//! A [`Simulation`] wires the in-memory implementation of every capability
//! into one [`Context`], starts the page, and exposes the user gestures the
//! widgets respond to. The `render` command and the test suites drive pages
//! through it.
//!
//! ```rust,ignore
//! let mut sim = Simulation::from_html(&html, SimOptions::at("/contact.html"))?;
//! sim.start();
//! let email = sim.find("input[type=email]").unwrap();
//! sim.type_text(email, "not-an-email");
//! sim.blur(email);
//! sim.advance(1_000);
//! println!("{}", sim.html());
//! ```

use crate::app::{self, Startup};
use crate::config::SiteConfig;
use crate::context::{Context, UiError};
use crate::dom::{Dom, MemoryDocument, NodeId};
use crate::env::{
    AnalyticsSink, ImmediateVisibility, KeyValueStore, Location, MemoryAnalytics, MemoryStore,
    MemoryViewport, MemoryVisibility, Viewport, Visibility,
};
use crate::events::{Event, EventHub, EventKind, Key, Target};
use crate::schedule::{Millis, Scheduler, VirtualClock};
use std::rc::Rc;

/// Desktop-sized default window.
pub const DEFAULT_WIDTH: f64 = 1280.0;
pub const DEFAULT_HEIGHT: f64 = 800.0;

#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Page URL or site-relative path.
    pub url: String,
    pub width: f64,
    pub height: f64,
    /// Use intersection observation; `false` selects the immediate fallback.
    pub observer: bool,
    pub config: SiteConfig,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            url: "/".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            observer: true,
            config: SiteConfig::default(),
        }
    }
}

impl SimOptions {
    pub fn at(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn without_observer(mut self) -> Self {
        self.observer = false;
        self
    }

    pub fn with_config(mut self, config: SiteConfig) -> Self {
        self.config = config;
        self
    }
}

pub struct Simulation {
    pub doc: Rc<MemoryDocument>,
    pub clock: Rc<VirtualClock>,
    pub viewport: Rc<MemoryViewport>,
    /// `None` when running with the immediate visibility fallback.
    pub visibility: Option<Rc<MemoryVisibility>>,
    pub session: Rc<MemoryStore>,
    pub local: Rc<MemoryStore>,
    pub analytics: Rc<MemoryAnalytics>,
    pub ctx: Context,
    startup: Option<Startup>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("ctx", &self.ctx)
            .field("clock", &self.clock)
            .field("started", &self.startup.is_some())
            .finish()
    }
}

impl Simulation {
    pub fn new(doc: MemoryDocument, options: SimOptions) -> Result<Self, UiError> {
        let location = Location::parse(&options.url)
            .map_err(|e| UiError::Invalid(format!("invalid page URL {:?}: {e}", options.url)))?;
        let doc = Rc::new(doc);
        let clock = VirtualClock::new();
        let viewport = MemoryViewport::new(options.width, options.height);
        let observer = options.observer.then(MemoryVisibility::new);
        let visibility: Rc<dyn Visibility> = match &observer {
            Some(host) => Rc::clone(host) as Rc<dyn Visibility>,
            None => Rc::new(ImmediateVisibility),
        };
        let session = MemoryStore::new();
        let local = MemoryStore::new();
        let analytics = MemoryAnalytics::new();
        let title = doc
            .query("title")?
            .map(|t| doc.text(t).trim().to_string())
            .unwrap_or_default();
        let ctx = Context {
            config: Rc::new(options.config),
            dom: Rc::clone(&doc) as Rc<dyn Dom>,
            events: EventHub::new(),
            scheduler: Rc::clone(&clock) as Rc<dyn Scheduler>,
            viewport: Rc::clone(&viewport) as Rc<dyn Viewport>,
            visibility,
            session: Rc::clone(&session) as Rc<dyn KeyValueStore>,
            local: Rc::clone(&local) as Rc<dyn KeyValueStore>,
            analytics: Some(Rc::clone(&analytics) as Rc<dyn AnalyticsSink>),
            location,
            title,
        };
        Ok(Self {
            doc,
            clock,
            viewport,
            visibility: observer,
            session,
            local,
            analytics,
            ctx,
            startup: None,
        })
    }

    pub fn from_html(html: &str, options: SimOptions) -> Result<Self, UiError> {
        Self::new(MemoryDocument::from_html(html)?, options)
    }

    /// Run the startup sequence. Calling it twice is a no-op.
    pub fn start(&mut self) -> &Startup {
        self.startup.get_or_insert_with(|| app::start(&self.ctx))
    }

    /// Dispose every listener, timer and observation the page registered.
    pub fn stop(&mut self) {
        if let Some(startup) = self.startup.take() {
            startup.teardown.dispose();
        }
    }

    pub fn startup(&self) -> Option<&Startup> {
        self.startup.as_ref()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn find(&self, selector: &str) -> Option<NodeId> {
        self.doc.query(selector).ok().flatten()
    }

    pub fn find_all(&self, selector: &str) -> Vec<NodeId> {
        self.doc.query_all(None, selector).unwrap_or_default()
    }

    pub fn html(&self) -> String {
        self.doc.to_html()
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    pub fn click(&self, node: NodeId) -> Event {
        self.ctx.click(node)
    }

    /// Click on empty page space.
    pub fn click_document(&self) -> Event {
        match self.doc.body() {
            Some(body) => self.click(body),
            None => self
                .ctx
                .dispatch(Event::new(EventKind::Click, Target::Document)),
        }
    }

    pub fn key(&self, node: NodeId, key: Key) -> Event {
        self.ctx.dispatch(Event::key_down(Target::Node(node), key))
    }

    pub fn key_shift(&self, node: NodeId, key: Key) -> Event {
        self.ctx
            .dispatch(Event::key_down(Target::Node(node), key).with_shift(true))
    }

    /// Key press with focus on the document body.
    pub fn key_document(&self, key: Key) -> Event {
        let target = self.doc.body().map_or(Target::Document, Target::Node);
        self.ctx.dispatch(Event::key_down(target, key))
    }

    pub fn scroll_to(&self, y: f64) {
        self.viewport.set_scroll_y(y);
        self.ctx
            .dispatch(Event::new(EventKind::Scroll, Target::Window));
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.viewport.set_size(width, height);
        self.ctx
            .dispatch(Event::new(EventKind::Resize, Target::Window));
    }

    pub fn type_text(&self, node: NodeId, text: &str) {
        // Nodes that are not elements cannot hold a value; nothing to type into.
        if self.doc.set_value(node, text).is_ok() {
            self.ctx
                .dispatch(Event::new(EventKind::Input, Target::Node(node)));
        }
    }

    pub fn blur(&self, node: NodeId) -> Event {
        self.ctx
            .dispatch(Event::new(EventKind::Blur, Target::Node(node)))
    }

    pub fn submit(&self, form: NodeId) -> Event {
        self.ctx
            .dispatch(Event::new(EventKind::Submit, Target::Node(form)))
    }

    pub fn hover(&self, node: NodeId) {
        self.ctx
            .dispatch(Event::new(EventKind::MouseEnter, Target::Node(node)));
    }

    pub fn leave(&self, node: NodeId) {
        self.ctx
            .dispatch(Event::new(EventKind::MouseLeave, Target::Node(node)));
    }

    /// Horizontal touch gesture from `from_x` to `to_x`.
    pub fn swipe(&self, node: NodeId, from_x: f64, to_x: f64) {
        let target = Target::Node(node);
        self.ctx
            .dispatch(Event::new(EventKind::TouchStart, target).with_client_x(from_x));
        self.ctx
            .dispatch(Event::new(EventKind::TouchEnd, target).with_client_x(to_x));
    }

    /// Report `node` as `ratio` visible. No-op under the immediate fallback.
    pub fn show(&self, node: NodeId, ratio: f64) {
        if let Some(host) = &self.visibility {
            host.report(node, ratio);
        }
    }

    pub fn advance(&self, ms: Millis) {
        self.clock.advance(ms);
    }

    /// Run pending animation frames until none remain, up to `limit` ms.
    pub fn settle(&self, limit: Millis) {
        self.clock.run_frames(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::page;
    use maud::html;

    #[test]
    fn title_and_location_are_captured() {
        let html = page(html! { p { "hello" } });
        let sim = Simulation::from_html(&html, SimOptions::at("/blog/post.html?x=1")).unwrap();
        assert_eq!(sim.ctx.title, "Test Page");
        assert_eq!(sim.ctx.location.last_segment(), "post.html");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let html = page(html! {});
        let err = Simulation::from_html(&html, SimOptions::at("http://[::1")).unwrap_err();
        assert!(matches!(err, UiError::Invalid(_)));
    }

    #[test]
    fn context_shares_state_with_harness_handles() {
        let html = page(html! {});
        let sim = Simulation::from_html(&html, SimOptions::default()).unwrap();
        sim.ctx.local.set("cookie_consent", "accepted");
        assert_eq!(sim.local.get("cookie_consent").as_deref(), Some("accepted"));
        sim.session.set("emergency_banner_dismissed", "true");
        assert_eq!(
            sim.ctx.session.get("emergency_banner_dismissed").as_deref(),
            Some("true")
        );
        sim.viewport.set_scroll_y(320.0);
        assert_eq!(sim.ctx.viewport.scroll_y(), 320.0);
        assert!(sim.ctx.analytics.is_some());
    }

    #[test]
    fn stop_releases_all_listeners() {
        let mut sim = Simulation::from_html(&crate::page::reference_page(), SimOptions::default())
            .unwrap();
        sim.start();
        assert!(sim.ctx.events.listener_count() > 0);
        sim.stop();
        assert_eq!(sim.ctx.events.listener_count(), 0);
        assert_eq!(sim.clock.live_intervals(), 0);
        assert_eq!(sim.visibility.as_ref().unwrap().observed_count(), 0);
    }
}
