//! # leadsite
//!
//! The interaction layer of a local-services lead generation website: the
//! sticky header, mobile menu and dropdowns, scroll reveals, the FAQ
//! accordion, the testimonial carousel, animated counters, contact-form
//! validation and schema.org structured data.
//!
//! # Architecture: Components Over Capabilities
//!
//! Every widget is a component with one entry point,
//! `fn(&Context) -> Result<Teardown, UiError>`. The [`context::Context`]
//! carries the capabilities a browser page offers, each behind a trait:
//!
//! ```text
//! Dom          query, mutate, measure the document
//! EventHub     listen and dispatch (bubbling)
//! Scheduler    timeouts, intervals, animation frames
//! Viewport     scroll position and window size
//! Visibility   intersection observation (or the immediate fallback)
//! Storage      localStorage / sessionStorage
//! Analytics    optional phone-click sink
//! ```
//!
//! Components never reach for globals, so the whole page runs against the
//! in-memory implementations in [`sim`] with a virtual clock. That is what
//! the tests drive, and what the `render` command uses to show the
//! document a page settles into.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dom`] | Document trait, selector engine, in-memory document, HTML import/export |
//! | [`events`] | Listener hub, bubbling dispatch, [`events::Subscription`] and [`events::Teardown`] |
//! | [`schedule`] | Scheduler trait, [`schedule::VirtualClock`], animation driver, frame gate, debouncer |
//! | [`env`] | Viewport, visibility, storage, analytics and page location |
//! | [`context`] | The capability bundle handed to every component |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`nav`] | Sticky header, mobile menu, dropdowns, active link |
//! | [`scroll`] | Reveal on scroll, back-to-top, mobile CTA bar, smooth anchors |
//! | [`accordion`] | FAQ accordion |
//! | [`carousel`] | Testimonial carousel |
//! | [`counter`] | Animated statistic counters |
//! | [`form`] | Contact-form validation and simulated submission |
//! | [`schema`] | `LocalBusiness` / `Service` JSON-LD injection |
//! | [`tracking`] | Phone-click analytics records |
//! | [`banners`] | Cookie-consent and emergency banners |
//! | [`router`] | Page classification and page-specific touches |
//! | [`app`] | Startup order, fault isolation, markup audit |
//! | [`sim`] | In-memory page harness |
//! | [`page`] | Reference page markup |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Teardown Handles Instead of Global Listeners
//!
//! Every registration (listener, timer, interval, observation) returns a
//! handle that undoes it on drop. A component returns all of its handles in
//! one [`events::Teardown`]; [`app::start`] gathers them for the page.
//! Stopping a page is a single `dispose`, and a test can assert that
//! nothing is left scheduled.
//!
//! ## Fault Isolation
//!
//! A component that fails to start is logged and skipped. The rest of the
//! page keeps working: a malformed carousel must not take the contact form
//! down with it. Handlers that fail at runtime log through
//! [`context::report`] for the same reason.
//!
//! ## The Document Is the State
//!
//! Open menus, active slides and field errors live in classes and ARIA
//! attributes on the document. Components keep only what the document
//! cannot hold (timers, the pending-frame flag, the current slide index), so
//! the rendered HTML is always an honest picture of the page.
//!
//! ## Time Is Injected
//!
//! Nothing reads a wall clock. Animations, debounces, carousel auto-advance
//! and notice fades all go through [`schedule::Scheduler`], so a test can
//! step through a two-second counter animation frame by frame.

pub mod accordion;
pub mod app;
pub mod banners;
pub mod carousel;
pub mod config;
pub mod context;
pub mod counter;
pub mod dom;
pub mod env;
pub mod events;
pub mod form;
pub mod nav;
pub mod output;
pub mod page;
pub mod router;
pub mod schedule;
pub mod schema;
pub mod scroll;
pub mod sim;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_helpers;
