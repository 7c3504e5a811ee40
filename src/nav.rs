//! Navigation: sticky header, mobile menu, dropdown submenus and
//! active-link marking.
//!
//! ## State classes
//!
//! | Element | Class | Meaning |
//! |---------|-------|---------|
//! | `.site-header` | `scrolled` | page scrolled past `behavior.scroll_threshold` |
//! | `.hamburger` | `active` | mobile menu open |
//! | `.main-nav` | `open` | mobile menu open |
//! | `.nav-overlay` | `active` | mobile menu open |
//! | `body` | `nav-open` | page scroll locked |
//! | `li.has-dropdown` | `dropdown-open` | submenu shown |
//! | `.nav-link`, `li.has-dropdown`, `a.dropdown-toggle` | `active` | current page |
//!
//! Open/closed state lives in these classes and the matching `aria-expanded`
//! attributes; nothing is cached on the Rust side, so the document is always
//! the source of truth.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, DomError, NodeId};
use crate::events::{EventKind, Key, Subscription, Target, Teardown};
use crate::schedule::{Debouncer, FrameGate};
use std::rc::Rc;
use tracing::debug;

const HAMBURGER: &[&str] = &[".hamburger", "#hamburgerBtn"];
const MAIN_NAV: &[&str] = &[".main-nav", "#mainNav"];
const OVERLAY: &[&str] = &[".nav-overlay", "#navOverlay"];
const DROPDOWN: &str = "li.has-dropdown";
const DROPDOWN_OPEN: &str = "dropdown-open";

/// Identifier of the home page.
pub const HOME: &str = "index";

// =============================================================================
// Sticky header
// =============================================================================

/// Toggle `scrolled` on `.site-header`, at most once per frame.
pub fn init_sticky_header(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let Some(header) = ctx.dom.query(".site-header")? else {
        return Ok(teardown);
    };

    let update: Rc<dyn Fn()> = {
        let dom = Rc::clone(&ctx.dom);
        let viewport = Rc::clone(&ctx.viewport);
        let threshold = ctx.behavior().scroll_threshold;
        Rc::new(move || {
            let scrolled = viewport.scroll_y() > threshold;
            report("sticky-header", dom.toggle_class(header, "scrolled", scrolled));
        })
    };
    update();

    let gate = FrameGate::new(Rc::clone(&ctx.scheduler));
    teardown.push(gate.cancel_on_drop());
    teardown.push(ctx.listen(Target::Window, EventKind::Scroll, move |_| {
        let update = Rc::clone(&update);
        gate.schedule(move || update());
    }));
    Ok(teardown)
}

// =============================================================================
// Mobile menu
// =============================================================================

struct MobileMenu {
    dom: Rc<dyn Dom>,
    hamburger: NodeId,
    nav: Option<NodeId>,
    overlay: NodeId,
    body: Option<NodeId>,
}

impl MobileMenu {
    fn is_open(&self) -> bool {
        match self.nav {
            Some(nav) => self.dom.has_class(nav, "open"),
            None => self.dom.has_class(self.hamburger, "active"),
        }
    }

    fn set(&self, open: bool) -> Result<(), DomError> {
        self.dom.toggle_class(self.hamburger, "active", open)?;
        self.dom
            .set_attr(self.hamburger, "aria-expanded", if open { "true" } else { "false" })?;
        if let Some(nav) = self.nav {
            self.dom.toggle_class(nav, "open", open)?;
        }
        self.dom.toggle_class(self.overlay, "active", open)?;
        if let Some(body) = self.body {
            self.dom.toggle_class(body, "nav-open", open)?;
        }
        if !open {
            close_all_dropdowns(&*self.dom)?;
        }
        debug!(open, "mobile menu");
        Ok(())
    }

    fn toggle(&self) -> Result<(), DomError> {
        self.set(!self.is_open())
    }
}

/// Hamburger-driven off-canvas menu with a dimming overlay.
///
/// Creates `div.nav-overlay` when the page has none.
pub fn init_mobile_menu(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let Some(hamburger) = dom.query_first_of(HAMBURGER)? else {
        return Ok(teardown);
    };
    let nav = dom.query_first_of(MAIN_NAV)?;
    let body = dom.body();
    let overlay = match dom.query_first_of(OVERLAY)? {
        Some(overlay) => overlay,
        None => {
            let overlay = dom.create_element("div");
            dom.set_attr(overlay, "class", "nav-overlay")?;
            dom.set_attr(overlay, "aria-hidden", "true")?;
            if let Some(body) = body {
                dom.append_child(body, overlay)?;
            }
            overlay
        }
    };
    dom.set_attr(hamburger, "aria-expanded", "false")?;

    let menu = Rc::new(MobileMenu {
        dom: Rc::clone(dom),
        hamburger,
        nav,
        overlay,
        body,
    });

    let m = Rc::clone(&menu);
    teardown.push(ctx.on(hamburger, EventKind::Click, move |event| {
        event.stop_propagation();
        report("mobile-menu", m.toggle());
    }));

    let m = Rc::clone(&menu);
    teardown.push(ctx.on(overlay, EventKind::Click, move |_| {
        report("mobile-menu", m.set(false));
    }));

    let m = Rc::clone(&menu);
    teardown.push(ctx.listen(Target::Document, EventKind::KeyDown, move |event| {
        if event.key == Some(Key::Escape) && m.is_open() {
            let result = m.set(false).and_then(|()| m.dom.focus(m.hamburger));
            report("mobile-menu", result);
        }
    }));

    for link in dom.query_all(None, ".main-nav .nav-link")? {
        if dom.has_class(link, "dropdown-toggle") {
            continue;
        }
        let m = Rc::clone(&menu);
        let ctx_link = ctx.clone();
        teardown.push(ctx.on(link, EventKind::Click, move |_| {
            if !ctx_link.is_desktop() && m.is_open() {
                report("mobile-menu", m.set(false));
            }
        }));
    }
    Ok(teardown)
}

// =============================================================================
// Dropdowns
// =============================================================================

/// Close every `li.has-dropdown` on the page.
pub fn close_all_dropdowns(dom: &dyn Dom) -> Result<(), DomError> {
    for parent in dom.query_all(None, DROPDOWN)? {
        set_dropdown(dom, parent, false)?;
    }
    Ok(())
}

fn set_dropdown(dom: &dyn Dom, parent: NodeId, open: bool) -> Result<(), DomError> {
    dom.toggle_class(parent, DROPDOWN_OPEN, open)?;
    if let Some(toggle) = dom.query_in(parent, "a.dropdown-toggle")? {
        dom.set_attr(toggle, "aria-expanded", if open { "true" } else { "false" })?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct Dropdown {
    parent: NodeId,
    toggle: NodeId,
    menu: NodeId,
}

struct Dropdowns {
    dom: Rc<dyn Dom>,
    items: Vec<Dropdown>,
}

impl Dropdowns {
    fn is_open(&self, i: usize) -> bool {
        self.dom.has_class(self.items[i].parent, DROPDOWN_OPEN)
    }

    /// Open `i` after closing every other dropdown.
    fn open(&self, i: usize) -> Result<(), DomError> {
        for (j, item) in self.items.iter().enumerate() {
            if j != i {
                set_dropdown(&*self.dom, item.parent, false)?;
            }
        }
        set_dropdown(&*self.dom, self.items[i].parent, true)
    }

    fn close(&self, i: usize) -> Result<(), DomError> {
        set_dropdown(&*self.dom, self.items[i].parent, false)
    }

    fn close_all(&self) -> Result<(), DomError> {
        for item in &self.items {
            set_dropdown(&*self.dom, item.parent, false)?;
        }
        Ok(())
    }

    fn toggle(&self, i: usize) -> Result<(), DomError> {
        if self.is_open(i) {
            self.close(i)
        } else {
            self.open(i)
        }
    }

    fn links(&self, i: usize) -> Result<Vec<NodeId>, DomError> {
        self.dom.query_all(Some(self.items[i].menu), "a")
    }

    fn contains(&self, node: NodeId) -> bool {
        self.items
            .iter()
            .any(|item| self.dom.contains(item.parent, node))
    }
}

/// Submenus under `li.has-dropdown`: click, hover (desktop) and keyboard.
///
/// At most one dropdown is open at a time.
pub fn init_dropdowns(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let mut items = Vec::new();
    for parent in dom.query_all(None, DROPDOWN)? {
        let toggle = dom.query_in(parent, "a.dropdown-toggle")?;
        let menu = dom.query_in(parent, "ul.dropdown-menu")?;
        if let (Some(toggle), Some(menu)) = (toggle, menu) {
            dom.set_attr(toggle, "aria-haspopup", "true")?;
            dom.set_attr(toggle, "aria-expanded", "false")?;
            items.push(Dropdown {
                parent,
                toggle,
                menu,
            });
        }
    }
    if items.is_empty() {
        return Ok(teardown);
    }
    let dropdowns = Rc::new(Dropdowns {
        dom: Rc::clone(dom),
        items,
    });

    for i in 0..dropdowns.items.len() {
        let Dropdown {
            parent,
            toggle,
            menu,
        } = dropdowns.items[i];

        let d = Rc::clone(&dropdowns);
        teardown.push(ctx.on(toggle, EventKind::Click, move |event| {
            event.prevent_default();
            event.stop_propagation();
            report("dropdowns", d.toggle(i));
        }));

        let d = Rc::clone(&dropdowns);
        let hover_ctx = ctx.clone();
        teardown.push(ctx.on(parent, EventKind::MouseEnter, move |_| {
            if hover_ctx.is_desktop() {
                report("dropdowns", d.open(i));
            }
        }));

        let d = Rc::clone(&dropdowns);
        let hover_ctx = ctx.clone();
        teardown.push(ctx.on(parent, EventKind::MouseLeave, move |_| {
            if hover_ctx.is_desktop() {
                report("dropdowns", d.close(i));
            }
        }));

        let d = Rc::clone(&dropdowns);
        teardown.push(ctx.on(toggle, EventKind::KeyDown, move |event| {
            let result = match event.key.clone() {
                Some(key) if key.activates() => {
                    event.prevent_default();
                    d.toggle(i)
                }
                Some(Key::ArrowDown) => {
                    event.prevent_default();
                    let opened = if d.is_open(i) { Ok(()) } else { d.open(i) };
                    opened.and_then(|()| match d.links(i)?.first() {
                        Some(first) => d.dom.focus(*first),
                        None => Ok(()),
                    })
                }
                Some(Key::Escape) => {
                    event.stop_propagation();
                    d.close(i).and_then(|()| d.dom.focus(toggle))
                }
                _ => Ok(()),
            };
            report("dropdowns", result);
        }));

        let d = Rc::clone(&dropdowns);
        teardown.push(ctx.on(menu, EventKind::KeyDown, move |event| {
            let Some(current) = event.target_node() else {
                return;
            };
            let result = d.links(i).and_then(|links| {
                let Some(pos) = links.iter().position(|l| *l == current) else {
                    return Ok(());
                };
                match event.key.clone() {
                    Some(Key::ArrowDown) => {
                        event.prevent_default();
                        d.dom.focus(links[(pos + 1) % links.len()])
                    }
                    Some(Key::ArrowUp) => {
                        event.prevent_default();
                        match pos.checked_sub(1) {
                            Some(prev) => d.dom.focus(links[prev]),
                            None => d.dom.focus(toggle),
                        }
                    }
                    Some(Key::Escape) => {
                        event.stop_propagation();
                        d.close(i).and_then(|()| d.dom.focus(toggle))
                    }
                    Some(Key::Tab) if !event.shift && pos + 1 == links.len() => d.close(i),
                    _ => Ok(()),
                }
            });
            report("dropdowns", result);
        }));

        for link in dropdowns.links(i)? {
            let d = Rc::clone(&dropdowns);
            teardown.push(ctx.on(link, EventKind::Click, move |_| {
                report("dropdowns", d.close_all());
            }));
        }
    }

    let d = Rc::clone(&dropdowns);
    teardown.push(ctx.listen(Target::Document, EventKind::Click, move |event| {
        let inside = event.target_node().is_some_and(|node| d.contains(node));
        if !inside {
            report("dropdowns", d.close_all());
        }
    }));

    let d = Rc::clone(&dropdowns);
    teardown.push(ctx.listen(Target::Document, EventKind::KeyDown, move |event| {
        if event.key == Some(Key::Escape) {
            report("dropdowns", d.close_all());
        }
    }));

    let debouncer = Debouncer::new(Rc::clone(&ctx.scheduler), ctx.behavior().resize_debounce_ms);
    let d = Rc::clone(&dropdowns);
    let resize = Rc::clone(&debouncer);
    teardown.push(ctx.listen(Target::Window, EventKind::Resize, move |_| {
        let d = Rc::clone(&d);
        resize.call(move || report("dropdowns", d.close_all()));
    }));
    teardown.push(Subscription::new(move || debouncer.cancel()));

    Ok(teardown)
}

// =============================================================================
// Active link
// =============================================================================

/// Page identifier for a path segment or link target: the final segment
/// without query, fragment or `.html`, with the root mapping to [`HOME`].
pub fn page_id(target: &str) -> String {
    let target = target.split(['?', '#']).next().unwrap_or("");
    let segment = target.rsplit('/').next().unwrap_or("");
    let stem = segment.strip_suffix(".html").unwrap_or(segment);
    match stem {
        "" | "." | "index" => HOME.to_string(),
        other => other.to_string(),
    }
}

/// Mark navigation links that point at the current page.
pub fn set_active_nav_link(ctx: &Context) -> Result<Teardown, UiError> {
    let dom = &ctx.dom;
    let current = page_id(ctx.location.last_segment());
    let links = dom.query_all(None, ".nav-link, .dropdown-menu a")?;

    let mut matched = 0;
    for link in links {
        let href = dom.attr(link, "href").unwrap_or_default();
        // In-page anchors and external links never name the current page.
        let is_page_link = !href.is_empty() && !href.starts_with('#') && !href.contains("://");
        let active = is_page_link && page_id(&href) == current;
        dom.toggle_class(link, "active", active)?;
        if !active {
            if dom.attr(link, "aria-current").as_deref() == Some("page") {
                dom.remove_attr(link, "aria-current")?;
            }
            continue;
        }
        matched += 1;
        dom.set_attr(link, "aria-current", "page")?;
        if dom.closest(link, "ul.dropdown-menu")?.is_some() {
            if let Some(parent) = dom.closest(link, DROPDOWN)? {
                dom.add_class(parent, "active")?;
                if let Some(toggle) = dom.query_in(parent, "a.dropdown-toggle")? {
                    dom.add_class(toggle, "active")?;
                }
            }
        }
    }
    debug!(page = %current, matched, "active nav link");
    Ok(Teardown::new())
}
