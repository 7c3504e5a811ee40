//! Scroll effects: reveal-on-scroll, back-to-top button, mobile call bar
//! and smooth in-page anchor scrolling.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, NodeId};
use crate::env::{IntersectionCallback, ObserveOptions, ScrollBehavior, VisibilityKind};
use crate::events::{EventKind, Subscription, Target, Teardown};
use crate::schedule::{FrameGate, cancel_on_drop};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Content cards that reveal even when the markup does not ask for it.
pub const AUTO_REVEAL: &[&str] = &[
    ".service-card",
    ".feature-card",
    ".testimonial-card",
    ".area-card",
    ".blog-card",
    ".stat-item",
    ".process-step",
];

const REVEAL: &str = "reveal";
const REVEALED: &str = "revealed";

// =============================================================================
// Reveal
// =============================================================================

/// Tag [`AUTO_REVEAL`] cards with `reveal` and a cascading transition delay.
/// Returns how many elements were tagged.
pub fn auto_tag(ctx: &Context) -> Result<usize, UiError> {
    let dom = &ctx.dom;
    let stagger = ctx.behavior().reveal_stagger_ms;
    let mut tagged = 0;
    for selector in AUTO_REVEAL {
        for (index, node) in dom.query_all(None, selector)?.into_iter().enumerate() {
            if dom.has_class(node, REVEAL) {
                continue;
            }
            dom.add_class(node, REVEAL)?;
            dom.set_style(node, "transition-delay", &format!("{}ms", index as u64 * stagger))?;
            tagged += 1;
        }
    }
    Ok(tagged)
}

/// Add `revealed` to each `.reveal` element the first time it is visible
/// enough, after its `data-delay` (ms). Each element is unobserved once
/// triggered.
pub fn init_reveal(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let tagged = auto_tag(ctx)?;
    let dom = &ctx.dom;
    let targets: Vec<NodeId> = dom
        .query_all(None, ".reveal")?
        .into_iter()
        .filter(|node| !dom.has_class(*node, REVEALED))
        .collect();
    if targets.is_empty() {
        return Ok(teardown);
    }

    if ctx.visibility.kind() == VisibilityKind::Immediate {
        for node in &targets {
            dom.add_class(*node, REVEALED)?;
        }
        debug!(count = targets.len(), "no intersection observer, revealed immediately");
        return Ok(teardown);
    }

    let behavior = ctx.behavior();
    let options = ObserveOptions::threshold(behavior.reveal_threshold)
        .with_root_margin(&behavior.reveal_root_margin);
    let observed: Rc<RefCell<HashMap<NodeId, Subscription>>> = Rc::default();
    let delayed: Rc<RefCell<Teardown>> = Rc::default();

    let callback: IntersectionCallback = {
        let dom = Rc::clone(dom);
        let scheduler = Rc::clone(&ctx.scheduler);
        let observed = Rc::clone(&observed);
        let delayed = Rc::clone(&delayed);
        Rc::new(move |entry| {
            // Unobserve first: the transition is one-way.
            let Some(subscription) = observed.borrow_mut().remove(&entry.node) else {
                return;
            };
            drop(subscription);
            let delay = dom
                .attr(entry.node, "data-delay")
                .and_then(|d| d.trim().parse::<u64>().ok())
                .unwrap_or(0);
            if delay == 0 {
                report("reveal", dom.add_class(entry.node, REVEALED));
                return;
            }
            let reveal_dom = Rc::clone(&dom);
            let node = entry.node;
            let id = scheduler.set_timeout(
                delay,
                Box::new(move || report("reveal", reveal_dom.add_class(node, REVEALED))),
            );
            delayed.borrow_mut().push(cancel_on_drop(&scheduler, id));
        })
    };

    for node in &targets {
        let subscription = ctx.visibility.observe(*node, &options, Rc::clone(&callback));
        observed.borrow_mut().insert(*node, subscription);
    }
    debug!(observed = targets.len(), auto_tagged = tagged, "reveal");

    teardown.push(Subscription::new(move || {
        drop(observed.take());
        drop(delayed.take());
    }));
    Ok(teardown)
}

// =============================================================================
// Scroll-position toggles
// =============================================================================

/// Toggle `visible` on `node` when the scroll offset passes `threshold`,
/// recomputed at most once per frame.
fn visible_past(ctx: &Context, component: &'static str, node: NodeId, threshold: f64) -> Teardown {
    let mut teardown = Teardown::new();
    let update: Rc<dyn Fn()> = {
        let dom = Rc::clone(&ctx.dom);
        let viewport = Rc::clone(&ctx.viewport);
        Rc::new(move || {
            report(component, dom.toggle_class(node, "visible", viewport.scroll_y() > threshold));
        })
    };
    update();
    let gate = FrameGate::new(Rc::clone(&ctx.scheduler));
    teardown.push(gate.cancel_on_drop());
    teardown.push(ctx.listen(Target::Window, EventKind::Scroll, move |_| {
        let update = Rc::clone(&update);
        gate.schedule(move || update());
    }));
    teardown
}

/// Show `.back-to-top` past `behavior.back_to_top_threshold`; clicking it
/// scrolls smoothly to the top.
pub fn init_back_to_top(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let Some(button) = ctx.dom.query_first_of(&[".back-to-top", "#backToTop"])? else {
        return Ok(teardown);
    };
    teardown.extend(visible_past(ctx, "back-to-top", button, ctx.behavior().back_to_top_threshold));
    let viewport = Rc::clone(&ctx.viewport);
    teardown.push(ctx.on(button, EventKind::Click, move |event| {
        event.prevent_default();
        viewport.scroll_to(0.0, ScrollBehavior::Smooth);
    }));
    Ok(teardown)
}

/// Show `.mobile-cta-bar` past `behavior.cta_bar_threshold`.
pub fn init_mobile_cta_bar(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    if let Some(bar) = ctx.dom.query(".mobile-cta-bar")? {
        teardown.extend(visible_past(ctx, "mobile-cta-bar", bar, ctx.behavior().cta_bar_threshold));
    }
    Ok(teardown)
}

// =============================================================================
// Anchor links
// =============================================================================

fn element_by_id(dom: &dyn Dom, id: &str) -> Result<Option<NodeId>, UiError> {
    Ok(dom
        .query_all(None, "[id]")?
        .into_iter()
        .find(|node| dom.attr(*node, "id").as_deref() == Some(id)))
}

/// `a[href^="#"]` clicks scroll smoothly to the target, leaving room for the
/// sticky header.
pub fn init_smooth_scroll(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    for link in ctx.dom.query_all(None, "a[href^='#']")? {
        let dom = Rc::clone(&ctx.dom);
        let viewport = Rc::clone(&ctx.viewport);
        let offset = ctx.behavior().anchor_offset;
        teardown.push(ctx.on(link, EventKind::Click, move |event| {
            let href = dom.attr(link, "href").unwrap_or_default();
            let id = href.trim_start_matches('#');
            if id.is_empty() {
                return;
            }
            let target = match element_by_id(&*dom, id) {
                Ok(Some(target)) => target,
                Ok(None) => return,
                Err(err) => return report("smooth-scroll", Err(err)),
            };
            event.prevent_default();
            let header_height = match dom.query(".site-header") {
                Ok(Some(header)) => dom.metrics(header).height,
                _ => 0.0,
            };
            let top = dom.metrics(target).top - header_height - offset;
            viewport.scroll_to(top, ScrollBehavior::Smooth);
        }));
    }
    Ok(teardown)
}
