//! Testimonial carousel.
//!
//! One slide is `active` at a time. Moving to another slide is a two-step
//! transition: the slider gets `transitioning`, and after
//! `behavior.carousel_transition_ms` the old slide is deactivated, the new
//! one activated and the dots updated. Requests that arrive mid-transition
//! are dropped.
//!
//! An auto-advance interval moves to the next slide every
//! `behavior.carousel_interval_ms`. Manual navigation restarts it, hovering
//! the slider pauses it, and only one interval is ever live.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, DomError, NodeId};
use crate::events::{EventKind, Key, Subscription, Teardown};
use crate::schedule::{Millis, Scheduler, TimerId};
use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::debug;

const SLIDER: &[&str] = &[".testimonials-slider", ".testimonial-slider"];
const SLIDES: &str = ".testimonial-slide, .testimonial-item, .slide";
const PREV: &str = ".slider-prev, .prev-btn, [data-slide=prev]";
const NEXT: &str = ".slider-next, .next-btn, [data-slide=next]";

struct Carousel {
    dom: Rc<dyn Dom>,
    scheduler: Rc<dyn Scheduler>,
    slider: NodeId,
    slides: Vec<NodeId>,
    dots: Vec<NodeId>,
    interval: Millis,
    transition: Millis,
    current: Cell<usize>,
    transitioning: Cell<bool>,
    paused: Cell<bool>,
    timer: Cell<Option<TimerId>>,
    pending: Cell<Option<TimerId>>,
    touch_start: Cell<Option<f64>>,
    this: Weak<Carousel>,
}

impl Carousel {
    fn len(&self) -> usize {
        self.slides.len()
    }

    /// Activate slide `index` and its dot, deactivating the rest.
    fn show(&self, index: usize) -> Result<(), DomError> {
        for (i, slide) in self.slides.iter().enumerate() {
            self.dom.toggle_class(*slide, "active", i == index)?;
            self.dom
                .set_attr(*slide, "aria-hidden", if i == index { "false" } else { "true" })?;
        }
        for (i, dot) in self.dots.iter().enumerate() {
            self.dom.toggle_class(*dot, "active", i == index)?;
            self.dom
                .set_attr(*dot, "aria-selected", if i == index { "true" } else { "false" })?;
        }
        self.current.set(index);
        Ok(())
    }

    /// Start a transition to `index`. Returns whether one was started.
    fn go_to(&self, index: usize) -> Result<bool, DomError> {
        if index >= self.len() || index == self.current.get() || self.transitioning.get() {
            return Ok(false);
        }
        self.transitioning.set(true);
        self.dom.add_class(self.slider, "transitioning")?;
        let this = self.this.clone();
        let id = self.scheduler.set_timeout(
            self.transition,
            Box::new(move || {
                if let Some(carousel) = this.upgrade() {
                    report("carousel", carousel.finish(index));
                }
            }),
        );
        self.pending.set(Some(id));
        debug!(from = self.current.get(), to = index, "carousel transition");
        Ok(true)
    }

    fn finish(&self, index: usize) -> Result<(), DomError> {
        self.pending.set(None);
        self.show(index)?;
        self.dom.remove_class(self.slider, "transitioning")?;
        self.transitioning.set(false);
        Ok(())
    }

    fn next(&self) -> Result<bool, DomError> {
        self.go_to((self.current.get() + 1) % self.len())
    }

    fn prev(&self) -> Result<bool, DomError> {
        self.go_to((self.current.get() + self.len() - 1) % self.len())
    }

    fn stop_timer(&self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.cancel(id);
        }
    }

    /// Replace the auto-advance interval, unless paused.
    fn restart_timer(&self) {
        self.stop_timer();
        if self.paused.get() {
            return;
        }
        let this = self.this.clone();
        let id = self.scheduler.set_interval(
            self.interval,
            Rc::new(move || {
                if let Some(carousel) = this.upgrade() {
                    report("carousel", carousel.next().map(drop));
                }
            }),
        );
        self.timer.set(Some(id));
    }

    /// Manual navigation: move, then restart the interval.
    fn navigate(&self, step: impl FnOnce(&Self) -> Result<bool, DomError>) {
        report("carousel", step(self).map(drop));
        self.restart_timer();
    }

    fn shutdown(&self) {
        self.stop_timer();
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }
}

pub fn init_carousel(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let Some(slider) = dom.query_first_of(SLIDER)? else {
        return Ok(teardown);
    };
    let slides = dom.query_all(Some(slider), SLIDES)?;
    if slides.len() < 2 {
        debug!(slides = slides.len(), "carousel needs at least two slides");
        return Ok(teardown);
    }
    let dots = dom.query_all(Some(slider), ".slider-dot")?;
    let behavior = ctx.behavior();
    let carousel = Rc::new_cyclic(|this| Carousel {
        dom: Rc::clone(dom),
        scheduler: Rc::clone(&ctx.scheduler),
        slider,
        slides,
        dots,
        interval: behavior.carousel_interval_ms,
        transition: behavior.carousel_transition_ms,
        current: Cell::new(0),
        transitioning: Cell::new(false),
        paused: Cell::new(false),
        timer: Cell::new(None),
        pending: Cell::new(None),
        touch_start: Cell::new(None),
        this: this.clone(),
    });
    carousel.show(0)?;
    if dom.attr(slider, "tabindex").is_none() {
        dom.set_attr(slider, "tabindex", "0")?;
    }

    if let Some(prev) = dom.query_in(slider, PREV)? {
        let c = Rc::clone(&carousel);
        teardown.push(ctx.on(prev, EventKind::Click, move |event| {
            event.prevent_default();
            c.navigate(Carousel::prev);
        }));
    }
    if let Some(next) = dom.query_in(slider, NEXT)? {
        let c = Rc::clone(&carousel);
        teardown.push(ctx.on(next, EventKind::Click, move |event| {
            event.prevent_default();
            c.navigate(Carousel::next);
        }));
    }
    for (i, dot) in carousel.dots.iter().enumerate() {
        let c = Rc::clone(&carousel);
        teardown.push(ctx.on(*dot, EventKind::Click, move |_| {
            c.navigate(|c| c.go_to(i));
        }));
    }

    let c = Rc::clone(&carousel);
    teardown.push(ctx.on(slider, EventKind::KeyDown, move |event| match event.key.clone() {
        Some(Key::ArrowLeft) => {
            event.prevent_default();
            c.navigate(Carousel::prev);
        }
        Some(Key::ArrowRight) => {
            event.prevent_default();
            c.navigate(Carousel::next);
        }
        _ => {}
    }));

    let c = Rc::clone(&carousel);
    teardown.push(ctx.on(slider, EventKind::MouseEnter, move |_| {
        c.paused.set(true);
        c.stop_timer();
    }));
    let c = Rc::clone(&carousel);
    teardown.push(ctx.on(slider, EventKind::MouseLeave, move |_| {
        c.paused.set(false);
        c.restart_timer();
    }));

    let c = Rc::clone(&carousel);
    teardown.push(ctx.on(slider, EventKind::TouchStart, move |event| {
        c.touch_start.set(Some(event.client_x));
    }));
    let c = Rc::clone(&carousel);
    let threshold = behavior.swipe_threshold;
    teardown.push(ctx.on(slider, EventKind::TouchEnd, move |event| {
        let Some(start) = c.touch_start.take() else {
            return;
        };
        let dx = event.client_x - start;
        if dx.abs() <= threshold {
            return;
        }
        if dx < 0.0 {
            c.navigate(Carousel::next);
        } else {
            c.navigate(Carousel::prev);
        }
    }));

    carousel.restart_timer();
    let c = Rc::clone(&carousel);
    teardown.push(Subscription::new(move || c.shutdown()));
    Ok(teardown)
}
