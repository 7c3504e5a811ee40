//! Count-up statistics (`[data-count]`).
//!
//! A counter shows its formatted zero until it is sufficiently visible, then
//! animates to the target once with an ease-out curve. The last frame always
//! writes the exact target string, so rounding in intermediate frames never
//! leaks into the final value.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, NodeId};
use crate::env::{IntersectionCallback, ObserveOptions, VisibilityKind};
use crate::events::{Subscription, Teardown};
use crate::schedule::{AnimationHandle, Millis, Step, animate};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Parsed `data-count` / `data-prefix` / `data-suffix`.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSpec {
    pub target: f64,
    /// Digits after the decimal point in the markup value.
    pub decimals: usize,
    pub prefix: String,
    pub suffix: String,
}

impl CounterSpec {
    /// Parse a counter's markup value. Thousands separators are accepted;
    /// anything else that is not a finite number yields `None`.
    pub fn parse(raw: &str, prefix: &str, suffix: &str) -> Option<Self> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        let target: f64 = cleaned.parse().ok()?;
        if !target.is_finite() {
            return None;
        }
        let decimals = cleaned.split_once('.').map_or(0, |(_, frac)| frac.len());
        Some(Self {
            target,
            decimals,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    fn read(dom: &dyn Dom, node: NodeId) -> Option<Self> {
        Self::parse(
            &dom.attr(node, "data-count")?,
            &dom.attr(node, "data-prefix").unwrap_or_default(),
            &dom.attr(node, "data-suffix").unwrap_or_default(),
        )
    }

    /// Render `value` with this counter's decimals, separators and affixes.
    pub fn format(&self, value: f64) -> String {
        format!(
            "{}{}{}",
            self.prefix,
            format_number(value, self.decimals),
            self.suffix
        )
    }

    /// The exact end state.
    pub fn final_text(&self) -> String {
        self.format(self.target)
    }

    /// Value shown `elapsed` ms into a `duration` ms animation.
    pub fn value_at(&self, elapsed: Millis, duration: Millis) -> f64 {
        if duration == 0 || elapsed >= duration {
            return self.target;
        }
        let progress = elapsed as f64 / duration as f64;
        self.target * ease_out_quart(progress)
    }
}

pub fn ease_out_quart(t: f64) -> f64 {
    1.0 - (1.0 - t.clamp(0.0, 1.0)).powi(4)
}

/// `1234567.891` with 2 decimals → `1,234,567.89`.
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Animate `node` from zero to its target.
pub fn animate_counter(ctx: &Context, node: NodeId, spec: CounterSpec) -> AnimationHandle {
    let dom = Rc::clone(&ctx.dom);
    let duration = ctx.behavior().counter_duration_ms;
    debug!(%node, target = spec.target, "counter start");
    animate(&ctx.scheduler, move |elapsed| {
        if elapsed >= duration {
            report("counter", dom.set_text(node, &spec.final_text()));
            return Step::Done;
        }
        let value = spec.value_at(elapsed, duration);
        report("counter", dom.set_text(node, &spec.format(value)));
        Step::Continue
    })
}

pub fn init_counters(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let mut counters = Vec::new();
    for node in dom.query_all(None, "[data-count]")? {
        match CounterSpec::read(&**dom, node) {
            Some(spec) => counters.push((node, spec)),
            None => debug!(%node, "unparseable data-count, skipped"),
        }
    }
    if counters.is_empty() {
        return Ok(teardown);
    }

    if ctx.visibility.kind() == VisibilityKind::Immediate {
        for (node, spec) in &counters {
            dom.set_text(*node, &spec.final_text())?;
        }
        return Ok(teardown);
    }

    let specs: Rc<HashMap<NodeId, CounterSpec>> = Rc::new(counters.iter().cloned().collect());
    let observed: Rc<RefCell<HashMap<NodeId, Subscription>>> = Rc::default();
    let running: Rc<RefCell<Vec<AnimationHandle>>> = Rc::default();
    let callback: IntersectionCallback = {
        let ctx = ctx.clone();
        let specs = Rc::clone(&specs);
        let observed = Rc::clone(&observed);
        let running = Rc::clone(&running);
        Rc::new(move |entry| {
            // Unobserving first makes the animation run at most once.
            if observed.borrow_mut().remove(&entry.node).is_none() {
                return;
            }
            if let Some(spec) = specs.get(&entry.node) {
                let handle = animate_counter(&ctx, entry.node, spec.clone());
                let mut running = running.borrow_mut();
                running.retain(AnimationHandle::is_running);
                running.push(handle);
            }
        })
    };
    let options = ObserveOptions::threshold(ctx.behavior().counter_threshold);
    for (node, spec) in &counters {
        dom.set_text(*node, &spec.format(0.0))?;
        let subscription = ctx.visibility.observe(*node, &options, Rc::clone(&callback));
        observed.borrow_mut().insert(*node, subscription);
    }
    teardown.push(Subscription::new(move || {
        drop(observed.take());
        for animation in running.take() {
            animation.cancel();
        }
    }));
    Ok(teardown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::FRAME_MS;
    use crate::sim::SimOptions;
    use crate::test_helpers::*;
    use maud::html;

    // =========================================================================
    // Formatting
    // =========================================================================

    #[test]
    fn parse_keeps_declared_decimals() {
        let spec = CounterSpec::parse("4.9", "", "/5").unwrap();
        assert_eq!(spec.decimals, 1);
        assert_eq!(spec.final_text(), "4.9/5");
        assert_eq!(CounterSpec::parse("2,500", "", "").unwrap().target, 2500.0);
        assert!(CounterSpec::parse("lots", "", "").is_none());
        assert!(CounterSpec::parse("NaN", "", "").is_none());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(2500.0, 0), "2,500");
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(-0.2, 0), "0");
    }

    #[test]
    fn easing_is_monotonic_and_bounded() {
        let spec = CounterSpec::parse("2500", "", "").unwrap();
        let mut last = 0.0;
        for elapsed in (0..=2100).step_by(16) {
            let v = spec.value_at(elapsed, 2000);
            assert!(v >= last);
            assert!(v <= 2500.0);
            last = v;
        }
        assert_eq!(spec.value_at(2000, 2000), 2500.0);
        assert_eq!(spec.value_at(0, 0), 2500.0);
    }

    // =========================================================================
    // Animation
    // =========================================================================

    #[test]
    fn counter_shows_zero_until_visible() {
        let sim = sim(html! { span.stat data-count="2500" data-prefix="$" data-suffix="+" { "2500" } });
        let _t = init_counters(&sim.ctx).unwrap();
        assert_eq!(text(&sim, find(&sim, ".stat")), "$0+");
        sim.advance(5000);
        assert_eq!(text(&sim, find(&sim, ".stat")), "$0+");
    }

    #[test]
    fn counter_ends_exactly_on_target_with_monotonic_frames() {
        let sim = sim(html! { span.stat data-count="2500" data-prefix="$" data-suffix="+" {} });
        let _t = init_counters(&sim.ctx).unwrap();
        let stat = find(&sim, ".stat");
        sim.show(stat, 0.5);

        let mut last = 0u64;
        for _ in 0..200 {
            if sim.clock.pending_frames() == 0 {
                break;
            }
            sim.advance(FRAME_MS);
            let shown = text(&sim, stat);
            let digits: String = shown.chars().filter(|c| c.is_ascii_digit()).collect();
            let value: u64 = digits.parse().unwrap();
            assert!(value >= last, "{shown} went backwards");
            last = value;
        }
        assert_eq!(text(&sim, stat), "$2,500+");
        assert_eq!(sim.clock.pending_frames(), 0);
    }

    #[test]
    fn counter_runs_once() {
        let sim = sim(html! { span.stat data-count="40" {} });
        let _t = init_counters(&sim.ctx).unwrap();
        let stat = find(&sim, ".stat");
        sim.show(stat, 0.1);
        assert_eq!(sim.clock.pending_frames(), 0);
        sim.show(stat, 0.3);
        sim.settle(5000);
        assert_eq!(text(&sim, stat), "40");
        let requested = sim.clock.frames_requested();
        sim.show(stat, 1.0);
        assert_eq!(sim.clock.frames_requested(), requested);
    }

    #[test]
    fn teardown_stops_running_animation() {
        let sim = sim(html! { span.stat data-count="2500" {} });
        let teardown = init_counters(&sim.ctx).unwrap();
        let stat = find(&sim, ".stat");
        sim.show(stat, 1.0);
        sim.advance(500);
        assert_eq!(sim.clock.pending_frames(), 1);
        let partial = text(&sim, stat);
        teardown.dispose();
        assert_eq!(sim.clock.pending_frames(), 0);
        sim.advance(5000);
        assert_eq!(text(&sim, stat), partial);
        assert_ne!(partial, "2,500");
    }

    #[test]
    fn decimal_counter_keeps_places() {
        let sim = sim(html! { span.rating data-count="4.9" data-suffix=" stars" {} });
        let _t = init_counters(&sim.ctx).unwrap();
        let rating = find(&sim, ".rating");
        assert_eq!(text(&sim, rating), "0.0 stars");
        sim.show(rating, 1.0);
        sim.settle(5000);
        assert_eq!(text(&sim, rating), "4.9 stars");
    }

    #[test]
    fn fallback_shows_final_values_immediately() {
        let sim = sim_with(
            html! { span.stat data-count="12000" {} },
            SimOptions::default().without_observer(),
        );
        let _t = init_counters(&sim.ctx).unwrap();
        assert_eq!(text(&sim, find(&sim, ".stat")), "12,000");
        assert_eq!(sim.clock.pending_frames(), 0);
    }

    #[test]
    fn invalid_counter_is_left_alone() {
        let sim = sim(html! { span.stat data-count="many" { "Many" } });
        assert!(init_counters(&sim.ctx).unwrap().is_empty());
        assert_eq!(text(&sim, find(&sim, ".stat")), "Many");
    }
}
