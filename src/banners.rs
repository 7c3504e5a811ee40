//! Cookie-consent and emergency-service banners.
//!
//! Consent is remembered in local storage, so the cookie banner never comes
//! back once answered. Dismissing the emergency banner lasts for the session.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, DomError, NodeId};
use crate::env::KeyValueStore;
use crate::events::{EventKind, Subscription, Teardown};
use std::rc::Rc;
use tracing::debug;

pub const CONSENT_ACCEPTED: &str = "accepted";
pub const CONSENT_DECLINED: &str = "declined";

fn set_shown(dom: &dyn Dom, banner: NodeId, shown: bool) -> Result<(), DomError> {
    dom.toggle_class(banner, "visible", shown)?;
    if shown {
        dom.remove_attr(banner, "hidden")
    } else {
        dom.set_attr(banner, "hidden", "")
    }
}

/// Clicking `button` stores `value` under `key` and hides `banner`.
fn dismiss_on_click(
    ctx: &Context,
    store: &Rc<dyn KeyValueStore>,
    button: NodeId,
    banner: NodeId,
    key: &str,
    value: &'static str,
) -> Subscription {
    let dom = Rc::clone(&ctx.dom);
    let store = Rc::clone(store);
    let key = key.to_string();
    ctx.on(button, EventKind::Click, move |event| {
        event.prevent_default();
        store.set(&key, value);
        debug!(%key, value, "banner dismissed");
        report("banners", set_shown(&*dom, banner, false));
    })
}

pub fn init_cookie_banner(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let Some(banner) = dom.query(".cookie-banner")? else {
        return Ok(teardown);
    };
    let key = &ctx.config.storage.consent_key;
    if ctx.local.get(key).is_some() {
        set_shown(&**dom, banner, false)?;
        return Ok(teardown);
    }
    set_shown(&**dom, banner, true)?;
    for (selector, value) in [(".cookie-accept", CONSENT_ACCEPTED), (".cookie-decline", CONSENT_DECLINED)] {
        if let Some(button) = dom.query_in(banner, selector)? {
            teardown.push(dismiss_on_click(ctx, &ctx.local, button, banner, key, value));
        }
    }
    Ok(teardown)
}

pub fn init_emergency_banner(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    let dom = &ctx.dom;
    let Some(banner) = dom.query(".emergency-banner")? else {
        return Ok(teardown);
    };
    let key = &ctx.config.storage.emergency_dismissed_key;
    if ctx.session.get(key).is_some() {
        set_shown(&**dom, banner, false)?;
        return Ok(teardown);
    }
    set_shown(&**dom, banner, true)?;
    if let Some(close) = dom.query_in(banner, ".emergency-close")? {
        teardown.push(dismiss_on_click(ctx, &ctx.session, close, banner, key, "true"));
    }
    Ok(teardown)
}

pub fn init_banners(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = init_cookie_banner(ctx)?;
    teardown.extend(init_emergency_banner(ctx)?);
    Ok(teardown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use maud::{Markup, html};

    fn banners() -> Markup {
        html! {
            div.emergency-banner {
                p { "24/7 emergency service: call now" }
                button.emergency-close aria-label="Close" { "×" }
            }
            div.cookie-banner {
                p { "We use cookies." }
                button.cookie-accept { "Accept" }
                button.cookie-decline { "Decline" }
            }
        }
    }

    #[test]
    fn cookie_choice_is_stored_and_hides_banner() {
        let sim = sim(banners());
        let _t = init_banners(&sim.ctx).unwrap();
        let banner = find(&sim, ".cookie-banner");
        assert!(has_class(&sim, banner, "visible"));
        sim.click(find(&sim, ".cookie-decline"));
        assert!(attr(&sim, banner, "hidden").is_some());
        assert_eq!(sim.local.get("cookie_consent").as_deref(), Some(CONSENT_DECLINED));
    }

    #[test]
    fn stored_consent_keeps_banner_hidden() {
        let sim = sim(banners());
        sim.local.set("cookie_consent", CONSENT_ACCEPTED);
        let teardown = init_cookie_banner(&sim.ctx).unwrap();
        assert!(teardown.is_empty());
        let banner = find(&sim, ".cookie-banner");
        assert!(attr(&sim, banner, "hidden").is_some());
        assert!(!has_class(&sim, banner, "visible"));
    }

    #[test]
    fn emergency_dismissal_lasts_for_the_session() {
        let sim = sim(banners());
        let _t = init_banners(&sim.ctx).unwrap();
        sim.click(find(&sim, ".emergency-close"));
        assert_eq!(sim.session.get("emergency_banner_dismissed").as_deref(), Some("true"));
        assert!(sim.local.get("emergency_banner_dismissed").is_none());

        // A later page in the same session starts hidden.
        let next = sim_with(banners(), crate::sim::SimOptions::default());
        next.session.set("emergency_banner_dismissed", "true");
        let _t = init_emergency_banner(&next.ctx).unwrap();
        assert!(attr(&next, find(&next, ".emergency-banner"), "hidden").is_some());
    }

    #[test]
    fn missing_banners_are_noop() {
        let sim = sim(html! { p { "Nothing" } });
        assert!(init_banners(&sim.ctx).unwrap().is_empty());
    }
}
