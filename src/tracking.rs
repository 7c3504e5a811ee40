//! Phone-link click tracking.
//!
//! Every `a[href^="tel:"]` click produces a [`TrackingEvent`]. The event is
//! always logged at debug level and forwarded to the analytics sink when the
//! page has one.

use crate::context::{Context, UiError, report};
use crate::dom::{Dom, DomError, NodeId};
use crate::events::{EventKind, Teardown};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PHONE_LINKS: &str = "a[href^='tel:']";

/// Ancestor selectors mapped to the page region they name, checked from the
/// link outwards.
const ZONES: &[(&str, &str)] = &[
    (".mobile-cta-bar", "mobile_cta"),
    (".emergency-banner", "emergency_banner"),
    (".site-header, header", "header"),
    (".hero", "hero"),
    (".cta-section, .cta-banner", "cta"),
    (".contact-info, .contact-section", "contact"),
    (".site-footer, footer", "footer"),
];

/// Zone reported when no ancestor names a region.
pub const DEFAULT_ZONE: &str = "body";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event: String,
    pub phone: String,
    pub page_title: String,
    pub page_path: String,
    pub link_text: String,
    pub zone: String,
    pub timestamp_ms: u64,
    pub viewport: ViewportSize,
}

/// Page region of `node`, from its nearest recognised ancestor.
pub fn zone_of(dom: &dyn Dom, node: NodeId) -> Result<&'static str, DomError> {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if dom.tag_name(current).is_some() {
            for (selector, zone) in ZONES {
                if dom.matches(current, selector)? {
                    return Ok(*zone);
                }
            }
        }
        cursor = dom.parent(current);
    }
    Ok(DEFAULT_ZONE)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the record for a click on `link`.
pub fn phone_click(ctx: &Context, link: NodeId) -> Result<TrackingEvent, DomError> {
    let dom = &ctx.dom;
    let href = dom.attr(link, "href").unwrap_or_default();
    let phone = href.trim().trim_start_matches("tel:").to_string();
    Ok(TrackingEvent {
        event: "phone_click".to_string(),
        phone,
        page_title: ctx.title.clone(),
        page_path: ctx.location.path.clone(),
        link_text: collapse_whitespace(&dom.text(link)),
        zone: zone_of(&**dom, link)?.to_string(),
        timestamp_ms: ctx.scheduler.now(),
        viewport: ViewportSize {
            width: ctx.viewport.width(),
            height: ctx.viewport.height(),
        },
    })
}

pub fn init_phone_tracking(ctx: &Context) -> Result<Teardown, UiError> {
    let mut teardown = Teardown::new();
    for link in ctx.dom.query_all(None, PHONE_LINKS)? {
        let handler_ctx = ctx.clone();
        teardown.push(ctx.on(link, EventKind::Click, move |_| {
            let record = match phone_click(&handler_ctx, link) {
                Ok(record) => record,
                Err(err) => return report("tracking", Err(err)),
            };
            debug!(phone = %record.phone, zone = %record.zone, "phone click");
            if let Some(sink) = &handler_ctx.analytics {
                sink.track(&record);
            }
        }));
    }
    Ok(teardown)
}
