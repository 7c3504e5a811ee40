//! Page router.
//!
//! Classifies the current page from its URL and applies the few
//! page-specific touches that do not belong to any widget. Every page gets
//! `data-page` on `<body>`, which the `check` command also reports.

use crate::config::SiteConfig;
use crate::context::{Context, UiError};
use crate::dom::{Dom, NodeId};
use crate::env::Location;
use crate::events::Teardown;
use crate::nav::{HOME, page_id};
use tracing::debug;

const ARTICLE_LINKS: &str =
    "article a[href], .blog-content a[href], .post-content a[href], .article-body a[href]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    Contact,
    Blog,
    Service,
    Area,
    Other,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Contact => "contact",
            Self::Blog => "blog",
            Self::Service => "service",
            Self::Area => "area",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(config: &SiteConfig, location: &Location) -> PageKind {
    let segment = location.last_segment();
    let id = page_id(segment);
    let in_blog = location
        .path
        .split('/')
        .rev()
        .skip(1)
        .any(|dir| dir == "blog");
    if in_blog || id == "blog" || id.starts_with("blog-") {
        PageKind::Blog
    } else if id == HOME {
        PageKind::Home
    } else if id == "contact" {
        PageKind::Contact
    } else if config.service_page(segment).is_some() {
        PageKind::Service
    } else if config.area_page(segment).is_some() {
        PageKind::Area
    } else {
        PageKind::Other
    }
}

/// Absolute http(s) link to another origin.
pub fn is_external(href: &str, location: &Location) -> bool {
    let Ok(url) = url::Url::parse(href.trim()) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https")
        && url.origin().ascii_serialization() != location.origin
}

fn preselect_service(ctx: &Context) -> Result<(), UiError> {
    let Some(wanted) = ctx.location.query_param("service") else {
        return Ok(());
    };
    let dom = &ctx.dom;
    let Some(select) = dom.query("select[name='service']")? else {
        return Ok(());
    };
    let options = dom.query_all(Some(select), "option")?;
    let matching = options.into_iter().find(|option| option_value(&**dom, *option) == wanted);
    match matching {
        Some(_) => dom.set_value(select, wanted)?,
        None => debug!(service = wanted, "no matching service option"),
    }
    Ok(())
}

fn option_value(dom: &dyn Dom, option: NodeId) -> String {
    dom.attr(option, "value")
        .unwrap_or_else(|| dom.text(option).trim().to_string())
}

fn open_external_links(ctx: &Context) -> Result<usize, UiError> {
    let dom = &ctx.dom;
    let mut marked = 0;
    for link in dom.query_all(None, ARTICLE_LINKS)? {
        let href = dom.attr(link, "href").unwrap_or_default();
        if is_external(&href, &ctx.location) {
            dom.set_attr(link, "target", "_blank")?;
            dom.set_attr(link, "rel", "noopener noreferrer")?;
            marked += 1;
        }
    }
    Ok(marked)
}

pub fn init_router(ctx: &Context) -> Result<Teardown, UiError> {
    let dom = &ctx.dom;
    let kind = classify(&ctx.config, &ctx.location);
    let Some(body) = dom.body() else {
        return Ok(Teardown::new());
    };
    dom.set_attr(body, "data-page", kind.as_str())?;
    let segment = ctx.location.last_segment();
    match kind {
        PageKind::Contact => preselect_service(ctx)?,
        PageKind::Blog => {
            let marked = open_external_links(ctx)?;
            debug!(marked, "external article links");
        }
        PageKind::Service => {
            if let Some(page) = ctx.config.service_page(segment) {
                dom.set_attr(body, "data-service", &page.slug)?;
            }
        }
        PageKind::Area => {
            if let Some(page) = ctx.config.area_page(segment) {
                dom.set_attr(body, "data-area", &page.slug)?;
            }
        }
        PageKind::Home | PageKind::Other => {}
    }
    debug!(page = %kind, path = %ctx.location.path, "routed");
    Ok(Teardown::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use maud::html;

    fn kind(path: &str) -> PageKind {
        classify(&SiteConfig::default(), &Location::parse(path).unwrap())
    }

    #[test]
    fn classification() {
        assert_eq!(kind("/"), PageKind::Home);
        assert_eq!(kind("/index.html"), PageKind::Home);
        assert_eq!(kind("/contact.html"), PageKind::Contact);
        assert_eq!(kind("/blog.html"), PageKind::Blog);
        assert_eq!(kind("/blog/formosan-termites.html"), PageKind::Blog);
        assert_eq!(kind("/termite-control.html"), PageKind::Service);
        assert_eq!(kind("/pest-control-scott.html"), PageKind::Area);
        assert_eq!(kind("/about.html"), PageKind::Other);
    }

    #[test]
    fn body_carries_page_kind_and_slug() {
        let sim = sim_at("/mosquito-control.html", html! {});
        let _ = init_router(&sim.ctx).unwrap();
        let body = find(&sim, "body");
        assert_eq!(attr(&sim, body, "data-page").as_deref(), Some("service"));
        assert_eq!(attr(&sim, body, "data-service").as_deref(), Some("mosquito-control"));

        let sim = sim_at("/pest-control-carencro", html! {});
        let _ = init_router(&sim.ctx).unwrap();
        let body = find(&sim, "body");
        assert_eq!(attr(&sim, body, "data-area").as_deref(), Some("pest-control-carencro"));
    }

    #[test]
    fn contact_page_preselects_service() {
        use crate::dom::Dom;
        let form = html! {
            select name="service" {
                option value="" { "Select a service" }
                option value="termite-control" { "Termite Control" }
                option value="rodent-control" { "Rodent Control" }
            }
        };
        let sim = sim_at("/contact.html?service=rodent-control", form.clone());
        let _ = init_router(&sim.ctx).unwrap();
        assert_eq!(sim.doc.value(find(&sim, "select")), "rodent-control");

        let sim = sim_at("/contact.html?service=alligators", form);
        let _ = init_router(&sim.ctx).unwrap();
        assert_eq!(sim.doc.value(find(&sim, "select")), "");
    }

    #[test]
    fn blog_external_links_open_in_new_tab() {
        let sim = sim_at(
            "https://www.example.com/blog/termite-season.html",
            html! {
                article {
                    a #ext href="https://www.lsuagcenter.com/termites" { "LSU AgCenter" }
                    a #same href="https://www.example.com/contact.html" { "Contact" }
                    a #rel href="../termite-control.html" { "Termite control" }
                }
                footer { a #foot href="https://facebook.com/acadiana" { "Facebook" } }
            },
        );
        let _ = init_router(&sim.ctx).unwrap();
        let ext = find(&sim, "#ext");
        assert_eq!(attr(&sim, ext, "target").as_deref(), Some("_blank"));
        assert_eq!(attr(&sim, ext, "rel").as_deref(), Some("noopener noreferrer"));
        for id in ["#same", "#rel", "#foot"] {
            assert_eq!(attr(&sim, find(&sim, id), "target"), None, "{id}");
        }
    }

    #[test]
    fn external_detection() {
        let here = Location::parse("https://www.example.com/blog/a.html").unwrap();
        assert!(is_external("http://other.org/x", &here));
        assert!(!is_external("https://www.example.com/x", &here));
        assert!(!is_external("/contact.html", &here));
        assert!(!is_external("mailto:a@b.co", &here));
    }
}
