//! Page startup.
//!
//! [`COMPONENTS`] lists every widget in initialisation order. [`start`] runs
//! each one against the same [`Context`]; a component that fails is logged
//! and skipped, and the rest of the page still starts. All registrations end
//! up in one [`Teardown`].

use crate::config::SiteConfig;
use crate::context::{Context, InitFn, UiError};
use crate::dom::{Dom, DomError, MemoryDocument};
use crate::env::Location;
use crate::events::Teardown;
use crate::router::PageKind;
use crate::{accordion, banners, carousel, counter, form, nav, router, schema, scroll, tracking};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A widget and the elements it looks for.
#[derive(Debug, Clone, Copy)]
pub struct Component {
    pub name: &'static str,
    /// Elements whose presence makes the component do anything.
    pub selector: &'static str,
    pub init: InitFn,
}

pub const COMPONENTS: &[Component] = &[
    Component {
        name: "sticky-header",
        selector: ".site-header",
        init: nav::init_sticky_header,
    },
    Component {
        name: "mobile-menu",
        selector: ".hamburger, #hamburgerBtn",
        init: nav::init_mobile_menu,
    },
    Component {
        name: "dropdowns",
        selector: "li.has-dropdown",
        init: nav::init_dropdowns,
    },
    Component {
        name: "active-link",
        selector: ".nav-link, .dropdown-menu a",
        init: nav::set_active_nav_link,
    },
    Component {
        name: "reveal",
        selector: ".reveal, .service-card, .feature-card, .testimonial-card, .area-card, \
                   .blog-card, .stat-item, .process-step",
        init: scroll::init_reveal,
    },
    Component {
        name: "back-to-top",
        selector: ".back-to-top, #backToTop",
        init: scroll::init_back_to_top,
    },
    Component {
        name: "mobile-cta-bar",
        selector: ".mobile-cta-bar",
        init: scroll::init_mobile_cta_bar,
    },
    Component {
        name: "smooth-scroll",
        selector: "a[href^='#']",
        init: scroll::init_smooth_scroll,
    },
    Component {
        name: "accordion",
        selector: ".faq-item",
        init: accordion::init_accordion,
    },
    Component {
        name: "carousel",
        selector: ".testimonials-slider, .testimonial-slider",
        init: carousel::init_carousel,
    },
    Component {
        name: "counters",
        selector: "[data-count]",
        init: counter::init_counters,
    },
    Component {
        name: "forms",
        selector: form::FORM_SELECTOR,
        init: form::init_forms,
    },
    Component {
        name: "schema",
        selector: "head",
        init: schema::inject_schema,
    },
    Component {
        name: "router",
        selector: "body",
        init: router::init_router,
    },
    Component {
        name: "phone-tracking",
        selector: tracking::PHONE_LINKS,
        init: tracking::init_phone_tracking,
    },
    Component {
        name: "banners",
        selector: ".cookie-banner, .emergency-banner",
        init: banners::init_banners,
    },
];

/// How one component's startup went.
#[derive(Debug)]
pub struct Outcome {
    pub component: &'static str,
    /// Number of registrations (listeners, timers, observations) on success.
    pub result: Result<usize, UiError>,
}

/// Result of starting a page.
#[derive(Debug)]
pub struct Startup {
    pub teardown: Teardown,
    pub outcomes: Vec<Outcome>,
}

impl Startup {
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

pub fn start(ctx: &Context) -> Startup {
    start_with(ctx, COMPONENTS)
}

/// Start `components` in order, isolating failures.
pub fn start_with(ctx: &Context, components: &[Component]) -> Startup {
    let mut teardown = Teardown::new();
    let mut outcomes = Vec::with_capacity(components.len());
    for component in components {
        let result = match (component.init)(ctx) {
            Ok(registered) => {
                let count = registered.len();
                teardown.extend(registered);
                Ok(count)
            }
            Err(err) => {
                warn!(component = component.name, error = %err, "component failed to start");
                Err(err)
            }
        };
        outcomes.push(Outcome {
            component: component.name,
            result,
        });
    }
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        path = %ctx.location.path,
        components = components.len(),
        failed,
        registrations = teardown.len(),
        "page started"
    );
    Startup { teardown, outcomes }
}

// =============================================================================
// Markup audit
// =============================================================================

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{path}: {source}")]
    Page { path: PathBuf, source: DomError },
}

/// Which components a page gives something to work on.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAudit {
    /// Path relative to the checked directory.
    pub path: PathBuf,
    pub url_path: String,
    pub kind: PageKind,
    /// Matching element count per component, in [`COMPONENTS`] order.
    pub matches: Vec<(&'static str, usize)>,
}

impl PageAudit {
    pub fn active(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matches.iter().filter(|(_, n)| *n > 0).map(|(name, _)| *name)
    }

    pub fn inactive(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matches.iter().filter(|(_, n)| *n == 0).map(|(name, _)| *name)
    }
}

/// Site path a page file is served from.
pub fn url_path_for(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}

pub fn audit_page(
    dom: &dyn Dom,
    config: &SiteConfig,
    location: &Location,
) -> Result<(PageKind, Vec<(&'static str, usize)>), DomError> {
    let kind = router::classify(config, location);
    let mut matches = Vec::with_capacity(COMPONENTS.len());
    for component in COMPONENTS {
        matches.push((component.name, dom.query_all(None, component.selector)?.len()));
    }
    Ok((kind, matches))
}

/// Audit every `.html` file under `root`, sorted by path.
pub fn check_site(root: &Path, config: &SiteConfig) -> Result<Vec<PageAudit>, CheckError> {
    let mut audits = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let source = fs::read_to_string(path)?;
        let page_error = |source| CheckError::Page {
            path: relative.clone(),
            source,
        };
        let doc = MemoryDocument::from_html(&source).map_err(page_error)?;
        let url_path = url_path_for(&relative);
        let location = Location {
            path: url_path.clone(),
            ..Location::default()
        };
        let (kind, matches) = audit_page(&doc, config, &location).map_err(page_error)?;
        debug!(path = %relative.display(), %kind, "audited");
        audits.push(PageAudit {
            path: relative,
            url_path,
            kind,
            matches,
        });
    }
    Ok(audits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use crate::sim::{SimOptions, Simulation};
    use crate::test_helpers::*;
    use maud::html;

    fn broken(_: &Context) -> Result<Teardown, UiError> {
        Err(UiError::Invalid("widget exploded".into()))
    }

    #[test]
    fn component_names_are_unique() {
        let mut names: Vec<&str> = COMPONENTS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMPONENTS.len());
    }

    #[test]
    fn component_selectors_parse() {
        let sim = sim(html! {});
        for component in COMPONENTS {
            assert!(sim.doc.query_all(None, component.selector).is_ok(), "{}", component.name);
        }
    }

    #[test]
    fn failing_component_does_not_stop_the_others() {
        let sim = sim(html! {
            header.site-header { "Header" }
            div.faq-item { button.faq-question { "Q" } div.faq-answer { "A" } }
        });
        let components = [
            COMPONENTS[0],
            Component {
                name: "broken",
                selector: "body",
                init: broken,
            },
            Component {
                name: "accordion",
                selector: ".faq-item",
                init: accordion::init_accordion,
            },
        ];
        let startup = start_with(&sim.ctx, &components);
        let failed: Vec<&str> = startup.failures().map(|o| o.component).collect();
        assert_eq!(failed, ["broken"]);
        sim.click(find(&sim, ".faq-question"));
        assert!(has_class(&sim, find(&sim, ".faq-item"), "active"));
    }

    #[test]
    fn empty_page_starts_cleanly() {
        let mut sim = Simulation::from_html(&page(html! {}), SimOptions::default()).unwrap();
        let startup = sim.start();
        assert_eq!(startup.failures().count(), 0);
        assert_eq!(startup.outcomes.len(), COMPONENTS.len());
    }

    #[test]
    fn full_start_routes_the_page() {
        let sim = sim(html! {
            div.testimonials-slider {
                div.testimonial-slide { "One" }
                div.testimonial-slide { "Two" }
            }
        });
        let startup = start(&sim.ctx);
        assert_eq!(startup.failures().count(), 0);
        assert_eq!(attr(&sim, find(&sim, "body"), "data-page").as_deref(), Some("home"));
    }

    // =========================================================================
    // Audit
    // =========================================================================

    #[test]
    fn url_paths_use_forward_slashes() {
        let relative: PathBuf = ["blog", "termite-season.html"].iter().collect();
        assert_eq!(url_path_for(&relative), "/blog/termite-season.html");
        assert_eq!(url_path_for(Path::new("index.html")), "/index.html");
    }

    #[test]
    fn check_site_audits_html_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("index.html"), crate::page::reference_page()).unwrap();
        fs::write(
            tmp.path().join("contact.html"),
            page(html! { form.contact-form { input name="email" type="email"; } }),
        )
        .unwrap();
        fs::create_dir(tmp.path().join("blog")).unwrap();
        fs::write(tmp.path().join("blog").join("post.html"), page(html! { article { "Hi" } })).unwrap();
        fs::write(tmp.path().join("notes.txt"), "not a page").unwrap();

        let audits = check_site(tmp.path(), &SiteConfig::default()).unwrap();
        let kinds: Vec<(String, PageKind)> = audits
            .iter()
            .map(|a| (a.url_path.clone(), a.kind))
            .collect();
        assert_eq!(
            kinds,
            [
                ("/blog/post.html".to_string(), PageKind::Blog),
                ("/contact.html".to_string(), PageKind::Contact),
                ("/index.html".to_string(), PageKind::Home),
            ]
        );
        assert_eq!(audits[2].inactive().count(), 0);
        assert!(audits[1].active().any(|name| name == "forms"));
        assert!(audits[1].inactive().any(|name| name == "carousel"));
    }
}
