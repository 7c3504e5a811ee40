//! schema.org structured data.
//!
//! The injector appends one `application/ld+json` block to `<head>`
//! describing the business as a `LocalBusiness`. On a service page or an
//! area landing page (matched by the final URL path segment) the block is an
//! `@graph` that also carries a `Service` descriptor for that page.
//!
//! Pages that already ship structured data, or that were injected before
//! (marked with [`SCHEMA_MARKER`]), are left alone.

use crate::config::{AreaPage, BusinessConfig, ServicePage, SiteConfig};
use crate::context::{Context, UiError};
use crate::env::Location;
use crate::events::Teardown;
use serde_json::{Value, json};
use tracing::{debug, info};

/// Attribute set on the injected `<script>`.
pub const SCHEMA_MARKER: &str = "data-leadsite-schema";
const EXISTING: &str = "script[type='application/ld+json'], [data-leadsite-schema]";

/// Page-specific descriptor selected by URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageDescriptor<'a> {
    Service(&'a ServicePage),
    Area(&'a AreaPage),
}

impl<'a> PageDescriptor<'a> {
    pub fn for_location(config: &'a SiteConfig, location: &Location) -> Option<Self> {
        let segment = location.last_segment();
        if let Some(page) = config.service_page(segment) {
            return Some(Self::Service(page));
        }
        config.area_page(segment).map(Self::Area)
    }
}

/// Site origin for absolute URLs: the page's own origin when it has one,
/// else the configured business URL.
pub fn site_url(config: &SiteConfig, location: &Location) -> String {
    let base = if location.origin.is_empty() {
        config.business.url.as_str()
    } else {
        location.origin.as_str()
    };
    base.trim_end_matches('/').to_string()
}

fn postal_address(business: &BusinessConfig) -> Value {
    let address = &business.address;
    json!({
        "@type": "PostalAddress",
        "streetAddress": address.street,
        "addressLocality": address.locality,
        "addressRegion": address.region,
        "postalCode": address.postal_code,
        "addressCountry": address.country,
    })
}

fn coordinates(business: &BusinessConfig) -> Value {
    json!({
        "@type": "GeoCoordinates",
        "latitude": business.geo.latitude,
        "longitude": business.geo.longitude,
    })
}

pub fn business_schema(config: &SiteConfig, base: &str) -> Value {
    let business = &config.business;
    let hours: Vec<Value> = business
        .hours
        .iter()
        .map(|h| {
            json!({
                "@type": "OpeningHoursSpecification",
                "dayOfWeek": h.days,
                "opens": h.opens,
                "closes": h.closes,
            })
        })
        .collect();

    let mut area_served = vec![json!({
        "@type": "GeoCircle",
        "geoMidpoint": coordinates(business),
        "geoRadius": business.service_radius_m.to_string(),
    })];
    area_served.extend(
        config
            .service_areas
            .iter()
            .map(|town| json!({ "@type": "City", "name": town })),
    );

    let offers: Vec<Value> = config
        .services
        .iter()
        .map(|name| {
            json!({
                "@type": "Offer",
                "itemOffered": { "@type": "Service", "name": name },
            })
        })
        .collect();

    json!({
        "@type": "LocalBusiness",
        "@id": format!("{base}/#business"),
        "name": business.name,
        "description": business.description,
        "url": base,
        "telephone": business.phone_display,
        "priceRange": business.price_range,
        "address": postal_address(business),
        "geo": coordinates(business),
        "openingHoursSpecification": hours,
        "sameAs": business.same_as,
        "areaServed": area_served,
        "hasOfferCatalog": {
            "@type": "OfferCatalog",
            "name": "Pest Control Services",
            "itemListElement": offers,
        },
    })
}

pub fn page_schema(config: &SiteConfig, page: PageDescriptor<'_>, url: &str, base: &str) -> Value {
    let provider = json!({ "@id": format!("{base}/#business") });
    match page {
        PageDescriptor::Service(service) => json!({
            "@type": "Service",
            "name": service.name,
            "description": service.description,
            "url": url,
            "serviceType": service.name,
            "provider": provider,
            "areaServed": config
                .service_areas
                .iter()
                .map(|town| json!({ "@type": "City", "name": town }))
                .collect::<Vec<_>>(),
        }),
        PageDescriptor::Area(area) => json!({
            "@type": "Service",
            "name": format!("Pest Control in {}", area.city),
            "description": area.description,
            "url": url,
            "serviceType": "Pest Control",
            "provider": provider,
            "areaServed": {
                "@type": "City",
                "name": area.city,
                "containedInPlace": {
                    "@type": "State",
                    "name": config.business.address.region,
                },
            },
        }),
    }
}

/// The complete JSON-LD document for a page.
pub fn build_schema(config: &SiteConfig, location: &Location) -> Value {
    let base = site_url(config, location);
    let mut business = business_schema(config, &base);
    let Some(page) = PageDescriptor::for_location(config, location) else {
        business["@context"] = json!("https://schema.org");
        return business;
    };
    let url = format!("{base}{}", location.path);
    json!({
        "@context": "https://schema.org",
        "@graph": [business, page_schema(config, page, &url, &base)],
    })
}

/// Serialize `value` for a `<script>` body, with `<` written as `\u003c`.
pub fn script_json(value: &Value) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

pub fn inject_schema(ctx: &Context) -> Result<Teardown, UiError> {
    let dom = &ctx.dom;
    let Some(head) = dom.head() else {
        return Ok(Teardown::new());
    };
    if dom.query(EXISTING)?.is_some() {
        debug!("structured data already present");
        return Ok(Teardown::new());
    }
    let schema = build_schema(&ctx.config, &ctx.location);
    let script = dom.create_element("script");
    dom.set_attr(script, "type", "application/ld+json")?;
    dom.set_attr(script, SCHEMA_MARKER, "")?;
    dom.set_text(script, &script_json(&schema)?)?;
    dom.append_child(head, script)?;
    info!(path = %ctx.location.path, "LocalBusiness schema injected");
    Ok(Teardown::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Dom, MemoryDocument};
    use crate::sim::SimOptions;
    use crate::test_helpers::*;
    use maud::{PreEscaped, html};

    fn injected(sim: &crate::sim::Simulation) -> Value {
        let scripts = find_n(sim, "script[type='application/ld+json']", 1);
        serde_json::from_str(&text(sim, scripts[0])).unwrap()
    }

    #[test]
    fn home_page_gets_business_descriptor() {
        let sim = sim_at("https://www.example.com/", html! { p { "Home" } });
        let _ = inject_schema(&sim.ctx).unwrap();
        let schema = injected(&sim);
        assert_eq!(schema["@context"], "https://schema.org");
        assert_eq!(schema["@type"], "LocalBusiness");
        assert_eq!(schema["name"], "Acadiana Pest Solutions");
        assert_eq!(schema["url"], "https://www.example.com");
        assert_eq!(schema["telephone"], "(337) 555-0199");
        assert_eq!(schema["address"]["postalCode"], "70501");
        assert_eq!(schema["geo"]["latitude"], 30.2241);
        assert_eq!(schema["openingHoursSpecification"][1]["dayOfWeek"][0], "Saturday");
        assert_eq!(schema["areaServed"][0]["geoRadius"], "80000");
        assert_eq!(schema["areaServed"][1]["name"], "Lafayette");
        assert_eq!(schema["hasOfferCatalog"]["itemListElement"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn service_page_adds_service_descriptor() {
        let sim = sim_at("https://www.example.com/termite-control.html", html! {});
        let _ = inject_schema(&sim.ctx).unwrap();
        let schema = injected(&sim);
        let graph = schema["@graph"].as_array().unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[1]["@type"], "Service");
        assert_eq!(graph[1]["name"], "Termite Inspection and Treatment");
        assert_eq!(graph[1]["url"], "https://www.example.com/termite-control.html");
        assert_eq!(graph[1]["provider"]["@id"], graph[0]["@id"]);
    }

    #[test]
    fn area_page_names_the_city() {
        let schema = build_schema(
            &crate::config::SiteConfig::default(),
            &Location::parse("/pest-control-new-iberia.html").unwrap(),
        );
        let area = &schema["@graph"][1];
        assert_eq!(area["name"], "Pest Control in New Iberia");
        assert_eq!(area["areaServed"]["containedInPlace"]["name"], "LA");
        // Bare paths fall back to the configured site URL.
        assert_eq!(schema["@graph"][0]["url"], "https://www.acadianapestsolutions.com");
    }

    #[test]
    fn unknown_pages_get_only_the_business() {
        let schema = build_schema(
            &crate::config::SiteConfig::default(),
            &Location::parse("/blog/spring-termite-swarms.html").unwrap(),
        );
        assert!(schema.get("@graph").is_none());
        assert_eq!(schema["@type"], "LocalBusiness");
    }

    #[test]
    fn runs_once() {
        let sim = sim(html! {});
        let _ = inject_schema(&sim.ctx).unwrap();
        let _ = inject_schema(&sim.ctx).unwrap();
        find_n(&sim, "script", 1);
        assert!(attr(&sim, find(&sim, "script"), SCHEMA_MARKER).is_some());
    }

    #[test]
    fn config_text_cannot_close_the_script() {
        let mut config = crate::config::SiteConfig::default();
        config.business.description =
            "Bugs out </script><img src=x onerror=alert(1)> fast".to_string();
        let sim = sim_with(html! { p { "Home" } }, SimOptions::default().with_config(config));
        let _ = inject_schema(&sim.ctx).unwrap();

        let html = sim.html();
        assert!(!html.contains("</script><img"));
        let reparsed = MemoryDocument::from_html(&html).unwrap();
        assert!(reparsed.query("img").unwrap().is_none());
        let script = reparsed.query("script").unwrap().unwrap();
        let schema: Value = serde_json::from_str(&reparsed.text(script)).unwrap();
        assert_eq!(
            schema["description"],
            "Bugs out </script><img src=x onerror=alert(1)> fast"
        );
    }

    #[test]
    fn existing_structured_data_is_respected() {
        let sim = sim(html! {
            script type="application/ld+json" { (PreEscaped(r#"{"@type":"Organization"}"#)) }
        });
        let _ = inject_schema(&sim.ctx).unwrap();
        let scripts = find_n(&sim, "script", 1);
        assert!(text(&sim, scripts[0]).contains("Organization"));
    }
}
