//! Reference page markup.
//!
//! A single home page that exercises every selector the components look for.
//! `leadsite demo` prints it, and the test suites use it as the end-to-end
//! fixture. Business details come from the [`SiteConfig`], so the page always
//! agrees with the injected structured data.

use crate::config::SiteConfig;
use maud::{DOCTYPE, Markup, html};

const TESTIMONIALS: &[(&str, &str)] = &[
    (
        "They found Formosan termites our last company missed and had the house treated the same week.",
        "Danielle R., Lafayette",
    ),
    (
        "Mosquito barrier service made our backyard usable again. Courteous techs, always on time.",
        "Marcus T., Youngsville",
    ),
    (
        "Fast response on a Saturday for a rat problem in our restaurant. Highly recommend.",
        "Chef Andre B., Broussard",
    ),
];

const FAQ: &[(&str, &str)] = &[
    (
        "How often should I schedule pest control in south Louisiana?",
        "Our humid climate keeps insects active year-round, so most homes do best with quarterly service.",
    ),
    (
        "Are your treatments safe for kids and pets?",
        "Yes. We use EPA-registered products applied by licensed technicians and tell you exactly when areas are safe to re-enter.",
    ),
    (
        "Do you offer termite inspections for real estate closings?",
        "We provide Wood Destroying Insect reports for buyers, sellers and lenders, usually within 48 hours.",
    ),
];

const STATS: &[(&str, &str, &str, &str)] = &[
    ("2500", "", "+", "Homes Protected"),
    ("15", "", "", "Years in Acadiana"),
    ("4.9", "", "/5", "Average Rating"),
    ("24", "", "/7", "Emergency Line"),
];

const PROCESS: &[(&str, &str)] = &[
    ("Inspect", "A licensed technician walks the property and identifies every entry point."),
    ("Treat", "Targeted treatment for the pests we find, not a one-size-fits-all spray."),
    ("Protect", "Ongoing barrier service and free re-treatments between visits."),
];

fn header(config: &SiteConfig) -> Markup {
    let business = &config.business;
    html! {
        header.site-header {
            div.container {
                a.logo href="index.html" { (business.name) }
                button.hamburger #hamburgerBtn type="button" aria-controls="mainNav" aria-label="Open menu" {
                    span {} span {} span {}
                }
                nav.main-nav #mainNav aria-label="Main navigation" {
                    ul.nav-list {
                        li { a.nav-link href="index.html" { "Home" } }
                        li.has-dropdown {
                            a.nav-link.dropdown-toggle href="services.html" { "Services" }
                            ul.dropdown-menu {
                                @for page in &config.service_pages {
                                    li { a href={ (page.slug) ".html" } { (page.name) } }
                                }
                            }
                        }
                        li.has-dropdown {
                            a.nav-link.dropdown-toggle href="service-areas.html" { "Service Areas" }
                            ul.dropdown-menu {
                                @for area in &config.area_pages {
                                    li { a href={ (area.slug) ".html" } { (area.city) } }
                                }
                            }
                        }
                        li { a.nav-link href="blog.html" { "Blog" } }
                        li { a.nav-link href="contact.html" { "Contact" } }
                    }
                }
                a.header-phone href={ "tel:" (business.phone_dial) } { (business.phone_display) }
            }
        }
        div.nav-overlay #navOverlay aria-hidden="true" {}
    }
}

fn hero(config: &SiteConfig) -> Markup {
    let business = &config.business;
    html! {
        section.hero {
            h1 { "Pest Control in Lafayette & Acadiana" }
            p { (business.description) }
            a.btn.btn-primary href={ "tel:" (business.phone_dial) } { "Call " (business.phone_display) }
            a.btn.btn-secondary href="#contact" { "Get a Free Quote" }
        }
    }
}

fn services(config: &SiteConfig) -> Markup {
    html! {
        section.services #services {
            h2.reveal { "Our Services" }
            div.services-grid {
                @for page in &config.service_pages {
                    article.service-card {
                        h3 { (page.name) }
                        p { (page.description) }
                        a href={ (page.slug) ".html" } { "Learn more" }
                    }
                }
            }
        }
    }
}

fn stats() -> Markup {
    html! {
        section.stats {
            @for (count, prefix, suffix, label) in STATS {
                div.stat-item {
                    span.stat-number data-count=(count) data-prefix=(prefix) data-suffix=(suffix) { (count) }
                    span.stat-label { (label) }
                }
            }
        }
    }
}

fn process() -> Markup {
    html! {
        section.process {
            h2 { "How It Works" }
            @for (i, (title, text)) in PROCESS.iter().enumerate() {
                div.process-step {
                    span.step-number { (i + 1) }
                    h3 { (title) }
                    p { (text) }
                }
            }
        }
    }
}

fn testimonials() -> Markup {
    html! {
        section.testimonials {
            h2 { "What Our Customers Say" }
            div.testimonials-slider aria-roledescription="carousel" {
                @for (quote, author) in TESTIMONIALS {
                    div.testimonial-slide {
                        blockquote { (quote) }
                        cite { (author) }
                    }
                }
                button.slider-prev type="button" aria-label="Previous testimonial" { "‹" }
                button.slider-next type="button" aria-label="Next testimonial" { "›" }
                div.slider-dots {
                    @for i in 0..TESTIMONIALS.len() {
                        button.slider-dot type="button" aria-label={ "Show testimonial " (i + 1) } {}
                    }
                }
            }
        }
    }
}

fn faq() -> Markup {
    html! {
        section.faq #faq {
            h2 { "Frequently Asked Questions" }
            div.faq-list {
                @for (question, answer) in FAQ {
                    div.faq-item {
                        button.faq-question type="button" { (question) }
                        div.faq-answer { p { (answer) } }
                    }
                }
            }
        }
    }
}

fn areas(config: &SiteConfig) -> Markup {
    html! {
        section.areas {
            h2 { "Areas We Serve" }
            div.areas-grid {
                @for area in &config.area_pages {
                    a.area-card href={ (area.slug) ".html" } { (area.city) }
                }
            }
        }
    }
}

fn contact(config: &SiteConfig) -> Markup {
    html! {
        section.contact-section #contact {
            h2 { "Request a Free Inspection" }
            form.contact-form action="#" method="post" {
                label for="name" { "Full Name *" }
                input #name type="text" name="name" required;
                label for="email" { "Email *" }
                input #email type="email" name="email" required;
                label for="phone" { "Phone" }
                input #phone type="tel" name="phone";
                label for="service" { "Service" }
                select #service name="service" {
                    option value="" { "Select a service" }
                    @for page in &config.service_pages {
                        option value=(page.slug) { (page.name) }
                    }
                }
                label for="message" { "Message *" }
                textarea #message name="message" rows="5" required {}
                button.btn.btn-primary type="submit" { "Send Message" }
            }
            div.form-success hidden role="status" {
                "Thank you! We'll contact you within one business day."
            }
        }
    }
}

fn footer(config: &SiteConfig) -> Markup {
    let business = &config.business;
    let address = &business.address;
    html! {
        footer.site-footer {
            p { (business.name) " · " (address.locality) ", " (address.region) " " (address.postal_code) }
            p { a href={ "tel:" (business.phone_dial) } { (business.phone_display) } }
            ul.footer-areas {
                @for town in &config.service_areas {
                    li { (town) }
                }
            }
        }
        a.back-to-top #backToTop href="#" aria-label="Back to top" { "↑" }
        div.mobile-cta-bar {
            a href={ "tel:" (business.phone_dial) } { "Call Now" }
            a href="#contact" { "Free Quote" }
        }
        div.cookie-banner role="dialog" aria-label="Cookie consent" {
            p { "We use cookies to understand how visitors use this site." }
            button.cookie-accept type="button" { "Accept" }
            button.cookie-decline type="button" { "Decline" }
        }
    }
}

pub fn reference_page_with(config: &SiteConfig) -> String {
    let business = &config.business;
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (business.name) " | Pest Control in Lafayette, LA" }
            }
            body {
                div.emergency-banner {
                    p {
                        "24/7 emergency pest service: "
                        a href={ "tel:" (business.phone_dial) } { (business.phone_display) }
                    }
                    button.emergency-close type="button" aria-label="Dismiss" { "×" }
                }
                (header(config))
                main {
                    (hero(config))
                    (services(config))
                    (stats())
                    (process())
                    (testimonials())
                    (faq())
                    (areas(config))
                    (contact(config))
                }
                (footer(config))
            }
        }
    }
    .into_string()
}

pub fn reference_page() -> String {
    reference_page_with(&SiteConfig::default())
}
