//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Every option has a
//! stock default describing the business the site was built for; a user file
//! only needs the keys it wants to override. The resolved [`SiteConfig`] is
//! wrapped in an `Rc` at startup and handed read-only to every component.
//!
//! ## Configuration Options
//!
//! ```toml
//! services = ["Residential Pest Control", "Termite Inspection and Treatment"]
//! service_areas = ["Lafayette", "Broussard"]
//!
//! [business]
//! name = "Acadiana Pest Solutions"
//! phone_display = "(337) 555-0199"
//! phone_dial = "+13375550199"
//!
//! [business.address]
//! locality = "Lafayette"
//! region = "LA"
//!
//! [business.geo]
//! latitude = 30.2241
//! longitude = -92.0198
//!
//! [behavior]
//! scroll_threshold = 80.0     # px before the header turns "scrolled"
//! desktop_breakpoint = 992.0  # px; hover dropdowns at or above
//! reveal_threshold = 0.15     # visible fraction that triggers a reveal
//! counter_duration_ms = 2000
//! carousel_interval_ms = 5000
//!
//! [accordion]
//! single_open = true          # opening one FAQ closes the others
//!
//! [[service_pages]]
//! slug = "termite-control"
//! name = "Termite Inspection and Treatment"
//! description = "..."
//! ```
//!
//! Run `leadsite gen-config` for the full documented file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Service names advertised in the structured-data catalog.
    pub services: Vec<String>,
    /// Towns and parishes the business serves.
    pub service_areas: Vec<String>,
    /// Business identity used by the metadata injector and phone tracking.
    pub business: BusinessConfig,
    /// Service pages, matched by the final URL path segment.
    pub service_pages: Vec<ServicePage>,
    /// Area landing pages, matched by the final URL path segment.
    pub area_pages: Vec<AreaPage>,
    /// Thresholds and durations for every widget.
    pub behavior: BehaviorConfig,
    /// FAQ accordion behaviour.
    pub accordion: AccordionConfig,
    /// Storage key names for persisted UI flags.
    pub storage: StorageConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            services: [
                "Residential Pest Control",
                "Commercial Pest Control",
                "Termite Inspection and Treatment",
                "Mosquito Control",
                "Rodent Control",
                "Bed Bug Treatment",
                "Wildlife Removal",
            ]
            .map(String::from)
            .to_vec(),
            service_areas: [
                "Lafayette",
                "Broussard",
                "Youngsville",
                "Scott",
                "Carencro",
                "Breaux Bridge",
                "New Iberia",
            ]
            .map(String::from)
            .to_vec(),
            business: BusinessConfig::default(),
            service_pages: default_service_pages(),
            area_pages: default_area_pages(),
            behavior: BehaviorConfig::default(),
            accordion: AccordionConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.business.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "business.name must not be empty".into(),
            ));
        }
        let dial = self.business.phone_dial.strip_prefix('+').unwrap_or(&self.business.phone_dial);
        if dial.is_empty() || !dial.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Validation(
                "business.phone_dial must be digits with an optional leading +".into(),
            ));
        }
        let b = &self.behavior;
        for (name, value) in [
            ("behavior.reveal_threshold", b.reveal_threshold),
            ("behavior.counter_threshold", b.counter_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Validation(format!("{name} must be in (0, 1]")));
            }
        }
        if b.desktop_breakpoint <= 0.0 {
            return Err(ConfigError::Validation(
                "behavior.desktop_breakpoint must be positive".into(),
            ));
        }
        for (name, value) in [
            ("behavior.counter_duration_ms", b.counter_duration_ms),
            ("behavior.carousel_interval_ms", b.carousel_interval_ms),
            ("behavior.form_submit_delay_ms", b.form_submit_delay_ms),
            ("behavior.success_notice_ms", b.success_notice_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{name} must be non-zero")));
            }
        }
        if b.carousel_transition_ms >= b.carousel_interval_ms {
            return Err(ConfigError::Validation(
                "behavior.carousel_transition_ms must be shorter than carousel_interval_ms".into(),
            ));
        }
        let slugs = self
            .service_pages
            .iter()
            .map(|p| &p.slug)
            .chain(self.area_pages.iter().map(|p| &p.slug));
        for slug in slugs {
            if slug.trim().is_empty() || slug.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "page slug {slug:?} must be a non-empty path segment"
                )));
            }
        }
        Ok(())
    }

    /// Service page whose slug matches a URL path segment.
    ///
    /// The segment may carry an `.html` extension.
    pub fn service_page(&self, segment: &str) -> Option<&ServicePage> {
        let slug = strip_html(segment);
        self.service_pages.iter().find(|p| p.slug == slug)
    }

    /// Area page whose slug matches a URL path segment.
    pub fn area_page(&self, segment: &str) -> Option<&AreaPage> {
        let slug = strip_html(segment);
        self.area_pages.iter().find(|p| p.slug == slug)
    }
}

fn strip_html(segment: &str) -> &str {
    segment.strip_suffix(".html").unwrap_or(segment)
}

/// Business identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessConfig {
    pub name: String,
    pub description: String,
    /// Canonical site origin, e.g. `https://example.com`.
    pub url: String,
    /// Phone number as shown to visitors.
    pub phone_display: String,
    /// Phone number for `tel:` links.
    pub phone_dial: String,
    pub price_range: String,
    pub address: AddressConfig,
    pub geo: GeoConfig,
    pub hours: Vec<OpeningHours>,
    /// External profile links (`sameAs`).
    pub same_as: Vec<String>,
    /// Radius of the served area around `geo`, in metres.
    pub service_radius_m: u32,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: "Acadiana Pest Solutions".to_string(),
            description: "Professional pest control services in Lafayette, LA and the \
                          Acadiana region. Residential and commercial pest management."
                .to_string(),
            url: "https://www.acadianapestsolutions.com".to_string(),
            phone_display: "(337) 555-0199".to_string(),
            phone_dial: "+13375550199".to_string(),
            price_range: "$$".to_string(),
            address: AddressConfig::default(),
            geo: GeoConfig::default(),
            hours: vec![
                OpeningHours {
                    days: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
                        .map(String::from)
                        .to_vec(),
                    opens: "07:30".to_string(),
                    closes: "18:00".to_string(),
                },
                OpeningHours {
                    days: vec!["Saturday".to_string()],
                    opens: "08:00".to_string(),
                    closes: "14:00".to_string(),
                },
            ],
            same_as: Vec::new(),
            service_radius_m: 80_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddressConfig {
    pub street: String,
    pub locality: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            street: String::new(),
            locality: "Lafayette".to_string(),
            region: "LA".to_string(),
            postal_code: "70501".to_string(),
            country: "US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeoConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            latitude: 30.2241,
            longitude: -92.0198,
        }
    }
}

/// One opening-hours rule: the same hours on each listed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpeningHours {
    pub days: Vec<String>,
    pub opens: String,
    pub closes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicePage {
    /// Final path segment without `.html`.
    pub slug: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaPage {
    /// Final path segment without `.html`.
    pub slug: String,
    pub city: String,
    pub description: String,
}

fn default_service_pages() -> Vec<ServicePage> {
    [
        ("residential-pest-control", "Residential Pest Control", "Year-round home protection against roaches, ants, spiders and other household pests."),
        ("commercial-pest-control", "Commercial Pest Control", "Discreet, documented pest management for restaurants, offices and warehouses."),
        ("termite-control", "Termite Inspection and Treatment", "Formosan and subterranean termite inspections, liquid treatments and bait systems."),
        ("mosquito-control", "Mosquito Control", "Barrier sprays and breeding-site treatment for south Louisiana yards."),
        ("rodent-control", "Rodent Control", "Rat and mouse exclusion, trapping and sanitation."),
        ("bed-bug-treatment", "Bed Bug Treatment", "Heat and targeted chemical bed bug elimination with follow-up inspections."),
        ("wildlife-removal", "Wildlife Removal", "Humane removal of raccoons, opossums, squirrels and snakes."),
    ]
    .into_iter()
    .map(|(slug, name, description)| ServicePage {
        slug: slug.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

fn default_area_pages() -> Vec<AreaPage> {
    [
        ("pest-control-lafayette", "Lafayette"),
        ("pest-control-broussard", "Broussard"),
        ("pest-control-youngsville", "Youngsville"),
        ("pest-control-scott", "Scott"),
        ("pest-control-carencro", "Carencro"),
        ("pest-control-breaux-bridge", "Breaux Bridge"),
        ("pest-control-new-iberia", "New Iberia"),
    ]
    .into_iter()
    .map(|(slug, city)| AreaPage {
        slug: slug.to_string(),
        city: city.to_string(),
        description: format!("Local pest control and termite protection in {city}, Louisiana."),
    })
    .collect()
}

/// Thresholds and durations shared by the widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorConfig {
    /// Scroll offset (px) past which the header is "scrolled".
    pub scroll_threshold: f64,
    /// Scroll offset (px) past which the back-to-top button shows.
    pub back_to_top_threshold: f64,
    /// Scroll offset (px) past which the mobile call bar shows.
    pub cta_bar_threshold: f64,
    /// Viewport width (px) at and above which the layout is "desktop".
    pub desktop_breakpoint: f64,
    /// Quiet period before a resize closes the dropdowns.
    pub resize_debounce_ms: u64,
    /// Visible fraction that reveals an element.
    pub reveal_threshold: f64,
    /// Root margin handed to the intersection observer for reveals.
    pub reveal_root_margin: String,
    /// Delay step between auto-tagged cards of one group.
    pub reveal_stagger_ms: u64,
    /// Visible fraction that starts a counter.
    pub counter_threshold: f64,
    pub counter_duration_ms: u64,
    pub carousel_interval_ms: u64,
    pub carousel_transition_ms: u64,
    /// Horizontal travel (px) that counts as a swipe.
    pub swipe_threshold: f64,
    /// Simulated network delay before a form "completes".
    pub form_submit_delay_ms: u64,
    /// How long the success notice stays up.
    pub success_notice_ms: u64,
    /// Extra space (px) kept above anchor targets below the sticky header.
    pub anchor_offset: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: 80.0,
            back_to_top_threshold: 400.0,
            cta_bar_threshold: 300.0,
            desktop_breakpoint: 992.0,
            resize_debounce_ms: 250,
            reveal_threshold: 0.15,
            reveal_root_margin: "0px 0px -60px 0px".to_string(),
            reveal_stagger_ms: 100,
            counter_threshold: 0.3,
            counter_duration_ms: 2000,
            carousel_interval_ms: 5000,
            carousel_transition_ms: 500,
            swipe_threshold: 50.0,
            form_submit_delay_ms: 800,
            success_notice_ms: 5000,
            anchor_offset: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccordionConfig {
    /// Opening a panel collapses its siblings.
    pub single_open: bool,
}

impl Default for AccordionConfig {
    fn default() -> Self {
        Self { single_open: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Local-storage key holding the cookie consent choice.
    pub consent_key: String,
    /// Session-storage key set when the emergency banner is dismissed.
    pub emergency_dismissed_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            consent_key: "cookie_consent".to_string(),
            emergency_dismissed_key: "emergency_banner_dismissed".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (including arrays) replace base values.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory, on top of the
/// stock defaults.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command. Service and area page tables are
/// abbreviated to one example each; omit the arrays entirely to keep the
/// full stock tables.
pub fn stock_config_toml() -> &'static str {
    r##"# leadsite configuration
# ======================
# All settings are optional. Values shown are the defaults.
# Unknown keys cause an error.

# Service names listed in the structured-data offer catalog.
services = [
    "Residential Pest Control",
    "Commercial Pest Control",
    "Termite Inspection and Treatment",
    "Mosquito Control",
    "Rodent Control",
    "Bed Bug Treatment",
    "Wildlife Removal",
]

# Towns the business serves (structured-data areaServed).
service_areas = ["Lafayette", "Broussard", "Youngsville", "Scott", "Carencro", "Breaux Bridge", "New Iberia"]

# ---------------------------------------------------------------------------
# Business identity
# ---------------------------------------------------------------------------
[business]
name = "Acadiana Pest Solutions"
description = "Professional pest control services in Lafayette, LA and the Acadiana region. Residential and commercial pest management."
url = "https://www.acadianapestsolutions.com"
phone_display = "(337) 555-0199"   # as shown to visitors
phone_dial = "+13375550199"        # digits for tel: links
price_range = "$$"
same_as = []                       # external profile URLs
service_radius_m = 80000           # served radius around the geo point

[business.address]
street = ""
locality = "Lafayette"
region = "LA"
postal_code = "70501"
country = "US"

[business.geo]
latitude = 30.2241
longitude = -92.0198

[[business.hours]]
days = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
opens = "07:30"
closes = "18:00"

[[business.hours]]
days = ["Saturday"]
opens = "08:00"
closes = "14:00"

# ---------------------------------------------------------------------------
# Widget behaviour
# ---------------------------------------------------------------------------
[behavior]
scroll_threshold = 80.0            # px before the header turns "scrolled"
back_to_top_threshold = 400.0      # px before the back-to-top button shows
cta_bar_threshold = 300.0          # px before the mobile call bar shows
desktop_breakpoint = 992.0         # px; hover dropdowns at or above
resize_debounce_ms = 250
reveal_threshold = 0.15            # visible fraction that reveals an element
reveal_root_margin = "0px 0px -60px 0px"
reveal_stagger_ms = 100            # cascade step between auto-tagged cards
counter_threshold = 0.3
counter_duration_ms = 2000
carousel_interval_ms = 5000
carousel_transition_ms = 500
swipe_threshold = 50.0             # px of horizontal travel for a swipe
form_submit_delay_ms = 800
success_notice_ms = 5000
anchor_offset = 16.0

[accordion]
single_open = true                 # opening one FAQ collapses the others

[storage]
consent_key = "cookie_consent"
emergency_dismissed_key = "emergency_banner_dismissed"

# ---------------------------------------------------------------------------
# Page lookup tables (matched against the final URL path segment)
# ---------------------------------------------------------------------------
# [[service_pages]]
# slug = "termite-control"
# name = "Termite Inspection and Treatment"
# description = "Formosan and subterranean termite inspections, liquid treatments and bait systems."
#
# [[area_pages]]
# slug = "pest-control-lafayette"
# city = "Lafayette"
# description = "Local pest control and termite protection in Lafayette, Louisiana."
"##
}
