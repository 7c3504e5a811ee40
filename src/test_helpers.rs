//! Shared test utilities for the leadsite test suite.
//!
//! Fixtures are written with `maud` and loaded into a [`Simulation`], so a
//! test reads as markup plus gestures:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let sim = sim(html! {
//!     header.site-header { "Acadiana Pest Solutions" }
//! });
//! let header = find(&sim, ".site-header");
//! ```

use crate::dom::NodeId;
use crate::sim::{SimOptions, Simulation};
use maud::{DOCTYPE, Markup, html};

/// Mobile-sized window (below the 992px breakpoint).
pub const MOBILE_WIDTH: f64 = 375.0;

// =========================================================================
// Fixture setup
// =========================================================================

/// Wrap body markup in a full document titled "Test Page".
pub fn page(body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Test Page" }
            }
            body {
                (body)
            }
        }
    }
    .into_string()
}

/// Desktop simulation at `/` with intersection observation.
pub fn sim(body: Markup) -> Simulation {
    sim_with(body, SimOptions::default())
}

pub fn sim_at(url: &str, body: Markup) -> Simulation {
    sim_with(body, SimOptions::at(url))
}

pub fn mobile_sim(body: Markup) -> Simulation {
    sim_with(body, SimOptions::default().with_size(MOBILE_WIDTH, 700.0))
}

pub fn sim_with(body: Markup, options: SimOptions) -> Simulation {
    Simulation::from_html(&page(body), options).unwrap()
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// First element matching `selector`. Panics if none.
pub fn find(sim: &Simulation, selector: &str) -> NodeId {
    sim.find(selector)
        .unwrap_or_else(|| panic!("no element matches '{selector}'"))
}

/// All elements matching `selector`, asserting there are exactly `n`.
pub fn find_n(sim: &Simulation, selector: &str, n: usize) -> Vec<NodeId> {
    let found = sim.find_all(selector);
    assert_eq!(found.len(), n, "expected {n} matches for '{selector}'");
    found
}

// =========================================================================
// Attribute assertions
// =========================================================================

pub fn has_class(sim: &Simulation, node: NodeId, class: &str) -> bool {
    use crate::dom::Dom;
    sim.doc.has_class(node, class)
}

pub fn attr(sim: &Simulation, node: NodeId, name: &str) -> Option<String> {
    use crate::dom::Dom;
    sim.doc.attr(node, name)
}

pub fn text(sim: &Simulation, node: NodeId) -> String {
    use crate::dom::Dom;
    sim.doc.text(node)
}

/// Panics unless exactly the nodes at `open` carry `class`.
pub fn assert_only(sim: &Simulation, nodes: &[NodeId], class: &str, open: &[usize]) {
    let actual: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| has_class(sim, **n, class))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(actual, open, "nodes carrying '{class}'");
}
