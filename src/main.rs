use clap::{Parser, Subcommand};
use leadsite::config::{self, SiteConfig};
use leadsite::env::{LogAnalytics, Location};
use leadsite::sim::{SimOptions, Simulation};
use leadsite::{app, output, page, schema};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leadsite")]
#[command(about = "Interaction layer for a local-services lead generation site")]
#[command(long_about = "\
Interaction layer for a local-services lead generation site

Runs the site's widgets (navigation, scroll effects, FAQ accordion,
testimonial carousel, counters, contact form, structured data) against
static HTML pages in an in-memory document, with a virtual clock.

Page contract (selectors the widgets look for):

  .site-header                  sticky header, `scrolled` past the threshold
  .hamburger / .main-nav        mobile menu, closed by .nav-overlay or Escape
  li.has-dropdown               dropdown submenus with keyboard support
  .reveal, .service-card, ...   fade in when scrolled into view
  .back-to-top, .mobile-cta-bar shown after scrolling
  .faq-item                     .faq-question + .faq-answer accordion
  .testimonials-slider          .testimonial-slide, .slider-prev/next, .slider-dot
  [data-count]                  animated counter (data-prefix, data-suffix)
  form.contact-form             validated, with .form-success notice
  a[href^='tel:']               phone-click tracking

Run 'leadsite demo' for a page that uses all of them, and
'leadsite gen-config' for a documented config.toml.")]
#[command(version = env!("LEADSITE_VERSION"))]
struct Cli {
    /// Directory holding config.toml (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a page in the in-memory document and print the resulting HTML
    Render {
        /// HTML file to load
        page: PathBuf,
        /// URL path the page is served from (defaults to the file name)
        #[arg(long)]
        path: Option<String>,
        /// Use the fallback for browsers without intersection observation
        #[arg(long)]
        no_observer: bool,
        /// Run animation frames for up to this many milliseconds before printing
        #[arg(long)]
        settle: Option<u64>,
    },
    /// Print the structured data injected for a page
    Schema {
        /// URL path of the page
        #[arg(long, default_value = "/")]
        path: String,
    },
    /// Report which widgets each page in a directory activates
    Check {
        /// Directory of .html files
        dir: PathBuf,
    },
    /// Print a reference page that uses every widget
    Demo,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let site_config = load_site_config(cli.config.as_deref())?;

    match cli.command {
        Command::Render {
            page,
            path,
            no_observer,
            settle,
        } => {
            let html = std::fs::read_to_string(&page)?;
            let url = path.unwrap_or_else(|| default_url_path(&page));
            let mut options = SimOptions::at(&url).with_config(site_config);
            if no_observer {
                options = options.without_observer();
            }
            let mut sim = Simulation::from_html(&html, options)?;
            sim.ctx.analytics = Some(Rc::new(LogAnalytics));
            output::print_startup(sim.start());
            if let Some(ms) = settle {
                sim.settle(ms);
            }
            println!("{}", sim.html());
        }
        Command::Schema { path } => {
            let location = Location::parse(&path)?;
            let value = schema::build_schema(&site_config, &location);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Check { dir } => {
            println!("==> Checking {}", dir.display());
            let audits = app::check_site(&dir, &site_config)?;
            output::print_check_output(&audits);
        }
        Command::Demo => {
            println!("{}", page::reference_page_with(&site_config));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_site_config(dir: Option<&Path>) -> Result<SiteConfig, config::ConfigError> {
    match dir {
        Some(dir) => config::load_config(dir),
        None => Ok(SiteConfig::default()),
    }
}

fn default_url_path(page: &Path) -> String {
    match page.file_name() {
        Some(name) => format!("/{}", name.to_string_lossy()),
        None => "/".to_string(),
    }
}
