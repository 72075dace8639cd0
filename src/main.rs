use std::{path::Path, sync::Arc};

use canon_edge::{
    adapters,
    config::{DEFAULT_CONFIG_FILE, EdgeConfig, EdgeConfigValidator, load_config},
    core::{
        canonical::{canonical_url_for_request, generate_debug_info},
        robots::RobotsPolicy,
        seo::{SeoValidator, generate_seo_validation_report},
    },
    tracing_setup,
};
use clap::Parser;
use color_eyre::{Result, eyre::Context};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML, YAML or JSON); `canon-edge.toml` is used when present
    #[clap(short, long, global = true)]
    config: Option<String>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the edge server (default)
    Serve,
    /// Validate the effective configuration
    Validate,
    /// Audit canonical URLs, robots.txt and redirects for a list of URLs
    Audit {
        /// Absolute URLs to audit
        #[clap(required = true)]
        urls: Vec<String>,
        /// Print the report as JSON instead of Markdown
        #[clap(long)]
        json: bool,
    },
    /// Print the robots.txt served to a hostname
    Robots {
        #[clap(long)]
        host: String,
    },
    /// Print the canonical URL for a path
    Canonical {
        /// Path, optionally with a query (`/posts/test?page=2`)
        path: String,
        /// Original page URL; prints debug info as JSON
        #[clap(long)]
        url: Option<String>,
    },
    /// Write a starter configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve_command(config_path).await,
        Commands::Validate => validate_config_command(config_path),
        Commands::Audit { urls, json } => audit_command(config_path, &urls, json),
        Commands::Robots { host } => robots_command(config_path, &host),
        Commands::Canonical { path, url } => canonical_command(config_path, &path, url.as_deref()),
        Commands::Init { output } => init_config_command(&output).await,
    }
}

async fn serve_command(config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;

    tracing_setup::init_tracing(&config.logging).context("Failed to initialize tracing")?;

    EdgeConfigValidator::validate(&config).context("Invalid configuration")?;

    let provider = rustls::crypto::aws_lc_rs::default_provider();
    if let Err(e) = rustls::crypto::CryptoProvider::install_default(provider) {
        tracing::warn!(
            "CryptoProvider::install_default for aws-lc-rs reported an error: {:?}. \
            A provider was probably installed already.",
            e
        );
    }

    adapters::serve(Arc::new(config)).await
}

/// Validate configuration and exit
fn validate_config_command(config_path: Option<&str>) -> Result<()> {
    println!(
        "🔍 Validating configuration: {}",
        config_path.unwrap_or(DEFAULT_CONFIG_FILE)
    );

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match EdgeConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            print_summary(&config);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • custom_domain is a bare hostname (no scheme, no path)");
            println!("   • base_path starts with '/'");
            println!("   • proxy targets start with http:// or https://");
            println!("   • listen_addr looks like '127.0.0.1:8788'");
            std::process::exit(1);
        }
    }
}

fn print_summary(config: &EdgeConfig) {
    println!("📋 Configuration Summary:");
    println!("   • Listen Address: {}", config.listen_addr);
    println!("   • Custom Domain: {}", config.canonical.custom_domain);
    println!("   • Base Path: {}", config.base_path);
    println!("   • Origin: {:?}", config.origin);
    println!("   • Max Body Bytes: {}", config.max_body_bytes);
    println!(
        "   • Canonical Redirect: {}",
        config.features.canonical_redirect
    );
}

fn audit_command(config_path: Option<&str>, urls: &[String], json: bool) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    let validator = SeoValidator::new(config.canonical, config.robots);
    let report = validator.run_comprehensive_seo_validation(urls);

    if json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize SEO report")?;
        println!("{rendered}");
    } else {
        print!("{}", generate_seo_validation_report(&report));
    }
    Ok(())
}

fn robots_command(config_path: Option<&str>, host: &str) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    println!("{}", RobotsPolicy::for_hostname(host).render(&config.robots));
    Ok(())
}

fn canonical_command(config_path: Option<&str>, path: &str, original: Option<&str>) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    let canonical = canonical_url_for_request(path, &config.canonical);

    match original {
        Some(original) => {
            let info = generate_debug_info(original, &canonical, &config.canonical);
            let rendered =
                serde_json::to_string_pretty(&info).context("Failed to serialize debug info")?;
            println!("{rendered}");
        }
        None => println!("{canonical}"),
    }
    Ok(())
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# canon-edge configuration
#
# Every key can be overridden from the environment with the CANON_EDGE_
# prefix and "__" between sections, e.g.
#   CANON_EDGE_FEATURES__CANONICAL_REDIRECT=false
# CUSTOM_DOMAIN and BASE_PATH are honored as well.

listen_addr = "127.0.0.1:8788"
base_path = "/"
# largest request body buffered for forwarding
max_body_bytes = 2097152

[origin]
type = "static"
root = "./dist"

# Forward to a running server instead:
# [origin]
# type = "proxy"
# target = "http://127.0.0.1:4321"

[canonical]
custom_domain = "midnight480.com"
force_https = true
preserve_query = false
normalize_trailing_slash = true

[robots]
custom_domain = "midnight480.com"
allowed_bots = ["Googlebot", "Bingbot"]
disallowed_bots = [
    "GPTBot",
    "ChatGPT-User",
    "CCBot",
    "anthropic-ai",
    "Claude-Web",
    "PerplexityBot",
    "YouBot",
    "Meta-ExternalAgent",
    "FacebookBot",
]
crawl_delay = 1

[robots.cache_max_age]
normal = 86400
restrictive = 3600

[features]
canonical_redirect = true

[logging]
level = "info"
json = false
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'canon-edge serve --config {config_path}' to start the server");
    Ok(())
}
