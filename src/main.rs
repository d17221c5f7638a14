mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

use hf_av::ToolRegistry;
use hf_core::config::Config;

/// Load the config file (or defaults) and apply environment overrides.
fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting hlsforge");
    hf_server::start(config).await?;
    Ok(())
}

async fn sweep(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let ctx = hf_server::build_context(config)?;
    let summary = ctx.services.sweep().run().await;

    println!("Already ready:     {}", summary.already_ready);
    println!("Converted:         {}", summary.converted);
    println!("Failed:            {}", summary.failed);
    println!("Leftovers removed: {}", summary.leftovers_removed);

    if summary.failed > 0 {
        anyhow::bail!("{} conversion(s) failed", summary.failed);
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("Some required tools are missing")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server:     {}:{}", config.server.host, config.server.port);
    println!("  Raw dir:    {}", config.storage.raw_dir.display());
    println!("  HLS dir:    {}", config.storage.derived_dir.display());
    println!("  Extensions: {}", config.storage.extensions.join(", "));
    for warning in config.validate() {
        println!("  ! {warning}");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlsforge=trace,hf_server=trace,hf_assets=trace,hf_av=debug,hf_core=debug,tower_http=debug"
                .to_string()
        } else {
            "hlsforge=info,hf_server=info,hf_assets=info,hf_av=info,hf_core=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Sweep => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sweep(cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}
