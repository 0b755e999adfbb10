//! `archtl` - CLI for archive-timeline
//!
//! Runs the records gateway, or acts as a client of it to print the
//! timeline and export map layers.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use archive_timeline::cli::{Cli, Command, ConfigCommand, MapCommand, ServeCommand, TimelineCommand};
use archive_timeline::map::{InMemoryBackend, LayeredSurface, MapRenderer};
use archive_timeline::{gateway, init_logging, Config, HttpPageSource, RecordFetchClient};

/// Viewport used when exporting layers.
const EXPORT_VIEWPORT: (f64, f64) = (1024.0, 768.0);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(config, cmd).await,
        Command::Timeline(cmd) => handle_timeline(&config, &cmd).await,
        Command::Map(cmd) => handle_map(&config, cmd).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> Result<()> {
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(dir) = cmd.static_dir {
        config.server.static_dir = Some(dir);
    }
    gateway::serve(&config).await?;
    Ok(())
}

/// Walk the gateway, keeping whatever loaded before a failure.
async fn fetch_records(
    config: &Config,
    pages: Option<usize>,
) -> Result<(RecordFetchClient<HttpPageSource>, Option<archive_timeline::Error>)> {
    let source = HttpPageSource::from_config(config)?;
    debug!(endpoint = source.endpoint(), "fetching records");
    let mut client = RecordFetchClient::new(source);
    let failure = client.drain(pages).await.err();
    Ok((client, failure))
}

fn report_failure(
    client: &RecordFetchClient<HttpPageSource>,
    failure: Option<archive_timeline::Error>,
) -> Result<()> {
    match failure {
        Some(err) => {
            if let Some(message) = client.error_message() {
                eprintln!("{message}");
            }
            Err(err).context("fetching records")
        }
        None => Ok(()),
    }
}

async fn handle_timeline(config: &Config, cmd: &TimelineCommand) -> Result<()> {
    let (client, failure) = fetch_records(config, cmd.pages).await?;
    let entries = client.timeline().entries();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{entry}");
        }
        if client.can_load_more() {
            println!("[more records available; use --pages to fetch further]");
        }
    }

    report_failure(&client, failure)
}

async fn handle_map(config: &Config, cmd: MapCommand) -> Result<()> {
    let (client, failure) = fetch_records(config, cmd.pages).await?;

    let mut renderer = MapRenderer::new();
    renderer.mount(|| {
        let (width, height) = EXPORT_VIEWPORT;
        Ok(LayeredSurface::new(
            InMemoryBackend::new(&config.map, width, height),
            config.map.circle.clone(),
        ))
    })?;
    renderer.surface_loaded()?;

    let field = cmd.dataset_field.or_else(|| config.map.dataset_field.clone());
    renderer.render_records(client.records(), field.as_deref())?;

    let surface = renderer
        .surface()
        .context("map surface missing after mount")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&surface.backend().to_geojson()?)?
    );

    report_failure(&client, failure)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = config.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Upstream]");
                println!("  URL:                {}", config.upstream_url());
                println!("  Access token:       {}", config.upstream.access_token);
                println!("  Timeout (secs):     {}", config.upstream.timeout_secs);
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_addr());
                match &config.server.static_dir {
                    Some(dir) => println!("  Static dir:         {}", dir.display()),
                    None => println!("  Static dir:         (disabled)"),
                }
                println!();
                println!("[Client]");
                println!("  Gateway URL:        {}", config.client.gateway_url);
                println!("  Timeout (secs):     {}", config.client.timeout_secs);
                println!();
                println!("[Map]");
                println!(
                    "  Center:             {}, {}",
                    config.map.center[0], config.map.center[1]
                );
                println!("  Zoom:               {}", config.map.zoom);
                println!(
                    "  Dataset field:      {}",
                    config.map.dataset_field.as_deref().unwrap_or("(none)")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::validate_file(&path)
                .with_context(|| format!("invalid configuration: {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
