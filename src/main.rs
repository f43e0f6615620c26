mod cli;

use anilib::{
    config::{self, Config},
    library::{self, LibraryService},
    metadata::providers::AniListProvider,
    scanner::{decide, IngestContext, IngestOptions, IngestService, ReconciliationSweeper},
    server::{self, AppContext},
    state::EventBus,
};
use anilib_av::{FfmpegToolkit, MediaToolkit, ToolPaths};
use anilib_db::pool::{get_conn, init_pool, DbPool};
use anilib_db::snapshot;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Everything a library update needs, wired from the config.
struct Services {
    config: Arc<Config>,
    pool: DbPool,
    events: Arc<EventBus>,
    library: Arc<LibraryService>,
}

fn open_catalog(config: &Config) -> Result<DbPool> {
    let db_path = config.library.database.to_string_lossy();
    tracing::info!("Opening catalog at {}", db_path);
    init_pool(&db_path).with_context(|| format!("Failed to open catalog {db_path}"))
}

fn toolkit(config: &Config) -> Result<FfmpegToolkit> {
    let paths = ToolPaths::discover(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    )
    .context("ffmpeg and ffprobe are required")?;
    Ok(FfmpegToolkit::new(paths, config.transcode.support_matrix()))
}

fn build_services(config: Config) -> Result<Services> {
    let pool = open_catalog(&config)?;
    let added = library::register_watch_directories(&pool, &config.library.watch_directories)?;
    if added > 0 {
        tracing::info!("Registered {} watch directories from config", added);
    }

    let events = Arc::new(EventBus::default());
    let provider = Arc::new(AniListProvider::new(&config.metadata)?);
    let toolkit = Arc::new(toolkit(&config)?);
    let ingest = IngestService::new(
        pool.clone(),
        events.clone(),
        provider,
        toolkit,
        IngestOptions::from_config(&config),
    );
    let library = Arc::new(LibraryService::new(
        pool.clone(),
        events.clone(),
        ingest,
        config.library.delete_converted_originals,
    ));

    Ok(Services {
        config: Arc::new(config),
        pool,
        events,
        library,
    })
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting anilib server");
    let services = build_services(config)?;
    let ctx = AppContext {
        pool: services.pool,
        config: services.config,
        events: services.events,
        library: services.library,
    };
    server::start_server(ctx).await
}

async fn scan(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let services = build_services(config)?;

    // Print progress lines as they happen; drain what is queued once done.
    let mut rx = services.events.subscribe();
    let done = CancellationToken::new();
    let printer = tokio::spawn({
        let done = done.clone();
        async move {
            loop {
                tokio::select! {
                    biased;
                    event = rx.recv() => match event {
                        Ok(event) => println!("{}", event.payload.status_message()),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = done.cancelled() => break,
                }
            }
        }
    });

    let library = services.library.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            library.cancel();
        }
    });

    let result = services.library.update().await;
    ctrl_c.abort();
    done.cancel();
    let _ = printer.await;

    let summary = result?;
    for failure in &summary.failures {
        eprintln!("failed: {} ({})", failure.path.display(), failure.message);
    }
    if summary.cancelled {
        anyhow::bail!("Library update cancelled");
    }
    Ok(())
}

async fn sweep(config_path: Option<&Path>, delete_originals: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_catalog(&config)?;
    let ctx = IngestContext::new(pool, Arc::new(EventBus::default()));
    let sweeper = ReconciliationSweeper::new(ctx);

    let report = sweeper.sweep(delete_originals).await?;
    println!("Removed {} anime, {} episodes", report.animes_removed, report.episodes_removed);
    if delete_originals {
        println!("Deleted {} converted originals", report.originals_deleted);
    }
    if report.failures > 0 {
        anyhow::bail!("{} originals could not be deleted", report.failures);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "anilib=trace,anilib_av=trace,anilib_db=debug,anilib_common=debug,tower_http=debug"
                .to_string()
        } else {
            "anilib=info,anilib_av=info,anilib_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Scan => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan(cli.config.as_deref()))
        }
        Commands::Sweep { delete_originals } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sweep(cli.config.as_deref(), delete_originals))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::Export { file } => export_catalog(&file, cli.config.as_deref()),
        Commands::Import { file } => import_catalog(&file, cli.config.as_deref()),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("anilib {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let toolkit = toolkit(&config)?;
    let cancel = CancellationToken::new();
    let media_info = toolkit.probe(file, &cancel).await?;
    let decision = decide(&toolkit, file, &cancel).await?;

    if json {
        let value = serde_json::json!({
            "media": media_info,
            "decision": decision,
            "needs_transcode": decision.needs_transcode(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", media_info.file_path.display());
    println!("Container: {}", media_info.container);
    println!("Size: {} bytes", media_info.file_size);
    if let Some(ref duration) = media_info.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }

    println!("\nVideo Tracks: {}", media_info.video_tracks.len());
    for (i, track) in media_info.video_tracks.iter().enumerate() {
        print!("  [{}] {} {}x{}", i, track.codec, track.width, track.height);
        if let Some(fps) = track.frame_rate {
            print!(", {:.3} fps", fps);
        }
        println!();
    }

    println!("\nAudio Tracks: {}", media_info.audio_tracks.len());
    for (i, track) in media_info.audio_tracks.iter().enumerate() {
        print!("  [{}] {} {}ch", i, track.codec, track.channels);
        if let Some(ref lang) = track.language {
            print!(" ({})", lang);
        }
        if track.default {
            print!(" [default]");
        }
        println!();
    }
    println!("\nSubtitle Streams: {}", media_info.subtitle_streams);

    let mark = |ok: bool| if ok { "✓" } else { "✗" };
    println!("\nBrowser compatibility:");
    println!("  {} video codec", mark(decision.video_supported));
    println!("  {} audio codec", mark(decision.audio_supported));
    println!("  {} container", mark(decision.container_supported));
    if decision.needs_transcode() {
        println!("Would transcode to MP4");
    } else {
        println!("Playable as-is");
    }

    Ok(())
}

fn export_catalog(file: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_catalog(&config)?;
    let conn = get_conn(&pool)?;
    let snap = snapshot::export(&conn)?;
    snapshot::write_snapshot(file, &snap)?;
    println!(
        "Exported {} anime, {} episodes, {} subtitles to {}",
        snap.animes.len(),
        snap.episodes.len(),
        snap.subtitles.len(),
        file.display()
    );
    Ok(())
}

fn import_catalog(file: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let snap = snapshot::read_snapshot(file)?;
    let pool = open_catalog(&config)?;
    let conn = get_conn(&pool)?;
    let summary = snapshot::import(&conn, &snap)?;
    println!(
        "Imported {} anime, {} episodes, {} subtitles ({} already present)",
        summary.animes, summary.episodes, summary.subtitles, summary.skipped
    );
    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = anilib_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Catalog: {}", config.library.database.display());
            println!("  Watch directories: {}", config.library.watch_directories.len());
            println!("  Metadata endpoint: {}", config.metadata.endpoint);
            println!(
                "  Transcode: {} concurrent, hardware {}",
                config.transcode.max_concurrent,
                if config.transcode.use_hardware_acceleration { "on" } else { "off" }
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
