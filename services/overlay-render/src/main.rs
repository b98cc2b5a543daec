//! Offline overlay renderer.
//!
//! Loads a dataset manifest, selects one (variable, year), applies optional
//! display-range edits and writes the colored overlay as a PNG plus an
//! optional legend JSON. Hover queries are answered one per line on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use overlay_core::{
    AutoFetcher, DatasetKey, HeadlessSurface, LoadStatus, Manifest, OverlayConfig, OverlayManager,
    RangeEdit,
};
use renderer::png::create_png_auto;
use renderer::{render_rgba, RangePolicy, NO_DATA};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "overlay-render")]
#[command(about = "Render a gridded dataset as a colored map overlay")]
struct Args {
    /// Manifest location (local path or http(s) URL)
    #[arg(short, long, env = "OVERLAY_MANIFEST")]
    manifest: String,

    /// Variable to render
    #[arg(long)]
    variable: String,

    /// Year to render
    #[arg(long)]
    year: String,

    /// Colormap name (defaults to OVERLAY_COLORMAP or viridis)
    #[arg(long)]
    colormap: Option<String>,

    /// Lower display bound
    #[arg(long, allow_negative_numbers = true)]
    min: Option<f64>,

    /// Upper display bound
    #[arg(long, allow_negative_numbers = true)]
    max: Option<f64>,

    /// Reject range bounds outside the dataset statistics
    #[arg(long)]
    clamp_to_stats: bool,

    /// Output PNG path
    #[arg(short, long, default_value = "overlay.png")]
    output: PathBuf,

    /// Write the legend as JSON to this path
    #[arg(long)]
    legend: Option<PathBuf>,

    /// Hover query as "lat,lng" (repeatable)
    #[arg(long = "hover", value_parser = parse_lat_lng, allow_hyphen_values = true)]
    hovers: Vec<(f64, f64)>,

    /// Prefix for relative raster paths in the manifest (defaults to the
    /// site root the manifest was built in)
    #[arg(long, env = "OVERLAY_BASE_URL")]
    base_url: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    // Single-threaded cooperative scheduling
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(run(args))
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = OverlayConfig::from_env();
    if let Some(colormap) = &args.colormap {
        config.colormap = colormap.clone();
    }
    if args.clamp_to_stats {
        config.range_policy = RangePolicy::ClampToStats;
    }
    config.base_url = args.base_url.clone().or(config.base_url);

    config.validate()?;

    let (manifest_location, manifest_dir) = locate_manifest(&args.manifest).await?;
    let fetcher = Arc::new(AutoFetcher::new(Duration::from_secs(
        config.fetch_timeout_secs,
    ))?);
    let manifest = Manifest::load(fetcher.as_ref(), &manifest_location)
        .await
        .with_context(|| format!("Failed to load manifest {}", manifest_location))?;
    if config.base_url.is_none() {
        config.base_url = Some(manifest.site_root(&manifest_dir));
    }
    info!(
        variables = ?manifest.variables,
        years = ?manifest.years,
        base_url = ?config.base_url,
        "Loaded manifest"
    );

    let mut manager = OverlayManager::new(config, manifest, fetcher, HeadlessSurface::new())?;
    let key = DatasetKey::new(&args.variable, &args.year);
    match manager.load(key.clone()).await? {
        LoadStatus::Installed => {}
        LoadStatus::Superseded => bail!("load of {} was superseded", key),
        LoadStatus::Failed(e) => {
            return Err(anyhow!(e).context(format!("Failed to load {}", key)));
        }
    }

    let edit = match (args.min, args.max) {
        (Some(min), Some(max)) => Some(manager.set_range(min, max)),
        (Some(min), None) => Some(manager.set_range_min(min)),
        (None, Some(max)) => Some(manager.set_range_max(max)),
        (None, None) => None,
    };
    match edit {
        Some(RangeEdit::Applied(range)) => {
            info!(min = range.min(), max = range.max(), "Display range set")
        }
        Some(RangeEdit::Rejected { current, reason }) => {
            warn!(error = %reason, current = ?current, "Display range edit rejected")
        }
        Some(RangeEdit::NotReady) | None => {}
    }

    render_overlay(&manager, &args.output).await?;

    if let Some(path) = &args.legend {
        let legend = manager.legend().context("No legend available")?;
        let json = serde_json::to_string_pretty(&legend)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote legend");
    }

    for (lat, lng) in &args.hovers {
        let text = manager
            .hover_text(*lat, *lng)
            .await
            .unwrap_or_else(|| NO_DATA.to_string());
        println!("{},{}\t{}", lat, lng, text);
    }

    info!(status = %serde_json::to_string(&manager.status())?, "Done");
    Ok(())
}

async fn render_overlay(
    manager: &OverlayManager<AutoFetcher, HeadlessSurface>,
    output: &Path,
) -> Result<()> {
    let layer = manager
        .surface()
        .layer()
        .context("No overlay installed")?;
    let (width, height) = (layer.dataset.width(), layer.dataset.height());

    let pixels = render_rgba(&layer.dataset, &layer.evaluator).await?;
    let png = create_png_auto(&pixels, width, height)?;
    tokio::fs::write(output, &png)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        path = %output.display(),
        width,
        height,
        size = png.len(),
        bounds = ?layer.bounds,
        "Wrote overlay"
    );
    Ok(())
}

/// Absolute manifest location plus the directory (path or URL) holding it.
async fn locate_manifest(location: &str) -> Result<(String, String)> {
    if is_url(location) {
        let dir = url_directory(location).unwrap_or_else(|| location.to_string());
        return Ok((location.to_string(), dir));
    }
    let path = tokio::fs::canonicalize(location)
        .await
        .with_context(|| format!("Manifest not found: {}", location))?;
    let dir = path
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "/".to_string());
    Ok((path.display().to_string(), dir))
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Directory part of a URL.
fn url_directory(location: &str) -> Option<String> {
    if !is_url(location) {
        return None;
    }
    location.rsplit_once('/').map(|(dir, _)| dir.to_string())
}

/// Parse a `lat,lng` pair.
fn parse_lat_lng(s: &str) -> std::result::Result<(f64, f64), String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lng, got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;
    Ok((lat, lng))
}
