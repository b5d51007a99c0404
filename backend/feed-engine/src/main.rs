use anyhow::{Context, Result};
use chrono::Utc;
use feed_engine::services::surface::normalize_page;
use feed_engine::config::LogFormat;
use feed_engine::{Config, RotationContext, RotationSampler, Surface};
use serde::Serialize;
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;
use video_core::RawContentItem;

#[derive(Serialize)]
struct RankedEntry<'a> {
    rank: usize,
    id: &'a str,
    owner_ref: &'a str,
    sponsored: bool,
    created_at: String,
}

fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    let mut reshuffle = false;
    let mut path = env::var("FEED_ITEMS_PATH").ok();
    for arg in env::args().skip(1) {
        if arg == "--reshuffle" {
            reshuffle = true;
        } else {
            path = Some(arg);
        }
    }
    let path = path.context("usage: feed-engine <items.json> [--reshuffle] (or set FEED_ITEMS_PATH)")?;

    let viewer_id = match env::var("VIEWER_ID") {
        Ok(raw) => Some(Uuid::parse_str(raw.trim()).context("VIEWER_ID must be a UUID")?),
        Err(_) => None,
    };
    let surface = match env::var("FEED_SURFACE").as_deref() {
        Ok("explore") => Surface::Explore,
        Ok("profile") => Surface::Profile,
        _ => Surface::Home,
    };

    let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let records: Vec<RawContentItem> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON item array", path))?;
    let items = normalize_page(records);

    let sampler = RotationSampler::new(&config.rotation);
    let mut context = RotationContext::for_viewer(viewer_id, Utc::now(), config.rotation.bucket_hours);
    if let Ok(category) = env::var("FEED_CATEGORY") {
        context = context.with_category(category);
    }
    if reshuffle {
        context = sampler.force_new_rotation(&context);
    }

    info!(
        surface = %surface,
        items = items.len(),
        seed = context.session_seed,
        "Ranking feed"
    );

    let ordered = sampler.sample_surface(surface, items, &context);

    let entries: Vec<RankedEntry<'_>> = ordered
        .iter()
        .enumerate()
        .map(|(rank, item)| RankedEntry {
            rank: rank + 1,
            id: &item.id,
            owner_ref: &item.owner_ref,
            sponsored: item.is_sponsored(),
            created_at: item.created_at.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
