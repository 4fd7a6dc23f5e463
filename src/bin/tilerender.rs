use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tilerender", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene to a PNG.
    Render(RenderArgs),
    /// Build every light's shadow buffer and print its compression statistics.
    ShadowStats(ShadowStatsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override worker threads (1-2).
    #[arg(long)]
    threads: Option<usize>,

    /// Override the resolution percentage (1-100).
    #[arg(long)]
    percentage: Option<u32>,
}

#[derive(Parser, Debug)]
struct ShadowStatsArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Scene time in frames.
    #[arg(long, default_value_t = 0.0)]
    time: f32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::ShadowStats(args) => cmd_shadow_stats(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut scene = tilerender::SceneDesc::from_path(&args.scene)?;
    if let Some(threads) = args.threads {
        scene.config.threads = threads;
    }
    if let Some(percentage) = args.percentage {
        scene.config.percentage = percentage;
    }
    let (width, height) = scene.config.scaled_size(scene.width, scene.height);
    scene.width = width;
    scene.height = height;

    let mut renderer = scene.build_renderer()?;
    let stats = renderer.run_tiled_render()?;
    let result = renderer
        .take_result()
        .context("render finished without a result")?;

    let rgba: Vec<u8> = result
        .primary_layer()
        .combined
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &rgba,
        result.width,
        result.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} of {} parts merged{})",
        args.out.display(),
        stats.parts_merged,
        stats.parts_total,
        if stats.cancelled { ", cancelled" } else { "" }
    );
    Ok(())
}

fn cmd_shadow_stats(args: ShadowStatsArgs) -> anyhow::Result<()> {
    let scene = tilerender::SceneDesc::from_path(&args.scene)?;
    let renderer = scene.build_renderer()?;
    let lights = renderer.build_shadow_buffers(args.time)?;

    for (i, sl) in lights.iter().enumerate() {
        let Some(buffer) = &sl.buffer else {
            println!("light {i}: no shadow");
            continue;
        };
        let st = buffer.stats();
        println!(
            "light {i}: size {} tiles {} uniform {} byte-delta {} short-delta {} triple {} payload {} bytes (raw {} bytes)",
            st.size,
            st.tiles(),
            st.tiles_by_kind[0],
            st.tiles_by_kind[1],
            st.tiles_by_kind[2],
            st.tiles_by_kind[3],
            st.payload_bytes,
            st.raw_bytes(),
        );
    }
    Ok(())
}
