//! Demo host: opens a window and spins one of the pipeline variants.
//!
//! Usage: `prism-viewer [textured-cube|cube|quad]`. Assets are read from
//! `$PRISM_ASSETS`, falling back to the workspace `assets/` directory.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use prism_engine::assets::AssetDir;
use prism_engine::device::GpuInit;
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::render::{GeometryData, PipelineConfig};
use prism_engine::window::{Runtime, RuntimeConfig, Scene};

const ASSETS_ENV: &str = "PRISM_ASSETS";

/// Pipeline variant selected on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
enum Variant {
    #[default]
    TexturedCube,
    ColoredCube,
    FlatQuad,
}

impl Variant {
    fn name(self) -> &'static str {
        match self {
            Variant::TexturedCube => "textured-cube",
            Variant::ColoredCube => "cube",
            Variant::FlatQuad => "quad",
        }
    }

    fn pipeline(self) -> PipelineConfig {
        match self {
            Variant::TexturedCube => PipelineConfig::textured_cube(),
            Variant::ColoredCube => PipelineConfig::colored_cube(),
            Variant::FlatQuad => PipelineConfig::flat_quad(),
        }
    }

    fn geometry(self) -> GeometryData {
        match self {
            Variant::TexturedCube | Variant::ColoredCube => GeometryData::textured_cube(),
            Variant::FlatQuad => GeometryData::quad(),
        }
    }
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "textured-cube" => Ok(Variant::TexturedCube),
            "cube" => Ok(Variant::ColoredCube),
            "quad" => Ok(Variant::FlatQuad),
            other => anyhow::bail!("unknown variant `{other}` (expected textured-cube, cube or quad)"),
        }
    }
}

fn asset_root(env: Option<std::ffi::OsString>) -> PathBuf {
    env.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets")))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let variant = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Variant>().context("invalid command line")?,
        None => Variant::default(),
    };

    let root = asset_root(std::env::var_os(ASSETS_ENV));
    log::info!("variant {}, assets from {}", variant.name(), root.display());

    let config = RuntimeConfig {
        title: format!("prism: {}", variant.name()),
        ..RuntimeConfig::default()
    };

    Runtime::run(
        config,
        GpuInit::default(),
        Scene {
            pipeline: variant.pipeline(),
            geometry: variant.geometry(),
            assets: Box::new(AssetDir::new(root)),
        },
    )
}
