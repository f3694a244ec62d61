use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::{Model3dLayerConfig, decode_model_bytes};
use foundation::math::Mat4;
use gpu::headless::HeadlessGl;
use layers::{
    CustomLayerHost, FrameProjector, LayerId, RenderParameters, create_custom_layer,
    orthographic_around,
};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect model assets and dry-run model layers")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a model asset and print its summary
    Inspect {
        /// Path to the model document
        asset: PathBuf,
    },

    /// Parse a model layer and print the usable placements
    Placements {
        /// Path to the style-layer JSON
        layer: PathBuf,
    },

    /// Render one frame of a model layer on a recording GL device
    Frame {
        /// Path to the style-layer JSON
        layer: PathBuf,

        /// Map zoom level
        #[arg(long, default_value_t = 15.0)]
        zoom: f64,

        /// Half width of the view around the first placement, in world units
        #[arg(long, default_value_t = 512.0)]
        extent: f64,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Inspect { asset } => inspect(&asset)?,
        Command::Placements { layer } => placements(&layer)?,
        Command::Frame {
            layer,
            zoom,
            extent,
        } => frame(&layer, zoom, extent)?,
    }
    Ok(())
}

fn inspect(path: &Path) -> CliResult<()> {
    let bytes = fs::read(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    let model = decode_model_bytes(&bytes)?;
    let bounds = model
        .position_bounds()
        .map(|(min, max)| json!({ "min": min, "max": max }));
    print_json(&json!({
        "name": model.name(),
        "vertices": model.vertex_count(),
        "indices": model.index_count(),
        "triangles": model.index_count() / 3,
        "bounds": bounds,
    }))
}

fn placements(path: &Path) -> CliResult<()> {
    let config = Model3dLayerConfig::from_value(&read_json(path)?)?;
    let entries: Vec<Value> = config
        .placements
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "position": [p.position.lat_deg, p.position.lng_deg, p.position.altitude_m],
                "scale": p.scale,
                "url": p.url,
            })
        })
        .collect();
    print_json(&json!({
        "cullExtent": config.options.cull_extent,
        "cacheFailures": config.options.cache_failures,
        "models": entries,
    }))
}

fn frame(path: &Path, zoom: f64, extent: f64) -> CliResult<()> {
    if !(extent.is_finite() && extent > 0.0) {
        return Err(format!("--extent must be a positive number, got {extent}").into());
    }

    let mut value = read_json(path)?;
    // Relative asset urls resolve next to the layer file unless the layer says otherwise.
    if let (Some(obj), Some(dir)) = (value.as_object_mut(), path.parent()) {
        obj.entry("assetRoot")
            .or_insert_with(|| Value::String(dir.to_string_lossy().into_owned()));
    }

    let gl = HeadlessGl::new();
    let mut layer = create_custom_layer::<HeadlessGl>(LayerId(1), &value)?;
    let Some(first) = layer.placements().first() else {
        return Err("layer has no placements".into());
    };
    let center = FrameProjector::new(Mat4::IDENTITY, zoom, layer.cull_extent())
        .project(first)
        .world;
    let params = RenderParameters::new(orthographic_around(center, extent), zoom);

    layer.initialize(&gl)?;
    let report = layer.render(&gl, &params)?;
    let gl_calls = gl.call_count();
    layer.deinitialize(&gl);
    info!(
        drawn = report.drawn,
        cached = layer.cache().len(),
        "frame complete"
    );

    print_json(&json!({
        "zoom": zoom,
        "center": center.as_array(),
        "report": report,
        "glCalls": gl_calls,
        "drawCalls": gl.draw_calls().len(),
        "leakedObjects": gl.live_objects(),
    }))
}

fn read_json(path: &Path) -> CliResult<Value> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
