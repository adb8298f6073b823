use std::sync::Arc;

use anyhow::{Context, Result};
use remaplet::prelude::*;
use remaplet::ui::controls::{NavigationOptions, ScaleOptions};
use serde::Deserialize;

/// Frames replayed when no script is given on the command line.
const DEFAULT_SCRIPT: &str = include_str!("../frames/park-layers.json");

#[derive(Debug, Deserialize)]
struct ImageSize {
    width: u32,
    height: u32,
}

/// One declaration of the layer list, as an application would render it.
#[derive(Debug, Deserialize)]
struct Frame {
    name: String,
    layers: Vec<LayerDescriptor>,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    map: MapOptions,
    /// Images the engine can load, keyed by URL.
    #[serde(default)]
    images: HashMap<String, ImageSize>,
    frames: Vec<Frame>,
}

/// Replays a sequence of layer declarations against the headless engine and
/// prints the engine calls each one caused.
#[tokio::main]
async fn main() -> Result<()> {
    remaplet::init_debug_logging();

    let script = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading `{path}`"))?
        }
        None => DEFAULT_SCRIPT.to_string(),
    };
    let script: Script = serde_json::from_str(&script).context("parsing frame script")?;

    let factory = HeadlessFactory::auto_ready();
    let engine = factory.engine();
    for (url, size) in &script.images {
        engine.add_catalog_image(url.clone(), MapImage::blank(size.width, size.height));
    }

    let map = MapBuilder::new()
        .with_options(script.map)
        .with_factory(Arc::new(factory))
        .build();
    map.attach_container(Container::new("map")).await?;
    log::info!("map ready at {}", map.options().center);

    let scope = MapScope::new(map);
    let mut controls = scope.controls();
    controls.set(
        "navigation",
        ControlKind::Navigation(NavigationOptions::default()),
        ControlPosition::TopRight,
    )?;
    controls.set(
        "scale",
        ControlKind::Scale(ScaleOptions::default()),
        ControlPosition::BottomLeft,
    )?;

    let mut layers = scope
        .layer_collection()
        .with_status_listener(|id, status| log::info!("layer `{id}` {status}"));

    for frame in script.frames {
        engine.clear_calls();
        layers
            .set_layers(frame.layers)
            .with_context(|| format!("declaring frame `{}`", frame.name))?;
        layers
            .settle()
            .await
            .with_context(|| format!("settling frame `{}`", frame.name))?;

        println!("== {} ==", frame.name);
        for call in engine.calls() {
            println!("  {call:?}");
        }
        println!("  stack (bottom to top): {}", engine.layer_ids().join(", "));
    }

    layers.unmount()?;
    controls.clear()?;
    Ok(())
}
