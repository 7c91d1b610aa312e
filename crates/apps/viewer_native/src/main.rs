use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formats::MapConfig;
use gpu::{RecordingBackend, RenderCommand};
use runtime::Event;
use scene::camera::Viewport;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewer_native::{MapController, MapEvent, Session, parse_script, source_for};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the 3D region map")]
struct Args {
    /// Map configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL template with `{code}` or a directory of region documents (falls back to MAP_SOURCE)
    #[arg(long)]
    source: Option<String>,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 720.0)]
    height: f64,

    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and assemble one scope, then print a summary
    ///
    /// `--code` keeps the configured root view unless `--center` and
    /// `--scale` move it.
    Scene {
        /// Administrative code to load instead of the configured root
        #[arg(long)]
        code: Option<u32>,

        /// Projection center as `LON,LAT`
        #[arg(long, value_delimiter = ',', num_args = 2)]
        center: Option<Vec<f64>>,

        /// Projection scale
        #[arg(long)]
        scale: Option<f64>,

        /// Write per-feature mesh statistics here as JSON
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Report the region under a viewport pixel
    Pick {
        #[arg(long)]
        x: f64,

        #[arg(long)]
        y: f64,
    },

    /// Replay a JSON script of input events and print what the map emits
    Replay {
        #[arg(long)]
        script: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => MapConfig::load(path)?,
        None => MapConfig::default(),
    };
    if let Some(location) = args.source.clone().or_else(|| env::var("MAP_SOURCE").ok()) {
        config.source = location;
    }

    if let Command::Config = args.command {
        println!("{}", config.to_json_string_pretty()?);
        return Ok(());
    }
    if let Command::Scene {
        code, center, scale, ..
    } = &args.command
    {
        apply_scene_overrides(&mut config, *code, center.as_deref(), *scale)?;
    }

    let source = source_for(&config.source);
    info!(source = %source.describe(), root = config.root_code, "starting");
    let viewport = Viewport::new(args.width, args.height, args.pixel_ratio);
    let controller = MapController::new(config, RecordingBackend::keeping(1), viewport)?;
    let mut session = Session::new(controller, source);
    session.load_root().await;

    match args.command {
        Command::Scene { export, .. } => {
            let controller = session.controller_mut();
            controller.tick(0.0);
            print_events(controller.drain_events());
            let Some(scene) = controller.scene() else {
                return Err("root scope did not load".into());
            };
            let frame = controller.renderer().backend().last();
            let labels = frame
                .map(|f| f.count(|c| matches!(c, RenderCommand::Label { .. })))
                .unwrap_or(0);
            println!(
                "{}",
                json!({
                    "code": controller.navigation().current().code,
                    "features": scene.report.features,
                    "solids": scene.report.solids,
                    "skipped": scene.report.skipped.len(),
                    "unlabeled": scene.report.unlabeled,
                    "labels_placed": labels,
                })
            );
            if let Some(path) = export {
                std::fs::write(&path, serde_json::to_vec_pretty(&export_scene(controller))?)?;
                info!(path = %path.display(), "scene exported");
            }
        }
        Command::Pick { x, y } => {
            let controller = session.controller_mut();
            controller.pointer_moved(x, y);
            controller.tick(0.0);
            let hit = controller
                .picking()
                .highlighted()
                .zip(controller.scene())
                .and_then(|(node, scene)| scene.graph.owning_feature(node))
                .map(|(_, meta)| json!({"code": meta.code, "name": meta.name, "level": meta.level.as_str()}));
            println!("{}", hit.unwrap_or(Value::Null));
        }
        Command::Replay { script } => {
            let steps = parse_script(&std::fs::read_to_string(&script)?)?;
            print_events(session.controller_mut().drain_events());
            for step in &steps {
                session.step(step).await;
                print_events(session.controller_mut().drain_events());
            }
            session.settle().await;
            print_events(session.controller_mut().drain_events());
            let metrics = session.controller().metrics().snapshot();
            info!(counters = ?metrics.counters, "replay finished");
        }
        Command::Config => {}
    }

    Ok(())
}

fn apply_scene_overrides(
    config: &mut MapConfig,
    code: Option<u32>,
    center: Option<&[f64]>,
    scale: Option<f64>,
) -> Result<(), String> {
    if let Some(code) = code {
        config.root_code = code;
    }
    match center {
        Some(&[lon, lat]) => config.center = [lon, lat],
        Some(other) => return Err(format!("--center takes LON,LAT, got {} values", other.len())),
        None => {}
    }
    if let Some(scale) = scale {
        config.scale = scale;
    }
    Ok(())
}

fn print_events(events: Vec<Event<MapEvent>>) {
    for event in events {
        println!("{}", describe(&event));
    }
}

fn describe(event: &Event<MapEvent>) -> Value {
    let frame = event.frame_index;
    match &event.payload {
        MapEvent::HoverChanged(meta) => json!({
            "frame": frame,
            "event": "hover",
            "code": meta.as_ref().map(|m| m.code),
            "name": meta.as_ref().map(|m| m.name.clone()),
        }),
        MapEvent::Activated(meta) => json!({
            "frame": frame,
            "event": "activated",
            "code": meta.code,
            "name": meta.name,
        }),
        MapEvent::TransitionRequested { request, code } => json!({
            "frame": frame,
            "event": "transition_requested",
            "request": request.0,
            "code": code,
        }),
        MapEvent::ScopeChanged {
            code,
            features,
            solids,
            skipped,
            digest,
        } => json!({
            "frame": frame,
            "event": "scope_changed",
            "code": code,
            "features": features,
            "solids": solids,
            "skipped": skipped,
            "digest": digest,
        }),
        MapEvent::NoFurtherDetail { code, reason } => json!({
            "frame": frame,
            "event": "no_further_detail",
            "code": code,
            "reason": reason.to_string(),
        }),
        MapEvent::StaleDiscarded { request } => json!({
            "frame": frame,
            "event": "stale_discarded",
            "request": request.0,
        }),
        MapEvent::FetchFailed {
            request,
            code,
            message,
        } => json!({
            "frame": frame,
            "event": "fetch_failed",
            "request": request.0,
            "code": code,
            "message": message,
        }),
    }
}

fn export_scene(controller: &MapController<RecordingBackend>) -> Value {
    let Some(scene) = controller.scene() else {
        return Value::Null;
    };
    let graph = &scene.graph;
    let features: Vec<Value> = scene
        .features
        .iter()
        .filter_map(|&container| {
            let meta = graph.feature(container)?;
            let solids: Vec<Value> = graph
                .children(container)
                .iter()
                .filter_map(|&child| graph.solid(child))
                .map(|mesh| {
                    json!({
                        "vertices": mesh.positions.len(),
                        "triangles": mesh.triangles.len(),
                        "footprint_area": mesh.footprint_area,
                        "depth": mesh.depth,
                    })
                })
                .collect();
            Some(json!({
                "code": meta.code,
                "name": meta.name,
                "level": meta.level.as_str(),
                "parent": meta.parent_code,
                "solids": solids,
            }))
        })
        .collect();
    json!({
        "code": controller.navigation().current().code,
        "features": features,
        "skipped": scene
            .report
            .skipped
            .iter()
            .map(|s| json!({"code": s.code, "ring": s.ring_index, "error": s.error.to_string()}))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::apply_scene_overrides;
    use formats::MapConfig;
    use foundation::math::LonLat;
    use pretty_assertions::assert_eq;

    #[test]
    fn scene_code_keeps_root_view_unless_moved() {
        let mut config = MapConfig::default();
        apply_scene_overrides(&mut config, Some(110000), None, None).unwrap();
        assert_eq!(config.root_code, 110000);
        assert_eq!(config.center, MapConfig::default().center);
        assert_eq!(config.scale, MapConfig::default().scale);

        apply_scene_overrides(&mut config, None, Some(&[116.41, 40.19]), Some(200.0)).unwrap();
        assert_eq!(config.root_code, 110000);
        let params = config.projection_params().unwrap();
        assert_eq!(params.center(), LonLat::new(116.41, 40.19));
        assert_eq!(params.scale(), 200.0);
    }

    #[test]
    fn center_needs_two_values() {
        let mut config = MapConfig::default();
        assert!(apply_scene_overrides(&mut config, None, Some(&[116.41]), None).is_err());
    }
}
