use super::{json_pretty, resolve_app_dir, title, EXIT_SUCCESS};
use movepack_core::{build, BuildContext};
use movepack_runtime::{CommandExecutor, Environment};
use movepack_schema::{parse_buildpack_plan_file, parse_descriptor_file, BuildpackPlan, DESCRIPTOR_FILE};
use movepack_store::{DependencyCache, LayersLayout};
use std::path::PathBuf;

/// Directory of dependencies shipped inside an offline buildpack.
const PRELOADED_DEPENDENCIES: &str = "dependencies";

pub struct BuildArgs {
    pub app_dir: PathBuf,
    pub layers_dir: PathBuf,
    pub platform_dir: Option<PathBuf>,
    pub plan_path: Option<PathBuf>,
    pub buildpack_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub offline: bool,
}

pub fn run(args: &BuildArgs, json: bool) -> Result<u8, String> {
    let app_dir = resolve_app_dir(&args.app_dir)?;
    let layers_dir = std::path::absolute(&args.layers_dir).map_err(|e| {
        format!(
            "unable to resolve layers directory {}: {e}",
            args.layers_dir.display()
        )
    })?;

    let descriptor_path = args.buildpack_dir.join(DESCRIPTOR_FILE);
    let descriptor = parse_descriptor_file(&descriptor_path)
        .map_err(|e| format!("{}: {e}", descriptor_path.display()))?;
    if !json {
        eprintln!("{}", title(&descriptor));
    }

    let plan = match &args.plan_path {
        Some(path) => parse_buildpack_plan_file(path)
            .map_err(|e| format!("unable to read buildpack plan {}: {e}", path.display()))?,
        None => BuildpackPlan::default(),
    };

    let cache = DependencyCache::new(&args.cache_dir)
        .with_preloaded(args.buildpack_dir.join(PRELOADED_DEPENDENCIES))
        .offline(args.offline);

    let ctx = BuildContext {
        app_dir,
        layers_dir: layers_dir.clone(),
        platform_dir: args.platform_dir.clone(),
        descriptor,
        plan,
        env: Environment::from_process(),
        cache,
    };

    let result = build(&ctx, &CommandExecutor::new()).map_err(|e| e.to_string())?;
    result
        .persist(&LayersLayout::new(&layers_dir))
        .map_err(|e| e.to_string())?;

    if json {
        let layers: Vec<_> = result
            .layers
            .iter()
            .map(|l| {
                serde_json::json!({
                    "name": l.name,
                    "path": l.path,
                    "version": l.version.as_ref().map(ToString::to_string),
                    "reused": l.reused,
                    "types": l.types,
                    "wallet": l.wallet,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "layers": layers,
            "processes": result.processes,
        });
        println!("{}", json_pretty(&payload)?);
    } else if result.is_empty() {
        println!("nothing to contribute");
    } else {
        for layer in &result.layers {
            let state = if layer.reused { "reused" } else { "contributed" };
            println!("{state} layer '{}' at {}", layer.name, layer.path.display());
        }
        for process in &result.processes {
            println!(
                "process '{}': {} {}",
                process.process_type,
                process.command,
                process.args.join(" ")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
