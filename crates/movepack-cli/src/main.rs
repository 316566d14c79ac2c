mod commands;

use clap::{Parser, Subcommand};
use commands::EXIT_FAILURE;
use movepack_core::BP_LOG_LEVEL;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "movepack",
    version,
    about = "Buildpack that detects Aptos Move projects and provisions the Aptos CLI"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Both phases accept the lifecycle's positional arguments; each positional
/// falls back to its flag or `CNB_*` variable when absent.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Decide whether the application is an Aptos Move project.
    Detect {
        /// Platform directory passed by the lifecycle (unused by detection).
        #[arg(value_name = "PLATFORM")]
        _platform: Option<PathBuf>,
        /// Build plan path passed by the lifecycle.
        #[arg(value_name = "PLAN")]
        plan: Option<PathBuf>,
        /// Application source directory.
        #[arg(long, env = "CNB_APP_DIR", default_value = ".")]
        app_dir: PathBuf,
        /// Where to write the build plan on a passing detection.
        #[arg(long, env = "CNB_BUILD_PLAN_PATH")]
        plan_path: Option<PathBuf>,
    },
    /// Contribute the Aptos toolchain layer and process types.
    Build {
        /// Layers directory passed by the lifecycle.
        #[arg(value_name = "LAYERS")]
        layers: Option<PathBuf>,
        /// Platform directory passed by the lifecycle.
        #[arg(value_name = "PLATFORM")]
        platform: Option<PathBuf>,
        /// Buildpack plan passed by the lifecycle.
        #[arg(value_name = "PLAN")]
        plan: Option<PathBuf>,
        /// Application source directory.
        #[arg(long, env = "CNB_APP_DIR", default_value = ".")]
        app_dir: PathBuf,
        /// Layers directory owned by this buildpack.
        #[arg(long, env = "CNB_LAYERS_DIR")]
        layers_dir: Option<PathBuf>,
        /// Platform directory holding `env/<NAME>` configuration files.
        #[arg(long, env = "CNB_PLATFORM_DIR")]
        platform_dir: Option<PathBuf>,
        /// Buildpack plan resolved by the host.
        #[arg(long, env = "CNB_BP_PLAN_PATH")]
        plan_path: Option<PathBuf>,
        /// Buildpack root containing `buildpack.toml`.
        #[arg(long, env = "CNB_BUILDPACK_DIR")]
        buildpack_dir: Option<PathBuf>,
        /// Download cache for dependency artifacts.
        #[arg(long, env = "MOVEPACK_CACHE_DIR")]
        cache_dir: Option<PathBuf>,
        /// Only use dependencies that are already cached.
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
}

/// When installed as `bin/detect` / `bin/build`, the link name selects the
/// subcommand.
fn dispatch_args(mut args: Vec<OsString>) -> Vec<OsString> {
    let phase = args
        .first()
        .and_then(|argv0| Path::new(argv0).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| matches!(*name, "detect" | "build"))
        .map(str::to_owned);
    if let Some(phase) = phase {
        args[0] = OsString::from("movepack");
        args.insert(1, OsString::from(phase));
    }
    args
}

fn default_buildpack_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn log_level(cli: &Cli) -> &'static str {
    let bp_debug = std::env::var(BP_LOG_LEVEL).is_ok_and(|v| v.eq_ignore_ascii_case("debug"));
    if cli.trace {
        "trace"
    } else if cli.verbose || bp_debug {
        "debug"
    } else {
        "info"
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(dispatch_args(std::env::args_os().collect()));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MOVEPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level(&cli))),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Detect {
            plan,
            app_dir,
            plan_path,
            ..
        } => commands::detect::run(&app_dir, plan.or(plan_path).as_deref(), json_output),
        Commands::Build {
            layers,
            platform,
            plan,
            app_dir,
            layers_dir,
            platform_dir,
            plan_path,
            buildpack_dir,
            cache_dir,
            offline,
        } => match layers.or(layers_dir) {
            Some(layers_dir) => commands::build::run(
                &commands::build::BuildArgs {
                    app_dir,
                    layers_dir,
                    platform_dir: platform.or(platform_dir),
                    plan_path: plan.or(plan_path),
                    buildpack_dir: buildpack_dir.unwrap_or_else(default_buildpack_dir),
                    cache_dir: cache_dir
                        .unwrap_or_else(|| std::env::temp_dir().join("movepack-dependencies")),
                    offline,
                },
                json_output,
            ),
            None => Err("no layers directory: pass <LAYERS> or set CNB_LAYERS_DIR".to_owned()),
        },
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
