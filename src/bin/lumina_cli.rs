//! Lumina CLI - capture stills through a film recipe
//!
//! Commands: recipes, validate, capture, preview
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on refused or invalid work, 1 on setup errors

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use lumina_film::{
    CapturePipeline, CommandBackend, Facing, FrameCompositor, GuardedOracle,
    RecipeCatalog, RecipeValidator, StillSource, VideoSource,
};

#[derive(Parser)]
#[command(name = "lumina-cli")]
#[command(about = "Lumina Film - simulated film camera")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON recipe catalog; the built-in stocks are used when omitted
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List recipes in catalog order
    Recipes,

    /// Validate every recipe in the catalog
    Validate,

    /// Capture one still from an image file
    Capture {
        /// Image standing in for the camera frame
        #[arg(short, long)]
        input: PathBuf,

        /// Recipe id (unknown ids fall back to the default)
        #[arg(short, long)]
        recipe: Option<String>,

        /// Treat the source as a front (self-facing) camera
        #[arg(long)]
        front: bool,

        /// Directory for the exported JPEG
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Seed for reproducible grain
        #[arg(long)]
        seed: Option<u64>,

        /// Program that prints a caption for a JSON request on stdin
        #[arg(long)]
        describe_with: Option<String>,

        /// Extra arguments for --describe-with
        #[arg(long = "describe-arg")]
        describe_args: Vec<String>,
    },

    /// Render the viewfinder look (preview filter only) to a PNG
    Preview {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        recipe: Option<String>,

        #[arg(long)]
        front: bool,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"success": false, "error": "Serialization failed: {}"}}"#, e),
    }
}

fn fail(code: u8, error: impl std::fmt::Display) -> ExitCode {
    print_json(&serde_json::json!({
        "success": false,
        "error": error.to_string(),
    }));
    ExitCode::from(code)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("LUMINA_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let catalog = match &cli.catalog {
        Some(path) => match RecipeCatalog::load_from_file(path) {
            Ok(c) => c,
            Err(e) => return fail(1, format!("Failed to load catalog: {}", e)),
        },
        None => RecipeCatalog::builtin(),
    };

    match cli.command {
        Commands::Recipes => {
            let recipes: Vec<_> = catalog.all()
                .iter()
                .map(|r| serde_json::json!({
                    "id": r.id,
                    "name": r.name,
                    "description": r.description,
                    "captureFilter": r.capture_filter,
                    "grainIntensity": r.grain_intensity,
                    "tint": r.tint,
                    "default": r.id == catalog.default_recipe().id,
                }))
                .collect();

            print_json(&recipes);
            ExitCode::SUCCESS
        }

        Commands::Validate => {
            let validator = RecipeValidator::new();
            let results: Vec<_> = catalog.all().iter().map(|r| validator.validate(r)).collect();
            let valid = results.iter().all(|r| r.valid);
            print_json(&serde_json::json!({ "valid": valid, "results": results }));
            if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Capture { input, recipe, front, out, seed, describe_with, describe_args } => {
            let source = match StillSource::open(&input) {
                Ok(s) => s.with_facing(if front { Facing::Front } else { Facing::Back }),
                Err(e) => return fail(1, format!("Failed to open {}: {}", input.display(), e)),
            };

            let compositor = match seed {
                Some(seed) => FrameCompositor::seeded(seed),
                None => FrameCompositor::from_entropy(),
            };
            let mut pipeline = CapturePipeline::with_compositor(catalog, compositor);

            if !pipeline.can_capture(&source) {
                return fail(2, "Camera unavailable");
            }

            let artifact = match pipeline.capture(&source, recipe.as_deref()) {
                Ok(a) => a,
                Err(e) => return fail(2, e),
            };

            let artifact = match describe_with {
                Some(program) => {
                    let backend = describe_args
                        .into_iter()
                        .fold(CommandBackend::new(program), |b, arg| b.arg(arg));
                    match pipeline.enrich(&artifact.id, &GuardedOracle::new(backend)) {
                        Ok(a) => a,
                        Err(e) => return fail(1, e),
                    }
                }
                None => artifact,
            };

            let path = match artifact.export_to(&out) {
                Ok(p) => p,
                Err(e) => return fail(1, format!("Failed to write {}: {}", out.display(), e)),
            };

            print_json(&serde_json::json!({
                "success": true,
                "artifact": artifact.summary(),
                "path": path,
            }));
            ExitCode::SUCCESS
        }

        Commands::Preview { input, recipe, front, out } => {
            let source = match StillSource::open(&input) {
                Ok(s) => s,
                Err(e) => return fail(1, format!("Failed to open {}: {}", input.display(), e)),
            };
            let Some(frame) = source.read_frame() else {
                return fail(2, "Camera unavailable");
            };

            let recipe = catalog.lookup(recipe.as_deref());
            let preview = FrameCompositor::from_entropy().preview(&frame, recipe, front);
            if let Err(e) = preview.save(&out) {
                return fail(1, format!("Failed to write {}: {}", out.display(), e));
            }

            print_json(&serde_json::json!({
                "success": true,
                "recipe": recipe.id,
                "path": out,
            }));
            ExitCode::SUCCESS
        }
    }
}
