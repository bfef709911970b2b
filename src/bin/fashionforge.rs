//! CLI for FashionForge - AI virtual try-on.

use clap::{Args, Parser, Subcommand, ValueEnum};
use fashionforge::config;
use fashionforge::session::{trigger_generation, Notice, SessionState};
use fashionforge::{validate_images, GeminiModel, TryOnGenerator, UploadedImage};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fashionforge")]
#[command(about = "Dress a person in a garment with Google Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a virtual try-on image
    Tryon(TryOnArgs),

    /// Check that both images are usable without calling the API
    Validate(ImageArgs),

    /// Verify the API key and model are reachable
    Check(ServiceArgs),
}

#[derive(Args)]
struct ImageArgs {
    /// Photo of the person (PNG or JPEG)
    #[arg(short, long)]
    person: PathBuf,

    /// Photo of the garment (PNG or JPEG)
    #[arg(short, long)]
    garment: PathBuf,
}

#[derive(Args)]
struct ServiceArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, value_enum, default_value = "pro")]
    model: ModelArg,

    /// Request timeout in seconds (default: no timeout)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args)]
struct TryOnArgs {
    #[command(flatten)]
    images: ImageArgs,

    /// Output file path
    #[arg(short, long, default_value = "try-on.png")]
    output: PathBuf,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// gemini-3-pro-image-preview
    Pro,
    /// gemini-2.5-flash-image
    Flash,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Pro => GeminiModel::NanoBananaPro,
            ModelArg::Flash => GeminiModel::NanoBanana,
        }
    }
}

impl ServiceArgs {
    fn connect(&self) -> fashionforge::Result<TryOnGenerator> {
        let mut builder = TryOnGenerator::builder().model(self.model.into());
        if let Some(ref key) = self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads env-backed flags
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tryon(args) => run_tryon(args, cli.json).await,
        Commands::Validate(args) => run_validate(args, cli.json),
        Commands::Check(args) => run_check(args, cli.json).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_upload(path: &Path, label: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {label} image {}: {e}", path.display()))
}

async fn run_tryon(args: TryOnArgs, json_output: bool) -> anyhow::Result<bool> {
    let mut session = SessionState::new();

    let person = load_upload(&args.images.person, "person")?;
    session
        .upload_person(person)
        .map_err(|e| anyhow::anyhow!("person image: {e}"))?;
    let garment = load_upload(&args.images.garment, "garment")?;
    session
        .upload_garment(garment)
        .map_err(|e| anyhow::anyhow!("garment image: {e}"))?;

    let notices = trigger_generation(&mut session, || args.service.connect()).await;

    let saved = match session.last_result() {
        Some(image) => {
            image.save(&args.output)?;
            Some(image)
        }
        None => None,
    };

    if json_output {
        let outcome = session.last_outcome();
        let result = serde_json::json!({
            "success": saved.is_some(),
            "output": saved.map(|_| args.output.display().to_string()),
            "size_bytes": saved.map(|i| i.size()),
            "format": saved.map(|i| i.format.extension()),
            "model": saved.and_then(|i| i.metadata.model.clone()),
            "duration_ms": saved.and_then(|i| i.metadata.duration_ms),
            "error_kind": outcome.and_then(|o| o.error_kind()).map(|k| k.to_string()),
            "notices": notices.iter().map(|n| n.text()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_notices(&notices);
        if let Some(image) = saved {
            println!(
                "Saved: {} ({}x{}, {} bytes)",
                args.output.display(),
                image.width(),
                image.height(),
                image.size()
            );
            if let Some(duration) = image.metadata.duration_ms {
                println!("Duration: {}ms", duration);
            }
        }
    }

    Ok(saved.is_some())
}

fn run_validate(args: ImageArgs, json_output: bool) -> anyhow::Result<bool> {
    let person = UploadedImage::open(load_upload(&args.person, "person")?);
    let garment = UploadedImage::open(load_upload(&args.garment, "garment")?);

    let result = match (&person, &garment) {
        (Err(e), _) => Err(format!("person image: {e}")),
        (_, Err(e)) => Err(format!("garment image: {e}")),
        (Ok(p), Ok(g)) => validate_images(Some(p), Some(g)),
    };

    if json_output {
        let value = serde_json::json!({
            "valid": result.is_ok(),
            "error": result.as_ref().err(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match &result {
            Ok(()) => {
                for (label, image) in [("Person", &person), ("Garment", &garment)] {
                    if let Ok(image) = image {
                        println!(
                            "✓ {label}: {} {}x{}",
                            image.format(),
                            image.width(),
                            image.height()
                        );
                    }
                }
            }
            Err(message) => println!("✗ {message}"),
        }
    }

    Ok(result.is_ok())
}

async fn run_check(args: ServiceArgs, json_output: bool) -> anyhow::Result<bool> {
    let generator = match args.connect() {
        Ok(generator) => generator,
        Err(e) => {
            let notices = [
                Notice::Error(format!("Configuration Error: {e}")),
                Notice::Info(fashionforge::session::SETUP_INSTRUCTIONS.into()),
            ];
            if json_output {
                let value = serde_json::json!({ "ok": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_notices(&notices);
            }
            return Ok(false);
        }
    };

    let health = generator.health_check().await;

    if json_output {
        let value = serde_json::json!({
            "ok": health.is_ok(),
            "model": generator.model_id(),
            "error": health.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("✓ Generator initialized");
        println!("✓ Using model: {}", generator.model_id());
        match &health {
            Ok(()) => println!("✓ API reachable"),
            Err(e) => println!("✗ Health check failed: {e}"),
        }
    }

    Ok(health.is_ok())
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice {
            Notice::Error(text) => eprintln!("✗ {text}"),
            Notice::Info(text) => eprintln!("{text}"),
            Notice::Success(text) => println!("✓ {text}"),
        }
    }
}
