use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[zbus::proxy(
    interface = "org.presence.Attendance1",
    default_service = "org.presence.Attendance1",
    default_path = "/org/presence/Attendance1"
)]
trait Presence {
    async fn detect(&self, image: String) -> zbus::Result<String>;
    async fn recognize(&self, image: String, threshold: f64) -> zbus::Result<String>;
    async fn enroll(&self, name: String, image: String) -> zbus::Result<String>;
    async fn employees(&self) -> zbus::Result<String>;
    async fn remove(&self, name: String) -> zbus::Result<String>;
    async fn check_in(&self, name: String, is_auto: bool) -> zbus::Result<String>;
    async fn reload(&self) -> zbus::Result<String>;
    async fn health(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "presence", about = "Presence attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect faces in an image file
    Detect {
        /// Path to the image
        image: PathBuf,
    },
    /// Recognize the face in an image file
    Recognize {
        /// Path to the image
        image: PathBuf,
        /// Match threshold override (family-dependent direction)
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Enroll a new employee from an image file
    Enroll {
        /// Employee name
        name: String,
        /// Path to the image (exactly one face)
        image: PathBuf,
    },
    /// List enrolled employees
    List,
    /// Remove an enrolled employee
    Remove {
        /// Employee name
        name: String,
    },
    /// Record a check-in
    CheckIn {
        /// Employee name
        name: String,
        /// Mark the check-in as automatic
        #[arg(long)]
        auto: bool,
    },
    /// Rebuild the daemon's descriptor cache from the store
    Reload,
    /// Show daemon health
    Health,
}

fn read_image_base64(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

/// Re-indent the daemon's JSON reply for terminal output.
fn print_reply(raw: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(raw).context("malformed daemon reply")?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let conn = zbus::Connection::session()
        .await
        .context("connecting to the session bus")?;
    let proxy = PresenceProxy::new(&conn)
        .await
        .context("connecting to presenced")?;

    let reply = match cli.command {
        Commands::Detect { image } => proxy.detect(read_image_base64(&image)?).await?,
        Commands::Recognize { image, threshold } => {
            proxy
                .recognize(read_image_base64(&image)?, threshold.unwrap_or(0.0))
                .await?
        }
        Commands::Enroll { name, image } => {
            proxy.enroll(name, read_image_base64(&image)?).await?
        }
        Commands::List => proxy.employees().await?,
        Commands::Remove { name } => proxy.remove(name).await?,
        Commands::CheckIn { name, auto } => proxy.check_in(name, auto).await?,
        Commands::Reload => proxy.reload().await?,
        Commands::Health => proxy.health().await?,
    };

    print_reply(&reply)
}
