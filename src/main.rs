use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use article_photo_kit::config::Config;
use article_photo_kit::routes::{create_routes, AppState};
use article_photo_kit::services::cleanup::StagingSweeper;
use article_photo_kit::services::photo_store::SeaOrmPhotoStore;
use article_photo_kit::services::pipeline::PhotoPipeline;
use article_photo_kit::services::source::BufferedSource;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "article-photo-kit", version, about = "Photo uploads for catalog articles")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Push a local image file through the upload pipeline
    Import {
        #[arg(long)]
        article_id: i32,
        /// Declared MIME type; derived from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        path: PathBuf,
    },
    /// Remove stale staging files once and exit
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let db = connect(&config).await?;
            Migrator::up(&db, None).await.context("migration failed")?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Import {
            article_id,
            content_type,
            path,
        } => import(config, article_id, content_type, &path).await,
        Command::Sweep => {
            let removed = sweeper(&config).sweep_once().await?;
            tracing::info!(removed, "Staging sweep finished");
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let url = config.require_database_url()?;
    Database::connect(url)
        .await
        .context("failed to connect to database")
}

fn sweeper(config: &Config) -> StagingSweeper {
    StagingSweeper::new(
        config.storage.staging_dir.clone(),
        config.storage.staging_max_age,
    )
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| format!("cannot create {}", config.storage.root.display()))?;

    tokio::spawn(sweeper(&config).run_scheduler(SWEEP_INTERVAL));

    let pipeline = PhotoPipeline::new(config.storage.clone(), Arc::new(SeaOrmPhotoStore::new(db)));
    let app = create_routes(AppState {
        pipeline: Arc::new(pipeline),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}

async fn import(
    config: Config,
    article_id: i32,
    content_type: Option<String>,
    path: &Path,
) -> anyhow::Result<()> {
    let db = connect(&config).await?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("path has no usable file name")?
        .to_string();
    let content_type = content_type.unwrap_or_else(|| guess_content_type(&file_name).to_string());

    let pipeline = PhotoPipeline::new(config.storage, Arc::new(SeaOrmPhotoStore::new(db)));
    let mut source = BufferedSource::single_file(file_name, content_type, data);
    let photo = pipeline.run(article_id, &mut source).await?;

    println!("{}", serde_json::to_string_pretty(&photo)?);
    Ok(())
}

fn guess_content_type(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}
