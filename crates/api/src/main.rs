use clap::Parser;
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use api::routes;
use api::state::AppState;
use common::{init_logging, settings::Settings};
use repos::Repo;
use services::user::UserService;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[arg(short = 'C', long, default_value = "config")]
    config_dir: String,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    log_directory: Option<String>,

    #[arg(long)]
    upload_dir: Option<String>,

    #[arg(long)]
    download_dir: Option<String>,

    #[arg(long)]
    database_url: Option<String>,
}

impl CliArgs {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        [
            ("port", self.port.map(|port| port.to_string())),
            ("url", self.url.clone()),
            ("log_level", self.log_level.clone()),
            ("log_directory", self.log_directory.clone()),
            ("log_upload_dir", self.upload_dir.clone()),
            ("log_app_crash_dir", self.download_dir.clone()),
            ("database_url", self.database_url.clone()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
    }
}

struct CrashReporterApp {
    settings: Arc<Settings>,
}

impl CrashReporterApp {
    fn new(args: &CliArgs) -> Result<Self, Box<dyn Error>> {
        let settings = Settings::load(&args.config_dir, &args.overrides())?;
        Ok(Self {
            settings: Arc::new(settings),
        })
    }

    async fn run(&self) -> Result<(), Box<dyn Error>> {
        let _guard = init_logging(&self.settings.logger);

        let repo = self.init_repo().await?;
        let (uploads, downloads) = self.init_stores()?;

        if let Some(admin) = UserService::new(repo.clone()).initialize().await? {
            info!("Seeded default administrator {}", admin.id);
        }

        let state = AppState {
            repo,
            settings: self.settings.clone(),
            uploads,
            downloads,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.server.port));
        info!("Starting server on {addr}, public URL {}", self.settings.server.url);

        axum_server::bind(addr)
            .serve(routes::app(state).into_make_service())
            .await?;
        Ok(())
    }

    async fn init_repo(&self) -> Result<Repo, Box<dyn Error>> {
        let database = &self.settings.database;
        if database.url.is_empty() {
            warn!("No database configured, documents are kept in memory only");
            return Ok(Repo::in_memory());
        }

        Ok(Repo::new(self.init_db().await?))
    }

    async fn init_db(&self) -> Result<PgPool, Box<dyn Error>> {
        let database = &self.settings.database;
        let mut opts: PgConnectOptions = database.url.parse()?;
        if !database.login.is_empty() {
            opts = opts.username(&database.login);
        }
        if !database.password.is_empty() {
            opts = opts.password(&database.password);
        }
        opts = opts.log_statements(log::LevelFilter::Debug);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;
        Ok(pool)
    }

    fn init_stores(&self) -> Result<(Arc<dyn ObjectStore>, Arc<dyn ObjectStore>), Box<dyn Error>> {
        let storage = &self.settings.storage;

        std::fs::create_dir_all(&storage.upload_dir)?;
        let uploads: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(&storage.upload_dir)?);

        if storage.download_dir == storage.upload_dir {
            return Ok((uploads.clone(), uploads));
        }

        std::fs::create_dir_all(&storage.download_dir)?;
        let downloads: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(&storage.download_dir)?);
        Ok((uploads, downloads))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();
    let app = CrashReporterApp::new(&args)?;
    app.run().await
}
