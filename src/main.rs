use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hanru_dict::config::{self, AppConfig};
use hanru_dict::db;
use hanru_dict::import::{self, ImportPipeline, ImportSettings};
use hanru_dict::search::SearchEngine;
use hanru_dict::state::{AppState, ImportState};
use hanru_dict::storage::{EntryStore, SqliteEntryStore};

/// Chinese / Russian dictionary / 汉俄词典
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file / 配置文件
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API / 启动 HTTP 服务
    Serve,
    /// Import the configured DSL sources / 导入 DSL 词典
    Import {
        /// Remove existing entries first / 导入前清空词条
        #[arg(long)]
        truncate: bool,
    },
    /// Insert demo entries into an empty database / 写入演示数据
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hanru_dict=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration / 加载配置
    let app_config = config::load_config(&cli.config)?;
    let store = Arc::new(open_store(&app_config).await?);

    match cli.command {
        Command::Serve => serve(&app_config, store).await,
        Command::Import { truncate } => run_import(&app_config, store, truncate).await,
        Command::Seed => {
            import::seed(store.as_ref()).await?;
            Ok(())
        }
    }
}

async fn open_store(app_config: &AppConfig) -> anyhow::Result<SqliteEntryStore> {
    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());

    let pool = db::connect(&database_url).await?;
    db::run_migrations(&pool).await?;

    Ok(SqliteEntryStore::new(pool))
}

async fn serve(app_config: &AppConfig, store: Arc<SqliteEntryStore>) -> anyhow::Result<()> {
    let state = AppState::new(
        SearchEngine::new(store),
        app_config.search.default_limit,
        app_config.search.max_limit,
    );
    let app = hanru_dict::api::router(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_import(
    app_config: &AppConfig,
    store: Arc<SqliteEntryStore>,
    truncate: bool,
) -> anyhow::Result<()> {
    let files = import::discover_sources(&app_config.import)?;

    if truncate {
        store.clear_all().await?;
        tracing::info!("Cleared existing entries");
    }

    // Ctrl+C stops the run after the batch in flight / Ctrl+C 在当前批次后停止
    let state = Arc::new(ImportState::new());
    let cancel_state = state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(
                "Cancellation requested, stopping after the current batch ({} entries committed)",
                cancel_state.committed()
            );
            cancel_state.cancel();
        }
    });

    let pipeline = ImportPipeline::new(store, ImportSettings::from(&app_config.import))
        .with_state(state);
    let report = pipeline.import_all(&files).await?;

    if report.cancelled {
        tracing::warn!("Import cancelled, {} entries committed", report.inserted);
    } else {
        tracing::info!("Imported {} entries from {} files", report.inserted, report.files);
    }

    Ok(())
}
