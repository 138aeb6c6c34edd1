use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::{
    AccessService, AppState,
    config::ApiConfig,
    nutrition::{NutritionSearch, UsdaFoodSource},
    routes,
};
use common::database::{self, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting food diary service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;
    database::run_migrations(&pool).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let config = ApiConfig::from_env();

    let usda = UsdaFoodSource::new(
        config.usda_api_url.clone(),
        config.usda_api_key.clone(),
        config.nutrition_timeout,
    )?;

    let app_state = AppState {
        db_pool: pool.clone(),
        access: AccessService::new(pool),
        nutrition: NutritionSearch::new(Arc::new(usda)),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Food diary service listening on {}", config.listen_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
