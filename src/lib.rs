pub mod core;
pub mod db;
pub mod error;
pub mod repositories;
pub mod schemas;
pub mod services;

use std::sync::Arc;

pub use crate::core::config::Settings;
pub use crate::core::identity::{ActorRole, Identity};
pub use crate::core::state::EngineState;
pub use crate::error::{EngineError, Result};
pub use crate::services::ai_scoring::{AiScoringService, ScoringOracle};
pub use crate::services::enrollment::{CourseProfile, EnrollmentGateway};

/// Bootstrap the engine for a host process: environment, tracing, database
/// pool and migrations. The enrollment gateway is supplied by the platform;
/// the scoring oracle defaults to the configured AI service.
pub async fn init_engine(enrollment: Arc<dyn EnrollmentGateway>) -> anyhow::Result<EngineState> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    core::telemetry::init_tracing(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let oracle = Arc::new(AiScoringService::from_settings(&settings)?);

    tracing::info!(
        environment = settings.runtime().environment.as_str(),
        questions_per_attempt = settings.engine().questions_per_attempt,
        "SmartTest engine initialized"
    );

    Ok(EngineState::new(settings, db_pool, oracle, enrollment))
}
