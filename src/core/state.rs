use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::ai_scoring::ScoringOracle;
use crate::services::enrollment::EnrollmentGateway;
use crate::services::recency::RecencyBuffer;

#[derive(Clone)]
pub struct EngineState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    recency: RecencyBuffer,
    oracle: Arc<dyn ScoringOracle>,
    enrollment: Arc<dyn EnrollmentGateway>,
}

impl EngineState {
    pub fn new(
        settings: Settings,
        db: PgPool,
        oracle: Arc<dyn ScoringOracle>,
        enrollment: Arc<dyn EnrollmentGateway>,
    ) -> Self {
        let recency = RecencyBuffer::new(settings.engine().recency_capacity);
        Self { inner: Arc::new(InnerState { settings, db, recency, oracle, enrollment }) }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn recency(&self) -> &RecencyBuffer {
        &self.inner.recency
    }

    pub fn oracle(&self) -> &dyn ScoringOracle {
        self.inner.oracle.as_ref()
    }

    pub fn enrollment(&self) -> &dyn EnrollmentGateway {
        self.inner.enrollment.as_ref()
    }
}
