use async_trait::async_trait;

use crate::db::types::CourseLevel;

/// Course facts the engine needs from the course/enrollment collaborator.
#[derive(Debug, Clone)]
pub struct CourseProfile {
    pub course_id: String,
    pub level: CourseLevel,
    pub topic_ids: Vec<String>,
}

/// Seam to the enrollment collaborator: it supplies the course profile for
/// formal course tests and consumes the pass verdict to re-evaluate
/// completion/certification. Gateway failures on the notify side are
/// logged by the caller and never block a submission.
#[async_trait]
pub trait EnrollmentGateway: Send + Sync {
    async fn course_profile(&self, course_id: &str) -> anyhow::Result<CourseProfile>;

    async fn review_certification(
        &self,
        student_id: &str,
        course_id: &str,
        score_percent: f64,
    ) -> anyhow::Result<()>;
}
