pub mod ai_scoring;
pub mod attempt_rules;
pub mod attempts;
pub mod authoring;
pub mod enrollment;
pub mod recency;
pub mod scoring;
pub mod selection;
