#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod knowledge_service;
pub mod logging;
pub mod quick_test_service;
pub mod skill_locks;
pub mod skill_service;

pub use retention_core::Clock;

pub use app_services::AppServices;
pub use config::ServiceConfig;
pub use error::{
    AppServicesError, KnowledgeServiceError, QuickTestServiceError, SkillServiceError,
};
pub use knowledge_service::KnowledgeService;
pub use logging::{LogConfig, init_tracing};
pub use quick_test_service::{QuickTestService, Submission};
pub use skill_locks::SkillLocks;
pub use skill_service::{SkillService, SkillWithStrength};
