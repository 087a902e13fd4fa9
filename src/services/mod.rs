pub mod audit_service;
pub mod auth_service;
pub mod course_service;
pub mod curriculum_service;
pub mod dashboard_service;
pub mod enrollment_service;
pub mod identity_service;
pub(crate) mod mapping;
pub mod payment_service;
pub mod user_service;
