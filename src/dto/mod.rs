pub mod audit;
pub mod auth;
pub mod courses;
pub mod curriculum;
pub mod dashboard;
pub mod enrollments;
pub mod payments;
pub mod users;
