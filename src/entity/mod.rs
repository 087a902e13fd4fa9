pub mod audit_logs;
pub mod auth_users;
pub mod courses;
pub mod enrollments;
pub mod lessons;
pub mod modules;
pub mod payments;
pub mod profiles;

pub use audit_logs::Entity as AuditLogs;
pub use auth_users::Entity as AuthUsers;
pub use courses::Entity as Courses;
pub use enrollments::Entity as Enrollments;
pub use lessons::Entity as Lessons;
pub use modules::Entity as Modules;
pub use payments::Entity as Payments;
pub use profiles::Entity as Profiles;
