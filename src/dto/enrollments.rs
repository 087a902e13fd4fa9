use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Course, Enrollment, EnrollmentStatus, Profile};

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkEnrollRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateEnrollmentRequest {
    pub status: Option<EnrollmentStatus>,
    pub progress: Option<i32>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProgressRequest {
    pub progress: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EnrollmentList {
    #[schema(value_type = Vec<Enrollment>)]
    pub items: Vec<Enrollment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrolledStudent {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub student: Option<Profile>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EnrolledStudentList {
    #[schema(value_type = Vec<EnrolledStudent>)]
    pub items: Vec<EnrolledStudent>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: Option<Course>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressOverview {
    pub total_courses: i64,
    pub completed_courses: i64,
    pub in_progress_courses: i64,
    pub average_progress: i64,
    pub courses: Vec<EnrollmentWithCourse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateOverview {
    pub total_certificates: i64,
    pub certificates_this_year: i64,
    pub certificates: Vec<EnrollmentWithCourse>,
}
