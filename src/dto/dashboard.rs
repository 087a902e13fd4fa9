use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub total_users: i64,
    pub total_courses: i64,
    pub total_revenue: i64,
    pub new_users_today: i64,
    pub course_completion_rate: f64,
    pub active_users: i64,
    pub revenue_growth: f64,
    pub user_growth: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructorCourseStats {
    pub id: Uuid,
    pub title: String,
    pub published: bool,
    pub students: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructorDashboard {
    pub courses: Vec<InstructorCourseStats>,
    pub total_students: i64,
    pub total_revenue: i64,
    pub average_rating: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseProgress {
    pub id: Uuid,
    pub title: String,
    pub progress: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub courses_in_progress: Vec<CourseProgress>,
    pub completed_courses: i64,
    pub certificates: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "role", content = "dashboard", rename_all = "snake_case")]
pub enum Dashboard {
    Admin(AdminDashboard),
    Instructor(InstructorDashboard),
    Student(StudentDashboard),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardView {
    pub user_name: String,
    #[serde(flatten)]
    pub dashboard: Dashboard,
}
