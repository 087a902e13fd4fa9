use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    Course, CourseLevel, EnrollmentType, Lesson, Module, PricingType, Visibility,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category: String,
    pub level: CourseLevel,
    pub language: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub published: bool,
    pub enrollment_type: EnrollmentType,
    pub max_students: Option<i32>,
    pub pricing_type: PricingType,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub sale_price: Option<i64>,
    pub certificate_enabled: Option<bool>,
    pub completion_min_progress: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub language: Option<String>,
    pub visibility: Option<Visibility>,
    pub enrollment_type: Option<EnrollmentType>,
    pub max_students: Option<i32>,
    pub pricing_type: Option<PricingType>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub sale_price: Option<i64>,
    pub certificate_enabled: Option<bool>,
    pub completion_min_progress: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CourseList {
    #[schema(value_type = Vec<Course>)]
    pub items: Vec<Course>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructorSummary {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub instructor: Option<InstructorSummary>,
    pub modules: Vec<ModuleWithLessons>,
    pub enrollment_count: i64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CourseAnalytics {
    pub total_enrollments: i64,
    pub active_enrollments: i64,
    pub completed_enrollments: i64,
    pub average_progress: f64,
    pub completion_rate: f64,
    pub revenue: i64,
    pub enrollment_trend: Vec<TrendPoint>,
    #[schema(value_type = Object)]
    pub module_completion: serde_json::Map<String, serde_json::Value>,
    #[schema(value_type = Object)]
    pub lesson_engagement: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrendPoint {
    pub date: String,
    pub enrollments: i64,
}
