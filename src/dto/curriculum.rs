use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::LessonType;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateModuleRequest {
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    #[serde(default)]
    pub published: bool,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateModuleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order_index: Option<i32>,
    pub published: Option<bool>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    #[schema(value_type = Option<Object>)]
    pub content: Option<Value>,
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub published: bool,
    pub order_index: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: Option<LessonType>,
    #[schema(value_type = Option<Object>)]
    pub content: Option<Value>,
    pub duration_minutes: Option<i32>,
    pub published: Option<bool>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    /// Ids in their new order; position `n` (zero based) receives `order_index = n + 1`.
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReorderFailure {
    pub id: Uuid,
    pub error: String,
}

/// Outcome of a non-atomic reorder: successful updates persist even when others failed.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ReorderResult {
    pub updated: Vec<Uuid>,
    pub failed: Vec<ReorderFailure>,
}
