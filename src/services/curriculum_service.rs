use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::json;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    authz::{require_course_manager, require_lesson_manager, require_module_manager},
    dto::curriculum::{
        CreateLessonRequest, CreateModuleRequest, ReorderFailure, ReorderResult,
        UpdateLessonRequest, UpdateModuleRequest,
    },
    entity::{
        lessons::{ActiveModel as LessonActive, Column as LessonCol, Entity as Lessons},
        modules::{ActiveModel as ModuleActive, Column as ModuleCol, Entity as Modules},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Lesson, Module},
    response::{ApiResponse, Meta},
    services::mapping::{lesson_from_entity, module_from_entity},
    state::AppState,
};

fn course_paths(course_id: Uuid) -> [String; 2] {
    [
        format!("/admin/courses/{course_id}"),
        format!("/admin/courses/{course_id}/curriculum"),
    ]
}

pub async fn create_module(
    state: &AppState,
    user: &AuthUser,
    course_id: Uuid,
    payload: CreateModuleRequest,
) -> AppResult<ApiResponse<Module>> {
    require_course_manager(&state.orm, user, course_id).await?;

    let module = ModuleActive {
        id: Set(Uuid::new_v4()),
        course_id: Set(course_id),
        title: Set(payload.title),
        description: Set(payload.description),
        order_index: Set(payload.order_index),
        published: Set(payload.published),
        duration_minutes: Set(payload.duration_minutes),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success("Module created", module_from_entity(module), Some(Meta::empty()))
        .revalidating(course_paths(course_id)))
}

pub async fn update_module(
    state: &AppState,
    user: &AuthUser,
    module_id: Uuid,
    payload: UpdateModuleRequest,
) -> AppResult<ApiResponse<Module>> {
    let (module, _) = require_module_manager(&state.orm, user, module_id).await?;
    let course_id = module.course_id;

    let mut active: ModuleActive = module.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(order_index) = payload.order_index {
        active.order_index = Set(order_index);
    }
    if let Some(published) = payload.published {
        active.published = Set(published);
    }
    if let Some(duration) = payload.duration_minutes {
        active.duration_minutes = Set(Some(duration));
    }
    active.updated_at = Set(Utc::now().into());
    let module = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Module updated", module_from_entity(module), Some(Meta::empty()))
        .revalidating(course_paths(course_id)))
}

/// Removes the module and, through the foreign key, its lessons.
pub async fn delete_module(
    state: &AppState,
    user: &AuthUser,
    module_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let (module, _) = require_module_manager(&state.orm, user, module_id).await?;

    Modules::delete_by_id(module.id).exec(&state.orm).await?;

    Ok(
        ApiResponse::success("Deleted", json!({ "success": true }), Some(Meta::empty()))
            .revalidating(course_paths(module.course_id)),
    )
}

pub async fn reorder_modules(
    state: &AppState,
    user: &AuthUser,
    course_id: Uuid,
    ids: Vec<Uuid>,
) -> AppResult<ApiResponse<ReorderResult>> {
    require_course_manager(&state.orm, user, course_id).await?;

    let mut tasks = JoinSet::new();
    for (id, order_index) in order_assignments(&ids) {
        let db = state.orm.clone();
        tasks.spawn(async move {
            let outcome = set_module_order(&db, course_id, id, order_index).await;
            (id, outcome)
        });
    }

    let result = collect_reorder(tasks).await;
    tracing::debug!(
        %course_id,
        updated = result.updated.len(),
        failed = result.failed.len(),
        "modules reordered"
    );

    Ok(ApiResponse::success("Modules reordered", result, Some(Meta::empty()))
        .revalidating(course_paths(course_id)))
}

async fn set_module_order(
    db: &DatabaseConnection,
    course_id: Uuid,
    id: Uuid,
    order_index: i32,
) -> AppResult<()> {
    let res = Modules::update_many()
        .col_expr(ModuleCol::OrderIndex, Expr::value(order_index))
        .col_expr(ModuleCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(ModuleCol::Id.eq(id))
        .filter(ModuleCol::CourseId.eq(course_id))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Module not found"));
    }
    Ok(())
}

pub async fn create_lesson(
    state: &AppState,
    user: &AuthUser,
    module_id: Uuid,
    payload: CreateLessonRequest,
) -> AppResult<ApiResponse<Lesson>> {
    let (module, _) = require_module_manager(&state.orm, user, module_id).await?;

    let lesson = LessonActive {
        id: Set(Uuid::new_v4()),
        module_id: Set(module.id),
        title: Set(payload.title),
        description: Set(payload.description),
        lesson_type: Set(payload.lesson_type.as_str().to_string()),
        content: Set(payload.content),
        duration_minutes: Set(payload.duration_minutes),
        published: Set(payload.published),
        order_index: Set(payload.order_index),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success("Lesson created", lesson_from_entity(lesson), Some(Meta::empty()))
        .revalidating(course_paths(module.course_id)))
}

pub async fn update_lesson(
    state: &AppState,
    user: &AuthUser,
    lesson_id: Uuid,
    payload: UpdateLessonRequest,
) -> AppResult<ApiResponse<Lesson>> {
    let (lesson, access) = require_lesson_manager(&state.orm, user, lesson_id).await?;

    let mut active: LessonActive = lesson.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(lesson_type) = payload.lesson_type {
        active.lesson_type = Set(lesson_type.as_str().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(Some(content));
    }
    if let Some(duration) = payload.duration_minutes {
        active.duration_minutes = Set(Some(duration));
    }
    if let Some(published) = payload.published {
        active.published = Set(published);
    }
    if let Some(order_index) = payload.order_index {
        active.order_index = Set(order_index);
    }
    active.updated_at = Set(Utc::now().into());
    let lesson = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Lesson updated", lesson_from_entity(lesson), Some(Meta::empty()))
        .revalidating(course_paths(access.course.id)))
}

pub async fn delete_lesson(
    state: &AppState,
    user: &AuthUser,
    lesson_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let (lesson, access) = require_lesson_manager(&state.orm, user, lesson_id).await?;

    Lessons::delete_by_id(lesson.id).exec(&state.orm).await?;

    Ok(
        ApiResponse::success("Deleted", json!({ "success": true }), Some(Meta::empty()))
            .revalidating(course_paths(access.course.id)),
    )
}

pub async fn reorder_lessons(
    state: &AppState,
    user: &AuthUser,
    module_id: Uuid,
    ids: Vec<Uuid>,
) -> AppResult<ApiResponse<ReorderResult>> {
    let (module, _) = require_module_manager(&state.orm, user, module_id).await?;

    let mut tasks = JoinSet::new();
    for (id, order_index) in order_assignments(&ids) {
        let db = state.orm.clone();
        tasks.spawn(async move {
            let outcome = set_lesson_order(&db, module_id, id, order_index).await;
            (id, outcome)
        });
    }

    let result = collect_reorder(tasks).await;
    tracing::debug!(
        %module_id,
        updated = result.updated.len(),
        failed = result.failed.len(),
        "lessons reordered"
    );

    Ok(ApiResponse::success("Lessons reordered", result, Some(Meta::empty()))
        .revalidating(course_paths(module.course_id)))
}

async fn set_lesson_order(
    db: &DatabaseConnection,
    module_id: Uuid,
    id: Uuid,
    order_index: i32,
) -> AppResult<()> {
    let res = Lessons::update_many()
        .col_expr(LessonCol::OrderIndex, Expr::value(order_index))
        .col_expr(LessonCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(LessonCol::Id.eq(id))
        .filter(LessonCol::ModuleId.eq(module_id))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Lesson not found"));
    }
    Ok(())
}

/// Position `n` in the submitted list becomes `order_index = n + 1`.
pub fn order_assignments(ids: &[Uuid]) -> Vec<(Uuid, i32)> {
    ids.iter()
        .enumerate()
        .map(|(pos, id)| (*id, pos as i32 + 1))
        .collect()
}

async fn collect_reorder(mut tasks: JoinSet<(Uuid, AppResult<()>)>) -> ReorderResult {
    let mut result = ReorderResult::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(()))) => result.updated.push(id),
            Ok((id, Err(err))) => {
                tracing::warn!(%id, error = %err, "reorder update failed");
                result.failed.push(ReorderFailure {
                    id,
                    error: err.to_string(),
                });
            }
            Err(err) => tracing::error!(error = %err, "reorder task aborted"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_follow_list_position() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(order_assignments(&[c, a, b]), vec![(c, 1), (a, 2), (b, 3)]);
        assert!(order_assignments(&[]).is_empty());
    }

    #[tokio::test]
    async fn collect_splits_successes_and_failures() {
        let (ok, missing) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tasks = JoinSet::new();
        tasks.spawn(async move { (ok, Ok(())) });
        tasks.spawn(async move { (missing, Err(AppError::not_found("Module not found"))) });

        let result = collect_reorder(tasks).await;
        assert_eq!(result.updated, vec![ok]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, missing);
        assert_eq!(result.failed[0].error, "Module not found");
    }
}
