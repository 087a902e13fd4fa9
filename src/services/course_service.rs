use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    authz::{require_course_manager, require_role},
    dto::courses::{
        CourseAnalytics, CourseDetail, CourseList, CreateCourseRequest, InstructorSummary,
        ModuleWithLessons, UpdateCourseRequest,
    },
    entity::{
        courses::{ActiveModel as CourseActive, Column as CourseCol, Entity as Courses, Model as CourseModel},
        enrollments::{Column as EnrollmentCol, Entity as Enrollments, Model as EnrollmentModel},
        lessons::{ActiveModel as LessonActive, Column as LessonCol, Entity as Lessons},
        modules::{ActiveModel as ModuleActive, Column as ModuleCol, Entity as Modules},
        profiles::Entity as Profiles,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Course, PricingType, Role},
    response::{ApiResponse, Meta},
    routes::params::{CourseQuery, CourseSortBy, SortOrder},
    services::mapping::{course_from_entity, lesson_from_entity, module_from_entity},
    state::AppState,
};

const COURSE_AUTHORS: [Role; 2] = [Role::Admin, Role::Instructor];

pub async fn create_course(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCourseRequest,
) -> AppResult<ApiResponse<Course>> {
    require_role(&state.orm, user, &COURSE_AUTHORS).await?;
    validate_slug(&payload.slug)?;
    validate_pricing(payload.pricing_type, payload.price)?;
    if let Some(min) = payload.completion_min_progress {
        validate_percentage(min)?;
    }

    let now = Utc::now();
    let active = CourseActive {
        id: Set(Uuid::new_v4()),
        slug: Set(payload.slug),
        title: Set(payload.title),
        description: Set(payload.description),
        short_description: Set(payload.short_description),
        thumbnail_url: Set(payload.thumbnail_url),
        category: Set(payload.category),
        level: Set(payload.level.as_str().to_string()),
        language: Set(payload.language),
        visibility: Set(payload.visibility.as_str().to_string()),
        published: Set(payload.published),
        published_at: Set(payload.published.then(|| now.into())),
        enrollment_type: Set(payload.enrollment_type.as_str().to_string()),
        max_students: Set(payload.max_students),
        pricing_type: Set(payload.pricing_type.as_str().to_string()),
        price: Set(payload.price.unwrap_or(0)),
        currency: Set(payload.currency.unwrap_or_else(|| "EUR".to_string())),
        sale_price: Set(payload.sale_price),
        certificate_enabled: Set(payload.certificate_enabled.unwrap_or(true)),
        completion_min_progress: Set(payload.completion_min_progress.unwrap_or(100)),
        instructor_id: Set(user.user_id),
        created_by: Set(user.user_id),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let course = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "course_create",
        "courses",
        json!({ "course_id": course.id }),
    )
    .await;

    let paths = ["/admin/courses".to_string(), format!("/courses/{}", course.slug)];
    Ok(ApiResponse::success("Course created", course_from_entity(course), Some(Meta::empty()))
        .revalidating(paths))
}

pub async fn list_courses(state: &AppState, query: CourseQuery) -> AppResult<ApiResponse<CourseList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(Expr::col(CourseCol::Title).ilike(pattern));
    }
    if let Some(published) = query.published {
        condition = condition.add(CourseCol::Published.eq(published));
    }
    if let Some(instructor_id) = query.instructor_id {
        condition = condition.add(CourseCol::InstructorId.eq(instructor_id));
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(CourseCol::Category.eq(category.clone()));
    }

    let sort_col = match query.sort_by.unwrap_or(CourseSortBy::CreatedAt) {
        CourseSortBy::CreatedAt => CourseCol::CreatedAt,
        CourseSortBy::Title => CourseCol::Title,
        CourseSortBy::Price => CourseCol::Price,
    };

    let mut finder = Courses::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(course_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Courses",
        CourseList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Course with its instructor, ordered curriculum and enrollment count.
pub async fn get_course(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CourseDetail>> {
    let course = Courses::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    let instructor = Profiles::find_by_id(course.instructor_id)
        .one(&state.orm)
        .await?
        .map(|p| InstructorSummary {
            id: p.id,
            full_name: p.full_name,
            avatar_url: p.avatar_url,
            bio: p.bio,
        });

    let modules = load_curriculum(state, course.id).await?;

    let enrollment_count = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(course.id))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "Course",
        CourseDetail {
            course: course_from_entity(course),
            instructor,
            modules,
            enrollment_count,
        },
        None,
    ))
}

async fn load_curriculum(state: &AppState, course_id: Uuid) -> AppResult<Vec<ModuleWithLessons>> {
    let modules = Modules::find()
        .filter(ModuleCol::CourseId.eq(course_id))
        .order_by_asc(ModuleCol::OrderIndex)
        .order_by_asc(ModuleCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let module_ids: Vec<Uuid> = modules.iter().map(|m| m.id).collect();
    let mut lessons_by_module: HashMap<Uuid, Vec<_>> = HashMap::new();
    if !module_ids.is_empty() {
        let lessons = Lessons::find()
            .filter(LessonCol::ModuleId.is_in(module_ids))
            .order_by_asc(LessonCol::OrderIndex)
            .order_by_asc(LessonCol::CreatedAt)
            .all(&state.orm)
            .await?;
        for lesson in lessons {
            lessons_by_module
                .entry(lesson.module_id)
                .or_default()
                .push(lesson_from_entity(lesson));
        }
    }

    Ok(modules
        .into_iter()
        .map(|m| ModuleWithLessons {
            lessons: lessons_by_module.remove(&m.id).unwrap_or_default(),
            module: module_from_entity(m),
        })
        .collect())
}

pub async fn update_course(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCourseRequest,
) -> AppResult<ApiResponse<Course>> {
    let access = require_course_manager(&state.orm, user, id).await?;

    // Pricing is checked against the course as it will be stored, not the payload alone.
    let pricing_type = payload
        .pricing_type
        .unwrap_or_else(|| PricingType::from_db(&access.course.pricing_type));
    let price = payload.price.unwrap_or(access.course.price);
    validate_pricing(pricing_type, Some(price))?;

    let mut active: CourseActive = access.course.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(slug) = payload.slug {
        validate_slug(&slug)?;
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(short_description) = payload.short_description {
        active.short_description = Set(Some(short_description));
    }
    if let Some(thumbnail_url) = payload.thumbnail_url {
        active.thumbnail_url = Set(Some(thumbnail_url));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(level) = payload.level {
        active.level = Set(level.as_str().to_string());
    }
    if let Some(language) = payload.language {
        active.language = Set(language);
    }
    if let Some(visibility) = payload.visibility {
        active.visibility = Set(visibility.as_str().to_string());
    }
    if let Some(enrollment_type) = payload.enrollment_type {
        active.enrollment_type = Set(enrollment_type.as_str().to_string());
    }
    if let Some(max_students) = payload.max_students {
        active.max_students = Set(Some(max_students));
    }
    if payload.pricing_type.is_some() {
        active.pricing_type = Set(pricing_type.as_str().to_string());
    }
    if payload.price.is_some() {
        active.price = Set(price);
    }
    if let Some(currency) = payload.currency {
        active.currency = Set(currency);
    }
    if let Some(sale_price) = payload.sale_price {
        active.sale_price = Set(Some(sale_price));
    }
    if let Some(certificate_enabled) = payload.certificate_enabled {
        active.certificate_enabled = Set(certificate_enabled);
    }
    if let Some(min) = payload.completion_min_progress {
        validate_percentage(min)?;
        active.completion_min_progress = Set(min);
    }
    active.updated_at = Set(Utc::now().into());

    let course = active.update(&state.orm).await?;

    let paths = ["/admin/courses".to_string(), format!("/admin/courses/{}", course.id)];
    Ok(ApiResponse::success("Course updated", course_from_entity(course), Some(Meta::empty()))
        .revalidating(paths))
}

/// Deletes the course; modules, lessons, enrollments and payments go with it through
/// the foreign keys.
pub async fn delete_course(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    require_course_manager(&state.orm, user, id).await?;

    let result = Courses::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Course not found"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "course_delete",
        "courses",
        json!({ "course_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Deleted", json!({ "success": true }), Some(Meta::empty()))
        .revalidating(["/admin/courses"]))
}

/// Copies a course with its modules and lessons, all unpublished. The inserts are not
/// wrapped in a transaction: a failure part-way leaves a partial copy behind.
pub async fn duplicate_course(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Course>> {
    let access = require_course_manager(&state.orm, user, id).await?;
    let original = access.course;

    let source_modules = Modules::find()
        .filter(ModuleCol::CourseId.eq(original.id))
        .order_by_asc(ModuleCol::OrderIndex)
        .all(&state.orm)
        .await?;

    let now = Utc::now();
    let copy = CourseActive {
        id: Set(Uuid::new_v4()),
        slug: Set(copy_slug(&original.slug, now.timestamp_millis())),
        title: Set(copy_title(&original.title)),
        description: Set(original.description.clone()),
        short_description: Set(original.short_description.clone()),
        thumbnail_url: Set(original.thumbnail_url.clone()),
        category: Set(original.category.clone()),
        level: Set(original.level.clone()),
        language: Set(original.language.clone()),
        visibility: Set(original.visibility.clone()),
        published: Set(false),
        published_at: Set(None),
        enrollment_type: Set(original.enrollment_type.clone()),
        max_students: Set(original.max_students),
        pricing_type: Set(original.pricing_type.clone()),
        price: Set(original.price),
        currency: Set(original.currency.clone()),
        sale_price: Set(original.sale_price),
        certificate_enabled: Set(original.certificate_enabled),
        completion_min_progress: Set(original.completion_min_progress),
        instructor_id: Set(user.user_id),
        created_by: Set(user.user_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let mut module_count = 0usize;
    let mut lesson_count = 0usize;
    for module in source_modules {
        let source_module_id = module.id;
        let new_module = ModuleActive {
            id: Set(Uuid::new_v4()),
            course_id: Set(copy.id),
            title: Set(module.title),
            description: Set(module.description),
            order_index: Set(module.order_index),
            published: Set(false),
            duration_minutes: Set(module.duration_minutes),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&state.orm)
        .await;

        // A module that failed to copy takes its lessons with it; the rest carries on.
        let new_module = match new_module {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(error = %err, module_id = %source_module_id, "module copy failed");
                continue;
            }
        };
        module_count += 1;

        lesson_count += copy_lessons(&state.orm, source_module_id, new_module.id).await?;
    }

    tracing::info!(
        source = %original.id,
        copy = %copy.id,
        modules = module_count,
        lessons = lesson_count,
        "course duplicated"
    );

    audit::record(
        &state.pool,
        Some(user.user_id),
        "course_duplicate",
        "courses",
        json!({ "source_id": original.id, "course_id": copy.id }),
    )
    .await;

    Ok(ApiResponse::success("Course duplicated", course_from_entity(copy), Some(Meta::empty()))
        .revalidating(["/admin/courses"]))
}

/// Copy the lessons of `source_module` into `target_module`, unpublished, in one batch.
/// A failed batch insert is logged and reported as zero copied lessons; only a failure to
/// read the source lessons is an error.
pub async fn copy_lessons<C: ConnectionTrait>(
    db: &C,
    source_module: Uuid,
    target_module: Uuid,
) -> AppResult<usize> {
    let lessons = Lessons::find()
        .filter(LessonCol::ModuleId.eq(source_module))
        .order_by_asc(LessonCol::OrderIndex)
        .all(db)
        .await?;
    if lessons.is_empty() {
        return Ok(0);
    }

    let copies: Vec<LessonActive> = lessons
        .into_iter()
        .map(|lesson| LessonActive {
            id: Set(Uuid::new_v4()),
            module_id: Set(target_module),
            title: Set(lesson.title),
            description: Set(lesson.description),
            lesson_type: Set(lesson.lesson_type),
            content: Set(lesson.content),
            duration_minutes: Set(lesson.duration_minutes),
            published: Set(false),
            order_index: Set(lesson.order_index),
            created_at: NotSet,
            updated_at: NotSet,
        })
        .collect();
    let batch = copies.len();
    match Lessons::insert_many(copies).exec(db).await {
        Ok(_) => Ok(batch),
        Err(err) => {
            tracing::warn!(
                error = %err,
                module_id = %source_module,
                lessons = batch,
                "lesson copy failed"
            );
            Ok(0)
        }
    }
}

pub async fn publish_course(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Course>> {
    set_published(state, user, id, true).await
}

pub async fn unpublish_course(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Course>> {
    set_published(state, user, id, false).await
}

async fn set_published(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    published: bool,
) -> AppResult<ApiResponse<Course>> {
    let access = require_course_manager(&state.orm, user, id).await?;

    let now = Utc::now();
    let mut active: CourseActive = access.course.into();
    active.published = Set(published);
    active.published_at = Set(published.then(|| now.into()));
    active.updated_at = Set(now.into());
    let course = active.update(&state.orm).await?;

    let message = if published { "Course published" } else { "Course unpublished" };
    Ok(ApiResponse::success(message, course_from_entity(course), Some(Meta::empty()))
        .revalidating(["/admin/courses", "/courses"]))
}

pub async fn get_course_analytics(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CourseAnalytics>> {
    let access = require_course_manager(&state.orm, user, id).await?;

    let enrollments = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(id))
        .all(&state.orm)
        .await?;

    let analytics = compute_analytics(&access.course, &enrollments);
    Ok(ApiResponse::success("Course analytics", analytics, Some(Meta::empty())))
}

/// Aggregates computed in memory. Trend and per-module/lesson breakdowns are left empty.
pub fn compute_analytics(course: &CourseModel, enrollments: &[EnrollmentModel]) -> CourseAnalytics {
    let total = enrollments.len() as i64;
    let active = enrollments.iter().filter(|e| e.status == "active").count() as i64;
    let completed = enrollments.iter().filter(|e| e.status == "completed").count() as i64;
    let total_progress: i64 = enrollments.iter().map(|e| e.progress as i64).sum();

    let (average_progress, completion_rate) = if total > 0 {
        (
            total_progress as f64 / total as f64,
            completed as f64 / total as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let revenue = if course.pricing_type == PricingType::Free.as_str() {
        0
    } else {
        total * course.price
    };

    CourseAnalytics {
        total_enrollments: total,
        active_enrollments: active,
        completed_enrollments: completed,
        average_progress,
        completion_rate,
        revenue,
        ..CourseAnalytics::default()
    }
}

pub fn copy_title(title: &str) -> String {
    format!("{title} (Copy)")
}

pub fn copy_slug(slug: &str, millis: i64) -> String {
    format!("{slug}-copy-{millis}")
}

fn validate_slug(slug: &str) -> AppResult<()> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "slug may only contain lowercase letters, digits and dashes",
        ))
    }
}

fn validate_pricing(pricing_type: PricingType, price: Option<i64>) -> AppResult<()> {
    match (pricing_type, price) {
        (_, Some(p)) if p < 0 => Err(AppError::bad_request("price must not be negative")),
        (PricingType::Free, _) => Ok(()),
        (_, Some(p)) if p > 0 => Ok(()),
        _ => Err(AppError::bad_request("paid courses need a positive price")),
    }
}

pub(crate) fn validate_percentage(value: i32) -> AppResult<()> {
    if (0..=100).contains(&value) {
        Ok(())
    } else {
        Err(AppError::bad_request("progress must be between 0 and 100"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn course(pricing_type: &str, price: i64) -> CourseModel {
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap());
        CourseModel {
            id: Uuid::new_v4(),
            slug: "rust-101".into(),
            title: "Rust 101".into(),
            description: String::new(),
            short_description: None,
            thumbnail_url: None,
            category: "dev".into(),
            level: "beginner".into(),
            language: "fr".into(),
            visibility: "public".into(),
            published: true,
            published_at: Some(now),
            enrollment_type: "open".into(),
            max_students: None,
            pricing_type: pricing_type.into(),
            price,
            currency: "EUR".into(),
            sale_price: None,
            certificate_enabled: true,
            completion_min_progress: 100,
            instructor_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn enrollment(course_id: Uuid, status: &str, progress: i32) -> EnrollmentModel {
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap());
        EnrollmentModel {
            id: Uuid::new_v4(),
            course_id,
            user_id: Uuid::new_v4(),
            status: status.into(),
            progress,
            enrolled_at: now,
            completed_at: None,
            last_accessed_at: None,
            certificate_issued: false,
            certificate_issued_at: None,
        }
    }

    #[test]
    fn analytics_without_enrollments_is_zero_not_nan() {
        let c = course("one-time", 4900);
        let analytics = compute_analytics(&c, &[]);
        assert_eq!(analytics.total_enrollments, 0);
        assert_eq!(analytics.average_progress, 0.0);
        assert_eq!(analytics.completion_rate, 0.0);
        assert_eq!(analytics.revenue, 0);
        assert!(analytics.enrollment_trend.is_empty());
        assert!(analytics.module_completion.is_empty());
    }

    #[test]
    fn analytics_counts_and_averages() {
        let c = course("one-time", 4900);
        let rows = vec![
            enrollment(c.id, "active", 50),
            enrollment(c.id, "completed", 100),
            enrollment(c.id, "active", 0),
            enrollment(c.id, "cancelled", 10),
        ];
        let analytics = compute_analytics(&c, &rows);
        assert_eq!(analytics.total_enrollments, 4);
        assert_eq!(analytics.active_enrollments, 2);
        assert_eq!(analytics.completed_enrollments, 1);
        assert_eq!(analytics.average_progress, 40.0);
        assert_eq!(analytics.completion_rate, 25.0);
        assert_eq!(analytics.revenue, 4 * 4900);
    }

    #[test]
    fn free_courses_have_no_revenue() {
        let c = course("free", 4900);
        let rows = vec![enrollment(c.id, "active", 10)];
        assert_eq!(compute_analytics(&c, &rows).revenue, 0);
    }

    #[test]
    fn copies_get_marked_title_and_unique_slug() {
        assert_eq!(copy_title("Rust 101"), "Rust 101 (Copy)");
        assert_eq!(copy_slug("rust-101", 1700000000000), "rust-101-copy-1700000000000");
    }

    #[test]
    fn slug_and_pricing_rules() {
        assert!(validate_slug("rust-101").is_ok());
        assert!(validate_slug("Rust 101").is_err());
        assert!(validate_slug("").is_err());

        assert!(validate_pricing(PricingType::Free, None).is_ok());
        assert!(validate_pricing(PricingType::OneTime, Some(4900)).is_ok());
        assert!(validate_pricing(PricingType::OneTime, None).is_err());
        assert!(validate_pricing(PricingType::Subscription, Some(-1)).is_err());
    }
}
