use std::collections::HashMap;

use chrono::{Datelike, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    authz::{can_manage_course, load_profile, require_course_manager},
    dto::enrollments::{
        CertificateOverview, EnrolledStudent, EnrolledStudentList, EnrollmentList,
        EnrollmentWithCourse, ProgressOverview, UpdateEnrollmentRequest,
    },
    entity::{
        courses::{Entity as Courses, Model as CourseModel},
        enrollments::{
            ActiveModel as EnrollmentActive, Column as EnrollmentCol, Entity as Enrollments,
            Model as EnrollmentModel,
        },
        profiles::Entity as Profiles,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Enrollment, EnrollmentStatus, Role},
    response::{ApiResponse, Meta},
    services::{
        course_service::validate_percentage,
        mapping::{course_from_entity, enrollment_from_entity, profile_from_entity},
    },
    state::AppState,
};

pub(crate) fn new_enrollment(course_id: Uuid, user_id: Uuid) -> EnrollmentActive {
    EnrollmentActive {
        id: Set(Uuid::new_v4()),
        course_id: Set(course_id),
        user_id: Set(user_id),
        status: Set(EnrollmentStatus::Active.as_str().to_string()),
        progress: Set(0),
        enrolled_at: NotSet,
        completed_at: Set(None),
        last_accessed_at: Set(None),
        certificate_issued: Set(false),
        certificate_issued_at: Set(None),
    }
}

/// Owner or admin may enroll anyone; anyone may enroll themselves in a published course.
pub async fn enroll_student(
    state: &AppState,
    user: &AuthUser,
    course_id: Uuid,
    student_id: Uuid,
) -> AppResult<ApiResponse<Enrollment>> {
    let course = Courses::find_by_id(course_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    let profile = load_profile(&state.orm, user).await?;
    let role = Role::from_db(&profile.role);

    let manager = can_manage_course(user.user_id, role, course.instructor_id);
    let self_enrollment = student_id == user.user_id && course.published;
    if !manager && !self_enrollment {
        return Err(AppError::forbidden(
            "Insufficient permissions to enroll in this course",
        ));
    }

    // No existence pre-check: the (course_id, user_id) constraint reports duplicates.
    let enrollment = new_enrollment(course_id, student_id).insert(&state.orm).await?;

    tracing::info!(%course_id, user_id = %student_id, "student enrolled");
    Ok(ApiResponse::success(
        "Enrolled",
        enrollment_from_entity(enrollment),
        Some(Meta::empty()),
    )
    .revalidating([format!("/admin/courses/{course_id}/students"), "/dashboard".into()]))
}

/// Rows per multi-row insert. Each row binds nine parameters and Postgres accepts at most
/// 65535 per statement.
const BULK_ENROLL_CHUNK: usize = 5000;

pub async fn bulk_enroll_students(
    state: &AppState,
    user: &AuthUser,
    course_id: Uuid,
    user_ids: Vec<Uuid>,
) -> AppResult<ApiResponse<EnrollmentList>> {
    require_course_manager(&state.orm, user, course_id).await?;
    if user_ids.is_empty() {
        return Err(AppError::bad_request("No students to enroll"));
    }

    // Chunks are inserted one after another without a transaction, like every other
    // multi-step write here: a failing chunk leaves the earlier ones enrolled.
    let mut items = Vec::with_capacity(user_ids.len());
    for chunk in user_ids.chunks(BULK_ENROLL_CHUNK) {
        let rows: Vec<EnrollmentActive> = chunk
            .iter()
            .map(|student_id| new_enrollment(course_id, *student_id))
            .collect();
        Enrollments::insert_many(rows).exec(&state.orm).await?;

        let inserted = Enrollments::find()
            .filter(EnrollmentCol::CourseId.eq(course_id))
            .filter(EnrollmentCol::UserId.is_in(chunk.iter().copied()))
            .all(&state.orm)
            .await?;
        items.extend(inserted.into_iter().map(enrollment_from_entity));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "enrollment_bulk_create",
        "enrollments",
        json!({ "course_id": course_id, "count": items.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Enrolled {} students", items.len()),
        EnrollmentList { items },
        Some(Meta::empty()),
    )
    .revalidating([format!("/admin/courses/{course_id}/students")]))
}

pub async fn list_course_enrollments(
    state: &AppState,
    user: &AuthUser,
    course_id: Uuid,
) -> AppResult<ApiResponse<EnrolledStudentList>> {
    require_course_manager(&state.orm, user, course_id).await?;

    let rows = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(course_id))
        .order_by_desc(EnrollmentCol::EnrolledAt)
        .find_also_related(Profiles)
        .all(&state.orm)
        .await?;

    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .map(|(enrollment, profile)| EnrolledStudent {
            enrollment: enrollment_from_entity(enrollment),
            student: profile.map(profile_from_entity),
        })
        .collect();

    Ok(ApiResponse::success(
        "Enrollments",
        EnrolledStudentList { items },
        Some(Meta::new(1, total.max(1), total)),
    ))
}

async fn load_enrollment<C: ConnectionTrait>(
    db: &C,
    enrollment_id: Uuid,
) -> AppResult<(EnrollmentModel, CourseModel)> {
    let (enrollment, course) = Enrollments::find_by_id(enrollment_id)
        .find_also_related(Courses)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Enrollment not found"))?;
    let course = course.ok_or_else(|| AppError::not_found("Course not found"))?;
    Ok((enrollment, course))
}

/// The enrolled student, the course owner or an admin.
async fn require_enrollment_party(
    state: &AppState,
    user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<(EnrollmentModel, CourseModel)> {
    let (enrollment, course) = load_enrollment(&state.orm, enrollment_id).await?;
    if enrollment.user_id == user.user_id {
        return Ok((enrollment, course));
    }
    let profile = load_profile(&state.orm, user).await?;
    if can_manage_course(user.user_id, Role::from_db(&profile.role), course.instructor_id) {
        Ok((enrollment, course))
    } else {
        Err(AppError::forbidden(
            "Insufficient permissions to access this enrollment",
        ))
    }
}

/// Direct field writes. Status transitions are not checked.
pub async fn update_enrollment(
    state: &AppState,
    user: &AuthUser,
    enrollment_id: Uuid,
    payload: UpdateEnrollmentRequest,
) -> AppResult<ApiResponse<Enrollment>> {
    let (enrollment, course) = load_enrollment(&state.orm, enrollment_id).await?;
    require_course_manager(&state.orm, user, course.id).await?;

    let mut active: EnrollmentActive = enrollment.into();
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(progress) = payload.progress {
        validate_percentage(progress)?;
        active.progress = Set(progress);
    }
    if let Some(completed_at) = payload.completed_at {
        active.completed_at = Set(Some(completed_at.into()));
    }
    let enrollment = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Enrollment updated",
        enrollment_from_entity(enrollment),
        Some(Meta::empty()),
    )
    .revalidating([format!("/admin/courses/{}/students", course.id)]))
}

pub async fn unenroll_student(
    state: &AppState,
    user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let (enrollment, course) = require_enrollment_party(state, user, enrollment_id).await?;

    Enrollments::delete_by_id(enrollment.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "enrollment_delete",
        "enrollments",
        json!({ "course_id": course.id, "user_id": enrollment.user_id }),
    )
    .await;

    Ok(
        ApiResponse::success("Unenrolled", json!({ "success": true }), Some(Meta::empty()))
            .revalidating([format!("/admin/courses/{}/students", course.id), "/dashboard".into()]),
    )
}

pub async fn update_progress(
    state: &AppState,
    user: &AuthUser,
    enrollment_id: Uuid,
    progress: i32,
) -> AppResult<ApiResponse<Enrollment>> {
    validate_percentage(progress)?;
    let (enrollment, course) = require_enrollment_party(state, user, enrollment_id).await?;

    let now = Utc::now();
    let mut active: EnrollmentActive = enrollment.into();
    active.progress = Set(progress);
    active.last_accessed_at = Set(Some(now.into()));
    if progress == 100 {
        active.status = Set(EnrollmentStatus::Completed.as_str().to_string());
        active.completed_at = Set(Some(now.into()));
    }
    let enrollment = active.update(&state.orm).await?;

    tracing::debug!(%enrollment_id, progress, "progress updated");
    Ok(ApiResponse::success(
        "Progress updated",
        enrollment_from_entity(enrollment),
        Some(Meta::empty()),
    )
    .revalidating([format!("/courses/{}", course.slug), "/dashboard".into()]))
}

pub async fn issue_certificate(
    state: &AppState,
    user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<ApiResponse<Enrollment>> {
    let (enrollment, course) = require_enrollment_party(state, user, enrollment_id).await?;
    check_certificate_eligibility(&enrollment, &course)?;

    let mut active: EnrollmentActive = enrollment.into();
    active.certificate_issued = Set(true);
    active.certificate_issued_at = Set(Some(Utc::now().into()));
    let enrollment = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "certificate_issue",
        "enrollments",
        json!({ "enrollment_id": enrollment.id, "course_id": course.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Certificate issued",
        enrollment_from_entity(enrollment),
        Some(Meta::empty()),
    )
    .revalidating(["/dashboard/certificates"]))
}

pub fn check_certificate_eligibility(
    enrollment: &EnrollmentModel,
    course: &CourseModel,
) -> AppResult<()> {
    if !course.certificate_enabled {
        return Err(AppError::bad_request(
            "Certificates are not enabled for this course",
        ));
    }
    if enrollment.progress < 100 {
        return Err(AppError::bad_request("Course is not completed yet"));
    }
    Ok(())
}

async fn enrollments_with_courses(
    state: &AppState,
    user_id: Uuid,
) -> AppResult<Vec<(EnrollmentModel, Option<CourseModel>)>> {
    Ok(Enrollments::find()
        .filter(EnrollmentCol::UserId.eq(user_id))
        .order_by_desc(EnrollmentCol::EnrolledAt)
        .find_also_related(Courses)
        .all(&state.orm)
        .await?)
}

fn with_course(rows: Vec<(EnrollmentModel, Option<CourseModel>)>) -> Vec<EnrollmentWithCourse> {
    rows.into_iter()
        .map(|(enrollment, course)| EnrollmentWithCourse {
            enrollment: enrollment_from_entity(enrollment),
            course: course.map(course_from_entity),
        })
        .collect()
}

pub async fn my_progress(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ProgressOverview>> {
    let rows = enrollments_with_courses(state, user.user_id).await?;
    let enrollments: Vec<&EnrollmentModel> = rows.iter().map(|(e, _)| e).collect();
    let overview = summarize_progress(&enrollments);

    Ok(ApiResponse::success(
        "Progress",
        ProgressOverview {
            courses: with_course(rows),
            ..overview
        },
        Some(Meta::empty()),
    ))
}

/// Counts and the rounded mean progress; the per-course list is left for the caller.
pub fn summarize_progress(enrollments: &[&EnrollmentModel]) -> ProgressOverview {
    let total = enrollments.len() as i64;
    let completed = enrollments.iter().filter(|e| e.progress == 100).count() as i64;
    let in_progress = enrollments
        .iter()
        .filter(|e| e.progress > 0 && e.progress < 100)
        .count() as i64;
    let sum: i64 = enrollments.iter().map(|e| e.progress as i64).sum();
    let average = if total > 0 {
        (sum as f64 / total as f64).round() as i64
    } else {
        0
    };

    ProgressOverview {
        total_courses: total,
        completed_courses: completed,
        in_progress_courses: in_progress,
        average_progress: average,
        courses: Vec::new(),
    }
}

pub async fn my_certificates(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CertificateOverview>> {
    let rows = Enrollments::find()
        .filter(EnrollmentCol::UserId.eq(user.user_id))
        .filter(EnrollmentCol::Progress.eq(100))
        // Progress set to 100 through update_enrollment may carry no completion date.
        .order_by_with_nulls(EnrollmentCol::CompletedAt, Order::Desc, NullOrdering::Last)
        .find_also_related(Courses)
        .all(&state.orm)
        .await?;

    let this_year = Utc::now().year();
    let certificates_this_year = rows
        .iter()
        .filter(|(e, _)| e.completed_at.is_some_and(|at| at.year() == this_year))
        .count() as i64;

    Ok(ApiResponse::success(
        "Certificates",
        CertificateOverview {
            total_certificates: rows.len() as i64,
            certificates_this_year,
            certificates: with_course(rows),
        },
        Some(Meta::empty()),
    ))
}

pub(crate) async fn enrollment_counts_by_course<C: ConnectionTrait>(
    db: &C,
    course_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, i64>> {
    if course_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Enrollments::find()
        .select_only()
        .column(EnrollmentCol::CourseId)
        .column_as(EnrollmentCol::Id.count(), "students")
        .filter(EnrollmentCol::CourseId.is_in(course_ids))
        .group_by(EnrollmentCol::CourseId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn enrollment(progress: i32) -> EnrollmentModel {
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap());
        EnrollmentModel {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: "active".into(),
            progress,
            enrolled_at: now,
            completed_at: None,
            last_accessed_at: None,
            certificate_issued: false,
            certificate_issued_at: None,
        }
    }

    #[test]
    fn progress_summary_rounds_average() {
        let rows = [enrollment(100), enrollment(33), enrollment(0)];
        let refs: Vec<&EnrollmentModel> = rows.iter().collect();
        let summary = summarize_progress(&refs);
        assert_eq!(summary.total_courses, 3);
        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.in_progress_courses, 1);
        assert_eq!(summary.average_progress, 44);
    }

    #[test]
    fn empty_progress_summary_is_zero() {
        let summary = summarize_progress(&[]);
        assert_eq!(summary.total_courses, 0);
        assert_eq!(summary.average_progress, 0);
    }

    #[test]
    fn progress_must_be_a_percentage() {
        assert!(validate_percentage(0).is_ok());
        assert!(validate_percentage(100).is_ok());
        assert!(validate_percentage(-1).is_err());
        assert!(validate_percentage(101).is_err());
    }
}
