use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    authz::load_profile,
    dto::dashboard::{
        AdminDashboard, CourseProgress, Dashboard, DashboardView, InstructorCourseStats,
        InstructorDashboard, StudentDashboard,
    },
    entity::{
        courses::{Column as CourseCol, Entity as Courses},
        enrollments::{Column as EnrollmentCol, Entity as Enrollments},
        payments::{Column as PaymentCol, Entity as Payments},
        profiles::{Column as ProfileCol, Entity as Profiles},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{EnrollmentStatus, PaymentStatus, Role},
    response::{ApiResponse, Meta},
    services::enrollment_service::enrollment_counts_by_course,
    state::AppState,
};

pub async fn get_dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardView>> {
    let profile = load_profile(&state.orm, user).await?;
    let user_name = profile
        .full_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| profile.email.clone());

    let dashboard = match Role::from_db(&profile.role) {
        Role::Admin => Dashboard::Admin(admin_dashboard(&state.orm).await?),
        Role::Instructor => Dashboard::Instructor(instructor_dashboard(&state.orm, user.user_id).await?),
        Role::Student => Dashboard::Student(student_dashboard(&state.orm, user.user_id).await?),
    };

    Ok(ApiResponse::success(
        "Dashboard",
        DashboardView {
            user_name,
            dashboard,
        },
        Some(Meta::empty()),
    ))
}

/// `SUM(amount)` cast back to BIGINT; Postgres sums BIGINT into NUMERIC.
fn revenue_sum() -> SimpleExpr {
    SimpleExpr::FunctionCall(Func::cast_as(
        Func::sum(Expr::col(PaymentCol::Amount)),
        Alias::new("BIGINT"),
    ))
}

async fn total_revenue<C: ConnectionTrait>(db: &C) -> AppResult<i64> {
    let total = Payments::find()
        .select_only()
        .column_as(revenue_sum(), "total")
        .filter(PaymentCol::Status.eq(PaymentStatus::Succeeded.as_str()))
        .into_tuple::<Option<i64>>()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

async fn revenue_by_course<C: ConnectionTrait>(
    db: &C,
    course_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, i64>> {
    if course_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Payments::find()
        .select_only()
        .column(PaymentCol::CourseId)
        .column_as(revenue_sum(), "total")
        .filter(PaymentCol::Status.eq(PaymentStatus::Succeeded.as_str()))
        .filter(PaymentCol::CourseId.is_in(course_ids))
        .group_by(PaymentCol::CourseId)
        .into_tuple::<(Uuid, i64)>()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);
    midnight.fixed_offset()
}

/// Percentage of completed enrollments, 0 when there are none.
pub fn completion_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

async fn admin_dashboard<C: ConnectionTrait>(db: &C) -> AppResult<AdminDashboard> {
    let total_users = Profiles::find().count(db).await?;
    let total_courses = Courses::find().count(db).await?;
    let new_users_today = Profiles::find()
        .filter(ProfileCol::CreatedAt.gte(start_of_day(Utc::now())))
        .count(db)
        .await?;

    let total_enrollments = Enrollments::find().count(db).await?;
    let completed_enrollments = Enrollments::find()
        .filter(EnrollmentCol::Status.eq(EnrollmentStatus::Completed.as_str()))
        .count(db)
        .await?;

    let total_revenue = total_revenue(db).await?;

    Ok(AdminDashboard {
        total_users: total_users as i64,
        total_courses: total_courses as i64,
        total_revenue,
        new_users_today: new_users_today as i64,
        course_completion_rate: completion_rate(completed_enrollments, total_enrollments),
        active_users: 0,
        revenue_growth: 0.0,
        user_growth: 0.0,
    })
}

async fn instructor_dashboard<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<InstructorDashboard> {
    let courses = Courses::find()
        .filter(CourseCol::InstructorId.eq(user_id))
        .order_by_desc(CourseCol::CreatedAt)
        .all(db)
        .await?;
    let ids: Vec<Uuid> = courses.iter().map(|c| c.id).collect();

    let students = enrollment_counts_by_course(db, ids.clone()).await?;
    let revenue = revenue_by_course(db, ids).await?;

    let courses: Vec<InstructorCourseStats> = courses
        .into_iter()
        .map(|c| InstructorCourseStats {
            students: students.get(&c.id).copied().unwrap_or(0),
            revenue: revenue.get(&c.id).copied().unwrap_or(0),
            id: c.id,
            title: c.title,
            published: c.published,
        })
        .collect();

    Ok(InstructorDashboard {
        total_students: courses.iter().map(|c| c.students).sum(),
        total_revenue: courses.iter().map(|c| c.revenue).sum(),
        courses,
        average_rating: 0.0,
    })
}

async fn student_dashboard<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<StudentDashboard> {
    let rows = Enrollments::find()
        .filter(EnrollmentCol::UserId.eq(user_id))
        .order_by_desc(EnrollmentCol::LastAccessedAt)
        .find_also_related(Courses)
        .all(db)
        .await?;

    let completed_courses = rows.iter().filter(|(e, _)| e.progress == 100).count() as i64;
    let certificates = rows.iter().filter(|(e, _)| e.certificate_issued).count() as i64;
    let courses_in_progress = rows
        .into_iter()
        .filter(|(e, _)| e.progress < 100)
        .filter_map(|(e, course)| {
            course.map(|c| CourseProgress {
                id: c.id,
                title: c.title,
                progress: e.progress,
            })
        })
        .collect();

    Ok(StudentDashboard {
        courses_in_progress,
        completed_courses,
        certificates,
    })
}
