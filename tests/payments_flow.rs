mod common;

use scaleup_academy::{
    dto::dashboard::Dashboard,
    entity::{Enrollments, enrollments::Column as EnrollmentCol},
    error::AppError,
    models::{PaymentStatus, Role},
    services::{dashboard_service, enrollment_service, payment_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn succeeded_payment_enrolls_payer_once() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let admin = common::create_user(&state, Role::Admin, "admin").await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    let first = payment_service::create_payment(&state, &student, course.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(first.status, "pending");
    assert_eq!(first.amount, course.price);

    let err = payment_service::update_payment_status(&state, &student, first.id, PaymentStatus::Succeeded)
        .await
        .expect_err("only admins settle payments");
    assert!(matches!(err, AppError::Forbidden(_)));

    payment_service::update_payment_status(&state, &admin, first.id, PaymentStatus::Succeeded).await?;

    let second = payment_service::create_payment(&state, &student, course.id)
        .await?
        .data
        .expect("payment");
    let settled = payment_service::update_payment_status(&state, &admin, second.id, PaymentStatus::Succeeded)
        .await?
        .data
        .expect("payment");
    assert_eq!(settled.status, "succeeded");

    let enrollments = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(course.id))
        .filter(EnrollmentCol::UserId.eq(student.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(enrollments, 1);
    Ok(())
}

#[tokio::test]
async fn failed_payment_does_not_enroll() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let admin = common::create_user(&state, Role::Admin, "admin").await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    let payment = payment_service::create_payment(&state, &student, course.id)
        .await?
        .data
        .expect("payment");
    payment_service::update_payment_status(&state, &admin, payment.id, PaymentStatus::Failed).await?;

    let enrollments = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(course.id))
        .count(&state.orm)
        .await?;
    assert_eq!(enrollments, 0);
    Ok(())
}

#[tokio::test]
async fn dashboards_follow_role_and_sum_succeeded_revenue() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let admin = common::create_user(&state, Role::Admin, "admin").await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let course = common::create_course(&state, &instructor, true).await?;
    let quiet = common::create_course(&state, &instructor, false).await?;

    for status in [PaymentStatus::Succeeded, PaymentStatus::Succeeded, PaymentStatus::Failed] {
        let payment = payment_service::create_payment(&state, &student, course.id)
            .await?
            .data
            .expect("payment");
        payment_service::update_payment_status(&state, &admin, payment.id, status).await?;
    }

    let view = dashboard_service::get_dashboard(&state, &instructor)
        .await?
        .data
        .expect("dashboard");
    let Dashboard::Instructor(dashboard) = view.dashboard else {
        panic!("instructors get the instructor dashboard");
    };
    assert_eq!(dashboard.courses.len(), 2);
    assert_eq!(dashboard.total_students, 1);
    assert_eq!(dashboard.total_revenue, 2 * course.price);
    let paid = dashboard.courses.iter().find(|c| c.id == course.id).expect("course stats");
    assert_eq!(paid.students, 1);
    assert_eq!(paid.revenue, 2 * course.price);
    let unpaid = dashboard.courses.iter().find(|c| c.id == quiet.id).expect("course stats");
    assert_eq!(unpaid.students, 0);
    assert_eq!(unpaid.revenue, 0);

    let view = dashboard_service::get_dashboard(&state, &admin)
        .await?
        .data
        .expect("dashboard");
    let Dashboard::Admin(dashboard) = view.dashboard else {
        panic!("admins get the admin dashboard");
    };
    assert!(dashboard.total_revenue >= 2 * course.price);
    assert!(dashboard.total_users >= 3);
    assert!(dashboard.total_courses >= 2);

    let view = dashboard_service::get_dashboard(&state, &student)
        .await?
        .data
        .expect("dashboard");
    assert_eq!(view.user_name, "student");
    let Dashboard::Student(dashboard) = view.dashboard else {
        panic!("students get the student dashboard");
    };
    assert_eq!(dashboard.completed_courses, 0);
    assert_eq!(dashboard.courses_in_progress.len(), 1);
    assert_eq!(dashboard.courses_in_progress[0].id, course.id);

    let enrollment = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(course.id))
        .filter(EnrollmentCol::UserId.eq(student.user_id))
        .one(&state.orm)
        .await?
        .expect("enrollment");
    enrollment_service::update_progress(&state, &student, enrollment.id, 100).await?;

    let view = dashboard_service::get_dashboard(&state, &student)
        .await?
        .data
        .expect("dashboard");
    let Dashboard::Student(dashboard) = view.dashboard else {
        panic!("students get the student dashboard");
    };
    assert_eq!(dashboard.completed_courses, 1);
    assert!(dashboard.courses_in_progress.is_empty());
    Ok(())
}
