mod common;

use scaleup_academy::{
    dto::{
        courses::{CreateCourseRequest, UpdateCourseRequest},
        curriculum::{CreateLessonRequest, CreateModuleRequest},
        enrollments::UpdateEnrollmentRequest,
    },
    entity::{
        Courses, Enrollments, Lessons, Modules, courses::Column as CourseCol,
        enrollments::Column as EnrollmentCol, lessons::Column as LessonCol, modules::Column as ModuleCol,
    },
    error::AppError,
    models::{CourseLevel, EnrollmentStatus, EnrollmentType, LessonType, PricingType, Role, Visibility},
    services::{course_service, curriculum_service, enrollment_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

fn course_request(slug: &str) -> CreateCourseRequest {
    CreateCourseRequest {
        title: "Systems Programming".into(),
        slug: slug.into(),
        description: "Memory, threads and IO".into(),
        short_description: None,
        thumbnail_url: None,
        category: "programming".into(),
        level: CourseLevel::Advanced,
        language: "en".into(),
        visibility: Visibility::Public,
        published: false,
        enrollment_type: EnrollmentType::Open,
        max_students: None,
        pricing_type: PricingType::Free,
        price: None,
        currency: None,
        sale_price: None,
        certificate_enabled: None,
        completion_min_progress: None,
    }
}

fn module_request(title: &str, order_index: i32) -> CreateModuleRequest {
    CreateModuleRequest {
        title: title.into(),
        description: None,
        order_index,
        published: true,
        duration_minutes: None,
    }
}

fn lesson_request(title: &str, order_index: i32) -> CreateLessonRequest {
    CreateLessonRequest {
        title: title.into(),
        description: None,
        lesson_type: LessonType::Text,
        content: None,
        duration_minutes: Some(5),
        published: true,
        order_index,
    }
}

#[tokio::test]
async fn student_cannot_create_course() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let student = common::create_user(&state, Role::Student, "student").await?;

    let slug = format!("forbidden-{}", Uuid::new_v4().simple());
    let err = course_service::create_course(&state, &student, course_request(&slug))
        .await
        .expect_err("students must not create courses");
    assert!(matches!(err, AppError::Forbidden(_)));

    let stored = Courses::find()
        .filter(CourseCol::Slug.eq(slug.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(stored, 0);
    Ok(())
}

#[tokio::test]
async fn instructor_creates_course_with_defaults() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;

    let slug = format!("systems-{}", Uuid::new_v4().simple());
    let resp = course_service::create_course(&state, &instructor, course_request(&slug)).await?;
    let revalidate = resp.revalidate.clone().unwrap_or_default();
    let course = resp.data.expect("course");

    assert_eq!(course.instructor_id, instructor.user_id);
    assert_eq!(course.currency, "EUR");
    assert_eq!(course.completion_min_progress, 100);
    assert!(course.certificate_enabled);
    assert!(revalidate.contains(&format!("/courses/{slug}")));
    Ok(())
}

#[tokio::test]
async fn duplicate_copies_curriculum_unpublished() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    let first = curriculum_service::create_module(&state, &instructor, course.id, module_request("Intro", 1))
        .await?
        .data
        .expect("module");
    let second = curriculum_service::create_module(&state, &instructor, course.id, module_request("Deep dive", 2))
        .await?
        .data
        .expect("module");
    curriculum_service::create_lesson(&state, &instructor, first.id, lesson_request("Welcome", 1)).await?;
    curriculum_service::create_lesson(&state, &instructor, first.id, lesson_request("Setup", 2)).await?;
    curriculum_service::create_lesson(&state, &instructor, second.id, lesson_request("Internals", 1)).await?;

    let copy = course_service::duplicate_course(&state, &instructor, course.id)
        .await?
        .data
        .expect("copy");

    assert_ne!(copy.id, course.id);
    assert_eq!(copy.title, format!("{} (Copy)", course.title));
    assert!(copy.slug.starts_with(&format!("{}-copy-", course.slug)));
    assert!(!copy.published);

    let copied_modules = Modules::find()
        .filter(ModuleCol::CourseId.eq(copy.id))
        .order_by_asc(ModuleCol::OrderIndex)
        .all(&state.orm)
        .await?;
    assert_eq!(copied_modules.len(), 2);
    assert_eq!(copied_modules[0].title, "Intro");
    assert!(copied_modules.iter().all(|m| !m.published));

    let module_ids: Vec<Uuid> = copied_modules.iter().map(|m| m.id).collect();
    let copied_lessons = Lessons::find()
        .filter(LessonCol::ModuleId.is_in(module_ids))
        .all(&state.orm)
        .await?;
    assert_eq!(copied_lessons.len(), 3);
    assert!(copied_lessons.iter().all(|l| !l.published));
    Ok(())
}

#[tokio::test]
async fn reorder_modules_follows_submitted_order() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, false).await?;

    let mut ids = Vec::new();
    for (pos, title) in ["A", "B", "C"].into_iter().enumerate() {
        let module = curriculum_service::create_module(
            &state,
            &instructor,
            course.id,
            module_request(title, pos as i32 + 1),
        )
        .await?
        .data
        .expect("module");
        ids.push(module.id);
    }
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    let result = curriculum_service::reorder_modules(&state, &instructor, course.id, vec![c, a, b])
        .await?
        .data
        .expect("reorder result");
    assert_eq!(result.updated.len(), 3);
    assert!(result.failed.is_empty());

    let ordered: Vec<Uuid> = Modules::find()
        .filter(ModuleCol::CourseId.eq(course.id))
        .order_by_asc(ModuleCol::OrderIndex)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ordered, vec![c, a, b]);
    Ok(())
}

#[tokio::test]
async fn reorder_with_unknown_id_is_partial() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, false).await?;

    let module = curriculum_service::create_module(&state, &instructor, course.id, module_request("Only", 5))
        .await?
        .data
        .expect("module");
    let missing = Uuid::new_v4();

    let result = curriculum_service::reorder_modules(&state, &instructor, course.id, vec![missing, module.id])
        .await?
        .data
        .expect("reorder result");
    assert_eq!(result.updated, vec![module.id]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].id, missing);

    let stored = Modules::find_by_id(module.id).one(&state.orm).await?.expect("module");
    assert_eq!(stored.order_index, 2);
    Ok(())
}

#[tokio::test]
async fn enrollment_rules_and_analytics() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    let analytics = course_service::get_course_analytics(&state, &instructor, course.id)
        .await?
        .data
        .expect("analytics");
    assert_eq!(analytics.total_enrollments, 0);
    assert_eq!(analytics.average_progress, 0.0);
    assert_eq!(analytics.completion_rate, 0.0);

    let enrollment = enrollment_service::enroll_student(&state, &student, course.id, student.user_id)
        .await?
        .data
        .expect("enrollment");
    assert_eq!(enrollment.status, "active");
    assert_eq!(enrollment.progress, 0);

    let err = enrollment_service::enroll_student(&state, &student, course.id, student.user_id)
        .await
        .expect_err("second enrollment must conflict");
    assert!(matches!(err, AppError::Conflict(_)));

    let done = enrollment_service::update_progress(&state, &student, enrollment.id, 100)
        .await?
        .data
        .expect("enrollment");
    assert_eq!(done.status, "completed");
    assert!(done.completed_at.is_some());

    let certified = enrollment_service::issue_certificate(&state, &student, enrollment.id)
        .await?
        .data
        .expect("enrollment");
    assert!(certified.certificate_issued);

    let analytics = course_service::get_course_analytics(&state, &instructor, course.id)
        .await?
        .data
        .expect("analytics");
    assert_eq!(analytics.total_enrollments, 1);
    assert_eq!(analytics.completed_enrollments, 1);
    assert_eq!(analytics.completion_rate, 100.0);
    assert_eq!(analytics.revenue, course.price);
    Ok(())
}

#[tokio::test]
async fn student_cannot_enroll_in_unpublished_course() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let course = common::create_course(&state, &instructor, false).await?;

    let err = enrollment_service::enroll_student(&state, &student, course.id, student.user_id)
        .await
        .expect_err("draft courses are closed to self enrollment");
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = enrollment_service::bulk_enroll_students(&state, &instructor, course.id, Vec::new())
        .await
        .expect_err("empty bulk enroll");
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn bulk_enroll_splits_large_batches() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    // More rows than a single nine-column insert can bind.
    let students = common::create_students_in_bulk(&state, 7500).await?;
    let enrolled = enrollment_service::bulk_enroll_students(&state, &instructor, course.id, students.clone())
        .await?
        .data
        .expect("enrollments");
    assert_eq!(enrolled.items.len(), students.len());

    let stored = Enrollments::find()
        .filter(EnrollmentCol::CourseId.eq(course.id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored, students.len() as u64);
    Ok(())
}

#[tokio::test]
async fn partial_pricing_update_is_checked_against_stored_values() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, false).await?;

    // The stored price of 2500 still applies when only the pricing type changes.
    let switched = course_service::update_course(
        &state,
        &instructor,
        course.id,
        UpdateCourseRequest {
            pricing_type: Some(PricingType::Subscription),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("course");
    assert_eq!(switched.pricing_type, "subscription");
    assert_eq!(switched.price, 2500);

    let err = course_service::update_course(
        &state,
        &instructor,
        course.id,
        UpdateCourseRequest {
            price: Some(0),
            ..Default::default()
        },
    )
    .await
    .expect_err("a paid course cannot drop to a zero price");
    assert!(matches!(err, AppError::BadRequest(_)));

    let stored = Courses::find_by_id(course.id).one(&state.orm).await?.expect("course");
    assert_eq!(stored.price, 2500);

    let free = course_service::update_course(
        &state,
        &instructor,
        course.id,
        UpdateCourseRequest {
            pricing_type: Some(PricingType::Free),
            price: Some(0),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("course");
    assert_eq!(free.price, 0);
    Ok(())
}

#[tokio::test]
async fn lesson_copy_into_missing_module_is_skipped() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, false).await?;

    let module = curriculum_service::create_module(&state, &instructor, course.id, module_request("Intro", 1))
        .await?
        .data
        .expect("module");
    curriculum_service::create_lesson(&state, &instructor, module.id, lesson_request("Welcome", 1)).await?;
    curriculum_service::create_lesson(&state, &instructor, module.id, lesson_request("Setup", 2)).await?;

    let copied = course_service::copy_lessons(&state.orm, module.id, Uuid::new_v4()).await?;
    assert_eq!(copied, 0);

    let target = curriculum_service::create_module(&state, &instructor, course.id, module_request("Copy", 2))
        .await?
        .data
        .expect("module");
    let copied = course_service::copy_lessons(&state.orm, module.id, target.id).await?;
    assert_eq!(copied, 2);
    Ok(())
}

#[tokio::test]
async fn publish_stamps_and_unpublish_clears_date() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let course = common::create_course(&state, &instructor, false).await?;

    let published = course_service::publish_course(&state, &instructor, course.id)
        .await?
        .data
        .expect("course");
    assert!(published.published);
    assert!(published.published_at.is_some());

    let unpublished = course_service::unpublish_course(&state, &instructor, course.id)
        .await?
        .data
        .expect("course");
    assert!(!unpublished.published);
    assert!(unpublished.published_at.is_none());
    Ok(())
}

#[tokio::test]
async fn manager_can_move_completed_enrollment_back_to_pending() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    let enrollment = enrollment_service::enroll_student(&state, &student, course.id, student.user_id)
        .await?
        .data
        .expect("enrollment");
    enrollment_service::update_progress(&state, &student, enrollment.id, 100).await?;

    let reverted = enrollment_service::update_enrollment(
        &state,
        &instructor,
        enrollment.id,
        UpdateEnrollmentRequest {
            status: Some(EnrollmentStatus::Pending),
            progress: Some(40),
            completed_at: None,
        },
    )
    .await?
    .data
    .expect("enrollment");
    assert_eq!(reverted.status, "pending");
    assert_eq!(reverted.progress, 40);

    let err = enrollment_service::update_enrollment(
        &state,
        &student,
        enrollment.id,
        UpdateEnrollmentRequest::default(),
    )
    .await
    .expect_err("students cannot edit enrollments directly");
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn only_the_student_or_a_manager_can_unenroll() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let other = common::create_user(&state, Role::Student, "other").await?;
    let course = common::create_course(&state, &instructor, true).await?;

    let enrollment = enrollment_service::enroll_student(&state, &student, course.id, student.user_id)
        .await?
        .data
        .expect("enrollment");

    let err = enrollment_service::unenroll_student(&state, &other, enrollment.id)
        .await
        .expect_err("another student cannot unenroll");
    assert!(matches!(err, AppError::Forbidden(_)));

    enrollment_service::unenroll_student(&state, &student, enrollment.id).await?;
    let remaining = Enrollments::find_by_id(enrollment.id).one(&state.orm).await?;
    assert!(remaining.is_none());

    let again = enrollment_service::enroll_student(&state, &student, course.id, student.user_id)
        .await?
        .data
        .expect("enrollment");
    enrollment_service::unenroll_student(&state, &instructor, again.id).await?;
    let remaining = Enrollments::find_by_id(again.id).one(&state.orm).await?;
    assert!(remaining.is_none());
    Ok(())
}

#[tokio::test]
async fn certificates_without_completion_date_sort_last() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let instructor = common::create_user(&state, Role::Instructor, "instructor").await?;
    let student = common::create_user(&state, Role::Student, "student").await?;
    let undated_course = common::create_course(&state, &instructor, true).await?;
    let dated_course = common::create_course(&state, &instructor, true).await?;

    let undated = enrollment_service::enroll_student(&state, &student, undated_course.id, student.user_id)
        .await?
        .data
        .expect("enrollment");
    enrollment_service::update_enrollment(
        &state,
        &instructor,
        undated.id,
        UpdateEnrollmentRequest {
            progress: Some(100),
            ..Default::default()
        },
    )
    .await?;

    let dated = enrollment_service::enroll_student(&state, &student, dated_course.id, student.user_id)
        .await?
        .data
        .expect("enrollment");
    enrollment_service::update_progress(&state, &student, dated.id, 100).await?;

    let overview = enrollment_service::my_certificates(&state, &student)
        .await?
        .data
        .expect("certificates");
    assert_eq!(overview.total_certificates, 2);
    assert_eq!(overview.certificates_this_year, 1);
    assert_eq!(overview.certificates[0].enrollment.id, dated.id);
    assert_eq!(overview.certificates[1].enrollment.id, undated.id);
    assert!(overview.certificates[1].enrollment.completed_at.is_none());
    Ok(())
}
