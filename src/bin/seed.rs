use anyhow::Context;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;
use uuid::Uuid;

use scaleup_academy::{
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        Courses, Profiles,
        courses::{ActiveModel as CourseActive, Column as CourseCol},
        lessons::ActiveModel as LessonActive,
        modules::ActiveModel as ModuleActive,
        profiles::Column as ProfileCol,
    },
    models::{LessonType, Role},
    services::auth_service::create_identity,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin123", "Ada Admin", Role::Admin).await?;
    let instructor_id = ensure_user(
        &orm,
        "instructor@example.com",
        "instructor123",
        "Ivan Instructor",
        Role::Instructor,
    )
    .await?;
    let student_id = ensure_user(&orm, "student@example.com", "student123", "Sam Student", Role::Student).await?;
    seed_course(&orm, instructor_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Instructor ID: {instructor_id}, Student ID: {student_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let existing = Profiles::find()
        .filter(ProfileCol::Email.eq(email))
        .one(orm)
        .await?;
    if let Some(profile) = existing {
        println!("User {email} already present (role={})", profile.role);
        return Ok(profile.id);
    }

    let (identity, _) = create_identity(
        orm,
        email,
        password,
        json!({ "full_name": full_name }),
        true,
        role,
    )
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(identity.id)
}

async fn seed_course(orm: &OrmConn, instructor_id: Uuid) -> anyhow::Result<()> {
    let slug = "rust-foundations";
    if Courses::find()
        .filter(CourseCol::Slug.eq(slug))
        .one(orm)
        .await?
        .is_some()
    {
        println!("Sample course already present");
        return Ok(());
    }

    let course = CourseActive {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.to_string()),
        title: Set("Rust Foundations".to_string()),
        description: Set("Ownership, borrowing and the type system from first principles.".to_string()),
        short_description: Set(Some("Learn the core of Rust".to_string())),
        thumbnail_url: Set(None),
        category: Set("programming".to_string()),
        level: Set("beginner".to_string()),
        language: Set("en".to_string()),
        visibility: Set("public".to_string()),
        published: Set(true),
        published_at: Set(Some(chrono::Utc::now().into())),
        enrollment_type: Set("open".to_string()),
        max_students: Set(None),
        pricing_type: Set("one-time".to_string()),
        price: Set(4900),
        currency: Set("EUR".to_string()),
        sale_price: Set(None),
        certificate_enabled: Set(true),
        completion_min_progress: Set(100),
        instructor_id: Set(instructor_id),
        created_by: Set(instructor_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    let curriculum = [
        (
            "Getting started",
            vec![("Installing the toolchain", LessonType::Video), ("Hello, Cargo", LessonType::Text)],
        ),
        (
            "Ownership",
            vec![
                ("Moves and copies", LessonType::Video),
                ("Borrowing rules", LessonType::Text),
                ("Ownership quiz", LessonType::Quiz),
            ],
        ),
    ];

    for (module_pos, (title, lessons)) in curriculum.into_iter().enumerate() {
        let module = ModuleActive {
            id: Set(Uuid::new_v4()),
            course_id: Set(course.id),
            title: Set(title.to_string()),
            description: Set(None),
            order_index: Set(module_pos as i32 + 1),
            published: Set(true),
            duration_minutes: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;

        for (lesson_pos, (lesson_title, lesson_type)) in lessons.into_iter().enumerate() {
            LessonActive {
                id: Set(Uuid::new_v4()),
                module_id: Set(module.id),
                title: Set(lesson_title.to_string()),
                description: Set(None),
                lesson_type: Set(lesson_type.as_str().to_string()),
                content: Set(None),
                duration_minutes: Set(Some(10)),
                published: Set(true),
                order_index: Set(lesson_pos as i32 + 1),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(orm)
            .await?;
        }
    }

    println!("Seeded course {slug}");
    Ok(())
}
