#![allow(dead_code)]

use scaleup_academy::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    entity::{
        AuthUsers, Profiles,
        auth_users::ActiveModel as AuthUserActive,
        courses::{ActiveModel as CourseActive, Model as CourseModel},
        profiles::ActiveModel as ProfileActive,
    },
    middleware::auth::AuthUser,
    models::Role,
    services::auth_service::create_identity,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Database for integration tests, or `None` when none is configured.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    setup_state_with(AppConfig::for_database(database_url)).await
}

/// Tests share one database and never truncate it; every fixture uses fresh ids and emails.
pub async fn setup_state_with(config: AppConfig) -> anyhow::Result<AppState> {
    let pool = create_pool(&config.database_url).await?;
    let state = AppState::new(pool, config);
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&state.orm).await })
        .await?;
    Ok(state)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, role: Role, prefix: &str) -> anyhow::Result<AuthUser> {
    let email = unique_email(prefix);
    let (identity, _) = create_identity(
        &state.orm,
        &email,
        "password123",
        json!({ "full_name": prefix }),
        true,
        role,
    )
    .await?;

    Ok(AuthUser {
        user_id: identity.id,
        email: identity.email,
    })
}

pub async fn create_course(
    state: &AppState,
    owner: &AuthUser,
    published: bool,
) -> anyhow::Result<CourseModel> {
    let slug = format!("course-{}", Uuid::new_v4().simple());
    let course = CourseActive {
        id: Set(Uuid::new_v4()),
        slug: Set(slug),
        title: Set("Async Rust".into()),
        description: Set("Futures, executors and pinning".into()),
        short_description: Set(None),
        thumbnail_url: Set(None),
        category: Set("programming".into()),
        level: Set("intermediate".into()),
        language: Set("en".into()),
        visibility: Set("public".into()),
        published: Set(published),
        published_at: Set(None),
        enrollment_type: Set("open".into()),
        max_students: Set(None),
        pricing_type: Set("one-time".into()),
        price: Set(2500),
        currency: Set("EUR".into()),
        sale_price: Set(None),
        certificate_enabled: Set(true),
        completion_min_progress: Set(100),
        instructor_id: Set(owner.user_id),
        created_by: Set(owner.user_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(course)
}

/// Insert `count` confirmed students straight into the tables, skipping password hashing.
/// Rows are written in batches small enough for one statement each.
pub async fn create_students_in_bulk(state: &AppState, count: usize) -> anyhow::Result<Vec<Uuid>> {
    let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
    for chunk in ids.chunks(1000) {
        let identities: Vec<AuthUserActive> = chunk
            .iter()
            .map(|id| AuthUserActive {
                id: Set(*id),
                email: Set(format!("bulk-{}@example.com", id.simple())),
                password_hash: Set("not-a-hash".into()),
                email_confirmed_at: Set(Some(chrono::Utc::now().into())),
                confirmation_code: Set(None),
                recovery_code: Set(None),
                recovery_sent_at: Set(None),
                user_metadata: Set(json!({})),
                created_at: NotSet,
                updated_at: NotSet,
            })
            .collect();
        AuthUsers::insert_many(identities).exec(&state.orm).await?;

        let profiles: Vec<ProfileActive> = chunk
            .iter()
            .map(|id| ProfileActive {
                id: Set(*id),
                email: Set(format!("bulk-{}@example.com", id.simple())),
                full_name: Set(None),
                avatar_url: Set(None),
                bio: Set(None),
                role: Set(Role::Student.as_str().to_string()),
                created_at: NotSet,
                updated_at: NotSet,
            })
            .collect();
        Profiles::insert_many(profiles).exec(&state.orm).await?;
    }
    Ok(ids)
}
