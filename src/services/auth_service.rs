use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{
        ChangePasswordRequest, Claims, LoginRequest, ResetPasswordRequest, Session, SessionUser,
        SignupRequest,
    },
    entity::{
        auth_users::{self, ActiveModel as AuthUserActive, Entity as AuthUsers},
        profiles::{ActiveModel as ProfileActive, Entity as Profiles, Model as ProfileModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Identity, Role},
    response::{ApiResponse, Meta},
    services::mapping::{identity_from_entity, profile_from_entity},
    state::AppState,
};

pub const ALREADY_REGISTERED: &str = "A user with this email address has already been registered";

/// How long a recovery code stays redeemable.
pub const RECOVERY_CODE_TTL_MINUTES: i64 = 60;

const RECOVERY_SENT: &str = "If the email is registered, a password reset link has been sent";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, email: &str) -> AppResult<(String, DateTime<Utc>)> {
    let expires_at = Duration::try_hours(config.jwt_ttl_hours)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((token, expires_at))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Display name for a new profile: metadata `full_name`, else the email's local part.
pub fn display_name(metadata: &Value, email: &str) -> String {
    metadata
        .get("full_name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
}

fn validate_credentials(email: &str, password: &str) -> AppResult<()> {
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::bad_request("Invalid email address"));
    }
    validate_password(password)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 6 {
        return Err(AppError::bad_request(
            "Password should be at least 6 characters",
        ));
    }
    Ok(())
}

/// Insert an identity and its profile. Used by signup, the admin API and tooling.
pub async fn create_identity<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
    metadata: Value,
    confirmed: bool,
    role: Role,
) -> AppResult<(auth_users::Model, ProfileModel)> {
    let email = normalize_email(email);
    validate_credentials(&email, password)?;

    let exists = AuthUsers::find()
        .filter(auth_users::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(ALREADY_REGISTERED.into()));
    }

    let password_hash = hash_password(password)?;
    let now = Utc::now();
    let id = Uuid::new_v4();
    let full_name = display_name(&metadata, &email);

    let identity = AuthUserActive {
        id: Set(id),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        email_confirmed_at: Set(confirmed.then(|| now.into())),
        confirmation_code: Set((!confirmed).then(|| Uuid::new_v4().simple().to_string())),
        recovery_code: Set(None),
        recovery_sent_at: Set(None),
        user_metadata: Set(metadata),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(db)
    .await?;

    let profile = ProfileActive {
        id: Set(id),
        email: Set(email),
        full_name: Set(Some(full_name)),
        avatar_url: Set(None),
        bio: Set(None),
        role: Set(role.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(db)
    .await?;

    Ok((identity, profile))
}

pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<ApiResponse<Identity>> {
    let SignupRequest {
        email,
        password,
        full_name,
    } = payload;
    let metadata = match full_name {
        Some(name) => json!({ "full_name": name }),
        None => json!({}),
    };
    let confirmed = !state.config.require_email_confirmation;

    let txn = state.orm.begin().await?;
    let (identity, _profile) =
        create_identity(&txn, &email, &password, metadata, confirmed, Role::Student).await?;
    txn.commit().await?;

    if let Some(code) = identity.confirmation_code.as_deref() {
        // No mailer: the link is only logged.
        tracing::info!(
            user_id = %identity.id,
            link = %format!("{}/auth/callback?code={}", state.config.public_url, code),
            "confirmation link issued"
        );
    }

    audit::record(
        &state.pool,
        Some(identity.id),
        "user_signup",
        "auth_users",
        json!({ "user_id": identity.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        identity_from_entity(identity),
        Some(Meta::empty()),
    ))
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<Session>> {
    let email = normalize_email(&payload.email);
    let identity = AuthUsers::find()
        .filter(auth_users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let identity = match identity {
        Some(u) => u,
        None => return Err(AppError::bad_request("Invalid email or password")),
    };

    if !verify_password(&payload.password, &identity.password_hash)? {
        return Err(AppError::bad_request("Invalid email or password"));
    }

    if state.config.require_email_confirmation && identity.email_confirmed_at.is_none() {
        return Err(AppError::bad_request("Email not confirmed"));
    }

    let (token, expires_at) = issue_token(&state.config, identity.id, &identity.email)?;

    audit::record(
        &state.pool,
        Some(identity.id),
        "user_login",
        "auth_users",
        json!({ "user_id": identity.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        Session {
            access_token: token,
            token_type: "bearer".into(),
            expires_at,
            user: identity_from_entity(identity),
        },
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SessionUser>> {
    let identity = AuthUsers::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let profile = Profiles::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .map(profile_from_entity);

    Ok(ApiResponse::success(
        "Current user",
        SessionUser {
            identity: identity_from_entity(identity),
            profile,
        },
        Some(Meta::empty()),
    ))
}

/// Redeem a confirmation code: confirm the email and make sure a profile exists.
pub async fn exchange_code(state: &AppState, code: &str) -> AppResult<Identity> {
    let txn = state.orm.begin().await?;

    let identity = AuthUsers::find()
        .filter(auth_users::Column::ConfirmationCode.eq(code))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Invalid or expired code"))?;

    let mut active: AuthUserActive = identity.into();
    active.email_confirmed_at = Set(Some(Utc::now().into()));
    active.confirmation_code = Set(None);
    active.updated_at = Set(Utc::now().into());
    let identity = active.update(&txn).await?;

    let profile = Profiles::find_by_id(identity.id).one(&txn).await?;
    if profile.is_none() {
        ProfileActive {
            id: Set(identity.id),
            email: Set(identity.email.clone()),
            full_name: Set(Some(display_name(&identity.user_metadata, &identity.email))),
            avatar_url: Set(None),
            bio: Set(None),
            role: Set(Role::Student.as_str().to_string()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;
        tracing::info!(user_id = %identity.id, "profile created on first sign-in");
    }

    txn.commit().await?;
    Ok(identity_from_entity(identity))
}

/// Issue a recovery code for `email` and log the reset link. The answer is the same
/// whether or not the email is registered.
pub async fn forgot_password(state: &AppState, email: &str) -> AppResult<ApiResponse<Value>> {
    let email = normalize_email(email);
    let identity = AuthUsers::find()
        .filter(auth_users::Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let Some(identity) = identity else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(ApiResponse::success(RECOVERY_SENT, json!({ "sent": true }), Some(Meta::empty())));
    };

    let code = Uuid::new_v4().simple().to_string();
    let user_id = identity.id;
    let mut active: AuthUserActive = identity.into();
    active.recovery_code = Set(Some(code.clone()));
    active.recovery_sent_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    // No mailer: the link is only logged.
    tracing::info!(
        %user_id,
        link = %format!("{}/auth/reset-password?code={}", state.config.public_url, code),
        "password reset link issued"
    );

    audit::record(
        &state.pool,
        Some(user_id),
        "password_reset_request",
        "auth_users",
        json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(RECOVERY_SENT, json!({ "sent": true }), Some(Meta::empty())))
}

/// Redeem a recovery code: set the new password and clear the code. Following the link
/// also proves ownership of the mailbox, so the email counts as confirmed.
pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<Identity>> {
    validate_password(&payload.password)?;

    let identity = AuthUsers::find()
        .filter(auth_users::Column::RecoveryCode.eq(payload.code.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Invalid or expired code"))?;

    let now = Utc::now();
    if !recovery_code_is_fresh(identity.recovery_sent_at.map(|at| at.with_timezone(&Utc)), now) {
        return Err(AppError::not_found("Invalid or expired code"));
    }

    let password_hash = hash_password(&payload.password)?;
    let confirmed_at = identity.email_confirmed_at.unwrap_or_else(|| now.into());
    let mut active: AuthUserActive = identity.into();
    active.password_hash = Set(password_hash);
    active.recovery_code = Set(None);
    active.recovery_sent_at = Set(None);
    active.email_confirmed_at = Set(Some(confirmed_at));
    active.confirmation_code = Set(None);
    active.updated_at = Set(now.into());
    let identity = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(identity.id),
        "password_reset",
        "auth_users",
        json!({ "user_id": identity.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        identity_from_entity(identity),
        Some(Meta::empty()),
    ))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<Identity>> {
    validate_password(&payload.new_password)?;

    let identity = AuthUsers::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !verify_password(&payload.current_password, &identity.password_hash)? {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password)?;
    let mut active: AuthUserActive = identity.into();
    active.password_hash = Set(password_hash);
    active.recovery_code = Set(None);
    active.recovery_sent_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    let identity = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(identity.id),
        "password_change",
        "auth_users",
        json!({ "user_id": identity.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        identity_from_entity(identity),
        Some(Meta::empty()),
    ))
}

pub fn recovery_code_is_fresh(sent_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    sent_at.is_some_and(|sent| now - sent <= Duration::minutes(RECOVERY_CODE_TTL_MINUTES))
}

/// Only same-origin absolute paths are honoured as post-login targets.
pub fn safe_next_path(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/dashboard",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_metadata() {
        let meta = json!({ "full_name": "Ada Lovelace" });
        assert_eq!(display_name(&meta, "ada@example.com"), "Ada Lovelace");
        assert_eq!(display_name(&json!({}), "ada@example.com"), "ada");
        assert_eq!(display_name(&json!({ "full_name": "  " }), "bob@x.io"), "bob");
    }

    #[test]
    fn next_path_rejects_foreign_targets() {
        assert_eq!(safe_next_path(None), "/dashboard");
        assert_eq!(safe_next_path(Some("/dashboard/courses")), "/dashboard/courses");
        assert_eq!(safe_next_path(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next_path(Some("https://evil.example")), "/dashboard");
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn issued_token_is_accepted_by_the_extractor() {
        let config = AppConfig::for_database("postgres://unused");
        let id = Uuid::new_v4();
        let (token, _) = issue_token(&config, id, "ada@example.com").unwrap();
        let user = crate::middleware::auth::decode_token(&config.jwt_secret, &token).unwrap();
        assert_eq!(user.user_id, id);
    }

    #[test]
    fn out_of_range_ttl_is_an_error_not_a_panic() {
        let mut config = AppConfig::for_database("postgres://unused");
        config.jwt_ttl_hours = i64::MAX;
        let err = issue_token(&config, Uuid::new_v4(), "ada@example.com").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn recovery_codes_expire_after_an_hour() {
        let now = Utc::now();
        assert!(recovery_code_is_fresh(Some(now - Duration::minutes(59)), now));
        assert!(!recovery_code_is_fresh(Some(now - Duration::minutes(61)), now));
        assert!(!recovery_code_is_fresh(None, now));
    }

    #[test]
    fn credentials_are_validated() {
        assert!(validate_credentials("ada@example.com", "longenough").is_ok());
        assert!(validate_credentials("ada", "longenough").is_err());
        assert!(validate_credentials("ada@example.com", "short").is_err());
    }
}
