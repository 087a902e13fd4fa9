mod common;

use scaleup_academy::{
    config::AppConfig,
    dto::auth::{ChangePasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest},
    entity::{AuthUsers, Profiles},
    error::AppError,
    middleware::auth::decode_token,
    models::Role,
    services::auth_service,
};
use sea_orm::EntityTrait;

#[tokio::test]
async fn signup_confirm_and_login() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let mut config = AppConfig::for_database(&url);
    config.require_email_confirmation = true;
    let state = common::setup_state_with(config).await?;

    let email = common::unique_email("signup");
    let identity = auth_service::signup(
        &state,
        SignupRequest {
            email: email.clone(),
            password: "hunter22".into(),
            full_name: Some("Grace Hopper".into()),
        },
    )
    .await?
    .data
    .expect("identity");
    assert!(identity.email_confirmed_at.is_none());

    let profile = Profiles::find_by_id(identity.id).one(&state.orm).await?.expect("profile");
    assert_eq!(profile.role, "student");
    assert_eq!(profile.full_name.as_deref(), Some("Grace Hopper"));

    let login = || LoginRequest {
        email: email.clone(),
        password: "hunter22".into(),
    };
    let err = auth_service::login(&state, login())
        .await
        .expect_err("unconfirmed email");
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Email not confirmed"));

    let code = AuthUsers::find_by_id(identity.id)
        .one(&state.orm)
        .await?
        .and_then(|row| row.confirmation_code)
        .expect("confirmation code");
    let confirmed = auth_service::exchange_code(&state, &code).await?;
    assert!(confirmed.email_confirmed_at.is_some());

    let err = auth_service::exchange_code(&state, &code)
        .await
        .expect_err("codes are single use");
    assert!(matches!(err, AppError::NotFound(_)));

    let session = auth_service::login(&state, login()).await?.data.expect("session");
    let caller = decode_token(&state.config.jwt_secret, &session.access_token)?;
    assert_eq!(caller.user_id, identity.id);

    let err = auth_service::signup(
        &state,
        SignupRequest {
            email: email.to_uppercase(),
            password: "hunter22".into(),
            full_name: None,
        },
    )
    .await
    .expect_err("email already registered");
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let user = common::create_user(&state, Role::Student, "login").await?;

    let err = auth_service::login(
        &state,
        LoginRequest {
            email: user.email,
            password: "not-the-password".into(),
        },
    )
    .await
    .expect_err("wrong password");
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn recovery_code_resets_password_once() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let user = common::create_user(&state, Role::Student, "recover").await?;

    let known = auth_service::forgot_password(&state, &user.email).await?;
    let unknown = auth_service::forgot_password(&state, &common::unique_email("nobody")).await?;
    assert_eq!(known.message, unknown.message);
    assert_eq!(known.data, unknown.data);

    let code = AuthUsers::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .and_then(|row| row.recovery_code)
        .expect("recovery code");

    let reset = || ResetPasswordRequest {
        code: code.clone(),
        password: "new-secret".into(),
    };
    auth_service::reset_password(&state, reset()).await?;

    let login = |password: &str| LoginRequest {
        email: user.email.clone(),
        password: password.into(),
    };
    auth_service::login(&state, login("new-secret")).await?;
    let err = auth_service::login(&state, login("password123"))
        .await
        .expect_err("old password no longer works");
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = auth_service::reset_password(&state, reset())
        .await
        .expect_err("recovery codes are single use");
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn change_password_requires_current_password() -> anyhow::Result<()> {
    let Some(url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&url).await?;
    let user = common::create_user(&state, Role::Student, "change").await?;

    let err = auth_service::change_password(
        &state,
        &user,
        ChangePasswordRequest {
            current_password: "not-my-password".into(),
            new_password: "rotated-secret".into(),
        },
    )
    .await
    .expect_err("wrong current password");
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Current password is incorrect"));

    auth_service::change_password(
        &state,
        &user,
        ChangePasswordRequest {
            current_password: "password123".into(),
            new_password: "rotated-secret".into(),
        },
    )
    .await?;
    auth_service::login(
        &state,
        LoginRequest {
            email: user.email.clone(),
            password: "rotated-secret".into(),
        },
    )
    .await?;
    Ok(())
}
