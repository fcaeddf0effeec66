//! Authentication Handlers
//!
//! Handles registration, login, logout and profile management

use std::time::Duration;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::core::ServerState;
use crate::db::models::{User, UserCreate, UserRole};
use crate::db::repository::UserRepository;
use crate::security_log;
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN, validate_required_text,
};
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// Register request payload
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus profile, returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Profile update payload
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub name: String,
}

/// Password change payload
#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::validation("Password is too long"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    validate_required_text(email, "email", MAX_EMAIL_LEN)?;
    // 完整的 RFC 校验交给邮件投递去失败，这里只拦明显的垃圾输入
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(())
}

/// Register handler
///
/// Creates a regular user account and returns a JWT token
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<AppResponse<AuthResponse>>> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let repo = UserRepository::new(state.get_db());
    let user = repo
        .create(
            UserCreate {
                name: req.name,
                email: req.email,
                password: req.password,
            },
            UserRole::User,
        )
        .await?;

    let user_id = user.id.as_ref().map(|t| t.to_string()).unwrap_or_default();

    let token = state
        .jwt_service()
        .generate_token(&user_id, &user.name, &user.email, user.role.as_str())
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        user_id = %user_id,
        email = %user.email,
        "User registered"
    );

    Ok(ok(AuthResponse { token, user }))
}

/// Login handler
///
/// Authenticates user credentials and returns a JWT token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AppResponse<AuthResponse>>> {
    let repo = UserRepository::new(state.get_db());
    let user = repo.find_by_email(&req.email).await?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Check authentication result - unified error message to prevent
    // email enumeration
    let user = match user {
        Some(u) => {
            if !u.is_active {
                return Err(AppError::forbidden("Account has been disabled"));
            }

            let password_valid = u
                .verify_password(&req.password)
                .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;

            if !password_valid {
                security_log!(
                    "WARN",
                    "login_failed",
                    email = req.email.clone(),
                    reason = "invalid_credentials"
                );
                return Err(AppError::invalid_credentials());
            }

            u
        }
        None => {
            security_log!(
                "WARN",
                "login_failed",
                email = req.email.clone(),
                reason = "user_not_found"
            );
            return Err(AppError::invalid_credentials());
        }
    };

    let user_id = user.id.as_ref().map(|t| t.to_string()).unwrap_or_default();

    let token = state
        .jwt_service()
        .generate_token(&user_id, &user.name, &user.email, user.role.as_str())
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        user_id = %user_id,
        email = %user.email,
        role = %user.role.as_str(),
        "User logged in successfully"
    );

    Ok(ok(AuthResponse { token, user }))
}

/// Get current user info
///
/// Re-reads the account so is_active and profile edits show up even
/// when the token predates them
pub async fn me(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<AppResponse<User>>> {
    let repo = UserRepository::new(state.get_db());
    let user = repo
        .find_by_id(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Account no longer exists"))?;

    Ok(ok(user))
}

/// Logout handler
///
/// JWTs are stateless; the token is dropped client-side and the server
/// only records the event
pub async fn logout(
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<AppResponse<()>>> {
    security_log!(
        "INFO",
        "logout",
        user_id = identity.user_id.clone(),
        email = identity.email.clone()
    );

    tracing::info!(
        user_id = %identity.user_id,
        "User logged out"
    );

    Ok(ok(()))
}

/// Update the display name of the current user
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ProfileUpdateRequest>,
) -> AppResult<Json<AppResponse<User>>> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;

    let repo = UserRepository::new(state.get_db());
    let user = repo.update_name(&identity.user_id, req.name).await?;

    tracing::info!(user_id = %identity.user_id, "Profile updated");

    Ok(ok(user))
}

/// Change the password of the current user
///
/// The old password must verify before the new one is written.
pub async fn update_password(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<PasswordChangeRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    validate_password(&req.new_password)?;

    let repo = UserRepository::new(state.get_db());
    let user = repo
        .find_by_id(&identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Account no longer exists"))?;

    let old_valid = user
        .verify_password(&req.old_password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;

    if !old_valid {
        security_log!(
            "WARN",
            "password_change_failed",
            user_id = identity.user_id.clone(),
            reason = "wrong_old_password"
        );
        return Err(AppError::invalid_credentials());
    }

    repo.update_password(&identity.user_id, &req.new_password)
        .await?;

    security_log!("INFO", "password_changed", user_id = identity.user_id.clone());

    Ok(ok(()))
}
