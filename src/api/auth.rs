//! Account registration, token issuance, and the current-user extractor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    Form, Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{roles, LoginForm, RegisterRequest, TokenResponse, User, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password, validate_role};

/// JWT claims carried by every access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry as unix timestamp
    pub exp: usize,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn create_access_token(
    secret: &str,
    user_id: &str,
    expiry_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(expiry_minutes)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_access_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Extract the bearer token from request headers
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Resolve a token to its active user.
pub async fn get_current_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = decode_access_token(&state.config.auth.jwt_secret, token)
        .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&claims.sub)
        .fetch_optional(&state.db)
        .await?;
    let user = user.ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;

    if !user.is_active {
        return Err(ApiError::bad_request("Inactive user"));
    }
    Ok(user)
}

/// Extractor for the current authenticated user. Handlers do role and
/// ownership checks themselves; this only guarantees a valid, active
/// account.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?
            .to_string();
        get_current_user(state, &token).await
    }
}

/// Create the bootstrap admin account when it does not exist yet.
pub async fn ensure_admin_user(
    pool: &crate::db::DbPool,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, role, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(email)
    .bind(&password_hash)
    .bind("Admin")
    .bind(roles::ADMIN)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!("Created bootstrap admin user: {}", email);
    Ok(())
}

/// Create a new account.
///
/// Buyer and seller registration is public; creating an admin requires an
/// existing admin's bearer token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.add("password", e);
    }
    if let Err(e) = validate_role(&request.role) {
        errors.add("role", e);
    }
    errors.finish()?;

    if request.role == roles::ADMIN {
        let token = extract_bearer(&headers)
            .ok_or_else(|| ApiError::forbidden("Admin creation requires admin authentication"))?
            .to_string();
        let current_user = get_current_user(&state, &token).await?;
        if !current_user.is_admin() {
            return Err(ApiError::forbidden(
                "Only existing admins can create admin accounts",
            ));
        }
    }

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request(
            "A user with this email already exists",
        ));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: request.email,
        password_hash,
        full_name: request.full_name,
        role: request.role,
        is_active: true,
        created_at: chrono::Utc::now().to_rfc3339(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    };

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, role, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(&user.role)
    .bind(user.is_active)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Registered new user");
    Ok(Json(UserResponse::from(user)))
}

/// OAuth2-compatible token login: exchange credentials for a bearer token.
pub async fn login_access_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&form.username)
        .fetch_optional(&state.db)
        .await?;

    let user = match user {
        Some(u) if verify_password(&form.password, &u.password_hash) => u,
        _ => return Err(ApiError::bad_request("Incorrect email or password")),
    };

    if !user.is_active {
        return Err(ApiError::bad_request("Inactive user"));
    }

    let access_token = create_access_token(
        &state.config.auth.jwt_secret,
        &user.id,
        state.config.auth.token_expiry_minutes,
    )
    .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_roundtrip() {
        let token = create_access_token("secret", "user-1", 30).unwrap();
        let claims = decode_access_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = create_access_token("secret", "user-1", 30).unwrap();
        assert!(decode_access_token("other-secret", &token).is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = create_access_token("secret", "user-1", -120).unwrap();
        assert!(decode_access_token("secret", &token).is_none());
    }
}
