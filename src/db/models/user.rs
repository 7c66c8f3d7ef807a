//! User account model and auth DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod roles {
    pub const BUYER: &str = "buyer";
    pub const SELLER: &str = "seller";
    pub const ADMIN: &str = "admin";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }

    /// Admins inherit every seller capability.
    pub fn can_sell(&self) -> bool {
        self.role == roles::SELLER || self.role == roles::ADMIN
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    roles::BUYER.to_string()
}

/// OAuth2 password-flow form body for the token endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> User {
        User {
            id: "u1".to_string(),
            email: "u@example.com".to_string(),
            password_hash: String::new(),
            full_name: None,
            role: role.to_string(),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_admin_is_capability_superset_of_seller() {
        assert!(user_with_role(roles::ADMIN).can_sell());
        assert!(user_with_role(roles::SELLER).can_sell());
        assert!(!user_with_role(roles::BUYER).can_sell());
        assert!(!user_with_role(roles::SELLER).is_admin());
    }
}
