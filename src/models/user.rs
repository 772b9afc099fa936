//! User model, permissions and JWT claims

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Librarian capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Set book as returned
    CanMarkReturned,
    /// Renew the book for an extended lease
    CanRenew,
    /// Create, modify, or delete authors
    CanModifyAuthor,
    /// Create, modify, or delete books
    CanModifyBook,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::CanMarkReturned,
        Permission::CanRenew,
        Permission::CanModifyAuthor,
        Permission::CanModifyBook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CanMarkReturned => "can_mark_returned",
            Permission::CanRenew => "can_renew",
            Permission::CanModifyAuthor => "can_modify_author",
            Permission::CanModifyBook => "can_modify_book",
        }
    }

    /// Parse the comma-separated column format, ignoring unknown codes
    pub fn parse_list(s: &str) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = s
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        permissions.sort();
        permissions.dedup();
        permissions
    }

    pub fn join_list(permissions: &[Permission]) -> String {
        let mut codes: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
        codes.sort_unstable();
        codes.dedup();
        codes.join(",")
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "can_mark_returned" => Ok(Permission::CanMarkReturned),
            "can_renew" => Ok(Permission::CanRenew),
            "can_modify_author" => Ok(Permission::CanModifyAuthor),
            "can_modify_book" => Ok(Permission::CanModifyBook),
            _ => Err(format!("Invalid permission: {}", s)),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    id: i64,
    login: String,
    password: String,
    first_name: String,
    last_name: String,
    is_admin: bool,
    permissions: String,
    created_at: Option<NaiveDateTime>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            login: row.login,
            password: row.password,
            first_name: row.first_name,
            last_name: row.last_name,
            is_admin: row.is_admin,
            permissions: Permission::parse_list(&row.permissions),
            created_at: row.created_at,
        }
    }
}

/// Library user (reader or librarian)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub permissions: Vec<Permission>,
    pub created_at: Option<NaiveDateTime>,
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin || self.permissions.contains(&permission)
    }
}

/// Create user request (admin only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Replace a user's permissions (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePermissions {
    pub permissions: Vec<Permission>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i64,
    pub is_admin: bool,
    pub permissions: Vec<Permission>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Claims for `user`, valid for `hours`
    pub fn for_user(user: &User, hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.login.clone(),
            user_id: user.id,
            is_admin: user.is_admin,
            permissions: user.permissions.clone(),
            exp: now + (hours as i64 * 3600),
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_admin || self.permissions.contains(&permission)
    }

    // Authorization checks
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Missing permission {}", permission)))
        }
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn librarian() -> UserClaims {
        UserClaims {
            sub: "testuser2".to_string(),
            user_id: 2,
            is_admin: false,
            permissions: vec![Permission::CanRenew, Permission::CanMarkReturned],
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_permission_list_round_trip() {
        let column = Permission::join_list(&[Permission::CanRenew, Permission::CanModifyBook, Permission::CanRenew]);
        assert_eq!(column, "can_modify_book,can_renew");
        assert_eq!(
            Permission::parse_list(&column),
            vec![Permission::CanRenew, Permission::CanModifyBook]
        );
        assert!(Permission::parse_list("").is_empty());
        assert_eq!(Permission::parse_list("bogus, can_renew"), vec![Permission::CanRenew]);
    }

    #[test]
    fn test_require_checks_permission() {
        let claims = librarian();
        assert!(claims.require(Permission::CanRenew).is_ok());
        assert!(matches!(
            claims.require(Permission::CanModifyAuthor),
            Err(AppError::Authorization(_))
        ));
        assert!(claims.require_admin().is_err());
    }

    #[test]
    fn test_admin_holds_every_permission() {
        let mut claims = librarian();
        claims.is_admin = true;
        claims.permissions.clear();
        for permission in Permission::ALL {
            assert!(claims.require(permission).is_ok());
        }
    }

    #[test]
    fn test_token_round_trip() {
        let claims = librarian();
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 2);
        assert_eq!(parsed.permissions, claims.permissions);
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }
}
