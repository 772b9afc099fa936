//! Users repository for database operations

use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::user::{Permission, User, UserRow},
};

use super::map_constraint_error;

const USER_COLUMNS: &str =
    "SELECT id, login, password, first_name, last_name, is_admin, permissions, created_at FROM users";

/// Fields of a user about to be stored; the password is already hashed
pub struct NewUser<'a> {
    pub login: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub is_admin: bool,
    pub permissions: &'a [Permission],
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Sqlite>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        let query = format!("{} WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by login, ignoring case
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let query = format!("{} WHERE login = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserRow>(&query)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from);
        Ok(user)
    }

    pub async fn create(&self, user: NewUser<'_>) -> AppResult<User> {
        let id = sqlx::query(
            r#"
            INSERT INTO users (login, password, first_name, last_name, is_admin, permissions)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.login)
        .bind(user.password_hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.is_admin)
        .bind(Permission::join_list(user.permissions))
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, &format!("User '{}'", user.login)))?
        .last_insert_rowid();

        self.get_by_id(id).await
    }

    /// Replace the permission set of a user
    pub async fn update_permissions(&self, id: i64, permissions: &[Permission]) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET permissions = $1 WHERE id = $2")
            .bind(Permission::join_list(permissions))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        self.get_by_id(id).await
    }
}
