//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, Permission, User, UserClaims},
    repository::{users::NewUser, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = match self.repository.users.get_by_login(login).await? {
            Some(user) => user,
            None => {
                tracing::warn!(login, "Login failed: unknown user");
                return Err(AppError::Authentication("Invalid login or password".to_string()));
            }
        };

        if !self.verify_password(&user, password)? {
            tracing::warn!(login, user_id = user.id, "Login failed: wrong password");
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(login, user_id = user.id, "Login succeeded");
        Ok((token, user))
    }

    /// Sign a token for `user` with the configured lifetime
    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Token lifetime in seconds
    pub fn token_lifetime_secs(&self) -> u64 {
        self.config.jwt_expiration_hours * 3600
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Create a new user
    pub async fn create_user(&self, user: &CreateUser) -> AppResult<User> {
        let password_hash = self.hash_password(&user.password)?;
        let created = self
            .repository
            .users
            .create(NewUser {
                login: user.login.trim(),
                password_hash: &password_hash,
                first_name: &user.first_name,
                last_name: &user.last_name,
                is_admin: user.is_admin,
                permissions: &user.permissions,
            })
            .await?;

        tracing::info!(user_id = created.id, login = %created.login, "User created");
        Ok(created)
    }

    pub async fn update_permissions(&self, id: i64, permissions: &[Permission]) -> AppResult<User> {
        let user = self.repository.users.update_permissions(id, permissions).await?;
        tracing::info!(user_id = id, permissions = %Permission::join_list(permissions), "Permissions updated");
        Ok(user)
    }

    /// Create the configured administrator account when it does not exist yet
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let (Some(login), Some(password)) = (&self.config.admin_login, &self.config.admin_password) else {
            return Ok(());
        };

        if self.repository.users.get_by_login(login).await?.is_some() {
            tracing::debug!(login = %login, "Admin account already present");
            return Ok(());
        }

        self.create_user(&CreateUser {
            login: login.clone(),
            password: password.clone(),
            first_name: String::new(),
            last_name: String::new(),
            is_admin: true,
            permissions: Permission::ALL.to_vec(),
        })
        .await?;
        tracing::info!(login = %login, "Admin account created");
        Ok(())
    }
}
