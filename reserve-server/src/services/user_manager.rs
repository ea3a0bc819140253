//! Accounts, login and admin seeding

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    LoginRequest, LoginResponse, RegisterRequest, Role, User, UserResponse, UserUpdate,
};

use super::InputValidator;
use crate::auth::{AuthProvider, AuthenticatedPrincipal};
use crate::core::config::AdminSeed;
use crate::db::{NewUser, RepoError, Store, UserChanges};
use crate::security_log;

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn user_write_error(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate(_) => AppError::new(ErrorCode::EmailExists),
        RepoError::Conflict(_) => AppError::new(ErrorCode::UserHasReservations),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct UserManager {
    store: Arc<dyn Store>,
    auth: Arc<dyn AuthProvider>,
    validator: InputValidator,
    allow_admin_registration: bool,
}

impl UserManager {
    pub fn new(
        store: Arc<dyn Store>,
        auth: Arc<dyn AuthProvider>,
        validator: InputValidator,
        allow_admin_registration: bool,
    ) -> Self {
        Self {
            store,
            auth,
            validator,
            allow_admin_registration,
        }
    }

    /// Argon2 off the async workers
    async fn hash(&self, password: String) -> AppResult<String> {
        let auth = Arc::clone(&self.auth);
        tokio::task::spawn_blocking(move || auth.hash_password(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(AppError::from)
    }

    async fn verify(&self, password: String, hash: String) -> AppResult<bool> {
        let auth = Arc::clone(&self.auth);
        tokio::task::spawn_blocking(move || auth.verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))
    }

    pub async fn register(&self, mut req: RegisterRequest) -> AppResult<UserResponse> {
        req.email = normalize_email(&req.email);
        req.name = req.name.trim().to_string();
        self.validator.check(&req)?;
        let role = match req.role.as_deref() {
            Some(raw) => self.validator.parse_role(raw)?,
            None => Role::default(),
        };
        if role.is_admin() && !self.allow_admin_registration {
            security_log!("WARN", "admin_registration_refused", email = req.email.as_str());
            return Err(AppError::forbidden("Admin registration is disabled"));
        }

        let password_hash = self.hash(req.password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                name: req.name,
                email: req.email,
                password_hash,
                role,
            })
            .await
            .map_err(user_write_error)?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user.into())
    }

    pub async fn login(&self, mut req: LoginRequest) -> AppResult<LoginResponse> {
        req.email = normalize_email(&req.email);
        self.validator.check(&req)?;
        let email = req.email;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            security_log!("WARN", "login_unknown_email", email = email.as_str());
            return Err(AppError::invalid_credentials());
        };
        if !self.verify(req.password, user.password_hash.clone()).await? {
            security_log!("WARN", "login_bad_password", user_id = user.id);
            return Err(AppError::invalid_credentials());
        }

        let principal = AuthenticatedPrincipal {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        };
        let issued = self.auth.issue_token(&principal)?;
        security_log!("INFO", "login_success", user_id = user.id);

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.into(),
        })
    }

    pub async fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Self or admin
    pub async fn get_user(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
    ) -> AppResult<UserResponse> {
        if !principal.can_access(id) {
            return Err(AppError::forbidden("You can only view your own account"));
        }
        self.find(id).await.map(UserResponse::from)
    }

    async fn find(&self, id: i64) -> AppResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))
    }

    /// Self or admin; role changes are admin-only
    pub async fn update_user(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
        mut req: UserUpdate,
    ) -> AppResult<UserResponse> {
        if !principal.can_access(id) {
            return Err(AppError::forbidden("You can only update your own account"));
        }
        if req.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyUpdate));
        }
        req.email = req.email.as_deref().map(normalize_email);
        req.name = req.name.map(|n| n.trim().to_string());
        self.validator.check(&req)?;

        let role = req
            .role
            .as_deref()
            .map(|raw| self.validator.parse_role(raw))
            .transpose()?;
        if role.is_some() && !principal.is_admin() {
            return Err(AppError::new(ErrorCode::AdminRequired));
        }
        let password_hash = match req.password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };

        let user = self
            .store
            .update_user(
                id,
                UserChanges {
                    name: req.name,
                    email: req.email,
                    password_hash,
                    role,
                },
            )
            .await
            .map_err(user_write_error)?;

        tracing::info!(user_id = id, by = principal.id, "User updated");
        Ok(user.into())
    }

    /// Refused while the user still owns reservations
    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.store.delete_user(id).await.map_err(user_write_error)?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the configured admin account unless the email already exists
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> AppResult<()> {
        let email = normalize_email(&seed.email);
        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            if !existing.role.is_admin() {
                tracing::warn!(user_id = existing.id, "Admin seed email belongs to a customer account");
            }
            return Ok(());
        }

        let password_hash = self.hash(seed.password.clone()).await?;
        let admin = self
            .store
            .insert_user(NewUser {
                name: seed.name.clone(),
                email,
                password_hash,
                role: Role::Admin,
            })
            .await
            .map_err(user_write_error)?;

        tracing::info!(user_id = admin.id, "Admin account seeded");
        Ok(())
    }
}
