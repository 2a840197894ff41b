use rand::Rng;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::AuthConfig;
use crate::models::{
    validate_username, AuthenticatedUser, CreateUserRequest, NewUser, RepositoryError,
    ServiceError, ServiceResult, TokenRequest, TokenResponse, User, ValidationError,
};
use crate::observability::Metrics;
use crate::repositories::UserRepository;

/// Random bytes behind each token key; hex encoding doubles the length
pub const TOKEN_BYTES: usize = 20;

/// Issues and checks API tokens for registered users
pub struct AuthService {
    repository: Arc<dyn UserRepository>,
    metrics: Option<Arc<Metrics>>,
}

impl AuthService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self {
            repository,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Create an account with an Argon2id password hash
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register_user(&self, request: CreateUserRequest) -> ServiceResult<User> {
        validate_username(&request.username)?;
        if request.password.is_empty() {
            return Err(ValidationError::Blank {
                field: "password".to_string(),
            }
            .into());
        }

        let CreateUserRequest {
            username,
            password,
            is_staff,
        } = request;
        let password_hash = run_blocking(move || hash_password(&password)).await??;
        let new_user = NewUser {
            username: username.clone(),
            password_hash,
            is_staff,
        };

        match self.repository.create(new_user).await {
            Ok(user) => {
                info!(id = user.id, is_staff = user.is_staff, "User registered");
                Ok(user)
            }
            Err(RepositoryError::ConstraintViolation { .. }) => {
                Err(ServiceError::UserAlreadyExists { username })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create the configured staff account when it does not exist yet.
    ///
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, config: &AuthConfig) -> ServiceResult<bool> {
        let Some((username, password)) = config.admin_credentials() else {
            return Ok(false);
        };

        if self.repository.find_by_username(username).await?.is_some() {
            info!(username = %username, "Admin account already present");
            return Ok(false);
        }

        let request = CreateUserRequest {
            username: username.to_string(),
            password: password.to_string(),
            is_staff: true,
        };

        match self.register_user(request).await {
            Ok(_) => Ok(true),
            // Another instance created it between the lookup and the insert
            Err(ServiceError::UserAlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Exchange credentials for the user's token, issuing one on first use
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn obtain_token(&self, request: TokenRequest) -> ServiceResult<TokenResponse> {
        let username = request.username.clone();
        let result = self.issue_token(request).await;
        self.record("obtain_token", result.is_ok());

        if let Err(ServiceError::InvalidCredentials) = &result {
            crate::warn_with_trace!(username = %username, "Token request rejected");
        }
        result
    }

    /// Resolve the user owning `key`
    #[instrument(skip(self, key))]
    pub async fn authenticate_token(&self, key: &str) -> ServiceResult<AuthenticatedUser> {
        let result = match self.repository.find_user_by_token(key).await {
            Ok(Some(user)) => Ok(AuthenticatedUser::from(user)),
            Ok(None) => {
                crate::warn_with_trace!("Unknown token presented");
                Err(ServiceError::Unauthorized {
                    message: "Invalid token.".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        };
        self.record("check_token", result.is_ok());
        result
    }

    async fn issue_token(&self, request: TokenRequest) -> ServiceResult<TokenResponse> {
        if request.username.trim().is_empty() {
            return Err(ValidationError::Blank {
                field: "username".to_string(),
            }
            .into());
        }
        if request.password.is_empty() {
            return Err(ValidationError::Blank {
                field: "password".to_string(),
            }
            .into());
        }

        let user = self
            .repository
            .find_by_username(&request.username)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let password_hash = user.password_hash.clone();
        let password = request.password;
        let verified = run_blocking(move || verify_password(&password, &password_hash)).await?;
        if !verified {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self
            .repository
            .get_or_create_token(user.id, &generate_token_key())
            .await?;

        crate::info_with_trace!(user_id = user.id, "Token obtained");
        Ok(token.into())
    }

    fn record(&self, kind: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_auth_attempt(kind, success);
        }
    }
}

/// New token key: random bytes as lowercase hex
pub fn generate_token_key() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

fn hash_password(password: &str) -> ServiceResult<String> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Internal {
            message: format!("Failed to hash password: {}", e),
        })?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2 is CPU bound; keep it off the async workers
async fn run_blocking<F, T>(task: F) -> ServiceResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServiceError::Internal {
            message: format!("Password task failed: {}", e),
        })
}
