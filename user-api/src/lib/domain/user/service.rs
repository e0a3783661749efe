use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;

use crate::domain::cache::models::CacheKey;
use crate::domain::cache::ports::Cache;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Session;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::AuthServicePort;
use crate::user::ports::UserRepository;

/// How long the id of a freshly registered user stays in the cache.
const REGISTERED_USER_TTL: Duration = Duration::from_secs(10 * 60);

/// Domain service implementation for registration and authentication.
///
/// Cache writes are side effects: they are bounded by `cache_timeout` and
/// their failure is logged and discarded.
pub struct AuthService<UR, C>
where
    UR: UserRepository,
    C: Cache,
{
    repository: Arc<UR>,
    cache: Arc<C>,
    authenticator: Arc<Authenticator>,
    cache_timeout: Duration,
}

impl<UR, C> AuthService<UR, C>
where
    UR: UserRepository,
    C: Cache,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `cache` - Cache receiving best-effort writes
    /// * `authenticator` - Password hasher and token issuer
    /// * `cache_timeout` - Upper bound for each best-effort cache write
    pub fn new(
        repository: Arc<UR>,
        cache: Arc<C>,
        authenticator: Arc<Authenticator>,
        cache_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            authenticator,
            cache_timeout,
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, UserError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.hash_password(&password))
            .await?
            .map_err(|e| UserError::Password(e.to_string()))
    }

    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, UserError> {
        let authenticator = Arc::clone(&self.authenticator);
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        Ok(
            tokio::task::spawn_blocking(move || {
                authenticator.verify_password(&password, &stored_hash)
            })
            .await?,
        )
    }

    async fn remember(&self, key: CacheKey, value: &str, ttl: Duration) {
        match tokio::time::timeout(self.cache_timeout, self.cache.set(&key, value, Some(ttl))).await
        {
            Ok(Ok(())) => tracing::debug!(key = %key, "Cache entry written"),
            Ok(Err(e)) => tracing::warn!(key = %key, error = %e, "Cache write failed"),
            Err(_) => tracing::warn!(
                key = %key,
                timeout_ms = self.cache_timeout.as_millis() as u64,
                "Cache write timed out"
            ),
        }
    }
}

#[async_trait]
impl<UR, C> AuthServicePort for AuthService<UR, C>
where
    UR: UserRepository,
    C: Cache,
{
    #[tracing::instrument(skip_all, fields(email = %command.email))]
    async fn register(&self, command: RegisterCommand) -> Result<User, UserError> {
        // The store's unique constraint is what guarantees uniqueness; this only
        // avoids hashing for an obvious duplicate.
        if self
            .repository
            .find_by_email(&command.email)
            .await?
            .is_some()
        {
            return Err(UserError::EmailAlreadyExists);
        }

        let password_hash = self.hash_password(command.password.into_inner()).await?;

        let user = self
            .repository
            .create(NewUser {
                name: command.name,
                email: command.email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.remember(
            CacheKey::registered_user(user.email.as_str()),
            &user.id.to_string(),
            REGISTERED_USER_TTL,
        )
        .await;

        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(email = %email))]
    async fn authenticate(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<Session, UserError> {
        let Some(user) = self.repository.find_by_email(email).await? else {
            tracing::debug!("Unknown email");
            return Err(UserError::InvalidCredentials);
        };

        let authenticator = Arc::clone(&self.authenticator);
        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        let subject = user.id.to_string();

        let result = tokio::task::spawn_blocking(move || {
            authenticator.authenticate(&password, &stored_hash, &subject)
        })
        .await?
        .map_err(|e| match e {
            AuthenticationError::InvalidCredentials => {
                tracing::debug!("Password mismatch");
                UserError::InvalidCredentials
            }
            AuthenticationError::JwtError(err) => UserError::Token(err.to_string()),
        })?;

        tracing::info!(user_id = %user.id, "User authenticated");

        let ttl = self
            .authenticator
            .token_validity()
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.remember(CacheKey::user_token(user.id.0), &result.access_token, ttl)
            .await;

        Ok(Session {
            token: result.access_token,
            user,
        })
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    #[tracing::instrument(skip_all, fields(user_id = %id))]
    async fn update_profile(
        &self,
        id: &UserId,
        command: UpdateProfileCommand,
    ) -> Result<User, UserError> {
        let user = self.repository.update_name(id, &command.name).await?;
        tracing::info!("Profile updated");
        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(user_id = %id))]
    async fn change_password(
        &self,
        id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), UserError> {
        let user = self.get_user(id).await?;

        if !self
            .verify_password(&command.old_password, &user.password_hash)
            .await?
        {
            return Err(UserError::InvalidCredentials);
        }

        let password_hash = self
            .hash_password(command.new_password.into_inner())
            .await?;
        self.repository
            .update_password_hash(id, &password_hash)
            .await?;

        tracing::info!("Password changed");
        Ok(())
    }
}
