use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::Authenticator;
use auth::JwtHandler;
use auth::PasswordHasher;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use user_api::config::CorsConfig;
use user_api::domain::cache::service::CacheService;
use user_api::domain::user::models::DisplayName;
use user_api::domain::user::models::EmailAddress;
use user_api::domain::user::models::NewUser;
use user_api::domain::user::models::User;
use user_api::domain::user::models::UserId;
use user_api::domain::user::ports::UserRepository;
use user_api::domain::user::service::AuthService;
use user_api::inbound::http::router::create_router;
use user_api::inbound::http::router::AppState;
use user_api::outbound::cache::MemoryCache;
use user_api::user::errors::UserError;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub users: Arc<InMemoryUserRepository>,
    pub cache: Arc<MemoryCache>,
    pub api_client: reqwest::Client,
    pub jwt_handler: JwtHandler,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with_cors(CorsConfig::default()).await
    }

    /// Spawn the application with a specific CORS policy
    pub async fn spawn_with_cors(cors: CorsConfig) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let users = Arc::new(InMemoryUserRepository::default());
        let cache = Arc::new(MemoryCache::new());

        // Cheap hashing keeps the suite fast; the digest format is unchanged.
        let authenticator = Arc::new(
            Authenticator::new(JWT_SECRET, chrono::Duration::hours(24)).with_password_hasher(
                PasswordHasher::with_params(8 * 1024, 1, 1).expect("valid argon2 params"),
            ),
        );

        let state = AppState {
            auth_service: Arc::new(AuthService::new(
                Arc::clone(&users),
                Arc::clone(&cache),
                Arc::clone(&authenticator),
                Duration::from_millis(500),
            )),
            cache_service: Arc::new(CacheService::new(Arc::clone(&cache))),
            authenticator,
        };

        let router = create_router(state, &cors);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            users,
            cache,
            api_client: reqwest::Client::new(),
            jwt_handler: JwtHandler::new(JWT_SECRET),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PUT request with Bearer token
    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.put(path).bearer_auth(token)
    }

    /// Register a user and return the response
    pub async fn register(&self, name: &str, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/register")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in and return the response
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register, log in and return the issued token
    pub async fn token_for(&self, name: &str, email: &str, password: &str) -> String {
        self.register(name, email, password).await;
        let body: serde_json::Value = self
            .login(email, password)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        body["token"]
            .as_str()
            .expect("login response carries a token")
            .to_string()
    }
}

/// User store backed by a map, enforcing the same email uniqueness as the table.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<BTreeMap<i64, User>>,
}

impl InMemoryUserRepository {
    pub async fn count_with_email(&self, email: &str) -> usize {
        self.users
            .lock()
            .await
            .values()
            .filter(|user| user.email.as_str() == email)
            .count()
    }

    pub async fn find(&self, id: i64) -> Option<User> {
        self.users.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let mut users = self.users.lock().await;

        if users.values().any(|existing| existing.email == user.email) {
            return Err(UserError::EmailAlreadyExists);
        }

        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let created = User {
            id: UserId(id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(id, created.clone());

        Ok(created)
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.users.lock().await.get(&id.0).cloned())
    }

    async fn update_name(&self, id: &UserId, name: &DisplayName) -> Result<User, UserError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&id.0)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        user.name = name.clone();
        Ok(user.clone())
    }

    async fn update_password_hash(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), UserError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&id.0)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}
