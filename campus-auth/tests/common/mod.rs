//! Shared setup for integration tests: an app state wired to in-memory
//! collaborators and a freshly generated RSA key pair.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use secrecy::Secret;
use tempfile::NamedTempFile;
use uuid::Uuid;

use campus_auth::config::{
    AuthConfig, DatabaseConfig, Environment, JwtConfig, OtpConfig, RateLimitConfig, RedisConfig,
    SecurityConfig, SmtpConfig, SwaggerConfig, SwaggerMode,
};
use campus_auth::models::{ActorRecord, ModulePermission, Role};
use campus_auth::services::{
    CredentialService, JwtService, MemoryStore, MockDirectory, MockMailer,
};
use campus_auth::AppState;
use campus_core::middleware::rate_limit::create_ip_rate_limiter;
use campus_core::observability::metrics::init_metrics;

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MockDirectory>,
    pub mailer: Arc<MockMailer>,
    _key_files: (NamedTempFile, NamedTempFile),
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_otp_attempts(5)
    }

    /// Build a test app with a custom OTP request threshold.
    pub fn with_otp_attempts(request_attempts: i64) -> Self {
        let (private_file, public_file) = create_test_keys();

        let config = test_config(
            private_file.path().to_str().unwrap(),
            public_file.path().to_str().unwrap(),
            request_attempts,
        );

        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MockDirectory::new());
        let mailer = Arc::new(MockMailer::new());

        let jwt = JwtService::new(&config.jwt).expect("Failed to create JWT service");
        let credentials = CredentialService::new(store.clone());
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        let state = AppState {
            config,
            jwt,
            store: store.clone(),
            credentials,
            directory: directory.clone(),
            mailer: mailer.clone(),
            metrics: init_metrics(),
            ip_rate_limiter,
        };

        Self {
            state,
            store,
            directory,
            mailer,
            _key_files: (private_file, public_file),
        }
    }

    pub fn router(&self) -> axum::Router {
        campus_auth::build_router(self.state.clone()).expect("Failed to build router")
    }

    /// Seed a directory record with the role's default grants.
    pub fn seed_actor(&self, email: &str, role: Role, department_id: Option<Uuid>) -> ActorRecord {
        let record = ActorRecord {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            department_id,
            college_id: Uuid::new_v4(),
            module_permissions: ModulePermission::defaults_for(role),
        };
        self.directory.insert(record.clone());
        record
    }

    /// Mint a valid access token for a seeded record.
    pub fn token_for(&self, record: &ActorRecord) -> String {
        let (token, _) = self
            .state
            .jwt
            .generate_access_token(record.user_id, &record.email)
            .expect("Failed to generate token");
        token
    }
}

fn create_test_keys() -> (NamedTempFile, NamedTempFile) {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate RSA key");

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .expect("Failed to encode private key");
    let public_pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("Failed to encode public key");

    let mut private_file = NamedTempFile::new().expect("Failed to create temp file");
    private_file
        .write_all(private_pem.as_bytes())
        .expect("Failed to write private key");

    let mut public_file = NamedTempFile::new().expect("Failed to create temp file");
    public_file
        .write_all(public_pem.as_bytes())
        .expect("Failed to write public key");

    (private_file, public_file)
}

fn test_config(private_key_path: &str, public_key_path: &str, request_attempts: i64) -> AuthConfig {
    AuthConfig {
        common: campus_core::config::Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "campus-auth-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://localhost/unused".to_string(),
        },
        jwt: JwtConfig {
            private_key_path: private_key_path.to_string(),
            public_key_path: public_key_path.to_string(),
            access_token_expiry_minutes: 15,
        },
        smtp: SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "portal@college.edu".to_string(),
            password: Secret::new("unused".to_string()),
        },
        otp: OtpConfig {
            code_length: 6,
            ttl_seconds: 300,
            request_attempts,
            request_window_seconds: 900,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            blacklist_ttl_seconds: 86400,
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}
