use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for access token generation and verification (RS256)
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (session key, also used for blacklisting)
    pub jti: String,
}

/// Token response returned to the client
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    /// Create a new JWT service by loading RSA keys from files
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        tracing::info!("JWT service initialized with RS256 keys");

        Ok(Self {
            encoding_key,
            decoding_key,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
        })
    }

    /// Generate an access token, returning the encoded token and its claims
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<(String, AccessTokenClaims), anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok((token, claims))
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds (for client info and session TTLs)
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::RsaPrivateKey;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_keys() -> Result<(NamedTempFile, NamedTempFile), anyhow::Error> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048)?;

        let private_pem = private_key.to_pkcs1_pem(LineEnding::LF)?;
        let public_pem = private_key.to_public_key().to_public_key_pem(LineEnding::LF)?;

        let mut private_file = NamedTempFile::new()?;
        private_file.write_all(private_pem.as_bytes())?;

        let mut public_file = NamedTempFile::new()?;
        public_file.write_all(public_pem.as_bytes())?;

        Ok((private_file, public_file))
    }

    fn test_config(private: &NamedTempFile, public: &NamedTempFile) -> JwtConfig {
        JwtConfig {
            private_key_path: private.path().to_str().unwrap().to_string(),
            public_key_path: public.path().to_str().unwrap().to_string(),
            access_token_expiry_minutes: 15,
        }
    }

    #[test]
    fn token_generation_and_verification() -> Result<(), anyhow::Error> {
        let (private_file, public_file) = create_test_keys()?;
        let service = JwtService::new(&test_config(&private_file, &public_file))?;

        let user_id = Uuid::new_v4();
        let (token, claims) = service.generate_access_token(user_id, "test@college.edu")?;
        assert!(!token.is_empty());
        assert_eq!(claims.sub, user_id.to_string());

        let decoded = service.verify_access_token(&token)?;
        assert_eq!(decoded.sub, user_id.to_string());
        assert_eq!(decoded.email, "test@college.edu");
        assert_eq!(decoded.jti, claims.jti);

        Ok(())
    }

    #[test]
    fn tampered_token_is_rejected() -> Result<(), anyhow::Error> {
        let (private_file, public_file) = create_test_keys()?;
        let service = JwtService::new(&test_config(&private_file, &public_file))?;

        let (token, _) = service.generate_access_token(Uuid::new_v4(), "test@college.edu")?;
        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);

        assert!(service.verify_access_token(&tampered).is_err());
        Ok(())
    }

    #[test]
    fn expiry_seconds_follows_config() -> Result<(), anyhow::Error> {
        let (private_file, public_file) = create_test_keys()?;
        let service = JwtService::new(&test_config(&private_file, &public_file))?;
        assert_eq!(service.access_token_expiry_seconds(), 15 * 60);
        Ok(())
    }
}
