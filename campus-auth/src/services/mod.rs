//! Services layer: the authorization engine, credential lifecycle, and the
//! external collaborators (store, directory, mailer, token primitive)
//! behind their seams.

pub mod authz;
mod credentials;
mod directory;
mod email;
mod jwt;
mod store;

pub use credentials::{CredentialError, CredentialService, OtpEntry};
pub use directory::{ActorDirectory, MockDirectory, PgDirectory};
pub use email::{MockMailer, OtpMailer, SmtpMailer};
pub use jwt::{AccessTokenClaims, JwtService, TokenResponse};
pub use store::{KeyValueStore, MemoryStore, RedisStore};
