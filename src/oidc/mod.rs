//! OpenID Connect login against an external identity provider.

pub mod config;
pub mod error;
pub mod flow;
pub mod jwks;
pub mod provider;

pub use self::config::{ClientSecrets, OidcConfig, SCOPES};
pub use self::error::AuthError;
pub use self::flow::{AuthFlow, AuthorizationRequest, CallbackParams};
pub use self::jwks::{IdClaims, JwksCache};
pub use self::provider::{IdentityProvider, OidcProvider, TokenSet};
