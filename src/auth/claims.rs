use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: u64,    // issued at (unix timestamp)
    pub nbf: u64,    // not before
    pub exp: u64,    // expires at
    pub iss: String, // issuer
    pub aud: String, // audience
}
