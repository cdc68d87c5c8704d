use serde::{Deserialize, Serialize};

/// JWT claims issued by the upstream identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // user_id
    pub username: String,
    pub is_admin: bool,
    pub exp: usize, // expiration timestamp
    pub iat: usize, // issued at
}
