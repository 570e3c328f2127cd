use crate::error::InvoiceError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

/// Claims carried by bearer tokens issued by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id. Older tokens carry it as `sub`.
    #[serde(rename = "userId", alias = "sub")]
    pub user_id: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// HS256 bearer token verification.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(secret: &Secret<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        }
    }

    /// Validate the token and return the user id it was issued to.
    pub fn verify(&self, token: &str) -> Result<String, InvoiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            InvoiceError::Unauthorized("token failed".to_string())
        })?;

        if token_data.claims.user_id.is_empty() {
            return Err(InvoiceError::Unauthorized("token failed".to_string()));
        }

        Ok(token_data.claims.user_id)
    }
}
