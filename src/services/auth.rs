use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed Authorization header")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token has no subject")]
    MissingSubject,
}

/// Claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Verifies HS256 bearer tokens and yields the caller id
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Caller id from an `Authorization` header value
    ///
    /// No header means an anonymous caller (`Ok(None)`); a header that is
    /// present but unusable is an error rather than a silent downgrade.
    pub fn caller_from_header(&self, header: Option<&str>) -> Result<Option<String>, AuthError> {
        let Some(value) = header.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        self.verify(token).map(Some)
    }

    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let subject = data.claims.sub.trim();
        if subject.is_empty() {
            return Err(AuthError::MissingSubject);
        }
        Ok(subject.to_string())
    }
}

/// Sign a token for `subject`, valid for `ttl_secs`
pub fn issue_token(secret: &str, subject: &str, ttl_secs: i64) -> Result<String, AuthError> {
    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
    let claims = Claims {
        sub: subject.to_string(),
        exp,
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_absent_header_is_anonymous() {
        let verifier = TokenVerifier::new(SECRET);
        assert_eq!(verifier.caller_from_header(None).unwrap(), None);
        assert_eq!(verifier.caller_from_header(Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = issue_token(SECRET, "user-1", 3600).unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(
            verifier.caller_from_header(Some(&header)).unwrap().as_deref(),
            Some("user-1")
        );
    }

    #[test]
    fn test_rejects_bad_tokens() {
        let verifier = TokenVerifier::new(SECRET);

        let foreign = issue_token("other-secret", "user-1", 3600).unwrap();
        assert!(verifier.verify(&foreign).is_err());

        let expired = issue_token(SECRET, "user-1", -3600).unwrap();
        assert!(verifier.verify(&expired).is_err());

        assert!(matches!(
            verifier.caller_from_header(Some("Token abc")),
            Err(AuthError::MalformedHeader)
        ));
    }
}
