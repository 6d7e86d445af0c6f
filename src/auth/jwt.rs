// src/auth/jwt.rs
use crate::auth::Claims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

const MAX_TOKEN_LEN: usize = 2048;

/// Validates an HS256 access token and returns the user id it was issued for.
pub fn validate_token(token: &str, secret: &str) -> Result<i64, jsonwebtoken::errors::Error> {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    match token_data.claims.sub.parse::<i64>() {
        Ok(user_id) if user_id > 0 => Ok(user_id),
        _ => Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret_key_minimum_32_characters_long_12345";

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    /// Week-long token for `user_id`, as the login service would issue it.
    pub(crate) fn generate_token(user_id: i64, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::days(7)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    #[test]
    fn test_token_round_trip() {
        let token = generate_token(17, SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap(), 17);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = generate_token(17, SECRET).unwrap();
        assert!(validate_token(&token, "another_secret_key_that_is_32_chars_long").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let past = (Utc::now() - Duration::hours(1)).timestamp() as usize;
        let claims = Claims {
            sub: "17".to_string(),
            exp: past,
            iat: past,
        };

        assert!(validate_token(&sign(&claims, SECRET), SECRET).is_err());
    }

    #[test]
    fn test_garbage_and_non_numeric_subject() {
        assert!(validate_token("", SECRET).is_err());
        assert!(validate_token("not.a.token", SECRET).is_err());

        let claims = Claims {
            sub: "admin".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };
        assert!(validate_token(&sign(&claims, SECRET), SECRET).is_err());
    }
}
