use std::fmt::{self, Debug, Formatter};

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tourney_api::auth::{Claims, Token};

use crate::config;
use crate::Error;

/// A utility type to handle all [`Token`] encoding, decoding and validating.
#[derive(Clone)]
pub struct Authorization {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: u64,
}

impl Authorization {
    /// Creates a new `Authorization` instance which signs tokens with `secret` using the given
    /// HMAC [`Algorithm`]. Issued tokens expire after `lifetime` seconds.
    pub fn new(alg: Algorithm, secret: &[u8], lifetime: u64) -> Self {
        let mut validation = Validation::new(alg);
        // Expiration is checked by `is_valid`, decoding only checks structure and signature.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            header: Header::new(alg),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    /// Creates a new `Authorization` from the config. If no secret is configured a random one
    /// is generated, invalidating all tokens on restart.
    pub fn from_config(config: &config::Authorization) -> Self {
        if config.secret.is_empty() {
            log::warn!("No token secret configured, tokens will not survive a restart");

            let mut secret = [0u8; 64];
            OsRng.fill_bytes(&mut secret);

            Self::new(config.alg, &secret, config.token_lifetime)
        } else {
            Self::new(config.alg, config.secret.as_bytes(), config.token_lifetime)
        }
    }

    /// Issues a new [`Token`] for the given subject.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if encoding the token fails or the expiration time is not
    /// representable.
    pub fn create_token<T>(&self, sub: T) -> Result<Token, Error>
    where
        T: ToString,
    {
        let now = Utc::now().timestamp() as u64;

        let mut claims = Claims::new(sub);
        claims.iat = now;
        claims.nbf = now;
        claims.exp = now
            .checked_add(self.lifetime)
            .ok_or(Error::LifetimeOverflow)?;

        self.encode_token(claims)
    }

    /// Encodes a new [`Token`] using the provided [`Claims`] as they are.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if encoding the token fails.
    pub fn encode_token(&self, claims: Claims) -> Result<Token, Error> {
        let token = jsonwebtoken::encode(&self.header, &claims, &self.encoding_key)?;
        Ok(Token::from_parts(token, claims))
    }

    /// Decodes a [`Token`] and checks its signature. The claims are not validated.
    ///
    /// A leading `Bearer ` is stripped from the input.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the token is malformed or carries an invalid signature.
    pub fn decode_token<T>(&self, token: T) -> Result<Token, Error>
    where
        T: AsRef<str>,
    {
        let token = token.as_ref().trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(Token::from_parts(token.to_owned(), data.claims))
    }

    /// Returns `true` if the claims of the token are valid at this moment.
    pub fn is_valid(&self, token: &Token) -> bool {
        let claims = token.claims();
        let now = Utc::now().timestamp() as u64;

        if claims.sub.is_empty() {
            return false;
        }

        for claim in [claims.iat, claims.nbf, claims.exp] {
            if claim == 0 {
                return false;
            }
        }

        if claims.nbf > now || claims.exp < now {
            return false;
        }

        claims.exp - claims.nbf == self.lifetime
    }

    /// Decodes a token and validates all claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] if the claims are invalid, or any error of
    /// [`decode_token`](Self::decode_token).
    pub fn validate_token<T>(&self, token: T) -> Result<Token, Error>
    where
        T: AsRef<str>,
    {
        let token = self.decode_token(token)?;

        if self.is_valid(&token) {
            Ok(token)
        } else {
            Err(Error::InvalidToken)
        }
    }
}

impl Debug for Authorization {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("alg", &self.header.alg)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Hashes a password with the given salt. The result is hex encoded.
pub fn password_hash<T, S>(password: T, salt: S) -> String
where
    T: AsRef<[u8]>,
    S: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    hasher.update(salt.as_ref());
    hasher.update(password.as_ref());
    hex::encode(hasher.finalize())
}
