use chrono::{Duration, Utc};
use domains::ports::TokenService;
use domains::{DomainError, DomainResult, IssuedToken, Role, TokenClaims, User};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const ACCESS_AUDIENCE: &str = "access";
const RESET_AUDIENCE: &str = "password-reset";

/// What actually goes over the wire: the domain claims plus issuer and
/// audience. The audience keeps reset tokens out of regular authentication.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: Uuid,
    role: Role,
    jti: String,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

impl From<WireClaims> for TokenClaims {
    fn from(c: WireClaims) -> Self {
        TokenClaims { sub: c.sub, role: c.role, jti: c.jti, iat: c.iat, exp: c.exp }
    }
}

fn validation(issuer: &str, audience: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
    validation.leeway = 0;
    validation
}

/// HS256 tokens with a random `jti` per issue.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access: Validation,
    reset: Validation,
    ttl: Duration,
    reset_ttl: Duration,
    issuer: String,
}

impl JwtTokenService {
    pub fn new(secret: &[u8], ttl: Duration, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access: validation(&issuer, ACCESS_AUDIENCE),
            reset: validation(&issuer, RESET_AUDIENCE),
            ttl,
            reset_ttl: Duration::minutes(15),
            issuer,
        }
    }

    /// Lifetime of password reset tokens (15 minutes unless set).
    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_ttl = ttl;
        self
    }

    fn sign(&self, user: &User, ttl: Duration, audience: &str) -> DomainResult<IssuedToken> {
        let now = Utc::now();
        let wire = WireClaims {
            sub: user.id,
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: audience.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &wire, &self.encoding).map_err(DomainError::internal)?;
        Ok(IssuedToken { token, claims: wire.into() })
    }

    fn check(&self, token: &str, validation: &Validation) -> DomainResult<TokenClaims> {
        match decode::<WireClaims>(token, &self.decoding, validation) {
            Ok(data) => Ok(data.claims.into()),
            Err(err) => {
                debug!(%err, "token rejected");
                let message = match err.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    _ => "invalid token",
                };
                Err(DomainError::Unauthorized(message.into()))
            }
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User) -> DomainResult<IssuedToken> {
        self.sign(user, self.ttl, ACCESS_AUDIENCE)
    }

    fn verify(&self, token: &str) -> DomainResult<TokenClaims> {
        self.check(token, &self.access)
    }

    fn issue_reset(&self, user: &User) -> DomainResult<IssuedToken> {
        self.sign(user, self.reset_ttl, RESET_AUDIENCE)
    }

    fn verify_reset(&self, token: &str) -> DomainResult<TokenClaims> {
        self.check(token, &self.reset)
    }
}
