use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::ports::{PasswordHasher, TokenBlacklist, TokenService, UserRepository};
use domains::{
    normalize_email, normalize_name, normalize_security_answer, normalize_security_question, validate_password,
    DomainError, DomainResult, Role, User, UserSummary,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Optional at signup; both or neither.
    #[serde(default, alias = "securityQuestion")]
    pub security_question: Option<String>,
    #[serde(default, alias = "securityAnswer")]
    pub security_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPasswordInput {
    #[serde(default)]
    pub email: String,
}

/// First step of a password recovery: the question to answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityChallenge {
    pub email: String,
    pub security_question: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAnswerInput {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "security_answer", alias = "answer")]
    pub security_answer: String,
}

/// Proof of a correct security answer, spent by the reset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetGrant {
    pub reset_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    #[serde(default, alias = "reset_token")]
    pub reset_token: String,
    #[serde(default)]
    pub password: String,
}

/// What a successful signup or signin returns to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: UserSummary,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
        blacklist: Arc<dyn TokenBlacklist>,
    ) -> Self {
        Self { users, hasher, tokens, blacklist }
    }

    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> DomainResult<AuthSession> {
        if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
            return Err(DomainError::validation("name, email, password required"));
        }
        let name = normalize_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        let filled = |s: &Option<String>| s.as_deref().filter(|v| !v.trim().is_empty()).map(str::to_string);
        let security = match (filled(&input.security_question), filled(&input.security_answer)) {
            (None, None) => None,
            (Some(question), Some(answer)) => {
                Some((normalize_security_question(&question)?, normalize_security_answer(&answer)?))
            }
            _ => return Err(DomainError::validation("security question and answer must be given together")),
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("user already exists".into()));
        }

        let hash = self.hasher.hash(&input.password)?;
        let mut user = User::new(name, email, hash, Role::User);
        if let Some((question, answer)) = security {
            user.security_question = Some(question);
            user.security_answer_hash = Some(self.hasher.hash(&answer)?);
        }
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "user registered");

        self.session(&user)
    }

    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> DomainResult<AuthSession> {
        let user = self.check_credentials(&input).await?;
        self.session(&user)
    }

    /// Same as [`login`](Self::login) but only for admin accounts.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn admin_login(&self, input: LoginInput) -> DomainResult<AuthSession> {
        let user = self.check_credentials(&input).await?;
        if !user.is_admin() {
            warn!(user_id = %user.id, "non-admin attempted admin login");
            return Err(DomainError::Unauthorized("invalid credentials".into()));
        }
        self.session(&user)
    }

    /// Revokes the token. Malformed or expired tokens count as logged out.
    pub async fn logout(&self, token: Option<&str>) -> DomainResult<()> {
        let Some(token) = token else { return Ok(()) };
        match self.tokens.verify(token) {
            Ok(claims) => {
                self.blacklist.revoke(&claims.jti, claims.expires_at()).await?;
                info!(user_id = %claims.sub, "token revoked");
            }
            Err(err) => warn!(%err, "signout with unusable token"),
        }
        Ok(())
    }

    /// Resolves a bearer token to the current state of its user.
    pub async fn authenticate(&self, token: &str) -> DomainResult<User> {
        let claims = self.tokens.verify(token)?;
        if self.blacklist.is_revoked(&claims.jti).await? {
            return Err(DomainError::Unauthorized("token revoked".into()));
        }
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("user no longer exists".into()))?;
        if user.is_suspended {
            return Err(DomainError::Forbidden("account suspended".into()));
        }
        Ok(user)
    }

    /// Looks up the security question of an account.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn forgot_password(&self, input: ForgotPasswordInput) -> DomainResult<SecurityChallenge> {
        let user = self.recovering(&input.email).await?;
        let question = user
            .security_question
            .ok_or_else(|| DomainError::validation("no security question registered for this account"))?;
        Ok(SecurityChallenge { email: user.email, security_question: question })
    }

    /// Checks the answer and hands out a single-use reset token.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn verify_security_answer(&self, input: SecurityAnswerInput) -> DomainResult<ResetGrant> {
        if input.security_answer.trim().is_empty() {
            return Err(DomainError::validation("email and security answer required"));
        }
        let user = self.recovering(&input.email).await?;
        let hash = user
            .security_answer_hash
            .as_deref()
            .ok_or_else(|| DomainError::validation("no security question registered for this account"))?;
        let answer = normalize_security_answer(&input.security_answer)?;
        if !self.hasher.verify(&answer, hash)? {
            warn!(user_id = %user.id, "security answer mismatch");
            return Err(DomainError::validation("incorrect security answer"));
        }
        let issued = self.tokens.issue_reset(&user)?;
        info!(user_id = %user.id, "password reset granted");
        Ok(ResetGrant { expires_at: issued.claims.expires_at(), reset_token: issued.token })
    }

    /// Spends a reset token on a new password.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, input: PasswordReset) -> DomainResult<()> {
        if input.reset_token.trim().is_empty() || input.password.is_empty() {
            return Err(DomainError::validation("reset token and password required"));
        }
        let claims = self.tokens.verify_reset(input.reset_token.trim())?;
        if self.blacklist.is_revoked(&claims.jti).await? {
            return Err(DomainError::Unauthorized("reset token already used".into()));
        }
        validate_password(&input.password)?;
        let mut user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("user no longer exists".into()))?;
        if user.is_suspended {
            return Err(DomainError::Forbidden("account suspended".into()));
        }
        user.password_hash = self.hasher.hash(&input.password)?;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        self.blacklist.revoke(&claims.jti, claims.expires_at()).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Creates an admin account unless the email is already registered.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> DomainResult<bool> {
        let email = normalize_email(email)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(false);
        }
        validate_password(password)?;
        let hash = self.hasher.hash(password)?;
        let user = User::new(normalize_name(name)?, email, hash, Role::Admin);
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "admin account created");
        Ok(true)
    }

    async fn check_credentials(&self, input: &LoginInput) -> DomainResult<User> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(DomainError::validation("email and password required"));
        }
        let invalid = || DomainError::Unauthorized("invalid credentials".into());

        let email = normalize_email(&input.email).map_err(|_| invalid())?;
        let user = self.users.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "password mismatch");
            return Err(invalid());
        }
        if user.is_suspended {
            return Err(DomainError::Forbidden("account suspended".into()));
        }
        Ok(user)
    }

    async fn recovering(&self, email: &str) -> DomainResult<User> {
        if email.trim().is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        let email = normalize_email(email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &email))?;
        if user.is_suspended {
            return Err(DomainError::Forbidden("account suspended".into()));
        }
        Ok(user)
    }

    fn session(&self, user: &User) -> DomainResult<AuthSession> {
        let issued = self.tokens.issue(user)?;
        Ok(AuthSession {
            user: user.summary(),
            expires_at: issued.claims.expires_at(),
            token: issued.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::ports::{MockPasswordHasher, MockTokenBlacklist, MockTokenService, MockUserRepository};
    use domains::{IssuedToken, TokenClaims};
    use tokio_test::{assert_err, assert_ok};

    fn claims_for(user: &User) -> TokenClaims {
        TokenClaims {
            sub: user.id,
            role: user.role,
            jti: "jti-1".into(),
            iat: 0,
            exp: 4_102_444_800,
        }
    }

    fn token_service() -> MockTokenService {
        let mut tokens = MockTokenService::new();
        tokens.expect_issue().returning(|u| {
            Ok(IssuedToken { token: format!("token-{}", u.id), claims: claims_for(u) })
        });
        tokens
    }

    fn plain_hasher() -> MockPasswordHasher {
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().returning(|p| Ok(format!("hashed:{p}")));
        hasher.expect_verify().returning(|p, h| Ok(h == format!("hashed:{p}")));
        hasher
    }

    fn service(users: MockUserRepository, tokens: MockTokenService, blacklist: MockTokenBlacklist) -> AuthService {
        AuthService::new(Arc::new(users), Arc::new(plain_hasher()), Arc::new(tokens), Arc::new(blacklist))
    }

    fn stored_user(role: Role, suspended: bool) -> User {
        let mut user = User::new("Ana".into(), "ana@example.com".into(), "hashed:secret1".into(), role);
        user.is_suspended = suspended;
        user
    }

    fn with_security(mut user: User) -> User {
        user.security_question = Some("First pet?".into());
        user.security_answer_hash = Some("hashed:rex".into());
        user
    }

    fn reset_claims(user: &User) -> TokenClaims {
        TokenClaims { jti: "reset-1".into(), ..claims_for(user) }
    }

    fn login(password: &str) -> LoginInput {
        LoginInput { email: "ANA@example.com".into(), password: password.into() }
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|e| e.contains("ana@example.com"))
            .returning(|_| Ok(Some(stored_user(Role::User, false))));
        users.expect_insert().never();

        let svc = service(users, token_service(), MockTokenBlacklist::new());
        let err = svc
            .register(RegisterInput { name: "Ana".into(), email: "Ana@Example.com".into(), password: "secret1".into(), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_hashes_password_and_issues_token() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_insert()
            .withf(|u| u.password_hash == "hashed:secret1" && u.role == Role::User)
            .times(1)
            .returning(|_| Ok(()));

        let svc = service(users, token_service(), MockTokenBlacklist::new());
        let session = svc
            .register(RegisterInput { name: " Ana ".into(), email: "ana@example.com".into(), password: "secret1".into(), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(session.user.name, "Ana");
        assert!(session.token.starts_with("token-"));
    }

    #[tokio::test]
    async fn register_requires_all_fields() {
        let svc = service(MockUserRepository::new(), token_service(), MockTokenBlacklist::new());
        let err = svc
            .register(RegisterInput { name: "".into(), email: "a@b.co".into(), password: "secret1".into(), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(stored_user(Role::User, false))));
        let svc = service(users, token_service(), MockTokenBlacklist::new());

        let err = svc.login(login("nope-nope")).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_of_unknown_email_is_unauthorized() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        let svc = service(users, token_service(), MockTokenBlacklist::new());

        assert!(matches!(svc.login(login("secret1")).await, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn suspended_login_is_forbidden() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(stored_user(Role::User, true))));
        let svc = service(users, token_service(), MockTokenBlacklist::new());

        assert!(matches!(svc.login(login("secret1")).await, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_login_refuses_regular_users() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(stored_user(Role::User, false))));
        let svc = service(users, token_service(), MockTokenBlacklist::new());
        assert_err!(svc.admin_login(login("secret1")).await);

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(stored_user(Role::Admin, false))));
        let svc = service(users, token_service(), MockTokenBlacklist::new());
        assert_ok!(svc.admin_login(login("secret1")).await);
    }

    #[tokio::test]
    async fn logout_revokes_the_token_id() {
        let user = stored_user(Role::User, false);
        let claims = claims_for(&user);
        let mut tokens = token_service();
        tokens.expect_verify().returning(move |_| Ok(claims.clone()));
        let mut blacklist = MockTokenBlacklist::new();
        blacklist
            .expect_revoke()
            .withf(|jti, _| jti.starts_with("jti-1"))
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(MockUserRepository::new(), tokens, blacklist);
        assert_ok!(svc.logout(Some("abc")).await);
    }

    #[tokio::test]
    async fn logout_with_garbage_token_still_succeeds() {
        let mut tokens = token_service();
        tokens
            .expect_verify()
            .returning(|_| Err(DomainError::Unauthorized("invalid token".into())));
        let mut blacklist = MockTokenBlacklist::new();
        blacklist.expect_revoke().never();

        let svc = service(MockUserRepository::new(), tokens, blacklist);
        assert_ok!(svc.logout(Some("garbage")).await);
        assert_ok!(svc.logout(None).await);
    }

    #[tokio::test]
    async fn revoked_token_does_not_authenticate() {
        let user = stored_user(Role::User, false);
        let claims = claims_for(&user);
        let mut tokens = token_service();
        tokens.expect_verify().returning(move |_| Ok(claims.clone()));
        let mut blacklist = MockTokenBlacklist::new();
        blacklist.expect_is_revoked().returning(|_| Ok(true));

        let svc = service(MockUserRepository::new(), tokens, blacklist);
        assert!(matches!(svc.authenticate("t").await, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn authenticate_reloads_user_state() {
        let user = stored_user(Role::User, true);
        let claims = claims_for(&user);
        let mut tokens = token_service();
        tokens.expect_verify().returning(move |_| Ok(claims.clone()));
        let mut blacklist = MockTokenBlacklist::new();
        blacklist.expect_is_revoked().returning(|_| Ok(false));
        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users.expect_find_by_id().returning(move |_| Ok(Some(stored.clone())));

        let svc = service(users, tokens, blacklist);
        assert!(matches!(svc.authenticate("t").await, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn ensure_admin_skips_existing_accounts() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(stored_user(Role::Admin, false))));
        users.expect_insert().never();
        let svc = service(users, token_service(), MockTokenBlacklist::new());

        assert!(!svc.ensure_admin("Root", "ana@example.com", "secret1").await.unwrap());
    }

    #[tokio::test]
    async fn register_keeps_a_hashed_security_answer() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_insert()
            .withf(|u| {
                u.security_question.as_deref() == Some("First pet?")
                    && u.security_answer_hash.as_deref() == Some("hashed:rex")
            })
            .times(1)
            .returning(|_| Ok(()));

        let svc = service(users, token_service(), MockTokenBlacklist::new());
        let input = RegisterInput {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "secret1".into(),
            security_question: Some("First pet?".into()),
            security_answer: Some(" REX ".into()),
        };
        assert_ok!(svc.register(input).await);
    }

    #[tokio::test]
    async fn register_refuses_a_question_without_answer() {
        let mut users = MockUserRepository::new();
        users.expect_insert().never();
        let svc = service(users, token_service(), MockTokenBlacklist::new());
        let input = RegisterInput {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "secret1".into(),
            security_question: Some("First pet?".into()),
            security_answer: Some("  ".into()),
        };
        assert!(matches!(svc.register(input).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn forgot_password_returns_the_question() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(with_security(stored_user(Role::User, false)))));
        let svc = service(users, token_service(), MockTokenBlacklist::new());

        let challenge = svc.forgot_password(ForgotPasswordInput { email: "Ana@Example.com".into() }).await.unwrap();
        assert_eq!(challenge.security_question, "First pet?");
        assert_eq!(challenge.email, "ana@example.com");
    }

    #[tokio::test]
    async fn forgot_password_needs_a_registered_question() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(Some(stored_user(Role::User, false))));
        let svc = service(users, token_service(), MockTokenBlacklist::new());
        let err = svc.forgot_password(ForgotPasswordInput { email: "ana@example.com".into() }).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        let svc = service(users, token_service(), MockTokenBlacklist::new());
        let err = svc.forgot_password(ForgotPasswordInput { email: "ana@example.com".into() }).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));
    }

    #[tokio::test]
    async fn only_the_right_answer_grants_a_reset() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(with_security(stored_user(Role::User, false)))));
        let mut tokens = MockTokenService::new();
        tokens.expect_issue().never();
        tokens
            .expect_issue_reset()
            .times(1)
            .returning(|u| Ok(IssuedToken { token: "reset-token".into(), claims: reset_claims(u) }));
        let svc = service(users, tokens, MockTokenBlacklist::new());

        let answer = |a: &str| SecurityAnswerInput { email: "ana@example.com".into(), security_answer: a.into() };
        let err = svc.verify_security_answer(answer("felix")).await.unwrap_err();
        assert_eq!(err, DomainError::validation("incorrect security answer"));
        let grant = svc.verify_security_answer(answer("  Rex ")).await.unwrap();
        assert_eq!(grant.reset_token, "reset-token");
    }

    #[tokio::test]
    async fn reset_sets_the_password_and_spends_the_token() {
        let user = stored_user(Role::User, false);
        let claims = reset_claims(&user);
        let mut tokens = MockTokenService::new();
        tokens.expect_verify_reset().returning(move |_| Ok(claims.clone()));
        let mut users = MockUserRepository::new();
        let stored = user.clone();
        users.expect_find_by_id().returning(move |_| Ok(Some(stored.clone())));
        users
            .expect_update()
            .withf(|u| u.password_hash == "hashed:brandnew1")
            .times(1)
            .returning(|_| Ok(()));
        let mut blacklist = MockTokenBlacklist::new();
        blacklist.expect_is_revoked().returning(|_| Ok(false));
        blacklist
            .expect_revoke()
            .withf(|jti, _| jti.starts_with("reset-1"))
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(users, tokens, blacklist);
        let reset = PasswordReset { reset_token: "reset-token".into(), password: "brandnew1".into() };
        assert_ok!(svc.reset_password(reset).await);
    }

    #[tokio::test]
    async fn spent_reset_token_is_refused() {
        let user = stored_user(Role::User, false);
        let claims = reset_claims(&user);
        let mut tokens = MockTokenService::new();
        tokens.expect_verify_reset().returning(move |_| Ok(claims.clone()));
        let mut users = MockUserRepository::new();
        users.expect_update().never();
        let mut blacklist = MockTokenBlacklist::new();
        blacklist.expect_is_revoked().returning(|_| Ok(true));

        let svc = service(users, tokens, blacklist);
        let reset = PasswordReset { reset_token: "reset-token".into(), password: "brandnew1".into() };
        assert!(matches!(svc.reset_password(reset).await, Err(DomainError::Unauthorized(_))));
    }
}
