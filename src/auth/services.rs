use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{
    jwt::{JwtKeys, TokenError},
    password::{hash_password, verify_password, PasswordError},
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    /// Verified against when the email is unknown, so both login failures cost one hash check.
    static ref DUMMY_HASH: Option<String> = hash_password("dummy-password-for-timing").ok();
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    Unauthorized,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("token signing failed: {0}")]
    Signing(#[source] TokenError),
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

fn store_err(context: &'static str) -> impl FnOnce(StoreError) -> AuthError {
    move |source| AuthError::Store { context, source }
}

/// Credential checks and token lifecycle on top of a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    /// The existence check is an early exit; the store's unique index is what
    /// actually rejects a concurrent duplicate.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let exists = self
            .users
            .exists_by_email(email)
            .await
            .map_err(store_err("check email availability"))?;
        if exists {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(NewUser {
                email: email.to_owned(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::DuplicateEmail => {
                    warn!(email = %email, "duplicate email caught by unique index");
                    AuthError::DuplicateEmail
                }
                other => store_err("create user")(other),
            })?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(store_err("look up user by email"))?;

        let user = match user {
            Some(u) if verify_password(password, &u.password_hash) => u,
            Some(u) => {
                warn!(user_id = %u.id, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(password, dummy);
                }
                warn!(email = %email, "login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.keys.issue(user.id).map_err(|e| {
            error!(error = %e, user_id = %user.id, "jwt sign failed");
            AuthError::Signing(e)
        })?;

        info!(user_id = %user.id, "user logged in");
        Ok((user, token))
    }

    pub fn validate_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.keys.verify(token).map_err(|e| {
            debug!(error = %e, "token validation failed");
            AuthError::Unauthorized
        })
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(id)
            .await
            .map_err(store_err("look up user by id"))?
            .ok_or(AuthError::NotFound)
    }
}
