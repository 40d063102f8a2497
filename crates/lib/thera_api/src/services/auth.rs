//! Authentication service: registration, password and federated login, and
//! refresh, delegating token work to `thera_core::auth`.

use thera_core::auth::password::{check_password, hash_password};
use thera_core::auth::session::{issue_session, lookup_refresh};
use thera_core::auth::tokens::TokenPair;
use thera_core::cache::{self, THREAD_TTL, keys};
use thera_core::identity::IdentityError;
use thera_core::models::user::{NewUser, ProviderFlag, User, UserWithPassword};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{RegisterRequest, TokenResponse};

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        TokenResponse {
            access_token: pair.access.plaintext,
            refresh_token: pair.refresh.plaintext,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Minimal address check: one `@`, non-empty local part and domain, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
}

/// Check a registration form.
pub fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation(
            "Field 'email' must contain a valid email address".into(),
        ));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Field 'password' must be filled".into()));
    }
    if req.password != req.re_password {
        return Err(AppError::Validation(
            "Fields 'password' and 'rePassword' must match".into(),
        ));
    }
    if req.name.is_empty() {
        return Err(AppError::Validation("Field 'name' must be filled".into()));
    }
    if req.surname.is_empty() {
        return Err(AppError::Validation("Field 'surname' must be filled".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create an assistant thread for a new account. Failure leaves the account
/// without one; the thread binder creates it on first use.
async fn initial_thread(state: &AppState) -> String {
    match state.assistant.create_thread().await {
        Ok(thread) => thread,
        Err(e) => {
            warn!(error = %e, "could not create thread for new account");
            String::new()
        }
    }
}

fn provider_linked(user: &User, flag: ProviderFlag) -> bool {
    match flag {
        ProviderFlag::Google => user.is_google,
        ProviderFlag::Apple => user.is_apple,
    }
}

fn link_provider(user: &mut User, flag: ProviderFlag) {
    match flag {
        ProviderFlag::Google => user.is_google = true,
        ProviderFlag::Apple => user.is_apple = true,
    }
}

/// Issue a session and, when the user has a thread, warm its cache entry.
async fn start_session(state: &AppState, user: &User) -> AppResult<TokenResponse> {
    let pair = issue_session(state.cache.as_ref(), user, &state.config.secrets).await?;
    if user.has_thread() {
        cache::set_json(
            state.cache.as_ref(),
            &keys::thread(user.id),
            &user.thread,
            THREAD_TTL,
        )
        .await?;
    }
    Ok(pair.into())
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Register a local account and sign it in.
pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<TokenResponse> {
    validate_registration(&req)?;

    let mut existing = state.users.find_by_email(&req.email).await?;
    if existing.is_none() && !req.phone.is_empty() {
        existing = state.users.find_by_phone(&req.phone).await?;
    }
    if existing.is_some() {
        return Err(AppError::Validation("User already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let thread = initial_thread(state).await;

    let user = state
        .users
        .create(NewUser {
            phone: req.phone,
            email: req.email,
            password_hash: Some(password_hash),
            name: req.name,
            surname: req.surname,
            thread,
            ..NewUser::default()
        })
        .await?;
    info!(user_id = %user.id, "user registered");

    start_session(state, &user).await
}

/// Sign in with phone number and password.
pub async fn login_phone(
    state: &AppState,
    phone: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    if phone.is_empty() {
        return Err(AppError::Validation("Field 'phone' must be filled".into()));
    }
    let found = state.users.find_by_phone(phone).await?;
    login_with_password(state, found, password).await
}

/// Sign in with email address and password.
pub async fn login_email(
    state: &AppState,
    email: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    if email.is_empty() {
        return Err(AppError::Validation("Field 'email' must be filled".into()));
    }
    let found = state.users.find_by_email(email).await?;
    login_with_password(state, found, password).await
}

async fn login_with_password(
    state: &AppState,
    found: Option<UserWithPassword>,
    password: &str,
) -> AppResult<TokenResponse> {
    // Unknown account and wrong password are indistinguishable to the caller.
    let Some(found) = found else {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };
    check_password(password, found.password_hash.as_deref())?;
    start_session(state, &found.user).await
}

/// Exchange a refresh token for a new pair. The presented token stays valid
/// until it expires.
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<TokenResponse> {
    let snapshot = lookup_refresh(state.cache.as_ref(), refresh_token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user = state
        .users
        .get_by_id(snapshot.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let pair = issue_session(state.cache.as_ref(), &user, &state.config.secrets).await?;
    Ok(pair.into())
}

/// Sign in with a federated identity, creating or linking the account by email.
pub async fn firebase_login(state: &AppState, id_token: &str) -> AppResult<TokenResponse> {
    let provider = state
        .identity
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Federated login is not configured".into()))?;

    if id_token.is_empty() {
        return Err(AppError::Validation("Field 'idToken' must be filled".into()));
    }

    let identity = provider.verify(id_token).await?;
    if identity.email.is_empty() {
        return Err(AppError::Validation(
            "Federated account has no email address".into(),
        ));
    }
    // Accounts are matched by email, so an unconfirmed address proves nothing.
    if !identity.email_verified {
        warn!(provider = %identity.provider, "federated login with unverified email");
        return Err(IdentityError::InvalidCredential("email not verified".into()).into());
    }
    let flag = identity.provider_flag();

    let user = match state.users.find_by_email(&identity.email).await? {
        Some(found) => {
            let mut user = found.user;
            if let Some(flag) = flag
                && !provider_linked(&user, flag)
            {
                state.users.set_provider_flag(user.id, flag).await?;
                link_provider(&mut user, flag);
                info!(user_id = %user.id, provider = %identity.provider, "provider linked");
            }
            user
        }
        None => {
            let thread = initial_thread(state).await;
            let user = state
                .users
                .create(NewUser {
                    email: identity.email,
                    name: identity.name,
                    is_google: flag == Some(ProviderFlag::Google),
                    is_apple: flag == Some(ProviderFlag::Apple),
                    thread,
                    ..NewUser::default()
                })
                .await?;
            info!(
                user_id = %user.id,
                provider = %identity.provider,
                "user created from federated login"
            );
            user
        }
    };

    start_session(state, &user).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegisterRequest {
        RegisterRequest {
            email: "ada@example.com".into(),
            phone: "+15550100".into(),
            password: "hunter22".into(),
            re_password: "hunter22".into(),
            name: "Ada".into(),
            surname: "Lovelace".into(),
        }
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a@b"));
        assert!(!is_valid_email("ada.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("a@b@c"));
        assert!(!is_valid_email("ada @example.com"));
    }

    #[test]
    fn valid_form_passes() {
        assert!(validate_registration(&form()).is_ok());
    }

    #[test]
    fn form_field_errors() {
        let cases: Vec<(RegisterRequest, &str)> = vec![
            (RegisterRequest { email: "nope".into(), ..form() }, "email"),
            (RegisterRequest { re_password: "other".into(), ..form() }, "rePassword"),
            (RegisterRequest { name: String::new(), ..form() }, "name"),
            (RegisterRequest { surname: String::new(), ..form() }, "surname"),
            (
                RegisterRequest {
                    password: String::new(),
                    re_password: String::new(),
                    ..form()
                },
                "password",
            ),
        ];
        for (req, field) in cases {
            match validate_registration(&req) {
                Err(AppError::Validation(msg)) => assert!(msg.contains(field), "{msg}"),
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }
    }
}
