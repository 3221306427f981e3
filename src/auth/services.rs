use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, SessionContext};
use super::jwt::{JwtKeys, TokenKind};
use super::password::{hash_password, password_policy_violation, verify_password};
use crate::error::AppError;
use crate::store::{Profile, Store, StoreError, User};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

/// Creates the account, its default profile and a first session.
pub async fn register(
    store: &dyn Store,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim();

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if let Some(reason) = password_policy_violation(&req.password) {
        return Err(AppError::validation(reason));
    }
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }

    let hash = hash_password(&req.password)?;
    let user = store.create_user(&email, name, &hash).await.map_err(|e| {
        if matches!(e, StoreError::Conflict(_)) {
            warn!(%email, "email already registered");
        }
        AppError::from(e)
    })?;

    let profile = ensure_profile(store, &user).await?;
    let response = open_session(store, keys, user, Some(profile)).await?;
    info!(user_id = %response.user.id, "user registered");
    Ok(response)
}

pub async fn login(
    store: &dyn Store,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid_credentials());
    };
    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let profile = ensure_profile(store, &user).await?;
    let response = open_session(store, keys, user, Some(profile)).await?;
    info!(user_id = %response.user.id, "user logged in");
    Ok(response)
}

/// Issues a fresh pair for a session that is still live.
pub async fn refresh(
    store: &dyn Store,
    keys: &JwtKeys,
    refresh_token: &str,
) -> Result<AuthResponse, AppError> {
    let claims = keys
        .verify_kind(refresh_token, TokenKind::Refresh)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let live = store
        .get_session(claims.sid)
        .await?
        .filter(|s| s.user_id == claims.sub && s.expires_at > OffsetDateTime::now_utc());
    if live.is_none() {
        return Err(AppError::Unauthorized("Session has ended".into()));
    }

    let user = store
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let pair = keys.sign_pair(user.id, claims.sid)?;
    let profile = store.get_profile(user.id).await?;
    Ok(AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: user.into(),
        profile,
    })
}

pub async fn logout(store: &dyn Store, user_id: Uuid, session_id: Uuid) -> Result<(), AppError> {
    store.delete_session(session_id).await?;
    info!(%user_id, %session_id, "user logged out");
    Ok(())
}

pub async fn session_context(store: &dyn Store, user_id: Uuid) -> Result<SessionContext, AppError> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let profile = match store.get_profile(user_id).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, %user_id, "profile fetch failed; continuing without it");
            None
        }
    };
    Ok(SessionContext {
        is_authenticated: true,
        user: user.into(),
        profile,
    })
}

/// Loads the profile, creating the default one if signup never got that far.
pub(crate) async fn ensure_profile(store: &dyn Store, user: &User) -> Result<Profile, AppError> {
    if let Some(p) = store.get_profile(user.id).await? {
        return Ok(p);
    }
    let profile = Profile::new(user.id, &user.name, OffsetDateTime::now_utc());
    match store.create_profile(&profile).await {
        Ok(p) => Ok(p),
        Err(StoreError::Conflict(_)) => store
            .get_profile(user.id)
            .await?
            .ok_or(AppError::NotFound("profile")),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "create profile failed");
            Err(e.into())
        }
    }
}

async fn open_session(
    store: &dyn Store,
    keys: &JwtKeys,
    user: User,
    profile: Option<Profile>,
) -> Result<AuthResponse, AppError> {
    let session = store.create_session(user.id, keys.session_expiry()).await?;
    let pair = keys.sign_pair(user.id, session.id)?;
    Ok(AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: PublicUser::from(user),
        profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::store::MemoryStore;

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "test".into(),
            issuer: "road2".into(),
            audience: "road2-patients".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    fn signup(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "Str0ng-enough".into(),
            name: "Pat Doe".into(),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("pat@example.com"));
        assert!(!is_valid_email("pat@example"));
        assert!(!is_valid_email("pat example.com"));
    }

    #[tokio::test]
    async fn register_creates_default_profile() {
        let store = MemoryStore::new();
        let res = register(&store, &keys(), signup("  Pat@Example.com ")).await.unwrap();
        assert_eq!(res.user.email, "pat@example.com");
        let profile = res.profile.expect("profile");
        assert_eq!(profile.name, "Pat Doe");
        assert_eq!(profile.current_week, 1);
        assert_eq!(profile.ultimate_goal, "");
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_readable_conflict() {
        let store = MemoryStore::new();
        register(&store, &keys(), signup("pat@example.com")).await.unwrap();
        let err = register(&store, &keys(), signup("pat@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[tokio::test]
    async fn login_rejects_bad_password() {
        let store = MemoryStore::new();
        register(&store, &keys(), signup("pat@example.com")).await.unwrap();
        let err = login(
            &store,
            &keys(),
            LoginRequest {
                email: "pat@example.com".into(),
                password: "wrong-password".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn refresh_stops_working_after_logout() {
        let store = MemoryStore::new();
        let keys = keys();
        let res = register(&store, &keys, signup("pat@example.com")).await.unwrap();
        let refreshed = refresh(&store, &keys, &res.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.id, res.user.id);

        let claims = keys.verify(&res.access_token).unwrap();
        logout(&store, claims.sub, claims.sid).await.unwrap();
        assert!(matches!(
            refresh(&store, &keys, &res.refresh_token).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
