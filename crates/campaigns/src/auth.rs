//! Bearer token authentication.
//!
//! Development: in-memory users with plaintext credentials, random session
//! tokens. Production: replace with JWT + an identity provider
//! (jsonwebtoken crate + Auth0/Ory) behind the same middleware.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use siscoca_core::error::{SiscocaError, SiscocaResult};
use std::sync::Arc;
use tracing::info;

use crate::models::{ChangePasswordRequest, ErrorResponse, LoginRequest, LoginResponse, Role, User};

/// Token prefix so stray tokens are recognizable in logs.
const TOKEN_PREFIX: &str = "sc_";

pub struct AuthService {
    users: DashMap<String, User>,
    /// token → username
    tokens: DashMap<String, String>,
}

impl AuthService {
    /// Seeds the development accounts: one per role.
    pub fn new() -> Self {
        let service = Self {
            users: DashMap::new(),
            tokens: DashMap::new(),
        };
        service.seed_user("admin", "Administrator", "AD", Role::Admin, "admin");
        service.seed_user("gflores", "Gabriela Flores", "GF", Role::Owner, "siscoca2024");
        service.seed_user("mruiz", "Marco Ruiz", "MR", Role::Trafficker, "siscoca2024");
        service
    }

    fn seed_user(&self, username: &str, display_name: &str, initials: &str, role: Role, password: &str) {
        self.users.insert(
            username.to_string(),
            User {
                username: username.to_string(),
                display_name: display_name.to_string(),
                initials: initials.to_string(),
                role,
                password: password.to_string(),
            },
        );
    }

    /// Validate a login request and issue a bearer token.
    pub fn login(&self, req: &LoginRequest) -> SiscocaResult<LoginResponse> {
        let user = self
            .users
            .get(&req.username)
            .filter(|u| u.value().password == req.password)
            .map(|u| u.value().clone())
            .ok_or_else(|| SiscocaError::Auth("invalid credentials".to_string()))?;

        let token = generate_token();
        self.tokens.insert(token.clone(), user.username.clone());
        info!(user = %user.username, "User logged in");
        Ok(LoginResponse {
            token,
            user: user.username,
            role: user.role,
            expires_at: Utc::now() + Duration::hours(24),
        })
    }

    /// Rotate a password; all of the user's outstanding tokens are revoked.
    pub fn change_password(&self, req: &ChangePasswordRequest) -> SiscocaResult<()> {
        {
            let mut user = self
                .users
                .get_mut(&req.username)
                .filter(|u| u.value().password == req.current_password)
                .ok_or_else(|| SiscocaError::Auth("invalid credentials".to_string()))?;
            if req.new_password.trim().len() < 6 {
                return Err(SiscocaError::Validation(
                    "new password must be at least 6 characters".to_string(),
                ));
            }
            user.value_mut().password = req.new_password.clone();
        }
        let stale: Vec<String> = self
            .tokens
            .iter()
            .filter(|t| t.value() == &req.username)
            .map(|t| t.key().clone())
            .collect();
        for token in stale {
            self.tokens.remove(&token);
        }
        info!(user = %req.username, "Password changed, sessions revoked");
        Ok(())
    }

    /// Username behind a bearer token, if the token is live.
    pub fn validate(&self, token: &str) -> Option<String> {
        self.tokens.get(token).map(|t| t.value().clone())
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    format!(
        "{}{}",
        TOKEN_PREFIX,
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    )
}

/// Axum middleware that checks for a valid bearer token.
/// Skips auth for the login endpoint and operational probes.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if path.ends_with("/auth/login")
        || path.starts_with("/health")
        || path.starts_with("/ready")
        || path.starts_with("/live")
    {
        return next.run(req).await;
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") => {
            let token = &value[7..];
            if auth.validate(token).is_some() {
                next.run(req).await
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "invalid_token".to_string(),
                        message: "Invalid or expired bearer token".to_string(),
                    }),
                )
                    .into_response()
            }
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "missing_auth".to_string(),
                message: "Authorization header with Bearer token required".to_string(),
            }),
        )
            .into_response(),
    }
}
