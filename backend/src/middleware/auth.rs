//! Authentication middleware
//!
//! Verifies the bearer token issued by the account service and exposes the
//! caller's role and farmer/vendor identity to handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{UserRole, WalletOwner};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    /// Farmer or vendor profile id for those roles
    pub actor_id: Option<Uuid>,
}

impl AuthUser {
    /// Fail with `Forbidden` unless the caller has one of `roles`
    pub fn require_role(&self, roles: &[UserRole]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} may not perform this action",
                self.role
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// The wallet this caller owns
    pub fn wallet_owner(&self) -> AppResult<WalletOwner> {
        match (self.role, self.actor_id) {
            (UserRole::Admin, _) => Ok(WalletOwner::Admin),
            (UserRole::Farmer, Some(id)) => Ok(WalletOwner::Farmer(id)),
            (UserRole::Vendor, Some(id)) => Ok(WalletOwner::Vendor(id)),
            (UserRole::Farmer | UserRole::Vendor, None) => Err(AppError::Forbidden(
                "Token carries no farmer or vendor profile".to_string(),
            )),
            (UserRole::Customer, _) => {
                Err(AppError::Forbidden("Customers do not hold wallets".to_string()))
            }
        }
    }

    /// Vendor profile id of a vendor caller
    pub fn vendor_id(&self) -> AppResult<Uuid> {
        match (self.role, self.actor_id) {
            (UserRole::Vendor, Some(id)) => Ok(id),
            _ => Err(AppError::Forbidden(
                "Only vendors can select stock".to_string(),
            )),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Sign `claims` with HS256
pub fn issue_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let actor_id = match claims.actor_id.as_deref().map(Uuid::parse_str).transpose() {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid actor ID in token"),
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.role,
        actor_id,
    });

    next.run(request).await
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

fn unauthorized_body(message: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            field: None,
        },
    })
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, unauthorized_body(message)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    unauthorized_body("Authentication required"),
                )
            })
    }
}
