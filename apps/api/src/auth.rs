//! Request authentication.
//!
//! An upstream gateway verifies the user's session and forwards the principal
//! id in `X-User-Id`. When `GATEWAY_SECRET` is configured the gateway must
//! also present it in `X-Gateway-Secret`, so a client cannot reach the API
//! directly with a forged principal.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";

/// Extractor for authenticated requests. Rejects with `Unauthorized` when no
/// principal was forwarded or the gateway secret does not match.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(expected) = state.config.gateway_secret.as_deref() {
            let presented = header_str(parts, GATEWAY_SECRET_HEADER).unwrap_or("");
            if !constant_time_compare(presented, expected) {
                warn!("Rejected request with missing or invalid gateway secret");
                return Err(AppError::Unauthorized);
            }
        }

        let user_id = header_str(parts, USER_ID_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            user_id: user_id.to_string(),
        })
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Compares two secrets without short-circuiting on the first differing byte.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut diff = u8::from(a.len() != b.len());
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
