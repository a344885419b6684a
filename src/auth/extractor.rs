use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::session::{self, COOKIE_NAME};
use crate::error::AppError;
use crate::models::PrivilegeSet;
use crate::state::SharedState;

/// The user behind a valid session cookie.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub username: String,
    pub session_id: Uuid,
    pub privileges: PrivilegeSet,
}

impl SessionUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.privileges.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Access denied. Admin privileges required.".to_string(),
            ))
        }
    }

    pub fn require_report_editor(&self) -> Result<(), AppError> {
        if self.privileges.can_edit_reports() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Access denied. Only supervisors and admins can edit reports.".to_string(),
            ))
        }
    }
}

impl FromRequestParts<SharedState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar
            .get(COOKIE_NAME)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let claims = session::decode_token(cookie.value(), &state.config.session_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        // Privileges come from the store, never from the session.
        let Some(privileges) = state.users.privileges(&claims.sub).await else {
            tracing::warn!("Rejected session for removed user {}", claims.sub);
            return Err(AppError::Unauthorized("Not authenticated".to_string()));
        };

        Ok(SessionUser {
            username: claims.sub,
            session_id: claims.sid,
            privileges,
        })
    }
}
