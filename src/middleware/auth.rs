use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::user::Role;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(Role::Admin.as_str()))
    }

    /// Admins read every student; students read only themselves.
    pub fn may_read_student(&self, student_id: &str) -> bool {
        self.is_admin() || self.sub == student_id
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "success": false, "error": code }))).into_response()
}

fn bearer_token(req: &Request) -> Result<String, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };
    Ok(token.trim().to_string())
}

async fn authorize(state: AppState, mut req: Request, next: Next, allowed: &[Role]) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token,
        Err(response) => return response,
    };
    match state.auth_service.verify(&token) {
        Ok(claims) => {
            let role = claims.role.clone().unwrap_or_default();
            if !allowed.is_empty() && !allowed.iter().any(|r| r.as_str().eq_ignore_ascii_case(&role)) {
                return reject(StatusCode::FORBIDDEN, "forbidden");
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(_) => reject(StatusCode::UNAUTHORIZED, "invalid_token"),
    }
}

pub async fn require_bearer_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    authorize(state, req, next, &[]).await
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    authorize(state, req, next, &[Role::Admin]).await
}
