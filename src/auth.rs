//! Optional bearer-token guard for the `/mcp` routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{errors::AppError, AppState};

/// Passes every request through when no token is configured.
pub async fn require_bearer_token(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.api_token.as_deref() {
        let presented = auth_header.as_ref().map(|TypedHeader(auth)| auth.token());
        check_bearer(expected, presented)?;
    }

    Ok(next.run(request).await)
}

fn check_bearer(expected: &str, presented: Option<&str>) -> Result<(), AppError> {
    match presented {
        None => Err(AppError::unauthorized(
            "missing_token",
            "missing authorization header",
        )),
        Some(token) if tokens_match(expected.as_bytes(), token.as_bytes()) => Ok(()),
        Some(_) => Err(AppError::unauthorized("invalid_token", "invalid bearer token")),
    }
}

/// Length-independent comparison so a mismatch position is not observable through timing.
fn tokens_match(expected: &[u8], presented: &[u8]) -> bool {
    let longest = expected.len().max(presented.len());
    let mut diff = expected.len() ^ presented.len();
    for index in 0..longest {
        let a = expected.get(index).copied().unwrap_or(0);
        let b = presented.get(index).copied().unwrap_or(0);
        diff |= usize::from(a ^ b);
    }
    diff == 0
}
