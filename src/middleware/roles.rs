use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::models::{auth::AuthenticatedUser, user::UserRole};

pub const ADMIN: &[UserRole] = &[UserRole::Admin];
pub const FRONT_DESK: &[UserRole] = &[UserRole::Admin, UserRole::Receptionist];
pub const CLINICAL: &[UserRole] = &[UserRole::Admin, UserRole::Therapist];
pub const THERAPIST: &[UserRole] = &[UserRole::Therapist];
pub const PATIENT: &[UserRole] = &[UserRole::Patient];
pub const ANY_USER: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Therapist,
    UserRole::Receptionist,
    UserRole::Patient,
];

/// Route-group guard: rejects requests whose token role is not in `allowed`.
///
/// Use with `axum::middleware::from_fn_with_state(roles::ADMIN, require_roles)`.
/// The decoded user is left in request extensions for the handlers.
pub async fn require_roles(
    State(allowed): State<&'static [UserRole]>,
    user: AuthenticatedUser,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<Value>)> {
    if !allowed.contains(&user.role) {
        tracing::debug!("user {} with role {} denied", user.user_id, user.role);
        return Err((StatusCode::FORBIDDEN, Json(json!({ "error": "Erişim reddedildi" }))));
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{middleware::auth::JwtSecret, services::auth::AuthService};

    const SECRET: &str = "test-secret";

    fn app() -> Router {
        Router::new()
            .route("/admin-only", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(ADMIN, require_roles))
            .layer(Extension(JwtSecret(SECRET.to_string())))
    }

    async fn status_for(token: Option<String>) -> StatusCode {
        let mut req = HttpRequest::builder().uri("/admin-only");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        app()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    fn token_for(role: UserRole) -> String {
        AuthService::generate_access_token(Uuid::new_v4(), role, SECRET, 300).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_role_is_forbidden() {
        assert_eq!(status_for(Some(token_for(UserRole::Patient))).await, StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(Some(token_for(UserRole::Receptionist))).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn allowed_role_passes() {
        assert_eq!(status_for(Some(token_for(UserRole::Admin))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn forged_token_is_unauthorized() {
        let forged =
            AuthService::generate_access_token(Uuid::new_v4(), UserRole::Admin, "nope", 300).unwrap();
        assert_eq!(status_for(Some(forged)).await, StatusCode::UNAUTHORIZED);
    }
}
