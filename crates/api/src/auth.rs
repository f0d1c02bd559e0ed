use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, error};

use crate::error::ApiError;
use crate::state::AppState;
use crate::token::decode_jwt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequiredRole {
    Authenticated,
    Admin,
}

fn extract_bearer_token<B>(request: &Request<B>) -> Option<String> {
    let auth_header = request.headers().get("Authorization")?;
    let auth_value = auth_header.to_str().ok()?;

    auth_value.strip_prefix("Bearer ").map(|token| token.trim().to_string())
}

#[derive(Clone)]
pub struct AuthLayer {
    app_state: AppState,
    required_role: RequiredRole,
}

impl AuthLayer {
    pub fn new(app_state: AppState, required_role: RequiredRole) -> Self {
        Self {
            app_state,
            required_role,
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            app_state: self.app_state.clone(),
            required_role: self.required_role,
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    app_state: AppState,
    required_role: RequiredRole,
}

impl<S, B> Service<Request<B>> for AuthService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let required_role = self.required_role;
        let app_state = self.app_state.clone();

        Box::pin(async move {
            let Some(token) = extract_bearer_token(&request) else {
                return Ok(ApiError::Unauthorized("missing token".to_string()).into_response());
            };

            let claims = match decode_jwt(&app_state.settings, &token) {
                Ok(claims) => claims,
                Err(err) => return Ok(err.into_response()),
            };

            let Ok(user_id) = uuid::Uuid::parse_str(&claims.sub) else {
                return Ok(ApiError::Unauthorized("invalid token".to_string()).into_response());
            };

            let user = match app_state.repo.users.find_by_id(user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    return Ok(ApiError::Unauthorized("unknown user".to_string()).into_response());
                }
                Err(err) => {
                    error!("Failed to load user {user_id}: {err}");
                    return Ok(ApiError::InternalFailure().into_response());
                }
            };

            if required_role == RequiredRole::Admin && !user.is_admin() {
                return Ok(
                    ApiError::Forbidden("insufficient permissions".to_string()).into_response()
                );
            }

            debug!("Authenticated user {}", user.id);
            request.extensions_mut().insert(user);
            inner.call(request).await
        })
    }
}
