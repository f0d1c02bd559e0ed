use axum::{Json, extract::State, extract::rejection::JsonRejection};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::{error::ApiError, state::AppState};
use common::settings::Settings;
use data::user::User;

pub const AUDIENCE: &str = "crash-reporter";

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // User id
    pub username: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn generate_jwt(settings: &Settings, user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let expiration = now + Duration::minutes(settings.auth.token_validity_in_minutes);

    let claims = JwtClaims {
        sub: user.id.to_string(),
        username: user.username.clone().unwrap_or_default(),
        role: user.role.to_string(),
        iss: settings.server.url.clone(),
        aud: AUDIENCE.to_string(),
        exp: expiration.timestamp(),
        iat: now.timestamp(),
    };

    let encoding_key = EncodingKey::from_secret(settings.auth.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &encoding_key).map_err(|err| {
        error!("Failed to encode JWT token: {}", err);
        ApiError::InternalFailure()
    })
}

pub fn decode_jwt(settings: &Settings, token: &str) -> Result<JwtClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);
    validation.set_issuer(&[settings.server.url.as_str()]);

    let decoding_key = DecodingKey::from_secret(settings.auth.jwt_secret.as_bytes());
    decode::<JwtClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|err| {
            warn!("Rejected JWT token: {}", err);
            ApiError::Unauthorized("invalid token".to_string())
        })
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.settings.auth.local_auth_enabled {
        return Err(ApiError::Forbidden("local authentication is disabled".to_string()));
    }

    let Json(request) = payload?;
    let user = state
        .users()
        .authenticate_local(&request.username, &request.password)
        .await?;

    let token = generate_jwt(&state.settings, &user)?;
    info!("Issued token for user {}", user.id);

    Ok(Json(serde_json::json!({ "token": token })))
}
