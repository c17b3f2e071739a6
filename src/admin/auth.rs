use std::sync::Arc;

use axum::{
	extract::{Request, State},
	middleware::Next,
	response::Response,
	Json,
};
use chrono::{DateTime, Duration, Utc};
use hyper::header::AUTHORIZATION;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde_json::{json, Value};

use crate::{
	config::Config,
	error::{success, AppError, AppResult},
	extract::AppJson,
};

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
	pub sub: String,
	pub role: String,
	pub iat: i64,
	pub exp: i64,
}

#[derive(serde::Deserialize)]
pub struct Credentials {
	username: String,
	password: String,
}

pub struct AuthKeys {
	encoding: EncodingKey,
	decoding: DecodingKey,
	username: String,
	password: Option<String>,
	ttl: Duration,
}

impl AuthKeys {
	pub fn new(config: &Config) -> Self {
		Self {
			encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
			decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
			username: config.admin_username.clone(),
			password: config.admin_password.clone(),
			ttl: Duration::hours(config.token_ttl_hours),
		}
	}

	pub fn check_credentials(&self, username: &str, password: &str) -> bool {
		let Some(expected) = &self.password else {
			return false;
		};
		let user_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
		let pass_ok = constant_time_eq(password.as_bytes(), expected.as_bytes());
		user_ok & pass_ok
	}

	pub fn issue(&self, now: DateTime<Utc>) -> AppResult<(String, DateTime<Utc>)> {
		let expires_at = now + self.ttl;
		let claims = Claims {
			sub: self.username.clone(),
			role: ADMIN_ROLE.to_string(),
			iat: now.timestamp(),
			exp: expires_at.timestamp(),
		};
		let token = encode(&Header::default(), &claims, &self.encoding).map_err(|e| AppError::Internal(e.to_string()))?;
		Ok((token, expires_at))
	}

	pub fn verify(&self, token: &str) -> AppResult<Claims> {
		let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
			warn!("Rejected admin token: {e}");
			AppError::Unauthorized
		})?;
		if data.claims.role != ADMIN_ROLE {
			return Err(AppError::Unauthorized);
		}
		Ok(data.claims)
	}
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn login(keys: State<Arc<AuthKeys>>, credentials: AppJson<Credentials>) -> AppResult<Json<Value>> {
	let credentials = credentials.0;
	if !keys.check_credentials(&credentials.username, &credentials.password) {
		warn!("Failed admin login for '{}'", credentials.username);
		return Err(AppError::Unauthorized);
	}

	let (token, expires_at) = keys.issue(Utc::now())?;
	info!("Admin '{}' logged in", credentials.username);
	Ok(success(json!({ "token": token, "expires_at": expires_at })))
}

pub async fn require_admin(keys: State<Arc<AuthKeys>>, request: Request, next: Next) -> Result<Response, AppError> {
	let token = request
		.headers()
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "))
		.ok_or(AppError::Unauthorized)?;

	keys.verify(token.trim())?;
	Ok(next.run(request).await)
}
