use axum::{
	extract::{
		multipart::MultipartRejection,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	response::{IntoResponse, Response},
	Json,
};
use hyper::StatusCode;
use log::error;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::schema::BOOKING_OVERLAP_CONSTRAINT;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
	#[error("{0}")]
	BadRequest(String),

	#[error("Validation failed")]
	Validation(Vec<String>),

	#[error("Unauthorized")]
	Unauthorized,

	#[error("{0} not found")]
	NotFound(&'static str),

	#[error("{0}")]
	Conflict(String),

	#[error("Database error: {0}")]
	Database(tokio_postgres::Error),

	#[error("Image error: {0}")]
	Image(#[from] image::ImageError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Maps constraint violations that a client can cause to a conflict.
fn constraint_conflict(code: &SqlState, constraint: Option<&str>) -> Option<AppError> {
	if *code == SqlState::UNIQUE_VIOLATION {
		let constraint = constraint.unwrap_or("unique key");
		return Some(AppError::Conflict(format!("A record with the same value already exists ({constraint})")));
	}
	if *code == SqlState::EXCLUSION_VIOLATION {
		return Some(AppError::Conflict(match constraint {
			Some(BOOKING_OVERLAP_CONSTRAINT) => "The vehicle is already booked for these dates".to_string(),
			Some(other) => format!("The record overlaps an existing one ({other})"),
			None => "The record overlaps an existing one".to_string(),
		}));
	}
	None
}

impl From<tokio_postgres::Error> for AppError {
	fn from(e: tokio_postgres::Error) -> Self {
		if let Some(code) = e.code() {
			let constraint = e.as_db_error().and_then(|db| db.constraint());
			if let Some(conflict) = constraint_conflict(code, constraint) {
				return conflict;
			}
		}
		AppError::Database(e)
	}
}

macro_rules! bad_request_from {
	($($rejection:ty),* $(,)?) => {
		$(
			impl From<$rejection> for AppError {
				fn from(rejection: $rejection) -> Self {
					AppError::BadRequest(rejection.body_text())
				}
			}
		)*
	};
}

bad_request_from!(JsonRejection, QueryRejection, PathRejection, MultipartRejection);

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
			AppError::Unauthorized => StatusCode::UNAUTHORIZED,
			AppError::NotFound(_) => StatusCode::NOT_FOUND,
			AppError::Conflict(_) => StatusCode::CONFLICT,
			AppError::Database(_) | AppError::Image(_) | AppError::Io(_) | AppError::Internal(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status();
		let body = match &self {
			AppError::Validation(fields) => json!({
				"success": false,
				"error": self.to_string(),
				"fields": fields,
			}),
			_ if status.is_server_error() => {
				error!("{self}");
				json!({ "success": false, "error": "Internal server error" })
			}
			_ => json!({ "success": false, "error": self.to_string() }),
		};

		(status, Json(body)).into_response()
	}
}

/// Wraps a JSON object in the `{"success": true, ...}` envelope.
pub fn success(body: Value) -> Json<Value> {
	let mut envelope = json!({ "success": true });
	if let (Some(target), Value::Object(fields)) = (envelope.as_object_mut(), body) {
		target.extend(fields);
	}
	Json(envelope)
}
