//! Request extractors whose rejections use the `{"success": false}` envelope.

use std::ops::Deref;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

impl<T> Deref for AppJson<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T> Deref for AppQuery<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use axum::{body::Body, http::Request, routing::post, Router};
	use hyper::StatusCode;
	use serde_json::Value;
	use tower::ServiceExt;
	use uuid::Uuid;

	use super::*;

	#[derive(serde::Deserialize)]
	struct Params {
		count: u32,
	}

	async fn echo(AppPath(id): AppPath<Uuid>, params: AppQuery<Params>, body: AppJson<Value>) -> String {
		format!("{id} {} {}", params.count, body.0)
	}

	fn app() -> Router {
		Router::new().route("/items/:id", post(echo))
	}

	fn request(uri: &str, content_type: &str, body: &'static str) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri(uri)
			.header("content-type", content_type)
			.body(Body::from(body))
			.unwrap()
	}

	async fn rejected(request: Request<Body>) -> Value {
		let response = app().oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let json: Value = serde_json::from_slice(&body).unwrap();
		assert_eq!(json["success"], false);
		json
	}

	#[tokio::test]
	async fn well_formed_requests_pass_through() {
		let id = Uuid::new_v4();
		let response = app()
			.oneshot(request(&format!("/items/{id}?count=3"), "application/json", "{\"a\":1}"))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
		assert_eq!(std::str::from_utf8(&body).unwrap(), format!("{id} 3 {{\"a\":1}}"));
	}

	#[tokio::test]
	async fn bad_path_is_enveloped() {
		rejected(request("/items/not-a-uuid?count=3", "application/json", "{}")).await;
	}

	#[tokio::test]
	async fn bad_query_is_enveloped() {
		let id = Uuid::new_v4();
		rejected(request(&format!("/items/{id}?count=many"), "application/json", "{}")).await;
	}

	#[tokio::test]
	async fn bad_json_is_enveloped() {
		let id = Uuid::new_v4();
		let json = rejected(request(&format!("/items/{id}?count=3"), "application/json", "{not json")).await;
		assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));

		rejected(request(&format!("/items/{id}?count=3"), "text/plain", "{}")).await;
	}
}
