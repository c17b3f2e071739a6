use std::{io::ErrorKind, path::Path, sync::Arc};

use axum::{
	body::Body,
	extract::State,
	response::{IntoResponse, Response},
};
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{
	config::Config,
	error::{AppError, AppResult},
	extract::AppPath,
};

pub fn content_type(file: &str) -> &'static str {
	let extension = Path::new(file).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
	match extension.as_deref() {
		Some("jpg" | "jpeg") => "image/jpeg",
		Some("png") => "image/png",
		Some("webp") => "image/webp",
		Some("gif") => "image/gif",
		_ => "application/octet-stream",
	}
}

fn check_name(file: &str) -> AppResult<()> {
	if file.is_empty() || file.contains(['/', '\\']) || file.contains("..") {
		return Err(AppError::BadRequest("Invalid file name".to_string()));
	}
	Ok(())
}

pub async fn read_file_stream(path: &Path) -> AppResult<ReaderStream<File>> {
	match File::open(path).await {
		Ok(file) => Ok(ReaderStream::new(file)),
		Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound("File")),
		Err(e) => Err(e.into()),
	}
}

pub async fn file_handler(config: State<Arc<Config>>, AppPath(file): AppPath<String>) -> AppResult<Response> {
	check_name(&file)?;
	let stream = read_file_stream(&Path::new(&config.upload_dir).join(&file)).await?;
	Ok((
		[(CONTENT_TYPE, content_type(&file)), (CACHE_CONTROL, "public, max-age=86400")],
		Body::from_stream(stream),
	)
		.into_response())
}

#[cfg(test)]
mod tests {
	use axum::{http::Request, routing::get, Router};
	use hyper::StatusCode;
	use tower::ServiceExt;

	use super::*;

	fn app(dir: &Path) -> Router {
		let mut config = Config::from_lookup(|_| None);
		config.upload_dir = dir.to_string_lossy().into_owned();
		Router::new().route("/uploads/:file", get(file_handler)).with_state(Arc::new(config))
	}

	fn get_file(uri: &str) -> Request<Body> {
		Request::builder().uri(uri).body(Body::empty()).unwrap()
	}

	#[test]
	fn content_types() {
		assert_eq!(content_type("a.JPG"), "image/jpeg");
		assert_eq!(content_type("a.png"), "image/png");
		assert_eq!(content_type("notes"), "application/octet-stream");
	}

	#[tokio::test]
	async fn streams_stored_file() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("car.jpg"), b"jpeg bytes").unwrap();

		let response = app(dir.path()).oneshot(get_file("/uploads/car.jpg")).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.headers()[CONTENT_TYPE], "image/jpeg");
		let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
		assert_eq!(&body[..], b"jpeg bytes");
	}

	#[tokio::test]
	async fn missing_file_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let response = app(dir.path()).oneshot(get_file("/uploads/gone.jpg")).await.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn refuses_to_leave_the_upload_dir() {
		let dir = tempfile::tempdir().unwrap();
		let response = app(dir.path()).oneshot(get_file("/uploads/..%2Fsecret.txt")).await.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}
}
