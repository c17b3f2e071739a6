use std::{io::Cursor, path::Path, sync::Arc};

use axum::{
	body::Bytes,
	extract::{multipart::MultipartRejection, Multipart, State},
	Json,
};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use log::{info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
	config::Config,
	error::{success, AppError, AppResult},
};

pub const PUBLIC_UPLOAD_LIMIT: usize = 10;

#[derive(Debug, serde::Serialize)]
pub struct StoredImage {
	pub url: String,
	pub width: u32,
	pub height: u32,
	pub bytes: usize,
}

pub struct Compressed {
	pub data: Vec<u8>,
	pub width: u32,
	pub height: u32,
}

/// Decodes an uploaded image, shrinks it to fit within `max_dimension` and
/// re-encodes it as JPEG.
pub fn compress(data: &[u8], max_dimension: u32, quality: u8) -> AppResult<Compressed> {
	let img = image::load_from_memory(data).map_err(|e| AppError::BadRequest(format!("File is not a supported image: {e}")))?;
	let img = if img.width() > max_dimension || img.height() > max_dimension {
		img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
	} else {
		img
	};
	let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

	let mut out = Cursor::new(Vec::new());
	rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
	Ok(Compressed {
		data: out.into_inner(),
		width: rgb.width(),
		height: rgb.height(),
	})
}

async fn compress_blocking(data: Bytes, max_dimension: u32, quality: u8) -> AppResult<Compressed> {
	tokio::task::spawn_blocking(move || compress(&data, max_dimension, quality))
		.await
		.map_err(|e| AppError::Internal(e.to_string()))?
}

/// Writes already compressed images under random names. A failed write removes
/// the files written before it.
pub async fn save_images(dir: &Path, images: Vec<Compressed>) -> AppResult<Vec<StoredImage>> {
	tokio::fs::create_dir_all(dir).await?;

	let mut stored = Vec::with_capacity(images.len());
	let mut written: Vec<std::path::PathBuf> = Vec::with_capacity(images.len());
	for image in images {
		let name = format!("{}.jpg", Uuid::new_v4());
		let path = dir.join(&name);
		if let Err(e) = tokio::fs::write(&path, &image.data).await {
			for path in written {
				if let Err(e) = tokio::fs::remove_file(&path).await {
					warn!("Cannot remove partial upload {}: {e}", path.display());
				}
			}
			return Err(e.into());
		}
		written.push(path);
		stored.push(StoredImage {
			url: format!("/uploads/{name}"),
			width: image.width,
			height: image.height,
			bytes: image.data.len(),
		});
	}
	Ok(stored)
}

async fn receive(config: &Config, multipart: Result<Multipart, MultipartRejection>, limit: Option<usize>) -> AppResult<Vec<StoredImage>> {
	let mut multipart = multipart?;
	let mut parts = Vec::new();
	while let Some(field) = multipart.next_field().await.map_err(|e| AppError::BadRequest(e.body_text()))? {
		if field.file_name().is_none() {
			continue;
		}
		parts.push(field.bytes().await.map_err(|e| AppError::BadRequest(e.body_text()))?);
	}

	if parts.is_empty() {
		return Err(AppError::BadRequest("No files uploaded".to_string()));
	}
	if let Some(limit) = limit {
		if parts.len() > limit {
			return Err(AppError::BadRequest(format!("At most {limit} files can be uploaded at once")));
		}
	}

	// nothing touches the disk until every part has decoded
	let mut images = Vec::with_capacity(parts.len());
	for data in parts {
		images.push(compress_blocking(data, config.image_max_dimension, config.image_jpeg_quality).await?);
	}

	let stored = save_images(Path::new(&config.upload_dir), images).await?;
	info!("Stored {} uploaded image(s)", stored.len());
	Ok(stored)
}

pub async fn upload_images(config: State<Arc<Config>>, multipart: Result<Multipart, MultipartRejection>) -> AppResult<Json<Value>> {
	let files = receive(&config, multipart, None).await?;
	Ok(success(json!({ "files": files })))
}

pub async fn upload_public_images(
	config: State<Arc<Config>>,
	multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Value>> {
	let files = receive(&config, multipart, Some(PUBLIC_UPLOAD_LIMIT)).await?;
	Ok(success(json!({ "files": files })))
}
