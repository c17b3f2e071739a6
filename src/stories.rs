use axum::{
	extract::State,
	Json,
};
use chrono::{DateTime, Utc};
use log::info;
use postgres_from_row::FromRow;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
	common::VehicleType,
	db_client::DbClient,
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath, AppQuery},
};

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct SoldVehicle {
	pub id: Uuid,
	pub vehicle_id: Uuid,
	pub brand: String,
	pub model: String,
	pub year: i32,
	pub vehicle_type: VehicleType,
	pub buyer_name: String,
	pub sale_price: f64,
	pub purchase_price: f64,
	pub profit: f64,
	pub testimonial: Option<String>,
	pub image: Option<String>,
	pub show_as_story: bool,
	pub sold_at: DateTime<Utc>,
}

/// What the storefront shows of a sale.
#[derive(Debug, serde::Serialize)]
pub struct SuccessStory {
	pub id: Uuid,
	pub brand: String,
	pub model: String,
	pub year: i32,
	pub vehicle_type: VehicleType,
	pub buyer_name: String,
	pub testimonial: Option<String>,
	pub image: Option<String>,
	pub sold_at: DateTime<Utc>,
}

impl From<SoldVehicle> for SuccessStory {
	fn from(sold: SoldVehicle) -> Self {
		Self {
			id: sold.id,
			brand: sold.brand,
			model: sold.model,
			year: sold.year,
			vehicle_type: sold.vehicle_type,
			buyer_name: sold.buyer_name,
			testimonial: sold.testimonial,
			image: sold.image,
			sold_at: sold.sold_at,
		}
	}
}

#[derive(serde::Deserialize)]
pub struct StoryParams {
	limit: Option<i64>,
}

pub async fn success_stories(db: State<DbClient>, params: AppQuery<StoryParams>) -> AppResult<Json<Value>> {
	let limit = params.limit.unwrap_or(12).clamp(1, 50);
	let rows = db
		.query("SELECT * FROM sold_vehicles WHERE show_as_story ORDER BY sold_at DESC LIMIT $1", &[&limit])
		.await?;
	let stories = rows
		.iter()
		.map(|row| SoldVehicle::try_from_row(row).map(SuccessStory::from))
		.collect::<Result<Vec<_>, _>>()?;
	Ok(success(json!({ "stories": stories })))
}

pub async fn admin_sold(db: State<DbClient>) -> AppResult<Json<Value>> {
	let rows = db.query("SELECT * FROM sold_vehicles ORDER BY sold_at DESC", &[]).await?;
	let sold = rows.iter().map(SoldVehicle::try_from_row).collect::<Result<Vec<_>, _>>()?;
	Ok(success(json!({ "sold": sold })))
}

#[derive(serde::Deserialize)]
pub struct StoryUpdate {
	testimonial: Option<String>,
	show_as_story: Option<bool>,
	image: Option<String>,
}

pub async fn update_story(db: State<DbClient>, AppPath(id): AppPath<Uuid>, update: AppJson<StoryUpdate>) -> AppResult<Json<Value>> {
	let update = update.0;
	let row = db
		.query_opt(
			"UPDATE sold_vehicles SET
				testimonial = COALESCE($2, testimonial),
				show_as_story = COALESCE($3, show_as_story),
				image = COALESCE($4, image)
			WHERE id = $1
			RETURNING *",
			&[&id, &update.testimonial, &update.show_as_story, &update.image],
		)
		.await?
		.ok_or(AppError::NotFound("Sale"))?;
	let sold = SoldVehicle::try_from_row(&row)?;
	info!("Sale {id} story updated");
	Ok(success(json!({ "sold": sold })))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn story_hides_the_numbers() {
		let sold = SoldVehicle {
			id: Uuid::new_v4(),
			vehicle_id: Uuid::new_v4(),
			brand: "Tata".into(),
			model: "Nexon".into(),
			year: 2021,
			vehicle_type: VehicleType::Car,
			buyer_name: "Farhan".into(),
			sale_price: 910000.0,
			purchase_price: 820000.0,
			profit: 90000.0,
			testimonial: Some("Paperwork done in a day".into()),
			image: None,
			show_as_story: true,
			sold_at: Utc::now(),
		};
		let story = serde_json::to_value(SuccessStory::from(sold)).unwrap();
		assert_eq!(story["buyer_name"], "Farhan");
		assert!(story.get("sale_price").is_none());
		assert!(story.get("purchase_price").is_none());
		assert!(story.get("profit").is_none());
	}
}
