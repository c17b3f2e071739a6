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
	common::check_required,
	db_client::{DbClient, SqlFilter},
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath, AppQuery},
};

const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct Review {
	pub id: Uuid,
	pub customer_name: String,
	pub rating: i32,
	pub title: Option<String>,
	pub comment: String,
	pub vehicle_id: Option<Uuid>,
	pub approved: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, serde::Deserialize)]
pub struct NewReview {
	pub customer_name: String,
	pub rating: i32,
	#[serde(default)]
	pub title: Option<String>,
	pub comment: String,
	#[serde(default)]
	pub vehicle_id: Option<Uuid>,
}

impl NewReview {
	pub fn validate(&self) -> AppResult<()> {
		let mut errors = Vec::new();
		check_required(&self.customer_name, "customer_name", &mut errors);
		check_required(&self.comment, "comment", &mut errors);
		if !(1..=5).contains(&self.rating) {
			errors.push("rating must be between 1 and 5".to_string());
		}
		if self.comment.chars().count() > MAX_COMMENT_CHARS {
			errors.push(format!("comment is limited to {MAX_COMMENT_CHARS} characters"));
		}
		if errors.is_empty() {
			Ok(())
		} else {
			Err(AppError::Validation(errors))
		}
	}
}

pub async fn post_review(db: State<DbClient>, review: AppJson<NewReview>) -> AppResult<Json<Value>> {
	let review = review.0;
	review.validate()?;

	let row = db
		.query_one(
			"INSERT INTO reviews (id, customer_name, rating, title, comment, vehicle_id, approved)
			VALUES ($1, $2, $3, $4, $5, $6, false)
			RETURNING *",
			&[
				&Uuid::new_v4(),
				&review.customer_name.trim(),
				&review.rating,
				&review.title,
				&review.comment.trim(),
				&review.vehicle_id,
			],
		)
		.await?;
	let review = Review::try_from_row(&row)?;
	info!("Review {} received ({} stars), awaiting approval", review.id, review.rating);
	Ok(success(json!({ "review": review, "message": "Thank you! Your review will appear once approved." })))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ReviewQuery {
	vehicle_id: Option<Uuid>,
	limit: Option<i64>,
	approved: Option<bool>,
}

pub async fn car_reviews(db: State<DbClient>, query: AppQuery<ReviewQuery>) -> AppResult<Json<Value>> {
	let mut filter = SqlFilter::new();
	filter.push_raw("approved");
	if let Some(vehicle_id) = query.vehicle_id {
		filter.push("vehicle_id = {}", vehicle_id);
	}
	let where_clause = filter.where_clause();
	let params = filter.params();

	let stats_sql = format!("SELECT COUNT(*), COALESCE(AVG(rating)::float8, 0) FROM reviews{where_clause}");
	let stats = db.query_one(stats_sql.as_str(), &params).await?;
	let count: i64 = stats.get(0);
	let average: f64 = stats.get(1);

	let limit = query.limit.unwrap_or(20).clamp(1, 100);
	let sql = format!("SELECT * FROM reviews{where_clause} ORDER BY created_at DESC LIMIT {limit}");
	let rows = db.query(sql.as_str(), &params).await?;
	let reviews = rows.iter().map(Review::try_from_row).collect::<Result<Vec<_>, _>>()?;

	Ok(success(json!({
		"reviews": reviews,
		"count": count,
		"average_rating": (average * 10.0).round() / 10.0,
	})))
}

pub async fn admin_reviews(db: State<DbClient>, query: AppQuery<ReviewQuery>) -> AppResult<Json<Value>> {
	let mut filter = SqlFilter::new();
	if let Some(approved) = query.approved {
		filter.push("approved = {}", approved);
	}
	let sql = format!("SELECT * FROM reviews{} ORDER BY created_at DESC", filter.where_clause());
	let rows = db.query(sql.as_str(), &filter.params()).await?;
	let reviews = rows.iter().map(Review::try_from_row).collect::<Result<Vec<_>, _>>()?;
	Ok(success(json!({ "reviews": reviews })))
}

#[derive(Debug, serde::Deserialize)]
pub struct Moderation {
	approved: bool,
}

pub async fn moderate_review(db: State<DbClient>, AppPath(id): AppPath<Uuid>, moderation: AppJson<Moderation>) -> AppResult<Json<Value>> {
	let row = db
		.query_opt("UPDATE reviews SET approved = $2 WHERE id = $1 RETURNING *", &[&id, &moderation.approved])
		.await?
		.ok_or(AppError::NotFound("Review"))?;
	let review = Review::try_from_row(&row)?;
	info!("Review {id} approved={}", review.approved);
	Ok(success(json!({ "review": review })))
}

pub async fn delete_review(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let deleted = db.execute("DELETE FROM reviews WHERE id = $1", &[&id]).await?;
	if deleted == 0 {
		return Err(AppError::NotFound("Review"));
	}
	info!("Review {id} deleted");
	Ok(success(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn review(rating: i32, comment: &str) -> NewReview {
		NewReview {
			customer_name: "Kiran".into(),
			rating,
			title: None,
			comment: comment.into(),
			vehicle_id: None,
		}
	}

	#[test]
	fn rating_must_be_one_to_five() {
		assert!(review(1, "Smooth purchase").validate().is_ok());
		assert!(review(5, "Smooth purchase").validate().is_ok());
		assert!(review(0, "Smooth purchase").validate().is_err());
		assert!(review(6, "Smooth purchase").validate().is_err());
	}

	#[test]
	fn comment_is_required_and_bounded() {
		assert!(review(4, "   ").validate().is_err());
		assert!(review(4, &"a".repeat(MAX_COMMENT_CHARS + 1)).validate().is_err());
	}
}
