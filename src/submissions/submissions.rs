use axum::{
	extract::State,
	Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use postgres_from_row::FromRow;
use rand::Rng;
use serde_json::{json, Value};
use uuid::Uuid;

use super::wizard::{validate_step, NewSubmission, SubmissionDraft, WizardStep};
use crate::{
	common::{text_enum, FuelType, Location, Transmission, VehicleType},
	db_client::{DbClient, Page, SqlFilter},
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath, AppQuery},
};

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERENCE_ATTEMPTS: usize = 3;

text_enum!(SubmissionStatus, "submission status" {
	Pending => "pending",
	Reviewing => "reviewing",
	Approved => "approved",
	Rejected => "rejected",
	Purchased => "purchased",
});

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct Submission {
	pub id: Uuid,
	pub reference_number: String,
	pub seller_name: String,
	pub seller_email: String,
	pub seller_phone: String,
	pub vehicle_type: VehicleType,
	pub brand: String,
	pub model: String,
	pub variant: Option<String>,
	pub year: i32,
	pub km_driven: i32,
	pub fuel_type: FuelType,
	pub transmission: Transmission,
	pub ownership: i32,
	pub registration_number: String,
	pub expected_price: f64,
	#[from_row(flatten)]
	pub location: Location,
	pub images: Vec<String>,
	pub description: Option<String>,
	pub status: SubmissionStatus,
	pub offered_price: Option<f64>,
	pub admin_notes: Option<String>,
	pub vehicle_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// `SUB-YYYYMMDD-XXXXXX`, without look-alike characters.
pub fn reference_number<R: Rng>(today: NaiveDate, rng: &mut R) -> String {
	let suffix: String = (0..6)
		.map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
		.collect();
	format!("SUB-{}-{}", today.format("%Y%m%d"), suffix)
}

#[derive(serde::Deserialize)]
pub struct StepParams {
	step: u8,
}

pub async fn validate_submission_step(params: AppQuery<StepParams>, draft: AppJson<SubmissionDraft>) -> AppResult<Json<Value>> {
	let step = WizardStep::from_index(params.step)?;
	let missing = validate_step(step, &draft);
	if !missing.is_empty() {
		return Err(AppError::Validation(missing));
	}
	Ok(success(json!({
		"step": step.index(),
		"missing": missing,
		"next_step": step.next().map(WizardStep::index),
	})))
}

async fn insert_submission(db: &DbClient, new: &NewSubmission, reference: &str) -> AppResult<Submission> {
	let row = db
		.query_one(
			"INSERT INTO submissions (id, reference_number, seller_name, seller_email, seller_phone, vehicle_type, brand,
				model, variant, year, km_driven, fuel_type, transmission, ownership, registration_number, expected_price,
				city, state, images, description, status)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
			RETURNING *",
			&[
				&Uuid::new_v4(),
				&reference,
				&new.seller_name,
				&new.seller_email,
				&new.seller_phone,
				&new.vehicle_type,
				&new.brand,
				&new.model,
				&new.variant,
				&new.year,
				&new.km_driven,
				&new.fuel_type,
				&new.transmission,
				&new.ownership,
				&new.registration_number,
				&new.expected_price,
				&new.location.city,
				&new.location.state,
				&new.images,
				&new.description,
				&SubmissionStatus::Pending,
			],
		)
		.await?;
	Ok(Submission::try_from_row(&row)?)
}

pub async fn create_submission(db: State<DbClient>, draft: AppJson<SubmissionDraft>) -> AppResult<Json<Value>> {
	let new = draft.0.finish()?;

	let mut attempt = 0;
	let submission = loop {
		attempt += 1;
		let reference = reference_number(Utc::now().date_naive(), &mut rand::thread_rng());
		match insert_submission(&db, &new, &reference).await {
			Err(AppError::Conflict(_)) if attempt < REFERENCE_ATTEMPTS => {
				warn!("Reference number {reference} already taken, retrying");
			}
			result => break result?,
		}
	};

	info!("Submission {} received for {} {}", submission.reference_number, submission.brand, submission.model);
	Ok(success(json!({
		"id": submission.id,
		"reference_number": submission.reference_number,
	})))
}

pub async fn track_submission(db: State<DbClient>, AppPath(reference): AppPath<String>) -> AppResult<Json<Value>> {
	let row = db
		.query_opt(
			"SELECT reference_number, brand, model, year, status, offered_price, created_at, updated_at
			FROM submissions WHERE reference_number = $1",
			&[&reference.trim().to_uppercase()],
		)
		.await?
		.ok_or(AppError::NotFound("Submission"))?;

	Ok(success(json!({
		"submission": {
			"reference_number": row.get::<_, String>("reference_number"),
			"brand": row.get::<_, String>("brand"),
			"model": row.get::<_, String>("model"),
			"year": row.get::<_, i32>("year"),
			"status": row.try_get::<_, SubmissionStatus>("status")?,
			"offered_price": row.get::<_, Option<f64>>("offered_price"),
			"created_at": row.get::<_, DateTime<Utc>>("created_at"),
			"updated_at": row.get::<_, DateTime<Utc>>("updated_at"),
		}
	})))
}

pub async fn find_submission(db: &DbClient, id: Uuid) -> AppResult<Submission> {
	let row = db.query_opt("SELECT * FROM submissions WHERE id = $1", &[&id]).await?.ok_or(AppError::NotFound("Submission"))?;
	Ok(Submission::try_from_row(&row)?)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct SubmissionQuery {
	status: Option<String>,
	page: Option<u32>,
	limit: Option<u32>,
}

pub async fn admin_submissions(db: State<DbClient>, query: AppQuery<SubmissionQuery>) -> AppResult<Json<Value>> {
	let mut filter = SqlFilter::new();
	if let Some(status) = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
		let status: SubmissionStatus = status.parse().map_err(|e: crate::common::ParseEnumError| AppError::BadRequest(e.to_string()))?;
		filter.push("status = {}", status);
	}
	let page = Page::new(query.page, query.limit, 20, 100);
	let where_clause = filter.where_clause();
	let params = filter.params();

	let count_sql = format!("SELECT COUNT(*) FROM submissions{where_clause}");
	let total: i64 = db.query_one(count_sql.as_str(), &params).await?.get(0);
	let sql = format!("SELECT * FROM submissions{where_clause} ORDER BY created_at DESC{}", page.sql());
	let rows = db.query(sql.as_str(), &params).await?;
	let submissions = rows.iter().map(Submission::try_from_row).collect::<Result<Vec<_>, _>>()?;

	Ok(success(json!({ "submissions": submissions, "pagination": page.summary(total) })))
}

pub async fn admin_submission(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let submission = find_submission(&db, id).await?;
	Ok(success(json!({ "submission": submission })))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct SubmissionReview {
	pub status: Option<SubmissionStatus>,
	pub offered_price: Option<f64>,
	pub admin_notes: Option<String>,
}

const REVIEW_SUBMISSION: &str = "UPDATE submissions SET
	status = COALESCE($2, status),
	offered_price = COALESCE($3, offered_price),
	admin_notes = COALESCE($4, admin_notes),
	updated_at = now()
WHERE id = $1 AND status <> 'purchased'
RETURNING *";

fn purchased_is_final() -> AppError {
	AppError::Conflict("A purchased submission cannot be changed".to_string())
}

impl SubmissionReview {
	/// Purchased submissions are final, and only the purchase workflow may
	/// mark one purchased.
	pub fn check(&self, current: SubmissionStatus) -> AppResult<()> {
		if current == SubmissionStatus::Purchased {
			return Err(purchased_is_final());
		}
		if self.status == Some(SubmissionStatus::Purchased) {
			return Err(AppError::BadRequest("Use the purchase action to buy a vehicle".to_string()));
		}
		if matches!(self.offered_price, Some(price) if !(price > 0.0)) {
			return Err(AppError::Validation(vec!["offered_price must be greater than zero".to_string()]));
		}
		Ok(())
	}
}

pub async fn review_submission(db: State<DbClient>, AppPath(id): AppPath<Uuid>, review: AppJson<SubmissionReview>) -> AppResult<Json<Value>> {
	let review = review.0;
	let current = find_submission(&db, id).await?;
	review.check(current.status)?;

	let updated = db
		.query_opt(REVIEW_SUBMISSION, &[&id, &review.status, &review.offered_price, &review.admin_notes])
		.await?;
	let Some(row) = updated else {
		// deleted or purchased since it was read
		find_submission(&db, id).await?;
		return Err(purchased_is_final());
	};
	let submission = Submission::try_from_row(&row)?;
	info!("Submission {} now {}", submission.reference_number, submission.status);
	Ok(success(json!({ "submission": submission })))
}

pub async fn delete_submission(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let deleted = db.execute("DELETE FROM submissions WHERE id = $1", &[&id]).await?;
	if deleted == 0 {
		return Err(AppError::NotFound("Submission"));
	}
	info!("Submission {id} deleted");
	Ok(success(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
	use axum::{body::Body, http::Request, routing::post, Router};
	use hyper::StatusCode;
	use rand::{rngs::StdRng, SeedableRng};
	use tower::ServiceExt;

	use super::*;

	async fn validate(uri: &str, body: &'static str) -> (StatusCode, Value) {
		let app = Router::new().route("/submissions/validate", post(validate_submission_step));
		let request = Request::builder()
			.method("POST")
			.uri(uri)
			.header("content-type", "application/json")
			.body(Body::from(body))
			.unwrap();
		let response = app.oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	#[tokio::test]
	async fn step_validation_over_http() {
		let (status, json) = validate(
			"/submissions/validate?step=1",
			r#"{"vehicle_type": "bike", "brand": "Honda", "model": "Activa", "year": 2019}"#,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["success"], true);
		assert_eq!(json["next_step"], 2);

		let (status, json) = validate("/submissions/validate?step=1", r#"{"brand": "Honda"}"#).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(json["success"], false);
		assert!(json["fields"].as_array().is_some_and(|fields| !fields.is_empty()));
	}

	#[tokio::test]
	async fn malformed_json_gets_the_error_envelope() {
		let (status, json) = validate("/submissions/validate?step=1", "{not json").await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(json["success"], false);
		assert!(json["error"].is_string());
	}

	#[tokio::test]
	async fn missing_step_gets_the_error_envelope() {
		let (status, json) = validate("/submissions/validate", "{}").await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(json["success"], false);
	}

	#[test]
	fn reference_numbers_follow_the_format() {
		let mut rng = StdRng::seed_from_u64(7);
		let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
		let reference = reference_number(date, &mut rng);

		assert!(reference.starts_with("SUB-20240309-"));
		let suffix = &reference["SUB-20240309-".len()..];
		assert_eq!(suffix.len(), 6);
		assert!(suffix.bytes().all(|b| REFERENCE_ALPHABET.contains(&b)));
		assert_ne!(reference, reference_number(date, &mut rng));
	}

	#[test]
	fn purchased_submissions_are_frozen() {
		let review = SubmissionReview { admin_notes: Some("called seller".into()), ..Default::default() };
		assert!(review.check(SubmissionStatus::Reviewing).is_ok());
		assert!(matches!(review.check(SubmissionStatus::Purchased), Err(AppError::Conflict(_))));
	}

	#[test]
	fn review_update_skips_purchased_rows() {
		assert!(REVIEW_SUBMISSION.contains("WHERE id = $1 AND status <> 'purchased'"));
		assert_eq!(SubmissionStatus::Purchased.to_string(), "purchased");
	}

	#[test]
	fn purchase_status_is_reserved_for_the_workflow() {
		let review = SubmissionReview { status: Some(SubmissionStatus::Purchased), ..Default::default() };
		assert!(matches!(review.check(SubmissionStatus::Approved), Err(AppError::BadRequest(_))));

		let review = SubmissionReview { offered_price: Some(0.0), ..Default::default() };
		assert!(matches!(review.check(SubmissionStatus::Pending), Err(AppError::Validation(_))));
	}

	#[test]
	fn review_accepts_partial_bodies() {
		let review: SubmissionReview = serde_json::from_value(json!({ "status": "approved", "offered_price": 450000.0 })).unwrap();
		assert_eq!(review.status, Some(SubmissionStatus::Approved));
		assert!(review.admin_notes.is_none());
	}
}
