use axum::{
	extract::State,
	Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use postgres_from_row::FromRow;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
	common::{check_required, text_enum},
	db_client::{DbClient, SqlFilter},
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath, AppQuery},
	rental::{pricing, rental::find_rental},
	submissions::wizard::{check_email, check_phone},
};

text_enum!(BookingStatus, "booking status" {
	Pending => "pending",
	Confirmed => "confirmed",
	Cancelled => "cancelled",
	Completed => "completed",
});

impl BookingStatus {
	pub fn can_become(self, next: BookingStatus) -> bool {
		use BookingStatus::*;
		matches!(
			(self, next),
			(Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
		)
	}
}

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct Booking {
	pub id: Uuid,
	pub rental_id: Uuid,
	pub customer_name: String,
	pub customer_email: String,
	pub customer_phone: String,
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
	pub days: i32,
	pub total_amount: f64,
	pub security_deposit: f64,
	pub status: BookingStatus,
	pub notes: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, serde::Deserialize)]
pub struct BookingRequest {
	pub rental_id: Uuid,
	pub customer_name: String,
	pub customer_email: String,
	pub customer_phone: String,
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
	#[serde(default)]
	pub notes: Option<String>,
}

impl BookingRequest {
	pub fn validate(&self, today: NaiveDate) -> AppResult<()> {
		let mut errors = Vec::new();
		check_required(&self.customer_name, "customer_name", &mut errors);
		check_email(&self.customer_email, "customer_email", &mut errors);
		check_phone(&self.customer_phone, "customer_phone", &mut errors);
		if self.start_date < today {
			errors.push("start_date cannot be in the past".to_string());
		}
		if errors.is_empty() {
			Ok(())
		} else {
			Err(AppError::Validation(errors))
		}
	}
}

pub async fn create_booking(db: State<DbClient>, request: AppJson<BookingRequest>) -> AppResult<Json<Value>> {
	let request = request.0;
	request.validate(Utc::now().date_naive())?;

	let rental = find_rental(&db, request.rental_id).await?;
	if !rental.available {
		return Err(AppError::Conflict("This vehicle is not available for rent".to_string()));
	}
	let quote = pricing::quote(&rental.rates(), rental.security_deposit, request.start_date, request.end_date)?;

	// a concurrent insert that slips past this check hits bookings_no_overlap
	let clash = db
		.query_opt(
			"SELECT id FROM bookings
			WHERE rental_id = $1 AND status IN ('pending', 'confirmed') AND start_date <= $3 AND end_date >= $2
			LIMIT 1",
			&[&rental.id, &request.start_date, &request.end_date],
		)
		.await?;
	if clash.is_some() {
		return Err(AppError::Conflict("The vehicle is already booked for these dates".to_string()));
	}

	let row = db
		.query_one(
			"INSERT INTO bookings (id, rental_id, customer_name, customer_email, customer_phone, start_date, end_date,
				days, total_amount, security_deposit, status, notes)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
			RETURNING *",
			&[
				&Uuid::new_v4(),
				&rental.id,
				&request.customer_name.trim(),
				&request.customer_email.trim(),
				&request.customer_phone.trim(),
				&request.start_date,
				&request.end_date,
				&(quote.breakdown.days as i32),
				&quote.breakdown.subtotal,
				&quote.security_deposit,
				&BookingStatus::Pending,
				&request.notes,
			],
		)
		.await?;
	let booking = Booking::try_from_row(&row)?;
	info!("Booking {} for rental {} ({} days)", booking.id, rental.id, booking.days);
	Ok(success(json!({ "booking": booking, "quote": quote })))
}

pub async fn get_booking(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let row = db.query_opt("SELECT * FROM bookings WHERE id = $1", &[&id]).await?.ok_or(AppError::NotFound("Booking"))?;
	let booking = Booking::try_from_row(&row)?;
	Ok(success(json!({ "booking": booking })))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct BookingQuery {
	status: Option<String>,
	rental_id: Option<Uuid>,
}

impl BookingQuery {
	pub fn filter(&self) -> AppResult<SqlFilter> {
		let mut filter = SqlFilter::new();
		if let Some(status) = self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
			let status: BookingStatus = status.parse().map_err(|e: crate::common::ParseEnumError| AppError::BadRequest(e.to_string()))?;
			filter.push("status = {}", status);
		}
		if let Some(rental_id) = self.rental_id {
			filter.push("rental_id = {}", rental_id);
		}
		Ok(filter)
	}
}

pub async fn admin_bookings(db: State<DbClient>, query: AppQuery<BookingQuery>) -> AppResult<Json<Value>> {
	let filter = query.filter()?;
	let sql = format!("SELECT * FROM bookings{} ORDER BY created_at DESC", filter.where_clause());
	let rows = db.query(sql.as_str(), &filter.params()).await?;
	let bookings = rows.iter().map(Booking::try_from_row).collect::<Result<Vec<_>, _>>()?;
	Ok(success(json!({ "bookings": bookings })))
}

#[derive(Debug, serde::Deserialize)]
pub struct StatusChange {
	pub status: BookingStatus,
}

pub async fn update_booking_status(db: State<DbClient>, AppPath(id): AppPath<Uuid>, change: AppJson<StatusChange>) -> AppResult<Json<Value>> {
	let next = change.status;
	let row = db.query_opt("SELECT status FROM bookings WHERE id = $1", &[&id]).await?.ok_or(AppError::NotFound("Booking"))?;
	let current: BookingStatus = row.try_get("status")?;
	if !current.can_become(next) {
		return Err(AppError::BadRequest(format!("cannot change booking from {current} to {next}")));
	}

	// the status guard keeps a concurrent change from being overwritten
	let row = db
		.query_opt(
			"UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 AND status = $3 RETURNING *",
			&[&id, &next, &current],
		)
		.await?
		.ok_or_else(|| AppError::Conflict("Booking was changed by someone else".to_string()))?;
	let booking = Booking::try_from_row(&row)?;
	info!("Booking {id}: {current} -> {next}");
	Ok(success(json!({ "booking": booking })))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(start: &str) -> BookingRequest {
		serde_json::from_value(json!({
			"rental_id": Uuid::new_v4(),
			"customer_name": "Ravi Kumar",
			"customer_email": "ravi@example.com",
			"customer_phone": "+91 98765 43210",
			"start_date": start,
			"end_date": "2030-01-10"
		}))
		.unwrap()
	}

	fn day(s: &str) -> NaiveDate {
		NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
	}

	#[test]
	fn status_transitions() {
		use BookingStatus::*;
		assert!(Pending.can_become(Confirmed));
		assert!(Pending.can_become(Cancelled));
		assert!(Confirmed.can_become(Completed));
		assert!(!Pending.can_become(Completed));
		assert!(!Cancelled.can_become(Confirmed));
		assert!(!Completed.can_become(Cancelled));
		assert!(!Confirmed.can_become(Confirmed));
	}

	#[test]
	fn request_validation() {
		assert!(request("2030-01-02").validate(day("2030-01-01")).is_ok());
		assert!(request("2030-01-01").validate(day("2030-01-01")).is_ok());

		let result = request("2029-12-31").validate(day("2030-01-01"));
		assert!(matches!(result, Err(AppError::Validation(errors)) if errors == vec!["start_date cannot be in the past".to_string()]));

		let mut bad = request("2030-01-02");
		bad.customer_email = "ravi.example.com".into();
		bad.customer_phone = "12".into();
		match bad.validate(day("2030-01-01")) {
			Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
			other => panic!("expected validation error, got {other:?}"),
		}
	}

	#[test]
	fn admin_filter() {
		let query = BookingQuery { status: Some("confirmed".into()), rental_id: Some(Uuid::nil()) };
		assert_eq!(query.filter().unwrap().where_clause(), " WHERE status = $1 AND rental_id = $2");

		let query = BookingQuery { status: Some("lost".into()), rental_id: None };
		assert!(query.filter().is_err());
	}
}
