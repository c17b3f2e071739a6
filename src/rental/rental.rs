use axum::{
	extract::State,
	Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use postgres_from_row::FromRow;
use serde_json::{json, Value};
use uuid::Uuid;

use super::pricing::{self, Rates};
use crate::{
	common::{check_required, check_year, FuelType, Location, Transmission, VehicleType},
	db_client::{DbClient, SqlFilter},
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath, AppQuery},
};

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct Rental {
	pub id: Uuid,
	pub name: String,
	pub vehicle_type: VehicleType,
	pub brand: String,
	pub model: String,
	pub year: i32,
	pub fuel_type: FuelType,
	pub transmission: Transmission,
	pub seats: Option<i32>,
	pub daily_rate: f64,
	pub weekly_rate: Option<f64>,
	pub monthly_rate: Option<f64>,
	pub security_deposit: f64,
	#[from_row(flatten)]
	pub location: Location,
	pub images: Vec<String>,
	pub features: Vec<String>,
	pub description: Option<String>,
	pub available: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Rental {
	pub fn rates(&self) -> Rates {
		Rates {
			daily: self.daily_rate,
			weekly: self.weekly_rate,
			monthly: self.monthly_rate,
		}
	}
}

fn default_available() -> bool {
	true
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RentalInput {
	pub name: String,
	pub vehicle_type: VehicleType,
	pub brand: String,
	pub model: String,
	pub year: i32,
	pub fuel_type: FuelType,
	pub transmission: Transmission,
	#[serde(default)]
	pub seats: Option<i32>,
	pub daily_rate: f64,
	#[serde(default)]
	pub weekly_rate: Option<f64>,
	#[serde(default)]
	pub monthly_rate: Option<f64>,
	#[serde(default)]
	pub security_deposit: f64,
	pub location: Location,
	#[serde(default)]
	pub images: Vec<String>,
	#[serde(default)]
	pub features: Vec<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default = "default_available")]
	pub available: bool,
}

impl RentalInput {
	pub fn validate(&self) -> AppResult<()> {
		let mut errors = Vec::new();
		check_required(&self.name, "name", &mut errors);
		check_required(&self.brand, "brand", &mut errors);
		check_required(&self.model, "model", &mut errors);
		check_required(&self.location.city, "location.city", &mut errors);
		check_required(&self.location.state, "location.state", &mut errors);
		check_year(self.year, &mut errors);
		Rates {
			daily: self.daily_rate,
			weekly: self.weekly_rate,
			monthly: self.monthly_rate,
		}
		.validate(&mut errors);
		if self.security_deposit < 0.0 {
			errors.push("security_deposit cannot be negative".to_string());
		}
		if matches!(self.seats, Some(seats) if seats < 1) {
			errors.push("seats must be at least 1".to_string());
		}

		if errors.is_empty() {
			Ok(())
		} else {
			Err(AppError::Validation(errors))
		}
	}
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct RentalQuery {
	#[serde(rename = "type")]
	vehicle_type: Option<String>,
	city: Option<String>,
	available: Option<bool>,
	max_daily_rate: Option<f64>,
}

impl RentalQuery {
	pub fn filter(&self) -> AppResult<SqlFilter> {
		let mut filter = SqlFilter::new();
		filter.push("available = {}", self.available.unwrap_or(true));
		if let Some(vehicle_type) = self.vehicle_type.as_deref().filter(|t| !t.trim().is_empty()) {
			let vehicle_type: VehicleType = vehicle_type.parse().map_err(|e: crate::common::ParseEnumError| AppError::BadRequest(e.to_string()))?;
			filter.push("vehicle_type = {}", vehicle_type);
		}
		if let Some(city) = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
			filter.push("lower(city) = lower({})", city.to_string());
		}
		if let Some(max) = self.max_daily_rate {
			filter.push("daily_rate <= {}", max);
		}
		Ok(filter)
	}
}

pub async fn find_rental(db: &DbClient, id: Uuid) -> AppResult<Rental> {
	let row = db.query_opt("SELECT * FROM rentals WHERE id = $1", &[&id]).await?.ok_or(AppError::NotFound("Rental"))?;
	Ok(Rental::try_from_row(&row)?)
}

pub async fn get_rentals(db: State<DbClient>, query: AppQuery<RentalQuery>) -> AppResult<Json<Value>> {
	let filter = query.filter()?;
	let sql = format!("SELECT * FROM rentals{} ORDER BY daily_rate ASC, id", filter.where_clause());
	let rows = db.query(sql.as_str(), &filter.params()).await?;
	let rentals = rows.iter().map(Rental::try_from_row).collect::<Result<Vec<_>, _>>()?;
	Ok(success(json!({ "rentals": rentals })))
}

pub async fn admin_rentals(db: State<DbClient>) -> AppResult<Json<Value>> {
	let rows = db.query("SELECT * FROM rentals ORDER BY created_at DESC", &[]).await?;
	let rentals = rows.iter().map(Rental::try_from_row).collect::<Result<Vec<_>, _>>()?;
	Ok(success(json!({ "rentals": rentals })))
}

pub async fn get_rental(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let rental = find_rental(&db, id).await?;
	Ok(success(json!({ "rental": rental })))
}

#[derive(Debug, serde::Deserialize)]
pub struct QuoteRequest {
	pub start_date: NaiveDate,
	pub end_date: NaiveDate,
}

pub async fn quote_rental(db: State<DbClient>, AppPath(id): AppPath<Uuid>, request: AppJson<QuoteRequest>) -> AppResult<Json<Value>> {
	let rental = find_rental(&db, id).await?;
	let quote = pricing::quote(&rental.rates(), rental.security_deposit, request.start_date, request.end_date)?;
	Ok(success(json!({ "rental_id": rental.id, "quote": quote })))
}

pub async fn create_rental(db: State<DbClient>, input: AppJson<RentalInput>) -> AppResult<Json<Value>> {
	let input = input.0;
	input.validate()?;
	let row = db
		.query_one(
			"INSERT INTO rentals (id, name, vehicle_type, brand, model, year, fuel_type, transmission, seats, daily_rate,
				weekly_rate, monthly_rate, security_deposit, city, state, images, features, description, available)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
			RETURNING *",
			&[
				&Uuid::new_v4(),
				&input.name.trim(),
				&input.vehicle_type,
				&input.brand.trim(),
				&input.model.trim(),
				&input.year,
				&input.fuel_type,
				&input.transmission,
				&input.seats,
				&input.daily_rate,
				&input.weekly_rate,
				&input.monthly_rate,
				&input.security_deposit,
				&input.location.city,
				&input.location.state,
				&input.images,
				&input.features,
				&input.description,
				&input.available,
			],
		)
		.await?;
	let rental = Rental::try_from_row(&row)?;
	info!("Rental {} added: {}", rental.id, rental.name);
	Ok(success(json!({ "rental": rental })))
}

pub async fn update_rental(db: State<DbClient>, AppPath(id): AppPath<Uuid>, input: AppJson<RentalInput>) -> AppResult<Json<Value>> {
	let input = input.0;
	input.validate()?;
	let row = db
		.query_opt(
			"UPDATE rentals SET name = $2, vehicle_type = $3, brand = $4, model = $5, year = $6, fuel_type = $7,
				transmission = $8, seats = $9, daily_rate = $10, weekly_rate = $11, monthly_rate = $12,
				security_deposit = $13, city = $14, state = $15, images = $16, features = $17, description = $18,
				available = $19, updated_at = now()
			WHERE id = $1
			RETURNING *",
			&[
				&id,
				&input.name.trim(),
				&input.vehicle_type,
				&input.brand.trim(),
				&input.model.trim(),
				&input.year,
				&input.fuel_type,
				&input.transmission,
				&input.seats,
				&input.daily_rate,
				&input.weekly_rate,
				&input.monthly_rate,
				&input.security_deposit,
				&input.location.city,
				&input.location.state,
				&input.images,
				&input.features,
				&input.description,
				&input.available,
			],
		)
		.await?
		.ok_or(AppError::NotFound("Rental"))?;
	let rental = Rental::try_from_row(&row)?;
	info!("Rental {} updated", rental.id);
	Ok(success(json!({ "rental": rental })))
}

pub async fn delete_rental(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let active: i64 = db
		.query_one(
			"SELECT COUNT(*) FROM bookings WHERE rental_id = $1 AND status IN ('pending', 'confirmed')",
			&[&id],
		)
		.await?
		.get(0);
	if active > 0 {
		return Err(AppError::Conflict(format!("Rental has {active} active booking(s)")));
	}

	let deleted = db.execute("DELETE FROM rentals WHERE id = $1", &[&id]).await?;
	if deleted == 0 {
		return Err(AppError::NotFound("Rental"));
	}
	info!("Rental {id} deleted");
	Ok(success(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
	use axum::{extract::Query, http::Uri};

	use super::*;

	fn input() -> RentalInput {
		serde_json::from_value(json!({
			"name": "Activa for the weekend",
			"vehicle_type": "bike",
			"brand": "Honda",
			"model": "Activa 6G",
			"year": 2022,
			"fuel_type": "petrol",
			"transmission": "automatic",
			"daily_rate": 450.0,
			"weekly_rate": 2800.0,
			"location": { "city": "Goa", "state": "Goa" }
		}))
		.unwrap()
	}

	#[test]
	fn input_defaults() {
		let input = input();
		assert!(input.available);
		assert_eq!(input.security_deposit, 0.0);
		assert!(input.monthly_rate.is_none());
		assert!(input.validate().is_ok());
	}

	#[test]
	fn invalid_rates_are_reported() {
		let mut bad = input();
		bad.daily_rate = 0.0;
		bad.security_deposit = -1.0;
		bad.seats = Some(0);
		match bad.validate() {
			Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 3),
			other => panic!("expected validation error, got {other:?}"),
		}
	}

	#[test]
	fn listing_filter_defaults_to_available() {
		let uri: Uri = "/api/rentals?type=car&city=Goa&max_daily_rate=2500".parse().unwrap();
		let query = Query::<RentalQuery>::try_from_uri(&uri).unwrap().0;
		let filter = query.filter().unwrap();
		assert_eq!(
			filter.where_clause(),
			" WHERE available = $1 AND vehicle_type = $2 AND lower(city) = lower($3) AND daily_rate <= $4"
		);

		let uri: Uri = "/api/rentals?type=boat".parse().unwrap();
		assert!(Query::<RentalQuery>::try_from_uri(&uri).unwrap().0.filter().is_err());
	}
}
