use axum::{
	extract::State,
	Json,
};
use chrono::{DateTime, Utc};
use log::info;
use postgres_from_row::FromRow;
use serde_json::{json, Value};
use uuid::Uuid;

use super::filters::VehicleQuery;
use crate::{
	common::{check_required, check_year, normalize_registration, text_enum, FuelType, Location, Transmission, VehicleType},
	db_client::DbClient,
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath, AppQuery},
};

text_enum!(VehicleStatus, "vehicle status" {
	Available => "available",
	Reserved => "reserved",
	Sold => "sold",
});

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct Vehicle {
	pub id: Uuid,
	pub vehicle_type: VehicleType,
	pub brand: String,
	pub model: String,
	pub variant: Option<String>,
	pub year: i32,
	pub km_driven: i32,
	pub fuel_type: FuelType,
	pub transmission: Transmission,
	pub ownership: i32,
	pub color: Option<String>,
	pub registration_number: String,
	pub price: f64,
	pub purchase_price: Option<f64>,
	#[from_row(flatten)]
	pub location: Location,
	pub images: Vec<String>,
	pub features: Vec<String>,
	pub description: Option<String>,
	pub status: VehicleStatus,
	pub featured: bool,
	pub submission_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Vehicle {
	/// Customer-facing copy: the purchase price stays in the back office.
	pub fn public(mut self) -> Self {
		self.purchase_price = None;
		self
	}
}

fn default_ownership() -> i32 {
	1
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct VehicleInput {
	pub vehicle_type: VehicleType,
	pub brand: String,
	pub model: String,
	#[serde(default)]
	pub variant: Option<String>,
	pub year: i32,
	pub km_driven: i32,
	pub fuel_type: FuelType,
	pub transmission: Transmission,
	#[serde(default = "default_ownership")]
	pub ownership: i32,
	#[serde(default)]
	pub color: Option<String>,
	pub registration_number: String,
	pub price: f64,
	#[serde(default)]
	pub purchase_price: Option<f64>,
	pub location: Location,
	#[serde(default)]
	pub images: Vec<String>,
	#[serde(default)]
	pub features: Vec<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub status: Option<VehicleStatus>,
	#[serde(default)]
	pub featured: bool,
	#[serde(skip)]
	pub submission_id: Option<Uuid>,
}

impl VehicleInput {
	pub fn validate(&self) -> Vec<String> {
		let mut errors = Vec::new();
		check_required(&self.brand, "brand", &mut errors);
		check_required(&self.model, "model", &mut errors);
		check_required(&self.registration_number, "registration_number", &mut errors);
		check_required(&self.location.city, "location.city", &mut errors);
		check_required(&self.location.state, "location.state", &mut errors);
		check_year(self.year, &mut errors);
		if self.km_driven < 0 {
			errors.push("km_driven cannot be negative".to_string());
		}
		if self.ownership < 1 {
			errors.push("ownership must be at least 1".to_string());
		}
		if !(self.price > 0.0) {
			errors.push("price must be greater than zero".to_string());
		}
		if matches!(self.purchase_price, Some(p) if p < 0.0) {
			errors.push("purchase_price cannot be negative".to_string());
		}
		errors
	}

	/// Validates and tidies the input before it is written.
	pub fn prepare(mut self) -> AppResult<Self> {
		let errors = self.validate();
		if !errors.is_empty() {
			return Err(AppError::Validation(errors));
		}
		self.brand = self.brand.trim().to_string();
		self.model = self.model.trim().to_string();
		self.registration_number = normalize_registration(&self.registration_number);
		self.images.retain(|image| !image.trim().is_empty());
		self.features.retain(|feature| !feature.trim().is_empty());
		Ok(self)
	}
}

pub async fn insert_vehicle(db: &DbClient, input: &VehicleInput) -> AppResult<Vehicle> {
	let row = db
		.query_one(
			"INSERT INTO vehicles (id, vehicle_type, brand, model, variant, year, km_driven, fuel_type, transmission,
				ownership, color, registration_number, price, purchase_price, city, state, images, features,
				description, status, featured, submission_id)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
			RETURNING *",
			&[
				&Uuid::new_v4(),
				&input.vehicle_type,
				&input.brand,
				&input.model,
				&input.variant,
				&input.year,
				&input.km_driven,
				&input.fuel_type,
				&input.transmission,
				&input.ownership,
				&input.color,
				&input.registration_number,
				&input.price,
				&input.purchase_price,
				&input.location.city,
				&input.location.state,
				&input.images,
				&input.features,
				&input.description,
				&input.status.unwrap_or(VehicleStatus::Available),
				&input.featured,
				&input.submission_id,
			],
		)
		.await?;
	Ok(Vehicle::try_from_row(&row)?)
}

pub async fn find_vehicle(db: &DbClient, id: Uuid) -> AppResult<Vehicle> {
	let row = db.query_opt("SELECT * FROM vehicles WHERE id = $1", &[&id]).await?.ok_or(AppError::NotFound("Vehicle"))?;
	Ok(Vehicle::try_from_row(&row)?)
}

async fn list(db: &DbClient, query: &VehicleQuery, default_status: Option<VehicleStatus>) -> AppResult<(Vec<Vehicle>, Value)> {
	let listing = query.build(default_status)?;
	let where_clause = listing.filter.where_clause();
	let params = listing.filter.params();

	let count_sql = format!("SELECT COUNT(*) FROM vehicles{where_clause}");
	let total: i64 = db.query_one(count_sql.as_str(), &params).await?.get(0);
	let sql = format!("SELECT * FROM vehicles{where_clause} ORDER BY {}{}", listing.order.sql(), listing.page.sql());
	let rows = db.query(sql.as_str(), &params).await?;
	let vehicles = rows.iter().map(Vehicle::try_from_row).collect::<Result<Vec<_>, _>>()?;

	Ok((vehicles, listing.page.summary(total)))
}

pub async fn get_vehicles(db: State<DbClient>, query: AppQuery<VehicleQuery>) -> AppResult<Json<Value>> {
	let (vehicles, pagination) = list(&db, &query, Some(VehicleStatus::Available)).await?;
	let vehicles: Vec<Vehicle> = vehicles.into_iter().map(Vehicle::public).collect();
	Ok(success(json!({ "vehicles": vehicles, "pagination": pagination })))
}

pub async fn admin_vehicles(db: State<DbClient>, query: AppQuery<VehicleQuery>) -> AppResult<Json<Value>> {
	let (vehicles, pagination) = list(&db, &query, None).await?;
	Ok(success(json!({ "vehicles": vehicles, "pagination": pagination })))
}

pub async fn get_vehicle(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let vehicle = find_vehicle(&db, id).await?.public();
	Ok(success(json!({ "vehicle": vehicle })))
}

pub async fn create_vehicle(db: State<DbClient>, input: AppJson<VehicleInput>) -> AppResult<Json<Value>> {
	let input = input.0.prepare()?;
	let vehicle = insert_vehicle(&db, &input).await?;
	info!("Vehicle {} added: {} {}", vehicle.id, vehicle.brand, vehicle.model);
	Ok(success(json!({ "vehicle": vehicle })))
}

// $22 is the status the edit was based on.
const UPDATE_VEHICLE: &str = "UPDATE vehicles SET vehicle_type = $2, brand = $3, model = $4, variant = $5, year = $6,
	km_driven = $7, fuel_type = $8, transmission = $9, ownership = $10, color = $11, registration_number = $12,
	price = $13, purchase_price = $14, city = $15, state = $16, images = $17, features = $18, description = $19,
	status = $20, featured = $21, updated_at = now()
WHERE id = $1 AND status = $22
RETURNING *";

pub async fn update_vehicle(db: State<DbClient>, AppPath(id): AppPath<Uuid>, input: AppJson<VehicleInput>) -> AppResult<Json<Value>> {
	let input = input.0.prepare()?;
	let current = find_vehicle(&db, id).await?;
	let status = input.status.unwrap_or(current.status);

	let updated = db
		.query_opt(
			UPDATE_VEHICLE,
			&[
				&id,
				&input.vehicle_type,
				&input.brand,
				&input.model,
				&input.variant,
				&input.year,
				&input.km_driven,
				&input.fuel_type,
				&input.transmission,
				&input.ownership,
				&input.color,
				&input.registration_number,
				&input.price,
				&input.purchase_price.or(current.purchase_price),
				&input.location.city,
				&input.location.state,
				&input.images,
				&input.features,
				&input.description,
				&status,
				&input.featured,
				&current.status,
			],
		)
		.await?;
	let Some(row) = updated else {
		// deleted, or its status changed (e.g. sold) since it was read
		find_vehicle(&db, id).await?;
		return Err(AppError::Conflict("Vehicle was changed by another request, reload and retry".to_string()));
	};
	let vehicle = Vehicle::try_from_row(&row)?;
	info!("Vehicle {} updated", vehicle.id);
	Ok(success(json!({ "vehicle": vehicle })))
}

pub async fn delete_vehicle(db: State<DbClient>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Value>> {
	let deleted = db.execute("DELETE FROM vehicles WHERE id = $1", &[&id]).await?;
	if deleted == 0 {
		return Err(AppError::NotFound("Vehicle"));
	}
	info!("Vehicle {id} deleted");
	Ok(success(json!({ "id": id })))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input() -> VehicleInput {
		serde_json::from_value(json!({
			"vehicle_type": "car",
			"brand": " Maruti ",
			"model": "Swift",
			"year": 2019,
			"km_driven": 42000,
			"fuel_type": "petrol",
			"transmission": "manual",
			"registration_number": "mh 12 ab-1234",
			"price": 525000.0,
			"location": { "city": "Pune", "state": "Maharashtra" },
			"images": ["/uploads/a.jpg", " "]
		}))
		.unwrap()
	}

	#[test]
	fn defaults_fill_optional_fields() {
		let input = input();
		assert_eq!(input.ownership, 1);
		assert!(!input.featured);
		assert!(input.status.is_none());
		assert!(input.submission_id.is_none());
	}

	#[test]
	fn prepare_tidies_fields() {
		let input = input().prepare().unwrap();
		assert_eq!(input.brand, "Maruti");
		assert_eq!(input.registration_number, "MH12AB1234");
		assert_eq!(input.images, vec!["/uploads/a.jpg".to_string()]);
	}

	#[test]
	fn edits_apply_only_to_the_status_they_were_based_on() {
		assert!(UPDATE_VEHICLE.contains("WHERE id = $1 AND status = $22"));
		assert!(UPDATE_VEHICLE.trim_end().ends_with("RETURNING *"));
	}

	#[test]
	fn prepare_collects_every_problem() {
		let mut bad = input();
		bad.brand = String::new();
		bad.price = 0.0;
		bad.ownership = 0;
		bad.km_driven = -5;
		match bad.prepare() {
			Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 4),
			other => panic!("expected validation error, got {other:?}"),
		}
	}

	#[test]
	fn unknown_fuel_type_is_a_parse_error() {
		let mut raw = json!({
			"vehicle_type": "bike", "brand": "Royal Enfield", "model": "Classic 350", "year": 2021,
			"km_driven": 8000, "fuel_type": "steam", "transmission": "manual",
			"registration_number": "KA01", "price": 150000.0,
			"location": { "city": "Bengaluru", "state": "Karnataka" }
		});
		assert!(serde_json::from_value::<VehicleInput>(raw.clone()).is_err());
		raw["fuel_type"] = json!("petrol");
		assert!(serde_json::from_value::<VehicleInput>(raw).is_ok());
	}
}
