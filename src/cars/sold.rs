use axum::{
	extract::State,
	Json,
};
use log::{info, warn};
use postgres_from_row::FromRow;
use serde_json::{json, Value};
use uuid::Uuid;

use super::cars::{find_vehicle, Vehicle, VehicleStatus};
use crate::{
	common::{check_required, round_money},
	db_client::DbClient,
	error::{success, AppError, AppResult},
	extract::{AppJson, AppPath},
	stories::SoldVehicle,
};

#[derive(Debug, serde::Deserialize)]
pub struct SaleRequest {
	pub buyer_name: String,
	pub sale_price: f64,
	#[serde(default)]
	pub testimonial: Option<String>,
	#[serde(default)]
	pub show_as_story: bool,
}

#[derive(Debug, PartialEq)]
pub struct SaleFigures {
	pub purchase_price: f64,
	pub profit: f64,
}

// Only one concurrent sale can flip the status.
const CLAIM_FOR_SALE: &str = "UPDATE vehicles SET status = $2, updated_at = now() WHERE id = $1 AND status <> $2 RETURNING id";

fn already_sold() -> AppError {
	AppError::Conflict("Vehicle is already sold".to_string())
}

/// Profit of selling `vehicle`; an unknown purchase price counts as zero.
pub fn sale_figures(vehicle: &Vehicle, sale: &SaleRequest) -> AppResult<SaleFigures> {
	let mut errors = Vec::new();
	check_required(&sale.buyer_name, "buyer_name", &mut errors);
	if !(sale.sale_price > 0.0) {
		errors.push("sale_price must be greater than zero".to_string());
	}
	if !errors.is_empty() {
		return Err(AppError::Validation(errors));
	}
	if vehicle.status == VehicleStatus::Sold {
		return Err(already_sold());
	}

	let purchase_price = vehicle.purchase_price.unwrap_or(0.0);
	Ok(SaleFigures {
		purchase_price,
		profit: round_money(sale.sale_price - purchase_price),
	})
}

pub async fn mark_sold(db: State<DbClient>, AppPath(id): AppPath<Uuid>, sale: AppJson<SaleRequest>) -> AppResult<Json<Value>> {
	let sale = sale.0;
	let vehicle = find_vehicle(&db, id).await?;
	let figures = sale_figures(&vehicle, &sale)?;

	db.query_opt(CLAIM_FOR_SALE, &[&vehicle.id, &VehicleStatus::Sold]).await?.ok_or_else(already_sold)?;

	let inserted = db
		.query_one(
			"INSERT INTO sold_vehicles (id, vehicle_id, brand, model, year, vehicle_type, buyer_name, sale_price,
				purchase_price, profit, testimonial, image, show_as_story)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
			RETURNING *",
			&[
				&Uuid::new_v4(),
				&vehicle.id,
				&vehicle.brand,
				&vehicle.model,
				&vehicle.year,
				&vehicle.vehicle_type,
				&sale.buyer_name.trim(),
				&sale.sale_price,
				&figures.purchase_price,
				&figures.profit,
				&sale.testimonial,
				&vehicle.images.first(),
				&sale.show_as_story,
			],
		)
		.await;
	let row = match inserted {
		Ok(row) => row,
		Err(e) => {
			if let Err(revert) = db
				.execute("UPDATE vehicles SET status = $2 WHERE id = $1", &[&vehicle.id, &vehicle.status])
				.await
			{
				warn!("Cannot restore status of vehicle {}: {revert}", vehicle.id);
			}
			return Err(e.into());
		}
	};
	let sold = SoldVehicle::try_from_row(&row)?;

	info!("Vehicle {} sold to {} for {} (profit {})", vehicle.id, sold.buyer_name, sold.sale_price, sold.profit);
	Ok(success(json!({ "sold": sold })))
}

#[cfg(test)]
mod tests {
	use chrono::Utc;

	use super::*;
	use crate::common::{FuelType, Location, Transmission, VehicleType};

	fn vehicle(purchase_price: Option<f64>, status: VehicleStatus) -> Vehicle {
		Vehicle {
			id: Uuid::new_v4(),
			vehicle_type: VehicleType::Bike,
			brand: "Bajaj".into(),
			model: "Pulsar 150".into(),
			variant: None,
			year: 2020,
			km_driven: 15000,
			fuel_type: FuelType::Petrol,
			transmission: Transmission::Manual,
			ownership: 1,
			color: None,
			registration_number: "DL3SAB1234".into(),
			price: 85000.0,
			purchase_price,
			location: Location { city: "Delhi".into(), state: "Delhi".into() },
			images: vec![],
			features: vec![],
			description: None,
			status,
			featured: false,
			submission_id: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn sale(price: f64) -> SaleRequest {
		SaleRequest { buyer_name: "Asha".into(), sale_price: price, testimonial: None, show_as_story: true }
	}

	#[test]
	fn profit_is_sale_minus_purchase() {
		let figures = sale_figures(&vehicle(Some(70000.0), VehicleStatus::Available), &sale(82500.5)).unwrap();
		assert_eq!(figures, SaleFigures { purchase_price: 70000.0, profit: 12500.5 });
	}

	#[test]
	fn unknown_purchase_price_counts_as_zero() {
		let figures = sale_figures(&vehicle(None, VehicleStatus::Reserved), &sale(60000.0)).unwrap();
		assert_eq!(figures.profit, 60000.0);
	}

	#[test]
	fn selling_twice_conflicts() {
		let result = sale_figures(&vehicle(Some(1.0), VehicleStatus::Sold), &sale(2.0));
		assert!(matches!(result, Err(AppError::Conflict(_))));
	}

	#[test]
	fn sale_claims_the_vehicle_only_once() {
		assert!(CLAIM_FOR_SALE.contains("AND status <> $2"));
		assert!(CLAIM_FOR_SALE.ends_with("RETURNING id"));
		assert!(matches!(already_sold(), AppError::Conflict(msg) if msg == "Vehicle is already sold"));
	}

	#[test]
	fn sale_needs_buyer_and_price() {
		let mut bad = sale(0.0);
		bad.buyer_name = " ".into();
		match sale_figures(&vehicle(None, VehicleStatus::Available), &bad) {
			Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
			other => panic!("expected validation error, got {other:?}"),
		}
	}
}
