use std::collections::BTreeMap;

use axum::{
	extract::State,
	Json,
};
use chrono::{Days, NaiveDate, Utc};
use postgres_from_row::FromRow;
use serde_json::{json, Value};

use crate::{
	bookings::bookings::Booking,
	common::round_money,
	db_client::DbClient,
	error::{success, AppError, AppResult},
	extract::AppQuery,
	stories::SoldVehicle,
};

const DEFAULT_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Totals {
	pub count: usize,
	pub revenue: f64,
	pub profit: f64,
}

impl Totals {
	fn add(&mut self, sale: &SoldVehicle) {
		self.count += 1;
		self.revenue = round_money(self.revenue + sale.sale_price);
		self.profit = round_money(self.profit + sale.profit);
	}
}

#[derive(Debug, Default, PartialEq, serde::Serialize)]
pub struct SalesSummary {
	pub count: usize,
	pub revenue: f64,
	pub cost: f64,
	pub profit: f64,
	pub average_margin_percent: f64,
}

#[derive(Debug, Default, PartialEq, serde::Serialize)]
pub struct RentalSummary {
	pub bookings: usize,
	pub revenue: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct Report {
	pub from: NaiveDate,
	pub to: NaiveDate,
	pub sales: SalesSummary,
	pub by_vehicle_type: BTreeMap<String, Totals>,
	pub by_month: BTreeMap<String, Totals>,
	pub best_sale: Option<SoldVehicle>,
	pub rentals: RentalSummary,
}

/// Aggregates the sales and counted rental bookings of one reporting window.
pub fn build_report(sales: &[SoldVehicle], bookings: &[Booking], from: NaiveDate, to: NaiveDate) -> Report {
	let mut summary = SalesSummary::default();
	let mut by_vehicle_type: BTreeMap<String, Totals> = BTreeMap::new();
	let mut by_month: BTreeMap<String, Totals> = BTreeMap::new();
	let mut margins = Vec::new();

	for sale in sales {
		summary.count += 1;
		summary.revenue += sale.sale_price;
		summary.cost += sale.purchase_price;
		summary.profit += sale.profit;
		if sale.sale_price > 0.0 {
			margins.push(sale.profit / sale.sale_price * 100.0);
		}
		by_vehicle_type.entry(sale.vehicle_type.to_string()).or_default().add(sale);
		by_month.entry(sale.sold_at.format("%Y-%m").to_string()).or_default().add(sale);
	}
	summary.revenue = round_money(summary.revenue);
	summary.cost = round_money(summary.cost);
	summary.profit = round_money(summary.profit);
	if !margins.is_empty() {
		summary.average_margin_percent = round_money(margins.iter().sum::<f64>() / margins.len() as f64);
	}

	let best_sale = sales.iter().max_by(|a, b| a.profit.total_cmp(&b.profit)).cloned();

	let rentals = RentalSummary {
		bookings: bookings.len(),
		revenue: round_money(bookings.iter().map(|b| b.total_amount).sum()),
	};

	Report { from, to, sales: summary, by_vehicle_type, by_month, best_sale, rentals }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ReportWindow {
	from: Option<NaiveDate>,
	to: Option<NaiveDate>,
}

impl ReportWindow {
	/// Inclusive date range, defaulting to the last 30 days.
	pub fn resolve(&self, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
		let to = self.to.unwrap_or(today);
		let from = match self.from {
			Some(from) => from,
			None => to.checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS - 1)).unwrap_or(to),
		};
		if from > to {
			return Err(AppError::BadRequest("from must not be after to".to_string()));
		}
		Ok((from, to))
	}
}

pub async fn reports(db: State<DbClient>, window: AppQuery<ReportWindow>) -> AppResult<Json<Value>> {
	let (from, to) = window.resolve(Utc::now().date_naive())?;
	let start = from.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
	let end = to.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc());
	let (Some(start), Some(end)) = (start, end) else {
		return Err(AppError::BadRequest("date range is out of bounds".to_string()));
	};

	let rows = db
		.query("SELECT * FROM sold_vehicles WHERE sold_at >= $1 AND sold_at < $2 ORDER BY sold_at", &[&start, &end])
		.await?;
	let sales = rows.iter().map(SoldVehicle::try_from_row).collect::<Result<Vec<_>, _>>()?;

	let rows = db
		.query(
			"SELECT * FROM bookings WHERE status IN ('confirmed', 'completed') AND start_date BETWEEN $1 AND $2",
			&[&from, &to],
		)
		.await?;
	let bookings = rows.iter().map(Booking::try_from_row).collect::<Result<Vec<_>, _>>()?;

	Ok(success(json!({ "report": build_report(&sales, &bookings, from, to) })))
}

#[cfg(test)]
mod tests {
	use chrono::{DateTime, TimeZone};
	use uuid::Uuid;

	use super::*;
	use crate::{bookings::bookings::BookingStatus, common::VehicleType};

	fn day(s: &str) -> NaiveDate {
		NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
	}

	fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
	}

	fn sale(vehicle_type: VehicleType, sale_price: f64, purchase_price: f64, sold_at: DateTime<Utc>) -> SoldVehicle {
		SoldVehicle {
			id: Uuid::new_v4(),
			vehicle_id: Uuid::new_v4(),
			brand: "Honda".into(),
			model: "City".into(),
			year: 2019,
			vehicle_type,
			buyer_name: "Anil".into(),
			sale_price,
			purchase_price,
			profit: sale_price - purchase_price,
			testimonial: None,
			image: None,
			show_as_story: false,
			sold_at,
		}
	}

	fn booking(total_amount: f64) -> Booking {
		Booking {
			id: Uuid::new_v4(),
			rental_id: Uuid::new_v4(),
			customer_name: "Ravi".into(),
			customer_email: "ravi@example.com".into(),
			customer_phone: "9876543210".into(),
			start_date: day("2024-03-02"),
			end_date: day("2024-03-04"),
			days: 3,
			total_amount,
			security_deposit: 5000.0,
			status: BookingStatus::Confirmed,
			notes: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn aggregates_sales_and_rentals() {
		let sales = vec![
			sale(VehicleType::Car, 500000.0, 450000.0, at(2024, 2, 20)),
			sale(VehicleType::Car, 800000.0, 700000.0, at(2024, 3, 5)),
			sale(VehicleType::Bike, 100000.0, 90000.0, at(2024, 3, 9)),
		];
		let report = build_report(&sales, &[booking(4500.0), booking(3000.0)], day("2024-02-10"), day("2024-03-10"));

		assert_eq!(report.sales.count, 3);
		assert_eq!(report.sales.revenue, 1400000.0);
		assert_eq!(report.sales.cost, 1240000.0);
		assert_eq!(report.sales.profit, 160000.0);
		// mean of 10%, 12.5% and 10%
		assert_eq!(report.sales.average_margin_percent, 10.83);

		assert_eq!(report.by_vehicle_type["car"], Totals { count: 2, revenue: 1300000.0, profit: 150000.0 });
		assert_eq!(report.by_vehicle_type["bike"].count, 1);
		assert_eq!(report.by_month.keys().collect::<Vec<_>>(), vec!["2024-02", "2024-03"]);
		assert_eq!(report.by_month["2024-03"].revenue, 900000.0);

		assert_eq!(report.best_sale.map(|s| s.profit), Some(100000.0));
		assert_eq!(report.rentals, RentalSummary { bookings: 2, revenue: 7500.0 });
	}

	#[test]
	fn empty_window() {
		let report = build_report(&[], &[], day("2024-01-01"), day("2024-01-31"));
		assert_eq!(report.sales, SalesSummary::default());
		assert!(report.best_sale.is_none());
		assert!(report.by_month.is_empty());
	}

	#[test]
	fn window_defaults_to_last_thirty_days() {
		let today = day("2024-03-31");
		assert_eq!(ReportWindow::default().resolve(today).unwrap(), (day("2024-03-02"), today));

		let window = ReportWindow { from: Some(day("2024-01-01")), to: Some(day("2024-01-01")) };
		assert_eq!(window.resolve(today).unwrap(), (day("2024-01-01"), day("2024-01-01")));

		let window = ReportWindow { from: Some(day("2024-02-01")), to: Some(day("2024-01-01")) };
		assert!(matches!(window.resolve(today), Err(AppError::BadRequest(_))));
	}
}
