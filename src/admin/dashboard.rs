use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
	db_client::DbClient,
	error::{success, AppResult},
};

const COUNTS: &str = "
SELECT
	(SELECT COUNT(*) FROM vehicles WHERE status = 'available') AS vehicles_available,
	(SELECT COUNT(*) FROM vehicles WHERE status = 'reserved') AS vehicles_reserved,
	(SELECT COUNT(*) FROM vehicles WHERE status = 'sold') AS vehicles_sold,
	(SELECT COUNT(*) FROM rentals) AS rentals_total,
	(SELECT COUNT(*) FROM rentals WHERE available) AS rentals_available,
	(SELECT COUNT(*) FROM submissions WHERE status = 'pending') AS submissions_pending,
	(SELECT COUNT(*) FROM bookings WHERE status = 'pending') AS bookings_pending,
	(SELECT COUNT(*) FROM bookings WHERE status = 'confirmed') AS bookings_confirmed,
	(SELECT COUNT(*) FROM reviews WHERE NOT approved) AS reviews_pending,
	(SELECT COUNT(*) FROM sold_vehicles WHERE sold_at >= date_trunc('month', now())) AS sales_this_month,
	(SELECT COALESCE(SUM(sale_price), 0) FROM sold_vehicles WHERE sold_at >= date_trunc('month', now())) AS revenue_this_month,
	(SELECT COALESCE(SUM(profit), 0) FROM sold_vehicles WHERE sold_at >= date_trunc('month', now())) AS profit_this_month
";

pub async fn dashboard(db: State<DbClient>) -> AppResult<Json<Value>> {
	let row = db.query_one(COUNTS, &[]).await?;
	let count = |column: &str| row.get::<_, i64>(column);

	Ok(success(json!({
		"vehicles": {
			"available": count("vehicles_available"),
			"reserved": count("vehicles_reserved"),
			"sold": count("vehicles_sold"),
		},
		"rentals": {
			"total": count("rentals_total"),
			"available": count("rentals_available"),
		},
		"submissions": { "pending": count("submissions_pending") },
		"bookings": {
			"pending": count("bookings_pending"),
			"confirmed": count("bookings_confirmed"),
		},
		"reviews": { "pending": count("reviews_pending") },
		"sales_this_month": {
			"count": count("sales_this_month"),
			"revenue": row.get::<_, f64>("revenue_this_month"),
			"profit": row.get::<_, f64>("profit_this_month"),
		},
	})))
}
