use axum::{
	extract::{DefaultBodyLimit, State},
	middleware::from_fn_with_state,
	routing::{get, post, put},
	Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::{
	admin::{
		auth::{login, require_admin},
		dashboard::dashboard,
	},
	bookings::bookings::{admin_bookings, create_booking, get_booking, update_booking_status},
	cars::{
		cars::{admin_vehicles, create_vehicle, delete_vehicle, get_vehicle, get_vehicles, update_vehicle},
		search::{filter_options, search},
		sold::mark_sold,
	},
	db_client::DbClient,
	error::{success, AppResult},
	file_server::file_handler,
	image_server::{upload_images, upload_public_images},
	rental::rental::{admin_rentals, create_rental, delete_rental, get_rental, get_rentals, quote_rental, update_rental},
	reports::reports,
	review::review::{admin_reviews, car_reviews, delete_review, moderate_review, post_review},
	settings::{get_settings, update_settings},
	state::AppState,
	stories::{admin_sold, success_stories, update_story},
	submissions::{
		purchase::purchase_submission,
		submissions::{
			admin_submission, admin_submissions, create_submission, delete_submission, review_submission, track_submission,
			validate_submission_step,
		},
	},
};

async fn health(db: State<DbClient>) -> AppResult<Json<Value>> {
	db.execute("SELECT 1", &[]).await?;
	Ok(success(json!({ "status": "ok" })))
}

fn storefront() -> Router<AppState> {
	Router::new()
		.route("/vehicles", get(get_vehicles))
		.route("/vehicles/search", get(search))
		.route("/vehicles/filters", get(filter_options))
		.route("/vehicles/:id", get(get_vehicle))
		.route("/rentals", get(get_rentals))
		.route("/rentals/:id", get(get_rental))
		.route("/rentals/:id/quote", post(quote_rental))
		.route("/bookings", post(create_booking))
		.route("/bookings/:id", get(get_booking))
		.route("/submissions", post(create_submission))
		.route("/submissions/validate", post(validate_submission_step))
		.route("/submissions/track/:reference", get(track_submission))
		.route("/reviews", get(car_reviews).post(post_review))
		.route("/success-stories", get(success_stories))
		.route("/settings", get(get_settings))
		.route("/upload/public", post(upload_public_images))
		.route("/health", get(health))
}

fn back_office(state: &AppState) -> Router<AppState> {
	Router::new()
		.route("/dashboard", get(dashboard))
		.route("/vehicles", get(admin_vehicles).post(create_vehicle))
		.route("/vehicles/:id", put(update_vehicle).delete(delete_vehicle))
		.route("/vehicles/:id/sold", post(mark_sold))
		.route("/rentals", get(admin_rentals).post(create_rental))
		.route("/rentals/:id", put(update_rental).delete(delete_rental))
		.route("/bookings", get(admin_bookings))
		.route("/bookings/:id/status", put(update_booking_status))
		.route("/submissions", get(admin_submissions))
		.route("/submissions/:id", get(admin_submission).put(review_submission).delete(delete_submission))
		.route("/submissions/:id/purchase", post(purchase_submission))
		.route("/reviews", get(admin_reviews))
		.route("/reviews/:id", put(moderate_review).delete(delete_review))
		.route("/sold", get(admin_sold))
		.route("/sold/:id", put(update_story))
		.route("/reports", get(reports))
		.route("/settings", put(update_settings))
		.route_layer(from_fn_with_state(state.auth.clone(), require_admin))
		.route("/login", post(login))
}

pub fn router(state: AppState) -> Router {
	let admin_upload = Router::new()
		.route("/upload", post(upload_images))
		.route_layer(from_fn_with_state(state.auth.clone(), require_admin));

	Router::new()
		.nest("/api", storefront().merge(admin_upload))
		.nest("/api/admin", back_office(&state))
		.route("/uploads/:file", get(file_handler))
		.layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
		.layer(CorsLayer::permissive())
		.with_state(state)
}
