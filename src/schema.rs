use log::info;

use crate::db_client::DbClient;

const TABLES: &str = "
CREATE TABLE IF NOT EXISTS vehicles (
	id UUID PRIMARY KEY,
	vehicle_type TEXT NOT NULL,
	brand TEXT NOT NULL,
	model TEXT NOT NULL,
	variant TEXT,
	year INTEGER NOT NULL,
	km_driven INTEGER NOT NULL,
	fuel_type TEXT NOT NULL,
	transmission TEXT NOT NULL,
	ownership INTEGER NOT NULL DEFAULT 1,
	color TEXT,
	registration_number TEXT NOT NULL,
	price DOUBLE PRECISION NOT NULL,
	purchase_price DOUBLE PRECISION,
	city TEXT NOT NULL,
	state TEXT NOT NULL,
	images TEXT[] NOT NULL DEFAULT '{}',
	features TEXT[] NOT NULL DEFAULT '{}',
	description TEXT,
	status TEXT NOT NULL DEFAULT 'available',
	featured BOOLEAN NOT NULL DEFAULT false,
	submission_id UUID,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	CONSTRAINT vehicles_registration_number_key UNIQUE (registration_number)
);

CREATE TABLE IF NOT EXISTS rentals (
	id UUID PRIMARY KEY,
	name TEXT NOT NULL,
	vehicle_type TEXT NOT NULL,
	brand TEXT NOT NULL,
	model TEXT NOT NULL,
	year INTEGER NOT NULL,
	fuel_type TEXT NOT NULL,
	transmission TEXT NOT NULL,
	seats INTEGER,
	daily_rate DOUBLE PRECISION NOT NULL,
	weekly_rate DOUBLE PRECISION,
	monthly_rate DOUBLE PRECISION,
	security_deposit DOUBLE PRECISION NOT NULL DEFAULT 0,
	city TEXT NOT NULL,
	state TEXT NOT NULL,
	images TEXT[] NOT NULL DEFAULT '{}',
	features TEXT[] NOT NULL DEFAULT '{}',
	description TEXT,
	available BOOLEAN NOT NULL DEFAULT true,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS submissions (
	id UUID PRIMARY KEY,
	reference_number TEXT NOT NULL,
	seller_name TEXT NOT NULL,
	seller_email TEXT NOT NULL,
	seller_phone TEXT NOT NULL,
	vehicle_type TEXT NOT NULL,
	brand TEXT NOT NULL,
	model TEXT NOT NULL,
	variant TEXT,
	year INTEGER NOT NULL,
	km_driven INTEGER NOT NULL,
	fuel_type TEXT NOT NULL,
	transmission TEXT NOT NULL,
	ownership INTEGER NOT NULL,
	registration_number TEXT NOT NULL,
	expected_price DOUBLE PRECISION NOT NULL,
	city TEXT NOT NULL,
	state TEXT NOT NULL,
	images TEXT[] NOT NULL DEFAULT '{}',
	description TEXT,
	status TEXT NOT NULL DEFAULT 'pending',
	offered_price DOUBLE PRECISION,
	admin_notes TEXT,
	vehicle_id UUID,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	CONSTRAINT submissions_reference_number_key UNIQUE (reference_number)
);

CREATE TABLE IF NOT EXISTS bookings (
	id UUID PRIMARY KEY,
	rental_id UUID NOT NULL,
	customer_name TEXT NOT NULL,
	customer_email TEXT NOT NULL,
	customer_phone TEXT NOT NULL,
	start_date DATE NOT NULL,
	end_date DATE NOT NULL,
	days INTEGER NOT NULL,
	total_amount DOUBLE PRECISION NOT NULL,
	security_deposit DOUBLE PRECISION NOT NULL DEFAULT 0,
	status TEXT NOT NULL DEFAULT 'pending',
	notes TEXT,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS reviews (
	id UUID PRIMARY KEY,
	customer_name TEXT NOT NULL,
	rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
	title TEXT,
	comment TEXT NOT NULL,
	vehicle_id UUID,
	approved BOOLEAN NOT NULL DEFAULT false,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS sold_vehicles (
	id UUID PRIMARY KEY,
	vehicle_id UUID NOT NULL,
	brand TEXT NOT NULL,
	model TEXT NOT NULL,
	year INTEGER NOT NULL,
	vehicle_type TEXT NOT NULL,
	buyer_name TEXT NOT NULL,
	sale_price DOUBLE PRECISION NOT NULL,
	purchase_price DOUBLE PRECISION NOT NULL,
	profit DOUBLE PRECISION NOT NULL,
	testimonial TEXT,
	image TEXT,
	show_as_story BOOLEAN NOT NULL DEFAULT false,
	sold_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS settings (
	id INTEGER PRIMARY KEY CHECK (id = 1),
	business_name TEXT NOT NULL,
	phone TEXT NOT NULL,
	email TEXT NOT NULL,
	whatsapp TEXT,
	address TEXT,
	city TEXT,
	opening_hours TEXT,
	facebook TEXT,
	instagram TEXT,
	rental_terms TEXT,
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

// Listing, lookup and report access paths.
const INDEXES: &str = "
CREATE INDEX IF NOT EXISTS vehicles_status_created_idx ON vehicles (status, created_at DESC);
CREATE INDEX IF NOT EXISTS vehicles_type_price_idx ON vehicles (vehicle_type, price);
CREATE INDEX IF NOT EXISTS vehicles_brand_idx ON vehicles (lower(brand));
CREATE INDEX IF NOT EXISTS vehicles_city_idx ON vehicles (lower(city));
CREATE INDEX IF NOT EXISTS rentals_available_rate_idx ON rentals (available, daily_rate);
CREATE INDEX IF NOT EXISTS submissions_status_created_idx ON submissions (status, created_at DESC);
CREATE INDEX IF NOT EXISTS bookings_rental_dates_idx ON bookings (rental_id, start_date, end_date);
CREATE INDEX IF NOT EXISTS bookings_status_idx ON bookings (status, created_at DESC);
CREATE INDEX IF NOT EXISTS reviews_approved_created_idx ON reviews (approved, created_at DESC);
CREATE INDEX IF NOT EXISTS sold_vehicles_sold_at_idx ON sold_vehicles (sold_at DESC);
";

pub const BOOKING_OVERLAP_CONSTRAINT: &str = "bookings_no_overlap";

// Pending and confirmed bookings of one rental may not share a day.
fn booking_constraints() -> String {
	format!(
		"
CREATE EXTENSION IF NOT EXISTS btree_gist;

DO $$
BEGIN
	IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE conname = '{BOOKING_OVERLAP_CONSTRAINT}') THEN
		ALTER TABLE bookings ADD CONSTRAINT {BOOKING_OVERLAP_CONSTRAINT}
			EXCLUDE USING gist (rental_id WITH =, daterange(start_date, end_date, '[]') WITH &&)
			WHERE (status IN ('pending', 'confirmed'));
	END IF;
END
$$;
"
	)
}

pub async fn migrate(db: &DbClient) -> Result<(), tokio_postgres::Error> {
	db.batch_execute(TABLES).await?;
	info!("Tables ready");
	db.batch_execute(INDEXES).await?;
	info!("Indexes ready");
	db.batch_execute(&booking_constraints()).await?;
	info!("Booking constraints ready");
	Ok(())
}
