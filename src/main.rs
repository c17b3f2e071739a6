use std::{env, net::SocketAddr};

use anyhow::Context;
use log::{info, warn};
use tokio::{net::TcpListener, signal};

mod admin;
mod bookings;
mod cars;
mod common;
mod config;
mod db_client;
mod error;
mod extract;
mod file_server;
mod image_server;
mod rental;
mod reports;
mod review;
mod routes;
mod schema;
mod settings;
mod state;
mod stories;
mod submissions;

use config::Config;
use db_client::db_client;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = Config::load();
	let db = db_client(&config).await.context("connecting to the database")?;
	schema::migrate(&db).await.context("creating the schema")?;

	match env::args().nth(1).as_deref() {
		Some("migrate") => {
			info!("Migration finished");
			return Ok(());
		}
		Some("serve") | None => {}
		Some(other) => anyhow::bail!("unknown command '{other}', expected 'serve' or 'migrate'"),
	}

	let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
	let app = routes::router(AppState::new(db, config));

	let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
	info!("Server running on {addr}");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
	info!("Server stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		match signal::ctrl_c().await {
			Ok(()) => info!("Received Ctrl+C, shutting down"),
			Err(e) => {
				warn!("Cannot listen for Ctrl+C: {e}");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
				info!("Received terminate signal, shutting down");
			}
			Err(e) => {
				warn!("Cannot listen for SIGTERM: {e}");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
