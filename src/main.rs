//! # rocket-mongo demo server
//!
//! Serves a few routes backed by the MongoDB fairing.
//!
//! ## Environment Variables
//!
//! - `MONGODB_URL` or `DATABASE_URL`: MongoDB connection string, overriding the
//!   `mongodb` section of `Rocket.toml`
//! - `RUST_LOG`: log filter, `info` by default

use rocket::{Build, Rocket, catchers, routes};
use tracing_subscriber::EnvFilter;

mod cli;
mod handlers;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn rocket() -> Rocket<Build> {
    rocket::build()
        .attach(cli::fairing_from_env())
        .register("/", catchers![handlers::catch404, handlers::catch500])
        .mount("/", routes![handlers::index])
        .mount("/db", handlers::routes())
}

/// Runs a CLI command when one is given, otherwise launches the server.
#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    if cli::handle_cli().await? {
        return Ok(());
    }

    let _ = rocket().launch().await?;
    Ok(())
}
