use std::env;

use clap::{Arg, Command};
use rocket::Config;
use rocket_mongo::bootstrap::{bootstrap, close_all};
use rocket_mongo::fairing::configured_options;
use rocket_mongo::{ConnectionBatch, MongoConnector, MongoDb};
use serde_json::{Value, json};

pub fn cli() -> Command {
    Command::new("rocket-mongo").subcommand(
        Command::new("check")
            .about("Connect to every configured MongoDB deployment, report and disconnect")
            .arg(
                Arg::new("url")
                    .long("url")
                    .help("Connection string to check instead of the configured ones")
                    .value_name("URL"),
            ),
    )
}

/// `MONGODB_URL` or `DATABASE_URL` as fairing options.
fn options_from_env() -> Option<Value> {
    env::var("MONGODB_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
        .map(|url| json!({ "url": url }))
}

pub fn fairing_from_env() -> MongoDb {
    match options_from_env() {
        Some(options) => MongoDb::new(options),
        None => MongoDb::fairing(),
    }
}

/// Returns whether a command was handled.
pub async fn handle_cli() -> Result<bool, Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("check", sub_matches)) => {
            let options = match sub_matches.get_one::<String>("url") {
                Some(url) => json!({ "url": url }),
                None => match options_from_env() {
                    Some(options) => options,
                    None => configured_options(&Config::figment())?,
                },
            };

            check(ConnectionBatch::from_value(options)?).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

async fn check(batch: ConnectionBatch) -> Result<(), Box<dyn std::error::Error>> {
    let connector = MongoConnector;

    let mongo = match bootstrap(&batch, &connector).await {
        Ok(mongo) => mongo,
        Err(e) => {
            eprintln!("Connection check failed: {}", e);
            std::process::exit(1);
        }
    };

    for (index, db) in mongo.db.iter().enumerate() {
        let collections = db.list_collection_names().await?;
        println!(
            "[{}] database `{}` online, {} collection(s)",
            index,
            db.name(),
            collections.len()
        );
    }

    let failed = close_all(&mongo, &connector).await;
    if failed > 0 {
        eprintln!("{} connection(s) failed to close", failed);
    }

    Ok(())
}
