//! # MongoDB fairing
//!
//! Attaching [`MongoDb`] to a Rocket instance connects every configured
//! MongoDB deployment while Rocket ignites, publishes the connected [`Mongo`]
//! state, and closes all connections when Rocket shuts down.
//!
//! ## Configuration
//!
//! Options passed to [`MongoDb::new`] win. Otherwise the `mongodb` key of
//! Rocket's configuration is used (`Rocket.toml` or `ROCKET_MONGODB`), and
//! without either a single connection to [`DEFAULT_URL`](crate::DEFAULT_URL)
//! is made.
//!
//! ```rust,no_run
//! use rocket_mongo::MongoDb;
//! use serde_json::json;
//!
//! #[rocket::launch]
//! fn rocket() -> _ {
//!     rocket::build().attach(MongoDb::new(json!([
//!         { "url": "mongodb://localhost:27017/users", "decorate": "users" },
//!         { "url": "mongodb://localhost:27017/orders", "decorate": "orders" }
//!     ])))
//! }
//! ```

use std::sync::{Arc, OnceLock};

use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::{Build, Orbit, Rocket};
use serde_json::Value;
use tracing::{error, info};

use crate::bootstrap::{bootstrap, close_all};
use crate::config::{ConnectionBatch, DecorateMode, DEFAULT_DECORATION};
use crate::connector::{Connector, MongoConnector};
use crate::db::Mongo;
use crate::decorate::{Attach, RequestDecorations, ServerDecorations};
use crate::errors::{AttachError, Error, ValidationError};

/// Configuration key read from Rocket's figment.
pub const CONFIG_KEY: &str = "mongodb";

const TARGET: &str = "rocket_mongo";

enum Source {
    Figment,
    Value(Value),
    Batch(ConnectionBatch),
}

/// The fairing. See the [module docs](self).
pub struct MongoDb {
    source: Source,
    connector: Arc<dyn Connector>,
    registered: OnceLock<Arc<Mongo>>,
}

impl MongoDb {
    /// Reads its options from Rocket's configuration.
    pub fn fairing() -> Self {
        Self::with_source(Source::Figment)
    }

    /// Uses the given options: one connection object, an array of them, or
    /// `null` for the default connection.
    pub fn new(options: Value) -> Self {
        Self::with_source(Source::Value(options))
    }

    pub fn from_batch(batch: ConnectionBatch) -> Self {
        Self::with_source(Source::Batch(batch))
    }

    /// Replaces the driver-backed [`MongoConnector`].
    pub fn with_connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            connector: Arc::new(MongoConnector),
            registered: OnceLock::new(),
        }
    }

    /// State published by this fairing, once Rocket has ignited.
    pub fn state(&self) -> Option<&Arc<Mongo>> {
        self.registered.get()
    }

    fn batch(&self, rocket: &Rocket<Build>) -> Result<ConnectionBatch, ValidationError> {
        match &self.source {
            Source::Batch(batch) => Ok(batch.clone()),
            Source::Value(value) => ConnectionBatch::from_value(value.clone()),
            Source::Figment => ConnectionBatch::from_value(configured_options(rocket.figment())?),
        }
    }

    async fn register(&self, rocket: Rocket<Build>) -> Result<Rocket<Build>, (Rocket<Build>, Error)> {
        if self.registered.get().is_some() {
            return Err((rocket, Error::AlreadyIgnited));
        }

        let batch = match self.batch(&rocket) {
            Ok(batch) => batch,
            Err(e) => return Err((rocket, e.into())),
        };

        if let Err(e) = preflight(&rocket, &batch) {
            return Err((rocket, e));
        }

        let mongo = match bootstrap(&batch, &*self.connector).await {
            Ok(mongo) => Arc::new(mongo),
            Err(e) => return Err((rocket, e.into())),
        };

        match expose(rocket, &batch, &mongo) {
            Ok(rocket) => match self.registered.set(mongo) {
                Ok(()) => Ok(rocket),
                // Lost a race against a concurrent ignite of this same instance.
                Err(mongo) => {
                    close_all(&mongo, &*self.connector).await;
                    Err((rocket, Error::AlreadyIgnited))
                }
            },
            Err((rocket, e)) => {
                close_all(&mongo, &*self.connector).await;
                Err((rocket, e))
            }
        }
    }
}

impl Default for MongoDb {
    fn default() -> Self {
        Self::fairing()
    }
}

#[rocket::async_trait]
impl Fairing for MongoDb {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite | Kind::Shutdown,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        match self.register(rocket).await {
            Ok(rocket) => Ok(rocket),
            Err((rocket, e)) => {
                error!(target: TARGET, "MongoDB fairing failed: {e}");
                Err(rocket)
            }
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        let Some(mongo) = self.registered.get() else {
            return;
        };

        let failed = close_all(mongo, &*self.connector).await;
        info!(
            target: TARGET,
            "closed {} MongoDB connection(s), {failed} failed",
            mongo.client.len()
        );
    }
}

/// Options under [`CONFIG_KEY`], or `null` when the key is absent.
pub fn configured_options(figment: &Figment) -> Result<Value, ValidationError> {
    if !figment.contains(CONFIG_KEY) {
        return Ok(Value::Null);
    }

    figment
        .extract_inner::<Value>(CONFIG_KEY)
        .map_err(|e| ValidationError::Invalid {
            index: 0,
            message: e.to_string(),
        })
}

/// Refuses registrations that would clash with state already published, before
/// anything is connected.
fn preflight(rocket: &Rocket<Build>, batch: &ConnectionBatch) -> Result<(), Error> {
    if batch.mode() == DecorateMode::Expose {
        return match rocket.state::<Mongo>() {
            Some(_) => Err(Error::AlreadyRegistered),
            None => Ok(()),
        };
    }

    let taken = |name: &str| {
        ServerDecorations::of(rocket).is_some_and(|points| points.contains(name))
            || RequestDecorations::of(rocket).is_some_and(|points| points.contains(name))
    };

    match batch.decoration_names().into_iter().find(|&name| taken(name)) {
        Some(name) => Err(AttachError::Duplicate(name.to_string()).into()),
        None => Ok(()),
    }
}

fn expose(
    rocket: Rocket<Build>,
    batch: &ConnectionBatch,
    mongo: &Arc<Mongo>,
) -> Result<Rocket<Build>, (Rocket<Build>, Error)> {
    let decorations: Vec<(String, Arc<Mongo>)> = match batch.mode() {
        DecorateMode::Expose => {
            if rocket.state::<Mongo>().is_some() {
                return Err((rocket, Error::AlreadyRegistered));
            }
            return Ok(rocket.manage(Mongo::clone(mongo)));
        }
        DecorateMode::Default => vec![(DEFAULT_DECORATION.to_string(), Arc::clone(mongo))],
        DecorateMode::Named => batch
            .iter()
            .enumerate()
            .filter_map(|(index, spec)| {
                let name = spec.decorate.as_ref()?.name().to_string();
                Some((name, Arc::new(mongo.connection(index)?)))
            })
            .collect(),
    };

    let rocket = manage_default::<ServerDecorations>(rocket);
    let rocket = manage_default::<RequestDecorations>(rocket);

    match attach_all(&rocket, &decorations) {
        Ok(()) => Ok(rocket),
        Err(e) => Err((rocket, e.into())),
    }
}

fn manage_default<T: Default + Send + Sync + 'static>(rocket: Rocket<Build>) -> Rocket<Build> {
    if rocket.state::<T>().is_some() {
        rocket
    } else {
        rocket.manage(T::default())
    }
}

fn attach_all(rocket: &Rocket<Build>, decorations: &[(String, Arc<Mongo>)]) -> Result<(), AttachError> {
    let server = ServerDecorations::of(rocket).ok_or(AttachError::Missing)?;
    let request = RequestDecorations::of(rocket).ok_or(AttachError::Missing)?;
    let points: [&dyn Attach; 2] = [server, request];

    for (name, mongo) in decorations {
        for point in points {
            point.attach(name, Arc::clone(mongo))?;
        }
    }

    Ok(())
}
