//! # Exposed database state
//!
//! [`Mongo`] is what the fairing publishes once every configured connection is
//! up. With a single configured connection `client` and `db` are
//! [`Handles::Single`]; with several they are [`Handles::Many`], in the same
//! order as the configuration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rocket::get;
//! use rocket_mongo::Mongo;
//!
//! #[get("/collections")]
//! async fn collections(mongo: &Mongo) -> String {
//!     let db = mongo.db.single().expect("one connection configured");
//!     db.list_collection_names().await.unwrap_or_default().join(",")
//! }
//! ```

use mongodb::bson::oid::{self, ObjectId};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use rocket::request::{FromRequest, Outcome, Request};

/// Database used when the connection string names none.
pub const DEFAULT_DATABASE: &str = "test";

/// One established connection.
#[derive(Debug, Clone)]
pub struct Connection {
    pub client: Client,
    pub db: Database,
}

impl Connection {
    pub fn new(client: Client) -> Self {
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        Self { client, db }
    }
}

/// A single handle, or one handle per configured connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handles<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T> Handles<T> {
    fn from_vec(items: Vec<T>) -> Self {
        match <[T; 1]>::try_from(items) {
            Ok([item]) => Handles::Single(item),
            Err(items) => Handles::Many(items),
        }
    }

    pub fn single(&self) -> Option<&T> {
        match self {
            Handles::Single(item) => Some(item),
            Handles::Many(_) => None,
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            Handles::Single(item) => (index == 0).then_some(item),
            Handles::Many(items) => items.get(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Handles::Single(_) => 1,
            Handles::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Handles::Many(_))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Handles::Single(item) => std::slice::from_ref(item).iter(),
            Handles::Many(items) => items.iter(),
        }
    }
}

/// Marker for the driver crate backing this fairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lib;

impl Lib {
    pub const NAME: &'static str = "mongodb";

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Parses a connection string with the same driver the fairing uses.
    pub async fn client_options(&self, url: &str) -> mongodb::error::Result<ClientOptions> {
        ClientOptions::parse(url).await
    }
}

/// Creates and parses [`ObjectId`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn generate(&self) -> ObjectId {
        ObjectId::new()
    }

    pub fn parse(&self, hex: &str) -> Result<ObjectId, oid::Error> {
        ObjectId::parse_str(hex)
    }
}

/// Connected state published by the fairing.
#[derive(Debug, Clone)]
pub struct Mongo {
    pub client: Handles<Client>,
    pub db: Handles<Database>,
    pub lib: Lib,
    pub object_id: IdGenerator,
}

impl Mongo {
    pub fn from_connections(connections: Vec<Connection>) -> Self {
        let (clients, dbs): (Vec<_>, Vec<_>) = connections
            .into_iter()
            .map(|connection| (connection.client, connection.db))
            .unzip();

        Self {
            client: Handles::from_vec(clients),
            db: Handles::from_vec(dbs),
            lib: Lib,
            object_id: IdGenerator,
        }
    }

    /// View of a single connection of this state.
    pub fn connection(&self, index: usize) -> Option<Mongo> {
        let client = self.client.get(index)?.clone();
        let db = self.db.get(index)?.clone();
        Some(Self::from_connections(vec![Connection { client, db }]))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r Mongo {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.rocket().state::<Mongo>() {
            Some(mongo) => Outcome::Success(mongo),
            None => {
                tracing::error!(
                    target: "rocket_mongo",
                    "MongoDB state requested but the fairing exposed none; is `decorate` set?"
                );
                Outcome::Error((rocket::http::Status::InternalServerError, ()))
            }
        }
    }
}
