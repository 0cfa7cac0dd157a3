//! # Named decorations
//!
//! With `decorate` set, the connected state is not managed as [`Mongo`]
//! directly but attached by name to two extension points: one for the server
//! ([`ServerDecorations`]) and one seen by every request
//! ([`RequestDecorations`], read through the [`Decorated`] guard).
//!
//! ```rust,no_run
//! use rocket::get;
//! use rocket_mongo::{Decorated, DecorationName};
//!
//! struct Users;
//!
//! impl DecorationName for Users {
//!     const NAME: &'static str = "users";
//! }
//!
//! #[get("/users/count")]
//! async fn count(users: Decorated<Users>) -> String {
//!     let db = users.db.single().expect("one connection per name");
//!     let count = db
//!         .collection::<mongodb::bson::Document>("users")
//!         .estimated_document_count()
//!         .await
//!         .unwrap_or_default();
//!     count.to_string()
//! }
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, RwLock};

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::{Phase, Rocket};

use crate::config::DEFAULT_DECORATION;
use crate::db::Mongo;
use crate::errors::AttachError;

/// Something state can be attached to by name.
pub trait Attach {
    fn attach(&self, name: &str, value: Arc<Mongo>) -> Result<(), AttachError>;
}

#[derive(Default)]
pub struct Decorations {
    entries: RwLock<HashMap<String, Arc<Mongo>>>,
}

impl Decorations {
    pub fn get(&self, name: &str) -> Option<Arc<Mongo>> {
        self.entries.read().ok()?.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Attach for Decorations {
    fn attach(&self, name: &str, value: Arc<Mongo>) -> Result<(), AttachError> {
        let mut entries = self.entries.write().map_err(|_| AttachError::Poisoned)?;
        if entries.contains_key(name) {
            return Err(AttachError::Duplicate(name.to_string()));
        }
        entries.insert(name.to_string(), value);
        Ok(())
    }
}

macro_rules! extension_point {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Default)]
        pub struct $name(Decorations);

        impl Deref for $name {
            type Target = Decorations;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Attach for $name {
            fn attach(&self, name: &str, value: Arc<Mongo>) -> Result<(), AttachError> {
                self.0.attach(name, value)
            }
        }

        impl $name {
            /// Looks the extension point up on a Rocket instance.
            pub fn of<P: Phase>(rocket: &Rocket<P>) -> Option<&Self> {
                rocket.state::<Self>()
            }
        }
    };
}

extension_point!(
    /// Decorations of the server itself.
    ServerDecorations
);

extension_point!(
    /// Decorations every request sees.
    RequestDecorations
);

/// Names a decoration at the type level, for use with [`Decorated`].
pub trait DecorationName: Send + Sync + 'static {
    const NAME: &'static str;
}

/// The decoration created by `decorate = true`.
pub struct MongoName;

impl DecorationName for MongoName {
    const NAME: &'static str = DEFAULT_DECORATION;
}

/// Request guard resolving the decoration named by `N`.
pub struct Decorated<N: DecorationName = MongoName> {
    mongo: Arc<Mongo>,
    _name: PhantomData<fn() -> N>,
}

impl<N: DecorationName> Decorated<N> {
    pub fn into_inner(self) -> Arc<Mongo> {
        self.mongo
    }
}

impl<N: DecorationName> Deref for Decorated<N> {
    type Target = Mongo;

    fn deref(&self) -> &Self::Target {
        &self.mongo
    }
}

#[rocket::async_trait]
impl<'r, N: DecorationName> FromRequest<'r> for Decorated<N> {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let found = RequestDecorations::of(request.rocket()).and_then(|points| points.get(N::NAME));

        match found {
            Some(mongo) => Outcome::Success(Decorated {
                mongo,
                _name: PhantomData,
            }),
            None => {
                tracing::error!(target: "rocket_mongo", "no MongoDB decoration named `{}`", N::NAME);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
