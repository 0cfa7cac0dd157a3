//! # rocket-mongo - MongoDB connections for Rocket
//!
//! A fairing that connects to one or more MongoDB deployments while Rocket
//! ignites, hands the connected clients to route handlers and other fairings,
//! and closes them again on shutdown.
//!
//! ## Exposure
//!
//! - without `decorate`: [`Mongo`] is managed state (`&State<Mongo>` or the
//!   `&Mongo` request guard);
//! - `decorate = true`: attached as `mongo` on [`ServerDecorations`] and
//!   [`RequestDecorations`], read with `Decorated<MongoName>`;
//! - `decorate = "name"`: attached under `name`, one connection per name.

pub mod bootstrap;
pub mod config;
pub mod connector;
pub mod db;
pub mod decorate;
pub mod errors;
pub mod fairing;
pub mod redact;

pub use mongodb;

pub use crate::{
    config::{ConnectionBatch, ConnectionSpec, DEFAULT_DECORATION, DEFAULT_URL, Decorate, DecorateMode},
    connector::{Connector, MongoConnector},
    db::{Connection, Handles, IdGenerator, Lib, Mongo},
    decorate::{Attach, Decorated, DecorationName, MongoName, RequestDecorations, ServerDecorations},
    errors::{AttachError, BoxError, CloseError, ConnectionError, Error, ValidationError},
    fairing::MongoDb,
};
