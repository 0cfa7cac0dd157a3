use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use thiserror::Error;

use crate::config::{ConnectionSpec, Settings};
use crate::errors::BoxError;

/// Setting recognised for compatibility and otherwise ignored: the driver
/// always runs on Rocket's tokio runtime.
pub const PROMISE_LIBRARY: &str = "promiseLibrary";

/// Everything but URI unreserved characters is escaped in option keys and values.
const OPTION: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// The seam between the fairing and the database driver.
#[rocket::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establishes one connection. Must not return before the server answered.
    async fn connect(&self, spec: &ConnectionSpec) -> Result<Client, BoxError>;

    async fn close(&self, client: Client) -> Result<(), BoxError>;
}

/// Connects with the official `mongodb` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[rocket::async_trait]
impl Connector for MongoConnector {
    async fn connect(&self, spec: &ConnectionSpec) -> Result<Client, BoxError> {
        let url = apply_settings(&spec.url, &spec.settings)?;
        let options = ClientOptions::parse(url.as_str()).await?;
        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        Ok(client)
    }

    async fn close(&self, client: Client) -> Result<(), BoxError> {
        client.shutdown().await;
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("setting `{key}` must be a string, number, boolean or a list of those")]
pub struct SettingsError {
    pub key: String,
}

/// Appends `settings` to the query string of a connection string, where the
/// driver reads its options from.
pub fn apply_settings(url: &str, settings: &Settings) -> Result<String, SettingsError> {
    let mut pairs = Vec::with_capacity(settings.len());
    for (key, value) in settings {
        if key == PROMISE_LIBRARY {
            tracing::debug!(target: "rocket_mongo", "ignoring `{PROMISE_LIBRARY}` setting");
            continue;
        }

        let rendered = render(value).ok_or_else(|| SettingsError { key: key.clone() })?;
        pairs.push(format!("{}={rendered}", encode(key)));
    }

    if pairs.is_empty() {
        return Ok(url.to_string());
    }

    let query = pairs.join("&");
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    let rest = &url[after_scheme..];

    let joined = if rest.contains('?') {
        let separator = if url.ends_with('?') || url.ends_with('&') { "" } else { "&" };
        format!("{url}{separator}{query}")
    } else if rest.contains('/') {
        format!("{url}?{query}")
    } else {
        format!("{url}/?{query}")
    };

    Ok(joined)
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, OPTION).to_string()
}

/// Encoded option value; list items stay separated by a literal `,`.
fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(encode(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) => None,
                other => render(other),
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        Value::Null | Value::Object(_) => None,
    }
}
