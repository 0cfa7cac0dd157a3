//! Concurrent connect of a whole batch, and the matching close pass.

use mongodb::Client;
use rocket::futures::StreamExt;
use rocket::futures::future::join_all;
use rocket::futures::stream::FuturesUnordered;
use tracing::{error, info};

use crate::config::{ConnectionBatch, ConnectionSpec};
use crate::connector::Connector;
use crate::db::{Connection, Mongo};
use crate::errors::{CloseError, ConnectionError};
use crate::redact::{describe, redact_url};

const TARGET: &str = "rocket_mongo";

async fn connect_one<C>(spec: &ConnectionSpec, connector: &C) -> Result<Connection, ConnectionError>
where
    C: Connector + ?Sized,
{
    match connector.connect(spec).await {
        Ok(client) => {
            info!(target: TARGET, "MongoDB connection created for {}", describe(spec));
            Ok(Connection::new(client))
        }
        Err(source) => {
            let err = ConnectionError {
                url: redact_url(&spec.url),
                source,
            };
            error!(target: TARGET, "{err}");
            Err(err)
        }
    }
}

/// Connects every spec of `batch` concurrently.
///
/// Connections come back in batch order. The first failure to arrive is
/// returned right away: attempts still in flight are dropped and the ones
/// that already succeeded are closed again.
pub async fn connect_all<C>(
    batch: &ConnectionBatch,
    connector: &C,
) -> Result<Vec<Connection>, ConnectionError>
where
    C: Connector + ?Sized,
{
    let mut pending: FuturesUnordered<_> = batch
        .iter()
        .enumerate()
        .map(|(index, spec)| async move { (index, connect_one(spec, connector).await) })
        .collect();

    let mut established: Vec<Option<Connection>> = (0..batch.len()).map(|_| None).collect();
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(connection) => established[index] = Some(connection),
            Err(err) => {
                drop(pending);
                close_clients(
                    connector,
                    established
                        .into_iter()
                        .flatten()
                        .map(|connection| connection.client),
                )
                .await;
                return Err(err);
            }
        }
    }

    Ok(established.into_iter().flatten().collect())
}

/// Connects `batch` and assembles the state to publish.
pub async fn bootstrap<C>(batch: &ConnectionBatch, connector: &C) -> Result<Mongo, ConnectionError>
where
    C: Connector + ?Sized,
{
    connect_all(batch, connector).await.map(Mongo::from_connections)
}

/// Closes every client held by `mongo`. Failures are logged, never returned;
/// the number of failed closes is.
pub async fn close_all<C>(mongo: &Mongo, connector: &C) -> usize
where
    C: Connector + ?Sized,
{
    close_clients(connector, mongo.client.iter().cloned()).await
}

async fn close_clients<C, I>(connector: &C, clients: I) -> usize
where
    C: Connector + ?Sized,
    I: IntoIterator<Item = Client>,
{
    let closes = clients.into_iter().enumerate().map(|(index, client)| async move {
        connector
            .close(client)
            .await
            .map_err(|source| CloseError { index, source })
    });

    join_all(closes)
        .await
        .into_iter()
        .filter_map(Result::err)
        .inspect(|err| error!(target: TARGET, "{err}"))
        .count()
}
