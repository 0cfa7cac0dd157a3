use mongodb::bson::doc;
use rocket::serde::json::Json;
use rocket::{Request, catch, get, http::Status, routes as rocket_routes};
use rocket_mongo::Mongo;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Serialize, Clone, Default)]
pub struct DatabaseStatus {
    pub name: String,
    pub online: bool,
}

#[derive(Serialize, Clone, Default)]
pub struct HealthStatus {
    pub databases: Vec<DatabaseStatus>,
}

#[get("/")]
pub fn index() -> &'static str {
    "rocket-mongo"
}

#[get("/check-health")]
pub async fn health(mongo: &Mongo) -> Json<HealthStatus> {
    let mut health = HealthStatus::default();

    for db in mongo.db.iter() {
        let online = db.run_command(doc! { "ping": 1 }).await.is_ok();
        health.databases.push(DatabaseStatus {
            name: db.name().to_string(),
            online,
        });
    }

    Json(health)
}

#[get("/<index>/collections")]
pub async fn collections(mongo: &Mongo, index: usize) -> Result<Json<Vec<String>>, Status> {
    let db = mongo.db.get(index).ok_or(Status::NotFound)?;

    let names = db
        .list_collection_names()
        .await
        .map_err(|_| Status::InternalServerError)?;

    Ok(Json(names))
}

#[get("/object-id")]
pub fn object_id(mongo: &Mongo) -> String {
    mongo.object_id.generate().to_hex()
}

#[catch(404)]
pub fn catch404(req: &Request) -> Json<Value> {
    Json(json!({ "error": format!("{} not found", req.uri()), "status": 404 }))
}

#[catch(500)]
pub fn catch500() -> Json<Value> {
    Json(json!({ "error": "Internal server error", "status": 500 }))
}

pub fn routes() -> Vec<rocket::Route> {
    rocket_routes![health, collections, object_id]
}
