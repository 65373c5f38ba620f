use std::net::IpAddr;

use anyhow::Result;
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Config, Rocket, State};
use serde::Serialize;

use crate::db::{Database, Group};

#[derive(Serialize)]
struct DbInfo {
    name: String,
}

/// Serves the database read-only until the server is shut down (e.g. with Ctrl+C).
pub async fn serve(db: Database, address: IpAddr, port: u16) -> Result<()> {
    let server = mount(
        rocket::custom(Config {
            log_level: rocket::config::LogLevel::Critical,
            address,
            port,
            ..Default::default()
        }),
        db,
    )
    .ignite()
    .await?;
    log::info!("Listening on http://{address}:{port}");
    server.launch().await?;
    Ok(())
}

fn mount(rocket: Rocket<Build>, db: Database) -> Rocket<Build> {
    rocket
        .manage(db)
        .mount("/api", routes![dbinfo, groups])
}

#[get("/dbinfo")]
fn dbinfo(db: &State<Database>) -> Json<DbInfo> {
    Json(DbInfo { name: db.name() })
}

#[get("/groups")]
fn groups(db: &State<Database>) -> Json<Vec<Group>> {
    Json(db.groups())
}
