extern crate diesel;
extern crate futures;
extern crate hyper;

#[macro_use]
extern crate log;
extern crate env_logger;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

mod config;
mod error;
mod models;
mod schema;
mod service;
mod storage;

use std::{ process, sync::Arc };

use crate::{ config::Config, error::Error, service::MicroService, storage::Storage };

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    if let Err(error) = run() {
        error!("{}", error);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let config = Config::from_env()?;

    let storage = Arc::new(Storage::new(config.database_url.clone()));
    storage.ensure_schema()?;

    let server = hyper::server::Http
        ::new()
        .bind(&config.address, move || Ok(MicroService::new(Arc::clone(&storage))))?;

    info!("Running microservice at {}", config.address);
    server.run()?;
    Ok(())
}
