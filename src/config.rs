use std::{ env, net::SocketAddr };

use crate::error::Error;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5555";
pub const DEFAULT_DATABASE_URL: &str = "app.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub address: SocketAddr,
    pub database_url: String,
}

impl Config {
    /// Reads `CHATTERBOX_ADDRESS` and `DATABASE_URL` from the process environment.
    pub fn from_env() -> Result<Config, Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, Error> where F: Fn(&str) -> Option<String> {
        let raw_address = lookup("CHATTERBOX_ADDRESS").unwrap_or_else(||
            DEFAULT_ADDRESS.to_owned()
        );
        let address: SocketAddr = raw_address
            .parse()
            .map_err(|error| Error::Address(raw_address.clone(), error))?;
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());

        Ok(Config { address, database_url })
    }
}
