use chrono::{ NaiveDateTime, Utc };
use diesel::{ connection::SimpleConnection, prelude::*, sqlite::SqliteConnection };

use crate::{
    error::Error,
    models::{ Message, MessageChanges, NewMessage },
    schema::messages,
};

const CREATE_MESSAGES: &str = include_str!(
    "../migrations/2024-09-01-000000_create_messages/up.sql"
);

/// Durable message storage on top of a single SQLite file.
///
/// Every operation opens its own connection and drops it before returning, so
/// one `Storage` can be shared by all requests.
pub struct Storage {
    database_url: String,
}

impl Storage {
    pub fn new<S: Into<String>>(database_url: S) -> Storage {
        Storage { database_url: database_url.into() }
    }

    fn connect(&self) -> Result<SqliteConnection, Error> {
        let mut connection = SqliteConnection::establish(&self.database_url)?;
        connection.batch_execute("PRAGMA busy_timeout = 5000;")?;
        Ok(connection)
    }

    /// Creates the `messages` table if it is missing. Schema changes are left
    /// to the diesel CLI and the `migrations/` directory.
    pub fn ensure_schema(&self) -> Result<(), Error> {
        let mut connection = self.connect()?;
        connection.batch_execute(CREATE_MESSAGES)?;
        info!("Database ready at {}", self.database_url);
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<Message>, Error> {
        let mut connection = self.connect()?;
        let all = messages::table
            .order((messages::created_at.asc(), messages::id.asc()))
            .select(Message::as_select())
            .load(&mut connection)?;
        Ok(all)
    }

    pub fn create(&self, body: &str, username: &str) -> Result<Message, Error> {
        if body.is_empty() || username.is_empty() {
            return Err(Error::Validation);
        }

        let mut connection = self.connect()?;
        let message = diesel
            ::insert_into(messages::table)
            .values(&(NewMessage { body, username, created_at: now() }))
            .returning(Message::as_returning())
            .get_result(&mut connection)?;
        debug!("Stored message {} from {}", message.id, message.username);
        Ok(message)
    }

    pub fn get(&self, id: i32) -> Result<Option<Message>, Error> {
        let mut connection = self.connect()?;
        let message = messages::table
            .find(id)
            .select(Message::as_select())
            .first(&mut connection)
            .optional()?;
        Ok(message)
    }

    /// Replaces the body when `body` is present and non-empty. `updated_at` is
    /// refreshed on every call either way.
    pub fn update(&self, id: i32, body: Option<&str>) -> Result<Message, Error> {
        let changes = MessageChanges {
            body: body.filter(|body| !body.is_empty()),
            updated_at: now(),
        };

        let mut connection = self.connect()?;
        diesel
            ::update(messages::table.find(id))
            .set(&changes)
            .returning(Message::as_returning())
            .get_result(&mut connection)
            .optional()?
            .ok_or(Error::NotFound)
    }

    pub fn delete(&self, id: i32) -> Result<(), Error> {
        let mut connection = self.connect()?;
        let deleted = diesel::delete(messages::table.find(id)).execute(&mut connection)?;
        if deleted == 0 {
            return Err(Error::NotFound);
        }
        debug!("Deleted message {}", id);
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
