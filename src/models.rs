use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::messages;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = messages, check_for_backend(diesel::sqlite::Sqlite))]
pub struct Message {
    pub id: i32,
    pub body: String,
    pub username: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage<'a> {
    pub body: &'a str,
    pub username: &'a str,
    pub created_at: NaiveDateTime,
}

/// Columns written by an update. A `None` body leaves the stored one alone.
#[derive(AsChangeset)]
#[diesel(table_name = messages)]
pub struct MessageChanges<'a> {
    pub body: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}
