//! [`UserStore`] for [`SqliteStore`].

use chrono::Utc;
use rusqlite::{types::Value, OptionalExtension as _};

use registrar_core::{
  store::UserStore,
  user::{NewUserRecord, User, UserChanges},
};

use super::SqliteStore;
use crate::{
  encode::{encode_dt, RawUser, USER_COLUMNS},
  Result,
};

impl UserStore for SqliteStore {
  async fn create_user(&self, input: NewUserRecord) -> Result<User> {
    let now = encode_dt(Utc::now());
    let email = input.email.trim().to_lowercase();
    let role = input.role.as_ref().to_owned();
    let location = input.location.map(|l| l.as_ref().to_owned());

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          &format!(
            "INSERT INTO users (email, display_name, role, location, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {USER_COLUMNS}"
          ),
          rusqlite::params![email, input.display_name, role, location, input.password_hash, now],
          RawUser::from_row,
        )?;
        Ok(raw)
      })
      .await?;

    let user = raw.into_user()?;
    tracing::info!(user_id = user.id, role = %user.role, "user created");
    Ok(user)
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![id],
            RawUser::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_credentials(&self, email: String) -> Result<Option<(User, String)>> {
    let email = email.trim().to_lowercase();

    let found: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        let found = conn
          .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
            rusqlite::params![email],
            |row| Ok((RawUser::from_row(row)?, row.get(6)?)),
          )
          .optional()?;
        Ok(found)
      })
      .await?;

    found
      .map(|(raw, hash)| raw.into_user().map(|user| (user, hash)))
      .transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>> {
    let mut columns: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut set = |column: &str, value: Value| {
      values.push(value);
      columns.push(format!("{column} = ?{}", values.len()));
    };

    if let Some(name) = changes.display_name {
      set("display_name", Value::Text(name));
    }
    if let Some(role) = changes.role {
      set("role", Value::Text(role.as_ref().to_owned()));
    }
    if let Some(location) = changes.location {
      let value = location.map_or(Value::Null, |l| Value::Text(l.as_ref().to_owned()));
      set("location", value);
    }
    if let Some(hash) = changes.password_hash {
      set("password_hash", Value::Text(hash));
    }

    if columns.is_empty() {
      return self.get_user(id).await;
    }

    values.push(Value::Integer(id));
    let sql = format!(
      "UPDATE users SET {} WHERE id = ?{} RETURNING {USER_COLUMNS}",
      columns.join(", "),
      values.len(),
    );

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(&sql, rusqlite::params_from_iter(values), RawUser::from_row)
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_user(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?;
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }
}
