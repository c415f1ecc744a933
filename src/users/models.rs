use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::db::schema::users;
use crate::types::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    /// Argon2id PHC string with a fresh random salt.
    pub fn make_password(password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AppError::PasswordHash)
    }

    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub fn set_password(
        &self,
        password: &str,
        conn: &mut SqliteConnection,
    ) -> Result<(), AppError> {
        let hash = User::make_password(password)?;
        diesel::update(users::table.find(self.id))
            .set(users::password_hash.eq(hash))
            .execute(conn)?;
        Ok(())
    }

    pub fn create(
        username: &str,
        email: &str,
        password: &str,
        conn: &mut SqliteConnection,
    ) -> Result<User, AppError> {
        let new_user = NewUser {
            username,
            email,
            password_hash: User::make_password(password)?,
        };
        diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(conn)
            .map_err(Into::into)
    }

    pub fn load_by_name(name: &str, conn: &mut SqliteConnection) -> Result<User, AppError> {
        users::table
            .filter(users::username.eq(name))
            .first::<User>(conn)
            .map_err(Into::into)
    }

    pub fn try_load_by_name(
        name: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<User>, AppError> {
        users::table
            .filter(users::username.eq(name))
            .first::<User>(conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn try_load_by_id(
        user_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Option<User>, AppError> {
        users::table
            .find(user_id)
            .first::<User>(conn)
            .optional()
            .map_err(Into::into)
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: String,
}
