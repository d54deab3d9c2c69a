use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::users::model::{Address, Company, Geo, NewUser, User, UserUpdate};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email already in use")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Store of user records keyed by id, unique on username and email.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError>;
    async fn get(&self, id: Uuid) -> Result<User, DirectoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;
    async fn list(&self) -> Result<Vec<User>, DirectoryError>;
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, DirectoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), DirectoryError>;
    async fn count(&self) -> Result<i64, DirectoryError>;
}

const USER_COLUMNS: &str = r#"
    id, username, email, name, phone, website, password_hash,
    address_street, address_suite, address_city, address_zipcode,
    address_geo_lat, address_geo_lng,
    company_name, company_catch_phrase, company_bs
"#;

/// Flat `users` row; address and company live in prefixed columns.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    name: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    password_hash: String,
    address_street: Option<String>,
    address_suite: Option<String>,
    address_city: Option<String>,
    address_zipcode: Option<String>,
    address_geo_lat: Option<String>,
    address_geo_lng: Option<String>,
    company_name: Option<String>,
    company_catch_phrase: Option<String>,
    company_bs: Option<String>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        let geo = (r.address_geo_lat.is_some() || r.address_geo_lng.is_some()).then(|| Geo {
            lat: r.address_geo_lat,
            lng: r.address_geo_lng,
        });
        let address = (r.address_street.is_some()
            || r.address_suite.is_some()
            || r.address_city.is_some()
            || r.address_zipcode.is_some()
            || geo.is_some())
        .then(|| Address {
            street: r.address_street,
            suite: r.address_suite,
            city: r.address_city,
            zipcode: r.address_zipcode,
            geo,
        });
        let company = (r.company_name.is_some()
            || r.company_catch_phrase.is_some()
            || r.company_bs.is_some())
        .then(|| Company {
            name: r.company_name,
            catch_phrase: r.company_catch_phrase,
            bs: r.company_bs,
        });
        Self {
            id: r.id,
            name: r.name,
            username: r.username,
            email: r.email,
            address,
            phone: r.phone,
            website: r.website,
            company,
            password_hash: r.password_hash,
        }
    }
}

/// Address and company flattened into their column values.
#[derive(Debug, Default, PartialEq, Eq)]
struct EmbeddedColumns {
    street: Option<String>,
    suite: Option<String>,
    city: Option<String>,
    zipcode: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
    company_name: Option<String>,
    catch_phrase: Option<String>,
    bs: Option<String>,
}

impl EmbeddedColumns {
    fn new(address: Option<Address>, company: Option<Company>) -> Self {
        let address = address.unwrap_or_default();
        let geo = address.geo.unwrap_or_default();
        let company = company.unwrap_or_default();
        Self {
            street: address.street,
            suite: address.suite,
            city: address.city,
            zipcode: address.zipcode,
            lat: geo.lat,
            lng: geo.lng,
            company_name: company.name,
            catch_phrase: company.catch_phrase,
            bs: company.bs,
        }
    }
}

fn map_write_error(err: sqlx::Error, what: &'static str) -> DirectoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_username_key") => return DirectoryError::DuplicateUsername,
                Some("users_email_key") => return DirectoryError::DuplicateEmail,
                _ => {}
            }
        }
    }
    DirectoryError::Backend(anyhow::Error::new(err).context(what))
}

/// Postgres-backed directory over the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, DirectoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError> {
        // Pre-checks give the precise error; the constraints still catch races.
        if self.find_by_username(&user.username).await?.is_some() {
            return Err(DirectoryError::DuplicateUsername);
        }
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(DirectoryError::DuplicateEmail);
        }

        let cols = EmbeddedColumns::new(user.address, user.company);
        let sql = format!(
            r#"
            INSERT INTO users (
                username, email, name, phone, website, password_hash,
                address_street, address_suite, address_city, address_zipcode,
                address_geo_lat, address_geo_lng,
                company_name, company_catch_phrase, company_bs
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(&user.website)
            .bind(&user.password_hash)
            .bind(cols.street)
            .bind(cols.suite)
            .bind(cols.city)
            .bind(cols.zipcode)
            .bind(cols.lat)
            .bind(cols.lng)
            .bind(cols.company_name)
            .bind(cols.catch_phrase)
            .bind(cols.bs)
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_write_error(e, "insert user"))?;
        Ok(row.into())
    }

    async fn get(&self, id: Uuid) -> Result<User, DirectoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get user")?
            .map(User::from)
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        self.find_one("email", email).await
    }

    async fn list(&self) -> Result<Vec<User>, DirectoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, DirectoryError> {
        let cols = EmbeddedColumns::new(update.address, update.company);
        let sql = format!(
            r#"
            UPDATE users SET
                name = $2,
                email = COALESCE($3, email),
                phone = $4,
                website = $5,
                address_street = $6,
                address_suite = $7,
                address_city = $8,
                address_zipcode = $9,
                address_geo_lat = $10,
                address_geo_lng = $11,
                company_name = $12,
                company_catch_phrase = $13,
                company_bs = $14
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.email)
            .bind(&update.phone)
            .bind(&update.website)
            .bind(cols.street)
            .bind(cols.suite)
            .bind(cols.city)
            .bind(cols.zipcode)
            .bind(cols.lat)
            .bind(cols.lng)
            .bind(cols.company_name)
            .bind(cols.catch_phrase)
            .bind(cols.bs)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| map_write_error(e, "update user"))?
            .map(User::from)
            .ok_or(DirectoryError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DirectoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, DirectoryError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await
            .context("count users")?;
        Ok(n)
    }
}
