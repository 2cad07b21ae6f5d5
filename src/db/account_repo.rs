// src/db/account_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::account::{Account, Address, Role},
};

pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub shopname: String,
    pub password_hash: String,
    pub image: Option<String>,
    pub address: Address,
    pub role: Role,
    pub created_by: Option<String>,
}

/// Fields an admin pushes down to the accounts it created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritedProfile {
    pub shopname: Option<String>,
    pub image: Option<String>,
    pub address: Option<Address>,
}

impl InheritedProfile {
    pub fn is_empty(&self) -> bool {
        self.shopname.is_none() && self.image.is_none() && self.address.is_none()
    }
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    async fn list_all(&self) -> Result<Vec<Account>, AppError>;

    async fn list_created_by(&self, creator_email: &str) -> Result<Vec<Account>, AppError>;

    async fn find_first_by_role(&self, role: Role) -> Result<Option<Account>, AppError>;

    /// Writes name, phone, shopname, image and address of an existing account.
    async fn update_profile(&self, account: &Account) -> Result<Account, AppError>;

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, AppError>;

    async fn cascade_profile(
        &self,
        creator_email: &str,
        profile: &InheritedProfile,
    ) -> Result<u64, AppError>;

    async fn delete_by_emails(&self, emails: &[String]) -> Result<u64, AppError>;
}

const ACCOUNT_COLUMNS: &str = r#"
    id, email, name, phone, shopname, password_hash, image,
    local_area, city, state, country, pin,
    role, created_by, created_at
"#;

// Postgres-backed account directory
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError> {
        let sql = format!(
            r#"
            INSERT INTO accounts (
                email, name, phone, shopname, password_hash, image,
                local_area, city, state, country, pin,
                role, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(&account.email)
            .bind(&account.name)
            .bind(&account.phone)
            .bind(&account.shopname)
            .bind(&account.password_hash)
            .bind(&account.image)
            .bind(&account.address.local_area)
            .bind(&account.address.city)
            .bind(&account.address.state)
            .bind(&account.address.country)
            .bind(&account.address.pin)
            .bind(account.role)
            .bind(&account.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // Unique email violation becomes a friendlier error
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::EmailAlreadyExists;
                    }
                }
                e.into()
            })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = lower($1)");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at ASC");
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn list_created_by(&self, creator_email: &str) -> Result<Vec<Account>, AppError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE created_by = lower($1) ORDER BY created_at ASC"
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(creator_email)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn find_first_by_role(&self, role: Role) -> Result<Option<Account>, AppError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = $1 ORDER BY created_at ASC LIMIT 1"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn update_profile(&self, account: &Account) -> Result<Account, AppError> {
        let sql = format!(
            r#"
            UPDATE accounts
            SET name = $2, phone = $3, shopname = $4, image = $5,
                local_area = $6, city = $7, state = $8, country = $9, pin = $10
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(account.id)
            .bind(&account.name)
            .bind(&account.phone)
            .bind(&account.shopname)
            .bind(&account.image)
            .bind(&account.address.local_area)
            .bind(&account.address.city)
            .bind(&account.address.state)
            .bind(&account.address.country)
            .bind(&account.address.pin)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Account"))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE email = lower($1)")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cascade_profile(
        &self,
        creator_email: &str,
        profile: &InheritedProfile,
    ) -> Result<u64, AppError> {
        if profile.is_empty() {
            return Ok(0);
        }

        // COALESCE keeps the current value for fields the admin did not change
        let address = profile.address.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET shopname = COALESCE($2, shopname),
                image = COALESCE($3, image),
                local_area = COALESCE($4, local_area),
                city = COALESCE($5, city),
                state = COALESCE($6, state),
                country = COALESCE($7, country),
                pin = COALESCE($8, pin)
            WHERE created_by = lower($1)
            "#,
        )
        .bind(creator_email)
        .bind(&profile.shopname)
        .bind(&profile.image)
        .bind(address.map(|a| a.local_area.as_str()))
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.state.as_str()))
        .bind(address.map(|a| a.country.as_str()))
        .bind(address.map(|a| a.pin.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_emails(&self, emails: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE email = ANY($1)")
            .bind(emails)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
