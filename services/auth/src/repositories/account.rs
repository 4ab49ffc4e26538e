//! PostgreSQL-backed account store

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::{info, warn};
use uuid::Uuid;

use super::{AccountStore, PHONE_NUMBER_TAKEN, StoreError, StoreResult, USERNAME_TAKEN};
use crate::models::{
    Account, ApprovalStatus, Category, InfluencerProfile, NewAccount, NewProfile, Price, Role,
    StatusChange,
};

const ACCOUNT_COLUMNS: &str =
    "id, phone_number, username, email, password_hash, role, is_active, date_joined";

const PROFILE_COLUMNS: &str = "id, account_id, full_name, biography, category, profile_picture, \
     bio_videos, daily_price::text AS daily_price, weekly_price::text AS weekly_price, \
     instagram_acc_link, tiktok_acc_link, snapchat_acc_link, youtube_acc_link, status, \
     bank_name, iban";

/// Account store
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new account store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_error(column: &str, message: String) -> StoreError {
    StoreError::Database(sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    })
}

fn account_from_row(row: &PgRow) -> StoreResult<Account> {
    let role: String = row.try_get("role")?;
    Ok(Account {
        id: row.try_get("id")?,
        phone_number: row.try_get("phone_number")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>().map_err(|e| decode_error("role", e))?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
    })
}

fn profile_from_row(row: &PgRow) -> StoreResult<InfluencerProfile> {
    let category: Option<String> = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    let Json(bio_videos): Json<Vec<String>> = row.try_get("bio_videos")?;
    let daily_price: Option<String> = row.try_get("daily_price")?;
    let weekly_price: Option<String> = row.try_get("weekly_price")?;

    Ok(InfluencerProfile {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        full_name: row.try_get("full_name")?,
        biography: row.try_get("biography")?,
        category: category
            .map(|c| c.parse::<Category>())
            .transpose()
            .map_err(|e| decode_error("category", e))?,
        profile_picture: row.try_get("profile_picture")?,
        bio_videos,
        daily_price: daily_price.map(Price::new_unchecked),
        weekly_price: weekly_price.map(Price::new_unchecked),
        instagram_acc_link: row.try_get("instagram_acc_link")?,
        tiktok_acc_link: row.try_get("tiktok_acc_link")?,
        snapchat_acc_link: row.try_get("snapchat_acc_link")?,
        youtube_acc_link: row.try_get("youtube_acc_link")?,
        status: status.parse::<ApprovalStatus>().map_err(|e| decode_error("status", e))?,
        bank_name: row.try_get("bank_name")?,
        iban: row.try_get("iban")?,
    })
}

/// Translate unique-constraint violations into field-scoped conflicts.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("accounts_phone_number_key") => {
                    return StoreError::Conflict {
                        field: "phone_number",
                        message: PHONE_NUMBER_TAKEN.to_string(),
                    };
                }
                Some("accounts_username_key") => {
                    return StoreError::Conflict {
                        field: "username",
                        message: USERNAME_TAKEN.to_string(),
                    };
                }
                other => warn!("Unexpected unique violation on constraint {:?}", other),
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn phone_number_exists(&self, phone_number: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE phone_number = $1)")
                .bind(phone_number)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_account(&self, new_account: NewAccount, profile: NewProfile) -> StoreResult<Account> {
        info!("Creating new {} account: {}", new_account.role, new_account.username);

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO accounts (id, phone_number, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_account.phone_number)
            .bind(&new_account.username)
            .bind(&new_account.email)
            .bind(&new_account.password_hash)
            .bind(new_account.role.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        let account = account_from_row(&row)?;

        match profile {
            NewProfile::Client => {
                sqlx::query("INSERT INTO client_profiles (id, account_id) VALUES ($1, $2)")
                    .bind(Uuid::new_v4())
                    .bind(account.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_write_error)?;
            }
            NewProfile::Influencer(new_profile) => {
                let profile = new_profile
                    .into_profile(Uuid::new_v4(), account.id)
                    .map_err(|e| StoreError::Invariant(e.to_string()))?;

                sqlx::query(
                    r#"
                    INSERT INTO influencer_profiles (
                        id, account_id, full_name, biography, category, profile_picture,
                        bio_videos, daily_price, weekly_price, instagram_acc_link,
                        tiktok_acc_link, snapchat_acc_link, youtube_acc_link, status,
                        bank_name, iban
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8::numeric, $9::numeric, $10, $11, $12, $13, $14, $15, $16)
                    "#,
                )
                .bind(profile.id)
                .bind(profile.account_id)
                .bind(&profile.full_name)
                .bind(&profile.biography)
                .bind(profile.category.map(|c| c.as_str()))
                .bind(&profile.profile_picture)
                .bind(Json(&profile.bio_videos))
                .bind(profile.daily_price.as_ref().map(Price::as_str))
                .bind(profile.weekly_price.as_ref().map(Price::as_str))
                .bind(&profile.instagram_acc_link)
                .bind(&profile.tiktok_acc_link)
                .bind(&profile.snapchat_acc_link)
                .bind(&profile.youtube_acc_link)
                .bind(profile.status.as_str())
                .bind(&profile.bank_name)
                .bind(&profile.iban)
                .execute(&mut *tx)
                .await
                .map_err(map_write_error)?;
            }
        }

        tx.commit().await?;
        Ok(account)
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE phone_number = $1");
        let row = sqlx::query(&sql)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_influencer_profile(&self, account_id: Uuid) -> StoreResult<Option<InfluencerProfile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM influencer_profiles WHERE account_id = $1");
        let row = sqlx::query(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn set_profile_picture(&self, account_id: Uuid, path: &str) -> StoreResult<InfluencerProfile> {
        let sql = format!(
            "UPDATE influencer_profiles SET profile_picture = $2 WHERE account_id = $1 RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(account_id)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        profile_from_row(&row)
    }

    async fn update_bank_details(
        &self,
        account_id: Uuid,
        bank_name: Option<&str>,
        iban: Option<&str>,
    ) -> StoreResult<InfluencerProfile> {
        let sql = format!(
            r#"
            UPDATE influencer_profiles
            SET bank_name = COALESCE($2, bank_name), iban = COALESCE($3, iban)
            WHERE account_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(account_id)
            .bind(bank_name)
            .bind(iban)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        profile_from_row(&row)
    }

    async fn append_bio_videos(&self, account_id: Uuid, videos: &[String]) -> StoreResult<InfluencerProfile> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM influencer_profiles WHERE account_id = $1 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut profile = profile_from_row(&row)?;
        profile
            .append_bio_videos(videos)
            .map_err(|e| StoreError::Invariant(e.to_string()))?;

        sqlx::query("UPDATE influencer_profiles SET bio_videos = $2 WHERE account_id = $1")
            .bind(account_id)
            .bind(Json(&profile.bio_videos))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }

    async fn set_influencer_status(
        &self,
        account_id: Uuid,
        status: ApprovalStatus,
    ) -> StoreResult<StatusChange> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT p.status, a.email
            FROM influencer_profiles p
            JOIN accounts a ON a.id = p.account_id
            WHERE p.account_id = $1
            FOR UPDATE OF p
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        let previous: String = row.try_get("status")?;
        let previous = previous.parse::<ApprovalStatus>().map_err(|e| decode_error("status", e))?;
        let email: String = row.try_get("email")?;

        if previous != status {
            sqlx::query("UPDATE influencer_profiles SET status = $2 WHERE account_id = $1")
                .bind(account_id)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(StatusChange {
            account_id,
            email,
            previous,
            current: status,
        })
    }
}
