use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use cardbg_core::{CardProfile, CardTier, Error, ProfileStore, ProfileUpdate, Result};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL DEFAULT '',
        company TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        phone TEXT NOT NULL DEFAULT '',
        website TEXT NOT NULL DEFAULT '',
        avatar_url TEXT NOT NULL DEFAULT '',
        card_background_url TEXT,
        card_tier TEXT,
        updated_at TEXT
    )
    "#,
    // Add future migrations here
];

pub struct SqliteProfileStore {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
}

impl SqliteProfileStore {
    /// Opens (creating if needed) the database at `db_path` and migrates it.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| persistence("failed to connect to database", e))?;

        let store = Self {
            pool,
            db_path: Some(db_path.to_path_buf()),
        };
        store.migrate().await?;
        tracing::info!("💾 Profile database ready at {}", db_path.display());
        Ok(store)
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same data.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| persistence("failed to open in-memory database", e))?;

        let store = Self { pool, db_path: None };
        store.migrate().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    async fn migrate(&self) -> Result<()> {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(|e| persistence(&format!("failed to run migration {}", i), e))?;
        }
        Ok(())
    }

    /// Inserts or replaces a whole profile.
    pub async fn insert(&self, profile: &CardProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO profiles
            (id, name, role, company, email, phone, website, avatar_url,
             card_background_url, card_tier, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.name)
        .bind(&profile.role)
        .bind(&profile.company)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.website)
        .bind(&profile.avatar_url)
        .bind(profile.card_background_url.as_deref())
        .bind(profile.card_tier.map(tier_to_str).transpose()?)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("failed to store profile", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get(&self, id: &str) -> Result<Option<CardProfile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence("failed to load profile", e))?;

        row.map(|row| profile_from_row(&row)).transpose()
    }

    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                name = COALESCE(?, name),
                role = COALESCE(?, role),
                company = COALESCE(?, company),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                website = COALESCE(?, website),
                avatar_url = COALESCE(?, avatar_url),
                card_background_url = COALESCE(?, card_background_url),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.name.as_deref())
        .bind(update.role.as_deref())
        .bind(update.company.as_deref())
        .bind(update.email.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.website.as_deref())
        .bind(update.avatar_url.as_deref())
        .bind(update.card_background_url.as_deref())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence("failed to update profile", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::Persistence(format!("profile {} not found", id)));
        }
        tracing::debug!("💾 Updated profile {} ({})", id, update.fields().join(", "));
        Ok(())
    }
}

fn profile_from_row(row: &SqliteRow) -> Result<CardProfile> {
    let get = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| persistence("failed to read profile", e))
    };

    let card_tier = row
        .try_get::<Option<String>, _>("card_tier")
        .map_err(|e| persistence("failed to read profile", e))?
        .map(|tier| tier_from_str(&tier))
        .transpose()?;

    Ok(CardProfile {
        id: get("id")?,
        name: get("name")?,
        role: get("role")?,
        company: get("company")?,
        email: get("email")?,
        phone: get("phone")?,
        website: get("website")?,
        avatar_url: get("avatar_url")?,
        card_background_url: row
            .try_get("card_background_url")
            .map_err(|e| persistence("failed to read profile", e))?,
        card_tier,
        updated_at: row
            .try_get::<Option<DateTime<Utc>>, _>("updated_at")
            .map_err(|e| persistence("failed to read profile", e))?,
    })
}

fn tier_to_str(tier: CardTier) -> Result<String> {
    match serde_json::to_value(tier)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(Error::Persistence(format!("unexpected card tier encoding: {}", other))),
    }
}

fn tier_from_str(tier: &str) -> Result<CardTier> {
    Ok(serde_json::from_value(serde_json::Value::String(tier.to_string()))?)
}

fn persistence(context: &str, err: sqlx::Error) -> Error {
    Error::Persistence(format!("{}: {}", context, err))
}
