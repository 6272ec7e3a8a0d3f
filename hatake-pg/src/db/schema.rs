//! Schéma des tables `postal_codes` et `weather_areas`

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tracing::{info, warn};

/// Vérifie qu'un nom de schéma est un identifiant SQL simple
///
/// Le nom est interpolé dans les requêtes, il ne doit contenir que
/// `[a-z0-9_]` et ne pas commencer par un chiffre.
pub fn validate_schema_name(schema: &str) -> Result<()> {
    let valid = !schema.is_empty()
        && schema.len() <= 63
        && !schema.starts_with(|c: char| c.is_ascii_digit())
        && schema
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        anyhow::bail!(
            "Invalid schema name: {:?}. Use lowercase letters, digits and underscores",
            schema
        );
    }
    Ok(())
}

fn schema_ddl(schema: &str) -> String {
    format!(
        r#"
        CREATE SCHEMA IF NOT EXISTS {schema};

        CREATE TABLE IF NOT EXISTS {schema}.weather_areas (
            area_code TEXT PRIMARY KEY,
            prefecture TEXT NOT NULL,
            region TEXT NOT NULL,
            city TEXT NOT NULL,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW()
        );

        CREATE TABLE IF NOT EXISTS {schema}.postal_codes (
            postal_code TEXT PRIMARY KEY CHECK (postal_code ~ '^[0-9]{{7}}$'),
            prefecture TEXT NOT NULL,
            city TEXT NOT NULL,
            town TEXT,
            weather_area_code TEXT REFERENCES {schema}.weather_areas(area_code) ON DELETE SET NULL,
            data_version TEXT,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW()
        );

        CREATE INDEX IF NOT EXISTS idx_weather_areas_prefecture
            ON {schema}.weather_areas (prefecture);
        CREATE INDEX IF NOT EXISTS idx_postal_codes_prefecture
            ON {schema}.postal_codes (prefecture);
        CREATE INDEX IF NOT EXISTS idx_postal_codes_city
            ON {schema}.postal_codes (city);
        CREATE INDEX IF NOT EXISTS idx_postal_codes_weather_area
            ON {schema}.postal_codes (weather_area_code);
        "#
    )
}

/// Crée le schéma, les tables et les index
pub async fn create_schema(pool: &Pool, schema: &str, drop_existing: bool) -> Result<()> {
    validate_schema_name(schema)?;
    let client = pool.get().await.context("Failed to get connection from pool")?;

    if drop_existing {
        warn!(schema = schema, "Dropping existing schema");
        client
            .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema), &[])
            .await
            .context("Failed to drop schema")?;
    }

    client
        .batch_execute(&schema_ddl(schema))
        .await
        .context("Failed to create schema")?;

    info!(schema = schema, "Schema ready");
    Ok(())
}

/// Nombre de lignes des deux tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableCounts {
    pub postal_codes: i64,
    pub weather_areas: i64,
    pub prefectures: i64,
}

/// Compte les lignes stockées
pub async fn table_counts(pool: &Pool, schema: &str) -> Result<TableCounts> {
    validate_schema_name(schema)?;
    let client = pool.get().await.context("Failed to get connection from pool")?;

    let sql = format!(
        r#"
        SELECT
            (SELECT COUNT(*) FROM {schema}.postal_codes) AS postal_codes,
            (SELECT COUNT(*) FROM {schema}.weather_areas) AS weather_areas,
            (SELECT COUNT(DISTINCT prefecture) FROM {schema}.postal_codes) AS prefectures
        "#
    );
    let row = client
        .query_one(&sql, &[])
        .await
        .context("Failed to count rows")?;

    Ok(TableCounts {
        postal_codes: row.get("postal_codes"),
        weather_areas: row.get("weather_areas"),
        prefectures: row.get("prefectures"),
    })
}
