//! Implémentation PostgreSQL de [`AddressStore`]

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::{debug, warn};

use areamap::normalize::{normalize_key, normalize_query};
use areamap::{AddressStore, AreamapError, PostalQuery, PostalRecord, WeatherArea};

/// Nombre maximum de résultats d'une recherche textuelle
pub const DEFAULT_SEARCH_LIMIT: i64 = 100;

/// Échappe `%`, `_` et le caractère d'échappement `!` pour un `LIKE ... ESCAPE '!'`
pub fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '!') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

/// Vrai si une recherche a probablement été coupée par `LIMIT`
pub fn is_truncated(rows: usize, limit: i64) -> bool {
    i64::try_from(rows).map_or(true, |rows| rows >= limit)
}

/// Store en lecture seule sur les tables `postal_codes` / `weather_areas`
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
    schema: String,
    search_limit: i64,
}

impl PgStore {
    pub fn new(pool: Pool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: i64) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// Codes postaux sans zone météo stockée
    pub async fn unmapped_postal_records(&self) -> areamap::Result<Vec<PostalRecord>> {
        let rows = self
            .query(&self.postal_sql("WHERE weather_area_code IS NULL"), &[])
            .await?;
        Ok(rows.iter().map(postal_from_row).collect())
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> areamap::Result<Vec<Row>> {
        let client = self.pool.get().await.map_err(AreamapError::store)?;
        client.query(sql, params).await.map_err(AreamapError::store)
    }

    fn postal_sql(&self, filter: &str) -> String {
        format!(
            "SELECT postal_code, prefecture, city, town FROM {}.postal_codes {} ORDER BY postal_code",
            self.schema, filter
        )
    }

    fn area_sql(&self, filter: &str) -> String {
        format!(
            "SELECT area_code, prefecture, region, city FROM {}.weather_areas {} ORDER BY area_code",
            self.schema, filter
        )
    }
}

fn postal_from_row(row: &Row) -> PostalRecord {
    PostalRecord {
        postal_code: row.get("postal_code"),
        prefecture: row.get("prefecture"),
        city: row.get("city"),
        town: row.get("town"),
    }
}

fn area_from_row(row: &Row) -> WeatherArea {
    WeatherArea {
        area_code: row.get("area_code"),
        prefecture: row.get("prefecture"),
        region: row.get("region"),
        city: row.get("city"),
    }
}

#[async_trait]
impl AddressStore for PgStore {
    async fn find_postal_records(&self, query: &PostalQuery) -> areamap::Result<Vec<PostalRecord>> {
        let rows = match query {
            PostalQuery::Code(code) => {
                let sql = self.postal_sql("WHERE postal_code = $1");
                self.query(&sql, &[code]).await?
            }
            PostalQuery::Text(fragment) => {
                // Même normalisation que MemoryStore: NFKC puis sans blancs
                let pattern = format!("%{}%", escape_like(&normalize_query(fragment)));
                let sql = self.postal_sql(
                    "WHERE regexp_replace(normalize(prefecture || city || COALESCE(town, ''), NFKC), '\\s', '', 'g') LIKE $1 ESCAPE '!'",
                );
                let sql = format!("{} LIMIT $2", sql);
                let rows = self.query(&sql, &[&pattern, &self.search_limit]).await?;
                if is_truncated(rows.len(), self.search_limit) {
                    warn!(
                        query = %fragment,
                        limit = self.search_limit,
                        "Text search reached the result limit, results may be incomplete"
                    );
                }
                rows
            }
        };
        debug!(query = ?query, rows = rows.len(), "Postal code lookup");
        Ok(rows.iter().map(postal_from_row).collect())
    }

    async fn find_weather_areas_by_prefecture(
        &self,
        prefecture: &str,
    ) -> areamap::Result<Vec<WeatherArea>> {
        let key = normalize_key(prefecture);
        let sql = self.area_sql("WHERE lower(regexp_replace(prefecture, '\\s', '', 'g')) = $1");
        let rows = self.query(&sql, &[&key]).await?;
        Ok(rows
            .iter()
            .map(area_from_row)
            .filter(|a| normalize_key(&a.prefecture) == key)
            .collect())
    }

    async fn all_postal_records(&self) -> areamap::Result<Vec<PostalRecord>> {
        let rows = self.query(&self.postal_sql(""), &[]).await?;
        Ok(rows.iter().map(postal_from_row).collect())
    }

    async fn all_weather_areas(&self) -> areamap::Result<Vec<WeatherArea>> {
        let rows = self.query(&self.area_sql(""), &[]).await?;
        Ok(rows.iter().map(area_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("千代田"), "千代田");
        assert_eq!(escape_like("100%"), "100!%");
        assert_eq!(escape_like("a_b"), "a!_b");
        assert_eq!(escape_like("!"), "!!");
    }

    #[test]
    fn test_is_truncated() {
        assert!(!is_truncated(0, DEFAULT_SEARCH_LIMIT));
        assert!(!is_truncated(99, 100));
        assert!(is_truncated(100, 100));
        assert!(is_truncated(1, 1));
    }
}
