//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE (ou DATABASE_URL)
//!
//! Exécution:
//! ```bash
//! # Avec PostgreSQL local
//! cargo test -p hatake-pg --test postgres_integration -- --ignored
//!
//! # Avec Docker
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -e POSTGRES_DB=hatake -p 5432:5432 postgres:16
//! PGPASSWORD=test cargo test -p hatake-pg --test postgres_integration -- --ignored
//! ```
//!
//! Chaque test travaille dans son propre schéma.

use anyhow::Result;
use deadpool_postgres::Pool;

use areamap::{
    AddressStore, MatchKind, PostalQuery, Reporter, Resolution, Resolver,
};
use hatake_pg::db::schema::{create_schema, table_counts};
use hatake_pg::mapping::{map_unmapped, reset_mapping, stored_statistics};
use hatake_pg::{create_pool, DatabaseConfig, MappingStatus, PgStore};

/// Crée un pool de connexions de test
async fn create_test_pool() -> Result<Pool> {
    let config = DatabaseConfig {
        pool_size: 4,
        ..DatabaseConfig::from_env()
    };
    create_pool(&config).await
}

/// Crée le schéma et insère les données de référence
async fn setup_test_schema(pool: &Pool, schema: &str) -> Result<()> {
    create_schema(pool, schema, true).await?;

    let client = pool.get().await?;
    client
        .batch_execute(&format!(
            r#"
            INSERT INTO {schema}.weather_areas (area_code, prefecture, region, city) VALUES
                ('130010', '東京都', '東京地方', '千代田区'),
                ('016010', '北海道', '石狩地方', '札幌市'),
                ('040011', '宮城県', '東部', '仙台市東部'),
                ('040012', '宮城県', '西部', '仙台市西部'),
                ('420040', '長崎県', '対馬地方', '上対馬'),
                ('420041', '長崎県', '対馬地方', '下対馬');

            INSERT INTO {schema}.postal_codes (postal_code, prefecture, city, town) VALUES
                ('1000001', '東京都', '千代田区', '千代田'),
                ('1000005', '東京都', '千代田区', '丸の内_1%'),
                ('0600042', '北海道', '札幌市中央区', '大通西'),
                ('9813100', '宮城県', '仙台市泉区', NULL),
                ('8170022', '長崎県', '対馬市', '厳原町国分'),
                ('8170322', '長崎県', '対馬市', '上県町佐須奈'),
                ('9071800', '沖縄県', '竹富町', NULL);
            "#
        ))
        .await?;

    Ok(())
}

/// Supprime le schéma de test
async fn cleanup_test_schema(pool: &Pool, schema: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"), &[])
        .await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_pg_store_lookups() -> Result<()> {
    let schema = "hatake_it_store";
    let pool = create_test_pool().await?;
    setup_test_schema(&pool, schema).await?;
    let store = PgStore::new(pool.clone(), schema);

    let by_code = store
        .find_postal_records(&PostalQuery::Code("1000001".into()))
        .await?;
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].town.as_deref(), Some("千代田"));

    // Fragment sur préfecture + municipalité
    let by_text = store
        .find_postal_records(&PostalQuery::Text("東京都千代田".into()))
        .await?;
    assert_eq!(by_text.len(), 2);

    // Les jokers LIKE sont des caractères littéraux
    let escaped = store
        .find_postal_records(&PostalQuery::Text("_1%".into()))
        .await?;
    assert_eq!(escaped.len(), 1);
    assert_eq!(escaped[0].postal_code, "1000005");
    let wildcard = store
        .find_postal_records(&PostalQuery::Text("%".into()))
        .await?;
    assert_eq!(wildcard.len(), 1);

    // Recherche normalisée NFKC comme pour un snapshot
    pool.get()
        .await?
        .execute(
            &format!(
                "INSERT INTO {schema}.postal_codes (postal_code, prefecture, city, town) \
                 VALUES ('1000006', '東京都', '千代田区', '丸の内１ 丁目')"
            ),
            &[],
        )
        .await?;
    let normalized = store
        .find_postal_records(&PostalQuery::Text("丸の内1丁目".into()))
        .await?;
    assert_eq!(normalized.len(), 1);
    assert_eq!(normalized[0].postal_code, "1000006");
    let fullwidth = store
        .find_postal_records(&PostalQuery::Text("丸の内１ 丁目".into()))
        .await?;
    assert_eq!(fullwidth.len(), 1);

    let areas = store.find_weather_areas_by_prefecture(" 宮城県").await?;
    assert_eq!(areas.len(), 2);

    let limited = PgStore::new(pool.clone(), schema).with_search_limit(1);
    let rows = limited
        .find_postal_records(&PostalQuery::Text("長崎県".into()))
        .await?;
    assert_eq!(rows.len(), 1);

    cleanup_test_schema(&pool, schema).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_resolver_over_postgres() -> Result<()> {
    let schema = "hatake_it_resolve";
    let pool = create_test_pool().await?;
    setup_test_schema(&pool, schema).await?;
    let resolver = Resolver::new(PgStore::new(pool.clone(), schema));

    let sendai = resolver.resolve_code("981-3100").await?;
    assert_eq!(sendai.area_code(), Some("040012"));
    assert_eq!(sendai.matched_by(), Some(MatchKind::DesignatedCityRegion));

    let missing = resolver.resolve("0000000").await.unwrap_err();
    assert!(missing.is_not_found());

    match resolver.resolve("対馬").await? {
        Resolution::Many(mappings) => {
            assert_eq!(mappings.len(), 2);
            assert!(mappings.iter().all(|m| m.matched_by() == Some(MatchKind::Tsushima)));
        }
        other => panic!("expected several mappings, got {other:?}"),
    }

    cleanup_test_schema(&pool, schema).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_map_unmapped_persists_results() -> Result<()> {
    let schema = "hatake_it_map";
    let pool = create_test_pool().await?;
    setup_test_schema(&pool, schema).await?;

    let report = map_unmapped(&pool, schema, 3).await?;
    assert_eq!(report.status, MappingStatus::Success);
    assert_eq!(report.batches_committed, 3);
    assert_eq!(report.total_processed, 7);
    assert_eq!(report.mapped, 6);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.unmapped_samples[0].postal_code, "9071800");

    // Les statistiques stockées rejoignent le calcul à la demande
    let stored = stored_statistics(&pool, schema).await?;
    let computed = Reporter::new(PgStore::new(pool.clone(), schema))
        .summarize()
        .await?;
    assert_eq!(stored, computed);

    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!("SELECT weather_area_code FROM {schema}.postal_codes WHERE postal_code = '0600042'"),
            &[],
        )
        .await?;
    let code: Option<String> = row.get(0);
    assert_eq!(code.as_deref(), Some("016010"));

    // Seuls les codes encore sans zone sont retraités
    let again = map_unmapped(&pool, schema, 100).await?;
    assert_eq!(again.total_processed, 1);
    assert_eq!(again.mapped, 0);

    cleanup_test_schema(&pool, schema).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_reset_mapping() -> Result<()> {
    let schema = "hatake_it_reset";
    let pool = create_test_pool().await?;
    setup_test_schema(&pool, schema).await?;

    map_unmapped(&pool, schema, 100).await?;
    let cleared = reset_mapping(&pool, schema).await?;
    assert_eq!(cleared, 6);

    let stored = stored_statistics(&pool, schema).await?;
    assert_eq!(stored.mapped_count, 0);
    assert_eq!(stored.total_postal_codes, 7);

    let counts = table_counts(&pool, schema).await?;
    assert_eq!(counts.postal_codes, 7);
    assert_eq!(counts.weather_areas, 6);
    assert_eq!(counts.prefectures, 5);

    cleanup_test_schema(&pool, schema).await?;
    Ok(())
}
