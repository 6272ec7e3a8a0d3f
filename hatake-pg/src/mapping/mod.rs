//! Persistance des rattachements code postal → zone météo
//!
//! Le résolveur reste pur: cette passe explicite écrit `weather_area_code`
//! pour les codes qui n'en ont pas encore, un lot par transaction.

pub mod batch;

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use deadpool_postgres::Pool;
use tracing::{info, warn};

use areamap::normalize::normalize_key;
use areamap::{resolve_against, AddressStore, PostalRecord, SummaryStats, WeatherArea};

use crate::db::schema::validate_schema_name;
use crate::db::store::PgStore;
use crate::report::{BatchOutcome, MappingReport};
use batch::MappingBatch;

/// Codes postaux par transaction
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Zones météo regroupées par préfecture normalisée
pub struct AreaIndex {
    by_prefecture: HashMap<String, Vec<WeatherArea>>,
}

impl AreaIndex {
    pub fn new(areas: Vec<WeatherArea>) -> Self {
        let mut by_prefecture: HashMap<String, Vec<WeatherArea>> = HashMap::new();
        for area in areas {
            by_prefecture
                .entry(normalize_key(&area.prefecture))
                .or_default()
                .push(area);
        }
        Self { by_prefecture }
    }

    pub fn candidates(&self, record: &PostalRecord) -> &[WeatherArea] {
        self.by_prefecture
            .get(&normalize_key(&record.prefecture))
            .map_or(&[][..], Vec::as_slice)
    }
}

/// Rattache les codes postaux sans zone et écrit le résultat
///
/// Un lot en échec est annulé et compté en erreurs; les lots suivants
/// sont quand même traités.
pub async fn map_unmapped(pool: &Pool, schema: &str, batch_size: usize) -> Result<MappingReport> {
    validate_schema_name(schema)?;
    let start = Instant::now();
    let batch_size = batch_size.max(1);

    let store = PgStore::new(pool.clone(), schema);
    let pending = store.unmapped_postal_records().await?;
    let index = AreaIndex::new(
        store
            .all_weather_areas()
            .await
            .context("Failed to load weather areas")?,
    );

    let total_batches = pending.len().div_ceil(batch_size);
    info!(
        pending = pending.len(),
        batch_size = batch_size,
        batches = total_batches,
        "Mapping unmapped postal codes"
    );

    let mut report = MappingReport::new();
    let mut client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    for (i, chunk) in pending.chunks(batch_size).enumerate() {
        let batch_no = i + 1;
        let result = run_batch(&mut client, schema, batch_no, chunk, &index).await;
        report.record_batch(batch_no, chunk.len(), result);

        if batch_no % 10 == 0 || batch_no == total_batches {
            info!(
                batch = batch_no,
                of = total_batches,
                mapped = report.mapped,
                not_found = report.not_found,
                errors = report.errors,
                "Mapping progress"
            );
        }
    }

    report.set_duration(start.elapsed());
    report.finalize();
    Ok(report)
}

/// Un lot complet: ouverture, écritures, commit; annulé au premier échec
async fn run_batch(
    client: &mut deadpool_postgres::Object,
    schema: &str,
    batch_no: usize,
    chunk: &[PostalRecord],
    index: &AreaIndex,
) -> Result<BatchOutcome> {
    let mut batch = MappingBatch::begin(client, schema, batch_no).await?;

    match write_chunk(&mut batch, chunk, index).await {
        Ok(()) => batch.commit().await,
        Err(e) => {
            batch.rollback(&format!("{e:#}")).await;
            Err(e)
        }
    }
}

async fn write_chunk(
    batch: &mut MappingBatch<'_>,
    chunk: &[PostalRecord],
    index: &AreaIndex,
) -> Result<()> {
    for record in chunk {
        let mapping = resolve_against(record, index.candidates(record));
        batch
            .apply(record, &mapping)
            .await
            .with_context(|| format!("batch {}", batch.batch_no()))?;
    }
    Ok(())
}

/// Simule une passe de rattachement sans rien écrire
pub fn plan(pending: &[PostalRecord], areas: Vec<WeatherArea>, batch_size: usize) -> MappingReport {
    let start = Instant::now();
    let index = AreaIndex::new(areas);
    let mut report = MappingReport::new();

    for chunk in pending.chunks(batch_size.max(1)) {
        let mut outcome = BatchOutcome::default();
        for record in chunk {
            match resolve_against(record, index.candidates(record)).matched_by() {
                Some(kind) => *outcome.mapped.entry(kind).or_default() += 1,
                None => outcome.unmapped.push(record.clone()),
            }
        }
        report.merge_batch(outcome);
    }

    report.set_duration(start.elapsed());
    report.finalize();
    report
}

/// Efface tous les rattachements stockés, retourne le nombre de lignes
pub async fn reset_mapping(pool: &Pool, schema: &str) -> Result<u64> {
    validate_schema_name(schema)?;
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let cleared = client
        .execute(
            &format!(
                "UPDATE {}.postal_codes SET weather_area_code = NULL, updated_at = NOW() \
                 WHERE weather_area_code IS NOT NULL",
                schema
            ),
            &[],
        )
        .await
        .context("Failed to reset mappings")?;

    warn!(cleared = cleared, "Stored weather area mappings cleared");
    Ok(cleared)
}

/// Statistiques calculées sur la colonne `weather_area_code` stockée
pub async fn stored_statistics(pool: &Pool, schema: &str) -> Result<SummaryStats> {
    validate_schema_name(schema)?;
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;

    let row = client
        .query_one(
            &format!(
                "SELECT COUNT(*) AS total, COUNT(weather_area_code) AS mapped FROM {}.postal_codes",
                schema
            ),
            &[],
        )
        .await
        .context("Failed to compute mapping statistics")?;

    let total: i64 = row.get("total");
    let mapped: i64 = row.get("mapped");
    Ok(SummaryStats::from_counts(
        usize::try_from(total).unwrap_or_default(),
        usize::try_from(mapped).unwrap_or_default(),
    ))
}
