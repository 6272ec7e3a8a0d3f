//! Transaction atomique pour un lot de rattachements
//!
//! Un lot est commité en entier ou annulé en entier.

use anyhow::{Context, Result};
use deadpool_postgres::{Object, Transaction};
use tokio_postgres::Statement;
use tracing::{debug, error};

use areamap::{PostalRecord, ResolvedMapping};

use crate::report::BatchOutcome;

/// Lot de rattachements en cours d'écriture
pub struct MappingBatch<'a> {
    transaction: Transaction<'a>,
    update: Statement,
    batch_no: usize,
    outcome: BatchOutcome,
}

impl<'a> MappingBatch<'a> {
    /// Démarre la transaction du lot et prépare la mise à jour
    ///
    /// # Errors
    /// Retourne une erreur si la transaction ne peut pas être démarrée
    pub async fn begin(client: &'a mut Object, schema: &str, batch_no: usize) -> Result<Self> {
        let transaction = client
            .transaction()
            .await
            .context("Failed to begin transaction")?;

        let sql = format!(
            "UPDATE {}.postal_codes SET weather_area_code = $1, updated_at = NOW() \
             WHERE postal_code = $2",
            schema
        );
        let update = transaction
            .prepare_cached(&sql)
            .await
            .context("Failed to prepare mapping update")?;

        debug!(batch = batch_no, "Starting mapping batch");

        Ok(Self {
            transaction,
            update,
            batch_no,
            outcome: BatchOutcome::default(),
        })
    }

    pub fn batch_no(&self) -> usize {
        self.batch_no
    }

    /// Écrit la zone retenue, ou note le code comme non rattaché
    pub async fn apply(&mut self, record: &PostalRecord, mapping: &ResolvedMapping) -> Result<()> {
        let Some(found) = &mapping.area else {
            self.outcome.unmapped.push(record.clone());
            return Ok(());
        };

        let updated = self
            .transaction
            .execute(&self.update, &[&found.area.area_code, &record.postal_code])
            .await
            .with_context(|| format!("Failed to store mapping for {}", record.postal_code))?;
        if updated != 1 {
            anyhow::bail!(
                "Postal code {} disappeared during mapping ({} rows updated)",
                record.postal_code,
                updated
            );
        }

        *self.outcome.mapped.entry(found.matched_by).or_default() += 1;
        Ok(())
    }

    /// Nombre de codes traités dans ce lot
    pub fn processed(&self) -> usize {
        self.outcome.mapped_count() + self.outcome.unmapped.len()
    }

    /// Valide et commit le lot
    ///
    /// # Errors
    /// Retourne une erreur si le commit échoue
    pub async fn commit(self) -> Result<BatchOutcome> {
        self.transaction
            .commit()
            .await
            .context("Failed to commit transaction")?;

        debug!(
            batch = self.batch_no,
            mapped = self.outcome.mapped_count(),
            not_found = self.outcome.unmapped.len(),
            "Mapping batch committed"
        );

        Ok(self.outcome)
    }

    /// Annule le lot (rollback)
    ///
    /// La transaction est également annulée si elle est droppée.
    pub async fn rollback(self, reason: &str) {
        error!(
            batch = self.batch_no,
            reason = %reason,
            attempted = self.processed(),
            "Rolling back mapping batch"
        );

        if let Err(e) = self.transaction.rollback().await {
            error!(error = %e, "Explicit rollback failed (will rollback on drop anyway)");
        }
    }
}
