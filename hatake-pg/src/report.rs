//! Rapport de rattachement avec dégradation gracieuse
//!
//! Un lot en échec est annulé et compté en erreurs, les lots suivants
//! continuent. Le rapport s'affiche sur la console ou se sauvegarde en JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use areamap::{MatchKind, PostalRecord};

/// Nombre maximum de codes non rattachés conservés dans le rapport
pub const MAX_UNMAPPED_SAMPLES: usize = 20;

/// Statut global du rattachement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MappingStatus {
    /// Tous les lots commités
    Success,
    /// Certains lots annulés
    PartialSuccess,
    /// Aucun lot commité
    Failed,
}

/// Lot annulé
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Numéro du lot (à partir de 1)
    pub batch: usize,
    /// Nombre de codes du lot
    pub size: usize,
    pub message: String,
}

/// Code postal sans zone météo
#[derive(Debug, Clone, Serialize)]
pub struct UnmappedSample {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
}

impl From<&PostalRecord> for UnmappedSample {
    fn from(record: &PostalRecord) -> Self {
        Self {
            postal_code: record.postal_code.clone(),
            prefecture: record.prefecture.clone(),
            city: record.city.clone(),
        }
    }
}

/// Résultat d'un lot commité
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub mapped: BTreeMap<MatchKind, usize>,
    pub unmapped: Vec<PostalRecord>,
}

impl BatchOutcome {
    pub fn mapped_count(&self) -> usize {
        self.mapped.values().sum()
    }
}

/// Rapport complet d'une passe de rattachement
#[derive(Debug, Clone, Serialize)]
pub struct MappingReport {
    /// Durée de la passe
    pub duration_secs: f64,
    /// Statut global
    pub status: MappingStatus,

    /// Codes traités (rattachés + non trouvés + en erreur)
    pub total_processed: usize,
    /// Codes rattachés et écrits
    pub mapped: usize,
    /// Codes sans zone correspondante
    pub not_found: usize,
    /// Codes des lots annulés
    pub errors: usize,

    pub batches_committed: usize,
    pub batches_failed: usize,

    /// Codes rattachés par règle
    pub by_rule: BTreeMap<MatchKind, usize>,
    /// Codes non rattachés par préfecture
    pub unmapped_by_prefecture: BTreeMap<String, usize>,
    /// Premiers codes non rattachés
    pub unmapped_samples: Vec<UnmappedSample>,
    /// Lots annulés
    pub failures: Vec<BatchFailure>,
}

impl Default for MappingReport {
    fn default() -> Self {
        Self {
            duration_secs: 0.0,
            status: MappingStatus::Success,
            total_processed: 0,
            mapped: 0,
            not_found: 0,
            errors: 0,
            batches_committed: 0,
            batches_failed: 0,
            by_rule: BTreeMap::new(),
            unmapped_by_prefecture: BTreeMap::new(),
            unmapped_samples: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl MappingReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intègre un lot commité
    pub fn merge_batch(&mut self, outcome: BatchOutcome) {
        self.batches_committed += 1;

        for (kind, count) in outcome.mapped {
            self.mapped += count;
            self.total_processed += count;
            *self.by_rule.entry(kind).or_default() += count;
        }

        for record in &outcome.unmapped {
            self.record_not_found(record);
        }
    }

    /// Enregistre un code sans zone météo
    pub fn record_not_found(&mut self, record: &PostalRecord) {
        self.not_found += 1;
        self.total_processed += 1;
        *self
            .unmapped_by_prefecture
            .entry(record.prefecture.clone())
            .or_default() += 1;
        if self.unmapped_samples.len() < MAX_UNMAPPED_SAMPLES {
            self.unmapped_samples.push(record.into());
        }
    }

    /// Intègre le résultat d'un lot, commité ou en échec
    pub fn record_batch(&mut self, batch: usize, size: usize, result: Result<BatchOutcome>) {
        match result {
            Ok(outcome) => self.merge_batch(outcome),
            Err(e) => self.record_batch_failure(batch, size, &format!("{e:#}")),
        }
    }

    /// Enregistre un lot annulé
    pub fn record_batch_failure(&mut self, batch: usize, size: usize, message: &str) {
        self.batches_failed += 1;
        self.errors += size;
        self.total_processed += size;
        self.failures.push(BatchFailure {
            batch,
            size,
            message: message.to_string(),
        });
    }

    /// Définit la durée de la passe
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.batches_failed == 0 {
            MappingStatus::Success
        } else if self.batches_committed > 0 {
            MappingStatus::PartialSuccess
        } else {
            MappingStatus::Failed
        };
    }

    /// Taux de rattachement sur les codes traités
    pub fn mapping_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            self.mapped as f64 / self.total_processed as f64
        }
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("MAPPING REPORT");
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Batches: {} committed, {} rolled back",
            self.batches_committed, self.batches_failed
        );
        println!(
            "Postal codes: {} processed, {} mapped, {} not found, {} errors",
            self.total_processed, self.mapped, self.not_found, self.errors
        );
        println!("Mapping rate: {:.1}%", self.mapping_rate() * 100.0);

        if !self.by_rule.is_empty() {
            println!("\n--- BY RULE ---");
            for (kind, count) in &self.by_rule {
                println!("  {:?}: {}", kind, count);
            }
        }

        if !self.unmapped_by_prefecture.is_empty() {
            println!("\n--- NOT FOUND BY PREFECTURE ---");
            let mut prefectures: Vec<_> = self.unmapped_by_prefecture.iter().collect();
            prefectures.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (prefecture, count) in prefectures.iter().take(10) {
                println!("  {}: {}", prefecture, count);
            }
            if prefectures.len() > 10 {
                println!("  ... and {} more", prefectures.len() - 10);
            }
        }

        if !self.unmapped_samples.is_empty() {
            println!("\n--- NOT FOUND SAMPLES ({}) ---", self.unmapped_samples.len());
            for s in &self.unmapped_samples {
                println!("  {} {} {}", s.postal_code, s.prefecture, s.city);
            }
        }

        if !self.failures.is_empty() {
            println!("\n--- ROLLED BACK BATCHES ({}) ---", self.failures.len());
            for f in self.failures.iter().take(20) {
                println!("  [batch {}] {} codes: {}", f.batch, f.size, f.message);
            }
            if self.failures.len() > 20 {
                println!("  ... and {} more", self.failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Cannot write report to {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} processed: {} mapped, {} not found, {} errors",
            self.total_processed, self.mapped, self.not_found, self.errors
        )
    }
}
