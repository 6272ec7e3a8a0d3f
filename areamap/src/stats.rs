//! Statistiques de couverture code postal → zone météo

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::resolver::Resolver;
use crate::store::AddressStore;
use crate::types::{MatchKind, ResolvedMapping, SummaryStats};

/// Compte les correspondances trouvées
pub fn tally(mappings: &[ResolvedMapping]) -> SummaryStats {
    let mapped = mappings.iter().filter(|m| m.is_mapped()).count();
    SummaryStats::from_counts(mappings.len(), mapped)
}

/// Détail de couverture par préfecture et par règle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub summary: SummaryStats,
    pub by_prefecture: BTreeMap<String, SummaryStats>,
    pub by_rule: BTreeMap<MatchKind, usize>,
}

impl CoverageReport {
    pub fn from_mappings(mappings: &[ResolvedMapping]) -> Self {
        let mut per_prefecture: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut by_rule: BTreeMap<MatchKind, usize> = BTreeMap::new();

        for mapping in mappings {
            let entry = per_prefecture
                .entry(mapping.prefecture.clone())
                .or_default();
            entry.0 += 1;
            if let Some(kind) = mapping.matched_by() {
                entry.1 += 1;
                *by_rule.entry(kind).or_default() += 1;
            }
        }

        Self {
            summary: tally(mappings),
            by_prefecture: per_prefecture
                .into_iter()
                .map(|(pref, (total, mapped))| (pref, SummaryStats::from_counts(total, mapped)))
                .collect(),
            by_rule,
        }
    }

    /// Préfectures triées par nombre de codes non rattachés, décroissant
    pub fn worst_prefectures(&self, limit: usize) -> Vec<(&str, &SummaryStats)> {
        let mut entries: Vec<_> = self
            .by_prefecture
            .iter()
            .filter(|(_, s)| s.unmapped_count > 0)
            .map(|(p, s)| (p.as_str(), s))
            .collect();
        entries.sort_by(|a, b| b.1.unmapped_count.cmp(&a.1.unmapped_count).then(a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}

/// Calcule les statistiques en résolvant tous les codes postaux du store
#[derive(Debug, Clone)]
pub struct Reporter<S> {
    resolver: Resolver<S>,
}

impl<S: AddressStore> Reporter<S> {
    pub fn new(store: S) -> Self {
        Self {
            resolver: Resolver::new(store),
        }
    }

    /// Résout tous les codes postaux, dans l'ordre du store
    pub async fn resolve_all(&self) -> Result<Vec<ResolvedMapping>> {
        let records = self.resolver.store().all_postal_records().await?;
        self.resolver.resolve_records(&records).await
    }

    /// Totaux et taux de rattachement
    pub async fn summarize(&self) -> Result<SummaryStats> {
        let stats = tally(&self.resolve_all().await?);
        info!(
            total = stats.total_postal_codes,
            mapped = stats.mapped_count,
            unmapped = stats.unmapped_count,
            rate = stats.mapping_rate,
            "Computed mapping summary"
        );
        Ok(stats)
    }

    /// Totaux détaillés par préfecture et par règle
    pub async fn coverage(&self) -> Result<CoverageReport> {
        Ok(CoverageReport::from_mappings(&self.resolve_all().await?))
    }
}
