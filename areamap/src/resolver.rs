//! Résolution code postal / fragment d'adresse → zone météo

use std::collections::{BTreeMap, HashMap};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::{AreamapError, Result};
use crate::matching::match_area;
use crate::normalize::{normalize_key, parse_query, validate_postal_code, Query};
use crate::store::{AddressStore, PostalQuery};
use crate::types::{PostalRecord, Resolution, ResolvedMapping, WeatherArea};

/// Résolveur sans état au-dessus d'un [`AddressStore`]
///
/// Chaque appel relit le store: aucun résultat n'est conservé entre deux
/// résolutions.
#[derive(Debug, Clone)]
pub struct Resolver<S> {
    store: S,
}

impl<S: AddressStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Résout un code postal exact ou un fragment d'adresse
    ///
    /// # Errors
    /// - `Validation` si la requête est vide ou si un code numérique est malformé
    /// - `NotFound` si le code postal n'existe pas
    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        match parse_query(query)? {
            Query::PostalCode(code) => self.resolve_code(&code).await.map(Resolution::Single),
            Query::Text(text) => self.resolve_text(&text).await.map(Resolution::Many),
        }
    }

    /// Résout un code postal exact
    pub async fn resolve_code(&self, postal_code: &str) -> Result<ResolvedMapping> {
        let code = validate_postal_code(postal_code)?;

        let record = self
            .store
            .find_postal_records(&PostalQuery::Code(code.clone()))
            .await?
            .into_iter()
            .find(|r| r.postal_code == code)
            .ok_or_else(|| AreamapError::not_found(&code))?;

        self.resolve_record(&record).await
    }

    /// Résout tous les codes postaux dont l'adresse contient `fragment`
    ///
    /// Aucun résultat n'est pas une erreur: la liste est vide.
    pub async fn resolve_text(&self, fragment: &str) -> Result<Vec<ResolvedMapping>> {
        let records = self
            .store
            .find_postal_records(&PostalQuery::Text(fragment.to_string()))
            .await?;

        let mappings = self.resolve_records(&records).await?;
        info!(
            query = fragment,
            results = mappings.len(),
            mapped = mappings.iter().filter(|m| m.is_mapped()).count(),
            "Resolved address fragment"
        );
        Ok(mappings)
    }

    /// Résout un enregistrement déjà chargé
    pub async fn resolve_record(&self, record: &PostalRecord) -> Result<ResolvedMapping> {
        let areas = self
            .store
            .find_weather_areas_by_prefecture(&record.prefecture)
            .await?;
        Ok(resolve_against(record, &areas))
    }

    /// Résout un lot d'enregistrements, une lecture des zones par préfecture
    pub async fn resolve_records(&self, records: &[PostalRecord]) -> Result<Vec<ResolvedMapping>> {
        let areas = self.load_areas(records).await?;

        Ok(records
            .iter()
            .map(|record| {
                let candidates = areas
                    .get(&normalize_key(&record.prefecture))
                    .map_or(&[][..], Vec::as_slice);
                resolve_against(record, candidates)
            })
            .collect())
    }

    async fn load_areas(
        &self,
        records: &[PostalRecord],
    ) -> Result<HashMap<String, Vec<WeatherArea>>> {
        let prefectures: BTreeMap<String, &str> = records
            .iter()
            .map(|r| (normalize_key(&r.prefecture), r.prefecture.as_str()))
            .collect();

        let fetches = prefectures.into_iter().map(|(key, prefecture)| async move {
            let areas = self.store.find_weather_areas_by_prefecture(prefecture).await?;
            Ok::<_, AreamapError>((key, areas))
        });

        let loaded = try_join_all(fetches).await?;
        debug!(prefectures = loaded.len(), "Loaded weather areas");
        Ok(loaded.into_iter().collect())
    }
}

/// Applique la cascade de correspondance à un enregistrement
pub fn resolve_against(record: &PostalRecord, areas: &[WeatherArea]) -> ResolvedMapping {
    match match_area(record, areas) {
        Some((area, kind)) => ResolvedMapping::matched(record, area.clone(), kind),
        None => {
            debug!(
                postal_code = %record.postal_code,
                prefecture = %record.prefecture,
                city = %record.city,
                "No weather area found"
            );
            ResolvedMapping::unmatched(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::MatchKind;

    fn store() -> MemoryStore {
        MemoryStore::from_records(
            [
                PostalRecord::new("1000001", "東京都", "千代田区").with_town("千代田"),
                PostalRecord::new("1000002", "東京都", "千代田区").with_town("皇居外苑"),
                PostalRecord::new("9999999", "沖縄県", "離島村"),
            ],
            [WeatherArea::new("130010", "東京都", "東京地方", "千代田区")],
        )
    }

    #[tokio::test]
    async fn test_resolve_exact_code() {
        let resolver = Resolver::new(store());
        let mapping = match resolver.resolve("1000001").await.unwrap() {
            Resolution::Single(m) => m,
            other => panic!("expected single mapping, got {:?}", other),
        };
        assert_eq!(mapping.postal_code, "1000001");
        assert_eq!(mapping.area_code(), Some("130010"));
        assert_eq!(mapping.region(), Some("東京地方"));
        assert_eq!(mapping.matched_by(), Some(MatchKind::Exact));
    }

    #[tokio::test]
    async fn test_resolve_unmapped_prefecture() {
        let resolver = Resolver::new(store());
        let mapping = resolver.resolve_code("9999999").await.unwrap();
        assert_eq!(mapping.postal_code, "9999999");
        assert_eq!(mapping.area_code(), None);
    }

    #[tokio::test]
    async fn test_resolve_missing_code() {
        let resolver = Resolver::new(store());
        let err = resolver.resolve("1234567").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_invalid_query() {
        let resolver = Resolver::new(store());
        assert!(resolver.resolve("").await.unwrap_err().is_validation());
        assert!(resolver.resolve("12-34").await.unwrap_err().is_validation());
        assert!(resolver.resolve_code("abc").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_resolve_text_fragment() {
        let resolver = Resolver::new(store());
        let resolution = resolver.resolve("千代田").await.unwrap();
        assert_eq!(resolution.len(), 2);
        assert_eq!(resolution.mapped(), 2);

        let empty = resolver.resolve("存在しない町").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_fullwidth_code() {
        let resolver = Resolver::new(store());
        let resolution = resolver.resolve("〒１００－０００１").await.unwrap();
        let mappings = resolution.into_vec();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].postal_code, "1000001");
    }

    #[tokio::test]
    async fn test_resolver_over_borrowed_store() {
        let store = store();
        let resolver = Resolver::new(&store);
        assert!(resolver.resolve_code("1000002").await.unwrap().is_mapped());
    }
}
