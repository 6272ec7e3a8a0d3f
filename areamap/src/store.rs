//! Accès au store de la hiérarchie d'adresses
//!
//! Le résolveur ne connaît que le trait [`AddressStore`]. `MemoryStore`
//! sert aux tests et aux snapshots JSON; le store PostgreSQL vit dans
//! `hatake-pg`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AreamapError, Result};
use crate::normalize::{normalize_key, normalize_query};
use crate::types::{PostalRecord, WeatherArea};

/// Requête de recherche de codes postaux
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostalQuery {
    /// Code exact (7 chiffres)
    Code(String),
    /// Sous-chaîne de la préfecture, de la municipalité ou du quartier
    Text(String),
}

/// Lecture seule sur les codes postaux et les zones météo
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Codes postaux correspondant à la requête
    async fn find_postal_records(&self, query: &PostalQuery) -> Result<Vec<PostalRecord>>;

    /// Zones météo d'une préfecture (comparaison normalisée)
    async fn find_weather_areas_by_prefecture(&self, prefecture: &str) -> Result<Vec<WeatherArea>>;

    /// Tous les codes postaux, triés par code
    async fn all_postal_records(&self) -> Result<Vec<PostalRecord>>;

    /// Toutes les zones météo, triées par code de zone
    async fn all_weather_areas(&self) -> Result<Vec<WeatherArea>>;
}

#[async_trait]
impl<T: AddressStore + ?Sized> AddressStore for &T {
    async fn find_postal_records(&self, query: &PostalQuery) -> Result<Vec<PostalRecord>> {
        (**self).find_postal_records(query).await
    }

    async fn find_weather_areas_by_prefecture(&self, prefecture: &str) -> Result<Vec<WeatherArea>> {
        (**self).find_weather_areas_by_prefecture(prefecture).await
    }

    async fn all_postal_records(&self) -> Result<Vec<PostalRecord>> {
        (**self).all_postal_records().await
    }

    async fn all_weather_areas(&self) -> Result<Vec<WeatherArea>> {
        (**self).all_weather_areas().await
    }
}

#[async_trait]
impl<T: AddressStore + ?Sized> AddressStore for Arc<T> {
    async fn find_postal_records(&self, query: &PostalQuery) -> Result<Vec<PostalRecord>> {
        (**self).find_postal_records(query).await
    }

    async fn find_weather_areas_by_prefecture(&self, prefecture: &str) -> Result<Vec<WeatherArea>> {
        (**self).find_weather_areas_by_prefecture(prefecture).await
    }

    async fn all_postal_records(&self) -> Result<Vec<PostalRecord>> {
        (**self).all_postal_records().await
    }

    async fn all_weather_areas(&self) -> Result<Vec<WeatherArea>> {
        (**self).all_weather_areas().await
    }
}

/// Contenu sérialisé d'un [`MemoryStore`]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub postal_codes: Vec<PostalRecord>,
    #[serde(default)]
    pub weather_areas: Vec<WeatherArea>,
}

/// Store en mémoire, ordonné par clé naturelle
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    postal: BTreeMap<String, PostalRecord>,
    areas: BTreeMap<String, WeatherArea>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construit un store; un doublon de clé remplace l'entrée précédente
    pub fn from_records(
        postal: impl IntoIterator<Item = PostalRecord>,
        areas: impl IntoIterator<Item = WeatherArea>,
    ) -> Self {
        let mut store = Self::new();
        for record in postal {
            store.insert_postal(record);
        }
        for area in areas {
            store.insert_area(area);
        }
        store
    }

    /// Charge un snapshot JSON `{ "postal_codes": [...], "weather_areas": [...] }`
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::from_records(snapshot.postal_codes, snapshot.weather_areas))
    }

    /// Charge un snapshot depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AreamapError::store(format!("failed to read {}: {}", path.display(), e))
        })?;
        let store = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            postal_codes = store.postal.len(),
            weather_areas = store.areas.len(),
            "Loaded snapshot"
        );
        Ok(store)
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            postal_codes: self.postal.values().cloned().collect(),
            weather_areas: self.areas.values().cloned().collect(),
        }
    }

    pub fn insert_postal(&mut self, record: PostalRecord) {
        self.postal.insert(record.postal_code.clone(), record);
    }

    pub fn insert_area(&mut self, area: WeatherArea) {
        self.areas.insert(area.area_code.clone(), area);
    }

    pub fn postal_count(&self) -> usize {
        self.postal.len()
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }
}

// L'adresse complète couvre aussi les fragments à cheval ("東京都千代田")
fn record_contains(record: &PostalRecord, fragment: &str) -> bool {
    normalize_query(&format!("{}{}{}", record.prefecture, record.city, record.town()))
        .contains(fragment)
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn find_postal_records(&self, query: &PostalQuery) -> Result<Vec<PostalRecord>> {
        match query {
            PostalQuery::Code(code) => Ok(self.postal.get(code).cloned().into_iter().collect()),
            PostalQuery::Text(fragment) => {
                let fragment = normalize_query(fragment);
                Ok(self
                    .postal
                    .values()
                    .filter(|r| record_contains(r, &fragment))
                    .cloned()
                    .collect())
            }
        }
    }

    async fn find_weather_areas_by_prefecture(&self, prefecture: &str) -> Result<Vec<WeatherArea>> {
        let key = normalize_key(prefecture);
        Ok(self
            .areas
            .values()
            .filter(|a| normalize_key(&a.prefecture) == key)
            .cloned()
            .collect())
    }

    async fn all_postal_records(&self) -> Result<Vec<PostalRecord>> {
        Ok(self.postal.values().cloned().collect())
    }

    async fn all_weather_areas(&self) -> Result<Vec<WeatherArea>> {
        Ok(self.areas.values().cloned().collect())
    }
}
