//! Analyse des codes postaux sans zone météo
//!
//! Sert à comprendre pourquoi la cascade échoue: préfecture absente des
//! zones, ou format de municipalité non reconnu.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::Result;
use crate::matching::prefecture_candidates;
use crate::normalize::normalize_key;
use crate::resolver::resolve_against;
use crate::store::AddressStore;
use crate::types::{PostalRecord, WeatherArea};

/// Motifs de municipalités comptés dans l'échantillon
const CITY_PATTERNS: &[(&str, fn(&str) -> bool)] = &[
    ("city_ward", is_city_ward),
    ("county", is_county),
    ("town", is_town),
    ("village", is_village),
];

fn is_city_ward(city: &str) -> bool {
    city.contains('市') && city.ends_with('区')
}

fn is_county(city: &str) -> bool {
    city.contains('郡')
}

fn is_town(city: &str) -> bool {
    city.ends_with('町')
}

fn is_village(city: &str) -> bool {
    city.ends_with('村')
}

/// Nombre maximum de municipalités disponibles listées par échec
const MAX_AVAILABLE_CITIES: usize = 10;

/// Municipalité non rattachée et zones disponibles dans sa préfecture
#[derive(Debug, Clone, Serialize)]
pub struct CityIssue {
    pub postal_code: String,
    pub city: String,
    pub available_cities: Vec<String>,
}

/// Résultat de l'analyse
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingDiagnostics {
    pub total_postal_codes: usize,
    pub total_unmapped: usize,
    pub total_weather_areas: usize,
    pub sample_size: usize,
    /// Préfectures sans aucune zone météo → nombre de codes concernés
    pub prefectures_without_areas: BTreeMap<String, usize>,
    /// Préfecture → municipalités non reconnues
    pub city_issues: BTreeMap<String, Vec<CityIssue>>,
    /// Motif → nombre de codes de l'échantillon
    pub pattern_counts: BTreeMap<String, usize>,
}

/// Analyse un échantillon des codes postaux non rattachés
pub async fn analyze<S: AddressStore + ?Sized>(
    store: &S,
    sample_size: usize,
) -> Result<MappingDiagnostics> {
    let records = store.all_postal_records().await?;
    let areas = store.all_weather_areas().await?;
    Ok(analyze_records(&records, &areas, sample_size))
}

/// Analyse pure sur des données déjà chargées
pub fn analyze_records(
    records: &[PostalRecord],
    areas: &[WeatherArea],
    sample_size: usize,
) -> MappingDiagnostics {
    let mut areas_by_prefecture: HashMap<String, Vec<WeatherArea>> = HashMap::new();
    for area in areas {
        areas_by_prefecture
            .entry(normalize_key(&area.prefecture))
            .or_default()
            .push(area.clone());
    }

    let unmapped: Vec<&PostalRecord> = records
        .iter()
        .filter(|r| !resolve_against(r, areas_for(&areas_by_prefecture, r)).is_mapped())
        .collect();

    let sample = &unmapped[..unmapped.len().min(sample_size)];

    let mut report = MappingDiagnostics {
        total_postal_codes: records.len(),
        total_unmapped: unmapped.len(),
        total_weather_areas: areas.len(),
        sample_size: sample.len(),
        pattern_counts: CITY_PATTERNS
            .iter()
            .map(|(name, _)| (name.to_string(), 0))
            .collect(),
        ..Default::default()
    };

    for record in sample {
        for (name, is_match) in CITY_PATTERNS {
            if is_match(&record.city) {
                *report.pattern_counts.entry(name.to_string()).or_default() += 1;
            }
        }

        let candidates = prefecture_candidates(record, areas_for(&areas_by_prefecture, record));
        if candidates.is_empty() {
            *report
                .prefectures_without_areas
                .entry(record.prefecture.clone())
                .or_default() += 1;
            continue;
        }

        report
            .city_issues
            .entry(normalize_key(&record.prefecture))
            .or_default()
            .push(CityIssue {
                postal_code: record.postal_code.clone(),
                city: record.city.clone(),
                available_cities: candidates
                    .iter()
                    .take(MAX_AVAILABLE_CITIES)
                    .map(|a| a.city.clone())
                    .collect(),
            });
    }

    report
}

fn areas_for<'a>(
    by_prefecture: &'a HashMap<String, Vec<WeatherArea>>,
    record: &PostalRecord,
) -> &'a [WeatherArea] {
    by_prefecture
        .get(&normalize_key(&record.prefecture))
        .map_or(&[][..], Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_analyze_classifies_failures() {
        let store = MemoryStore::from_records(
            [
                PostalRecord::new("1000001", "東京都", "千代田区"),
                PostalRecord::new("1006890", "東京都", "小笠原村"),
                PostalRecord::new("9010000", "沖縄県", "島尻郡南大東村"),
            ],
            [WeatherArea::new("130010", "東京都", "東京地方", "千代田区")],
        );

        let report = analyze(&store, 100).await.unwrap();
        assert_eq!(report.total_postal_codes, 3);
        assert_eq!(report.total_unmapped, 2);
        assert_eq!(report.total_weather_areas, 1);
        assert_eq!(report.prefectures_without_areas.get("沖縄県"), Some(&1));

        let tokyo = &report.city_issues["東京都"];
        assert_eq!(tokyo.len(), 1);
        assert_eq!(tokyo[0].city, "小笠原村");
        assert_eq!(tokyo[0].available_cities, vec!["千代田区".to_string()]);

        assert_eq!(report.pattern_counts["village"], 2);
        assert_eq!(report.pattern_counts["county"], 1);
        assert_eq!(report.pattern_counts["city_ward"], 0);
    }

    #[test]
    fn test_sample_size_limits_detail() {
        let records = vec![
            PostalRecord::new("9010000", "沖縄県", "那覇市"),
            PostalRecord::new("9010001", "沖縄県", "浦添市"),
        ];
        let report = analyze_records(&records, &[], 1);
        assert_eq!(report.total_unmapped, 2);
        assert_eq!(report.sample_size, 1);
        assert_eq!(report.prefectures_without_areas["沖縄県"], 1);
    }
}
