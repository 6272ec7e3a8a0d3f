//! 対馬市: répartition entre 上対馬 (nord) et 下対馬 (sud)

use super::Candidate;
use crate::normalize::{normalize_key, normalize_query};
use crate::types::WeatherArea;

pub const PREFECTURE: &str = "長崎県";
pub const CITY: &str = "対馬市";

const UPPER_TOWNS: &[&str] = &["上県町", "上対馬町"];
const LOWER_TOWNS: &[&str] = &["厳原町", "豊玉町", "美津島町", "峰町"];

const UPPER_AREA: &str = "上対馬";
const LOWER_AREA: &str = "下対馬";

/// Préfecture et municipalité comparées après normalisation
pub fn applies(prefecture: &str, city: &str) -> bool {
    normalize_key(prefecture) == normalize_key(PREFECTURE) && normalize_query(city) == CITY
}

/// Zone 上対馬 ou 下対馬 selon le quartier; 下対馬 par défaut
pub(crate) fn find_area<'a>(town: &str, candidates: &[Candidate<'a>]) -> Option<&'a WeatherArea> {
    let town = normalize_query(town);
    let by_name = |name: &str| {
        candidates
            .iter()
            .find(|c| c.city.contains(name))
            .map(|c| c.area)
    };

    if UPPER_TOWNS.iter().any(|t| town.contains(t)) {
        if let Some(area) = by_name(UPPER_AREA) {
            return Some(area);
        }
    } else if LOWER_TOWNS.iter().any(|t| town.contains(t)) {
        if let Some(area) = by_name(LOWER_AREA) {
            return Some(area);
        }
    }

    by_name(LOWER_AREA)
}
