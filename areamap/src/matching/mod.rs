//! Cascade de correspondance municipalité → zone météo
//!
//! Les zones sont d'abord filtrées sur la préfecture (égalité normalisée),
//! puis les règles sont essayées dans l'ordre de [`MatchKind`]. La première
//! règle qui trouve au moins une zone décide. À l'intérieur d'une règle, la
//! zone la plus spécifique gagne; à spécificité égale, le plus petit
//! `area_code`.

pub mod designated;
pub mod tsushima;

use tracing::{debug, trace};

use crate::normalize::{
    normalize_key, normalize_query, strip_county, strip_ward, unify_kana_variants,
};
use crate::types::{MatchKind, PostalRecord, WeatherArea};

/// Zone candidate avec son nom de municipalité normalisé
pub(crate) struct Candidate<'a> {
    pub(crate) area: &'a WeatherArea,
    pub(crate) city: String,
}

impl<'a> Candidate<'a> {
    pub(crate) fn new(area: &'a WeatherArea) -> Self {
        Self {
            area,
            city: normalize_query(&area.city),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Prefer {
    /// Nom de zone le plus long (préfixe / sous-chaîne de la municipalité)
    Longest,
    /// Nom de zone le plus court (zone contenant la municipalité)
    Shortest,
}

/// Zones de `areas` partageant la préfecture de `record`, triées par code
pub fn prefecture_candidates<'a>(
    record: &PostalRecord,
    areas: &'a [WeatherArea],
) -> Vec<&'a WeatherArea> {
    let key = normalize_key(&record.prefecture);
    let mut candidates: Vec<&WeatherArea> = areas
        .iter()
        .filter(|a| normalize_key(&a.prefecture) == key)
        .collect();
    candidates.sort_by(|a, b| a.area_code.cmp(&b.area_code));
    candidates
}

/// Cherche la zone météo d'un code postal parmi `areas`
///
/// Retourne `None` si aucune zone ne partage la préfecture ou si aucune
/// règle ne s'applique.
pub fn match_area<'a>(
    record: &PostalRecord,
    areas: &'a [WeatherArea],
) -> Option<(&'a WeatherArea, MatchKind)> {
    let by_prefecture = prefecture_candidates(record, areas);
    if by_prefecture.is_empty() {
        trace!(
            postal_code = %record.postal_code,
            prefecture = %record.prefecture,
            "No weather area for prefecture"
        );
        return None;
    }

    let city = normalize_query(&record.city);
    if city.is_empty() {
        return None;
    }

    let candidates: Vec<Candidate<'a>> = by_prefecture
        .iter()
        .map(|&area| Candidate::new(area))
        .filter(|c| !c.city.is_empty())
        .collect();

    let ward_stripped = strip_ward(&city);

    if let Some(area) = most_specific(&candidates, Prefer::Longest, |c| c == city) {
        return Some((area, MatchKind::Exact));
    }

    if ward_stripped != city {
        if let Some(area) = most_specific(&candidates, Prefer::Longest, |c| c == ward_stripped) {
            return Some((area, MatchKind::WardStripped));
        }
    }

    if let Some(area) = most_specific(&candidates, Prefer::Shortest, |c| c.contains(&*city)) {
        return Some((area, MatchKind::Contains));
    }

    if let Some(area) = most_specific(&candidates, Prefer::Longest, |c| city.contains(c)) {
        return Some((area, MatchKind::Substring));
    }

    if let Some(area) =
        most_specific(&candidates, Prefer::Longest, |c| strip_ward(c) == ward_stripped)
    {
        return Some((area, MatchKind::Normalized));
    }

    if designated::is_designated_city(ward_stripped) {
        if let Some(area) = designated::find_regional_area(&city, &candidates) {
            return Some((area, MatchKind::DesignatedCityRegion));
        }
    }

    if let Some(simplified) = strip_county(&city) {
        if let Some(area) = most_specific(&candidates, Prefer::Longest, |c| c == simplified) {
            return Some((area, MatchKind::CountyStripped));
        }
        if let Some(area) =
            most_specific(&candidates, Prefer::Shortest, |c| c.contains(simplified))
        {
            return Some((area, MatchKind::CountyStripped));
        }
    }

    let unified = unify_kana_variants(&city);
    if unified != city {
        if let Some(area) =
            most_specific(&candidates, Prefer::Longest, |c| unify_kana_variants(c) == unified)
        {
            return Some((area, MatchKind::KanaVariant));
        }
    }

    if tsushima::applies(&record.prefecture, &city) {
        if let Some(area) = tsushima::find_area(record.town(), &candidates) {
            return Some((area, MatchKind::Tsushima));
        }
    }

    None
}

/// Meilleure zone satisfaisant `pred`; premier rencontré en cas d'égalité
fn most_specific<'a, F>(
    candidates: &[Candidate<'a>],
    prefer: Prefer,
    pred: F,
) -> Option<&'a WeatherArea>
where
    F: Fn(&str) -> bool,
{
    let mut best: Option<(&Candidate<'a>, usize)> = None;
    let mut tied_regions = false;

    for candidate in candidates.iter().filter(|c| pred(&c.city)) {
        let len = candidate.city.chars().count();
        match best {
            None => best = Some((candidate, len)),
            Some((current, best_len)) => {
                let better = match prefer {
                    Prefer::Longest => len > best_len,
                    Prefer::Shortest => len < best_len,
                };
                if better {
                    best = Some((candidate, len));
                    tied_regions = false;
                } else if len == best_len && candidate.area.region != current.area.region {
                    tied_regions = true;
                }
            }
        }
    }

    let (winner, _) = best?;
    if tied_regions {
        debug!(
            area_code = %winner.area.area_code,
            city = %winner.city,
            "Equally specific weather areas with different regions, keeping lowest area code"
        );
    }
    Some(winner.area)
}
