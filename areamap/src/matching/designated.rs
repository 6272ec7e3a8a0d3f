//! Villes désignées: arrondissement → région cardinale
//!
//! Les zones météo découpent certaines villes désignées en "東部", "西部",
//! "北部", "南部" alors que les codes postaux sont rattachés à un
//! arrondissement ("仙台市宮城野区"). Chaque ville a sa propre table: un même
//! nom d'arrondissement ("中央区", "北区") n'a pas la même région d'une
//! ville à l'autre.

use super::Candidate;
use crate::normalize::{normalize_query, split_ward};
use crate::types::WeatherArea;

/// Villes désignées pour lesquelles la répartition par région est tentée
pub const DESIGNATED_CITIES: &[&str] = &[
    "仙台市",
    "静岡市",
    "浜松市",
    "札幌市",
    "横浜市",
    "川崎市",
    "相模原市",
    "新潟市",
    "名古屋市",
    "京都市",
    "大阪市",
    "堺市",
    "神戸市",
    "岡山市",
    "広島市",
    "北九州市",
    "福岡市",
    "熊本市",
];

const SENDAI: &[(&str, &str)] = &[
    ("青葉区", "西部"),
    ("宮城野区", "東部"),
    ("若林区", "東部"),
    ("太白区", "西部"),
    ("泉区", "西部"),
];

const SHIZUOKA: &[(&str, &str)] = &[("葵区", "北部"), ("駿河区", "南部"), ("清水区", "南部")];

const HAMAMATSU: &[(&str, &str)] = &[
    ("中央区", "南部"),
    ("東区", "南部"),
    ("西区", "南部"),
    ("南区", "南部"),
    ("北区", "北部"),
    ("浜北区", "北部"),
    ("天竜区", "北部"),
];

const SAPPORO: &[(&str, &str)] = &[
    ("中央区", "西部"),
    ("北区", "西部"),
    ("東区", "東部"),
    ("白石区", "東部"),
    ("豊平区", "西部"),
    ("南区", "西部"),
    ("西区", "西部"),
    ("厚別区", "東部"),
    ("手稲区", "西部"),
    ("清田区", "東部"),
];

const YOKOHAMA: &[(&str, &str)] = &[
    ("鶴見区", "東部"),
    ("神奈川区", "東部"),
    ("西区", "西部"),
    ("中区", "西部"),
    ("南区", "西部"),
    ("保土ヶ谷区", "西部"),
    ("磯子区", "東部"),
    ("金沢区", "東部"),
    ("港北区", "北部"),
    ("戸塚区", "西部"),
    ("港南区", "西部"),
    ("旭区", "西部"),
    ("緑区", "北部"),
    ("瀬谷区", "西部"),
    ("栄区", "西部"),
    ("泉区", "西部"),
    ("青葉区", "北部"),
    ("都筑区", "北部"),
];

pub fn is_designated_city(city: &str) -> bool {
    DESIGNATED_CITIES.contains(&city)
}

/// Région attendue pour un arrondissement, si la ville est cartographiée
pub fn expected_region(city: &str, ward: &str) -> Option<&'static str> {
    let table = match city {
        "仙台市" => SENDAI,
        "静岡市" => SHIZUOKA,
        "浜松市" => HAMAMATSU,
        "札幌市" => SAPPORO,
        "横浜市" => YOKOHAMA,
        _ => return None,
    };

    table
        .iter()
        .find(|(name, _)| *name == ward)
        .map(|(_, region)| *region)
}

/// Choisit la zone d'une ville désignée à partir de l'arrondissement
///
/// Sans région connue, ou si aucune zone ne porte la région attendue,
/// retombe sur la première zone dont le nom contient la ville.
pub(crate) fn find_regional_area<'a>(
    postal_city: &str,
    candidates: &[Candidate<'a>],
) -> Option<&'a WeatherArea> {
    let (city, ward) = split_ward(postal_city)?;

    if let Some(region) = expected_region(city, ward) {
        let regional = candidates.iter().find(|c| {
            c.city.contains(city)
                && (c.city.contains(region) || normalize_query(&c.area.region).contains(region))
        });
        if let Some(c) = regional {
            return Some(c.area);
        }
    }

    candidates
        .iter()
        .find(|c| c.city.contains(city))
        .map(|c| c.area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_region_per_city() {
        assert_eq!(expected_region("仙台市", "宮城野区"), Some("東部"));
        assert_eq!(expected_region("横浜市", "青葉区"), Some("北部"));
        assert_eq!(expected_region("仙台市", "青葉区"), Some("西部"));
        // 中央区 diffère entre 札幌 et 浜松
        assert_eq!(expected_region("札幌市", "中央区"), Some("西部"));
        assert_eq!(expected_region("浜松市", "中央区"), Some("南部"));
        assert_eq!(expected_region("大阪市", "北区"), None);
    }

    #[test]
    fn test_find_regional_area() {
        let east = WeatherArea::new("040011", "宮城県", "東部", "仙台市東部");
        let west = WeatherArea::new("040012", "宮城県", "西部", "仙台市西部");
        let candidates = vec![Candidate::new(&west), Candidate::new(&east)];

        let found = find_regional_area("仙台市宮城野区", &candidates).unwrap();
        assert_eq!(found.area_code, "040011");

        let found = find_regional_area("仙台市青葉区", &candidates).unwrap();
        assert_eq!(found.area_code, "040012");
    }

    #[test]
    fn test_find_regional_area_fallback() {
        let osaka = WeatherArea::new("270000", "大阪府", "大阪府", "大阪市");
        let candidates = vec![Candidate::new(&osaka)];
        let found = find_regional_area("大阪市北区", &candidates).unwrap();
        assert_eq!(found.area_code, "270000");

        assert!(find_regional_area("堺市", &candidates).is_none());
    }

    #[test]
    fn test_find_regional_area_normalized_names() {
        let east = WeatherArea::new("040011", "宮城県", "東 部", "仙台　市");
        let west = WeatherArea::new("040012", "宮城県", "西 部", "仙台　市");
        let candidates = vec![Candidate::new(&west), Candidate::new(&east)];

        let found = find_regional_area("仙台市宮城野区", &candidates).unwrap();
        assert_eq!(found.area_code, "040011");
    }
}
