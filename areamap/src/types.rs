//! Types de données pour le crate areamap

use serde::{Deserialize, Serialize};

/// Enregistrement d'adresse identifié par un code postal à 7 chiffres
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalRecord {
    /// Code postal (7 chiffres ASCII, sans tiret)
    pub postal_code: String,

    /// Préfecture (ex: "東京都")
    pub prefecture: String,

    /// Municipalité (ex: "千代田区", "札幌市中央区", "沙流郡日高町")
    pub city: String,

    /// Quartier / localité, absent pour les codes génériques
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
}

impl PostalRecord {
    pub fn new(
        postal_code: impl Into<String>,
        prefecture: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            postal_code: postal_code.into(),
            prefecture: prefecture.into(),
            city: city.into(),
            town: None,
        }
    }

    pub fn with_town(mut self, town: impl Into<String>) -> Self {
        self.town = Some(town.into());
        self
    }

    /// Quartier, chaîne vide si absent
    pub fn town(&self) -> &str {
        self.town.as_deref().unwrap_or("")
    }
}

/// Zone de prévision météo (préfecture → région → municipalité)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherArea {
    /// Identifiant unique de la zone
    pub area_code: String,

    /// Préfecture de rattachement
    pub prefecture: String,

    /// Région de prévision (ex: "東京地方", "南部")
    pub region: String,

    /// Municipalité couverte (ex: "千代田区", "札幌市東部", "上対馬")
    pub city: String,
}

impl WeatherArea {
    pub fn new(
        area_code: impl Into<String>,
        prefecture: impl Into<String>,
        region: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            area_code: area_code.into(),
            prefecture: prefecture.into(),
            region: region.into(),
            city: city.into(),
        }
    }
}

/// Règle ayant permis d'associer une zone météo à un code postal
///
/// L'ordre des variantes est l'ordre d'essai de la cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Municipalité identique
    Exact,
    /// Municipalité sans l'arrondissement ("札幌市中央区" → "札幌市")
    WardStripped,
    /// La zone contient le nom de la municipalité
    Contains,
    /// Le nom de la zone est préfixe ou sous-chaîne de la municipalité
    Substring,
    /// Égalité après suppression des arrondissements des deux côtés
    Normalized,
    /// Arrondissement d'une ville désignée → région cardinale
    DesignatedCityRegion,
    /// Municipalité sans le district ("沙流郡日高町" → "日高町")
    CountyStripped,
    /// Variante kana "ケ" / "ヶ"
    KanaVariant,
    /// Répartition de 対馬市 entre 上対馬 et 下対馬
    Tsushima,
}

/// Zone météo retenue et règle utilisée
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaMatch {
    #[serde(flatten)]
    pub area: WeatherArea,
    pub matched_by: MatchKind,
}

/// Résultat dérivé d'une résolution, jamais persisté ni mis en cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMapping {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    /// `None` si aucune zone ne correspond (état normal, pas une erreur)
    pub area: Option<AreaMatch>,
}

impl ResolvedMapping {
    pub fn unmatched(record: &PostalRecord) -> Self {
        Self {
            postal_code: record.postal_code.clone(),
            prefecture: record.prefecture.clone(),
            city: record.city.clone(),
            area: None,
        }
    }

    pub fn matched(record: &PostalRecord, area: WeatherArea, kind: MatchKind) -> Self {
        Self {
            postal_code: record.postal_code.clone(),
            prefecture: record.prefecture.clone(),
            city: record.city.clone(),
            area: Some(AreaMatch {
                area,
                matched_by: kind,
            }),
        }
    }

    pub fn area_code(&self) -> Option<&str> {
        self.area.as_ref().map(|m| m.area.area_code.as_str())
    }

    pub fn region(&self) -> Option<&str> {
        self.area.as_ref().map(|m| m.area.region.as_str())
    }

    pub fn matched_by(&self) -> Option<MatchKind> {
        self.area.as_ref().map(|m| m.matched_by)
    }

    pub fn is_mapped(&self) -> bool {
        self.area.is_some()
    }
}

/// Résultat de `resolve`: un code postal exact donne une seule
/// correspondance, une requête texte en donne une liste
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Resolution {
    Single(ResolvedMapping),
    Many(Vec<ResolvedMapping>),
}

impl Resolution {
    pub fn into_vec(self) -> Vec<ResolvedMapping> {
        match self {
            Self::Single(m) => vec![m],
            Self::Many(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nombre de correspondances avec une zone météo
    pub fn mapped(&self) -> usize {
        match self {
            Self::Single(m) => usize::from(m.is_mapped()),
            Self::Many(v) => v.iter().filter(|m| m.is_mapped()).count(),
        }
    }
}

/// Statistiques agrégées de couverture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_postal_codes: usize,
    pub mapped_count: usize,
    pub unmapped_count: usize,
    /// Ratio dans [0, 1], 0.0 si aucun code postal
    pub mapping_rate: f64,
}

impl SummaryStats {
    pub fn from_counts(total: usize, mapped: usize) -> Self {
        let mapping_rate = if total == 0 {
            0.0
        } else {
            mapped as f64 / total as f64
        };

        Self {
            total_postal_codes: total,
            mapped_count: mapped,
            unmapped_count: total.saturating_sub(mapped),
            mapping_rate,
        }
    }
}

impl Default for SummaryStats {
    fn default() -> Self {
        Self::from_counts(0, 0)
    }
}
