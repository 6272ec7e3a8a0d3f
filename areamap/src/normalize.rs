//! Normalisation des requêtes et des noms de municipalités
//!
//! Les requêtes utilisateur arrivent en pleine chasse ou demi-chasse
//! ("１００－０００１", "〒100-0001", " 千代田 区 "). Tout passe par NFKC
//! avant comparaison.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AreamapError, Result};

/// Longueur d'un code postal japonais
pub const POSTAL_CODE_LEN: usize = 7;

/// "○○市○○区" (arrondissement d'une ville désignée)
static CITY_WARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+市)(.+区)$").expect("valid ward regex"));

/// "○○郡○○町", "○○郡○○村", "○○郡○○市"
static COUNTY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+郡(.+[町村市])$").expect("valid county regex"));

/// Requête analysée
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Code postal exact, 7 chiffres ASCII
    PostalCode(String),
    /// Fragment d'adresse libre, normalisé
    Text(String),
}

/// NFKC puis suppression de tous les blancs
pub fn normalize_query(raw: &str) -> String {
    raw.nfkc().filter(|c| !c.is_whitespace()).collect()
}

/// Clé de comparaison des préfectures (casse et blancs ignorés)
pub fn normalize_key(raw: &str) -> String {
    normalize_query(raw).to_lowercase()
}

/// Vérifie qu'une chaîne est exactement 7 chiffres ASCII
pub fn is_postal_code(s: &str) -> bool {
    s.len() == POSTAL_CODE_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// Analyse une requête brute en code postal ou fragment texte
///
/// Une requête composée uniquement de chiffres et de tirets doit être un
/// code postal valide ("1000001" ou "100-0001"), sinon `Validation`.
pub fn parse_query(raw: &str) -> Result<Query> {
    let normalized = normalize_query(raw);
    let stripped = normalized.trim_start_matches('〒');

    if stripped.is_empty() {
        return Err(AreamapError::validation("empty query"));
    }

    if stripped.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return validate_postal_code(stripped).map(Query::PostalCode);
    }

    Ok(Query::Text(stripped.to_string()))
}

/// Valide un code postal et le retourne sans tiret
///
/// Formes acceptées: `1000001`, `100-0001` (après normalisation NFKC).
pub fn validate_postal_code(raw: &str) -> Result<String> {
    let normalized = normalize_query(raw);
    let code = normalized.trim_start_matches('〒');

    let digits = match code.split_once('-') {
        None => code.to_string(),
        Some((head, tail)) if head.len() == 3 && tail.len() == 4 => format!("{head}{tail}"),
        Some(_) => {
            return Err(AreamapError::validation(format!(
                "malformed postal code '{raw}': expected NNN-NNNN or 7 digits"
            )))
        }
    };

    if !is_postal_code(&digits) {
        return Err(AreamapError::validation(format!(
            "postal code must be 7 digits, got '{raw}'"
        )));
    }

    Ok(digits)
}

/// Sépare "札幌市中央区" en ("札幌市", "中央区")
pub fn split_ward(city: &str) -> Option<(&str, &str)> {
    let caps = CITY_WARD.captures(city)?;
    let (city_part, ward) = (caps.get(1)?, caps.get(2)?);
    Some((city_part.as_str(), ward.as_str()))
}

/// Supprime l'arrondissement: "横浜市鶴見区" → "横浜市"
///
/// Les arrondissements spéciaux de Tokyo ("千代田区") restent intacts.
pub fn strip_ward(city: &str) -> &str {
    split_ward(city).map_or(city, |(city_part, _)| city_part)
}

/// Supprime le district: "沙流郡日高町" → "日高町"
pub fn strip_county(city: &str) -> Option<&str> {
    COUNTY_PREFIX
        .captures(city)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Unifie la variante kana "ケ" → "ヶ" ("霞ケ浦" → "霞ヶ浦")
pub fn unify_kana_variants(city: &str) -> String {
    city.replace('ケ', "ヶ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query_fullwidth() {
        assert_eq!(normalize_query("１００－０００１"), "100-0001");
        assert_eq!(normalize_query(" 千代田 区\t"), "千代田区");
        assert_eq!(normalize_query("東京都　千代田区"), "東京都千代田区");
    }

    #[test]
    fn test_normalize_key_case_and_spaces() {
        assert_eq!(normalize_key(" Tokyo "), normalize_key("TOKYO"));
        assert_eq!(normalize_key("東京都 "), "東京都");
    }

    #[test]
    fn test_parse_query_postal_code() {
        assert_eq!(
            parse_query("1000001").unwrap(),
            Query::PostalCode("1000001".into())
        );
        assert_eq!(
            parse_query("〒100-0001").unwrap(),
            Query::PostalCode("1000001".into())
        );
        assert_eq!(
            parse_query("１００－０００１").unwrap(),
            Query::PostalCode("1000001".into())
        );
    }

    #[test]
    fn test_parse_query_text() {
        assert_eq!(
            parse_query("千代田 区").unwrap(),
            Query::Text("千代田区".into())
        );
        assert_eq!(parse_query("港区2").unwrap(), Query::Text("港区2".into()));
    }

    #[test]
    fn test_parse_query_invalid() {
        assert!(parse_query("").unwrap_err().is_validation());
        assert!(parse_query("   ").unwrap_err().is_validation());
        assert!(parse_query("〒").unwrap_err().is_validation());
        assert!(parse_query("123").unwrap_err().is_validation());
        assert!(parse_query("12345678").unwrap_err().is_validation());
        assert!(parse_query("1000-001").unwrap_err().is_validation());
        assert!(parse_query("100--0001").unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_postal_code() {
        assert_eq!(validate_postal_code("0600000").unwrap(), "0600000");
        assert!(validate_postal_code("abcdefg").is_err());
        assert!(validate_postal_code("100000").is_err());
    }

    #[test]
    fn test_ward_helpers() {
        assert_eq!(split_ward("札幌市中央区"), Some(("札幌市", "中央区")));
        assert_eq!(strip_ward("横浜市鶴見区"), "横浜市");
        assert_eq!(strip_ward("千代田区"), "千代田区");
        assert_eq!(strip_ward("四日市市"), "四日市市");
    }

    #[test]
    fn test_strip_county() {
        assert_eq!(strip_county("沙流郡日高町"), Some("日高町"));
        assert_eq!(strip_county("島尻郡南大東村"), Some("南大東村"));
        assert_eq!(strip_county("日高町"), None);
    }

    #[test]
    fn test_unify_kana_variants() {
        assert_eq!(unify_kana_variants("鎌ケ谷市"), "鎌ヶ谷市");
        assert_eq!(unify_kana_variants("千代田区"), "千代田区");
    }
}
