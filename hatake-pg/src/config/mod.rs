//! Configuration de l'application

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

use crate::db::schema::validate_schema_name;
use crate::db::store::DEFAULT_SEARCH_LIMIT;
use crate::mapping::DEFAULT_BATCH_SIZE;

/// Réglages applicatifs, chargés depuis un fichier JSON optionnel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Schéma PostgreSQL des tables
    pub schema: String,

    /// Nombre maximum de résultats d'une recherche textuelle
    pub search_limit: i64,

    /// Codes postaux par transaction lors du rattachement
    pub batch_size: usize,

    /// Taille de l'échantillon analysé par `analyze`
    pub sample_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema: "hatake".to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_size: 100,
        }
    }
}

impl AppSettings {
    /// Charge les réglages depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("Failed to parse config JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fichier donné, sinon `HATAKE_CONFIG`, sinon valeurs par défaut
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match std::env::var("HATAKE_CONFIG") {
                Ok(path) => Self::load(Path::new(&path)),
                Err(_) => Ok(Self::default()),
            },
        }
    }

    fn validate(&self) -> Result<()> {
        validate_schema_name(&self.schema)?;
        if self.search_limit < 1 {
            anyhow::bail!("search_limit must be at least 1, got {}", self.search_limit);
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.schema, "hatake");
        assert_eq!(settings.search_limit, 100);
        assert_eq!(settings.batch_size, 100);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = AppSettings::from_json(r#"{"batch_size": 500}"#).unwrap();
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.search_limit, 100);
        assert_eq!(settings.schema, "hatake");
    }

    #[test]
    fn test_invalid_settings() {
        assert!(AppSettings::from_json(r#"{"batch_size": 0}"#).is_err());
        assert!(AppSettings::from_json(r#"{"search_limit": 0}"#).is_err());
        assert!(AppSettings::from_json(r#"{"schema": "bad name"}"#).is_err());
        assert!(AppSettings::from_json(r#"{"unknown": 1}"#).is_err());
    }
}
