//! Types d'erreurs pour le crate areamap

use thiserror::Error;

/// Erreurs pouvant survenir lors de la résolution code postal → zone météo
#[derive(Debug, Error)]
pub enum AreamapError {
    /// Le code postal demandé n'existe pas dans le store
    #[error("Postal code not found: {postal_code}")]
    NotFound { postal_code: String },

    /// Entrée invalide (code non numérique, requête vide, ...)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Erreur remontée par l'implémentation du store
    #[error("Store error: {0}")]
    Store(String),

    /// Snapshot JSON illisible
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl AreamapError {
    /// Crée une erreur "code postal introuvable"
    pub fn not_found(postal_code: impl Into<String>) -> Self {
        Self::NotFound {
            postal_code: postal_code.into(),
        }
    }

    /// Crée une erreur de validation
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Encapsule une erreur du backend de stockage
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, AreamapError>;
