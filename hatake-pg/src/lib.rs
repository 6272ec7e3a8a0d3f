//! # hatake-pg
//!
//! Store PostgreSQL et outillage CLI pour le rattachement des codes postaux
//! aux zones météo.
//!
//! ## Features
//!
//! - [`PgStore`]: implémentation PostgreSQL de [`areamap::AddressStore`]
//! - Pool de connexions avec TLS optionnel
//! - Passe de rattachement par lots transactionnels, avec rapport
//! - CLI `hatake`
//!
//! ## Usage CLI
//!
//! ```bash
//! # Résolution d'un code ou d'un fragment d'adresse
//! hatake resolve 100-0001
//! hatake resolve 千代田 --json
//!
//! # Statistiques à la demande, ou sur un snapshot JSON sans base
//! hatake summarize
//! hatake --snapshot ./snapshot.json summarize
//!
//! # Écriture des rattachements en base
//! hatake map --batch-size 100 --report ./mapping.json
//! ```

pub mod config;
pub mod db;
pub mod mapping;
pub mod report;

pub use config::AppSettings;
pub use db::pool::{create_pool, DatabaseConfig, SslMode};
pub use db::store::PgStore;
pub use report::{MappingReport, MappingStatus};
