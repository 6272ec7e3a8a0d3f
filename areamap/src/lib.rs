//! # areamap
//!
//! Rattachement des codes postaux japonais aux zones de prévision météo.
//!
//! ## Features
//!
//! - Normalisation des requêtes (NFKC, pleine chasse → demi-chasse, "〒100-0001")
//! - Hiérarchie préfecture → région → municipalité, préfecture comparée en premier
//! - Cascade de règles municipales (arrondissements, districts, villes désignées, 対馬)
//! - Store abstrait ([`AddressStore`]) avec implémentation mémoire / snapshot JSON
//! - Statistiques de couverture et diagnostic des échecs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use areamap::{MemoryStore, Reporter, Resolver};
//!
//! let store = MemoryStore::load(Path::new("snapshot.json"))?;
//! let mapping = Resolver::new(&store).resolve_code("1000001").await?;
//! println!("{:?}", mapping.area_code());
//!
//! let stats = Reporter::new(&store).summarize().await?;
//! println!("{:.1}% mapped", stats.mapping_rate * 100.0);
//! ```

pub mod diagnostics;
pub mod error;
pub mod matching;
pub mod normalize;
pub mod resolver;
pub mod stats;
pub mod store;
pub mod types;

pub use error::{AreamapError, Result};
pub use resolver::{resolve_against, Resolver};
pub use stats::{CoverageReport, Reporter};
pub use store::{AddressStore, MemoryStore, PostalQuery, Snapshot};
pub use types::{
    AreaMatch, MatchKind, PostalRecord, Resolution, ResolvedMapping, SummaryStats, WeatherArea,
};
