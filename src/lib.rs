//! Filtering and aggregation engine for historical farmland price data.
//!
//! The pipeline has three independent stages over already-loaded data:
//! [`metadata::build_metadata`] derives the selectable facets,
//! [`filter::filter_records`] applies a [`FilterSpec`], and
//! [`aggregate::aggregate`] computes the statistics bundle that tables,
//! charts and the map bind to. Records are mapped onto a single land
//! classification by [`nomenclature::normalize`] as they are loaded.
//!
//! ```
//! use terra_prices::{aggregate, filter_records, normalize, FilterSpec, RawPriceRecord};
//!
//! let records: Vec<_> = [(2020, 100.0), (2021, 121.0)]
//!     .into_iter()
//!     .map(|(year, price)| {
//!         normalize(RawPriceRecord {
//!             year: Some(year),
//!             category: Some("Roxa".into()),
//!             subcategory: Some("Mecanizada".into()),
//!             price: Some(price),
//!             ..Default::default()
//!         })
//!     })
//!     .collect();
//!
//! let selected = filter_records(&records, &FilterSpec::default());
//! let result = aggregate(&selected, "");
//! assert_eq!(result.time_series.len(), 2);
//! assert!((result.cagr - 0.21).abs() < 1e-9);
//! ```

pub mod aggregate;
pub mod choropleth;
pub mod config;
pub mod error;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod metadata;
pub mod nomenclature;
pub mod output;
pub mod report;
pub mod types;
pub mod util;

pub use aggregate::aggregate;
pub use error::DashboardError;
pub use filter::filter_records;
pub use metadata::build_metadata;
pub use nomenclature::{get_group, get_label, is_legacy_format, is_new_format, normalize, LabelFormat};
pub use types::{
    AggregationResult, FilterSpec, Metadata, PriceRecord, PriceStats, RawPriceRecord, YearRange,
};
