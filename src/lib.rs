//! GlobeMesh - region boundary polygons as sphere-draped 3D meshes
//!
//! This library converts geographic boundary data (GeoJSON polygons and
//! multi-polygons) into renderable mesh artifacts projected onto a sphere,
//! with a three-tier cache and a rotation controller for focusing the globe
//! on a selected region.
//!
//! # High-Level API
//!
//! Most callers go through a [`session::HighlightSession`]:
//!
//! ```ignore
//! use globemesh::config::GlobeConfig;
//! use globemesh::geometry::Style;
//! use globemesh::session::HighlightSession;
//! use globemesh::source::HttpRegionSource;
//!
//! let config = GlobeConfig::default();
//! let source = Arc::new(HttpRegionSource::new("https://example.com/geo")?);
//! let session = HighlightSession::new(&config, source, sink, centers);
//!
//! let outcome = session.highlight("DEU", Style::Filled).await?;
//! ```

pub mod cache;
pub mod centers;
pub mod config;
pub mod geojson;
pub mod geometry;
pub mod logging;
pub mod mesh;
pub mod pipeline;
pub mod projection;
pub mod rotation;
pub mod session;
pub mod source;

/// Version of the GlobeMesh library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
