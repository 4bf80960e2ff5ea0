//! Content/account service access
//!
//! - client: the `ContentService` seam and its HTTP implementation
//! - wire: JSON shapes returned by the service

pub mod client;
pub mod wire;

pub use client::{ApiError, ContentService, HttpContentService};
pub use wire::{ArtistAdjacency, PlayheadRecord, RawContent, StreamsResponse};
