//! Scrub preview extraction
//!
//! A thumbnail container is a plain concatenation of JPEGs with no length
//! prefixes. Image boundaries are found by scanning for the JPEG
//! start-of-image marker.

use tracing::{debug, warn};

use crate::api::ContentService;
use crate::models::{PreviewImage, PreviewSet};

/// JPEG start-of-image marker
pub const SOI_MARKER: [u8; 2] = [0xFF, 0xD8];

/// Split a thumbnail container into its images, in order
///
/// Bytes before the first marker are ignored. No marker means no images.
pub fn extract(container: &[u8]) -> PreviewSet {
    let mut images = Vec::new();
    let mut start: Option<usize> = None;

    let mut i = 0;
    while i + 1 < container.len() {
        if container[i] == SOI_MARKER[0] && container[i + 1] == SOI_MARKER[1] {
            if let Some(prev) = start {
                images.push(PreviewImage(container[prev..i].to_vec()));
            }
            start = Some(i);
            // Both marker bytes are consumed
            i += 2;
        } else {
            i += 1;
        }
    }

    if let Some(prev) = start {
        images.push(PreviewImage(container[prev..].to_vec()));
    }

    PreviewSet::new(images)
}

/// Fetch and extract previews; any transport failure degrades to an empty set
pub async fn load_previews(service: &dyn ContentService, container_url: &str) -> PreviewSet {
    match service.fetch_preview_container(container_url).await {
        Ok(bytes) => {
            let set = extract(&bytes);
            debug!(url = container_url, count = set.len(), "previews extracted");
            set
        }
        Err(e) => {
            warn!(url = container_url, error = %e, "preview container unavailable");
            PreviewSet::default()
        }
    }
}
