//! Next/previous content lookup
//!
//! Each content type has its own adjacency source: the series' up-next and
//! previous-episode endpoints, the movie listing's siblings, or the artist's
//! concert/video list. Nothing is cached; the sources may change between
//! calls. `Ok(None)` means there is no adjacent item.

use tracing::debug;

use crate::api::{ApiError, ContentService};
use crate::catalog;
use crate::models::{ContentItem, ContentType, Step};

/// Find the item `step` away from `content`
pub async fn find_adjacent(
    service: &dyn ContentService,
    content: &ContentItem,
    step: Step,
) -> Result<Option<ContentItem>, ApiError> {
    let found = match content.content_type {
        ContentType::Episode => service
            .get_adjacent_episode(&content.id, step)
            .await?
            .map(|raw| catalog::normalize(&raw)),
        ContentType::Movie => adjacent_movie(service, content, step).await?,
        ContentType::Concert | ContentType::Video => {
            adjacent_music(service, content, step).await?
        }
        ContentType::Other => None,
    };

    // Adjacent items are always of the same type as the current one
    let found = found
        .filter(|item| !item.id.is_empty())
        .map(|mut item| {
            item.content_type = content.content_type;
            item
        });

    debug!(
        content_id = %content.id,
        ?step,
        found = found.as_ref().map(|i| i.id.as_str()),
        "adjacency lookup"
    );
    Ok(found)
}

/// Index `step` away from `index` if it lies inside `0..len`
fn offset_index(index: usize, step: Step, len: usize) -> Option<usize> {
    let target = index.checked_add_signed(step.offset())?;
    (target < len).then_some(target)
}

async fn adjacent_movie(
    service: &dyn ContentService,
    content: &ContentItem,
    step: Step,
) -> Result<Option<ContentItem>, ApiError> {
    let Some(listing_id) = content.listing_id.as_deref() else {
        return Ok(None);
    };

    let movies: Vec<ContentItem> = service
        .get_sibling_movies(listing_id)
        .await?
        .iter()
        .map(catalog::normalize)
        .collect();

    let next = movies
        .iter()
        .position(|m| m.id == content.id)
        .and_then(|idx| offset_index(idx, step, movies.len()))
        .map(|idx| movies[idx].clone());
    Ok(next)
}

async fn adjacent_music(
    service: &dyn ContentService,
    content: &ContentItem,
    step: Step,
) -> Result<Option<ContentItem>, ApiError> {
    let Some(artist_id) = content.artist_id.as_deref() else {
        return Ok(None);
    };
    let Some(artist) = service.get_artist_adjacency(artist_id).await? else {
        return Ok(None);
    };

    let ids = if content.content_type == ContentType::Concert {
        &artist.concerts
    } else {
        &artist.videos
    };

    let Some(next_id) = ids
        .iter()
        .position(|id| *id == content.id)
        .and_then(|idx| offset_index(idx, step, ids.len()))
        .map(|idx| ids[idx].clone())
    else {
        return Ok(None);
    };

    let items = service
        .get_music_items(content.content_type, &[next_id])
        .await?;
    Ok(items.first().map(catalog::normalize))
}
