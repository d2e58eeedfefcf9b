//! Pre-game configuration: blind-test playlist and petit-bac categories.

use tracing::info;

use crate::{
    dao::models::{CategoryId, RoomType, UserId},
    dto::{
        blindtest::{PLAYLIST_OPTIONS, PlaylistResponse, canonical_playlist},
        petitbac::CategorySummary,
        room::ActionResponse,
        ws::RoomMessage,
    },
    error::ServiceError,
    services::room_service::{require_admin, require_member, require_room, require_room_type},
    state::SharedState,
};

/// Stored playlist choice of a blind-test room.
pub async fn get_playlist(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<PlaylistResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::BlindTest)?;

    let choice = store.playlist_choice(room.id).await?;
    Ok(PlaylistResponse::new(choice))
}

/// Store the canonical spelling of one of [`PLAYLIST_OPTIONS`].
pub async fn set_playlist(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    playlist: &str,
) -> Result<PlaylistResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_admin(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::BlindTest)?;

    let choice = canonical_playlist(playlist).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "unknown playlist `{}` (expected one of {})",
            playlist.trim(),
            PLAYLIST_OPTIONS.join(", ")
        ))
    })?;
    store
        .set_playlist_choice(room.id, choice.to_string())
        .await?;

    info!(room_id = room.id, playlist = choice, "playlist chosen");
    state.hub(room.id).publish(&RoomMessage::room_updated(room.id));
    Ok(PlaylistResponse::new(Some(choice.to_string())))
}

/// Categories of a petit-bac room, by position.
pub async fn list_categories(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<Vec<CategorySummary>, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::PetitBac)?;

    let categories = store.list_categories(room.id).await?;
    Ok(categories.into_iter().map(CategorySummary::from).collect())
}

/// Append a category (admin only).
pub async fn add_category(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    label: &str,
) -> Result<CategorySummary, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_admin(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::PetitBac)?;

    let category = store
        .add_category(room.id, clean_label(label)?)
        .await?;

    info!(room_id = room.id, category_id = category.id, "category added");
    state.hub(room.id).publish(&RoomMessage::room_updated(room.id));
    Ok(category.into())
}

/// Rename a category (admin only).
pub async fn rename_category(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    category_id: CategoryId,
    label: &str,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_admin(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::PetitBac)?;

    store
        .rename_category(room.id, category_id, clean_label(label)?)
        .await?;

    state.hub(room.id).publish(&RoomMessage::room_updated(room.id));
    Ok(ActionResponse::ok())
}

/// Delete a category (admin only).
pub async fn delete_category(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    category_id: CategoryId,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_admin(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::PetitBac)?;

    store.delete_category(room.id, category_id).await?;

    info!(room_id = room.id, category_id, "category deleted");
    state.hub(room.id).publish(&RoomMessage::room_updated(room.id));
    Ok(ActionResponse::ok())
}

fn clean_label(label: &str) -> Result<String, ServiceError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ServiceError::InvalidInput("category label must not be empty".into()));
    }
    Ok(label.to_string())
}
