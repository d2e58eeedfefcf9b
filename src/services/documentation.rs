use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Party Rooms Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::leave_room,
        crate::routes::rooms::set_ready,
        crate::routes::rooms::list_players,
        crate::routes::blindtest::get_playlist,
        crate::routes::blindtest::set_playlist,
        crate::routes::blindtest::start,
        crate::routes::blindtest::state_for_user,
        crate::routes::blindtest::guess,
        crate::routes::petitbac::list_categories,
        crate::routes::petitbac::add_category,
        crate::routes::petitbac::rename_category,
        crate::routes::petitbac::delete_category,
        crate::routes::petitbac::start,
        crate::routes::petitbac::state_for_user,
        crate::routes::petitbac::submit_answers,
        crate::routes::petitbac::submit_votes,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::ReadyRequest,
            crate::dto::room::RoomSummary,
            crate::dto::room::PlayerSummary,
            crate::dto::room::ActionResponse,
            crate::dto::blindtest::PlaylistRequest,
            crate::dto::blindtest::PlaylistResponse,
            crate::dto::blindtest::GuessRequest,
            crate::dto::blindtest::GuessResponse,
            crate::dto::blindtest::BlindTestStateResponse,
            crate::dto::blindtest::GameStartedResponse,
            crate::dto::petitbac::CategoryRequest,
            crate::dto::petitbac::CategorySummary,
            crate::dto::petitbac::SubmitAnswersRequest,
            crate::dto::petitbac::SubmitVotesRequest,
            crate::dto::petitbac::PetitBacStateResponse,
            crate::dto::phase::VisibleBlindTestPhase,
            crate::dto::phase::VisiblePetitBacPhase,
            crate::dao::models::RoomType,
            crate::dao::models::RoomStatus,
        )
    ),
    modifiers(&UserIdHeader),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle, membership and live viewer socket"),
        (name = "blindtest", description = "Blind-test configuration and gameplay"),
        (name = "petitbac", description = "Petit-bac configuration and gameplay"),
    )
)]
pub struct ApiDoc;

/// Documents the caller identity header as an API key scheme.
struct UserIdHeader;

impl utoipa::Modify for UserIdHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "user_id",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                crate::routes::identity::USER_ID_HEADER,
            ))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_room_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/healthcheck",
            "/rooms",
            "/rooms/{code}/join",
            "/rooms/{code}/blindtest/guess",
            "/rooms/{code}/petitbac/categories/{id}",
            "/ws/rooms/{code}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
