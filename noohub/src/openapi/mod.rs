//! OpenAPI documentation for the registry API, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Registers the `Authorization` header scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Authorization",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Either a key token issued by `POST /users/{username}/keys` or the master credential. \
                     An optional `Bearer ` prefix is accepted.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "noohub", description = "Registry of versioned project specs"),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::users::get_user,
        api::handlers::users::create_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::keys::create_key,
        api::handlers::keys::list_keys,
        api::handlers::keys::get_key,
        api::handlers::keys::update_key,
        api::handlers::keys::delete_key,
        api::handlers::projects::get_project,
        api::handlers::projects::create_project,
    ),
    components(schemas(
        api::models::users::UserCreate,
        api::models::users::UserUpdate,
        api::models::users::UserResponse,
        api::models::keys::KeyCreate,
        api::models::keys::KeyUpdate,
        api::models::keys::KeyResponse,
        api::models::keys::KeyWithToken,
        api::models::keys::KeyList,
        api::models::projects::ProjectResponse,
    )),
    tags(
        (name = "users", description = "User accounts (master credential)"),
        (name = "keys", description = "Key issuance and management (master credential)"),
        (name = "projects", description = "Published project versions"),
    )
)]
pub struct ApiDoc;
