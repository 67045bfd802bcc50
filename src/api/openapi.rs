use utoipa::OpenApi;

use super::handlers::{content, health, ErrorBody};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        content::authenticate,
        content::category_access,
        content::post_access
    ),
    components(schemas(
        health::Health,
        content::PasswordForm,
        content::AccessStatus,
        ErrorBody
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "content", description = "Unlocking password protected categories and posts")
    )
)]
struct ApiDoc;

/// `OpenAPI` document for every served route.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
