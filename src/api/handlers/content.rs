//! Unlock endpoints for protected categories and posts.

use axum::{
    extract::{Extension, Form, Path, Query},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{
    cookie::{authentication_cookie, extract_token},
    error_response, ErrorBody,
};
use crate::{
    access,
    api::AccessState,
    store::{Category, CategoryKind, Post, PostStatus},
};

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct PasswordForm {
    #[serde(default)]
    pub password: String,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct PasswordQuery {
    /// Password for an intimate category that is not unlocked yet.
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AccessStatus {
    pub authenticated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Category,
    Post,
}

impl ContentKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "category" => Some(Self::Category),
            "post" => Some(Self::Post),
            _ => None,
        }
    }

    /// Public page the visitor lands on after a successful unlock.
    fn location(self, slug: &str) -> String {
        match self {
            Self::Category => format!("/categories/{slug}"),
            Self::Post => format!("/archives/{slug}"),
        }
    }
}

async fn find_category(state: &AccessState, slug: &str) -> Result<Category, Response> {
    match state.categories().get_by_slug(slug).await {
        Ok(Some(category)) => Ok(category),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("category {slug} not found"),
        )),
        Err(err) => Err(access::Error::from(err).into_response()),
    }
}

async fn find_post(state: &AccessState, slug: &str) -> Result<Post, Response> {
    match state.posts().get_by_slug(slug).await {
        Ok(Some(post)) => Ok(post),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("post {slug} not found"),
        )),
        Err(err) => Err(access::Error::from(err).into_response()),
    }
}

fn set_token_cookie(
    headers: &mut HeaderMap,
    state: &AccessState,
    token: Option<String>,
) -> Result<(), Response> {
    let Some(token) = token else {
        return Ok(());
    };
    match authentication_cookie(state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
            Ok(())
        }
        Err(err) => {
            error!("Failed to build authentication cookie: {err}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to issue cookie",
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/content/{kind}/{slug}/authentication",
    params(
        ("kind" = String, Path, description = "`category` or `post`"),
        ("slug" = String, Path, description = "Slug of the protected content")
    ),
    request_body(content = PasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Unlocked, redirects to the content page"),
        (status = 400, description = "Empty password or unknown content type", body = ErrorBody),
        (status = 401, description = "Incorrect password", body = ErrorBody),
        (status = 404, description = "Content not found", body = ErrorBody),
        (status = 500, description = "Token could not be issued", body = ErrorBody)
    ),
    tag = "content"
)]
#[instrument(skip(headers, state, form))]
pub async fn authenticate(
    Path((kind, slug)): Path<(String, String)>,
    headers: HeaderMap,
    state: Extension<Arc<AccessState>>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let Some(kind) = ContentKind::parse(&kind) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("unknown content type: {kind}"),
        );
    };

    if form.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "password is required");
    }

    let token = extract_token(&headers);

    let result = match kind {
        ContentKind::Category => match find_category(&state, &slug).await {
            Ok(category) => {
                state
                    .category_auth()
                    .authenticate(&token, category.id, &form.password)
                    .await
            }
            Err(response) => return response,
        },
        ContentKind::Post => match find_post(&state, &slug).await {
            Ok(post) => {
                state
                    .post_auth()
                    .authenticate(&token, post.id, &form.password)
                    .await
            }
            Err(response) => return response,
        },
    };

    let issued = match result {
        Ok(issued) => issued,
        Err(err) => return err.into_response(),
    };

    let mut response_headers = HeaderMap::new();
    if let Err(response) = set_token_cookie(&mut response_headers, &state, issued) {
        return response;
    }

    match HeaderValue::from_str(&kind.location(&slug)) {
        Ok(location) => {
            response_headers.insert(LOCATION, location);
        }
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid slug"),
    }

    (StatusCode::FOUND, response_headers).into_response()
}

#[utoipa::path(
    get,
    path = "/api/content/categories/{slug}/access",
    params(
        ("slug" = String, Path, description = "Category slug"),
        PasswordQuery
    ),
    responses(
        (status = 200, description = "Category is readable", body = AccessStatus),
        (status = 401, description = "Incorrect password", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody)
    ),
    tag = "content"
)]
#[instrument(skip(query, headers, state))]
pub async fn category_access(
    Path(slug): Path<String>,
    Query(query): Query<PasswordQuery>,
    headers: HeaderMap,
    state: Extension<Arc<AccessState>>,
) -> Response {
    let category = match find_category(&state, &slug).await {
        Ok(category) => category,
        Err(response) => return response,
    };

    let mut response_headers = HeaderMap::new();

    if category.kind == CategoryKind::Intimate {
        let token = extract_token(&headers);
        let auth = state.category_auth();

        let unlocked = match auth.is_authenticated(&token, category.id).await {
            Ok(unlocked) => unlocked,
            Err(err) => return err.into_response(),
        };

        if !unlocked {
            let issued = match auth
                .authenticate(&token, category.id, &query.password)
                .await
            {
                Ok(issued) => issued,
                Err(err) => return err.into_response(),
            };
            if let Err(response) = set_token_cookie(&mut response_headers, &state, issued) {
                return response;
            }
        }
    }

    (
        response_headers,
        Json(AccessStatus {
            authenticated: true,
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/content/posts/{slug}/access",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Whether the post is readable", body = AccessStatus),
        (status = 404, description = "Post not found", body = ErrorBody)
    ),
    tag = "content"
)]
#[instrument(skip(headers, state))]
pub async fn post_access(
    Path(slug): Path<String>,
    headers: HeaderMap,
    state: Extension<Arc<AccessState>>,
) -> Response {
    let post = match find_post(&state, &slug).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let authenticated = if post.status == PostStatus::Intimate {
        let token = extract_token(&headers);
        match state.post_auth().is_authenticated(&token, post.id).await {
            Ok(authenticated) => authenticated,
            Err(err) => return err.into_response(),
        }
    } else {
        true
    };

    Json(AccessStatus { authenticated }).into_response()
}
