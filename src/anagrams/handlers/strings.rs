use crate::anagram::flag_text;
use crate::anagrams::{error::AppError, AppState};
use axum::extract::{rejection::FormRejection, Form, State};
use serde::Deserialize;
use utoipa::ToSchema;

/// Form posted by the protected page.
#[derive(ToSchema, Deserialize, Debug)]
pub struct StringPair {
    #[serde(rename = "First String")]
    pub first: String,
    #[serde(rename = "Second String")]
    pub second: String,
}

#[utoipa::path(
    post,
    path= "/AddStrings",
    request_body(content = StringPair, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "`True` when the strings are anagrams, `False` otherwise", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or malformed form fields, or a NUL character"),
        (status = 500, description = "Store unavailable")
    ),
    tag = "anagrams",
)]
/// Compare two strings, reusing a stored result when the pair was seen before.
///
/// # Errors
/// Returns 400 for a bad form or a NUL character, and 500 when the store fails.
pub async fn add_strings(
    State(state): State<AppState>,
    form: Result<Form<StringPair>, FormRejection>,
) -> Result<&'static str, AppError> {
    let Form(pair) = form.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    // Postgres text cannot hold NUL
    if pair.first.contains('\0') || pair.second.contains('\0') {
        return Err(AppError::BadRequest(
            "form fields must not contain NUL characters".to_string(),
        ));
    }

    let result = state
        .anagrams
        .check_or_compute(&pair.first, &pair.second)
        .await?;

    Ok(flag_text(result))
}
