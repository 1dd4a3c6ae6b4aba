//! Self-registration with a moderation document upload.

use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;

use crate::error::{AppError, LifecycleError, ValidationError};
use crate::lifecycle::{AccountLifecycle, NewRegistration, MAX_DOCUMENT_SIZE};

const MAX_TEXT_FIELD_SIZE: usize = 1024;

/// POST /register
///
/// Multipart form: `name`, `email`, `password` text fields plus a `document`
/// file part carrying the identity document. The account is created in
/// pending status and cannot log in until approved.
///
/// # Errors
/// - 400: invalid fields, disallowed document type, oversized document
/// - 409: email already registered
pub async fn register(
    mut payload: Multipart,
    lifecycle: web::Data<AccountLifecycle>,
) -> Result<HttpResponse, AppError> {
    let mut name = None;
    let mut email = None;
    let mut password = None;
    let mut document_content_type = None;
    let mut document = None;

    while let Some(field) = payload.try_next().await.map_err(multipart_error)? {
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        match field_name.as_str() {
            "name" => name = Some(read_text(field, "name").await?),
            "email" => email = Some(read_text(field, "email").await?),
            "password" => password = Some(read_text(field, "password").await?),
            "document" => {
                document_content_type = field.content_type().map(|mime| mime.to_string());
                document = Some(read_document(field).await?);
            }
            _ => drain(field).await?,
        }
    }

    let registration = NewRegistration {
        name: name.ok_or(ValidationError::EmptyField("name"))?,
        email: email.ok_or(ValidationError::EmptyField("email"))?,
        password: password.ok_or(ValidationError::EmptyField("password"))?,
        document_content_type: document_content_type.ok_or_else(|| {
            LifecycleError::InvalidDocument("document is missing a content type".to_string())
        })?,
        document: document.ok_or_else(|| {
            LifecycleError::InvalidDocument("document file is required".to_string())
        })?,
    };

    let account = lifecycle.register(registration).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Registration submitted. Your account is under review.",
        "user_id": account.id.to_string(),
        "status": "pending",
    })))
}

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::Validation(ValidationError::InvalidFormat(format!(
        "malformed multipart payload: {}",
        err
    )))
}

async fn read_text(mut field: Field, field_name: &'static str) -> Result<String, AppError> {
    let mut data = Vec::new();

    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > MAX_TEXT_FIELD_SIZE {
            return Err(ValidationError::TooLong(field_name, MAX_TEXT_FIELD_SIZE).into());
        }
        data.extend_from_slice(&chunk);
    }

    String::from_utf8(data).map_err(|_| {
        AppError::Validation(ValidationError::InvalidFormat(format!(
            "{} is not valid UTF-8",
            field_name
        )))
    })
}

/// Reads the document part, cutting the stream off as soon as it exceeds the
/// size cap rather than buffering an arbitrarily large body.
async fn read_document(mut field: Field) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();

    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > MAX_DOCUMENT_SIZE {
            return Err(LifecycleError::InvalidDocument(
                "File too large. Maximum size: 5 MiB".to_string(),
            )
            .into());
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}

async fn drain(mut field: Field) -> Result<(), AppError> {
    while field
        .try_next()
        .await
        .map_err(multipart_error)?
        .is_some()
    {}
    Ok(())
}
