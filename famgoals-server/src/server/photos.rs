use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use famgoals_shared::api;
use famgoals_shared::domain::PhotoKind;
use tracing::{info, warn};

use super::auth::AuthCtx;
use super::blob::image_extension;
use super::extract::ApiQuery;
use super::{AppError, AppState, rfc3339};
use crate::storage::misc::{PhotoFilter, PhotoRecord};
use crate::storage::models::Photo;

fn photo_dto(p: Photo) -> Result<api::PhotoDto, AppError> {
    Ok(api::PhotoDto {
        kind: p.kind.parse().map_err(AppError::internal)?,
        created_at: rfc3339(p.created_at),
        id: p.id,
        family_id: p.family_id,
        member_id: p.member_id,
        goal_id: p.goal_id,
        url: p.url,
        original_name: p.original_name,
        caption: p.caption,
    })
}

pub async fn list_photos(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::PhotosQuery>,
) -> Result<Json<Vec<api::PhotoDto>>, AppError> {
    let filter = PhotoFilter {
        member_id: q.member_id.filter(|m| !m.is_empty()),
        goal_id: q.goal_id.filter(|g| !g.is_empty()),
        kind: q.kind,
    };
    let rows = state.store.list_photos(auth.family_id(), filter).await?;
    let items = rows
        .into_iter()
        .map(photo_dto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

struct UploadFile {
    name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadFile>,
    kind: Option<String>,
    member_id: Option<String>,
    goal_id: Option<String>,
    caption: Option<String>,
}

async fn read_form(mut multipart: Multipart, limit: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            if bytes.len() > limit {
                return Err(AppError::bad_request(format!(
                    "File too large, limit is {limit} bytes"
                )));
            }
            form.file = Some(UploadFile {
                name: file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }
        let text = field
            .text()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());
        match name.as_str() {
            "type" => form.kind = value,
            "memberId" => form.member_id = value,
            "goalId" => form.goal_id = value,
            "caption" => form.caption = value,
            _ => {}
        }
    }
    Ok(form)
}

/// Declared content type, falling back to a guess from the file name when
/// the client sent none or a generic one.
fn resolve_content_type(file: &UploadFile) -> Option<String> {
    match file.content_type.as_deref() {
        Some(ct) if ct != "application/octet-stream" => Some(ct.to_ascii_lowercase()),
        _ => file
            .name
            .as_deref()
            .and_then(|n| mime_guess::from_path(n).first())
            .map(|m| m.essence_str().to_string()),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    multipart: Multipart,
) -> Result<Json<api::UploadResp>, AppError> {
    let form = read_form(multipart, state.config.max_upload_bytes()).await?;
    let (Some(file), Some(kind)) = (form.file, form.kind) else {
        return Err(AppError::bad_request("File and type required"));
    };
    let kind: PhotoKind = kind
        .parse()
        .map_err(|e: famgoals_shared::domain::ParseEnumError| AppError::bad_request(e.to_string()))?;
    let extension = resolve_content_type(&file)
        .as_deref()
        .and_then(image_extension)
        .ok_or_else(|| {
            AppError::bad_request("Invalid file type. Only JPEG, PNG, GIF, and WebP are allowed.")
        })?;

    let member = match form.member_id.as_deref() {
        Some(m) => Some(state.member_in_family(&auth, m).await?),
        None => None,
    };
    let goal = match form.goal_id.as_deref() {
        Some(g) => Some(state.goal_in_family(&auth, g).await?),
        None => None,
    };

    let key = state
        .blobs
        .put(auth.family_id(), extension, &file.bytes)
        .await?;
    let url = format!("{}/uploads/{key}", state.config.public_base_url());
    let inserted = state
        .store
        .insert_photo(PhotoRecord {
            family_id: auth.family_id().to_string(),
            member_id: member.as_ref().map(|m| m.id.clone()),
            goal_id: goal.map(|g| g.id),
            kind,
            url: url.clone(),
            original_name: file.name,
            caption: form.caption,
        })
        .await;
    let photo = match inserted {
        Ok(p) => p,
        Err(e) => {
            if let Err(rm) = state.blobs.remove(&key).await {
                warn!(error=%rm, %key, "upload: could not remove orphaned file");
            }
            return Err(e.into());
        }
    };

    if kind == PhotoKind::Profile
        && let Some(m) = &member
    {
        state
            .store
            .set_member_photo(auth.family_id(), &m.id, &url)
            .await?;
    }
    info!(photo_id=%photo.id, %kind, bytes = file.bytes.len(), "upload: stored");
    Ok(Json(api::UploadResp {
        url,
        photo_id: photo.id,
    }))
}
