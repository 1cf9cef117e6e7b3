use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    ContentError, ContentResult, FILES, Leftover, decode_rows, decode_single,
    models::{FileEntry, FileKind, extension_of},
};
use crate::remote::{Access, Backend, Filter, Query};

/// Folder under the bucket that holds course files.
pub const UPLOAD_PREFIX: &str = "uploads";

/// A course file received from the admin form, fully buffered.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub section_id: Option<Uuid>,
    pub title: String,
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Random object path that keeps the original extension.
pub fn upload_path(original_name: &str) -> String {
    match extension_of(original_name) {
        Some(ext) => format!("{UPLOAD_PREFIX}/{}.{ext}", Uuid::new_v4()),
        None => format!("{UPLOAD_PREFIX}/{}", Uuid::new_v4()),
    }
}

pub async fn fetch_files_for_section(
    backend: &dyn Backend,
    access: Access<'_>,
    section_id: Uuid,
) -> ContentResult<Vec<FileEntry>> {
    let query = Query::table(FILES)
        .eq("section_id", section_id.to_string())
        .order_desc("created_at");
    decode_rows(backend.select(access, &query).await?)
}

/// Stores the bytes, then records the file row.
///
/// If the row cannot be written the stored object is removed again so no
/// orphan is left behind.
pub async fn upload_file(
    backend: &dyn Backend,
    token: &str,
    upload: NewUpload,
) -> ContentResult<FileEntry> {
    let title = upload.title.trim().to_string();
    if title.is_empty() {
        return Err(ContentError::Invalid("title_missing"));
    }
    let Some(section_id) = upload.section_id else {
        return Err(ContentError::Invalid("section_missing"));
    };
    if upload.bytes.is_empty() {
        return Err(ContentError::Invalid("file_missing"));
    }

    let access = Access::User(token);
    let path = upload_path(&upload.original_name);
    let kind = FileKind::from_file_name(&upload.original_name);
    let size = upload.bytes.len();
    backend
        .upload(access, &path, upload.bytes, &upload.content_type)
        .await?;

    let row = json!({
        "section_id": section_id.to_string(),
        "title": title,
        "file_url": backend.public_url(&path),
        "file_type": kind.as_str(),
    });
    let inserted = match backend.insert(access, FILES, vec![row]).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(?err, %path, "file row insert failed; removing stored object");
            if let Err(cleanup_err) = backend.remove(access, std::slice::from_ref(&path)).await {
                error!(?cleanup_err, %path, "stored object could not be removed");
                return Err(ContentError::Partial {
                    step: "file record",
                    leftover: Leftover::StoredObjects,
                    source: err,
                });
            }
            return Err(ContentError::Service(err));
        }
    };

    info!(%path, size, kind = kind.as_str(), "file uploaded");
    decode_single(inserted, "file")
}

/// Removes the stored object, then the row.
///
/// Storage failures are logged and do not block the row deletion.
pub async fn delete_file(backend: &dyn Backend, token: &str, id: Uuid) -> ContentResult<()> {
    let access = Access::User(token);
    let query = Query::table(FILES).eq("id", id.to_string()).limit(1);
    let file: FileEntry = decode_single(backend.select(access, &query).await?, "file")?;

    match backend.object_path(&file.file_url) {
        Some(path) => {
            if let Err(err) = backend.remove(access, &[path.clone()]).await {
                warn!(?err, %path, "stored object removal failed");
            }
        }
        None => warn!(url = %file.file_url, "file url does not point into the bucket"),
    }

    let deleted = backend
        .delete(access, FILES, &[Filter::eq("id", id.to_string())])
        .await?;
    if deleted == 0 {
        return Err(ContentError::NotFound("file"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::groups::{GroupInput, save_group};
    use crate::content::levels::{LevelInput, save_level};
    use crate::content::modules::{ModuleInput, create_module, fetch_sections};
    use crate::content::test_support::backend_with_admin;
    use crate::remote::StorageApi;
    use crate::content::models::Section;

    async fn first_section(backend: &dyn Backend, token: &str) -> Section {
        let level = save_level(
            backend,
            token,
            None,
            &LevelInput {
                name: "L".into(),
                description: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
        let group = save_group(
            backend,
            token,
            None,
            &GroupInput {
                name: "G".into(),
                level_id: Some(level.id),
                description: None,
            },
        )
        .await
        .unwrap();
        let module = create_module(
            backend,
            token,
            &ModuleInput {
                name: "M".into(),
                description: None,
                group_id: Some(group.id),
            },
        )
        .await
        .unwrap();
        fetch_sections(backend, Access::Anonymous, module.id)
            .await
            .unwrap()
            .remove(0)
    }

    fn upload(section_id: Uuid, name: &str) -> NewUpload {
        NewUpload {
            section_id: Some(section_id),
            title: "Chapitre 1".into(),
            original_name: name.into(),
            content_type: "application/pdf".into(),
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    #[test]
    fn upload_path_keeps_extension() {
        let path = upload_path("Cours Final.PDF");
        assert!(path.starts_with("uploads/"));
        assert!(path.ends_with(".pdf"));
        assert!(!upload_path("README").contains('.'));
    }

    #[tokio::test]
    async fn upload_records_public_url_and_kind() {
        let (backend, token) = backend_with_admin().await;
        let section = first_section(backend.as_ref(), &token).await;

        let file = upload_file(backend.as_ref(), &token, upload(section.id, "cours.pdf"))
            .await
            .unwrap();
        assert_eq!(file.file_type, FileKind::Pdf);
        let path = backend.object_path(&file.file_url).unwrap();
        assert_eq!(backend.object_paths().await, vec![path]);
    }

    #[tokio::test]
    async fn failed_row_insert_removes_stored_object() {
        let (backend, token) = backend_with_admin().await;
        let section = first_section(backend.as_ref(), &token).await;
        backend.fail_next_insert(FILES).await;

        let err = upload_file(backend.as_ref(), &token, upload(section.id, "tp.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Service(_)));
        assert!(backend.object_paths().await.is_empty());
        assert!(backend.rows(FILES).await.is_empty());
    }

    #[tokio::test]
    async fn failed_cleanup_reports_leftover_object() {
        let (backend, token) = backend_with_admin().await;
        let section = first_section(backend.as_ref(), &token).await;
        backend.fail_next_insert(FILES).await;
        backend.fail_next_remove().await;

        let err = upload_file(backend.as_ref(), &token, upload(section.id, "tp.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Partial {
                leftover: Leftover::StoredObjects,
                ..
            }
        ));
        assert_eq!(err.flash_code(), "partial_storage");
        assert_eq!(backend.object_paths().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_title_uploads_nothing() {
        let (backend, token) = backend_with_admin().await;
        let section = first_section(backend.as_ref(), &token).await;
        let mut request = upload(section.id, "a.pdf");
        request.title = "  ".into();

        let err = upload_file(backend.as_ref(), &token, request).await.unwrap_err();
        assert_eq!(err.flash_code(), "title_missing");
        assert!(backend.object_paths().await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_object_and_row() {
        let (backend, token) = backend_with_admin().await;
        let section = first_section(backend.as_ref(), &token).await;
        let file = upload_file(backend.as_ref(), &token, upload(section.id, "video.mp4"))
            .await
            .unwrap();
        assert_eq!(file.file_type, FileKind::Video);

        delete_file(backend.as_ref(), &token, file.id).await.unwrap();
        assert!(backend.object_paths().await.is_empty());
        assert!(backend.rows(FILES).await.is_empty());
    }

    #[tokio::test]
    async fn files_list_newest_first() {
        let (backend, token) = backend_with_admin().await;
        let section = first_section(backend.as_ref(), &token).await;
        let first = upload_file(backend.as_ref(), &token, upload(section.id, "1.pdf"))
            .await
            .unwrap();
        let second = upload_file(backend.as_ref(), &token, upload(section.id, "2.pdf"))
            .await
            .unwrap();

        let ids: Vec<Uuid> = fetch_files_for_section(backend.as_ref(), Access::Anonymous, section.id)
            .await
            .unwrap()
            .into_iter()
            .map(|file| file.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
