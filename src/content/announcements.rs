use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    ANNOUNCEMENTS, ContentError, ContentResult, Leftover, decode_rows, decode_single,
    models::Announcement,
};
use crate::remote::{Access, Backend, Filter, Query};

pub const ANNOUNCEMENT_PREFIX: &str = "announcements";
pub const ANNOUNCEMENT_TITLE: &str = "Annonce";
/// Body stored for audio-only announcements.
pub const VOICE_NOTE_CONTENT: &str = "Note vocale";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementMode {
    Text,
    Audio,
}

impl AnnouncementMode {
    /// Unknown values fall back to text.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("audio") => AnnouncementMode::Audio,
            _ => AnnouncementMode::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementMode::Text => "text",
            AnnouncementMode::Audio => "audio",
        }
    }
}

/// A file attached to an announcement.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    fn has_media_type(&self, top_level: &str) -> bool {
        self.content_type
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_().as_str() == top_level)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct AnnouncementDraft {
    pub level_id: Option<Uuid>,
    pub mode: AnnouncementMode,
    pub content: String,
    pub audio: Option<Attachment>,
    pub image: Option<Attachment>,
}

impl AnnouncementDraft {
    /// Checks the draft without touching storage.
    pub fn validate(&self) -> ContentResult<Uuid> {
        let Some(level_id) = self.level_id else {
            return Err(ContentError::Invalid("level_missing"));
        };
        match self.mode {
            AnnouncementMode::Text if self.content.trim().is_empty() => {
                return Err(ContentError::Invalid("content_missing"));
            }
            AnnouncementMode::Audio => match &self.audio {
                None => return Err(ContentError::Invalid("audio_missing")),
                Some(audio) if !audio.has_media_type("audio") => {
                    return Err(ContentError::Invalid("audio_invalid"));
                }
                Some(_) => {}
            },
            AnnouncementMode::Text => {}
        }
        if let Some(image) = &self.image {
            if !image.has_media_type("image") {
                return Err(ContentError::Invalid("image_invalid"));
            }
        }
        Ok(level_id)
    }
}

pub fn audio_object_path(now: DateTime<Utc>) -> String {
    format!("{ANNOUNCEMENT_PREFIX}/ann-{}.webm", now.timestamp_millis())
}

pub fn image_object_path(now: DateTime<Utc>, file_name: &str) -> String {
    let cleaned = sanitize_filename::sanitize(file_name).replace(' ', "_");
    let cleaned = if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    };
    format!("{ANNOUNCEMENT_PREFIX}/img-{}-{cleaned}", now.timestamp_millis())
}

pub async fn fetch_announcements(
    backend: &dyn Backend,
    access: Access<'_>,
    level_id: Uuid,
) -> ContentResult<Vec<Announcement>> {
    let query = Query::table(ANNOUNCEMENTS)
        .eq("level_id", level_id.to_string())
        .order_desc("created_at");
    decode_rows(backend.select(access, &query).await?)
}

/// Uploads the attachments, then inserts the announcement row.
///
/// Objects already uploaded are removed if a later step fails.
pub async fn publish_announcement(
    backend: &dyn Backend,
    token: &str,
    draft: AnnouncementDraft,
    now: DateTime<Utc>,
) -> ContentResult<Announcement> {
    let level_id = draft.validate()?;
    let access = Access::User(token);
    let mut uploaded: Vec<String> = Vec::new();

    let audio_url = match (draft.mode, draft.audio) {
        (AnnouncementMode::Audio, Some(audio)) => {
            let path = audio_object_path(now);
            backend
                .upload(access, &path, audio.bytes, &audio.content_type)
                .await?;
            let url = backend.public_url(&path);
            uploaded.push(path);
            Some(url)
        }
        _ => None,
    };

    let image_url = match draft.image {
        Some(image) => {
            let path = image_object_path(now, &image.file_name);
            if let Err(err) = backend
                .upload(access, &path, image.bytes, &image.content_type)
                .await
            {
                return Err(discard_uploads(backend, access, &uploaded, err, "image upload").await);
            }
            let url = backend.public_url(&path);
            uploaded.push(path);
            Some(url)
        }
        None => None,
    };

    let content = match draft.mode {
        AnnouncementMode::Text => draft.content.trim().to_string(),
        AnnouncementMode::Audio => VOICE_NOTE_CONTENT.to_string(),
    };
    let row = json!({
        "level_id": level_id.to_string(),
        "title": ANNOUNCEMENT_TITLE,
        "content": content,
        "audio_url": audio_url,
        "image_url": image_url,
    });

    match backend.insert(access, ANNOUNCEMENTS, vec![row]).await {
        Ok(rows) => {
            info!(%level_id, mode = draft.mode.as_str(), "announcement published");
            decode_single(rows, "announcement")
        }
        Err(err) => {
            Err(discard_uploads(backend, access, &uploaded, err, "announcement record").await)
        }
    }
}

async fn discard_uploads(
    backend: &dyn Backend,
    access: Access<'_>,
    uploaded: &[String],
    err: crate::remote::ServiceError,
    step: &'static str,
) -> ContentError {
    warn!(?err, step, "announcement publish failed");
    if uploaded.is_empty() {
        return ContentError::Service(err);
    }
    match backend.remove(access, uploaded).await {
        Ok(()) => ContentError::Service(err),
        Err(cleanup_err) => {
            error!(?cleanup_err, ?uploaded, "announcement attachments left in storage");
            ContentError::Partial {
                step,
                leftover: Leftover::StoredObjects,
                source: err,
            }
        }
    }
}

/// Deletes the row, then its attachments. Attachment removal is best effort.
pub async fn delete_announcement(
    backend: &dyn Backend,
    token: &str,
    id: Uuid,
) -> ContentResult<()> {
    let access = Access::User(token);
    let query = Query::table(ANNOUNCEMENTS).eq("id", id.to_string()).limit(1);
    let announcement: Announcement =
        decode_single(backend.select(access, &query).await?, "announcement")?;

    let deleted = backend
        .delete(access, ANNOUNCEMENTS, &[Filter::eq("id", id.to_string())])
        .await?;
    if deleted == 0 {
        return Err(ContentError::NotFound("announcement"));
    }

    let paths: Vec<String> = [announcement.audio_url, announcement.image_url]
        .into_iter()
        .flatten()
        .filter_map(|url| backend.object_path(&url))
        .collect();
    if !paths.is_empty() {
        if let Err(err) = backend.remove(access, &paths).await {
            warn!(?err, ?paths, "announcement attachments could not be removed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::content::levels::{LevelInput, save_level};
    use crate::content::test_support::backend_with_admin;

    async fn level_id(backend: &dyn Backend, token: &str) -> Uuid {
        save_level(
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
        .unwrap()
        .id
    }

    fn audio() -> Attachment {
        Attachment {
            file_name: "note.webm".into(),
            content_type: "audio/webm".into(),
            bytes: vec![1, 2, 3],
        }
    }

    fn image(name: &str) -> Attachment {
        Attachment {
            file_name: name.into(),
            content_type: "image/png".into(),
            bytes: vec![9, 9],
        }
    }

    fn text_draft(level_id: Uuid, content: &str) -> AnnouncementDraft {
        AnnouncementDraft {
            level_id: Some(level_id),
            mode: AnnouncementMode::Text,
            content: content.into(),
            audio: None,
            image: None,
        }
    }

    #[test]
    fn object_paths_use_millisecond_timestamps() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(audio_object_path(now), "announcements/ann-1700000000123.webm");
        assert_eq!(
            image_object_path(now, "photo de classe.png"),
            "announcements/img-1700000000123-photo_de_classe.png"
        );
    }

    #[test]
    fn validation_rules() {
        let id = Uuid::new_v4();
        assert_eq!(
            text_draft(id, "   ").validate().unwrap_err().flash_code(),
            "content_missing"
        );

        let mut draft = text_draft(id, "");
        draft.mode = AnnouncementMode::Audio;
        assert_eq!(draft.validate().unwrap_err().flash_code(), "audio_missing");

        draft.audio = Some(Attachment {
            content_type: "video/mp4".into(),
            ..audio()
        });
        assert_eq!(draft.validate().unwrap_err().flash_code(), "audio_invalid");

        let mut draft = text_draft(id, "Bonjour");
        draft.image = Some(Attachment {
            content_type: "application/pdf".into(),
            ..image("x.pdf")
        });
        assert_eq!(draft.validate().unwrap_err().flash_code(), "image_invalid");

        let mut draft = text_draft(id, "Bonjour");
        draft.level_id = None;
        assert_eq!(draft.validate().unwrap_err().flash_code(), "level_missing");
    }

    #[test]
    fn unknown_mode_means_text() {
        assert_eq!(AnnouncementMode::parse(Some("audio")), AnnouncementMode::Audio);
        assert_eq!(AnnouncementMode::parse(Some("video")), AnnouncementMode::Text);
        assert_eq!(AnnouncementMode::parse(None), AnnouncementMode::Text);
    }

    #[tokio::test]
    async fn text_announcement_with_image() {
        let (backend, token) = backend_with_admin().await;
        let level_id = level_id(backend.as_ref(), &token).await;
        let mut draft = text_draft(level_id, "  Examen lundi  ");
        draft.image = Some(image("affiche.png"));

        let announcement = publish_announcement(backend.as_ref(), &token, draft, Utc::now())
            .await
            .unwrap();
        assert_eq!(announcement.title.as_deref(), Some("Annonce"));
        assert_eq!(announcement.content.as_deref(), Some("Examen lundi"));
        assert!(announcement.audio_url.is_none());
        assert!(announcement.image_url.is_some());
        assert_eq!(backend.object_paths().await.len(), 1);
    }

    #[tokio::test]
    async fn audio_announcement_stores_voice_note() {
        let (backend, token) = backend_with_admin().await;
        let level_id = level_id(backend.as_ref(), &token).await;
        let draft = AnnouncementDraft {
            level_id: Some(level_id),
            mode: AnnouncementMode::Audio,
            content: "ignored".into(),
            audio: Some(audio()),
            image: None,
        };

        let announcement = publish_announcement(backend.as_ref(), &token, draft, Utc::now())
            .await
            .unwrap();
        assert_eq!(announcement.content.as_deref(), Some(VOICE_NOTE_CONTENT));
        let audio_url = announcement.audio_url.unwrap();
        assert!(audio_url.ends_with(".webm"));
        assert!(audio_url.contains("/announcements/ann-"));
    }

    #[tokio::test]
    async fn failed_insert_discards_uploaded_attachments() {
        let (backend, token) = backend_with_admin().await;
        let level_id = level_id(backend.as_ref(), &token).await;
        backend.fail_next_insert(ANNOUNCEMENTS).await;
        let draft = AnnouncementDraft {
            level_id: Some(level_id),
            mode: AnnouncementMode::Audio,
            content: String::new(),
            audio: Some(audio()),
            image: Some(image("a.png")),
        };

        let err = publish_announcement(backend.as_ref(), &token, draft, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Service(_)));
        assert!(backend.object_paths().await.is_empty());
        assert!(backend.rows(ANNOUNCEMENTS).await.is_empty());
    }

    #[tokio::test]
    async fn announcements_list_newest_first_and_delete_cleans_storage() {
        let (backend, token) = backend_with_admin().await;
        let level_id = level_id(backend.as_ref(), &token).await;
        let mut with_image = text_draft(level_id, "premier");
        with_image.image = Some(image("p.png"));
        let first = publish_announcement(backend.as_ref(), &token, with_image, Utc::now())
            .await
            .unwrap();
        let second = publish_announcement(
            backend.as_ref(),
            &token,
            text_draft(level_id, "second"),
            Utc::now(),
        )
        .await
        .unwrap();

        let listed = fetch_announcements(backend.as_ref(), Access::Anonymous, level_id)
            .await
            .unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        delete_announcement(backend.as_ref(), &token, first.id)
            .await
            .unwrap();
        assert!(backend.object_paths().await.is_empty());
        assert_eq!(backend.rows(ANNOUNCEMENTS).await.len(), 1);
    }
}
