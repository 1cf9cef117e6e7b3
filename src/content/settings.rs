use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{ContentError, ContentResult, SETTINGS, clean_optional, decode_row, decode_single};
use crate::remote::{Access, Backend, Filter, Query};

pub const DEFAULT_SITE_TITLE: &str = "Platform APEX";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SiteSettings {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub site_title: Option<String>,
    #[serde(default)]
    pub timetable_url: Option<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            id: None,
            site_title: Some(DEFAULT_SITE_TITLE.to_string()),
            timetable_url: None,
        }
    }
}

impl SiteSettings {
    pub fn title(&self) -> &str {
        self.site_title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(DEFAULT_SITE_TITLE)
    }

    pub fn timetable(&self) -> Option<&str> {
        self.timetable_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    pub site_title: String,
    pub timetable_url: Option<String>,
}

impl SettingsInput {
    fn to_row(&self) -> ContentResult<serde_json::Value> {
        let title = self.site_title.trim();
        if title.is_empty() {
            return Err(ContentError::Invalid("title_missing"));
        }
        let timetable = clean_optional(self.timetable_url.as_deref());
        if let Some(url) = &timetable {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ContentError::Invalid("url_invalid"));
            }
        }
        Ok(json!({
            "site_title": title,
            "timetable_url": timetable,
        }))
    }
}

/// Reads the singleton settings row; a missing row yields the defaults.
pub async fn fetch_settings(backend: &dyn Backend) -> ContentResult<SiteSettings> {
    let query = Query::table(SETTINGS).limit(1);
    match backend.select(Access::Anonymous, &query).await {
        Ok(rows) => match rows.into_iter().next() {
            Some(row) => decode_row(row),
            None => Ok(SiteSettings::default()),
        },
        Err(err) if err.is_not_found() => Ok(SiteSettings::default()),
        Err(err) => Err(err.into()),
    }
}

/// Updates the existing settings row by id, or inserts the first one.
pub async fn save_settings(
    backend: &dyn Backend,
    token: &str,
    input: &SettingsInput,
) -> ContentResult<SiteSettings> {
    let row = input.to_row()?;
    let access = Access::User(token);
    let existing = fetch_settings(backend).await?;
    let rows = match existing.id {
        Some(id) => {
            backend
                .update(access, SETTINGS, &[Filter::eq("id", id.to_string())], row)
                .await?
        }
        None => backend.insert(access, SETTINGS, vec![row]).await?,
    };
    decode_single(rows, "settings")
}
