use serde_json::json;
use uuid::Uuid;

use super::{
    ContentError, ContentResult, GROUPS, LEVELS, clean_optional, decode_rows, decode_single,
    models::{Group, Level},
};
use crate::remote::{Access, Backend, Filter, Query};

#[derive(Debug, Clone)]
pub struct LevelWithGroupCount {
    pub level: Level,
    pub group_count: usize,
}

/// Form payload for creating or editing a level.
#[derive(Debug, Clone, Default)]
pub struct LevelInput {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl LevelInput {
    fn to_row(&self) -> ContentResult<serde_json::Value> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContentError::Invalid("name_missing"));
        }
        Ok(json!({
            "name": name,
            "description": clean_optional(self.description.as_deref()),
            "is_active": self.is_active,
        }))
    }
}

/// Levels shown on the public home page, alphabetical.
pub async fn fetch_active_levels(backend: &dyn Backend) -> ContentResult<Vec<Level>> {
    let query = Query::table(LEVELS).eq("is_active", true).order_asc("name");
    decode_rows(backend.select(Access::Anonymous, &query).await?)
}

pub async fn fetch_levels_by_name(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<Vec<Level>> {
    let query = Query::table(LEVELS).order_asc("name");
    decode_rows(backend.select(access, &query).await?)
}

/// Active levels only, used by the group form's level picker.
pub async fn fetch_active_levels_for(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<Vec<Level>> {
    let query = Query::table(LEVELS).eq("is_active", true).order_asc("name");
    decode_rows(backend.select(access, &query).await?)
}

/// Admin listing: newest first, each with the number of groups under it.
pub async fn fetch_levels_with_group_counts(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<Vec<LevelWithGroupCount>> {
    let levels_query = Query::table(LEVELS).order_desc("created_at");
    let groups_query = Query::table(GROUPS);
    let (levels, groups) = tokio::try_join!(
        backend.select(access, &levels_query),
        backend.select(access, &groups_query),
    )?;
    let levels: Vec<Level> = decode_rows(levels)?;
    let groups: Vec<Group> = decode_rows(groups)?;

    Ok(levels
        .into_iter()
        .map(|level| {
            let group_count = groups.iter().filter(|group| group.level_id == level.id).count();
            LevelWithGroupCount { level, group_count }
        })
        .collect())
}

pub async fn fetch_level(
    backend: &dyn Backend,
    access: Access<'_>,
    id: Uuid,
) -> ContentResult<Level> {
    let query = Query::table(LEVELS).eq("id", id.to_string()).limit(1);
    decode_single(backend.select(access, &query).await?, "level")
}

/// Creates a level, or updates `existing` when given.
pub async fn save_level(
    backend: &dyn Backend,
    token: &str,
    existing: Option<Uuid>,
    input: &LevelInput,
) -> ContentResult<Level> {
    let row = input.to_row()?;
    let access = Access::User(token);
    let rows = match existing {
        Some(id) => {
            backend
                .update(access, LEVELS, &[Filter::eq("id", id.to_string())], row)
                .await?
        }
        None => backend.insert(access, LEVELS, vec![row]).await?,
    };
    decode_single(rows, "level")
}

/// Deletes a level; the store cascades to its groups and announcements.
pub async fn delete_level(backend: &dyn Backend, token: &str, id: Uuid) -> ContentResult<()> {
    let deleted = backend
        .delete(Access::User(token), LEVELS, &[Filter::eq("id", id.to_string())])
        .await?;
    if deleted == 0 {
        return Err(ContentError::NotFound("level"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::test_support::backend_with_admin;
    use crate::remote::TableApi;

    fn input(name: &str, active: bool) -> LevelInput {
        LevelInput {
            name: name.to_string(),
            description: Some("  ".to_string()),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn home_lists_only_active_levels_by_name() {
        let (backend, token) = backend_with_admin().await;
        save_level(backend.as_ref(), &token, None, &input("Terminale", true))
            .await
            .unwrap();
        save_level(backend.as_ref(), &token, None, &input("Archive", false))
            .await
            .unwrap();
        save_level(backend.as_ref(), &token, None, &input("Seconde", true))
            .await
            .unwrap();

        let names: Vec<String> = fetch_active_levels(backend.as_ref())
            .await
            .unwrap()
            .into_iter()
            .map(|level| level.name)
            .collect();
        assert_eq!(names, ["Seconde", "Terminale"]);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_any_write() {
        let (backend, token) = backend_with_admin().await;
        let err = save_level(backend.as_ref(), &token, None, &input("   ", true))
            .await
            .unwrap_err();
        assert_eq!(err.flash_code(), "name_missing");
        assert!(backend.rows(LEVELS).await.is_empty());
    }

    #[tokio::test]
    async fn edit_keeps_id_and_clears_blank_description() {
        let (backend, token) = backend_with_admin().await;
        let created = save_level(
            backend.as_ref(),
            &token,
            None,
            &LevelInput {
                name: "L1".into(),
                description: Some("first".into()),
                is_active: true,
            },
        )
        .await
        .unwrap();
        let updated = save_level(
            backend.as_ref(),
            &token,
            Some(created.id),
            &input("L1 bis", false),
        )
        .await
        .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.description, None);
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn group_counts_follow_each_level() {
        let (backend, token) = backend_with_admin().await;
        let first = save_level(backend.as_ref(), &token, None, &input("A", true))
            .await
            .unwrap();
        save_level(backend.as_ref(), &token, None, &input("B", true))
            .await
            .unwrap();
        for name in ["G1", "G2"] {
            backend
                .insert(
                    Access::User(&token),
                    GROUPS,
                    vec![json!({"name": name, "level_id": first.id.to_string()})],
                )
                .await
                .unwrap();
        }

        let listing = fetch_levels_with_group_counts(backend.as_ref(), Access::User(&token))
            .await
            .unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].level.name, "B");
        assert_eq!(listing[0].group_count, 0);
        assert_eq!(listing[1].group_count, 2);
    }

    #[tokio::test]
    async fn deleting_unknown_level_reports_not_found() {
        let (backend, token) = backend_with_admin().await;
        let err = delete_level(backend.as_ref(), &token, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound("level")));
    }

    #[tokio::test]
    async fn fetching_missing_level_is_not_found() {
        let (backend, _token) = backend_with_admin().await;
        let err = fetch_level(backend.as_ref(), Access::Anonymous, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }
}
