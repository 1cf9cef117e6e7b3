use std::collections::HashMap;

use serde_json::json;
use uuid::Uuid;

use super::{
    ContentError, ContentResult, GROUPS, LEVELS, clean_optional, decode_rows, decode_single,
    levels::fetch_level,
    models::{Group, Level},
};
use crate::remote::{Access, Backend, Filter, Query};

/// A group together with the name of the level it belongs to.
#[derive(Debug, Clone)]
pub struct GroupListing {
    pub group: Group,
    pub level_name: Option<String>,
}

/// A group and its parent level, for breadcrumbs.
#[derive(Debug, Clone)]
pub struct GroupContext {
    pub group: Group,
    pub level: Level,
}

#[derive(Debug, Clone, Default)]
pub struct GroupInput {
    pub name: String,
    pub level_id: Option<Uuid>,
    pub description: Option<String>,
}

impl GroupInput {
    fn to_row(&self) -> ContentResult<serde_json::Value> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContentError::Invalid("name_missing"));
        }
        let Some(level_id) = self.level_id else {
            return Err(ContentError::Invalid("level_missing"));
        };
        Ok(json!({
            "name": name,
            "level_id": level_id.to_string(),
            "description": clean_optional(self.description.as_deref()),
        }))
    }
}

pub async fn fetch_groups_for_level(
    backend: &dyn Backend,
    access: Access<'_>,
    level_id: Uuid,
) -> ContentResult<Vec<Group>> {
    let query = Query::table(GROUPS)
        .eq("level_id", level_id.to_string())
        .order_asc("name");
    decode_rows(backend.select(access, &query).await?)
}

pub async fn fetch_group(
    backend: &dyn Backend,
    access: Access<'_>,
    id: Uuid,
) -> ContentResult<Group> {
    let query = Query::table(GROUPS).eq("id", id.to_string()).limit(1);
    decode_single(backend.select(access, &query).await?, "group")
}

pub async fn fetch_group_context(
    backend: &dyn Backend,
    access: Access<'_>,
    id: Uuid,
) -> ContentResult<GroupContext> {
    let group = fetch_group(backend, access, id).await?;
    let level = fetch_level(backend, access, group.level_id).await?;
    Ok(GroupContext { group, level })
}

/// Admin listing, newest first.
pub async fn fetch_group_listing(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<Vec<GroupListing>> {
    list_with_level_names(backend, access, Query::table(GROUPS).order_desc("created_at")).await
}

/// All groups alphabetically, used by the module screen's group picker.
pub async fn fetch_groups_by_name(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<Vec<GroupListing>> {
    list_with_level_names(backend, access, Query::table(GROUPS).order_asc("name")).await
}

async fn list_with_level_names(
    backend: &dyn Backend,
    access: Access<'_>,
    groups_query: Query,
) -> ContentResult<Vec<GroupListing>> {
    let levels_query = Query::table(LEVELS).columns("id,name");
    let (groups, levels) = tokio::try_join!(
        backend.select(access, &groups_query),
        backend.select(access, &levels_query),
    )?;
    let groups: Vec<Group> = decode_rows(groups)?;
    let level_names = name_index(&levels);

    Ok(groups
        .into_iter()
        .map(|group| {
            let level_name = level_names.get(&group.level_id.to_string()).cloned();
            GroupListing { group, level_name }
        })
        .collect())
}

/// `id -> name` lookup over raw rows.
pub(crate) fn name_index(rows: &[serde_json::Value]) -> HashMap<String, String> {
    rows.iter()
        .filter_map(|row| {
            let id = row.get("id")?.as_str()?;
            let name = row.get("name")?.as_str()?;
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

pub async fn save_group(
    backend: &dyn Backend,
    token: &str,
    existing: Option<Uuid>,
    input: &GroupInput,
) -> ContentResult<Group> {
    let row = input.to_row()?;
    let access = Access::User(token);
    let rows = match existing {
        Some(id) => {
            backend
                .update(access, GROUPS, &[Filter::eq("id", id.to_string())], row)
                .await?
        }
        None => backend.insert(access, GROUPS, vec![row]).await?,
    };
    decode_single(rows, "group")
}

pub async fn delete_group(backend: &dyn Backend, token: &str, id: Uuid) -> ContentResult<()> {
    let deleted = backend
        .delete(Access::User(token), GROUPS, &[Filter::eq("id", id.to_string())])
        .await?;
    if deleted == 0 {
        return Err(ContentError::NotFound("group"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::levels::{LevelInput, save_level};
    use crate::content::test_support::backend_with_admin;

    async fn level(backend: &dyn Backend, token: &str, name: &str) -> Level {
        save_level(
            backend,
            token,
            None,
            &LevelInput {
                name: name.into(),
                description: None,
                is_active: true,
            },
        )
        .await
        .unwrap()
    }

    fn group_input(name: &str, level_id: Uuid) -> GroupInput {
        GroupInput {
            name: name.into(),
            level_id: Some(level_id),
            description: None,
        }
    }

    #[tokio::test]
    async fn groups_of_a_level_are_sorted_by_name() {
        let (backend, token) = backend_with_admin().await;
        let l1 = level(backend.as_ref(), &token, "L1").await;
        let l2 = level(backend.as_ref(), &token, "L2").await;
        for name in ["Zeta", "Alpha"] {
            save_group(backend.as_ref(), &token, None, &group_input(name, l1.id))
                .await
                .unwrap();
        }
        save_group(backend.as_ref(), &token, None, &group_input("Other", l2.id))
            .await
            .unwrap();

        let names: Vec<String> = fetch_groups_for_level(backend.as_ref(), Access::Anonymous, l1.id)
            .await
            .unwrap()
            .into_iter()
            .map(|group| group.name)
            .collect();
        assert_eq!(names, ["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn group_requires_a_level() {
        let (backend, token) = backend_with_admin().await;
        let err = save_group(
            backend.as_ref(),
            &token,
            None,
            &GroupInput {
                name: "G".into(),
                level_id: None,
                description: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.flash_code(), "level_missing");
    }

    #[tokio::test]
    async fn listing_carries_level_names_newest_first() {
        let (backend, token) = backend_with_admin().await;
        let l1 = level(backend.as_ref(), &token, "Première").await;
        save_group(backend.as_ref(), &token, None, &group_input("G1", l1.id))
            .await
            .unwrap();
        save_group(backend.as_ref(), &token, None, &group_input("G2", l1.id))
            .await
            .unwrap();

        let listing = fetch_group_listing(backend.as_ref(), Access::User(&token))
            .await
            .unwrap();
        assert_eq!(listing[0].group.name, "G2");
        assert_eq!(listing[0].level_name.as_deref(), Some("Première"));
    }

    #[tokio::test]
    async fn context_resolves_parent_level() {
        let (backend, token) = backend_with_admin().await;
        let l1 = level(backend.as_ref(), &token, "L1").await;
        let group = save_group(backend.as_ref(), &token, None, &group_input("G", l1.id))
            .await
            .unwrap();
        let context = fetch_group_context(backend.as_ref(), Access::Anonymous, group.id)
            .await
            .unwrap();
        assert_eq!(context.level.id, l1.id);
    }

    #[tokio::test]
    async fn unknown_level_is_refused_by_the_store() {
        let (backend, token) = backend_with_admin().await;
        let err = save_group(backend.as_ref(), &token, None, &group_input("G", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Service(_)));
    }
}
