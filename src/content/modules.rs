use serde_json::{Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    ContentError, ContentResult, GROUPS, LEVELS, Leftover, MODULES, SECTIONS, clean_optional,
    decode_rows, decode_single,
    groups::{fetch_group, name_index},
    levels::fetch_level,
    models::{Group, Level, Module, Section},
};
use crate::remote::{Access, Backend, Filter, Query};

/// Sections every module starts with, in display order.
pub const DEFAULT_SECTIONS: [&str; 4] = ["Cours", "TP", "TD", "Examens"];

#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub module: Module,
    pub group: Group,
    pub level: Level,
}

/// Module with the names of its group and level, for selectors.
#[derive(Debug, Clone)]
pub struct ModuleListing {
    pub module: Module,
    pub group_name: Option<String>,
    pub level_name: Option<String>,
}

impl ModuleListing {
    /// `Level › Group › Module`, skipping unknown parents.
    pub fn path_label(&self) -> String {
        [
            self.level_name.as_deref(),
            self.group_name.as_deref(),
            Some(self.module.name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" › ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    Created(usize),
    AlreadyPresent,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleInput {
    pub name: String,
    pub description: Option<String>,
    pub group_id: Option<Uuid>,
}

impl ModuleInput {
    fn to_row(&self) -> ContentResult<Value> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContentError::Invalid("name_missing"));
        }
        let Some(group_id) = self.group_id else {
            return Err(ContentError::Invalid("group_missing"));
        };
        Ok(json!({
            "name": name,
            "description": clean_optional(self.description.as_deref()),
            "group_id": group_id.to_string(),
        }))
    }
}

fn default_section_rows(module_id: Uuid) -> Vec<Value> {
    DEFAULT_SECTIONS
        .iter()
        .enumerate()
        .map(|(index, name)| {
            json!({
                "module_id": module_id.to_string(),
                "name": name,
                "order_index": index,
            })
        })
        .collect()
}

pub async fn fetch_modules_for_group(
    backend: &dyn Backend,
    access: Access<'_>,
    group_id: Uuid,
) -> ContentResult<Vec<Module>> {
    let query = Query::table(MODULES)
        .eq("group_id", group_id.to_string())
        .order_asc("created_at");
    decode_rows(backend.select(access, &query).await?)
}

pub async fn fetch_module(
    backend: &dyn Backend,
    access: Access<'_>,
    id: Uuid,
) -> ContentResult<Module> {
    let query = Query::table(MODULES).eq("id", id.to_string()).limit(1);
    decode_single(backend.select(access, &query).await?, "module")
}

pub async fn fetch_module_context(
    backend: &dyn Backend,
    access: Access<'_>,
    id: Uuid,
) -> ContentResult<ModuleContext> {
    let module = fetch_module(backend, access, id).await?;
    let group = fetch_group(backend, access, module.group_id).await?;
    let level = fetch_level(backend, access, group.level_id).await?;
    Ok(ModuleContext {
        module,
        group,
        level,
    })
}

/// Every module with its group and level names, sorted by name.
pub async fn fetch_module_listing(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<Vec<ModuleListing>> {
    let modules_query = Query::table(MODULES).order_asc("name");
    let groups_query = Query::table(GROUPS).columns("id,name,level_id");
    let levels_query = Query::table(LEVELS).columns("id,name");
    let (modules, groups, levels) = tokio::try_join!(
        backend.select(access, &modules_query),
        backend.select(access, &groups_query),
        backend.select(access, &levels_query),
    )?;
    let modules: Vec<Module> = decode_rows(modules)?;
    let group_names = name_index(&groups);
    let level_names = name_index(&levels);

    Ok(modules
        .into_iter()
        .map(|module| {
            let group_key = module.group_id.to_string();
            let group_row = groups
                .iter()
                .find(|row| row.get("id").and_then(Value::as_str) == Some(group_key.as_str()));
            let level_name = group_row
                .and_then(|row| row.get("level_id"))
                .and_then(Value::as_str)
                .and_then(|level_id| level_names.get(level_id).cloned());
            ModuleListing {
                group_name: group_names.get(&group_key).cloned(),
                level_name,
                module,
            }
        })
        .collect())
}

pub async fn fetch_sections(
    backend: &dyn Backend,
    access: Access<'_>,
    module_id: Uuid,
) -> ContentResult<Vec<Section>> {
    let query = Query::table(SECTIONS)
        .eq("module_id", module_id.to_string())
        .order_asc("order_index");
    decode_rows(backend.select(access, &query).await?)
}

/// Creates a module and its four default sections.
///
/// When the section insert fails the module row is deleted again. If that
/// cleanup also fails the caller gets [`ContentError::Partial`].
pub async fn create_module(
    backend: &dyn Backend,
    token: &str,
    input: &ModuleInput,
) -> ContentResult<Module> {
    let row = input.to_row()?;
    let access = Access::User(token);
    let module: Module = decode_single(backend.insert(access, MODULES, vec![row]).await?, "module")?;

    if let Err(err) = backend
        .insert(access, SECTIONS, default_section_rows(module.id))
        .await
    {
        warn!(?err, module_id = %module.id, "default sections failed; rolling back module");
        let cleanup = backend
            .delete(access, MODULES, &[Filter::eq("id", module.id.to_string())])
            .await;
        return match cleanup {
            Ok(_) => Err(ContentError::Service(err)),
            Err(cleanup_err) => {
                error!(?cleanup_err, module_id = %module.id, "module rollback failed");
                Err(ContentError::Partial {
                    step: "section creation",
                    leftover: Leftover::ModuleWithoutSections,
                    source: err,
                })
            }
        };
    }

    info!(module_id = %module.id, name = %module.name, "module created");
    Ok(module)
}

/// Renames or moves a module. Sections are left as they are.
pub async fn update_module(
    backend: &dyn Backend,
    token: &str,
    id: Uuid,
    input: &ModuleInput,
) -> ContentResult<Module> {
    let row = input.to_row()?;
    let rows = backend
        .update(
            Access::User(token),
            MODULES,
            &[Filter::eq("id", id.to_string())],
            row,
        )
        .await?;
    decode_single(rows, "module")
}

pub async fn delete_module(backend: &dyn Backend, token: &str, id: Uuid) -> ContentResult<()> {
    let deleted = backend
        .delete(Access::User(token), MODULES, &[Filter::eq("id", id.to_string())])
        .await?;
    if deleted == 0 {
        return Err(ContentError::NotFound("module"));
    }
    Ok(())
}

/// Inserts the default sections for a module that has none.
///
/// A module with at least one section is left untouched, even if it does not
/// hold all four defaults.
pub async fn repair_sections(
    backend: &dyn Backend,
    token: &str,
    module_id: Uuid,
) -> ContentResult<RepairOutcome> {
    let access = Access::User(token);
    fetch_module(backend, access, module_id).await?;
    let existing = fetch_sections(backend, access, module_id).await?;
    if !existing.is_empty() {
        return Ok(RepairOutcome::AlreadyPresent);
    }

    let inserted = backend
        .insert(access, SECTIONS, default_section_rows(module_id))
        .await?;
    info!(%module_id, count = inserted.len(), "default sections restored");
    Ok(RepairOutcome::Created(inserted.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::groups::{GroupInput, save_group};
    use crate::content::levels::{LevelInput, save_level};
    use crate::content::test_support::backend_with_admin;
    use crate::remote::TableApi;

    async fn group(backend: &dyn Backend, token: &str) -> Group {
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
        save_group(
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
        .unwrap()
    }

    fn module_input(name: &str, group_id: Uuid) -> ModuleInput {
        ModuleInput {
            name: name.into(),
            description: None,
            group_id: Some(group_id),
        }
    }

    #[tokio::test]
    async fn new_module_gets_four_ordered_sections() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        let module = create_module(backend.as_ref(), &token, &module_input("Maths", group.id))
            .await
            .unwrap();

        let sections = fetch_sections(backend.as_ref(), Access::Anonymous, module.id)
            .await
            .unwrap();
        let labels: Vec<(String, i32)> = sections
            .into_iter()
            .map(|section| (section.name, section.order_index))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Cours".to_string(), 0),
                ("TP".to_string(), 1),
                ("TD".to_string(), 2),
                ("Examens".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn failed_section_insert_removes_the_module() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        backend.fail_next_insert(SECTIONS).await;

        let err = create_module(backend.as_ref(), &token, &module_input("Physique", group.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Service(_)));
        assert!(backend.rows(MODULES).await.is_empty());
        assert!(backend.rows(SECTIONS).await.is_empty());
    }

    #[tokio::test]
    async fn failed_rollback_is_reported_as_partial() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        backend.fail_next_insert(SECTIONS).await;
        backend.fail_next_delete(MODULES).await;

        let err = create_module(backend.as_ref(), &token, &module_input("Chimie", group.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Partial { .. }));
        assert_eq!(err.flash_code(), "partial_sections");
        assert_eq!(backend.rows(MODULES).await.len(), 1);
    }

    #[tokio::test]
    async fn repair_only_touches_modules_without_sections() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        let module = create_module(backend.as_ref(), &token, &module_input("SVT", group.id))
            .await
            .unwrap();

        let outcome = repair_sections(backend.as_ref(), &token, module.id)
            .await
            .unwrap();
        assert_eq!(outcome, RepairOutcome::AlreadyPresent);
        assert_eq!(backend.rows(SECTIONS).await.len(), 4);

        backend
            .delete(
                Access::User(&token),
                SECTIONS,
                &[Filter::eq("module_id", module.id.to_string())],
            )
            .await
            .unwrap();
        let outcome = repair_sections(backend.as_ref(), &token, module.id)
            .await
            .unwrap();
        assert_eq!(outcome, RepairOutcome::Created(4));
    }

    #[tokio::test]
    async fn partial_sections_are_not_completed() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        let module = create_module(backend.as_ref(), &token, &module_input("Info", group.id))
            .await
            .unwrap();
        let sections = fetch_sections(backend.as_ref(), Access::Anonymous, module.id)
            .await
            .unwrap();
        for section in sections.iter().skip(1) {
            backend
                .delete(
                    Access::User(&token),
                    SECTIONS,
                    &[Filter::eq("id", section.id.to_string())],
                )
                .await
                .unwrap();
        }

        let outcome = repair_sections(backend.as_ref(), &token, module.id)
            .await
            .unwrap();
        assert_eq!(outcome, RepairOutcome::AlreadyPresent);
        assert_eq!(backend.rows(SECTIONS).await.len(), 1);
    }

    #[tokio::test]
    async fn update_leaves_sections_alone() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        let module = create_module(backend.as_ref(), &token, &module_input("Old", group.id))
            .await
            .unwrap();
        let updated = update_module(
            backend.as_ref(),
            &token,
            module.id,
            &module_input("New", group.id),
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(backend.rows(SECTIONS).await.len(), 4);
    }

    #[tokio::test]
    async fn listing_labels_full_path() {
        let (backend, token) = backend_with_admin().await;
        let group = group(backend.as_ref(), &token).await;
        create_module(backend.as_ref(), &token, &module_input("Maths", group.id))
            .await
            .unwrap();
        let listing = fetch_module_listing(backend.as_ref(), Access::User(&token))
            .await
            .unwrap();
        assert_eq!(listing[0].path_label(), "L › G › Maths");
    }
}
