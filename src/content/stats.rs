use super::{ContentResult, FILES, GROUPS, LEVELS, MODULES};
use crate::remote::{Access, Backend};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub levels: u64,
    pub groups: u64,
    pub modules: u64,
    pub files: u64,
}

pub async fn fetch_dashboard_stats(
    backend: &dyn Backend,
    access: Access<'_>,
) -> ContentResult<DashboardStats> {
    let (levels, groups, modules, files) = tokio::try_join!(
        backend.count(access, LEVELS),
        backend.count(access, GROUPS),
        backend.count(access, MODULES),
        backend.count(access, FILES),
    )?;
    Ok(DashboardStats {
        levels,
        groups,
        modules,
        files,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::content::test_support::backend_with_admin;
    use crate::remote::TableApi;

    #[tokio::test]
    async fn counts_each_table() {
        let (backend, token) = backend_with_admin().await;
        let access = Access::User(&token);
        let level = backend
            .insert(access, LEVELS, vec![json!({"name": "L"})])
            .await
            .unwrap()
            .remove(0);
        backend
            .insert(
                access,
                GROUPS,
                vec![
                    json!({"name": "A", "level_id": level["id"]}),
                    json!({"name": "B", "level_id": level["id"]}),
                ],
            )
            .await
            .unwrap();

        let stats = fetch_dashboard_stats(backend.as_ref(), access).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                levels: 1,
                groups: 2,
                modules: 0,
                files: 0,
            }
        );
    }
}
