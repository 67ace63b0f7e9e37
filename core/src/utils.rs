use crate::instance::WorkspaceId;

pub fn strbool(value: &str) -> bool {
    ["true", "True", "t", "T", "1"].contains(&value)
}

pub fn boolstr(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Display form of a workspace name for list widgets: non-ascii characters
/// are removed. Model keeps the original name.
pub fn normalize_workspace_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii()).collect()
}

/// Split a comma separated config value, trimming items and skipping empty ones
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect()
}

pub fn join_workspaces_ids(ids: &[WorkspaceId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(",")
}

pub fn parse_workspaces_ids(value: &str) -> Result<Vec<WorkspaceId>, String> {
    split_list(value)
        .iter()
        .map(|raw| {
            raw.parse::<i32>()
                .map(WorkspaceId)
                .map_err(|_| raw.to_string())
        })
        .collect()
}
