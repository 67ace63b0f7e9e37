use serde_derive::{Deserialize, Serialize};
use std::fmt::Display;

/// Registry key of an instance, equal to its address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct WorkspaceId(pub i32);

impl Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(rename = "workspace_id")]
    pub id: WorkspaceId,
    #[serde(rename = "label")]
    pub name: String,
}

impl Workspace {
    pub fn new(id: i32, name: &str) -> Self {
        Self {
            id: WorkspaceId(id),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Unconfigured,
    /// Validated against remote, not yet persisted
    Pending,
    Saved,
    Deleted,
}

impl Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Unconfigured => f.write_str("unconfigured"),
            InstanceState::Pending => f.write_str("pending"),
            InstanceState::Saved => f.write_str("saved"),
            InstanceState::Deleted => f.write_str("deleted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub address: String,
    pub username: String,
    pub password: String,
    /// When true, speak plain http instead of https
    pub unsecure: bool,
    pub all_workspaces: Vec<Workspace>,
    pub enabled_workspaces: Vec<WorkspaceId>,
}

impl Instance {
    pub fn new(address: &str, username: &str, password: &str, unsecure: bool) -> Self {
        Self {
            address: address.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            unsecure,
            all_workspaces: vec![],
            enabled_workspaces: vec![],
        }
    }

    pub fn id(&self) -> InstanceId {
        InstanceId(self.address.clone())
    }

    pub fn scheme(&self) -> &'static str {
        if self.unsecure {
            "http"
        } else {
            "https"
        }
    }

    pub fn url(&self, suffix: Option<&str>) -> String {
        let suffix = suffix.unwrap_or("");
        format!("{}://{}/api{}", self.scheme(), self.address, suffix)
    }

    /// Replace selection, dropping duplicates but keeping first seen order
    pub fn set_enabled_workspaces(&mut self, ids: &[WorkspaceId]) {
        self.enabled_workspaces.clear();
        for id in ids {
            if !self.enabled_workspaces.contains(id) {
                self.enabled_workspaces.push(*id);
            }
        }
    }

    pub fn is_enabled(&self, id: &WorkspaceId) -> bool {
        self.enabled_workspaces.contains(id)
    }

    /// Enabled ids which are absent from the last fetched workspaces
    pub fn stale_workspaces(&self) -> Vec<WorkspaceId> {
        self.enabled_workspaces
            .iter()
            .filter(|id| !self.all_workspaces.iter().any(|w| &w.id == *id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(false, None, "https://demo.example.org/api")]
    #[case(true, None, "http://demo.example.org/api")]
    #[case(false, Some("/auth/whoami"), "https://demo.example.org/api/auth/whoami")]
    fn test_url(#[case] unsecure: bool, #[case] suffix: Option<&str>, #[case] expected: &str) {
        let instance = Instance::new("demo.example.org", "alice", "secret", unsecure);
        assert_eq!(instance.url(suffix), expected)
    }

    #[test]
    fn test_set_enabled_workspaces_dedup() {
        // Given
        let mut instance = Instance::new("demo.example.org", "alice", "secret", false);

        // When
        instance.set_enabled_workspaces(&[WorkspaceId(3), WorkspaceId(1), WorkspaceId(3)]);

        // Then
        assert_eq!(
            instance.enabled_workspaces,
            vec![WorkspaceId(3), WorkspaceId(1)]
        )
    }

    #[test]
    fn test_stale_workspaces() {
        // Given
        let mut instance = Instance::new("demo.example.org", "alice", "secret", false);
        instance.all_workspaces = vec![Workspace::new(1, "Café"), Workspace::new(2, "Docs")];
        instance.set_enabled_workspaces(&[WorkspaceId(2), WorkspaceId(99)]);

        // When
        let stale = instance.stale_workspaces();

        // Then
        assert_eq!(stale, vec![WorkspaceId(99)])
    }

    #[test]
    fn test_workspace_from_remote_json() {
        // Given
        let raw = r#"[{"workspace_id": 1, "label": "Café"}, {"workspace_id": 2, "label": "Docs"}]"#;

        // When
        let workspaces: Vec<Workspace> = serde_json::from_str(raw).unwrap();

        // Then
        assert_eq!(
            workspaces,
            vec![Workspace::new(1, "Café"), Workspace::new(2, "Docs")]
        )
    }
}
