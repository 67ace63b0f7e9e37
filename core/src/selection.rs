use crate::{
    instance::{Instance, WorkspaceId},
    utils::normalize_workspace_name,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    pub id: WorkspaceId,
    pub label: String,
}

impl WorkspaceEntry {
    fn matches(&self, query: &str) -> bool {
        self.id.to_string() == query.trim() || self.label == normalize_workspace_name(query.trim())
    }
}

/// Not synchronized (left) and synchronized (right) workspaces of an instance. Entries are
/// moved from one list to the other, then `selected_ids` gives the new selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceLists {
    left: Vec<WorkspaceEntry>,
    right: Vec<WorkspaceEntry>,
}

impl WorkspaceLists {
    pub fn from_instance(instance: &Instance) -> Self {
        let mut lists = Self::default();

        for workspace in &instance.all_workspaces {
            let entry = WorkspaceEntry {
                id: workspace.id,
                label: normalize_workspace_name(&workspace.name),
            };
            if instance.is_enabled(&workspace.id) {
                lists.right.push(entry);
            } else {
                lists.left.push(entry);
            }
        }

        lists
    }

    pub fn left(&self) -> &[WorkspaceEntry] {
        &self.left
    }

    pub fn right(&self) -> &[WorkspaceEntry] {
        &self.right
    }

    pub fn select(&mut self, index: usize) -> Option<&WorkspaceEntry> {
        if index >= self.left.len() {
            return None;
        }
        let entry = self.left.remove(index);
        self.right.push(entry);
        self.right.last()
    }

    pub fn unselect(&mut self, index: usize) -> Option<&WorkspaceEntry> {
        if index >= self.right.len() {
            return None;
        }
        let entry = self.right.remove(index);
        self.left.push(entry);
        self.left.last()
    }

    /// Index of left entry matching given id or name
    pub fn find_left(&self, query: &str) -> Option<usize> {
        find(&self.left, query)
    }

    /// Index of right entry matching given id or name
    pub fn find_right(&self, query: &str) -> Option<usize> {
        find(&self.right, query)
    }

    /// Right list ids followed by instance enabled ids which are unknown by remote (they
    /// can't be displayed but must not be lost)
    pub fn selected_ids(&self, instance: &Instance) -> Vec<WorkspaceId> {
        let mut ids: Vec<WorkspaceId> = self.right.iter().map(|entry| entry.id).collect();
        ids.extend(instance.stale_workspaces());
        ids
    }
}

fn find(entries: &[WorkspaceEntry], query: &str) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.id.to_string() == query.trim())
        .or_else(|| entries.iter().position(|entry| entry.matches(query)))
}
