use serde::{Deserialize, Serialize};

/// Placement of a content item in the location tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,

    pub content_id: u64,

    /// `None` for a tree root
    pub parent_id: Option<u64>,

    /// Ids from the tree root down to and including this location
    pub path: Vec<u64>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub hidden: bool,
}

impl Location {
    /// A root location
    pub fn root(id: u64, content_id: u64) -> Self {
        Self {
            id,
            content_id,
            parent_id: None,
            path: vec![id],
            priority: 0,
            hidden: false,
        }
    }

    /// A location placed directly below `parent`
    pub fn child_of(parent: &Location, id: u64, content_id: u64) -> Self {
        let mut path = parent.path.clone();
        path.push(id);
        Self {
            id,
            content_id,
            parent_id: Some(parent.id),
            path,
            priority: 0,
            hidden: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Distance from the tree root; roots have depth 0
    pub fn depth(&self) -> u64 {
        self.path.len().saturating_sub(1) as u64
    }

    /// Path rendered as `/1/2/42/`
    pub fn path_string(&self) -> String {
        let mut rendered = String::from("/");
        for id in &self.path {
            rendered.push_str(&id.to_string());
            rendered.push('/');
        }
        rendered
    }

    /// Whether this location lies in the subtree rooted at `location_id`
    pub fn is_within(&self, location_id: u64) -> bool {
        self.path.contains(&location_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_paths() {
        let root = Location::root(1, 1);
        let folder = Location::child_of(&root, 2, 10);
        let article = Location::child_of(&folder, 42, 57);

        assert_eq!(root.depth(), 0);
        assert_eq!(article.depth(), 2);
        assert_eq!(article.parent_id, Some(2));
        assert_eq!(article.path_string(), "/1/2/42/");
        assert!(article.is_within(2));
        assert!(article.is_within(42));
        assert!(!folder.is_within(42));
    }
}
