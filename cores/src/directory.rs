
use serde::{Deserialize, Serialize};

/// A directory entry that can be matched against a free-text name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub real_name: String,
    pub display_name: String,
    pub user_name: String,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        real_name: impl Into<String>,
        display_name: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            real_name: real_name.into(),
            display_name: display_name.into(),
            user_name: user_name.into(),
        }
    }

    /// Name shown to people: display name, then real name, then username.
    pub fn preferred_name(&self) -> &str {
        [&self.display_name, &self.real_name, &self.user_name]
            .into_iter()
            .find(|name| !name.is_empty())
            .map(|name| name.as_str())
            .unwrap_or_default()
    }

    pub fn names(&self) -> [&str; 3] {
        [self.real_name.as_str(), self.display_name.as_str(), self.user_name.as_str()]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub display_name: String,
    pub real_name: String,
    pub image: String,
}
