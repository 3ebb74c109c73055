use chrono::{DateTime, Utc};

use crate::item::{ContentItem, ItemState};

/// Listing filter: state, keyword, and creation-time range. Empty filter
/// matches everything.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub states: Vec<ItemState>,
    pub keyword: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl ItemFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.states.push(state);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn created_after(mut self, t: DateTime<Utc>) -> Self {
        self.created_after = Some(t);
        self
    }

    pub fn created_before(mut self, t: DateTime<Utc>) -> Self {
        self.created_before = Some(t);
        self
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        if !self.states.is_empty() && !self.states.contains(&item.state) {
            return false;
        }
        if let Some(keyword) = &self.keyword {
            if !item.matches_keyword(keyword) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if item.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if item.created_at > before {
                return false;
            }
        }
        true
    }
}
