use serde::{Deserialize, Serialize};

use crate::error::{MailError, Result};

/// Mail folder metadata returned by `/users/{id}/mailFolders/{folder}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub child_folder_count: u32,
    #[serde(default)]
    pub unread_item_count: u32,
    #[serde(default)]
    pub total_item_count: u32,
}

/// OData options for listing messages in a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesQuery {
    pub filter: Option<String>,
    pub search: Option<String>,
    pub select: Option<String>,
    pub page_size: u32,
    pub include_count: bool,
    /// Send `ConsistencyLevel: eventual` even without a filter.
    pub advanced_query: bool,
}

impl Default for ListMessagesQuery {
    fn default() -> Self {
        Self {
            filter: None,
            search: None,
            select: None,
            page_size: 10,
            include_count: true,
            advanced_query: false,
        }
    }
}

impl ListMessagesQuery {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.filter.is_some() && self.search.is_some() {
            return Err(MailError::Validation(
                "filter and search cannot be combined in one request".to_string(),
            ));
        }
        Ok(())
    }

    pub fn needs_eventual_consistency(&self) -> bool {
        self.advanced_query || self.filter.is_some()
    }

    /// Query-string pairs in the order Graph documents them.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        if let Some(search) = &self.search {
            params.push(("$search", search.clone()));
        }
        if let Some(select) = &self.select {
            params.push(("$select", select.clone()));
        }
        if self.page_size > 0 {
            params.push(("$top", self.page_size.to_string()));
        }
        if self.include_count {
            params.push(("$count", "true".to_string()));
        }
        params
    }
}

/// One page of a message collection
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}
