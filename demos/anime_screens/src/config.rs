use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Quiet period a query must survive before it is sent.
    pub debounce: Duration,
    /// Most recent queries kept in the history.
    pub history_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce: Duration::from_millis(500),
            history_limit: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetailConfig {
    /// Title of the collection "add to collection" toggles membership in.
    pub planning_collection: String,
}

impl Default for DetailConfig {
    fn default() -> Self {
        DetailConfig {
            planning_collection: "Planning".to_string(),
        }
    }
}
