//! Search query builder.
//!
//! Operators (`filetype:`, `site:`) are emitted in the order they were added.

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    operators: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by file type.
    pub fn filetype(mut self, ext: &str) -> Self {
        self.operators.push(format!("filetype:{}", ext.trim_start_matches('.')));
        self
    }

    /// Restrict results to a domain.
    pub fn site(mut self, domain: &str) -> Self {
        self.operators.push(format!("site:{}", domain));
        self
    }

    pub fn build(&self) -> String {
        self.operators.join(" ")
    }
}
