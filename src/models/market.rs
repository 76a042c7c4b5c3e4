//! Market intelligence models

/// A web source backing a grounded market answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    pub uri: String,
    /// Missing titles are displayed as "Source"
    pub title: Option<String>,
}

/// Result of a grounded market news query: free text plus the sources
/// the provider cited for it
#[derive(Debug, Clone)]
pub struct MarketUpdates {
    pub text: String,
    pub links: Vec<SourceLink>,
}
