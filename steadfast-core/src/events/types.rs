/// Notices the core emits for the presentation layer.
///
/// None of these influence control flow; a dropped notice only loses output.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Assistant output, forwarded in the order the service produced it.
    Content {
        source: Option<String>,
        text: String,
    },
    Progress(String),
    Warning(String),
    Error(String),
}
