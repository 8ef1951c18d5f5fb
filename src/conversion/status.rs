use serde::{Deserialize, Serialize};

/// Progress of one conversion attempt as reported by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Rendering,
    Converting,
    Success,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// Substrings in the status text that mark the end of a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMarkers {
    pub success: String,
    pub error: String,
}

impl Default for StatusMarkers {
    fn default() -> Self {
        Self { success: "Success".to_string(), error: "Error".to_string() }
    }
}

impl StatusMarkers {
    pub fn new(success: impl Into<String>, error: impl Into<String>) -> Self {
        Self { success: success.into(), error: error.into() }
    }

    /// Classify the page's status text
    ///
    /// When both markers occur, the one that appears first wins: the page leads with its marker and
    /// an error message may quote the success word.
    pub fn classify(&self, text: &str) -> SessionStatus {
        match (text.find(&self.success), text.find(&self.error)) {
            (Some(s), Some(e)) if e < s => return SessionStatus::Error,
            (Some(_), _) => return SessionStatus::Success,
            (None, Some(_)) => return SessionStatus::Error,
            (None, None) => {}
        }

        let lower = text.to_lowercase();
        if lower.contains("converting") {
            SessionStatus::Converting
        } else if lower.contains("rendering") {
            SessionStatus::Rendering
        } else if lower.contains("loading") {
            SessionStatus::Loading
        } else {
            SessionStatus::Idle
        }
    }
}
