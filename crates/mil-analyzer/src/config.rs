//! Analyzer configuration.

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::diagnostic::AnalysisError;

/// Configuration for the MIL analyzer.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzerConfig {
    /// Interface name marking a long-running process.
    pub process_marker: String,

    /// Optional concrete process type name filter (empty = first match).
    pub process_type_name: String,

    /// Interface name marking a command.
    pub command_marker: String,

    /// Generic interface name marking a command handler.
    pub command_handler_marker: String,

    /// Interface name marking an event.
    pub event_marker: String,

    /// Generic interface name marking an event handler.
    pub event_handler_marker: String,

    /// Substring of a base type name marking an aggregate root.
    pub aggregate_root_marker: String,

    /// Member name of message publication calls.
    pub publish_keyword: String,

    /// Assemblies skipped in a multi-compilation run.
    pub excluded_assemblies: Vec<String>,

    /// Source language (default: "csharp").
    pub language: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let conventions = MessagingConventions::default();
        Self {
            process_marker: "IProcess".to_string(),
            process_type_name: String::new(),
            command_marker: conventions.command_marker,
            command_handler_marker: conventions.command_handler_marker,
            event_marker: conventions.event_marker,
            event_handler_marker: conventions.event_handler_marker,
            aggregate_root_marker: conventions.aggregate_root_marker,
            publish_keyword: conventions.publish_keyword,
            excluded_assemblies: Vec::new(),
            language: "csharp".to_string(),
        }
    }
}

impl AnalyzerConfig {
    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::io(path, e.to_string()))?;
        Self::from_json(&content).map_err(|message| AnalysisError::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// The marker names consumed by the classifier and the walker.
    pub fn conventions(&self) -> MessagingConventions {
        MessagingConventions {
            command_marker: self.command_marker.clone(),
            command_handler_marker: self.command_handler_marker.clone(),
            event_marker: self.event_marker.clone(),
            event_handler_marker: self.event_handler_marker.clone(),
            aggregate_root_marker: self.aggregate_root_marker.clone(),
            publish_keyword: self.publish_keyword.clone(),
        }
    }

    /// Returns true if the assembly is excluded from analysis.
    pub fn is_excluded(&self, assembly: &str) -> bool {
        self.excluded_assemblies.iter().any(|a| a == assembly)
    }
}

/// Marker names identifying message-architecture roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingConventions {
    pub command_marker: String,
    pub command_handler_marker: String,
    pub event_marker: String,
    pub event_handler_marker: String,
    pub aggregate_root_marker: String,
    pub publish_keyword: String,
}

impl Default for MessagingConventions {
    fn default() -> Self {
        Self {
            command_marker: "ICommand".to_string(),
            command_handler_marker: "ICommandHandler".to_string(),
            event_marker: "IEvent".to_string(),
            event_handler_marker: "IEventHandler".to_string(),
            aggregate_root_marker: "EventSourced".to_string(),
            publish_keyword: "Send".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_messaging_conventions() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.process_marker, "IProcess");
        assert_eq!(config.publish_keyword, "Send");
        assert_eq!(config.conventions(), MessagingConventions::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AnalyzerConfig::from_json(
            r#"{ "processMarker": "IWorkflow", "excludedAssemblies": ["Conference.Web.Public"] }"#,
        )
        .unwrap();

        assert_eq!(config.process_marker, "IWorkflow");
        assert_eq!(config.command_marker, "ICommand");
        assert!(config.is_excluded("Conference.Web.Public"));
        assert!(!config.is_excluded("Conference"));
    }

    #[test]
    fn load_reports_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mil.json");
        fs::write(&path, "{ not json").unwrap();

        let err = AnalyzerConfig::load(&path).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig { .. }));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = AnalyzerConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::IoError { .. }));
    }
}
