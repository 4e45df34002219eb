//! The fixed tool set exposed to tool-capable backends.
//!
//! Three GitHub repository operations. The wire names are what the
//! model sees and emits back in function calls; `ToolName` is the
//! typed view the executor dispatches on.

use crate::ToolDefinition;

/// Typed names for the fixed tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetFileContent,
    ListRepoContents,
    CreateOrUpdateFile,
}

impl ToolName {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ToolName::GetFileContent => "getGitHubFileContent",
            ToolName::ListRepoContents => "listGitHubRepoContents",
            ToolName::CreateOrUpdateFile => "createOrUpdateGitHubFile",
        }
    }

    /// Parse a model-emitted function name. Unknown names yield `None`
    /// so the executor can answer with an error result instead of
    /// failing the loop.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "getGitHubFileContent" => Some(ToolName::GetFileContent),
            "listGitHubRepoContents" => Some(ToolName::ListRepoContents),
            "createOrUpdateGitHubFile" => Some(ToolName::CreateOrUpdateFile),
            _ => None,
        }
    }
}

/// The tool declarations sent to the backend when tool mode is active.
pub fn github_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ToolName::GetFileContent.wire_name().to_string(),
            description: "Gets the content of a file from a specified GitHub repository."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {
                        "type": "string",
                        "description": "The name of the GitHub repository (e.g., \"my-project\")."
                    },
                    "path": {
                        "type": "string",
                        "description": "The full path to the file (e.g., \"src/main.rs\")."
                    }
                },
                "required": ["repo", "path"]
            }),
        },
        ToolDefinition {
            name: ToolName::ListRepoContents.wire_name().to_string(),
            description:
                "Lists the contents (files and directories) of a path in a GitHub repository."
                    .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {
                        "type": "string",
                        "description": "The name of the GitHub repository."
                    },
                    "path": {
                        "type": "string",
                        "description": "The path to the directory. Use \"\" or \"/\" for the root."
                    }
                },
                "required": ["repo", "path"]
            }),
        },
        ToolDefinition {
            name: ToolName::CreateOrUpdateFile.wire_name().to_string(),
            description: "Creates a new file or updates an existing file in a GitHub repository."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {
                        "type": "string",
                        "description": "The name of the GitHub repository."
                    },
                    "path": {
                        "type": "string",
                        "description": "The full path where the file should be saved."
                    },
                    "content": {
                        "type": "string",
                        "description": "The new content of the file."
                    },
                    "commitMessage": {
                        "type": "string",
                        "description": "A descriptive commit message."
                    }
                },
                "required": ["repo", "path", "content", "commitMessage"]
            }),
        },
    ]
}

/// Convert a tool definition to the Gemini function-declaration format.
pub fn to_function_declaration(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for name in [
            ToolName::GetFileContent,
            ToolName::ListRepoContents,
            ToolName::CreateOrUpdateFile,
        ] {
            assert_eq!(ToolName::from_wire(name.wire_name()), Some(name));
        }
    }

    #[test]
    fn unknown_wire_name_is_none() {
        assert_eq!(ToolName::from_wire("deleteEverything"), None);
    }

    #[test]
    fn tool_set_is_complete() {
        let tools = github_tools();
        assert_eq!(tools.len(), 3);
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"getGitHubFileContent"));
        assert!(names.contains(&"listGitHubRepoContents"));
        assert!(names.contains(&"createOrUpdateGitHubFile"));
    }

    #[test]
    fn declarations_carry_required_params() {
        let tools = github_tools();
        let write = tools
            .iter()
            .find(|t| t.name == "createOrUpdateGitHubFile")
            .unwrap();
        let decl = to_function_declaration(write);
        let required: Vec<_> = decl["parameters"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["repo", "path", "content", "commitMessage"]);
    }
}
