use crate::args::ToolArgs;
use crate::context::ToolContext;
use crate::router::{AgentKind, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// Files longer than this are clipped before being returned.
const MAX_FILE_CHARS: usize = 20_000;

/// Resolves a model-supplied relative path under the project root,
/// rejecting absolute paths and any `..` component.
fn resolve_within(root: &Path, relative: &str) -> VoxlinkResult<PathBuf> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(VoxlinkError::Tool(format!(
            "path '{relative}' must be relative to the project root"
        )));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(VoxlinkError::Tool(format!(
                    "path '{relative}' escapes the project root"
                )));
            }
        }
    }
    Ok(root.join(candidate))
}

/// Lists entries in the mounted project directory.
pub struct ListDirectoryTool {
    descriptor: ToolDescriptor,
}

impl ListDirectoryTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "list_directory".to_string(),
                agent: AgentKind::Engineer,
                description: "List files and directories in the open project.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "sub_path": {
                            "type": "string",
                            "description": "Optional subdirectory to list instead of the root"
                        }
                    }
                }),
            },
        }
    }
}

impl Default for ListDirectoryTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ListDirectoryTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::ListDirectory { sub_path } = args else {
            return Err(VoxlinkError::Tool("expected list_directory arguments".into()));
        };
        let Some(root) = &ctx.project_dir else {
            return Ok(
                "No project directory is currently open. Ask the user to load a project first."
                    .to_string(),
            );
        };

        let label = sub_path.clone().unwrap_or_else(|| "root".to_string());
        let target = match &sub_path {
            Some(sub) => resolve_within(root, sub)?,
            None => root.clone(),
        };
        debug!(path = %target.display(), "list directory");

        let mut read_dir = match tokio::fs::read_dir(&target).await {
            Ok(rd) => rd,
            Err(_) => return Ok(format!("Directory '{label}' not found in the project.")),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| VoxlinkError::Tool(format!("failed to list '{label}': {e}")))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push(if is_dir {
                format!("[DIR] {name}")
            } else {
                format!("[FILE] {name}")
            });
        }
        entries.sort();

        Ok(format!("Contents of {label}:\n{}", entries.join("\n")))
    }
}

/// Reads a file from the mounted project directory, clipped to a size
/// safe to hand back to the model.
pub struct ReadProjectFileTool {
    descriptor: ToolDescriptor,
}

impl ReadProjectFileTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "read_project_file".to_string(),
                agent: AgentKind::Engineer,
                description: "Read a file from the open project.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "Path of the file, relative to the project root"
                        }
                    },
                    "required": ["file_path"]
                }),
            },
        }
    }
}

impl Default for ReadProjectFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for ReadProjectFileTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::ReadProjectFile { path } = args else {
            return Err(VoxlinkError::Tool(
                "expected read_project_file arguments".into(),
            ));
        };
        let Some(root) = &ctx.project_dir else {
            return Ok("No project directory is currently open.".to_string());
        };

        let target = resolve_within(root, &path)?;
        debug!(path = %target.display(), "read project file");

        let content = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| VoxlinkError::Tool(format!("failed to read file '{path}': {e}")))?;

        let body = if content.chars().count() > MAX_FILE_CHARS {
            let clipped: String = content.chars().take(MAX_FILE_CHARS).collect();
            format!("{clipped}\n...[File truncated]")
        } else {
            content
        };

        Ok(format!("Content of {path}:\n```\n{body}\n```"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_context(root: &Path) -> ToolContext {
        let mut ctx = ToolContext::default();
        ctx.project_dir = Some(root.to_path_buf());
        ctx
    }

    #[test]
    fn traversal_is_rejected() {
        let root = Path::new("/srv/project");
        assert!(resolve_within(root, "src/main.rs").is_ok());
        assert!(resolve_within(root, "../secrets").is_err());
        assert!(resolve_within(root, "src/../../etc/passwd").is_err());
        assert!(resolve_within(root, "/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn lists_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("src")).await.unwrap();
        tokio::fs::write(dir.path().join("Cargo.toml"), "[package]")
            .await
            .unwrap();

        let tool = ListDirectoryTool::new();
        let result = tool
            .run(
                ToolArgs::ListDirectory { sub_path: None },
                &project_context(dir.path()),
            )
            .await
            .unwrap();
        assert!(result.contains("[DIR] src"));
        assert!(result.contains("[FILE] Cargo.toml"));
    }

    #[tokio::test]
    async fn missing_subdirectory_is_a_friendly_answer() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListDirectoryTool::new();
        let result = tool
            .run(
                ToolArgs::ListDirectory {
                    sub_path: Some("ghost".into()),
                },
                &project_context(dir.path()),
            )
            .await
            .unwrap();
        assert!(result.contains("'ghost' not found"));
    }

    #[tokio::test]
    async fn reads_and_truncates_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("small.txt"), "hello")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("big.txt"), "x".repeat(MAX_FILE_CHARS + 50))
            .await
            .unwrap();

        let tool = ReadProjectFileTool::new();
        let ctx = project_context(dir.path());

        let small = tool
            .run(
                ToolArgs::ReadProjectFile {
                    path: "small.txt".into(),
                },
                &ctx,
            )
            .await
            .unwrap();
        assert!(small.contains("hello"));
        assert!(!small.contains("[File truncated]"));

        let big = tool
            .run(
                ToolArgs::ReadProjectFile {
                    path: "big.txt".into(),
                },
                &ctx,
            )
            .await
            .unwrap();
        assert!(big.contains("[File truncated]"));
    }

    #[tokio::test]
    async fn no_project_directory_is_not_an_error() {
        let tool = ReadProjectFileTool::new();
        let result = tool
            .run(
                ToolArgs::ReadProjectFile {
                    path: "src/lib.rs".into(),
                },
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert!(result.contains("No project directory"));
    }
}
