//! Outside collaborators the reader hands work to: text transforms
//! (rewrite/summarize) and activity announcements.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Rewrite inputs are clipped to this many characters.
pub const REWRITE_MAX_CHARS: usize = 30_000;
/// Summary inputs are clipped to this many characters.
pub const SUMMARY_MAX_CHARS: usize = 15_000;

pub const UNCONFIGURED_MESSAGE: &str = "Text transform not configured.";

/// Turns article content into a replacement string. Never fails: errors
/// come back as an explanatory message.
#[async_trait]
pub trait TextTransform: Send + Sync {
    async fn transform(&self, content: &str) -> String;
}

pub struct UnconfiguredTransform;

#[async_trait]
impl TextTransform for UnconfiguredTransform {
    async fn transform(&self, _content: &str) -> String {
        UNCONFIGURED_MESSAGE.to_string()
    }
}

/// Pipes content through an external program (stdin in, stdout out).
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
}

impl CommandTransform {
    /// `argv[0]` is the program. `None` for an empty command line.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    async fn run(&self, content: &str) -> std::io::Result<std::process::Output> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content.as_bytes()).await?;
        }
        child.wait_with_output().await
    }
}

#[async_trait]
impl TextTransform for CommandTransform {
    async fn transform(&self, content: &str) -> String {
        match self.run(content).await {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(program = %self.program, status = %output.status, "Transform failed");
                format!("Transform failed ({}): {}", output.status, stderr.trim())
            }
            Err(e) => {
                warn!(program = %self.program, error = %e, "Could not run transform");
                format!("Could not run transform: {e}")
            }
        }
    }
}

/// External commands for the text transforms. Each is an argv list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub rewrite_command: Vec<String>,
    pub summarize_command: Vec<String>,
}

impl TransformConfig {
    pub fn rewriter(&self) -> Box<dyn TextTransform> {
        build_transform(&self.rewrite_command)
    }

    pub fn summarizer(&self) -> Box<dyn TextTransform> {
        build_transform(&self.summarize_command)
    }
}

fn build_transform(argv: &[String]) -> Box<dyn TextTransform> {
    match CommandTransform::from_argv(argv) {
        Some(command) => Box::new(command),
        None => Box::new(UnconfiguredTransform),
    }
}

/// The first `max_chars` characters of `content`.
pub fn clip(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}

/// One-way notification of what the reader is doing.
pub trait ActivitySink: Send + Sync {
    fn announce(&self, action: &str, title: &str, link: &str, source_id: &str);
}

/// Announces activity as tracing events.
pub struct TracingActivity;

impl ActivitySink for TracingActivity {
    fn announce(&self, action: &str, title: &str, link: &str, source_id: &str) {
        info!(target: "feedrelay::activity", action, title, link, source_id, "Activity");
    }
}

pub struct NoopActivity;

impl ActivitySink for NoopActivity {
    fn announce(&self, _action: &str, _title: &str, _link: &str, _source_id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        assert_eq!(clip("hello", 10), "hello");
        assert_eq!(clip("hello", 5), "hello");
        assert_eq!(clip("hello", 2), "he");
        assert_eq!(clip("摸鱼阅读器", 2), "摸鱼");
        assert_eq!(clip("", 3), "");
    }

    #[tokio::test]
    async fn test_unconfigured_transform() {
        let transform = TransformConfig::default().rewriter();
        assert_eq!(transform.transform("anything").await, UNCONFIGURED_MESSAGE);
    }

    #[test]
    fn test_transform_config_from_toml() {
        let config: TransformConfig = toml::from_str(r#"summarize_command = ["llm", "-s", "tl;dr"]"#).unwrap();
        assert_eq!(config.summarize_command.len(), 3);
        assert!(config.rewrite_command.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_transform_pipes_stdin() {
        let argv = vec!["tr".to_string(), "a-z".to_string(), "A-Z".to_string()];
        let transform = CommandTransform::from_argv(&argv).unwrap();
        assert_eq!(transform.transform("shout").await, "SHOUT");
    }

    #[tokio::test]
    async fn test_command_transform_missing_program() {
        let argv = vec!["feedrelay-no-such-program".to_string()];
        let transform = CommandTransform::from_argv(&argv).unwrap();
        assert!(transform.transform("x").await.starts_with("Could not run transform"));
    }
}
