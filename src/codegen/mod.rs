//! Writing fenced code blocks from a response to disk.
//!
//! [`CodeExtractor::materialize`] finds every code block in a response, picks a
//! target path for each, and writes the body there. When a target already
//! exists the caller's [`ConflictResolver`] decides whether to overwrite,
//! append or skip. A block that cannot be written is recorded in
//! [`Extraction::failures`] and the remaining blocks still go out.

mod fence;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use utf8path::Component;

use crate::error::{Error, Result};
use crate::observability::{
    CODEGEN_FAILURES, CODEGEN_FILES_APPENDED, CODEGEN_FILES_SKIPPED, CODEGEN_FILES_WRITTEN,
};

pub use fence::{CodeBlock, extension_for, extract_blocks};

/// How a file was materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The file was created or overwritten.
    Write,
    /// The block was appended to an existing file.
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Write => write!(f, "write"),
            WriteMode::Append => write!(f, "append"),
        }
    }
}

/// A file written from a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Whether the block was written or appended.
    pub mode: WriteMode,
}

/// A block that could not be written.
#[derive(Debug, Clone)]
pub struct BlockFailure {
    /// The path as inferred from the block.
    pub path: String,
    /// What went wrong.
    pub error: Error,
}

/// What to do when a block's target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Replace the file with the block.
    Overwrite,
    /// Append the block to the file.
    Append,
    /// Leave the file alone.
    Skip,
}

impl std::str::FromStr for ConflictDecision {
    type Err = String;

    /// Accepts `o`/`overwrite`, `a`/`append` or `s`/`skip`, case-insensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "o" | "overwrite" => Ok(ConflictDecision::Overwrite),
            "a" | "append" => Ok(ConflictDecision::Append),
            "s" | "skip" => Ok(ConflictDecision::Skip),
            other => Err(format!("expected o, a or s, got {other:?}")),
        }
    }
}

/// Decides conflicts for existing files, one block at a time.
#[async_trait::async_trait(?Send)]
pub trait ConflictResolver {
    /// Decide what to do with the existing file at `path`.
    async fn resolve(&mut self, path: &Path) -> ConflictDecision;
}

/// Resolves every conflict the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub ConflictDecision);

#[async_trait::async_trait(?Send)]
impl ConflictResolver for FixedDecision {
    async fn resolve(&mut self, _: &Path) -> ConflictDecision {
        self.0
    }
}

/// Where code blocks may be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathPolicy {
    /// Only inside the root: no `..` components, no absolute paths elsewhere.
    #[default]
    Confined,
    /// Anywhere the model names, absolute paths included.
    Permissive,
}

/// The outcome of materializing one response.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Files written or appended, in document order.
    pub files: Vec<GeneratedFile>,
    /// Existing files the resolver chose to leave alone.
    pub skipped: Vec<PathBuf>,
    /// Blocks that could not be written.
    pub failures: Vec<BlockFailure>,
}

/// Writes code blocks under a root directory.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    root: PathBuf,
    policy: PathPolicy,
}

impl CodeExtractor {
    /// Creates an extractor rooted at `root`, made absolute against the
    /// current directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        Ok(Self {
            root,
            policy: PathPolicy::default(),
        })
    }

    /// Sets the path policy.
    pub fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The directory relative paths resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turns a path inferred from a block into an absolute target.
    pub fn resolve_path(&self, raw: &str) -> Result<PathBuf> {
        if self.policy == PathPolicy::Confined {
            let components = utf8path::Path::from(raw);
            if components
                .components()
                .any(|c| matches!(c, Component::AppDefined))
            {
                return Err(Error::path_rejected(raw, "// paths are not supported"));
            }
            if components
                .components()
                .any(|c| matches!(c, Component::ParentDir))
            {
                return Err(Error::path_rejected(raw, ".. path name prohibited"));
            }
        }
        let path = Path::new(raw);
        if !path.is_absolute() {
            return Ok(self.root.join(path));
        }
        if self.policy == PathPolicy::Confined && !path.starts_with(&self.root) {
            return Err(Error::path_rejected(
                raw,
                format!("absolute path outside {}", self.root.display()),
            ));
        }
        Ok(path.to_path_buf())
    }

    /// Writes every code block in `text`.
    pub async fn materialize<R>(&self, text: &str, resolver: &mut R) -> Extraction
    where
        R: ConflictResolver + ?Sized,
    {
        let mut extraction = Extraction::default();
        for block in extract_blocks(text) {
            match self.materialize_block(&block, resolver).await {
                Ok(BlockOutcome::Written(file)) => {
                    match file.mode {
                        WriteMode::Write => CODEGEN_FILES_WRITTEN.click(),
                        WriteMode::Append => CODEGEN_FILES_APPENDED.click(),
                    }
                    tracing::info!(path = %file.path.display(), mode = %file.mode, "code block written");
                    extraction.files.push(file);
                }
                Ok(BlockOutcome::Skipped(path)) => {
                    CODEGEN_FILES_SKIPPED.click();
                    tracing::info!(path = %path.display(), "existing file skipped");
                    extraction.skipped.push(path);
                }
                Err(error) => {
                    CODEGEN_FAILURES.click();
                    tracing::debug!(path = %block.path, error = %error, "code block not written");
                    extraction.failures.push(BlockFailure {
                        path: block.path,
                        error,
                    });
                }
            }
        }
        extraction
    }

    async fn materialize_block<R>(
        &self,
        block: &CodeBlock,
        resolver: &mut R,
    ) -> Result<BlockOutcome>
    where
        R: ConflictResolver + ?Sized,
    {
        let path = self.resolve_path(&block.path)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        let mode = if !exists {
            WriteMode::Write
        } else {
            match resolver.resolve(&path).await {
                ConflictDecision::Overwrite => WriteMode::Write,
                ConflictDecision::Append => WriteMode::Append,
                ConflictDecision::Skip => return Ok(BlockOutcome::Skipped(path)),
            }
        };
        match mode {
            WriteMode::Write => write_file(&path, &block.body).await?,
            WriteMode::Append => append_file(&path, &block.body).await?,
        }
        Ok(BlockOutcome::Written(GeneratedFile { path, mode }))
    }
}

enum BlockOutcome {
    Written(GeneratedFile),
    Skipped(PathBuf),
}

fn io_error(path: &Path, err: io::Error) -> Error {
    Error::io(format!("{}: {err}", path.display()), err)
}

async fn write_file(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| io_error(path, e))
}

async fn append_file(path: &Path, body: &str) -> Result<()> {
    let existing = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    let mut chunk = String::with_capacity(body.len() + 2);
    if existing.last().is_some_and(|b| *b != b'\n') {
        chunk.push('\n');
    }
    chunk.push_str(body);
    if !chunk.is_empty() && !chunk.ends_with('\n') {
        chunk.push('\n');
    }
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(|e| io_error(path, e))?;
    file.write_all(chunk.as_bytes())
        .await
        .map_err(|e| io_error(path, e))?;
    file.flush().await.map_err(|e| io_error(path, e))
}

/// Writes every code block in `text` under `root` with the default policy.
pub async fn generate_files_from_output<R>(
    text: &str,
    root: impl AsRef<Path>,
    resolver: &mut R,
) -> Result<Extraction>
where
    R: ConflictResolver + ?Sized,
{
    Ok(CodeExtractor::new(root)?.materialize(text, resolver).await)
}
