//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults, then renders them with Handlebars.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// One chapter of the pruned project record
#[derive(Debug, Clone, Serialize)]
pub struct ChapterSection {
    pub key: String,
    /// Pretty-printed JSON answers
    pub answers: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictLine {
    pub severity: String,
    pub description: String,
    pub resolution: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuidanceLine {
    pub question: String,
    pub reasoning: String,
}

/// A knowledge fragment or worked example
#[derive(Debug, Clone, Serialize)]
pub struct FragmentLine {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryLine {
    pub role: String,
    pub content: String,
}

/// Context for rendering prompt templates
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub tone_rules: Vec<String>,
    pub behavior_directive: String,
    pub goal: String,
    pub goal_instruction: String,
    pub conflicts: Vec<ConflictLine>,
    pub guidance: Vec<GuidanceLine>,
    pub focused_chapter: Option<String>,
    pub focused_field: Option<String>,
    pub chapters: Vec<ChapterSection>,
    pub knowledge: Vec<FragmentLine>,
    pub examples: Vec<FragmentLine>,
    pub history: Vec<HistoryLine>,
    pub allow_patches: bool,
    /// Appended on retries after a failed validation
    pub corrective: Option<String>,
    /// Trigger of a system-initiated turn
    pub event_type: Option<String>,
    pub event_chapter: Option<String>,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.buildwise/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that honours `.buildwise/prompts/` under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".buildwise").join("prompts");
        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            user_dir: user_dir_exists.then_some(user_dir),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.buildwise/prompts/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, goal = %context.goal, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}
