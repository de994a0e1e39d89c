//! Knowledge collaborator

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Chapter;

/// A ranked knowledge fragment ("nugget")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeFragment {
    pub id: String,
    pub content: String,
    pub relevance_score: f64,
}

/// A worked example for data collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkedExample {
    pub id: String,
    pub content: String,
}

/// Pure lookup of fragments and examples for a query
pub trait KnowledgeSource: Send + Sync {
    /// Fragments ordered by descending relevance
    fn fragments(&self, query: &str, chapter: Option<Chapter>, limit: usize) -> Vec<KnowledgeFragment>;

    fn examples(&self, query: &str, chapter: Option<Chapter>, limit: usize) -> Vec<WorkedExample>;
}

/// Source that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKnowledge;

impl KnowledgeSource for NoKnowledge {
    fn fragments(&self, _query: &str, _chapter: Option<Chapter>, _limit: usize) -> Vec<KnowledgeFragment> {
        Vec::new()
    }

    fn examples(&self, _query: &str, _chapter: Option<Chapter>, _limit: usize) -> Vec<WorkedExample> {
        Vec::new()
    }
}

/// One entry of a static knowledge file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    #[serde(default)]
    pub chapter: Option<Chapter>,
    pub content: String,
    /// Worked examples are served separately from fragments
    #[serde(default)]
    pub example: bool,
}

/// In-memory knowledge ranked by keyword overlap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticKnowledge {
    pub entries: Vec<KnowledgeEntry>,
}

impl StaticKnowledge {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// Load entries from a YAML (or JSON) file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context(format!("Failed to read knowledge file {}", path.display()))?;
        let knowledge: Self = serde_yaml::from_str(&content).context("Failed to parse knowledge file")?;
        debug!(entries = knowledge.entries.len(), "StaticKnowledge::load: loaded");
        Ok(knowledge)
    }

    fn ranked(&self, query: &str, chapter: Option<Chapter>, examples: bool) -> Vec<(f64, &KnowledgeEntry)> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(f64, &KnowledgeEntry)> = self
            .entries
            .iter()
            .filter(|e| e.example == examples)
            .filter(|e| e.chapter.is_none() || chapter.is_none() || e.chapter == chapter)
            .map(|e| {
                let overlap = query_terms.intersection(&terms(&e.content)).count();
                if overlap == 0 {
                    return (0.0, e);
                }
                // Same-chapter entries rank above general ones
                let bonus = if chapter.is_some() && e.chapter == chapter { 0.25 } else { 0.0 };
                (overlap as f64 / query_terms.len() as f64 + bonus, e)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
    }
}

impl KnowledgeSource for StaticKnowledge {
    fn fragments(&self, query: &str, chapter: Option<Chapter>, limit: usize) -> Vec<KnowledgeFragment> {
        debug!(%query, ?chapter, limit, "StaticKnowledge::fragments: called");
        self.ranked(query, chapter, false)
            .into_iter()
            .take(limit)
            .map(|(score, e)| KnowledgeFragment {
                id: e.id.clone(),
                content: e.content.clone(),
                relevance_score: score,
            })
            .collect()
    }

    fn examples(&self, query: &str, chapter: Option<Chapter>, limit: usize) -> Vec<WorkedExample> {
        debug!(%query, ?chapter, limit, "StaticKnowledge::examples: called");
        self.ranked(query, chapter, true)
            .into_iter()
            .take(limit)
            .map(|(_, e)| WorkedExample {
                id: e.id.clone(),
                content: e.content.clone(),
            })
            .collect()
    }
}

/// Lower-cased words longer than three characters
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge() -> StaticKnowledge {
        StaticKnowledge::new(vec![
            KnowledgeEntry {
                id: "k-heat-pump".to_string(),
                chapter: Some(Chapter::Technical),
                content: "A heat pump needs low flow temperatures and good insulation.".to_string(),
                example: false,
            },
            KnowledgeEntry {
                id: "k-budget".to_string(),
                chapter: Some(Chapter::Budget),
                content: "Plan a budget reserve of 10 to 20 percent.".to_string(),
                example: false,
            },
            KnowledgeEntry {
                id: "ex-budget".to_string(),
                chapter: Some(Chapter::Budget),
                content: "User: our budget is 300k -> set budget.totalBudget = 300000".to_string(),
                example: true,
            },
        ])
    }

    #[test]
    fn test_fragments_ranked_by_overlap() {
        let fragments = knowledge().fragments("Is a heat pump possible without insulation?", None, 3);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].id, "k-heat-pump");
        assert!(fragments[0].relevance_score > 0.0);
    }

    #[test]
    fn test_chapter_filter_and_examples() {
        let k = knowledge();
        assert!(k.fragments("heat pump insulation", Some(Chapter::Budget), 3).is_empty());
        let examples = k.examples("budget", Some(Chapter::Budget), 2);
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].id, "ex-budget");
    }

    #[test]
    fn test_no_knowledge() {
        assert!(NoKnowledge.fragments("anything", None, 3).is_empty());
        assert!(NoKnowledge.examples("anything", None, 3).is_empty());
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.yml");
        fs::write(
            &path,
            "entries:\n  - id: k1\n    chapter: budget\n    content: Keep a reserve.\n",
        )
        .unwrap();
        let k = StaticKnowledge::load(&path).unwrap();
        assert_eq!(k.entries.len(), 1);
        assert_eq!(k.entries[0].chapter, Some(Chapter::Budget));
        assert!(!k.entries[0].example);
    }
}
