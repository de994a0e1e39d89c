//! Context budgeter

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::knowledge::{KnowledgeFragment, KnowledgeSource, NoKnowledge, WorkedExample};
use crate::config::ContextConfig;
use crate::domain::{
    AnticipationGuidance, BehaviorProfile, Chapter, ConversationTurn, Goal, ProjectRecord, SystemConflict, TurnPlan,
};

const GUIDANCE_LIMIT: usize = 2;
const FRAGMENT_LIMIT: usize = 3;
const EXAMPLE_LIMIT: usize = 2;

/// Per-item framing the prompt template adds (labels, bullets, newlines)
const ITEM_OVERHEAD: usize = 2;

/// Everything the budgeter may draw from
#[derive(Debug, Clone, Copy)]
pub struct BudgetInput<'a> {
    pub plan: &'a TurnPlan,
    pub profile: &'a BehaviorProfile,
    pub record: &'a ProjectRecord,
    pub history: &'a [ConversationTurn],
    pub query: &'a str,
    pub focused_chapter: Option<Chapter>,
    /// Absolute field path, e.g. `budget.totalBudget`
    pub focused_field: Option<&'a str>,
}

/// Budgeted context for one model call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrunedContext {
    pub pruned_chapter_answers: BTreeMap<Chapter, Value>,
    pub pruned_history: Vec<ConversationTurn>,
    pub conflicts: Vec<SystemConflict>,
    pub guidance: Vec<AnticipationGuidance>,
    pub fragments: Vec<KnowledgeFragment>,
    pub examples: Vec<WorkedExample>,
    pub query: String,
    /// Reserved floor plus everything selected; always below the ceiling
    pub token_estimate: usize,
    pub prune_log: Vec<String>,
    pub focused_chapter: Option<Chapter>,
    pub focused_field: Option<String>,
    /// Set when only the focused chapter (or field) could be kept
    pub minimal: bool,
}

/// Running token account
struct Allocation {
    limit: usize,
    used: usize,
    log: Vec<String>,
}

impl Allocation {
    fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    fn take(&mut self, tokens: usize) -> bool {
        if self.used + tokens <= self.limit {
            self.used += tokens;
            true
        } else {
            false
        }
    }

    fn prune(&mut self, what: String) {
        debug!(%what, "ContextBudgeter: pruned");
        self.log.push(what);
    }
}

/// Selects context fragments under a hard token ceiling
#[derive(Clone)]
pub struct ContextBudgeter {
    ceiling: usize,
    reserved: usize,
    chars_per_token: usize,
    knowledge: Arc<dyn KnowledgeSource>,
}

impl Default for ContextBudgeter {
    fn default() -> Self {
        Self::new(&ContextConfig::default(), Arc::new(NoKnowledge))
    }
}

impl ContextBudgeter {
    pub fn new(config: &ContextConfig, knowledge: Arc<dyn KnowledgeSource>) -> Self {
        let ceiling = config.ceiling_tokens.max(2);
        Self {
            ceiling,
            reserved: config.reserved_tokens.min(ceiling - 1),
            chars_per_token: config.chars_per_token.max(1),
            knowledge,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Token-equivalents for a piece of text
    pub fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    fn chapter_tokens(&self, chapter: Chapter, value: &Value) -> usize {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_default();
        self.estimate(chapter.key()) + self.estimate(&rendered) + ITEM_OVERHEAD
    }

    fn turn_tokens(&self, turn: &ConversationTurn) -> usize {
        self.estimate(&turn.content) + ITEM_OVERHEAD
    }

    fn conflict_tokens(&self, conflict: &SystemConflict) -> usize {
        self.estimate(&conflict.description) + self.estimate(&conflict.suggested_resolution) + ITEM_OVERHEAD
    }

    fn guidance_tokens(&self, guidance: &AnticipationGuidance) -> usize {
        self.estimate(&guidance.question) + self.estimate(&guidance.reasoning) + ITEM_OVERHEAD
    }

    /// Assemble the context for one call
    pub fn budget(&self, input: BudgetInput<'_>) -> PrunedContext {
        debug!(
            goal = %input.plan.goal,
            focused_chapter = ?input.focused_chapter,
            history = input.history.len(),
            "ContextBudgeter::budget: called"
        );
        let limit = self.ceiling - 1 - self.reserved;
        let mut alloc = Allocation {
            limit,
            used: self.metadata_overflow(input),
            log: Vec::new(),
        };

        let mut ctx = PrunedContext {
            focused_chapter: input.focused_chapter,
            focused_field: input.focused_field.map(str::to_string),
            ..Default::default()
        };

        // Focused chapter first: never pruned
        if let Some(chapter) = input.focused_chapter {
            let answers = focused_answers(input.record, chapter);
            if !alloc.take(self.chapter_tokens(chapter, &answers)) {
                return self.minimal(input, alloc);
            }
            ctx.pruned_chapter_answers.insert(chapter, answers);
        }

        // Blocking conflicts are never traded away for other content
        if input.plan.goal == Goal::SurfaceRisks {
            for conflict in input.plan.system_conflicts.iter().filter(|c| c.is_blocking()) {
                if !alloc.take(self.conflict_tokens(conflict)) {
                    return self.minimal(input, alloc);
                }
                ctx.conflicts.push(conflict.clone());
            }
        }

        ctx.query = self.fit_query(input.query, &mut alloc);

        match input.plan.goal {
            Goal::SurfaceRisks => {
                for conflict in input.plan.system_conflicts.iter().filter(|c| !c.is_blocking()) {
                    if alloc.take(self.conflict_tokens(conflict)) {
                        ctx.conflicts.push(conflict.clone());
                    } else {
                        alloc.prune(format!("conflict {} ({}): over budget", conflict.id, conflict.severity));
                    }
                }
                alloc.prune("knowledge: excluded while surfacing risks".to_string());
                ctx.pruned_history = self.recent_history(input.history, 1, &mut alloc);
            }
            Goal::AnticipateAndGuide => {
                for guidance in input.plan.anticipation_guidance.iter().take(GUIDANCE_LIMIT) {
                    if alloc.take(self.guidance_tokens(guidance)) {
                        ctx.guidance.push(guidance.clone());
                    } else {
                        alloc.prune(format!("guidance {}: over budget", guidance.id));
                    }
                }
                ctx.pruned_history = self.recent_history(input.history, 2, &mut alloc);
            }
            Goal::FillData => {
                for fragment in self.knowledge.fragments(input.query, input.focused_chapter, FRAGMENT_LIMIT) {
                    if alloc.take(self.estimate(&fragment.content) + ITEM_OVERHEAD) {
                        ctx.fragments.push(fragment);
                    } else {
                        alloc.prune(format!("fragment {}: over budget", fragment.id));
                    }
                }
                for example in self.knowledge.examples(input.query, input.focused_chapter, EXAMPLE_LIMIT) {
                    if alloc.take(self.estimate(&example.content) + ITEM_OVERHEAD) {
                        ctx.examples.push(example);
                    } else {
                        alloc.prune(format!("example {}: over budget", example.id));
                    }
                }
                ctx.pruned_history = self.recent_history(input.history, 1, &mut alloc);
            }
            Goal::OfferAlternatives | Goal::Clarify => {
                ctx.pruned_history = self.recent_history(input.history, 3, &mut alloc);
            }
        }

        // Remaining chapters: those named by the plan first, then questionnaire order
        for chapter in self.chapter_order(input) {
            let Some(answers) = input.record.chapter(chapter) else {
                continue;
            };
            let tokens = self.chapter_tokens(chapter, answers);
            if alloc.take(tokens) {
                ctx.pruned_chapter_answers.insert(chapter, answers.clone());
            } else {
                alloc.prune(format!("chapter {}: ~{} tokens over budget", chapter, tokens));
            }
        }

        ctx.token_estimate = self.reserved + alloc.used;
        ctx.prune_log = alloc.log;
        debug!(
            token_estimate = ctx.token_estimate,
            pruned = ctx.prune_log.len(),
            "ContextBudgeter::budget: done"
        );
        ctx
    }

    /// Degraded context: focused chapter (or only the focused field)
    fn minimal(&self, input: BudgetInput<'_>, pruned: Allocation) -> PrunedContext {
        warn!(
            goal = %input.plan.goal,
            focused_chapter = ?input.focused_chapter,
            focused_field = ?input.focused_field,
            "ContextBudgeter: allocation does not fit, degrading to minimal context"
        );
        // Restart from the metadata floor, keeping what was already logged
        let mut alloc = Allocation {
            limit: pruned.limit,
            used: self.metadata_overflow(input),
            log: pruned.log,
        };
        alloc.prune("degraded to minimal context".to_string());

        let mut ctx = PrunedContext {
            focused_chapter: input.focused_chapter,
            focused_field: input.focused_field.map(str::to_string),
            minimal: true,
            ..Default::default()
        };

        if let Some(chapter) = input.focused_chapter {
            let answers = focused_answers(input.record, chapter);
            if alloc.take(self.chapter_tokens(chapter, &answers)) {
                ctx.pruned_chapter_answers.insert(chapter, answers);
            } else {
                alloc.prune(format!("chapter {}: only the focused field kept", chapter));
                match self.focused_field_only(input, chapter, alloc.remaining()) {
                    Some((field, tokens)) if alloc.take(tokens) => {
                        ctx.pruned_chapter_answers.insert(chapter, field);
                    }
                    _ => alloc.prune(format!("chapter {}: focused field does not fit", chapter)),
                }
            }
        }

        for conflict in input.plan.system_conflicts.iter().filter(|c| c.is_blocking()) {
            if alloc.take(self.conflict_tokens(conflict)) {
                ctx.conflicts.push(conflict.clone());
            } else {
                alloc.prune(format!("conflict {}: no room in minimal context", conflict.id));
            }
        }

        ctx.query = self.fit_query(input.query, &mut alloc);
        alloc.prune("history, guidance and knowledge: excluded in minimal context".to_string());

        ctx.token_estimate = self.reserved + alloc.used;
        ctx.prune_log = alloc.log;
        info!(token_estimate = ctx.token_estimate, "ContextBudgeter: minimal context assembled");
        ctx
    }

    /// Profile and plan metadata beyond the reserved floor
    fn metadata_overflow(&self, input: BudgetInput<'_>) -> usize {
        let meta = self.estimate(&input.profile.directive())
            + self.estimate(&input.plan.reasoning)
            + self.estimate(input.plan.goal.as_str());
        meta.saturating_sub(self.reserved)
    }

    /// Keep the query, truncating it when it alone would break the budget
    fn fit_query(&self, query: &str, alloc: &mut Allocation) -> String {
        let tokens = self.estimate(query);
        if alloc.take(tokens) {
            return query.to_string();
        }
        let max_chars = alloc.remaining() * self.chars_per_token;
        let truncated = truncate_chars(query, max_chars);
        alloc.used += self.estimate(&truncated).min(alloc.remaining());
        alloc.prune(format!("query: truncated from {} to {} characters", query.chars().count(), truncated.chars().count()));
        truncated
    }

    /// Last `window` turns, newest kept first when space runs out
    fn recent_history(&self, history: &[ConversationTurn], window: usize, alloc: &mut Allocation) -> Vec<ConversationTurn> {
        let start = history.len().saturating_sub(window);
        if start > 0 {
            alloc.prune(format!("history: {} older turn(s) outside the window of {}", start, window));
        }
        let mut kept = Vec::new();
        for (offset, turn) in history[start..].iter().enumerate().rev() {
            if alloc.take(self.turn_tokens(turn)) {
                kept.push(turn.clone());
            } else {
                alloc.prune(format!("history: turn {} over budget", start + offset));
            }
        }
        kept.reverse();
        kept
    }

    fn chapter_order(&self, input: BudgetInput<'_>) -> Vec<Chapter> {
        let mut order: Vec<Chapter> = Vec::new();
        let named = input
            .plan
            .system_conflicts
            .iter()
            .flat_map(|c| c.affected_chapters.iter().copied())
            .chain(input.plan.anticipation_guidance.iter().map(|g| g.chapter));
        for chapter in named.chain(Chapter::ALL) {
            if Some(chapter) != input.focused_chapter && !order.contains(&chapter) {
                order.push(chapter);
            }
        }
        order
    }

    /// Chapter object holding only the focused field, truncated to fit
    ///
    /// Sized on the rendered (pretty-printed, escaped) form, so the returned
    /// token count is what the prompt will actually carry.
    fn focused_field_only(&self, input: BudgetInput<'_>, chapter: Chapter, remaining_tokens: usize) -> Option<(Value, usize)> {
        let Some(path) = input.focused_field else {
            let empty = Value::Object(Map::new());
            let tokens = self.chapter_tokens(chapter, &empty);
            return (tokens <= remaining_tokens).then_some((empty, tokens));
        };
        let relative = path
            .strip_prefix(chapter.key())
            .and_then(|p| p.strip_prefix('.'))
            .unwrap_or(path);
        let value = input.record.field(path).cloned().unwrap_or(Value::Null);

        let sized = |value: Value| {
            let nested = nest(relative, value);
            let tokens = self.chapter_tokens(chapter, &nested);
            (nested, tokens)
        };
        let whole = sized(value.clone());
        if whole.1 <= remaining_tokens {
            return Some(whole);
        }

        let text = match &value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        };
        // Longest prefix whose rendered form fits
        let mut best = None;
        let (mut lo, mut hi) = (0usize, text.chars().count());
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let candidate = sized(Value::String(truncate_chars(&text, mid)));
            if candidate.1 <= remaining_tokens {
                best = Some(candidate);
                lo = mid + 1;
            } else if mid == 0 {
                break;
            } else {
                hi = mid - 1;
            }
        }
        best
    }
}

/// Answers of the focused chapter; an unanswered chapter is an empty object
fn focused_answers(record: &ProjectRecord, chapter: Chapter) -> Value {
    record
        .chapter(chapter)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Build `{"a": {"b": value}}` from `a.b`
fn nest(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, key| {
        let mut map = Map::new();
        map.insert(key.to_string(), inner);
        Value::Object(map)
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::knowledge::{KnowledgeEntry, StaticKnowledge};
    use crate::domain::{ConflictKind, Route, Severity};
    use serde_json::json;

    fn plan(goal: Goal) -> TurnPlan {
        TurnPlan {
            goal,
            priority: 5,
            route: Route::Normal,
            allow_patches: true,
            reasoning: "test".to_string(),
            system_conflicts: vec![],
            anticipation_guidance: None,
        }
    }

    fn conflict(id: &str, severity: Severity, text_len: usize) -> SystemConflict {
        SystemConflict {
            id: id.to_string(),
            kind: ConflictKind::BudgetRisk,
            severity,
            description: "x".repeat(text_len),
            affected_fields: vec![],
            affected_chapters: vec![Chapter::Wishes],
            suggested_resolution: "fix".to_string(),
        }
    }

    fn record() -> ProjectRecord {
        ProjectRecord::new()
            .with_chapter(Chapter::Basics, json!({"projectType": "renovation"}))
            .with_chapter(Chapter::Budget, json!({"totalBudget": 200000}))
            .with_chapter(Chapter::Wishes, json!({"wishes": [{"title": "Sauna"}]}))
    }

    fn history(n: usize) -> Vec<ConversationTurn> {
        (0..n).map(|i| ConversationTurn::user(format!("message {}", i))).collect()
    }

    fn input<'a>(
        plan: &'a TurnPlan,
        profile: &'a BehaviorProfile,
        record: &'a ProjectRecord,
        history: &'a [ConversationTurn],
    ) -> BudgetInput<'a> {
        BudgetInput {
            plan,
            profile,
            record,
            history,
            query: "What should I do next?",
            focused_chapter: Some(Chapter::Budget),
            focused_field: Some("budget.totalBudget"),
        }
    }

    #[test]
    fn test_small_context_keeps_everything() {
        let plan = plan(Goal::Clarify);
        let profile = BehaviorProfile::default();
        let record = record();
        let history = history(5);
        let ctx = ContextBudgeter::default().budget(input(&plan, &profile, &record, &history));

        assert_eq!(ctx.pruned_chapter_answers.len(), 3);
        assert_eq!(ctx.pruned_history.len(), 3);
        assert_eq!(ctx.pruned_history[2].content, "message 4");
        assert!(ctx.token_estimate < 4000);
        assert!(ctx.token_estimate >= 500);
        assert!(ctx.prune_log.iter().any(|l| l.contains("2 older turn(s)")));
        assert!(!ctx.minimal);
    }

    #[test]
    fn test_goal_history_windows() {
        let profile = BehaviorProfile::default();
        let record = record();
        let history = history(5);
        let budgeter = ContextBudgeter::default();

        let guide = plan(Goal::AnticipateAndGuide);
        assert_eq!(budgeter.budget(input(&guide, &profile, &record, &history)).pruned_history.len(), 2);
        let fill = plan(Goal::FillData);
        assert_eq!(budgeter.budget(input(&fill, &profile, &record, &history)).pruned_history.len(), 1);
    }

    #[test]
    fn test_surface_risks_excludes_knowledge_and_keeps_blocking() {
        let knowledge = StaticKnowledge::new(vec![KnowledgeEntry {
            id: "k1".to_string(),
            chapter: None,
            content: "What should happen next is a reserve.".to_string(),
            example: false,
        }]);
        let budgeter = ContextBudgeter::new(
            &ContextConfig {
                ceiling_tokens: 1000,
                reserved_tokens: 500,
                chars_per_token: 4,
            },
            Arc::new(knowledge),
        );
        let mut surface = plan(Goal::SurfaceRisks);
        surface.system_conflicts = vec![
            conflict("warn", Severity::Warning, 1200),
            conflict("block", Severity::Blocking, 800),
        ];
        let profile = BehaviorProfile::default();
        let record = record();
        let ctx = budgeter.budget(input(&surface, &profile, &record, &[]));

        assert!(ctx.fragments.is_empty());
        let ids: Vec<_> = ctx.conflicts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["block"]);
        assert!(ctx.prune_log.iter().any(|l| l.starts_with("conflict warn")));
        assert!(ctx.token_estimate < 1000);
    }

    #[test]
    fn test_fill_data_uses_knowledge() {
        let knowledge = StaticKnowledge::new(vec![
            KnowledgeEntry {
                id: "k1".to_string(),
                chapter: Some(Chapter::Budget),
                content: "Budget reserve advice".to_string(),
                example: false,
            },
            KnowledgeEntry {
                id: "ex1".to_string(),
                chapter: Some(Chapter::Budget),
                content: "budget example".to_string(),
                example: true,
            },
        ]);
        let budgeter = ContextBudgeter::new(&ContextConfig::default(), Arc::new(knowledge));
        let fill = plan(Goal::FillData);
        let profile = BehaviorProfile::default();
        let record = record();
        let mut input = input(&fill, &profile, &record, &[]);
        input.query = "Our budget is 250k";
        let ctx = budgeter.budget(input);
        assert_eq!(ctx.fragments.len(), 1);
        assert_eq!(ctx.examples.len(), 1);
    }

    #[test]
    fn test_large_chapters_are_pruned_but_focus_kept() {
        let big = json!({"notes": "y".repeat(20_000)});
        let record = record().with_chapter(Chapter::Technical, big);
        let clarify = plan(Goal::Clarify);
        let profile = BehaviorProfile::default();
        let ctx = ContextBudgeter::default().budget(input(&clarify, &profile, &record, &[]));

        assert!(ctx.pruned_chapter_answers.contains_key(&Chapter::Budget));
        assert!(!ctx.pruned_chapter_answers.contains_key(&Chapter::Technical));
        assert!(ctx.prune_log.iter().any(|l| l.starts_with("chapter technical")));
        assert!(ctx.token_estimate < 4000);
    }

    #[test]
    fn test_oversized_focus_degrades_to_field() {
        let record = ProjectRecord::new().with_chapter(
            Chapter::Budget,
            json!({"totalBudget": 200000, "notes": "z".repeat(40_000)}),
        );
        let clarify = plan(Goal::Clarify);
        let profile = BehaviorProfile::default();
        let history = history(3);
        let ctx = ContextBudgeter::default().budget(input(&clarify, &profile, &record, &history));

        assert!(ctx.minimal);
        assert_eq!(ctx.pruned_chapter_answers[&Chapter::Budget], json!({"totalBudget": 200000}));
        assert!(ctx.pruned_history.is_empty());
        assert!(ctx.token_estimate < 4000);
    }

    #[test]
    fn test_oversized_focused_field_is_truncated() {
        let record = ProjectRecord::new().with_chapter(Chapter::Budget, json!({"notes": "z".repeat(40_000)}));
        let clarify = plan(Goal::Clarify);
        let profile = BehaviorProfile::default();
        let mut input = input(&clarify, &profile, &record, &[]);
        input.focused_field = Some("budget.notes");
        let ctx = ContextBudgeter::default().budget(input);

        assert!(ctx.minimal);
        let notes = ctx.pruned_chapter_answers[&Chapter::Budget]["notes"].as_str().unwrap();
        assert!(notes.ends_with('…'));
        assert!(ctx.token_estimate < 4000);
    }

    #[test]
    fn test_escaped_focused_field_is_sized_as_rendered() {
        let budgeter = ContextBudgeter::default();
        for notes in ["\"".repeat(40_000), "line\n".repeat(8_000)] {
            let record = ProjectRecord::new().with_chapter(Chapter::Budget, json!({ "notes": notes }));
            let clarify = plan(Goal::Clarify);
            let profile = BehaviorProfile::default();
            let mut input = input(&clarify, &profile, &record, &[]);
            input.focused_field = Some("budget.notes");
            let ctx = budgeter.budget(input);

            assert!(ctx.minimal);
            let answers = &ctx.pruned_chapter_answers[&Chapter::Budget];
            assert!(answers["notes"].as_str().unwrap().ends_with('…'));
            let carried = 500 + budgeter.chapter_tokens(Chapter::Budget, answers) + budgeter.estimate(&ctx.query);
            assert!(carried <= ctx.token_estimate);
            assert!(ctx.token_estimate < 4000);
        }
    }

    #[test]
    fn test_nest() {
        assert_eq!(nest("a.b", json!(1)), json!({"a": {"b": 1}}));
        assert_eq!(nest("a", json!(1)), json!({"a": 1}));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_goal() -> impl Strategy<Value = Goal> {
            prop_oneof![
                Just(Goal::FillData),
                Just(Goal::AnticipateAndGuide),
                Just(Goal::SurfaceRisks),
                Just(Goal::OfferAlternatives),
                Just(Goal::Clarify),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// The estimate stays under the ceiling and the focused chapter survives
            #[test]
            fn prop_ceiling_and_focus(
                goal in arb_goal(),
                ceiling in 600usize..6000,
                sizes in proptest::collection::vec(0usize..30_000, 7),
                turns in proptest::collection::vec(0usize..4_000, 0..12),
                conflict_sizes in proptest::collection::vec(0usize..6_000, 0..4),
                query_len in 0usize..20_000,
                focus_idx in 0usize..7,
            ) {
                let mut record = ProjectRecord::new();
                for (chapter, size) in Chapter::ALL.iter().zip(&sizes) {
                    record = record.with_chapter(*chapter, json!({"notes": "n".repeat(*size)}));
                }
                let focused = Chapter::ALL[focus_idx];
                let history: Vec<ConversationTurn> =
                    turns.iter().map(|n| ConversationTurn::assistant("h".repeat(*n))).collect();
                let mut plan = plan(goal);
                plan.system_conflicts = conflict_sizes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| conflict(&format!("c{}", i), Severity::Blocking, *n))
                    .collect();
                let profile = BehaviorProfile::default();
                let query = "q".repeat(query_len);
                let field = format!("{}.notes", focused.key());
                let budgeter = ContextBudgeter::new(
                    &ContextConfig { ceiling_tokens: ceiling, reserved_tokens: 500, chars_per_token: 4 },
                    Arc::new(NoKnowledge),
                );

                let ctx = budgeter.budget(BudgetInput {
                    plan: &plan,
                    profile: &profile,
                    record: &record,
                    history: &history,
                    query: &query,
                    focused_chapter: Some(focused),
                    focused_field: Some(&field),
                });

                prop_assert!(ctx.token_estimate < ceiling);
                prop_assert!(ctx.pruned_chapter_answers.contains_key(&focused));
            }
        }
    }
}
