//! Anticipation advisor
//!
//! A static rule table. Each rule names the project types and chapters it
//! applies to, a predicate over the record and the guidance it produces.
//! Evaluation returns the single highest-priority match, so the user never
//! sees more than one proactive nudge per turn.

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{AnticipationGuidance, Chapter, Priority, ProjectRecord, ProjectType, RuleError};

type Predicate = fn(&ProjectRecord) -> Result<bool, RuleError>;

/// One row of the anticipation table
#[derive(Debug, Clone, Copy)]
pub struct AnticipationRule {
    pub id: &'static str,
    /// Empty means any project type
    pub project_types: &'static [ProjectType],
    /// Empty means any chapter
    pub chapters: &'static [Chapter],
    pub priority: Priority,
    pub chapter: Chapter,
    pub question: &'static str,
    pub reasoning: &'static str,
    pub related_fields: &'static [&'static str],
    pub predicate: Predicate,
}

impl AnticipationRule {
    fn applies_to(&self, project_type: Option<ProjectType>, chapter: Option<Chapter>) -> bool {
        let type_ok = self.project_types.is_empty() || project_type.is_some_and(|t| self.project_types.contains(&t));
        let chapter_ok = self.chapters.is_empty() || chapter.is_some_and(|c| self.chapters.contains(&c));
        type_ok && chapter_ok
    }

    fn guidance(&self) -> AnticipationGuidance {
        AnticipationGuidance {
            id: self.id.to_string(),
            priority: self.priority,
            chapter: self.chapter,
            question: self.question.to_string(),
            reasoning: self.reasoning.to_string(),
            related_fields: self.related_fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

const RULES: &[AnticipationRule] = &[
    AnticipationRule {
        id: "hazardous-materials-survey",
        project_types: &[ProjectType::Renovation, ProjectType::Extension],
        chapters: &[Chapter::Basics, Chapter::Technical, Chapter::Risks],
        priority: Priority::Critical,
        chapter: Chapter::Risks,
        question: "Has the building been checked for asbestos or other hazardous materials?",
        reasoning: "Buildings from before 1993 may contain asbestos; removal must be planned and priced before works start.",
        related_fields: &["basics.buildingYear", "risks.hazardousMaterialsSurvey"],
        predicate: needs_hazard_survey,
    },
    AnticipationRule {
        id: "building-permit",
        project_types: &[ProjectType::NewBuild, ProjectType::Extension],
        chapters: &[Chapter::Basics, Chapter::Risks],
        priority: Priority::Critical,
        chapter: Chapter::Basics,
        question: "Have you already clarified whether a building permit is required?",
        reasoning: "New buildings and extensions usually need a permit; approval times drive the whole schedule.",
        related_fields: &["basics.buildingPermit"],
        predicate: |r| Ok(!r.has_value("basics.buildingPermit")),
    },
    AnticipationRule {
        id: "structural-assessment",
        project_types: &[ProjectType::Extension],
        chapters: &[Chapter::Basics, Chapter::Rooms, Chapter::Technical],
        priority: Priority::High,
        chapter: Chapter::Technical,
        question: "Has a structural engineer assessed whether the existing building can carry the extension?",
        reasoning: "Extensions load existing walls and foundations; reinforcement can change cost and design.",
        related_fields: &["technical.structuralAssessment"],
        predicate: |r| Ok(!r.has_value("technical.structuralAssessment")),
    },
    AnticipationRule {
        id: "temporary-housing",
        project_types: &[ProjectType::Renovation],
        chapters: &[Chapter::Basics, Chapter::Risks],
        priority: Priority::High,
        chapter: Chapter::Risks,
        question: "Where will you live while the renovation is under way?",
        reasoning: "Living in the building during works limits what can be done at once and extends the schedule.",
        related_fields: &["basics.occupiedDuringWorks", "risks.temporaryHousing"],
        predicate: |r| {
            Ok(r.field("basics.occupiedDuringWorks") == Some(&Value::Bool(true)) && !r.has_value("risks.temporaryHousing"))
        },
    },
    AnticipationRule {
        id: "contingency-reserve",
        project_types: &[],
        chapters: &[Chapter::Budget],
        priority: Priority::High,
        chapter: Chapter::Budget,
        question: "How much of your budget do you want to hold back as a reserve for surprises?",
        reasoning: "A contingency of 10 to 20 percent is common; without it every surprise hits the wish list.",
        related_fields: &["budget.totalBudget", "budget.contingency"],
        predicate: |r| Ok(r.total_budget()?.is_some() && !r.has_value("budget.contingency")),
    },
    AnticipationRule {
        id: "heating-system",
        project_types: &[ProjectType::NewBuild, ProjectType::Renovation],
        chapters: &[Chapter::Technical, Chapter::Sustainability],
        priority: Priority::High,
        chapter: Chapter::Technical,
        question: "Which heating system are you leaning towards?",
        reasoning: "The heating choice determines insulation needs, subsidies and running costs.",
        related_fields: &["technical.heating"],
        predicate: |r| Ok(!r.has_value("technical.heating")),
    },
    AnticipationRule {
        id: "financing",
        project_types: &[],
        chapters: &[Chapter::Budget],
        priority: Priority::Medium,
        chapter: Chapter::Budget,
        question: "Is the financing already confirmed, or is part of the budget still a loan request?",
        reasoning: "An unconfirmed loan makes every budget figure provisional.",
        related_fields: &["budget.financing"],
        predicate: |r| Ok(r.total_budget()?.is_some() && !r.has_value("budget.financing")),
    },
    AnticipationRule {
        id: "energy-standard",
        project_types: &[ProjectType::NewBuild, ProjectType::Renovation],
        chapters: &[Chapter::Sustainability],
        priority: Priority::Medium,
        chapter: Chapter::Sustainability,
        question: "Which energy standard should the finished building reach?",
        reasoning: "The target standard decides insulation, windows and which subsidies apply.",
        related_fields: &["sustainability.energyStandard"],
        predicate: |r| Ok(!r.has_value("sustainability.energyStandard")),
    },
    AnticipationRule {
        id: "subsidies",
        project_types: &[ProjectType::Renovation],
        chapters: &[Chapter::Sustainability, Chapter::Budget],
        priority: Priority::Medium,
        chapter: Chapter::Budget,
        question: "Have you checked which subsidies your energy upgrade qualifies for?",
        reasoning: "Subsidies usually have to be applied for before contracts are signed.",
        related_fields: &["sustainability.energyStandard", "budget.subsidies"],
        predicate: |r| Ok(r.has_value("sustainability.energyStandard") && !r.has_value("budget.subsidies")),
    },
    AnticipationRule {
        id: "room-sizes",
        project_types: &[],
        chapters: &[Chapter::Rooms],
        priority: Priority::Medium,
        chapter: Chapter::Rooms,
        question: "Roughly how large should the rooms without a size be?",
        reasoning: "Room sizes are needed to check the plan against the available area and the budget.",
        related_fields: &["rooms.rooms"],
        predicate: |r| Ok(r.rooms()?.iter().any(|room| room.area.is_none())),
    },
];

fn needs_hazard_survey(record: &ProjectRecord) -> Result<bool, RuleError> {
    let Some(year) = record.amount("basics.buildingYear")? else {
        return Ok(false);
    };
    Ok(year < 1993.0 && !record.has_value("risks.hazardousMaterialsSurvey"))
}

/// Evaluates the anticipation table
#[derive(Debug, Clone, Copy)]
pub struct AnticipationAdvisor {
    rules: &'static [AnticipationRule],
}

impl Default for AnticipationAdvisor {
    fn default() -> Self {
        Self { rules: RULES }
    }
}

impl AnticipationAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advisor over a custom table
    pub fn with_rules(rules: &'static [AnticipationRule]) -> Self {
        Self { rules }
    }

    /// Top guidance for the record's current chapter, if any
    pub fn evaluate(&self, record: &ProjectRecord) -> Option<AnticipationGuidance> {
        self.evaluate_for(record, record.current_chapter)
    }

    /// Top guidance for an explicit context chapter
    pub fn evaluate_for(&self, record: &ProjectRecord, chapter: Option<Chapter>) -> Option<AnticipationGuidance> {
        let project_type = record.project_type();
        debug!(?project_type, ?chapter, "AnticipationAdvisor::evaluate_for: called");

        let mut matches: Vec<&AnticipationRule> = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(project_type, chapter))
            .filter(|rule| match (rule.predicate)(record) {
                Ok(hit) => hit,
                Err(e) => {
                    warn!(rule = rule.id, error = %e, "AnticipationAdvisor: predicate failed, treating as no match");
                    false
                }
            })
            .collect();

        // Stable: table order breaks ties within a priority
        matches.sort_by(|a, b| b.priority.cmp(&a.priority));
        let top = matches.first().map(|rule| rule.guidance());
        debug!(matched = matches.len(), top = ?top.as_ref().map(|g| &g.id), "AnticipationAdvisor::evaluate_for: done");
        top
    }
}
