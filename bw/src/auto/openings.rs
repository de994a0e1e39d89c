//! Chapter openings for `chapter_entered` auto-turns

use crate::domain::Chapter;

/// One opening per chapter
#[derive(Debug, Clone, Copy)]
pub struct ChapterOpening {
    pub chapter: Chapter,
    pub context: &'static str,
    pub insight: &'static str,
    pub action: &'static str,
}

pub const OPENINGS: &[ChapterOpening] = &[
    ChapterOpening {
        chapter: Chapter::Basics,
        context: "You are starting with the basics of your project.",
        insight: "Project type, location and plot size decide which rules and costs apply later on.",
        action: "What kind of project are you planning: new build, renovation or extension?",
    },
    ChapterOpening {
        chapter: Chapter::Rooms,
        context: "You have opened the room planning.",
        insight: "The number and size of rooms must fit the buildable area you declared.",
        action: "Which room matters most to you, so we can start with it?",
    },
    ChapterOpening {
        chapter: Chapter::Wishes,
        context: "You are now collecting your wishes.",
        insight: "Marking wishes as must, should or nice keeps the budget under control.",
        action: "Which wish is an absolute must for you?",
    },
    ChapterOpening {
        chapter: Chapter::Budget,
        context: "You have reached the budget chapter.",
        insight: "A realistic total, including a reserve of about 10 to 15 percent, protects the project from stalling.",
        action: "What total budget do you have in mind, including your own funds and financing?",
    },
    ChapterOpening {
        chapter: Chapter::Technical,
        context: "You are looking at the technical systems.",
        insight: "Heating, ventilation and electrics are hard to change once walls are closed.",
        action: "How is the building heated today?",
    },
    ChapterOpening {
        chapter: Chapter::Sustainability,
        context: "You have opened the sustainability chapter.",
        insight: "The energy standard you target decides which subsidies you can apply for.",
        action: "Which energy standard would you like to reach?",
    },
    ChapterOpening {
        chapter: Chapter::Risks,
        context: "You are reviewing the project risks.",
        insight: "Timeline, permits and contingencies are the most common reasons projects overrun.",
        action: "By when does the project need to be finished?",
    },
];

impl ChapterOpening {
    /// Context/Insight/Action text
    pub fn render(&self) -> String {
        format!("Context: {}\nInsight: {}\nAction: {}", self.context, self.insight, self.action)
    }
}

/// Opening text for a chapter
pub fn opening(chapter: Chapter) -> Option<String> {
    OPENINGS.iter().find(|o| o.chapter == chapter).map(ChapterOpening::render)
}
