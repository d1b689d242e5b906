//! Built-in lessons for offline runs and an empty backend.

use crate::types::Lesson;

struct DemoLesson {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    tags: &'static [&'static str],
    minutes: f64,
}

const DEMO_LESSONS: &[DemoLesson] = &[
    DemoLesson {
        id: "focus-60",
        title: "60-Second Focus Reset",
        description: "Use a short breathing pattern and micro-break to reset attention. Try the 4-4-6 reset and a quick stretch to reduce cognitive load.",
        tags: &["productivity", "focus", "wellbeing"],
        minutes: 1.0,
    },
    DemoLesson {
        id: "inbox-zero",
        title: "Inbox Zero in Minutes",
        description: "Triage emails quickly with three labels: Act, Defer, Archive. Batch respond twice daily to reduce context switching.",
        tags: &["productivity", "email", "timeboxing"],
        minutes: 2.0,
    },
    DemoLesson {
        id: "focus-sprints",
        title: "Focus Sprints",
        description: "Use short, intense focus intervals with brief, restorative breaks to maximize deep work and avoid burnout.",
        tags: &["productivity", "deep work"],
        minutes: 2.0,
    },
    DemoLesson {
        id: "gma",
        title: "G-M-A Formula",
        description: "A simple planning loop: Goals, Methods, Actions. Translate intentions into concrete steps to remove ambiguity.",
        tags: &["planning", "productivity"],
        minutes: 2.0,
    },
    DemoLesson {
        id: "five-map",
        title: "Five-Minute Map",
        description: "Sketch a quick visual plan: outcomes, constraints, first next steps. Five minutes to clarify direction before starting.",
        tags: &["planning", "strategy"],
        minutes: 1.0,
    },
    DemoLesson {
        id: "memory-ladder",
        title: "Memory Ladder",
        description: "Chain new information to memorable anchors. Use chunking and spaced recall to retain key ideas.",
        tags: &["learning", "memory"],
        minutes: 2.0,
    },
    DemoLesson {
        id: "micro-leadership",
        title: "Micro Leadership Tips",
        description: "Practice small leadership behaviors daily: clear asks, celebrate wins, unblock decisively, and model curiosity.",
        tags: &["leadership", "communication"],
        minutes: 2.0,
    },
];

pub fn demo_lessons() -> Vec<Lesson> {
    DEMO_LESSONS
        .iter()
        .map(|demo| Lesson {
            tags: demo.tags.iter().map(|t| t.to_string()).collect(),
            ..Lesson::new(demo.id, demo.title)
                .with_description(demo.description)
                .with_duration(demo.minutes * 60.0)
        })
        .collect()
}
