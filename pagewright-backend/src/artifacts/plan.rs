//! Milestone checklist parsing for `plan.md`.
//!
//! Milestones are markdown task items numbered in order:
//!
//! ```text
//!  - [ ] 1. Build the header
//!  - [x] 2. Lay out the hero section
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static MILESTONE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*[-*]\s*\[)([ xX])(\]\s*)(\d+)\.\s*(.*?)\s*$")
        .unwrap_or_else(|e| panic!("milestone pattern is invalid: {}", e))
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub number: u32,
    pub title: String,
    pub completed: bool,
    #[serde(skip)]
    line: usize,
}

/// A parsed plan document
#[derive(Debug, Clone)]
pub struct Plan {
    lines: Vec<String>,
    milestones: Vec<Milestone>,
}

impl Plan {
    pub fn parse(markdown: &str) -> Self {
        let lines: Vec<String> = markdown.lines().map(str::to_string).collect();
        let milestones = lines
            .iter()
            .enumerate()
            .filter_map(|(line, text)| {
                let caps = MILESTONE_LINE.captures(text)?;
                Some(Milestone {
                    number: caps[4].parse().ok()?,
                    title: caps[5].to_string(),
                    completed: !caps[2].trim().is_empty(),
                    line,
                })
            })
            .collect();
        Self { lines, milestones }
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// First milestone, in document order, that is not checked off
    pub fn next_pending(&self) -> Option<&Milestone> {
        self.milestones.iter().find(|m| !m.completed)
    }

    pub fn completed_count(&self) -> usize {
        self.milestones.iter().filter(|m| m.completed).count()
    }

    /// True when there is at least one milestone and all are done
    pub fn is_finished(&self) -> bool {
        !self.milestones.is_empty() && self.next_pending().is_none()
    }

    /// Check off milestone `number`. Only that line changes.
    /// Returns false if no such milestone exists or it was already done.
    pub fn mark_complete(&mut self, number: u32) -> bool {
        let Some(milestone) = self
            .milestones
            .iter_mut()
            .find(|m| m.number == number && !m.completed)
        else {
            return false;
        };

        let line = &self.lines[milestone.line];
        let updated = MILESTONE_LINE.replace(line, "${1}x${3}${4}. ${5}").into_owned();
        self.lines[milestone.line] = updated;
        milestone.completed = true;
        true
    }

    pub fn to_markdown(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// One-line progress summary used in agent context
    pub fn progress_summary(&self) -> String {
        let total = self.milestones.len();
        match self.next_pending() {
            Some(next) => format!(
                "{}/{} milestones complete. Next: {}. {}",
                self.completed_count(),
                total,
                next.number,
                next.title
            ),
            None if total > 0 => format!("All {} milestones complete.", total),
            None => "The plan has no milestones yet.".to_string(),
        }
    }
}
