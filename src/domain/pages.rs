use super::constants::{INTRODUCTION_ROUND, TIMED_ROUND};
use super::currency::Points;
use super::decision::DecisionOutcome;
use super::player::ParticipantId;
use serde::Serialize;

pub fn should_show_introduction_screen(round_number: u32) -> bool {
    round_number == INTRODUCTION_ROUND
}

pub fn should_show_instructions_screen(round_number: u32) -> bool {
    round_number == TIMED_ROUND
}

pub fn should_show_final_results_screen(round_number: u32, total_rounds: u32) -> bool {
    round_number == total_rounds
}

/// The screens of one round, in the order they are visited.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Introduction,
    Round2Instructions,
    Decision,
    ResultsWaitPage,
    Results,
    FinalResults,
}

impl Page {
    pub const SEQUENCE: [Page; 6] = [
        Page::Introduction,
        Page::Round2Instructions,
        Page::Decision,
        Page::ResultsWaitPage,
        Page::Results,
        Page::FinalResults,
    ];

    pub fn is_displayed(self, round_number: u32, total_rounds: u32) -> bool {
        match self {
            Page::Introduction => should_show_introduction_screen(round_number),
            Page::Round2Instructions => should_show_instructions_screen(round_number),
            Page::Decision | Page::ResultsWaitPage | Page::Results => true,
            Page::FinalResults => should_show_final_results_screen(round_number, total_rounds),
        }
    }
}

/// Template data for the Results page.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct ResultsView {
    pub opponent: ParticipantId,
    pub same_choice: bool,
    pub my_decision: &'static str,
    pub opponent_decision: &'static str,
}

/// What a participant saw on a page.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageView {
    Introduction,
    Instructions { message: String },
    Decision { decision: DecisionOutcome },
    Results(ResultsView),
    FinalResults { total_payoff: Points },
}
