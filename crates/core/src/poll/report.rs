//! Final results reporting.

use crate::poll::ledger::LedgerSnapshot;
use crate::poll::render::plural;
use crate::poll::{Choice, DisplayPayload, Tone};

pub const FINISHED_TITLE: &str = "Poll Finished! 🛑";
pub const RESULTS_TITLE: &str = "📊 Poll Ended";

/// Banner shown the moment the countdown elapses, before the summary lands.
pub fn render_finished_banner(question: &str) -> DisplayPayload {
    DisplayPayload {
        title: FINISHED_TITLE.to_owned(),
        body: format!("**{question}**\n\nHere are the results:"),
        footer: None,
        tone: Tone::Finished,
    }
}

/// Ranked summary: counts descending, ties kept in creation order (the sort
/// is stable), one-decimal percentages, voter mentions per choice, grand
/// total. A poll with no votes gets a single "no votes" line instead of a
/// per-choice breakdown.
pub fn render_results(
    question: &str,
    choices: &[Choice],
    snapshot: &LedgerSnapshot,
) -> DisplayPayload {
    let mut body = format!("**Results for:** **{question}**\n\n");

    if snapshot.total_votes == 0 {
        body.push_str("_No votes were cast._");
        return DisplayPayload {
            title: RESULTS_TITLE.to_owned(),
            body,
            footer: None,
            tone: Tone::Results,
        };
    }

    let mut ranked: Vec<&Choice> = choices.iter().collect();
    ranked.sort_by(|a, b| snapshot.count(b.id).cmp(&snapshot.count(a.id)));

    let total = snapshot.total_votes;
    for choice in ranked {
        let count = snapshot.count(choice.id);
        let percent = f64::from(count) * 100.0 / f64::from(total);
        body.push_str(&format!(
            "**{}** — {} {} ({:.1}%)\n",
            choice.label,
            count,
            plural(count, "vote", "votes"),
            percent
        ));

        let mentions: Vec<String> = snapshot.voters(choice.id).map(|a| a.mention()).collect();
        if !mentions.is_empty() {
            body.push_str(&format!("Voters: {}\n", mentions.join(" ")));
        }
        body.push('\n');
    }

    body.push_str(&format!("Total votes: {total}"));

    DisplayPayload { title: RESULTS_TITLE.to_owned(), body, footer: None, tone: Tone::Results }
}
