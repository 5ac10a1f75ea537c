//! Live-tally rendering. Pure: output depends on the arguments alone.

use crate::poll::ledger::LedgerSnapshot;
use crate::poll::{Choice, DisplayPayload, Tone};

pub const LIVE_TITLE: &str = "📊 Poll";

/// Renders the live tally. Choices keep their creation order with a 1-based
/// ordinal; counts come from the supplied snapshot only.
pub fn render_tally(
    question: &str,
    choices: &[Choice],
    snapshot: &LedgerSnapshot,
    footer: Option<&str>,
) -> DisplayPayload {
    let mut body = format!("**{question}**\n\n");
    for (index, choice) in choices.iter().enumerate() {
        let count = snapshot.count(choice.id);
        body.push_str(&format!(
            "**{}.** {} — **{} {}**\n",
            index + 1,
            choice.label,
            count,
            plural(count, "vote", "votes")
        ));
    }

    DisplayPayload {
        title: LIVE_TITLE.to_owned(),
        body,
        footer: footer.map(str::to_owned),
        tone: Tone::Live,
    }
}

/// `remaining` in whole seconds → "M minute(s) S second(s)" countdown footer.
pub fn countdown_footer(remaining_secs: u32) -> String {
    let minutes = remaining_secs / 60;
    let seconds = remaining_secs % 60;
    format!(
        "Poll ends in {minutes} {} {seconds} {}",
        plural(minutes, "minute", "minutes"),
        plural(seconds, "second", "seconds")
    )
}

pub(crate) fn plural<'a>(count: u32, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}
