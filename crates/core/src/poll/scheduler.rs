use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::poll::registry::{PollHandle, PollRegistry};
use crate::poll::render::{countdown_footer, render_tally};
use crate::poll::report::{render_finished_banner, render_results};
use crate::poll::PollDisplay;

/// Countdown state threaded through each tick. `Running(n)` publishes a
/// tally labeled with `n` seconds remaining; the tick that finds the counter
/// below zero performs the terminal transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Running(i64),
    Closed,
}

/// Drives one repeating countdown task per poll. Ticks fire on a fixed
/// period with no drift correction; the display is a best-effort mirror and
/// a dropped frame is repaired by the next tick.
pub struct CountdownScheduler {
    registry: Arc<PollRegistry>,
    display: Arc<dyn PollDisplay>,
    tick_period: Duration,
}

impl CountdownScheduler {
    pub fn new(registry: Arc<PollRegistry>, display: Arc<dyn PollDisplay>) -> Self {
        Self { registry, display, tick_period: Duration::from_secs(1) }
    }

    /// Shortened periods keep lifecycle tests fast; production uses 1s.
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    pub fn spawn(self: &Arc<Self>, poll: Arc<PollHandle>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run(poll).await })
    }

    /// Runs the countdown to completion. The loop owns its own cancellation:
    /// it ends either at the terminal transition or as soon as the poll is no
    /// longer registered (an external close won the race).
    pub async fn run(&self, poll: Arc<PollHandle>) {
        let mut interval = tokio::time::interval(self.tick_period);
        let mut tick = Tick::Running(i64::from(poll.duration_secs()));

        loop {
            interval.tick().await;

            if !self.registry.contains(poll.id()) {
                debug!(poll_id = %poll.id(), "poll no longer registered; countdown ends");
                return;
            }

            tick = match tick {
                Tick::Running(remaining) if remaining >= 0 => {
                    self.publish_tally(&poll, u32::try_from(remaining).unwrap_or(0)).await;
                    Tick::Running(remaining - 1)
                }
                Tick::Running(_) => {
                    self.close(&poll).await;
                    Tick::Closed
                }
                Tick::Closed => Tick::Closed,
            };

            if tick == Tick::Closed {
                return;
            }
        }
    }

    /// Publishes the live tally for a running tick and caches the footer so
    /// vote-triggered refreshes can reuse it between ticks.
    async fn publish_tally(&self, poll: &PollHandle, remaining_secs: u32) {
        let footer = countdown_footer(remaining_secs);
        let frame = {
            let mut state = poll.state();
            state.last_footer = Some(footer.clone());
            state.display.clone().map(|handle| (handle, state.ledger.snapshot()))
        };

        let Some((handle, snapshot)) = frame else {
            return;
        };
        let payload = render_tally(poll.question(), poll.choices(), &snapshot, Some(&footer));
        if let Err(error) = self.display.update(&handle, payload).await {
            warn!(poll_id = %poll.id(), error = %error, "countdown tally update dropped");
        }
    }

    /// Terminal transition. The poll is marked closed and removed from the
    /// registry before any final frame is pushed, so a vote racing the close
    /// resolves as expired instead of mutating a dying poll. Runs at most
    /// once: whichever closer loses the registry removal backs off.
    async fn close(&self, poll: &PollHandle) {
        let (snapshot, handle) = {
            let mut state = poll.state();
            state.closed = true;
            (state.ledger.snapshot(), state.display.clone())
        };

        if !self.registry.remove(poll.id()) {
            return;
        }

        info!(
            poll_id = %poll.id(),
            total_votes = snapshot.total_votes,
            "poll closed"
        );

        let Some(handle) = handle else {
            return;
        };

        let banner = render_finished_banner(poll.question());
        if let Err(error) = self.display.update(&handle, banner).await {
            warn!(poll_id = %poll.id(), error = %error, "finished banner dropped");
        }

        let results = render_results(poll.question(), poll.choices(), &snapshot);
        if let Err(error) = self.display.update_final(&handle, results).await {
            warn!(poll_id = %poll.id(), error = %error, "results frame dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::CountdownScheduler;
    use crate::errors::DisplayError;
    use crate::poll::{
        ActorId, ChoiceButton, DisplayHandle, DisplayPayload, PollDisplay, PollRegistry, Tone,
        VoteIntake, VoteOutcome,
    };

    /// Records each frame together with whether the watched poll was still
    /// registered when the frame arrived and whether it was final.
    struct ProbeDisplay {
        registry: Arc<PollRegistry>,
        watched: crate::poll::PollId,
        frames: Mutex<Vec<ProbeFrame>>,
    }

    #[derive(Clone, Debug)]
    struct ProbeFrame {
        payload: DisplayPayload,
        still_registered: bool,
        finalized: bool,
    }

    impl ProbeDisplay {
        fn new(registry: Arc<PollRegistry>, watched: crate::poll::PollId) -> Self {
            Self { registry, watched, frames: Mutex::new(Vec::new()) }
        }

        fn frames(&self) -> Vec<ProbeFrame> {
            self.frames.lock().expect("frames lock").clone()
        }

        fn push(&self, payload: DisplayPayload, finalized: bool) {
            let still_registered = self.registry.contains(self.watched);
            self.frames
                .lock()
                .expect("frames lock")
                .push(ProbeFrame { payload, still_registered, finalized });
        }
    }

    #[async_trait]
    impl PollDisplay for ProbeDisplay {
        async fn create(
            &self,
            channel_id: &str,
            _payload: DisplayPayload,
            _affordances: Vec<ChoiceButton>,
        ) -> Result<DisplayHandle, DisplayError> {
            Ok(DisplayHandle {
                channel_id: channel_id.to_owned(),
                message_id: "m-1".to_owned(),
            })
        }

        async fn update(
            &self,
            _handle: &DisplayHandle,
            payload: DisplayPayload,
        ) -> Result<(), DisplayError> {
            self.push(payload, false);
            Ok(())
        }

        async fn update_final(
            &self,
            _handle: &DisplayHandle,
            payload: DisplayPayload,
        ) -> Result<(), DisplayError> {
            self.push(payload, true);
            Ok(())
        }
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn scheduler_for(
        registry: &Arc<PollRegistry>,
        display: &Arc<ProbeDisplay>,
    ) -> CountdownScheduler {
        let display: Arc<dyn PollDisplay> = display.clone();
        CountdownScheduler::new(Arc::clone(registry), display)
            .with_tick_period(Duration::from_millis(10))
    }

    fn attach(poll: &crate::poll::PollHandle) {
        poll.attach_display(DisplayHandle {
            channel_id: "chan".to_owned(),
            message_id: "msg".to_owned(),
        });
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_runs_to_terminal_transition_and_tears_down() {
        let registry = Arc::new(PollRegistry::new());
        let poll = registry.create("Q", &labels(&["Red", "Blue"]), Some(2)).expect("created");
        let display = Arc::new(ProbeDisplay::new(Arc::clone(&registry), poll.id()));
        attach(&poll);

        let scheduler = scheduler_for(&registry, &display);
        scheduler.run(Arc::clone(&poll)).await;

        assert!(registry.lookup(poll.id()).is_none());
        assert!(poll.state().closed);

        let frames = display.frames();
        // Ticks for 2, 1, 0 seconds remaining, then banner, then results.
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].payload.tone, Tone::Live);
        assert_eq!(
            frames[0].payload.footer.as_deref(),
            Some("Poll ends in 0 minutes 2 seconds")
        );
        assert_eq!(
            frames[2].payload.footer.as_deref(),
            Some("Poll ends in 0 minutes 0 seconds")
        );
        assert_eq!(frames[3].payload.tone, Tone::Finished);
        assert_eq!(frames[4].payload.tone, Tone::Results);
        assert!(frames[4].finalized, "results frame must disable the buttons");
    }

    #[tokio::test(start_paused = true)]
    async fn final_frames_are_pushed_only_after_registry_removal() {
        let registry = Arc::new(PollRegistry::new());
        let poll = registry.create("Q", &labels(&["A"]), Some(1)).expect("created");
        let display = Arc::new(ProbeDisplay::new(Arc::clone(&registry), poll.id()));
        attach(&poll);

        scheduler_for(&registry, &display).run(Arc::clone(&poll)).await;

        let frames = display.frames();
        let (live, terminal): (Vec<_>, Vec<_>) =
            frames.into_iter().partition(|frame| frame.payload.tone == Tone::Live);
        assert!(live.iter().all(|frame| frame.still_registered));
        assert_eq!(terminal.len(), 2);
        assert!(
            terminal.iter().all(|frame| !frame.still_registered),
            "banner and results must land after removal"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stray_task_for_an_externally_removed_poll_does_nothing() {
        let registry = Arc::new(PollRegistry::new());
        let poll = registry.create("Q", &labels(&["A"]), Some(30)).expect("created");
        let display = Arc::new(ProbeDisplay::new(Arc::clone(&registry), poll.id()));
        attach(&poll);
        registry.remove(poll.id());

        scheduler_for(&registry, &display).run(Arc::clone(&poll)).await;

        assert!(display.frames().is_empty());
        assert!(!poll.state().closed, "an unregistered poll is left untouched");
    }

    #[tokio::test(start_paused = true)]
    async fn votes_after_closure_are_expired_and_do_not_mutate() {
        let registry = Arc::new(PollRegistry::new());
        let poll = registry.create("Q", &labels(&["Red"]), Some(1)).expect("created");
        let display = Arc::new(ProbeDisplay::new(Arc::clone(&registry), poll.id()));
        attach(&poll);
        let choice = poll.choices()[0].id;

        scheduler_for(&registry, &display).run(Arc::clone(&poll)).await;

        let intake = VoteIntake::new(
            Arc::clone(&registry),
            Arc::new(crate::poll::display::NoopPollDisplay),
        );
        let outcome = intake.cast_vote(choice, ActorId::new("late")).await;
        assert_eq!(outcome, VoteOutcome::PollExpired);
        assert_eq!(poll.state().ledger.total_votes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_poll_votes_appear_in_final_results() {
        let registry = Arc::new(PollRegistry::new());
        let poll =
            registry.create("Color?", &labels(&["Red", "Blue", "Green"]), Some(3)).expect("created");
        let display = Arc::new(ProbeDisplay::new(Arc::clone(&registry), poll.id()));
        attach(&poll);

        {
            let mut state = poll.state();
            state.ledger.record(poll.choices()[1].id, ActorId::new("a"));
            state.ledger.record(poll.choices()[1].id, ActorId::new("b"));
            state.ledger.record(poll.choices()[0].id, ActorId::new("c"));
        }

        scheduler_for(&registry, &display).run(Arc::clone(&poll)).await;

        let frames = display.frames();
        let results = frames.last().expect("results frame");
        assert!(results.payload.body.contains("**Blue** — 2 votes (66.7%)"));
        assert!(results.payload.body.contains("**Red** — 1 vote (33.3%)"));
        assert!(results.payload.body.contains("**Green** — 0 votes (0.0%)"));
        assert!(results.payload.body.ends_with("Total votes: 3"));
    }
}
