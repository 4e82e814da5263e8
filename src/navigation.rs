//! Slide navigation and autoplay.
//!
//! `Presentation` owns the current index and the single autoplay timer.
//! Every transition that changes visible state hands a `Frame` to the
//! caller's renderer; no-op transitions render nothing.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DeckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerId(Uuid);

impl TimerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Source of periodic autoplay ticks.
pub trait Scheduler {
    fn schedule(&mut self, every: Duration) -> TimerId;
    fn cancel(&mut self, timer: TimerId);
}

/// Everything a renderer needs to draw the navigation bar and pick the slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame<'a> {
    pub index: usize,
    pub total: usize,
    pub title: &'a str,
    pub progress_pct: f64,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub autoplay: bool,
    pub play_label: &'static str,
}

pub trait Render {
    fn render(&mut self, frame: &Frame<'_>);
}

impl<F> Render for F
where
    F: FnMut(&Frame<'_>),
{
    fn render(&mut self, frame: &Frame<'_>) {
        self(frame)
    }
}

pub struct Presentation<S: Scheduler> {
    titles: Vec<String>,
    index: usize,
    autoplay: Option<TimerId>,
    interval: Duration,
    scheduler: S,
}

impl<S: Scheduler> Presentation<S> {
    pub fn new(titles: Vec<String>, interval: Duration, scheduler: S) -> Self {
        Self {
            titles,
            index: 0,
            autoplay: None,
            interval,
            scheduler,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.titles.len()
    }

    pub fn is_autoplay(&self) -> bool {
        self.autoplay.is_some()
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// `Slide i: <title>` entries for a jump selector, 1-based.
    pub fn jump_options(&self) -> Vec<String> {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, title)| format!("Slide {}: {}", i + 1, title))
            .collect()
    }

    fn last(&self) -> usize {
        self.total().saturating_sub(1)
    }

    pub fn frame(&self) -> Frame<'_> {
        let total = self.total();
        let autoplay = self.is_autoplay();
        Frame {
            index: self.index,
            total,
            title: self.titles.get(self.index).map(String::as_str).unwrap_or(""),
            progress_pct: if total == 0 {
                0.0
            } else {
                (self.index + 1) as f64 / total as f64 * 100.0
            },
            prev_enabled: self.index > 0,
            next_enabled: total > 0 && (self.index < self.last() || autoplay),
            autoplay,
            play_label: if autoplay { "Pause" } else { "Auto Play" },
        }
    }

    fn show(&self, renderer: &mut impl Render) {
        let frame = self.frame();
        info!("slide {}: {}", frame.index + 1, frame.title);
        renderer.render(&frame);
    }

    /// Renders the current slide without moving.
    pub fn refresh(&self, renderer: &mut impl Render) {
        self.show(renderer);
    }

    pub fn next(&mut self, renderer: &mut impl Render) -> bool {
        if self.total() == 0 {
            return false;
        }
        if self.index < self.last() {
            self.index += 1;
        } else if self.is_autoplay() {
            self.index = 0;
        } else {
            return false;
        }
        self.show(renderer);
        true
    }

    pub fn prev(&mut self, renderer: &mut impl Render) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.show(renderer);
        true
    }

    pub fn home(&mut self, renderer: &mut impl Render) -> bool {
        self.index = 0;
        self.show(renderer);
        true
    }

    pub fn jump(&mut self, index: usize, renderer: &mut impl Render) -> Result<(), DeckError> {
        if index >= self.total() {
            return Err(DeckError::SlideOutOfRange {
                index,
                total: self.total(),
            });
        }
        self.index = index;
        self.show(renderer);
        Ok(())
    }

    /// Starts the periodic tick. A second start while running does nothing.
    pub fn start_autoplay(&mut self, renderer: &mut impl Render) -> bool {
        if self.autoplay.is_some() {
            return false;
        }
        let timer = self.scheduler.schedule(self.interval);
        debug!(%timer, interval_secs = self.interval.as_secs(), "autoplay started");
        self.autoplay = Some(timer);
        self.show(renderer);
        true
    }

    /// Cancels the periodic tick. Stopping while stopped does nothing.
    pub fn stop_autoplay(&mut self, renderer: &mut impl Render) -> bool {
        let Some(timer) = self.autoplay.take() else {
            return false;
        };
        self.scheduler.cancel(timer);
        debug!(%timer, "autoplay stopped");
        self.show(renderer);
        true
    }

    /// Advances on a tick from the live timer; ticks from a cancelled timer
    /// that were already queued are ignored.
    pub fn tick(&mut self, timer: TimerId, renderer: &mut impl Render) -> bool {
        if self.autoplay != Some(timer) {
            debug!(%timer, "ignoring tick from inactive timer");
            return false;
        }
        self.next(renderer)
    }
}

/// Runs autoplay timers as tokio tasks that report ticks over a channel.
pub struct TokioScheduler {
    ticks: mpsc::UnboundedSender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerId>) {
        let (ticks, receiver) = mpsc::unbounded_channel();
        (
            Self {
                ticks,
                tasks: HashMap::new(),
            },
            receiver,
        )
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, every: Duration) -> TimerId {
        let timer = TimerId::new();
        let ticks = self.ticks.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                interval.tick().await;
                if ticks.send(timer).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(timer, task);
        timer
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(task) = self.tasks.remove(&timer) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeScheduler {
        live: Vec<TimerId>,
        scheduled: usize,
    }

    impl Scheduler for FakeScheduler {
        fn schedule(&mut self, _every: Duration) -> TimerId {
            let timer = TimerId::new();
            self.live.push(timer);
            self.scheduled += 1;
            timer
        }

        fn cancel(&mut self, timer: TimerId) {
            self.live.retain(|t| *t != timer);
        }
    }

    fn deck(total: usize) -> Presentation<FakeScheduler> {
        let titles = (0..total).map(|i| format!("Slide {i}")).collect();
        Presentation::new(titles, Duration::from_secs(5), FakeScheduler::default())
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(usize, bool, bool, bool)>,
    }

    impl Render for Recorder {
        fn render(&mut self, frame: &Frame<'_>) {
            self.frames
                .push((frame.index, frame.prev_enabled, frame.next_enabled, frame.autoplay));
        }
    }

    #[test]
    fn prev_at_first_slide_is_a_noop() {
        let mut nav = deck(5);
        let mut out = Recorder::default();
        assert!(!nav.prev(&mut out));
        assert_eq!(nav.index(), 0);
        assert!(out.frames.is_empty());
        assert!(!nav.frame().prev_enabled);
    }

    #[test]
    fn next_at_last_slide_wraps_only_during_autoplay() {
        let mut nav = deck(5);
        let mut out = Recorder::default();
        nav.jump(4, &mut out).unwrap();
        assert!(!nav.frame().next_enabled);
        assert!(!nav.next(&mut out));
        assert_eq!(nav.index(), 4);

        nav.start_autoplay(&mut out);
        assert!(nav.frame().next_enabled);
        assert!(nav.next(&mut out));
        assert_eq!(nav.index(), 0);
        assert_eq!(out.frames.last(), Some(&(0, false, true, true)));
    }

    #[test]
    fn jump_rejects_out_of_range() {
        let mut nav = deck(5);
        let mut out = Recorder::default();
        nav.jump(2, &mut out).unwrap();
        assert!(matches!(
            nav.jump(5, &mut out),
            Err(DeckError::SlideOutOfRange { index: 5, total: 5 })
        ));
        assert_eq!(nav.index(), 2);
        assert!(nav.home(&mut out));
        assert_eq!(nav.index(), 0);
    }

    #[test]
    fn autoplay_schedules_one_timer() {
        let mut nav = deck(5);
        let mut out = Recorder::default();
        assert!(nav.start_autoplay(&mut out));
        assert!(!nav.start_autoplay(&mut out));
        assert_eq!(nav.scheduler().scheduled, 1);
        assert_eq!(nav.scheduler().live.len(), 1);
        assert_eq!(nav.frame().play_label, "Pause");

        assert!(nav.stop_autoplay(&mut out));
        assert!(!nav.stop_autoplay(&mut out));
        assert!(nav.scheduler().live.is_empty());
        assert_eq!(nav.frame().play_label, "Auto Play");
    }

    #[test]
    fn ticks_from_stale_timers_are_ignored() {
        let mut nav = deck(3);
        let mut out = Recorder::default();
        nav.start_autoplay(&mut out);
        let first = nav.scheduler().live[0];
        assert!(nav.tick(first, &mut out));
        assert_eq!(nav.index(), 1);

        nav.stop_autoplay(&mut out);
        assert!(!nav.tick(first, &mut out));
        nav.start_autoplay(&mut out);
        assert!(!nav.tick(first, &mut out));
        assert_eq!(nav.index(), 1);
    }

    #[test]
    fn frame_reports_progress_and_jump_options() {
        let mut nav = deck(4);
        let mut out = Recorder::default();
        nav.jump(1, &mut out).unwrap();
        let frame = nav.frame();
        assert_eq!(frame.progress_pct, 50.0);
        assert_eq!(frame.title, "Slide 1");
        assert_eq!(nav.jump_options()[0], "Slide 1: Slide 0");
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_ticks_stop_after_cancel() {
        let (mut scheduler, mut ticks) = TokioScheduler::new();
        let timer = scheduler.schedule(Duration::from_secs(5));
        assert_eq!(scheduler.active(), 1);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(ticks.recv().await, Some(timer));
        assert_eq!(ticks.recv().await, Some(timer));

        scheduler.cancel(timer);
        assert_eq!(scheduler.active(), 0);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(ticks.try_recv().is_err());
    }
}
