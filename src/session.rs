use std::io::{Stdout, Write};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::DeckError;
use crate::filters::{parse_gpa, parse_physical, parse_study_sleep, Applied, FilterView, Selection};
use crate::navigation::{Frame, Presentation, Render, Scheduler, TimerId, TokioScheduler};
use crate::report::{nav_bar, render_slide};
use crate::slides::{Deck, SlideBody};

pub const HELP: &str = "commands: next | prev | home | jump <n> | play | stop | \
                        gpa <level> | study-sleep <habits> | physical <level> | slides | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Home,
    /// 1-based slide number as typed.
    Jump(usize),
    Play,
    Stop,
    Gpa(String),
    StudySleep(String),
    Physical(String),
    Slides,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word.to_ascii_lowercase().as_str() {
            "n" | "next" => Command::Next,
            "p" | "prev" | "previous" => Command::Prev,
            "h" | "home" => Command::Home,
            "j" | "jump" => {
                let number: usize = rest
                    .parse()
                    .map_err(|_| format!("jump needs a slide number, got {rest:?}"))?;
                Command::Jump(number)
            }
            "play" => Command::Play,
            "stop" | "pause" => Command::Stop,
            "gpa" => Command::Gpa(rest.to_string()),
            "study-sleep" | "habits" => Command::StudySleep(rest.to_string()),
            "physical" => Command::Physical(rest.to_string()),
            "slides" => Command::Slides,
            "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command {other:?}")),
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct TerminalRenderer<'a, W: Write> {
    deck: &'a Deck,
    view: Option<&'a FilterView>,
    out: &'a mut W,
}

impl<W: Write> Render for TerminalRenderer<'_, W> {
    fn render(&mut self, frame: &Frame<'_>) {
        let mut text = String::new();
        if let Some(slide) = self.deck.slides.get(frame.index) {
            render_slide(&mut text, slide, self.view);
        }
        let _ = writeln!(self.out, "{}", nav_bar(frame));
        let _ = writeln!(self.out, "{}", "-".repeat(72));
        let _ = write!(self.out, "{}", text);
        let _ = writeln!(self.out);
    }
}

/// One viewer's navigation state and filter view over a shared deck.
pub struct Session<'d, S: Scheduler, W: Write> {
    pub id: Uuid,
    deck: &'d Deck,
    presentation: Presentation<S>,
    view: Option<FilterView>,
    out: W,
}

impl<'d, S: Scheduler, W: Write> Session<'d, S, W> {
    pub fn new(deck: &'d Deck, interval: Duration, scheduler: S, out: W) -> Self {
        let titles = deck.titles().into_iter().map(str::to_string).collect();
        Self {
            id: Uuid::new_v4(),
            deck,
            presentation: Presentation::new(titles, interval, scheduler),
            view: deck.interactive().map(|chart| chart.view.clone()),
            out,
        }
    }

    #[cfg(test)]
    pub fn presentation(&self) -> &Presentation<S> {
        &self.presentation
    }

    #[cfg(test)]
    pub fn view(&self) -> Option<&FilterView> {
        self.view.as_ref()
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    pub fn start(&mut self) {
        let mut renderer = TerminalRenderer {
            deck: self.deck,
            view: self.view.as_ref(),
            out: &mut self.out,
        };
        self.presentation.refresh(&mut renderer);
    }

    pub fn tick(&mut self, timer: TimerId) {
        let mut renderer = TerminalRenderer {
            deck: self.deck,
            view: self.view.as_ref(),
            out: &mut self.out,
        };
        self.presentation.tick(timer, &mut renderer);
    }

    pub fn handle(&mut self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                let _ = writeln!(self.out, "{message}\n{HELP}");
                return Flow::Continue;
            }
        };

        match command {
            Command::Gpa(value) => self.filter(|selection| {
                selection.gpa = parse_gpa(&value)?;
                Ok(())
            }),
            Command::StudySleep(value) => self.filter(|selection| {
                selection.study_sleep = parse_study_sleep(&value)?;
                Ok(())
            }),
            Command::Physical(value) => self.filter(|selection| {
                selection.physical = parse_physical(&value)?;
                Ok(())
            }),
            Command::Slides => {
                for option in self.presentation.jump_options() {
                    let _ = writeln!(self.out, "{option}");
                }
            }
            Command::Help => {
                let _ = writeln!(self.out, "{HELP}");
            }
            Command::Quit => return Flow::Quit,
            navigation => self.navigate(navigation),
        }
        Flow::Continue
    }

    fn navigate(&mut self, command: Command) {
        let mut renderer = TerminalRenderer {
            deck: self.deck,
            view: self.view.as_ref(),
            out: &mut self.out,
        };
        let presentation = &mut self.presentation;
        match command {
            Command::Next => {
                presentation.next(&mut renderer);
            }
            Command::Prev => {
                presentation.prev(&mut renderer);
            }
            Command::Home => {
                presentation.home(&mut renderer);
            }
            Command::Jump(number) => {
                let jumped = match number.checked_sub(1) {
                    Some(index) => presentation.jump(index, &mut renderer),
                    None => Err(DeckError::SlideOutOfRange {
                        index: number,
                        total: presentation.total(),
                    }),
                };
                if let Err(err) = jumped {
                    warn!("{err}");
                    let _ = writeln!(
                        renderer.out,
                        "no slide {} (deck has {} slides)",
                        number,
                        presentation.total()
                    );
                }
            }
            Command::Play => {
                presentation.start_autoplay(&mut renderer);
            }
            Command::Stop => {
                presentation.stop_autoplay(&mut renderer);
            }
            _ => {}
        }
    }

    fn filter<F>(&mut self, update: F)
    where
        F: FnOnce(&mut Selection) -> Result<(), DeckError>,
    {
        let (Some(view), Some(chart)) = (self.view.as_mut(), self.deck.interactive()) else {
            let _ = writeln!(self.out, "filters are unavailable without data");
            return;
        };

        let mut selection = view.selection;
        if let Err(err) = update(&mut selection) {
            let _ = writeln!(self.out, "{err}");
            return;
        }

        let applied = view.apply(&chart.table, selection);
        info!(?applied, "filter applied");
        let on_interactive = matches!(
            self.deck.slides.get(self.presentation.index()).map(|s| &s.body),
            Some(SlideBody::Interactive(_))
        );
        if matches!(applied, Applied::Updated(_)) && on_interactive {
            let mut renderer = TerminalRenderer {
                deck: self.deck,
                view: self.view.as_ref(),
                out: &mut self.out,
            };
            self.presentation.refresh(&mut renderer);
        }
    }
}

/// Drives a session from stdin lines and autoplay ticks until quit or EOF.
pub async fn run(deck: &Deck, interval: Duration) -> anyhow::Result<()> {
    let (scheduler, ticks) = TokioScheduler::new();
    let session = Session::new(deck, interval, scheduler, std::io::stdout());
    let span = info_span!("session", id = %session.id);
    drive(session, ticks).instrument(span).await
}

async fn drive(
    mut session: Session<'_, TokioScheduler, Stdout>,
    mut ticks: mpsc::UnboundedReceiver<TimerId>,
) -> anyhow::Result<()> {
    let _ = writeln!(session.out, "{HELP}");
    session.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read command")? else {
                    break;
                };
                if session.handle(&line) == Flow::Quit {
                    break;
                }
            }
            Some(timer) = ticks.recv() => session.tick(timer),
        }
    }

    info!("session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeckConfig;
    use crate::dataset::Dataset;
    use crate::models::StudentRecord;
    use std::path::PathBuf;

    #[derive(Default)]
    struct ManualScheduler {
        live: Vec<TimerId>,
    }

    impl Scheduler for ManualScheduler {
        fn schedule(&mut self, _every: Duration) -> TimerId {
            let timer = TimerId::new();
            self.live.push(timer);
            timer
        }

        fn cancel(&mut self, timer: TimerId) {
            self.live.retain(|t| *t != timer);
        }
    }

    fn record(study: f64, sleep: f64, physical: f64, gpa: f64, stress: &str) -> StudentRecord {
        StudentRecord {
            student_id: Some(1),
            study_hours: Some(study),
            extracurricular_hours: Some(1.0),
            sleep_hours: Some(sleep),
            social_hours: Some(2.0),
            physical_hours: Some(physical),
            gpa: Some(gpa),
            stress_level: Some(stress.to_string()),
        }
    }

    fn deck() -> Deck {
        let dataset = Dataset::Loaded {
            path: PathBuf::from("sample.csv"),
            records: vec![
                record(5.0, 8.0, 4.0, 2.6, "Low"),
                record(6.0, 7.0, 3.0, 2.9, "Moderate"),
                record(8.0, 6.0, 1.0, 3.3, "High"),
                record(9.0, 8.5, 2.0, 3.6, "High"),
            ],
        };
        Deck::build(&dataset, &DeckConfig::default())
    }

    fn session(deck: &Deck) -> Session<'_, ManualScheduler, Vec<u8>> {
        Session::new(deck, Duration::from_secs(5), ManualScheduler::default(), Vec::new())
    }

    #[test]
    fn parses_commands() {
        assert_eq!("next".parse::<Command>().unwrap(), Command::Next);
        assert_eq!("jump 3".parse::<Command>().unwrap(), Command::Jump(3));
        assert_eq!(
            "gpa High GPA".parse::<Command>().unwrap(),
            Command::Gpa("High GPA".to_string())
        );
        assert!("jump x".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn navigation_commands_move_and_render() {
        let deck = deck();
        let mut session = session(&deck);
        session.start();
        session.handle("next");
        session.handle("jump 5");
        assert_eq!(session.presentation().index(), 4);
        session.handle("jump 9");
        assert_eq!(session.presentation().index(), 4);
        session.handle("jump 0");
        assert_eq!(session.presentation().index(), 4);
        assert_eq!(session.handle("quit"), Flow::Quit);

        let out = String::from_utf8(session.into_output()).unwrap();
        assert!(out.contains("Slide 2 of 5"));
        assert!(out.contains("Showing: All Students"));
        assert!(out.contains("no slide 9 (deck has 5 slides)"));
        assert!(out.contains("no slide 0 (deck has 5 slides)"));
    }

    #[test]
    fn autoplay_ticks_wrap_at_the_end() {
        let deck = deck();
        let mut session = session(&deck);
        session.handle("jump 5");
        session.handle("play");
        session.handle("play");
        let timer = session.presentation().scheduler().live[0];
        assert_eq!(session.presentation().scheduler().live.len(), 1);

        session.tick(timer);
        assert_eq!(session.presentation().index(), 0);
        session.handle("stop");
        session.tick(timer);
        assert_eq!(session.presentation().index(), 0);
        assert!(session.presentation().scheduler().live.is_empty());
    }

    #[test]
    fn filter_misses_keep_the_view() {
        let deck = deck();
        let mut session = session(&deck);
        session.handle("study-sleep High Study & High Sleep");
        assert_eq!(session.view().unwrap().key, "High Study & High Sleep");

        session.handle("gpa Low GPA");
        assert_eq!(session.view().unwrap().key, "High Study & High Sleep");

        session.handle("physical High Physical Activity");
        assert_eq!(session.view().unwrap().key, "High Physical Activity");

        session.handle("gpa Medium");
        let out = String::from_utf8(session.into_output()).unwrap();
        assert!(out.contains("unknown GPA level selection"));
    }
}
