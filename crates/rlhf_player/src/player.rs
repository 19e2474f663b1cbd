//! Session state: the open page and the reply for each command.

use std::time::Duration;

use serde::Serialize;

use rlhf_pages::{ActivePage, PageKind, PageSettings, PageSnapshot, ParamSpec};

use crate::command::{ArchAction, Command, HELP};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEntry {
    pub key: &'static str,
    pub path: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelpEntry {
    pub usage: &'static str,
    pub description: &'static str,
}

/// One JSON line on stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Snapshot { snapshot: PageSnapshot },
    Pages { pages: Vec<PageEntry> },
    Params { page: &'static str, params: Vec<ParamSpec> },
    Help { commands: Vec<HelpEntry> },
    Error { message: String },
    Bye,
}

impl Reply {
    pub fn error(message: impl ToString) -> Self {
        Reply::Error {
            message: message.to_string(),
        }
    }
}

pub struct Player {
    page: ActivePage,
    settings: PageSettings,
}

impl Player {
    pub fn new(start: PageKind, settings: PageSettings) -> Self {
        Self {
            page: ActivePage::open(start, &settings),
            settings,
        }
    }

    pub fn kind(&self) -> PageKind {
        self.page.kind()
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        self.page.tick_interval()
    }

    pub fn snapshot(&self) -> Result<Reply> {
        Ok(Reply::Snapshot {
            snapshot: self.page.snapshot()?,
        })
    }

    pub fn tick(&mut self) -> Result<Reply> {
        self.page.tick()?;
        self.snapshot()
    }

    pub fn handle(&mut self, cmd: Command) -> Result<Reply> {
        match cmd {
            Command::Help => Ok(Reply::Help {
                commands: HELP
                    .iter()
                    .map(|&(usage, description)| HelpEntry { usage, description })
                    .collect(),
            }),
            Command::Pages => Ok(Reply::Pages {
                pages: PageKind::all()
                    .iter()
                    .map(|&k| PageEntry {
                        key: k.label(),
                        path: k.path(),
                        title: k.title(),
                        description: k.description(),
                        current: k == self.kind(),
                    })
                    .collect(),
            }),
            Command::Open(kind) => {
                self.page = ActivePage::open(kind, &self.settings);
                self.snapshot()
            }
            Command::Next => {
                self.page.next()?;
                self.snapshot()
            }
            Command::Reset => {
                self.page.reset();
                self.snapshot()
            }
            Command::Play => {
                self.page.play()?;
                self.snapshot()
            }
            Command::Pause => {
                self.page.pause()?;
                self.snapshot()
            }
            Command::Speed(ms) => self.set("speed_ms", ms),
            Command::Set { key, value } => self.set(&key, value),
            Command::Params => Ok(Reply::Params {
                page: self.kind().label(),
                params: self.page.params().to_vec(),
            }),
            Command::Show => self.snapshot(),
            Command::Arch(action) => {
                let page = self.page.log_prob_mut()?;
                match action {
                    ArchAction::Next => {
                        page.architecture_next();
                    }
                    ArchAction::Reset => page.architecture_reset(),
                    ArchAction::Toggle => {
                        page.toggle_architecture();
                    }
                }
                self.snapshot()
            }
            Command::Select(position) => {
                self.page.log_prob_mut()?.select(position)?;
                self.snapshot()
            }
            Command::Text { field, text } => {
                self.page.set_text(field, text)?;
                self.snapshot()
            }
            Command::Quit => Ok(Reply::Bye),
        }
    }

    fn set(&mut self, key: &str, value: f64) -> Result<Reply> {
        let applied = self.page.set_param(key, value)?;
        // Playback speed also applies to PPO pages opened later.
        if self.kind() == PageKind::Ppo && key == "speed_ms" {
            self.settings.ppo_speed_ms = applied as u64;
        }
        self.snapshot()
    }
}
