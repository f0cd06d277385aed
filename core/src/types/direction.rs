//! Navigation vocabulary for panes and windows.
//!
//! Each variant maps to the token placed inside tmux's `{...}` target syntax.
//! `LastActive` is spelled `active` in both vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MuxError;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaneDirection {
    #[serde(rename = "active")]
    LastActive,
    Next,
    Previous,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    UpOf,
    DownOf,
    LeftOf,
    RightOf,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowDirection {
    Start,
    End,
    #[serde(rename = "active")]
    LastActive,
    Next,
    Previous,
}


impl PaneDirection {
    pub const ALL: [PaneDirection; 15] = [
        PaneDirection::LastActive,
        PaneDirection::Next,
        PaneDirection::Previous,
        PaneDirection::Top,
        PaneDirection::Bottom,
        PaneDirection::Left,
        PaneDirection::Right,
        PaneDirection::TopLeft,
        PaneDirection::TopRight,
        PaneDirection::BottomLeft,
        PaneDirection::BottomRight,
        PaneDirection::UpOf,
        PaneDirection::DownOf,
        PaneDirection::LeftOf,
        PaneDirection::RightOf,
    ];

    pub fn token(self) -> &'static str {
        match self {
            PaneDirection::LastActive => "active",
            PaneDirection::Next => "next",
            PaneDirection::Previous => "previous",
            PaneDirection::Top => "top",
            PaneDirection::Bottom => "bottom",
            PaneDirection::Left => "left",
            PaneDirection::Right => "right",
            PaneDirection::TopLeft => "top-left",
            PaneDirection::TopRight => "top-right",
            PaneDirection::BottomLeft => "bottom-left",
            PaneDirection::BottomRight => "bottom-right",
            PaneDirection::UpOf => "up-of",
            PaneDirection::DownOf => "down-of",
            PaneDirection::LeftOf => "left-of",
            PaneDirection::RightOf => "right-of",
        }
    }
}


impl WindowDirection {
    pub const ALL: [WindowDirection; 5] = [
        WindowDirection::Start,
        WindowDirection::End,
        WindowDirection::LastActive,
        WindowDirection::Next,
        WindowDirection::Previous,
    ];

    pub fn token(self) -> &'static str {
        match self {
            WindowDirection::Start => "start",
            WindowDirection::End => "end",
            WindowDirection::LastActive => "active",
            WindowDirection::Next => "next",
            WindowDirection::Previous => "previous",
        }
    }
}


impl fmt::Display for PaneDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for WindowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}


impl FromStr for PaneDirection {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        PaneDirection::ALL
            .into_iter()
            .find(|d| d.token() == wanted || (wanted == "last-active" && *d == PaneDirection::LastActive))
            .ok_or_else(|| MuxError::config(format!("unknown pane direction: '{}'", s)))
    }
}

impl FromStr for WindowDirection {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        WindowDirection::ALL
            .into_iter()
            .find(|d| d.token() == wanted || (wanted == "last-active" && *d == WindowDirection::LastActive))
            .ok_or_else(|| MuxError::config(format!("unknown window direction: '{}'", s)))
    }
}
