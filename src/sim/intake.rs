//! Event intake
//!
//! Inbound requests arrive as JSON lines, either as direct requests
//! (`spawnRequest`, `freezeRequest`, `resetRequest`) or as raw stream
//! notices (`gift`, `like`) that are routed into requests here. Requests are
//! buffered in a bounded FIFO and drained at the start of each tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::ball::Owner;
use crate::config::GameConfig;

/// Palette used when a spawn request carries no color
pub const NEON_COLORS: [&str; 20] = [
    "#ff00ff", "#00ffff", "#ff0080", "#80ff00", "#ff8000", "#00ff80", "#8000ff", "#ff0040",
    "#40ff00", "#00ff40", "#ff4000", "#0040ff", "#ff00bf", "#bfff00", "#00bfff", "#ff6600",
    "#6600ff", "#00ff66", "#ff0066", "#66ff00",
];

/// Request for one new ball
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpawnRequest {
    pub owner_id: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub color: Option<String>,
}

impl SpawnRequest {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Resolve the owner record
    ///
    /// An empty owner id is credited to `default_id`, a missing display name
    /// falls back to the owner id and a missing color to `pick_color`.
    pub fn into_owner(self, default_id: &str, pick_color: impl FnOnce() -> String) -> Owner {
        let id = match self.owner_id.trim() {
            "" => default_id.to_string(),
            id => id.to_string(),
        };
        let display_name = self
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        let color = self
            .color
            .filter(|color| !color.trim().is_empty())
            .unwrap_or_else(pick_color);
        Owner {
            id,
            display_name,
            avatar: self.avatar_ref.filter(|a| !a.is_empty()),
            color,
        }
    }
}

/// Request to freeze every ball of one owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FreezeRequest {
    pub owner_id: String,
}

/// Inbound request applied by the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntakeEvent {
    SpawnRequest(SpawnRequest),
    FreezeRequest(FreezeRequest),
    ResetRequest,
}

/// Gift forwarded from the livestream bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GiftNotice {
    pub owner_id: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub gift_id: u32,
    pub repeat_count: u32,
    /// False while a repeat streak is still in progress
    pub repeat_end: bool,
}

impl Default for GiftNotice {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            display_name: None,
            avatar_ref: None,
            gift_id: 0,
            repeat_count: 1,
            repeat_end: true,
        }
    }
}

/// Likes forwarded from the livestream bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LikeNotice {
    pub owner_id: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
    pub like_count: u32,
}

/// Raw audience notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamNotice {
    Gift(GiftNotice),
    Like(LikeNotice),
}

impl StreamNotice {
    /// Route a notice into requests
    ///
    /// Gift streaks only count once finished. The freeze gift becomes one
    /// freeze request; other gifts spawn `repeat_count` balls. Likes spawn
    /// up to `max_like_balls`.
    pub fn into_requests(self, config: &GameConfig) -> Vec<IntakeEvent> {
        match self {
            StreamNotice::Gift(gift) => {
                if !gift.repeat_end {
                    log::debug!("Gift streak from {} still running, skipped", gift.owner_id);
                    return Vec::new();
                }
                if gift.gift_id == config.freeze_gift_id {
                    return vec![IntakeEvent::FreezeRequest(FreezeRequest {
                        owner_id: gift.owner_id,
                    })];
                }
                let request = SpawnRequest {
                    owner_id: gift.owner_id,
                    display_name: gift.display_name,
                    avatar_ref: gift.avatar_ref,
                    color: None,
                };
                spawn_requests(request, gift.repeat_count.max(1))
            }
            StreamNotice::Like(like) => {
                let count = like.like_count.clamp(1, config.max_like_balls.max(1));
                let request = SpawnRequest {
                    owner_id: like.owner_id,
                    display_name: like.display_name,
                    avatar_ref: like.avatar_ref,
                    color: None,
                };
                spawn_requests(request, count)
            }
        }
    }
}

fn spawn_requests(request: SpawnRequest, count: u32) -> Vec<IntakeEvent> {
    (0..count)
        .map(|_| IntakeEvent::SpawnRequest(request.clone()))
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Inbound {
    Event(IntakeEvent),
    Notice(StreamNotice),
}

/// Parse one JSON line into requests
///
/// Malformed lines yield nothing and are logged.
pub fn parse_line(line: &str, config: &GameConfig) -> Vec<IntakeEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Inbound>(line) {
        Ok(Inbound::Event(event)) => vec![event],
        Ok(Inbound::Notice(notice)) => notice.into_requests(config),
        Err(err) => {
            log::warn!("Dropped malformed event ({}): {}", err, line);
            Vec::new()
        }
    }
}

/// Bounded FIFO of pending requests
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<IntakeEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Append an event; a full queue drops it and returns false
    pub fn push(&mut self, event: IntakeEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            log::warn!(
                "Intake queue full ({}), dropped {:?} ({} dropped so far)",
                self.capacity,
                event,
                self.dropped
            );
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Take every pending event in arrival order
    pub fn drain(&mut self) -> Vec<IntakeEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events lost to overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
