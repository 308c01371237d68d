//! A game slot: the only mutable lobby entity besides the clients.

use std::time::{Duration, Instant};

use parlor_session::UserId;

use crate::RuleSet;

/// Lifecycle of a slot.
///
/// A slot is `Free` until a host claims it (`InCreation`), becomes
/// joinable once the host finishes configuring rules (`RuleSet`), and is
/// `Busy` while a game runs or the slot is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotStatus {
    Disabled = 0,
    Free = 1,
    InCreation = 2,
    RuleSet = 3,
    Busy = 4,
}

impl SlotStatus {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Scenario id of the default (training) scenario.
pub const SCENARIO_TRAINING: u8 = 0;

/// Media type "not set".
pub const MEDIA_NOT_SET: u8 = 0;

/// One configurable game-session placeholder.
#[derive(Debug, Clone)]
pub struct Slot {
    name: Vec<u8>,
    status: SlotStatus,
    password: Vec<u8>,
    protected: bool,
    scenario: u8,
    media_type: u8,
    rules: RuleSet,
    game_number: u32,
    /// Auto-start deadline; unset reads as already expired.
    expires_at: Option<Instant>,
    host: Option<UserId>,
}

impl Slot {
    /// Creates a fresh slot named after its coordinates.
    pub fn new(area: u16, room: u16, number: u16) -> Self {
        Self {
            name: format!("a{area}-r{room}-s{number}").into_bytes(),
            status: SlotStatus::Free,
            password: Vec::new(),
            protected: false,
            scenario: SCENARIO_TRAINING,
            media_type: MEDIA_NOT_SET,
            rules: RuleSet::new(),
            game_number: 0,
            expires_at: None,
            host: None,
        }
    }

    /// Restores every field to its Free defaults.
    pub fn reset(&mut self) {
        self.name = b"(free)".to_vec();
        self.status = SlotStatus::Free;
        self.password.clear();
        self.protected = false;
        self.scenario = SCENARIO_TRAINING;
        self.media_type = MEDIA_NOT_SET;
        self.rules.reset();
        self.game_number = 0;
        self.expires_at = None;
        self.host = None;
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn set_name(&mut self, name: Vec<u8>) {
        self.name = name;
    }

    pub fn status(&self) -> SlotStatus {
        self.status
    }

    pub fn set_status(&mut self, status: SlotStatus) {
        self.status = status;
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }

    /// Sets the password; a non-empty password turns protection on.
    pub fn set_password(&mut self, password: Vec<u8>) {
        self.protected = !password.is_empty();
        self.password = password;
    }

    /// Protection flag as sent on the wire (1 = password required).
    pub fn protection(&self) -> u8 {
        u8::from(self.protected)
    }

    pub fn scenario(&self) -> u8 {
        self.scenario
    }

    pub fn set_scenario(&mut self, scenario: u8) {
        self.scenario = scenario;
    }

    pub fn media_type(&self) -> u8 {
        self.media_type
    }

    pub fn set_media_type(&mut self, media_type: u8) {
        self.media_type = media_type;
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    pub fn game_number(&self) -> u32 {
        self.game_number
    }

    pub fn set_game_number(&mut self, game_number: u32) {
        self.game_number = game_number;
    }

    pub fn host(&self) -> Option<&UserId> {
        self.host.as_ref()
    }

    pub fn set_host(&mut self, host: UserId) {
        self.host = Some(host);
    }

    /// Arms the auto-start timer from the wait-limit rule.
    pub fn arm_timer(&mut self) {
        let wait = Duration::from_secs(self.rules.wait_minutes() * 60);
        self.expires_at = Some(Instant::now() + wait);
    }

    /// Remaining seconds on the auto-start timer; an unset or expired
    /// timer reads 0.
    pub fn remaining_secs(&self) -> u64 {
        match self.expires_at {
            Some(deadline) => {
                deadline.saturating_duration_since(Instant::now()).as_secs()
            }
            None => 0,
        }
    }
}
