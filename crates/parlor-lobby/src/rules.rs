//! The per-slot rule set and its choice tables.
//!
//! Every slot carries the same four rules; only the values change. The
//! choice tables are static and queried by name/attribute during slot
//! configuration.

/// One rule or rule choice: a display name, an attribute byte, and a value.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub attribute: u8,
    pub value: u8,
}

impl Rule {
    const fn new(name: &'static str, attribute: u8, value: u8) -> Self {
        Self {
            name,
            attribute,
            value,
        }
    }
}

/// Rule indices within a set.
pub const RULE_PLAYERS: usize = 0;
pub const RULE_WAIT: usize = 1;
pub const RULE_DIFFICULTY: usize = 2;
pub const RULE_FRIENDLY_FIRE: usize = 3;

const DEFAULT_VALUES: [u8; 4] = [2, 2, 3, 0];

const CHOICES: [&[Rule]; 4] = [
    &[
        Rule::new("two players", 0, 0),
        Rule::new("three players", 0, 0),
        Rule::new("four players", 0, 0),
    ],
    &[
        Rule::new("three minutes", 0, 0),
        Rule::new("five minutes", 0, 0),
        Rule::new("ten minutes", 0, 0),
        Rule::new("fifteen minutes", 0, 0),
        Rule::new("thirty minutes", 0, 0),
    ],
    &[
        Rule::new("easy", 0, 0),
        Rule::new("normal", 0, 0),
        Rule::new("hard", 0, 0),
        Rule::new("very hard", 0, 0),
    ],
    &[Rule::new("off", 0, 0), Rule::new("on", 0, 0)],
];

/// The standard rule set of a slot.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: [Rule; 4],
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            rules: [
                Rule::new("number of players", 1, DEFAULT_VALUES[0]),
                Rule::new("wait limit", 1, DEFAULT_VALUES[1]),
                Rule::new("difficulty level", 1, DEFAULT_VALUES[2]),
                Rule::new("friendly fire", 1, DEFAULT_VALUES[3]),
            ],
        }
    }

    /// Restores the default values.
    pub fn reset(&mut self) {
        for (rule, default) in self.rules.iter_mut().zip(DEFAULT_VALUES) {
            rule.value = default;
        }
    }

    pub fn count(&self) -> u8 {
        self.rules.len() as u8
    }

    pub fn name(&self, rule: usize) -> &'static str {
        self.rules.get(rule).map(|r| r.name).unwrap_or("")
    }

    pub fn attribute(&self, rule: usize) -> u8 {
        self.rules.get(rule).map(|r| r.attribute).unwrap_or(0)
    }

    pub fn value(&self, rule: usize) -> u8 {
        self.rules.get(rule).map(|r| r.value).unwrap_or(0)
    }

    pub fn set_value(&mut self, rule: usize, value: u8) {
        if let Some(r) = self.rules.get_mut(rule) {
            r.value = value;
        }
    }

    pub fn choice_count(&self, rule: usize) -> u8 {
        CHOICES.get(rule).map(|c| c.len() as u8).unwrap_or(0)
    }

    pub fn choice_name(&self, rule: usize, choice: usize) -> &'static str {
        CHOICES
            .get(rule)
            .and_then(|c| c.get(choice))
            .map(|r| r.name)
            .unwrap_or("")
    }

    pub fn choice_attribute(&self, rule: usize, choice: usize) -> u8 {
        CHOICES
            .get(rule)
            .and_then(|c| c.get(choice))
            .map(|r| r.attribute)
            .unwrap_or(0)
    }

    pub fn difficulty(&self) -> u8 {
        self.value(RULE_DIFFICULTY)
    }

    pub fn friendly_fire(&self) -> u8 {
        self.value(RULE_FRIENDLY_FIRE)
    }

    /// Player capacity encoded by the players rule: 0→2, 1→3, 2→4.
    pub fn max_players(&self) -> u8 {
        match self.value(RULE_PLAYERS) {
            0 => 2,
            1 => 3,
            2 => 4,
            _ => 2,
        }
    }

    /// Wait-limit bucket in minutes: 0→3, 1→5, 2→10, 3→15, 4→30.
    pub fn wait_minutes(&self) -> u64 {
        match self.value(RULE_WAIT) {
            0 => 3,
            1 => 5,
            2 => 10,
            3 => 15,
            4 => 30,
            _ => 30,
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rules = RuleSet::new();
        assert_eq!(rules.count(), 4);
        assert_eq!(rules.value(RULE_PLAYERS), 2);
        assert_eq!(rules.value(RULE_WAIT), 2);
        assert_eq!(rules.value(RULE_DIFFICULTY), 3);
        assert_eq!(rules.value(RULE_FRIENDLY_FIRE), 0);
    }

    #[test]
    fn test_max_players_mapping() {
        let mut rules = RuleSet::new();
        for (value, expected) in [(0, 2), (1, 3), (2, 4), (9, 2)] {
            rules.set_value(RULE_PLAYERS, value);
            assert_eq!(rules.max_players(), expected);
        }
    }

    #[test]
    fn test_wait_minutes_mapping() {
        let mut rules = RuleSet::new();
        for (value, expected) in [(0, 3), (1, 5), (2, 10), (3, 15), (4, 30), (9, 30)]
        {
            rules.set_value(RULE_WAIT, value);
            assert_eq!(rules.wait_minutes(), expected);
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut rules = RuleSet::new();
        rules.set_value(RULE_PLAYERS, 0);
        rules.set_value(RULE_DIFFICULTY, 1);
        rules.reset();
        assert_eq!(rules.value(RULE_PLAYERS), 2);
        assert_eq!(rules.value(RULE_DIFFICULTY), 3);
    }

    #[test]
    fn test_choice_tables() {
        let rules = RuleSet::new();
        assert_eq!(rules.choice_count(RULE_PLAYERS), 3);
        assert_eq!(rules.choice_count(RULE_WAIT), 5);
        assert_eq!(rules.choice_count(RULE_DIFFICULTY), 4);
        assert_eq!(rules.choice_count(RULE_FRIENDLY_FIRE), 2);
        assert_eq!(rules.choice_name(RULE_PLAYERS, 2), "four players");
        assert_eq!(rules.choice_name(RULE_FRIENDLY_FIRE, 1), "on");
        assert_eq!(rules.choice_attribute(RULE_WAIT, 0), 0);
    }

    #[test]
    fn test_out_of_range_lookups_are_defaults() {
        let rules = RuleSet::new();
        assert_eq!(rules.name(9), "");
        assert_eq!(rules.value(9), 0);
        assert_eq!(rules.choice_name(0, 99), "");
    }
}
