use serde::{Deserialize, Serialize};

pub const DEFAULT_DIFFICULTY: &str = "normal";

/// The closed set of limited-use actions a player can spend during a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum PowerUpKind {
    Hint,
    Skip,
    Investigate,
    EliminateTwo,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Hint,
        PowerUpKind::Skip,
        PowerUpKind::Investigate,
        PowerUpKind::EliminateTwo,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PowerUpKind::Hint => "Pista",
            PowerUpKind::Skip => "Saltar",
            PowerUpKind::Investigate => "Investigar",
            PowerUpKind::EliminateTwo => "Eliminar",
        }
    }
}

/// Remaining uses per power-up kind. Serialized under the save file's
/// `comodines` keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpCounts {
    #[serde(rename = "pista", default)]
    pub hint: u32,
    #[serde(rename = "saltar", default)]
    pub skip: u32,
    #[serde(rename = "investigar", default)]
    pub investigate: u32,
    #[serde(rename = "eliminar", default)]
    pub eliminate: u32,
}

impl PowerUpCounts {
    pub const fn new(hint: u32, skip: u32, investigate: u32, eliminate: u32) -> Self {
        Self {
            hint,
            skip,
            investigate,
            eliminate,
        }
    }

    pub fn remaining(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::Hint => self.hint,
            PowerUpKind::Skip => self.skip,
            PowerUpKind::Investigate => self.investigate,
            PowerUpKind::EliminateTwo => self.eliminate,
        }
    }

    /// Consume one use. Returns false (and changes nothing) when none remain.
    pub fn spend(&mut self, kind: PowerUpKind) -> bool {
        let slot = match kind {
            PowerUpKind::Hint => &mut self.hint,
            PowerUpKind::Skip => &mut self.skip,
            PowerUpKind::Investigate => &mut self.investigate,
            PowerUpKind::EliminateTwo => &mut self.eliminate,
        };
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

/// A named bundle of game rules. `starting_lives == 0` encodes unlimited
/// lives (never decremented).
#[derive(Clone, Debug, PartialEq)]
pub struct DifficultyProfile {
    pub name: &'static str,
    pub starting_lives: u32,
    pub normal_time_limit_secs: u32,
    pub bonus_time_limit_secs: u32,
    pub bonus_probability: f64,
    pub bonus_life_reward: u32,
    pub anti_cheat_enabled: bool,
    pub power_ups: PowerUpCounts,
    pub can_save: bool,
    pub hardcore_on_wrong_answer: bool,
}

pub const PROFILES: [DifficultyProfile; 4] = [
    DifficultyProfile {
        name: "facil",
        starting_lives: 0,
        normal_time_limit_secs: 45,
        bonus_time_limit_secs: 20,
        bonus_probability: 0.25,
        bonus_life_reward: 0,
        anti_cheat_enabled: false,
        power_ups: PowerUpCounts::new(3, 2, 2, 2),
        can_save: true,
        hardcore_on_wrong_answer: false,
    },
    DifficultyProfile {
        name: "normal",
        starting_lives: 5,
        normal_time_limit_secs: 30,
        bonus_time_limit_secs: 15,
        bonus_probability: 0.20,
        bonus_life_reward: 1,
        anti_cheat_enabled: true,
        power_ups: PowerUpCounts::new(2, 1, 1, 1),
        can_save: true,
        hardcore_on_wrong_answer: false,
    },
    DifficultyProfile {
        name: "dificil",
        starting_lives: 3,
        normal_time_limit_secs: 20,
        bonus_time_limit_secs: 10,
        bonus_probability: 0.15,
        bonus_life_reward: 1,
        anti_cheat_enabled: true,
        power_ups: PowerUpCounts::new(1, 1, 1, 1),
        can_save: true,
        hardcore_on_wrong_answer: false,
    },
    DifficultyProfile {
        name: "hardcore",
        starting_lives: 1,
        normal_time_limit_secs: 10,
        bonus_time_limit_secs: 5,
        bonus_probability: 0.10,
        bonus_life_reward: 0,
        anti_cheat_enabled: true,
        power_ups: PowerUpCounts::new(0, 0, 0, 0),
        can_save: false,
        hardcore_on_wrong_answer: true,
    },
];

impl DifficultyProfile {
    pub fn by_name(name: &str) -> Option<&'static DifficultyProfile> {
        PROFILES.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn default_profile() -> &'static DifficultyProfile {
        Self::by_name(DEFAULT_DIFFICULTY).expect("default difficulty is registered")
    }

    pub fn all() -> &'static [DifficultyProfile] {
        &PROFILES
    }

    pub fn unlimited_lives(&self) -> bool {
        self.starting_lives == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(DifficultyProfile::by_name("Normal").unwrap().name, "normal");
        assert_eq!(
            DifficultyProfile::by_name("HARDCORE").unwrap().name,
            "hardcore"
        );
        assert!(DifficultyProfile::by_name("imposible").is_none());
    }

    #[test]
    fn default_profile_is_normal() {
        let profile = DifficultyProfile::default_profile();

        assert_eq!(profile.name, "normal");
        assert_eq!(profile.starting_lives, 5);
        assert!(!profile.unlimited_lives());
    }

    #[test]
    fn facil_has_unlimited_lives() {
        let profile = DifficultyProfile::by_name("facil").unwrap();

        assert!(profile.unlimited_lives());
        assert!(!profile.anti_cheat_enabled);
    }

    #[test]
    fn hardcore_disables_saving() {
        let profile = DifficultyProfile::by_name("hardcore").unwrap();

        assert!(!profile.can_save);
        assert!(profile.hardcore_on_wrong_answer);
        assert_eq!(profile.power_ups, PowerUpCounts::default());
    }

    #[test]
    fn spend_decrements_until_empty() {
        let mut counts = PowerUpCounts::new(2, 0, 0, 0);

        assert!(counts.spend(PowerUpKind::Hint));
        assert!(counts.spend(PowerUpKind::Hint));
        assert!(!counts.spend(PowerUpKind::Hint));
        assert_eq!(counts.remaining(PowerUpKind::Hint), 0);
        assert!(!counts.spend(PowerUpKind::Skip));
    }

    #[test]
    fn counts_serialize_under_spanish_keys() {
        let counts = PowerUpCounts::new(2, 1, 1, 1);
        let json = serde_json::to_value(counts).unwrap();

        assert_eq!(json["pista"], 2);
        assert_eq!(json["saltar"], 1);
        assert_eq!(json["investigar"], 1);
        assert_eq!(json["eliminar"], 1);
    }

    #[test]
    fn all_profiles_have_distinct_names() {
        use itertools::Itertools;

        assert!(PROFILES.iter().map(|p| p.name).all_unique());
    }
}
