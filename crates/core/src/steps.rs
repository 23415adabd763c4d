//! Step-by-step reference guides, looked up by build name and type.

use std::collections::{BTreeMap, HashMap};

use crate::model::{BuildStep, BuildType};

/// `(age, time, action, details, resources)` for one step.
type StepRow = (&'static str, &'static str, &'static str, &'static str, &'static [(&'static str, i64)]);

const SCOUT_RUSH: &[StepRow] = &[
    (
        "Dark Age",
        "0:00-2:00",
        "Train 6 villagers",
        "Queue 6 villagers at the Town Center. 4 on sheep, 2 on wood.",
        &[("food", 300), ("wood", 0)],
    ),
    (
        "Dark Age",
        "2:00-4:00",
        "Build a house and a lumber camp",
        "Build 1 house and 1 lumber camp. 2 villagers on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "4:00-6:00",
        "Build 2 more houses",
        "Build 2 extra houses. Keep 2 on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "6:00-8:00",
        "Build a barracks",
        "Build the barracks close to the enemy. 1 villager on stone, the rest on food and wood.",
        &[("food", 0), ("wood", 175), ("stone", 100)],
    ),
    (
        "Dark Age",
        "8:00-10:00",
        "Research Loom",
        "Research Loom at the Town Center before clicking up to Feudal Age.",
        &[("food", 50), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "10:00-12:00",
        "Build a stable",
        "Build a stable as soon as Feudal Age lands.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Feudal Age",
        "12:00-15:00",
        "Train scouts",
        "Train 3-4 scouts and raid the enemy. Keep production going.",
        &[("food", 80), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "15:00+",
        "Keep up the pressure",
        "Keep raiding with scouts and add stables if needed.",
        &[("food", 80), ("gold", 0)],
    ),
];

const ARCHER_RUSH: &[StepRow] = &[
    (
        "Dark Age",
        "0:00-2:00",
        "Train 6 villagers",
        "Queue 6 villagers. 4 on sheep, 2 on wood.",
        &[("food", 300), ("wood", 0)],
    ),
    (
        "Dark Age",
        "2:00-4:00",
        "Build a lumber camp",
        "Build a lumber camp. 2 villagers on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "4:00-6:00",
        "Build houses",
        "Build 2 houses. Keep 2 on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "6:00-8:00",
        "Build a barracks",
        "Build a barracks. 1 villager on stone, the rest on food and wood.",
        &[("food", 0), ("wood", 175), ("stone", 100)],
    ),
    (
        "Dark Age",
        "8:00-10:00",
        "Research Loom",
        "Research Loom before clicking up to Feudal Age.",
        &[("food", 50), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "10:00-12:00",
        "Build an archery range",
        "Build an archery range as soon as Feudal Age lands.",
        &[("food", 0), ("wood", 175)],
    ),
    (
        "Feudal Age",
        "12:00-15:00",
        "Train archers",
        "Train 4-6 archers. Build a blacksmith for upgrades.",
        &[("food", 25), ("wood", 50), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "15:00+",
        "Attack with archers",
        "Attack the enemy with archers. Add ranges if needed.",
        &[("food", 25), ("wood", 50), ("gold", 0)],
    ),
];

const GENERIC_FEUDAL_RUSH: &[StepRow] = &[
    (
        "Dark Age",
        "0:00-2:00",
        "Train 6 villagers",
        "Queue 6 villagers. 4 on sheep, 2 on wood.",
        &[("food", 300), ("wood", 0)],
    ),
    (
        "Dark Age",
        "2:00-4:00",
        "Build a lumber camp",
        "Build a lumber camp. 2 villagers on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "4:00-6:00",
        "Build houses",
        "Build 2 houses. Keep 2 on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "6:00-8:00",
        "Build a barracks",
        "Build the barracks close to the enemy.",
        &[("food", 0), ("wood", 175), ("stone", 100)],
    ),
    (
        "Dark Age",
        "8:00-10:00",
        "Research Loom",
        "Research Loom before clicking up to Feudal Age.",
        &[("food", 50), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "10:00+",
        "Feudal plan",
        "Carry out the build's own Feudal Age plan.",
        &[("food", 0), ("wood", 0), ("gold", 0)],
    ),
];

const GENERIC_FAST_CASTLE: &[StepRow] = &[
    (
        "Dark Age",
        "0:00-2:00",
        "Train 6 villagers",
        "Queue 6 villagers. 4 on sheep, 2 on wood.",
        &[("food", 300), ("wood", 0)],
    ),
    (
        "Dark Age",
        "2:00-4:00",
        "Build a lumber camp",
        "Build a lumber camp. 2 villagers on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "4:00-6:00",
        "Build houses",
        "Build 2 houses. Keep 2 on wood, 4 on sheep.",
        &[("food", 0), ("wood", 100)],
    ),
    (
        "Dark Age",
        "6:00-8:00",
        "Build a mining camp",
        "Build a mining camp on gold. 2 villagers on gold, 2 on wood, 2 on sheep.",
        &[("food", 0), ("wood", 100), ("stone", 0)],
    ),
    (
        "Dark Age",
        "8:00-10:00",
        "Research Loom",
        "Research Loom before clicking up to Feudal Age.",
        &[("food", 50), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "10:00-12:00",
        "Build a market and a blacksmith",
        "Build a market and a blacksmith. 3 villagers on gold, 2 on wood, 3 on sheep.",
        &[("food", 0), ("wood", 275), ("gold", 0)],
    ),
    (
        "Feudal Age",
        "12:00-15:00",
        "Click up to Castle Age",
        "Reach Castle Age as fast as possible. 4 villagers on gold, 2 on wood, 2 on sheep.",
        &[("food", 800), ("gold", 200)],
    ),
    (
        "Castle Age",
        "15:00+",
        "Castle plan",
        "Carry out the build's own Castle Age plan.",
        &[("food", 0), ("wood", 0), ("gold", 0)],
    ),
];

fn expand(rows: &[StepRow]) -> Vec<BuildStep> {
    rows.iter()
        .zip(1..)
        .map(|(&(age, time, action, details, resources), step_number)| BuildStep {
            step_number,
            age: age.into(),
            time: Some(time.into()),
            action: action.into(),
            details: details.into(),
            resources_needed: Some(resources.iter().map(|&(k, v)| (k.to_string(), v)).collect::<BTreeMap<_, _>>()),
        })
        .collect()
}

/// Lookup table of build guides.
///
/// A guide registered for an exact `(name, type)` pair wins over the
/// generic guide of the type.
#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    specific: HashMap<(String, BuildType), Vec<BuildStep>>,
    generic: HashMap<BuildType, Vec<BuildStep>>,
}

impl StepCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guides shipped with the service.
    pub fn builtin() -> Self {
        Self::new()
            .with_build("Scout Rush", BuildType::FeudalRush, expand(SCOUT_RUSH))
            .with_build("Archer Rush", BuildType::FeudalRush, expand(ARCHER_RUSH))
            .with_generic(BuildType::FeudalRush, expand(GENERIC_FEUDAL_RUSH))
            .with_generic(BuildType::FastCastle, expand(GENERIC_FAST_CASTLE))
    }

    pub fn with_build(mut self, name: impl Into<String>, build_type: BuildType, steps: Vec<BuildStep>) -> Self {
        self.specific.insert((name.into(), build_type), steps);
        self
    }

    pub fn with_generic(mut self, build_type: BuildType, steps: Vec<BuildStep>) -> Self {
        self.generic.insert(build_type, steps);
        self
    }

    /// Steps for a build: its own guide, else its type's, else none.
    pub fn steps_for(&self, name: &str, build_type: BuildType) -> Vec<BuildStep> {
        self.specific
            .get(&(name.to_string(), build_type))
            .or_else(|| self.generic.get(&build_type))
            .cloned()
            .unwrap_or_default()
    }
}
