//! Bundled exercise catalog
//!
//! This is the source of truth for reward rates. The durable `exercises`
//! table mirrors it and is reconciled lazily by name.

use crate::models::{ExerciseType, MuscleGroup, NewExercise};

/// A catalog entry keyed by a stable slug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub muscle_group: MuscleGroup,
    pub exercise_type: ExerciseType,
    pub description: &'static str,
    /// 1 = beginner, 2 = intermediate, 3 = advanced
    pub difficulty: i32,
    pub xp_per_set: i32,
    pub gold_per_set: i32,
}

impl CatalogEntry {
    pub fn to_new_exercise(&self) -> NewExercise {
        NewExercise {
            name: self.name.to_string(),
            muscle_group: self.muscle_group,
            exercise_type: self.exercise_type,
            description: self.description.to_string(),
            difficulty: self.difficulty,
            xp_per_set: self.xp_per_set,
            gold_per_set: self.gold_per_set,
        }
    }
}

const fn strength(
    id: &'static str,
    name: &'static str,
    muscle_group: MuscleGroup,
    description: &'static str,
    difficulty: i32,
    xp_per_set: i32,
    gold_per_set: i32,
) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        muscle_group,
        exercise_type: ExerciseType::Strength,
        description,
        difficulty,
        xp_per_set,
        gold_per_set,
    }
}

const fn cardio(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    difficulty: i32,
    xp_per_set: i32,
    gold_per_set: i32,
) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        muscle_group: MuscleGroup::Cardio,
        exercise_type: ExerciseType::Cardio,
        description,
        difficulty,
        xp_per_set,
        gold_per_set,
    }
}

#[rustfmt::skip]
pub static CATALOG: [CatalogEntry; 20] = [
    strength("bench-press", "Bench Press", MuscleGroup::Chest, "Press a barbell up from the chest while lying on a flat bench.", 2, 20, 10),
    strength("push-up", "Push-Up", MuscleGroup::Chest, "Lower and raise the body with the arms while keeping a straight plank.", 1, 10, 5),
    strength("chest-fly", "Dumbbell Fly", MuscleGroup::Chest, "Open and close the arms in a wide arc while lying on a bench.", 2, 15, 8),
    strength("deadlift", "Deadlift", MuscleGroup::Back, "Lift a loaded barbell from the floor to hip height with a neutral spine.", 3, 30, 15),
    strength("pull-up", "Pull-Up", MuscleGroup::Back, "Hang from a bar and pull the chin above it.", 2, 20, 10),
    strength("bent-over-row", "Bent-Over Row", MuscleGroup::Back, "Row a barbell to the lower chest while hinged at the hips.", 2, 20, 10),
    strength("squat", "Squat", MuscleGroup::Legs, "Lower the hips below the knees with a barbell on the back and stand up.", 2, 20, 10),
    strength("lunge", "Lunge", MuscleGroup::Legs, "Step forward and lower the back knee towards the floor.", 1, 15, 8),
    strength("leg-press", "Leg Press", MuscleGroup::Legs, "Push a weighted sled away using the legs.", 1, 15, 8),
    strength("overhead-press", "Overhead Press", MuscleGroup::Shoulders, "Press a barbell from the shoulders to full lockout overhead.", 2, 20, 10),
    strength("lateral-raise", "Lateral Raise", MuscleGroup::Shoulders, "Raise dumbbells out to the sides up to shoulder height.", 1, 10, 5),
    strength("bicep-curl", "Bicep Curl", MuscleGroup::Arms, "Curl dumbbells from the hips to the shoulders.", 1, 10, 5),
    strength("tricep-dip", "Tricep Dip", MuscleGroup::Arms, "Lower and raise the body between parallel bars.", 2, 15, 8),
    strength("plank", "Plank", MuscleGroup::Core, "Hold a straight forearm plank.", 1, 10, 5),
    strength("crunch", "Crunch", MuscleGroup::Core, "Curl the shoulders towards the hips while lying on the back.", 1, 10, 5),
    strength("burpee", "Burpee", MuscleGroup::FullBody, "Drop to a push-up, jump the feet in and leap up.", 3, 25, 12),
    cardio("running", "Running", "Run at a steady pace.", 2, 20, 10),
    cardio("cycling", "Cycling", "Ride a bike or a stationary cycle.", 1, 15, 8),
    cardio("rowing", "Rowing", "Pull through full strokes on a rowing machine.", 2, 20, 10),
    cardio("jump-rope", "Jump Rope", "Skip a rope continuously.", 2, 15, 8),
];

/// Look up an entry by its stable slug
pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.id == id)
}

/// All bundled entries
pub fn entries() -> &'static [CatalogEntry] {
    &CATALOG
}
