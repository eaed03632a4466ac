//! Exercise catalog models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::UnknownVariant;

/// Muscle group an exercise primarily trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Chest,
    Back,
    Legs,
    Shoulders,
    Arms,
    Core,
    Cardio,
    #[serde(rename = "full body")]
    FullBody,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 8] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Legs,
        MuscleGroup::Shoulders,
        MuscleGroup::Arms,
        MuscleGroup::Core,
        MuscleGroup::Cardio,
        MuscleGroup::FullBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Arms => "arms",
            MuscleGroup::Core => "core",
            MuscleGroup::Cardio => "cardio",
            MuscleGroup::FullBody => "full body",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MuscleGroup {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MuscleGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "muscle group",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for MuscleGroup {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Exercise classification, which decides the measured parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Strength,
    Cardio,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Strength => "strength",
            ExerciseType::Cardio => "cardio",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strength" => Ok(ExerciseType::Strength),
            "cardio" => Ok(ExerciseType::Cardio),
            other => Err(UnknownVariant {
                kind: "exercise type",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ExerciseType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Durable exercise catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub muscle_group: MuscleGroup,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub exercise_type: ExerciseType,
    pub description: String,
    pub difficulty: i32,
    pub xp_per_set: i32,
    pub gold_per_set: i32,
}

impl Exercise {
    /// Catalog names are matched without regard to case
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Payload for inserting a catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct NewExercise {
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub exercise_type: ExerciseType,
    pub description: String,
    pub difficulty: i32,
    pub xp_per_set: i32,
    pub gold_per_set: i32,
}

/// Filters and ordering for catalog reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseQuery {
    pub muscle_group: Option<MuscleGroup>,
    #[serde(rename = "type")]
    pub exercise_type: Option<ExerciseType>,
    pub sort_by: Option<ExerciseSort>,
}

/// Catalog ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseSort {
    #[default]
    Name,
    Difficulty,
    Xp,
}

impl ExerciseQuery {
    /// Apply the filters and ordering to a catalog listing
    pub fn apply(&self, mut exercises: Vec<Exercise>) -> Vec<Exercise> {
        exercises.retain(|exercise| {
            self.muscle_group
                .is_none_or(|group| exercise.muscle_group == group)
                && self
                    .exercise_type
                    .is_none_or(|kind| exercise.exercise_type == kind)
        });

        match self.sort_by.unwrap_or_default() {
            ExerciseSort::Name => exercises.sort_by(|a, b| a.name.cmp(&b.name)),
            ExerciseSort::Difficulty => exercises.sort_by(|a, b| b.difficulty.cmp(&a.difficulty)),
            ExerciseSort::Xp => exercises.sort_by(|a, b| b.xp_per_set.cmp(&a.xp_per_set)),
        }

        exercises
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(name: &str, group: MuscleGroup, kind: ExerciseType, xp: i32) -> Exercise {
        Exercise {
            id: Uuid::new_v4(),
            name: name.to_string(),
            muscle_group: group,
            exercise_type: kind,
            description: String::new(),
            difficulty: 1,
            xp_per_set: xp,
            gold_per_set: 1,
        }
    }

    #[test]
    fn test_muscle_group_wire_names() {
        assert_eq!(
            serde_json::to_string(&MuscleGroup::FullBody).unwrap(),
            "\"full body\""
        );
        assert_eq!("full body".parse::<MuscleGroup>(), Ok(MuscleGroup::FullBody));
        assert!("neck".parse::<MuscleGroup>().is_err());
    }

    #[test]
    fn test_exercise_serializes_type_field() {
        let value = serde_json::to_value(exercise(
            "Running",
            MuscleGroup::Cardio,
            ExerciseType::Cardio,
            15,
        ))
        .unwrap();

        assert_eq!(value["type"], "cardio");
        assert_eq!(value["muscleGroup"], "cardio");
        assert_eq!(value["xpPerSet"], 15);
    }

    #[test]
    fn test_query_filters_and_sorts() {
        let exercises = vec![
            exercise("Squat", MuscleGroup::Legs, ExerciseType::Strength, 25),
            exercise("Lunge", MuscleGroup::Legs, ExerciseType::Strength, 15),
            exercise("Cycling", MuscleGroup::Cardio, ExerciseType::Cardio, 20),
        ];

        let query = ExerciseQuery {
            muscle_group: Some(MuscleGroup::Legs),
            exercise_type: None,
            sort_by: Some(ExerciseSort::Name),
        };
        let names: Vec<_> = query
            .apply(exercises.clone())
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Lunge", "Squat"]);

        let query = ExerciseQuery {
            sort_by: Some(ExerciseSort::Xp),
            ..Default::default()
        };
        let names: Vec<_> = query.apply(exercises).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Squat", "Cycling", "Lunge"]);
    }

    #[test]
    fn test_matches_name_ignores_case() {
        let bench = exercise("Bench Press", MuscleGroup::Chest, ExerciseType::Strength, 20);
        assert!(bench.matches_name("bench press"));
        assert!(bench.matches_name("BENCH PRESS"));
        assert!(!bench.matches_name("Bench"));
    }
}
