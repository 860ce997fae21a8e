//! Entity and input types
//!
//! Output types list their fields explicitly. A trainee's password hash is
//! only ever carried by [`TraineeCredentials`], which is not a GraphQL type.

use async_graphql::{InputObject, MaybeUndefined, SimpleObject, ID};

use crate::types::DateTime;

/// Registration status used when none is supplied.
pub const DEFAULT_REGISTRATION_STATUS: &str = "scheduled";

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
#[graphql(complex)]
pub struct Trainee {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub timezone: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A trainee together with the stored password hash, used only by login.
#[derive(Debug, Clone)]
pub struct TraineeCredentials {
    pub trainee: Trainee,
    pub password_hash: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct Workout {
    pub id: ID,
    pub name: String,
    /// Duration in minutes
    pub duration: i32,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A weekly availability slot, e.g. `monday 08:00-10:00`
#[derive(SimpleObject, InputObject, Debug, Clone, PartialEq, Eq)]
#[graphql(input_name = "AvailabilityInput")]
pub struct AvailabilitySlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
#[graphql(complex)]
pub struct Routine {
    pub id: ID,
    pub user_id: ID,
    pub availability: Vec<AvailabilitySlot>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
#[graphql(complex)]
pub struct Registration {
    pub id: ID,
    pub event_id: String,
    pub user_id: ID,
    pub invitee_email: String,
    pub start_time: DateTime,
    pub end_time: Option<DateTime>,
    pub status: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Result of the `me` query
#[derive(SimpleObject, Debug, Clone)]
pub struct Session {
    pub authenticated: bool,
    pub trainee: Option<Trainee>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            trainee: None,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub trainee: Trainee,
}

// -----------------------------------------------------------------------------
// Inputs
// -----------------------------------------------------------------------------

#[derive(InputObject, Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct TraineeInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub timezone: Option<String>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct TraineeUpdateInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub timezone: MaybeUndefined<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct WorkoutInput {
    pub name: String,
    pub duration: i32,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct WorkoutUpdateInput {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub description: MaybeUndefined<String>,
    pub color: MaybeUndefined<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct RoutineInput {
    pub user_id: ID,
    pub availability: Vec<AvailabilitySlot>,
}

#[derive(InputObject, Debug, Clone)]
pub struct RoutineUpdateInput {
    pub availability: Vec<AvailabilitySlot>,
}

#[derive(InputObject, Debug, Clone)]
pub struct RegistrationInput {
    pub event_id: String,
    pub user_id: ID,
    pub invitee_email: String,
    pub start_time: DateTime,
    pub end_time: Option<DateTime>,
    pub status: Option<String>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct RegistrationUpdateInput {
    pub event_id: Option<String>,
    pub user_id: Option<ID>,
    pub invitee_email: Option<String>,
    pub start_time: Option<DateTime>,
    pub end_time: MaybeUndefined<DateTime>,
    pub status: Option<String>,
}

// -----------------------------------------------------------------------------
// Store-facing records
// -----------------------------------------------------------------------------

/// Field change for a nullable column: `None` leaves it untouched,
/// `Some(None)` clears it.
pub type Nullable<T> = Option<Option<T>>;

pub(crate) fn nullable<T>(value: MaybeUndefined<T>) -> Nullable<T> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(v) => Some(Some(v)),
    }
}

#[derive(Debug, Clone)]
pub struct NewTrainee {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TraineeChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub timezone: Nullable<String>,
}

#[derive(Debug, Clone)]
pub struct NewWorkout {
    pub name: String,
    pub duration: i32,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl From<WorkoutInput> for NewWorkout {
    fn from(input: WorkoutInput) -> Self {
        Self {
            name: input.name,
            duration: input.duration,
            description: input.description,
            color: input.color,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkoutChanges {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub description: Nullable<String>,
    pub color: Nullable<String>,
}

impl From<WorkoutUpdateInput> for WorkoutChanges {
    fn from(input: WorkoutUpdateInput) -> Self {
        Self {
            name: input.name,
            duration: input.duration,
            description: nullable(input.description),
            color: nullable(input.color),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub event_id: String,
    pub user_id: ID,
    pub invitee_email: String,
    pub start_time: DateTime,
    pub end_time: Option<DateTime>,
    pub status: String,
}

impl From<RegistrationInput> for NewRegistration {
    fn from(input: RegistrationInput) -> Self {
        Self {
            event_id: input.event_id,
            user_id: input.user_id,
            invitee_email: input.invitee_email,
            start_time: input.start_time,
            end_time: input.end_time,
            status: input
                .status
                .unwrap_or_else(|| DEFAULT_REGISTRATION_STATUS.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationChanges {
    pub event_id: Option<String>,
    pub user_id: Option<ID>,
    pub invitee_email: Option<String>,
    pub start_time: Option<DateTime>,
    pub end_time: Nullable<DateTime>,
    pub status: Option<String>,
}

impl From<RegistrationUpdateInput> for RegistrationChanges {
    fn from(input: RegistrationUpdateInput) -> Self {
        Self {
            event_id: input.event_id,
            user_id: input.user_id,
            invitee_email: input.invitee_email,
            start_time: input.start_time,
            end_time: nullable(input.end_time),
            status: input.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_distinguishes_absent_from_null() {
        assert_eq!(nullable::<String>(MaybeUndefined::Undefined), None);
        assert_eq!(nullable::<String>(MaybeUndefined::Null), Some(None));
        assert_eq!(
            nullable(MaybeUndefined::Value("#fff".to_string())),
            Some(Some("#fff".to_string()))
        );
    }

    #[test]
    fn test_registration_status_defaults_to_scheduled() {
        let input = RegistrationInput {
            event_id: "event-123".into(),
            user_id: ID::from("t-1"),
            invitee_email: "a@example.com".into(),
            start_time: DateTime::now(),
            end_time: None,
            status: None,
        };
        assert_eq!(NewRegistration::from(input).status, "scheduled");
    }
}
