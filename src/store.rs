//! Data source behind the resolvers
//!
//! [`Store`] is the persistence seam. [`MemoryStore`] keeps every table
//! behind a single lock, so multi-read operations such as
//! [`Store::trainee_page`] observe one consistent snapshot.

use async_graphql::ID;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AvailabilitySlot, NewRegistration, NewTrainee, NewWorkout, Registration, RegistrationChanges,
    Routine, Trainee, TraineeChanges, TraineeCredentials, Workout, WorkoutChanges,
};
use crate::pagination::{Page, Window};
use crate::types::DateTime;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique column already holds the value.
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(&'static str),

    /// The backend could not be reached or failed mid-operation. `MemoryStore`
    /// never returns it; database-backed stores map driver errors here.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence operations used by the schema
///
/// Update operations return `Ok(None)` and deletes return `Ok(false)` when the
/// target row does not exist. Multi-row reads are ordered deterministically.
#[async_trait]
pub trait Store: Send + Sync {
    /// Slice of trainees in insertion order plus the total count, read together.
    async fn trainee_page(&self, window: Window) -> StoreResult<Page<Trainee>>;
    async fn trainee(&self, id: &ID) -> StoreResult<Option<Trainee>>;
    async fn trainees_by_ids(&self, ids: &[ID]) -> StoreResult<Vec<Trainee>>;
    async fn credentials_by_email(&self, email: &str) -> StoreResult<Option<TraineeCredentials>>;
    async fn create_trainee(&self, new: NewTrainee) -> StoreResult<Trainee>;
    async fn update_trainee(&self, id: &ID, changes: TraineeChanges) -> StoreResult<Option<Trainee>>;
    /// Removes the trainee along with their routines and registrations.
    async fn delete_trainee(&self, id: &ID) -> StoreResult<bool>;

    /// Newest first
    async fn workouts(&self) -> StoreResult<Vec<Workout>>;
    async fn workout(&self, id: &ID) -> StoreResult<Option<Workout>>;
    async fn create_workout(&self, new: NewWorkout) -> StoreResult<Workout>;
    async fn update_workout(&self, id: &ID, changes: WorkoutChanges) -> StoreResult<Option<Workout>>;
    async fn delete_workout(&self, id: &ID) -> StoreResult<bool>;

    /// Newest first, optionally restricted to one trainee.
    async fn routines(&self, trainee_id: Option<&ID>) -> StoreResult<Vec<Routine>>;
    /// The trainee's earliest routine.
    async fn routine_for_trainee(&self, trainee_id: &ID) -> StoreResult<Option<Routine>>;
    async fn create_routine(
        &self,
        trainee_id: &ID,
        availability: Vec<AvailabilitySlot>,
    ) -> StoreResult<Routine>;
    /// Returns the number of routines updated.
    async fn replace_routine_availability(
        &self,
        trainee_id: &ID,
        availability: Vec<AvailabilitySlot>,
    ) -> StoreResult<u64>;
    /// Returns the number of routines removed.
    async fn delete_routines(&self, trainee_id: &ID) -> StoreResult<u64>;

    /// Newest first, optionally restricted to one trainee.
    async fn registrations(&self, trainee_id: Option<&ID>) -> StoreResult<Vec<Registration>>;
    async fn registration(&self, id: &ID) -> StoreResult<Option<Registration>>;
    async fn create_registration(&self, new: NewRegistration) -> StoreResult<Registration>;
    async fn update_registration(
        &self,
        id: &ID,
        changes: RegistrationChanges,
    ) -> StoreResult<Option<Registration>>;
    async fn delete_registration(&self, id: &ID) -> StoreResult<bool>;
}

#[derive(Debug, Clone)]
struct TraineeRow {
    trainee: Trainee,
    password_hash: String,
}

/// Rows are kept in insertion order.
#[derive(Debug, Default)]
struct Tables {
    trainees: Vec<TraineeRow>,
    workouts: Vec<Workout>,
    routines: Vec<Routine>,
    registrations: Vec<Registration>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<&ID>) -> bool {
        self.trainees
            .iter()
            .any(|row| row.trainee.email == email && Some(&row.trainee.id) != except)
    }
}

/// In-process [`Store`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> ID {
    ID(Uuid::new_v4().to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn trainee_page(&self, window: Window) -> StoreResult<Page<Trainee>> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);

        let items = tables
            .trainees
            .iter()
            .skip(offset)
            .take(limit)
            .map(|row| row.trainee.clone())
            .collect();

        Ok(Page {
            items,
            total: tables.trainees.len() as u64,
        })
    }

    async fn trainee(&self, id: &ID) -> StoreResult<Option<Trainee>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trainees
            .iter()
            .find(|row| &row.trainee.id == id)
            .map(|row| row.trainee.clone()))
    }

    async fn trainees_by_ids(&self, ids: &[ID]) -> StoreResult<Vec<Trainee>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trainees
            .iter()
            .filter(|row| ids.contains(&row.trainee.id))
            .map(|row| row.trainee.clone())
            .collect())
    }

    async fn credentials_by_email(&self, email: &str) -> StoreResult<Option<TraineeCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .trainees
            .iter()
            .find(|row| row.trainee.email == email)
            .map(|row| TraineeCredentials {
                trainee: row.trainee.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn create_trainee(&self, new: NewTrainee) -> StoreResult<Trainee> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&new.email, None) {
            return Err(StoreError::UniqueViolation("email"));
        }

        let now = DateTime::now();
        let trainee = Trainee {
            id: new_id(),
            name: new.name,
            email: new.email,
            timezone: new.timezone,
            created_at: now,
            updated_at: now,
        };
        tables.trainees.push(TraineeRow {
            trainee: trainee.clone(),
            password_hash: new.password_hash,
        });
        Ok(trainee)
    }

    async fn update_trainee(&self, id: &ID, changes: TraineeChanges) -> StoreResult<Option<Trainee>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation("email"));
            }
        }

        let Some(row) = tables.trainees.iter_mut().find(|row| &row.trainee.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            row.trainee.name = name;
        }
        if let Some(email) = changes.email {
            row.trainee.email = email;
        }
        if let Some(hash) = changes.password_hash {
            row.password_hash = hash;
        }
        if let Some(timezone) = changes.timezone {
            row.trainee.timezone = timezone;
        }
        row.trainee.updated_at = DateTime::now();

        Ok(Some(row.trainee.clone()))
    }

    async fn delete_trainee(&self, id: &ID) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.trainees.len();
        tables.trainees.retain(|row| &row.trainee.id != id);
        if tables.trainees.len() == before {
            return Ok(false);
        }

        tables.routines.retain(|r| &r.user_id != id);
        tables.registrations.retain(|r| &r.user_id != id);
        Ok(true)
    }

    async fn workouts(&self) -> StoreResult<Vec<Workout>> {
        let tables = self.tables.read().await;
        Ok(tables.workouts.iter().rev().cloned().collect())
    }

    async fn workout(&self, id: &ID) -> StoreResult<Option<Workout>> {
        let tables = self.tables.read().await;
        Ok(tables.workouts.iter().find(|w| &w.id == id).cloned())
    }

    async fn create_workout(&self, new: NewWorkout) -> StoreResult<Workout> {
        let now = DateTime::now();
        let workout = Workout {
            id: new_id(),
            name: new.name,
            duration: new.duration,
            description: new.description,
            color: new.color,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.workouts.push(workout.clone());
        Ok(workout)
    }

    async fn update_workout(&self, id: &ID, changes: WorkoutChanges) -> StoreResult<Option<Workout>> {
        let mut tables = self.tables.write().await;
        let Some(workout) = tables.workouts.iter_mut().find(|w| &w.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            workout.name = name;
        }
        if let Some(duration) = changes.duration {
            workout.duration = duration;
        }
        if let Some(description) = changes.description {
            workout.description = description;
        }
        if let Some(color) = changes.color {
            workout.color = color;
        }
        workout.updated_at = DateTime::now();

        Ok(Some(workout.clone()))
    }

    async fn delete_workout(&self, id: &ID) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.workouts.len();
        tables.workouts.retain(|w| &w.id != id);
        Ok(tables.workouts.len() != before)
    }

    async fn routines(&self, trainee_id: Option<&ID>) -> StoreResult<Vec<Routine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .routines
            .iter()
            .rev()
            .filter(|r| trainee_id.map_or(true, |id| &r.user_id == id))
            .cloned()
            .collect())
    }

    async fn routine_for_trainee(&self, trainee_id: &ID) -> StoreResult<Option<Routine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .routines
            .iter()
            .find(|r| &r.user_id == trainee_id)
            .cloned())
    }

    async fn create_routine(
        &self,
        trainee_id: &ID,
        availability: Vec<AvailabilitySlot>,
    ) -> StoreResult<Routine> {
        let now = DateTime::now();
        let routine = Routine {
            id: new_id(),
            user_id: trainee_id.clone(),
            availability,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.routines.push(routine.clone());
        Ok(routine)
    }

    async fn replace_routine_availability(
        &self,
        trainee_id: &ID,
        availability: Vec<AvailabilitySlot>,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let now = DateTime::now();
        let mut updated = 0;

        for routine in tables.routines.iter_mut().filter(|r| &r.user_id == trainee_id) {
            routine.availability = availability.clone();
            routine.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_routines(&self, trainee_id: &ID) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.routines.len();
        tables.routines.retain(|r| &r.user_id != trainee_id);
        Ok((before - tables.routines.len()) as u64)
    }

    async fn registrations(&self, trainee_id: Option<&ID>) -> StoreResult<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .iter()
            .rev()
            .filter(|r| trainee_id.map_or(true, |id| &r.user_id == id))
            .cloned()
            .collect())
    }

    async fn registration(&self, id: &ID) -> StoreResult<Option<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables.registrations.iter().find(|r| &r.id == id).cloned())
    }

    async fn create_registration(&self, new: NewRegistration) -> StoreResult<Registration> {
        let now = DateTime::now();
        let registration = Registration {
            id: new_id(),
            event_id: new.event_id,
            user_id: new.user_id,
            invitee_email: new.invitee_email,
            start_time: new.start_time,
            end_time: new.end_time,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .registrations
            .push(registration.clone());
        Ok(registration)
    }

    async fn update_registration(
        &self,
        id: &ID,
        changes: RegistrationChanges,
    ) -> StoreResult<Option<Registration>> {
        let mut tables = self.tables.write().await;
        let Some(registration) = tables.registrations.iter_mut().find(|r| &r.id == id) else {
            return Ok(None);
        };

        if let Some(event_id) = changes.event_id {
            registration.event_id = event_id;
        }
        if let Some(user_id) = changes.user_id {
            registration.user_id = user_id;
        }
        if let Some(email) = changes.invitee_email {
            registration.invitee_email = email;
        }
        if let Some(start_time) = changes.start_time {
            registration.start_time = start_time;
        }
        if let Some(end_time) = changes.end_time {
            registration.end_time = end_time;
        }
        if let Some(status) = changes.status {
            registration.status = status;
        }
        registration.updated_at = DateTime::now();

        Ok(Some(registration.clone()))
    }

    async fn delete_registration(&self, id: &ID) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.registrations.len();
        tables.registrations.retain(|r| &r.id != id);
        Ok(tables.registrations.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_trainee(name: &str, email: &str) -> NewTrainee {
        NewTrainee {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            timezone: Some("Europe/Tallinn".to_string()),
        }
    }

    fn slot(day: &str) -> AvailabilitySlot {
        AvailabilitySlot {
            day: day.to_string(),
            start_time: "08:00".to_string(),
            end_time: "10:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_trainee_page_is_ordered_and_counted() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create_trainee(new_trainee(&format!("t{i}"), &format!("t{i}@example.com")))
                .await
                .unwrap();
        }

        let page = store
            .trainee_page(Window { offset: 3, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        let names: Vec<_> = page.items.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["t3", "t4"]);

        let beyond = store
            .trainee_page(Window { offset: 50, limit: 10 })
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let first = store
            .create_trainee(new_trainee("a", "a@example.com"))
            .await
            .unwrap();
        let second = store
            .create_trainee(new_trainee("b", "b@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            store.create_trainee(new_trainee("c", "a@example.com")).await,
            Err(StoreError::UniqueViolation("email"))
        ));

        let steal = TraineeChanges {
            email: Some("a@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update_trainee(&second.id, steal).await.is_err());

        let keep = TraineeChanges {
            email: Some("a@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update_trainee(&first.id, keep).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_credentials_carry_the_hash_separately() {
        let store = MemoryStore::new();
        store
            .create_trainee(new_trainee("a", "a@example.com"))
            .await
            .unwrap();

        let creds = store
            .credentials_by_email("a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(creds.password_hash, "hash");
        assert_eq!(creds.trainee.email, "a@example.com");
        assert!(store.credentials_by_email("x@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_trainee_clears_timezone() {
        let store = MemoryStore::new();
        let trainee = store
            .create_trainee(new_trainee("a", "a@example.com"))
            .await
            .unwrap();

        let changes = TraineeChanges {
            timezone: Some(None),
            ..Default::default()
        };
        let updated = store.update_trainee(&trainee.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.timezone, None);
        assert_eq!(updated.name, "a");

        let missing = store
            .update_trainee(&ID::from("nope"), TraineeChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_trainee_cascades() {
        let store = MemoryStore::new();
        let trainee = store
            .create_trainee(new_trainee("a", "a@example.com"))
            .await
            .unwrap();
        store
            .create_routine(&trainee.id, vec![slot("monday")])
            .await
            .unwrap();
        store
            .create_registration(NewRegistration {
                event_id: "event-1".to_string(),
                user_id: trainee.id.clone(),
                invitee_email: "a@example.com".to_string(),
                start_time: DateTime::now(),
                end_time: None,
                status: "scheduled".to_string(),
            })
            .await
            .unwrap();

        assert!(store.delete_trainee(&trainee.id).await.unwrap());
        assert!(!store.delete_trainee(&trainee.id).await.unwrap());
        assert!(store.routines(None).await.unwrap().is_empty());
        assert!(store.registrations(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_workouts_are_newest_first() {
        let store = MemoryStore::new();
        for name in ["first", "second", "third"] {
            store
                .create_workout(NewWorkout {
                    name: name.to_string(),
                    duration: 30,
                    description: None,
                    color: None,
                })
                .await
                .unwrap();
        }

        let names: Vec<_> = store
            .workouts()
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_routine_availability_replacement_counts_rows() {
        let store = MemoryStore::new();
        let id = ID::from("trainee-1");
        assert_eq!(
            store
                .replace_routine_availability(&id, vec![slot("friday")])
                .await
                .unwrap(),
            0
        );

        let first = store.create_routine(&id, vec![slot("monday")]).await.unwrap();
        store.create_routine(&id, vec![slot("tuesday")]).await.unwrap();

        assert_eq!(
            store
                .replace_routine_availability(&id, vec![slot("friday")])
                .await
                .unwrap(),
            2
        );
        let earliest = store.routine_for_trainee(&id).await.unwrap().unwrap();
        assert_eq!(earliest.id, first.id);
        assert_eq!(earliest.availability, vec![slot("friday")]);

        assert_eq!(store.delete_routines(&id).await.unwrap(), 2);
        assert_eq!(store.delete_routines(&id).await.unwrap(), 0);
    }
}
