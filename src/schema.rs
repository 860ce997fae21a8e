//! GraphQL schema definition.
//!
//! Every query except `me` and every mutation except `login` and
//! `createTrainee` requires a valid, unrevoked bearer token.

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::{
    ComplexObject, Context, EmptySubscription, MaybeUndefined, Object, Result, Schema, ID,
};
use tracing::{debug, info, warn};

use crate::auth::{authenticate, get_bearer_token, RevocationStore, TokenIssuer};
use crate::dataloaders::TraineeLoader;
use crate::models::{
    nullable, AuthPayload, LoginInput, NewTrainee, Registration, RegistrationInput,
    RegistrationUpdateInput, Routine, RoutineInput, RoutineUpdateInput, Session, Trainee,
    TraineeChanges, TraineeInput, TraineeUpdateInput, Workout, WorkoutInput, WorkoutUpdateInput,
};
use crate::pagination::{paginate, Connection, PaginationArgs};
use crate::password::{hash_password, verify_password};
use crate::store::Store;
use crate::GraphQLError;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth. Introspection needs ~13.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

pub type TraineeSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema around its collaborators.
pub fn build_schema(
    store: Arc<dyn Store>,
    issuer: TokenIssuer,
    revocations: Arc<dyn RevocationStore>,
) -> TraineeSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(issuer)
        .data(revocations)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

fn store<'a>(ctx: &'a Context<'_>) -> Result<&'a Arc<dyn Store>> {
    ctx.data::<Arc<dyn Store>>()
}

fn require(present: bool, message: &'static str) -> crate::Result<()> {
    if present {
        Ok(())
    } else {
        Err(GraphQLError::Validation(message))
    }
}

async fn load_trainee(ctx: &Context<'_>, id: &ID) -> Result<Trainee> {
    let trainee = match ctx.data_opt::<TraineeLoader>() {
        Some(loader) => loader.load(id.clone()).await,
        None => store(ctx)?.trainee(id).await.map_err(GraphQLError::from)?,
    };

    Ok(trainee.ok_or(GraphQLError::NotFound("Trainee"))?)
}

/// Warm the request's trainee loader for a list of rows.
async fn preload_trainees(ctx: &Context<'_>, ids: impl Iterator<Item = &ID>) {
    if let Some(loader) = ctx.data_opt::<TraineeLoader>() {
        let unique: HashSet<ID> = ids.cloned().collect();
        loader.load_many(unique.into_iter().collect()).await;
    }
}

async fn ensure_trainee_exists(ctx: &Context<'_>, id: &ID) -> Result<()> {
    if store(ctx)?.trainee(id).await.map_err(GraphQLError::from)?.is_none() {
        return Err(GraphQLError::NotFound("Trainee").into());
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Query
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The authenticated trainee, if any. Never fails.
    async fn me(&self, ctx: &Context<'_>) -> Session {
        let Ok(claims) = authenticate(ctx).await else {
            return Session::anonymous();
        };
        let Ok(store) = store(ctx) else {
            return Session::anonymous();
        };

        match store.trainee(&ID(claims.trainee_id)).await {
            Ok(Some(trainee)) => Session {
                authenticated: true,
                trainee: Some(trainee),
            },
            _ => Session::anonymous(),
        }
    }

    /// List trainees with legacy or Relay pagination.
    async fn trainees(
        &self,
        ctx: &Context<'_>,
        page: Option<i32>,
        page_size: Option<i32>,
        first: MaybeUndefined<i32>,
        after: MaybeUndefined<String>,
        last: MaybeUndefined<i32>,
        before: MaybeUndefined<String>,
    ) -> Result<Connection<Trainee>> {
        authenticate(ctx).await?;
        let store = store(ctx)?;

        // `after: null` still counts as a Relay request.
        let relay_requested =
            first.is_null() || after.is_null() || last.is_null() || before.is_null();
        let args = PaginationArgs {
            page,
            page_size,
            first: first.take(),
            after: after.take(),
            last: last.take(),
            before: before.take(),
            relay_requested,
        };
        let connection = paginate(&args, move |window| store.trainee_page(window))
            .await
            .map_err(GraphQLError::from)?;

        debug!(
            returned = connection.data.len(),
            total = connection.pagination.total,
            "listed trainees"
        );
        Ok(connection)
    }

    async fn trainee(&self, ctx: &Context<'_>, id: ID) -> Result<Trainee> {
        authenticate(ctx).await?;
        let trainee = store(ctx)?.trainee(&id).await.map_err(GraphQLError::from)?;
        Ok(trainee.ok_or(GraphQLError::NotFound("Trainee"))?)
    }

    /// All workouts, newest first.
    async fn workouts(&self, ctx: &Context<'_>) -> Result<Vec<Workout>> {
        authenticate(ctx).await?;
        Ok(store(ctx)?.workouts().await.map_err(GraphQLError::from)?)
    }

    async fn workout(&self, ctx: &Context<'_>, id: ID) -> Result<Workout> {
        authenticate(ctx).await?;
        let workout = store(ctx)?.workout(&id).await.map_err(GraphQLError::from)?;
        Ok(workout.ok_or(GraphQLError::NotFound("Workout"))?)
    }

    /// Routines, newest first, optionally for one trainee.
    async fn routines(&self, ctx: &Context<'_>, trainee_id: Option<ID>) -> Result<Vec<Routine>> {
        authenticate(ctx).await?;
        let routines = store(ctx)?
            .routines(trainee_id.as_ref())
            .await
            .map_err(GraphQLError::from)?;

        preload_trainees(ctx, routines.iter().map(|r| &r.user_id)).await;
        Ok(routines)
    }

    async fn trainee_routine(&self, ctx: &Context<'_>, trainee_id: ID) -> Result<Routine> {
        authenticate(ctx).await?;
        let routine = store(ctx)?
            .routine_for_trainee(&trainee_id)
            .await
            .map_err(GraphQLError::from)?;
        Ok(routine.ok_or(GraphQLError::NotFound("Routine"))?)
    }

    /// All registrations, newest first.
    async fn registrations(&self, ctx: &Context<'_>) -> Result<Vec<Registration>> {
        authenticate(ctx).await?;
        let registrations = store(ctx)?
            .registrations(None)
            .await
            .map_err(GraphQLError::from)?;

        preload_trainees(ctx, registrations.iter().map(|r| &r.user_id)).await;
        Ok(registrations)
    }

    async fn registration(&self, ctx: &Context<'_>, id: ID) -> Result<Registration> {
        authenticate(ctx).await?;
        let registration = store(ctx)?
            .registration(&id)
            .await
            .map_err(GraphQLError::from)?;
        Ok(registration.ok_or(GraphQLError::NotFound("Registration"))?)
    }
}

// -----------------------------------------------------------------------------
// Mutation
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> Result<AuthPayload> {
        require(
            !input.email.is_empty() && !input.password.is_empty(),
            "Email and password are required",
        )?;

        let credentials = store(ctx)?
            .credentials_by_email(&input.email)
            .await
            .map_err(GraphQLError::from)?;

        let Some(credentials) = credentials else {
            warn!("login attempt for unknown email");
            return Err(GraphQLError::InvalidCredentials.into());
        };

        if !verify_password(&input.password, &credentials.password_hash)
            .await
            .map_err(GraphQLError::from)?
        {
            warn!(trainee_id = %credentials.trainee.id.as_str(), "login with wrong password");
            return Err(GraphQLError::InvalidCredentials.into());
        }

        let issuer = ctx.data::<TokenIssuer>()?;
        let token = issuer
            .issue(&credentials.trainee)
            .map_err(GraphQLError::from)?;

        info!(
            trainee_id = %credentials.trainee.id.as_str(),
            expires_in = issuer.ttl().as_secs(),
            "trainee logged in"
        );
        Ok(AuthPayload {
            token,
            trainee: credentials.trainee,
        })
    }

    /// Revoke the presented token.
    async fn logout(&self, ctx: &Context<'_>) -> Result<&'static str> {
        let claims = authenticate(ctx).await?;
        if let Some(token) = get_bearer_token(ctx) {
            ctx.data::<Arc<dyn RevocationStore>>()?
                .revoke(token)
                .await
                .map_err(GraphQLError::from)?;
        }

        info!(trainee_id = %claims.trainee_id, "trainee logged out");
        Ok("Successfully logged out")
    }

    async fn create_trainee(&self, ctx: &Context<'_>, input: TraineeInput) -> Result<Trainee> {
        require(
            !input.name.is_empty() && !input.email.is_empty() && !input.password.is_empty(),
            "Name, email, and password are required",
        )?;

        let store = store(ctx)?;
        if store
            .credentials_by_email(&input.email)
            .await
            .map_err(GraphQLError::from)?
            .is_some()
        {
            return Err(GraphQLError::EmailInUse.into());
        }

        let password_hash = hash_password(&input.password)
            .await
            .map_err(GraphQLError::from)?;

        let trainee = store
            .create_trainee(NewTrainee {
                name: input.name,
                email: input.email,
                password_hash,
                timezone: input.timezone,
            })
            .await
            .map_err(GraphQLError::from)?;

        debug!(trainee_id = %trainee.id.as_str(), "created trainee");
        Ok(trainee)
    }

    async fn update_trainee(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: TraineeUpdateInput,
    ) -> Result<Trainee> {
        authenticate(ctx).await?;

        let password_hash = match &input.password {
            Some(password) => Some(hash_password(password).await.map_err(GraphQLError::from)?),
            None => None,
        };
        let changes = TraineeChanges {
            name: input.name,
            email: input.email,
            password_hash,
            timezone: nullable(input.timezone),
        };

        let trainee = store(ctx)?
            .update_trainee(&id, changes)
            .await
            .map_err(GraphQLError::from)?
            .ok_or(GraphQLError::NotFound("Trainee"))?;

        if let Some(loader) = ctx.data_opt::<TraineeLoader>() {
            loader.prime(trainee.id.clone(), trainee.clone()).await;
        }
        Ok(trainee)
    }

    async fn delete_trainee(&self, ctx: &Context<'_>, id: ID) -> Result<&'static str> {
        authenticate(ctx).await?;
        if !store(ctx)?.delete_trainee(&id).await.map_err(GraphQLError::from)? {
            return Err(GraphQLError::NotFound("Trainee").into());
        }

        if let Some(loader) = ctx.data_opt::<TraineeLoader>() {
            loader.clear().await;
        }
        Ok("Trainee deleted successfully")
    }

    async fn create_workout(&self, ctx: &Context<'_>, input: WorkoutInput) -> Result<Workout> {
        authenticate(ctx).await?;
        require(
            !input.name.is_empty() && input.duration != 0,
            "Name and duration are required",
        )?;

        Ok(store(ctx)?
            .create_workout(input.into())
            .await
            .map_err(GraphQLError::from)?)
    }

    async fn update_workout(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: WorkoutUpdateInput,
    ) -> Result<Workout> {
        authenticate(ctx).await?;
        let workout = store(ctx)?
            .update_workout(&id, input.into())
            .await
            .map_err(GraphQLError::from)?;
        Ok(workout.ok_or(GraphQLError::NotFound("Workout"))?)
    }

    async fn delete_workout(&self, ctx: &Context<'_>, id: ID) -> Result<&'static str> {
        authenticate(ctx).await?;
        if !store(ctx)?.delete_workout(&id).await.map_err(GraphQLError::from)? {
            return Err(GraphQLError::NotFound("Workout").into());
        }
        Ok("Workout deleted successfully")
    }

    async fn create_routine(&self, ctx: &Context<'_>, input: RoutineInput) -> Result<Routine> {
        authenticate(ctx).await?;
        require(!input.user_id.is_empty(), "userId and availability are required")?;
        ensure_trainee_exists(ctx, &input.user_id).await?;

        Ok(store(ctx)?
            .create_routine(&input.user_id, input.availability)
            .await
            .map_err(GraphQLError::from)?)
    }

    /// Replace the availability of every routine the trainee has.
    async fn update_trainee_routine(
        &self,
        ctx: &Context<'_>,
        trainee_id: ID,
        input: RoutineUpdateInput,
    ) -> Result<Routine> {
        authenticate(ctx).await?;
        let store = store(ctx)?;

        let updated = store
            .replace_routine_availability(&trainee_id, input.availability)
            .await
            .map_err(GraphQLError::from)?;
        if updated == 0 {
            return Err(GraphQLError::NotFound("Routine").into());
        }

        let routine = store
            .routine_for_trainee(&trainee_id)
            .await
            .map_err(GraphQLError::from)?;
        Ok(routine.ok_or(GraphQLError::NotFound("Routine"))?)
    }

    async fn delete_trainee_routine(&self, ctx: &Context<'_>, trainee_id: ID) -> Result<&'static str> {
        authenticate(ctx).await?;
        let removed = store(ctx)?
            .delete_routines(&trainee_id)
            .await
            .map_err(GraphQLError::from)?;
        if removed == 0 {
            return Err(GraphQLError::NotFound("Routine").into());
        }
        Ok("Routine deleted successfully")
    }

    async fn create_registration(
        &self,
        ctx: &Context<'_>,
        input: RegistrationInput,
    ) -> Result<Registration> {
        authenticate(ctx).await?;
        require(
            !input.event_id.is_empty() && !input.user_id.is_empty() && !input.invitee_email.is_empty(),
            "eventId, userId, inviteeEmail, and startTime are required",
        )?;
        ensure_trainee_exists(ctx, &input.user_id).await?;

        Ok(store(ctx)?
            .create_registration(input.into())
            .await
            .map_err(GraphQLError::from)?)
    }

    async fn update_registration(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: RegistrationUpdateInput,
    ) -> Result<Registration> {
        authenticate(ctx).await?;
        if let Some(user_id) = &input.user_id {
            ensure_trainee_exists(ctx, user_id).await?;
        }

        let registration = store(ctx)?
            .update_registration(&id, input.into())
            .await
            .map_err(GraphQLError::from)?;
        Ok(registration.ok_or(GraphQLError::NotFound("Registration"))?)
    }

    async fn delete_registration(&self, ctx: &Context<'_>, id: ID) -> Result<&'static str> {
        authenticate(ctx).await?;
        if !store(ctx)?
            .delete_registration(&id)
            .await
            .map_err(GraphQLError::from)?
        {
            return Err(GraphQLError::NotFound("Registration").into());
        }
        Ok("Registration deleted successfully")
    }
}

// -----------------------------------------------------------------------------
// Nested fields
// -----------------------------------------------------------------------------

#[ComplexObject]
impl Trainee {
    async fn routines(&self, ctx: &Context<'_>) -> Result<Vec<Routine>> {
        Ok(store(ctx)?
            .routines(Some(&self.id))
            .await
            .map_err(GraphQLError::from)?)
    }

    async fn registrations(&self, ctx: &Context<'_>) -> Result<Vec<Registration>> {
        Ok(store(ctx)?
            .registrations(Some(&self.id))
            .await
            .map_err(GraphQLError::from)?)
    }
}

#[ComplexObject]
impl Routine {
    async fn trainee(&self, ctx: &Context<'_>) -> Result<Trainee> {
        load_trainee(ctx, &self.user_id).await
    }
}

#[ComplexObject]
impl Registration {
    async fn trainee(&self, ctx: &Context<'_>) -> Result<Trainee> {
        load_trainee(ctx, &self.user_id).await
    }
}
