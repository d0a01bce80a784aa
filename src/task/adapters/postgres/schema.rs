//! Diesel schema for task persistence.

diesel::table! {
    /// Task records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Task type.
        #[max_length = 20]
        task_type -> Varchar,
        /// Title.
        #[max_length = 255]
        title -> Varchar,
        /// Free-form description.
        description -> Nullable<Text>,
        /// Workflow state identifier.
        #[max_length = 100]
        status -> Varchar,
        /// Priority.
        #[max_length = 20]
        priority -> Varchar,
        /// Parent task identifier.
        parent_id -> Nullable<Uuid>,
        /// Story-point estimate.
        estimate -> Nullable<Int4>,
        /// Time estimate in minutes.
        time_estimate_minutes -> Nullable<Int8>,
        /// Logged time in minutes.
        actual_time_minutes -> Nullable<Int8>,
        /// Assignee identifier.
        #[max_length = 255]
        assignee -> Nullable<Varchar>,
        /// Label set as a JSON array.
        labels -> Jsonb,
        /// Sprint identifier.
        sprint_id -> Nullable<Uuid>,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Cycle time in seconds, set on completion.
        cycle_time_seconds -> Nullable<Int8>,
        /// Lead time in seconds, set on completion.
        lead_time_seconds -> Nullable<Int8>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Optimistic concurrency version.
        version -> Int8,
    }
}

diesel::table! {
    /// Dependency edges between tasks.
    task_dependencies (task_id, depends_on_id) {
        /// Dependent task.
        task_id -> Uuid,
        /// Predecessor task.
        depends_on_id -> Uuid,
        /// Dependency type.
        #[max_length = 20]
        dependency_type -> Varchar,
        /// Lag in minutes.
        lag_minutes -> Int8,
    }
}

diesel::table! {
    /// Append-only transition log.
    state_transitions (id) {
        /// Append sequence.
        id -> Int8,
        /// Task the record belongs to.
        task_id -> Uuid,
        /// Previous status, absent for the creation record.
        #[max_length = 100]
        from_status -> Nullable<Varchar>,
        /// New status.
        #[max_length = 100]
        to_status -> Varchar,
        /// Acting user.
        #[max_length = 255]
        actor_id -> Varchar,
        /// Transition timestamp.
        transitioned_at -> Timestamptz,
        /// Trigger kind.
        #[max_length = 20]
        triggered_by -> Varchar,
        /// Seconds spent in the previous status.
        duration_in_state_seconds -> Nullable<Int8>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(tasks, task_dependencies, state_transitions);
