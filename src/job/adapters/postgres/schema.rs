//! Diesel schema for marketplace lifecycle persistence.

diesel::table! {
    /// Job records, one per posted task.
    jobs (id) {
        /// Job identifier.
        id -> Uuid,
        /// Owning client.
        client_id -> Uuid,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Asking price in minor currency units.
        price -> Int8,
        /// Publication commission paid, in minor units.
        publication_amount -> Nullable<Int8>,
        /// Scheduled start; NULL when flexible.
        start_date -> Nullable<Timestamptz>,
        /// Scheduled end; NULL when flexible.
        end_date -> Nullable<Timestamptz>,
        /// Team capacity.
        max_workers -> Int4,
        /// Workers selected so far.
        selected_workers -> Array<Uuid>,
        /// Reason recorded at cancellation.
        cancellation_reason -> Nullable<Text>,
        /// Price increase awaiting supplemental payment.
        pending_new_price -> Nullable<Int8>,
        /// Instant the job was paused, while paused.
        paused_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
        /// Optimistic concurrency counter.
        version -> Int8,
    }
}

diesel::table! {
    /// Worker proposals, one per application.
    proposals (id) {
        /// Proposal identifier.
        id -> Uuid,
        /// Job the proposal targets.
        job_id -> Uuid,
        /// Worker who applied.
        doer_id -> Uuid,
        /// Proposed price in minor units.
        proposed_price -> Int8,
        /// Whether the price differs from the asking price.
        is_counter_offer -> Bool,
        /// Resolution status.
        #[max_length = 20]
        status -> Varchar,
        /// Submission timestamp.
        submitted_at -> Timestamptz,
    }
}

diesel::table! {
    /// Contracts, one per selected worker.
    contracts (id) {
        /// Contract identifier.
        id -> Uuid,
        /// Job the contract belongs to.
        job_id -> Uuid,
        /// Client side of the agreement.
        client_id -> Uuid,
        /// Worker side of the agreement.
        doer_id -> Uuid,
        /// Agreed price in minor units.
        price -> Int8,
        /// Platform commission in minor units.
        commission -> Int8,
        /// Price plus commission in minor units.
        total_price -> Int8,
        /// Lifecycle status.
        #[max_length = 30]
        status -> Varchar,
        /// Whether the client confirmed completion.
        client_confirmed -> Bool,
        /// Whether the doer confirmed completion.
        doer_confirmed -> Bool,
        /// Spoken pairing code.
        #[max_length = 12]
        pairing_code -> Varchar,
        /// Pairing code issuance instant.
        pairing_issued_at -> Timestamptz,
        /// Pairing code expiry instant.
        pairing_expires_at -> Timestamptz,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
        /// Optimistic concurrency counter.
        version -> Int8,
    }
}

diesel::allow_tables_to_appear_in_same_query!(jobs, proposals, contracts);
