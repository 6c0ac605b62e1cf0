//! Diesel table definitions for the per-shard PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Timestamps are unix
//! seconds stored as `BIGINT`; soft-deleted rows carry `deleted_at`.

diesel::table! {
    /// Item definitions.
    item_masters (id) {
        id -> Int8,
        item_type -> Int4,
        name -> Varchar,
        description -> Varchar,
        amount_per_sec -> Nullable<Int8>,
        max_level -> Nullable<Int4>,
        max_amount_per_sec -> Nullable<Int8>,
        base_exp_per_level -> Nullable<Int8>,
        gained_exp -> Nullable<Int8>,
        shortening_min -> Nullable<Int8>,
        created_at -> Int8,
    }
}

diesel::table! {
    gacha_masters (id) {
        id -> Int8,
        name -> Varchar,
        start_at -> Int8,
        end_at -> Int8,
        display_order -> Int4,
        created_at -> Int8,
    }
}

diesel::table! {
    /// Weighted prize entries, one table per gacha id.
    gacha_item_masters (id) {
        id -> Int8,
        gacha_id -> Int8,
        item_type -> Int4,
        item_id -> Int8,
        amount -> Int8,
        weight -> Int8,
        created_at -> Int8,
    }
}

diesel::table! {
    login_bonus_masters (id) {
        id -> Int8,
        start_at -> Int8,
        end_at -> Int8,
        column_count -> Int4,
        looped -> Bool,
        created_at -> Int8,
    }
}

diesel::table! {
    login_bonus_reward_masters (id) {
        id -> Int8,
        login_bonus_id -> Int8,
        reward_sequence -> Int4,
        item_type -> Int4,
        item_id -> Int8,
        amount -> Int8,
        created_at -> Int8,
    }
}

diesel::table! {
    present_all_masters (id) {
        id -> Int8,
        registered_start_at -> Int8,
        registered_end_at -> Int8,
        item_type -> Int4,
        item_id -> Int8,
        amount -> Int8,
        present_message -> Varchar,
        created_at -> Int8,
    }
}

diesel::table! {
    /// Player accounts.
    users (id) {
        id -> Int8,
        isu_coin -> Int8,
        last_getreward_at -> Int8,
        last_activated_at -> Int8,
        registered_at -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
        deleted_at -> Nullable<Int8>,
    }
}

diesel::table! {
    /// Write-once viewer bindings.
    user_devices (id) {
        id -> Int8,
        user_id -> Int8,
        platform_id -> Varchar,
        platform_type -> Int4,
        created_at -> Int8,
        updated_at -> Int8,
    }
}

diesel::table! {
    user_bans (id) {
        id -> Int8,
        user_id -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
    }
}

diesel::table! {
    user_cards (id) {
        id -> Int8,
        user_id -> Int8,
        card_id -> Int8,
        amount_per_sec -> Int8,
        level -> Int4,
        total_exp -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
    }
}

diesel::table! {
    /// At most one row per user has a null `deleted_at`.
    user_decks (id) {
        id -> Int8,
        user_id -> Int8,
        user_card_id_1 -> Int8,
        user_card_id_2 -> Int8,
        user_card_id_3 -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
        deleted_at -> Nullable<Int8>,
    }
}

diesel::table! {
    user_items (id) {
        id -> Int8,
        user_id -> Int8,
        item_type -> Int4,
        item_id -> Int8,
        amount -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
    }
}

diesel::table! {
    user_presents (id) {
        id -> Int8,
        user_id -> Int8,
        sent_at -> Int8,
        item_type -> Int4,
        item_id -> Int8,
        amount -> Int8,
        present_message -> Varchar,
        created_at -> Int8,
        updated_at -> Int8,
        deleted_at -> Nullable<Int8>,
    }
}

diesel::table! {
    user_present_all_received_history (id) {
        id -> Int8,
        user_id -> Int8,
        present_all_id -> Int8,
        received_at -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
    }
}

diesel::table! {
    user_login_bonuses (id) {
        id -> Int8,
        user_id -> Int8,
        login_bonus_id -> Int8,
        last_reward_sequence -> Int4,
        loop_count -> Int4,
        created_at -> Int8,
        updated_at -> Int8,
    }
}

diesel::table! {
    /// Audit trail of issued one-time tokens.
    user_one_time_tokens (id) {
        id -> Int8,
        user_id -> Int8,
        token -> Varchar,
        token_type -> Int4,
        expired_at -> Int8,
        created_at -> Int8,
        updated_at -> Int8,
        deleted_at -> Nullable<Int8>,
    }
}
