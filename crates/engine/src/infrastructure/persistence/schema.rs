//! Table definitions. Applied idempotently at startup.

use sqlx::SqlitePool;

use crate::infrastructure::ports::RepoError;

const STATEMENTS: &[&str] = &[
    // Content
    r#"
    CREATE TABLE IF NOT EXISTS game (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        game_type TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS game_instance (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        status TEXT NOT NULL,
        current_turn INTEGER NOT NULL DEFAULT 0 CHECK (current_turn >= 0),
        last_turn_processed_at TEXT,
        next_turn_due_at TEXT,
        started_at TEXT,
        completed_at TEXT,
        game_config TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS game_instance_due_idx ON game_instance (status, next_turn_due_at)",
    // Accounts
    r#"
    CREATE TABLE IF NOT EXISTS account (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS account_user (
        id BLOB PRIMARY KEY,
        account_id BLOB NOT NULL REFERENCES account(id),
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS game_subscription (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        account_id BLOB NOT NULL REFERENCES account(id),
        game_instance_id BLOB REFERENCES game_instance(id),
        subscription_type TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS game_subscription_active_player_idx
        ON game_subscription (game_id, account_id)
        WHERE subscription_type = 'player' AND status = 'active'
    "#,
    // Adventure content
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_location (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        is_starting_location INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_location_link (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        from_adventure_game_location_id BLOB NOT NULL REFERENCES adventure_game_location(id),
        to_adventure_game_location_id BLOB NOT NULL REFERENCES adventure_game_location(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_item (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        can_be_equipped INTEGER NOT NULL DEFAULT 0,
        equipment_slot TEXT,
        item_category TEXT,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_item_placement (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        adventure_game_item_id BLOB NOT NULL REFERENCES adventure_game_item(id),
        adventure_game_location_id BLOB NOT NULL REFERENCES adventure_game_location(id),
        initial_count INTEGER NOT NULL DEFAULT 1,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_creature (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        max_health INTEGER NOT NULL,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_creature_placement (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        adventure_game_creature_id BLOB NOT NULL REFERENCES adventure_game_creature(id),
        adventure_game_location_id BLOB NOT NULL REFERENCES adventure_game_location(id),
        initial_count INTEGER NOT NULL DEFAULT 1,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_character (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        account_id BLOB NOT NULL REFERENCES account(id),
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        deleted_at TEXT,
        UNIQUE (game_id, account_id)
    )
    "#,
    // Live world
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_location_instance (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        game_instance_id BLOB NOT NULL REFERENCES game_instance(id),
        adventure_game_location_id BLOB NOT NULL REFERENCES adventure_game_location(id),
        created_at TEXT NOT NULL,
        deleted_at TEXT,
        UNIQUE (game_instance_id, adventure_game_location_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_character_instance (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        game_instance_id BLOB NOT NULL REFERENCES game_instance(id),
        adventure_game_character_id BLOB NOT NULL REFERENCES adventure_game_character(id),
        adventure_game_location_instance_id BLOB NOT NULL
            REFERENCES adventure_game_location_instance(id),
        health INTEGER NOT NULL,
        inventory_capacity INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        UNIQUE (game_instance_id, adventure_game_character_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_creature_instance (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        game_instance_id BLOB NOT NULL REFERENCES game_instance(id),
        adventure_game_creature_id BLOB NOT NULL REFERENCES adventure_game_creature(id),
        adventure_game_location_instance_id BLOB NOT NULL
            REFERENCES adventure_game_location_instance(id),
        health INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_item_instance (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        game_instance_id BLOB NOT NULL REFERENCES game_instance(id),
        adventure_game_item_id BLOB NOT NULL REFERENCES adventure_game_item(id),
        adventure_game_location_instance_id BLOB
            REFERENCES adventure_game_location_instance(id),
        adventure_game_character_instance_id BLOB
            REFERENCES adventure_game_character_instance(id),
        adventure_game_creature_instance_id BLOB
            REFERENCES adventure_game_creature_instance(id),
        is_equipped INTEGER NOT NULL DEFAULT 0,
        equipment_slot TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        CHECK (
            (adventure_game_location_instance_id IS NOT NULL)
            + (adventure_game_character_instance_id IS NOT NULL)
            + (adventure_game_creature_instance_id IS NOT NULL) = 1
        )
    )
    "#,
    // Turn sheets
    r#"
    CREATE TABLE IF NOT EXISTS game_turn_sheet (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        game_instance_id BLOB NOT NULL REFERENCES game_instance(id),
        account_id BLOB NOT NULL REFERENCES account(id),
        turn_number INTEGER NOT NULL,
        sheet_type TEXT NOT NULL,
        sheet_order INTEGER NOT NULL,
        sheet_data TEXT NOT NULL,
        scanned_data TEXT,
        scanned_at TEXT,
        processing_status TEXT NOT NULL,
        is_completed INTEGER NOT NULL DEFAULT 0,
        completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        CHECK (is_completed = 0 OR scanned_data IS NOT NULL)
    )
    "#,
    // One character per (instance, account), so the account stands in for the character.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS game_turn_sheet_unique_idx
        ON game_turn_sheet (game_instance_id, account_id, turn_number, sheet_type, sheet_order)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS adventure_game_turn_sheet (
        id BLOB PRIMARY KEY,
        game_id BLOB NOT NULL REFERENCES game(id),
        adventure_game_character_instance_id BLOB NOT NULL
            REFERENCES adventure_game_character_instance(id),
        game_turn_sheet_id BLOB NOT NULL UNIQUE REFERENCES game_turn_sheet(id),
        deleted_at TEXT
    )
    "#,
    // Job queue
    r#"
    CREATE TABLE IF NOT EXISTS job (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        queue TEXT NOT NULL,
        args TEXT NOT NULL,
        state TEXT NOT NULL,
        attempt INTEGER NOT NULL DEFAULT 0,
        max_attempts INTEGER NOT NULL,
        priority INTEGER NOT NULL DEFAULT 1,
        scheduled_at TEXT NOT NULL,
        attempted_at TEXT,
        finalized_at TEXT,
        last_error TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS job_fetch_idx ON job (queue, state, priority, scheduled_at)",
    "CREATE INDEX IF NOT EXISTS job_kind_idx ON job (kind, state)",
];

pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), RepoError> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepoError::database("ensure_schema", e))?;
    }
    tracing::debug!(statements = STATEMENTS.len(), "Database schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{test_db, WorldBuilder};

    #[tokio::test]
    async fn every_entity_table_can_be_soft_deleted() {
        let db = test_db().await;
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT IN ('job', 'sqlite_sequence')",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        assert_eq!(tables.len(), 18);

        for table in tables {
            let has_column: bool = sqlx::query_scalar(
                "SELECT COUNT(*) > 0 FROM pragma_table_info(?) WHERE name = 'deleted_at'",
            )
            .bind(&table)
            .fetch_one(&db.pool)
            .await
            .unwrap();
            assert!(has_column, "{} has no deleted_at", table);
        }
    }

    #[tokio::test]
    async fn soft_deleted_characters_are_left_out_of_the_turn() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(2).seed(&mut model).await;
        model.commit().await.unwrap();

        let gone = &world.characters[1];
        sqlx::query("UPDATE adventure_game_character_instance SET deleted_at = created_at WHERE id = ?")
            .bind(gone.instance.id.to_uuid())
            .execute(&db.pool)
            .await
            .unwrap();

        let mut model = db.model().await;
        let listed = model
            .list_character_instances(world.instance.id())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, world.characters[0].instance.id);
        assert!(model
            .find_character_instance_for_account(world.instance.id(), gone.account.id)
            .await
            .unwrap()
            .is_none());
    }
}
