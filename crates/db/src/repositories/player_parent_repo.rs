//! Repository for the `player_parents` join table.

use sqlx::PgConnection;

use mudclub_core::role::RoleKind;
use mudclub_core::types::DbId;

pub struct PlayerParentRepo;

impl PlayerParentRepo {
    /// Parent ids linked to a player, ascending.
    pub async fn parent_ids(
        conn: &mut PgConnection,
        player_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT parent_id FROM player_parents WHERE player_id = $1 ORDER BY parent_id",
        )
        .bind(player_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Link a parent to a player (idempotent).
    pub async fn link(
        conn: &mut PgConnection,
        player_id: DbId,
        parent_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO player_parents (player_id, parent_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(player_id)
        .bind(parent_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Remove every link a player or parent takes part in. Other kinds
    /// have no links and are a no-op.
    pub async fn unlink_all(
        conn: &mut PgConnection,
        kind: RoleKind,
        id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let column = match kind {
            RoleKind::Player => "player_id",
            RoleKind::Parent => "parent_id",
            RoleKind::Coach | RoleKind::User => return Ok(0),
        };
        let query = format!("DELETE FROM player_parents WHERE {column} = $1");
        let result = sqlx::query(&query).bind(id).execute(conn).await?;
        Ok(result.rows_affected())
    }
}
