use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id               TEXT PRIMARY KEY,
                email            TEXT NOT NULL UNIQUE,
                username         TEXT NOT NULL UNIQUE,
                password         TEXT NOT NULL,
                avatar_url       TEXT,
                status           TEXT,
                invitation_code  TEXT NOT NULL UNIQUE,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE verification_codes (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL,
                code        TEXT NOT NULL,
                expires_at  TEXT NOT NULL,
                used        INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_verification_codes_lookup
                ON verification_codes(email, code, used);

            CREATE TABLE contacts (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                contact_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, contact_id)
            );

            CREATE TABLE messages (
                id                    TEXT PRIMARY KEY,
                sender_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content               TEXT NOT NULL,
                deleted_for_sender    INTEGER NOT NULL DEFAULT 0,
                deleted_for_receiver  INTEGER NOT NULL DEFAULT 0,
                sent_at               TEXT NOT NULL
            );

            CREATE INDEX idx_messages_pair
                ON messages(sender_id, receiver_id, sent_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (session revocation)");
        conn.execute_batch(
            "
            CREATE TABLE revoked_sessions (
                jti         TEXT PRIMARY KEY,
                expires_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
