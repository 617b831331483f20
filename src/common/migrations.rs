// src/common/migrations.rs
//! Database schema management
//!
//! Tables are created with `IF NOT EXISTS`; setting `RESET_DB=true` drops
//! everything first.

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

const TABLES: &[&str] = &[
    "email_log",
    "notifications",
    "ai_processing_queue",
    "interviews",
    "candidate_timeline",
    "candidate_notes",
    "candidate_attachments",
    "candidate_evaluations",
    "postulations",
    "candidates",
    "applications",
    "users",
];

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    }

    create_user_tables(pool).await?;
    create_recruiting_tables(pool).await?;
    create_candidate_detail_tables(pool).await?;
    create_interview_tables(pool).await?;
    create_messaging_tables(pool).await?;
    create_ai_queue_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed successfully");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // id mirrors the Supabase Auth user id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL,
            permissions TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_recruiting_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Job postulations (openings)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            department TEXT,
            location TEXT,
            status TEXT NOT NULL DEFAULT 'abierta' CHECK (status IN ('abierta', 'pausada', 'cerrada')),
            created_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            linkedin_url TEXT,
            source TEXT,
            created_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Candidate x application pair with its pipeline stage
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS postulations (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            application_id TEXT NOT NULL,
            stage TEXT NOT NULL DEFAULT 'postulado' CHECK (stage IN (
                'postulado', 'pre-entrevista', 'entrevista-tecnica', 'entrevista-final',
                'oferta', 'seleccionado', 'descartado'
            )),
            score REAL,
            assigned_to TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(candidate_id, application_id),
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE,
            FOREIGN KEY(application_id) REFERENCES applications(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_candidate_detail_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidate_evaluations (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            application_id TEXT,
            evaluator_id TEXT,
            source TEXT NOT NULL DEFAULT 'manual' CHECK (source IN ('manual', 'ia')),
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            strengths TEXT,
            weaknesses TEXT,
            recommendation TEXT NOT NULL CHECK (recommendation IN ('avanzar', 'mantener', 'descartar')),
            comments TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidate_attachments (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            storage_path TEXT NOT NULL UNIQUE,
            mime_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            uploaded_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidate_notes (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            author_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidate_timeline (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            application_id TEXT,
            event_type TEXT NOT NULL,
            description TEXT NOT NULL,
            metadata TEXT,
            actor_id TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_interview_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interviews (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            application_id TEXT NOT NULL,
            interviewer_id TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            mode TEXT NOT NULL DEFAULT 'virtual' CHECK (mode IN ('virtual', 'presencial')),
            location TEXT,
            meet_link TEXT,
            calendar_event_id TEXT,
            status TEXT NOT NULL DEFAULT 'agendada' CHECK (status IN (
                'agendada', 'completada', 'cancelada', 'no_asistio'
            )),
            notes TEXT,
            email_sent INTEGER NOT NULL DEFAULT 0,
            created_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE,
            FOREIGN KEY(application_id) REFERENCES applications(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_messaging_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            link TEXT,
            read_at TEXT,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS email_log (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            recipients TEXT NOT NULL,
            subject TEXT NOT NULL,
            provider_id TEXT,
            status TEXT NOT NULL CHECK (status IN ('enviado', 'fallido')),
            error_message TEXT,
            candidate_id TEXT,
            sent_by TEXT,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ai_queue_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // FIFO order within a priority is the implicit rowid
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_processing_queue (
            id TEXT PRIMARY KEY,
            candidate_id TEXT NOT NULL,
            application_id TEXT,
            task_type TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 5 CHECK (priority BETWEEN 0 AND 10),
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN (
                'pending', 'processing', 'completed', 'failed'
            )),
            payload TEXT,
            result TEXT,
            error_message TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            max_attempts INTEGER NOT NULL DEFAULT 3,
            worker_id TEXT,
            requested_by TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            started_at TEXT,
            completed_at TEXT,
            FOREIGN KEY(candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_postulations_application ON postulations(application_id, stage)",
        "CREATE INDEX IF NOT EXISTS idx_postulations_candidate ON postulations(candidate_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_candidates_email_unique ON candidates(email)",
        "CREATE INDEX IF NOT EXISTS idx_evaluations_candidate ON candidate_evaluations(candidate_id, application_id)",
        "CREATE INDEX IF NOT EXISTS idx_attachments_candidate ON candidate_attachments(candidate_id)",
        "CREATE INDEX IF NOT EXISTS idx_notes_candidate ON candidate_notes(candidate_id)",
        "CREATE INDEX IF NOT EXISTS idx_timeline_candidate ON candidate_timeline(candidate_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_interviews_candidate ON interviews(candidate_id)",
        "CREATE INDEX IF NOT EXISTS idx_interviews_interviewer ON interviews(interviewer_id, scheduled_at)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read_at)",
        "CREATE INDEX IF NOT EXISTS idx_ai_queue_status ON ai_processing_queue(status, priority)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count as usize, TABLES.len());
    }

    #[tokio::test]
    async fn test_postulation_pair_is_unique() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO applications (id, title) VALUES ('a1', 'Backend')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO candidates (id, full_name, email) VALUES ('c1', 'Ana', 'ana@x.cl')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO postulations (id, candidate_id, application_id) VALUES ('p1', 'c1', 'a1')")
            .execute(&pool)
            .await
            .unwrap();

        let duplicate = sqlx::query(
            "INSERT INTO postulations (id, candidate_id, application_id) VALUES ('p2', 'c1', 'a1')",
        )
        .execute(&pool)
        .await;
        assert!(duplicate.is_err());
    }
}
