use sqlx::migrate::MigrateError;
use sqlx::migrate::Migrator;
use sqlx::PgPool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Tables owned by this service, dropped in dependency order by `migrate_fresh`.
const OWNED_TABLES: [&str; 2] = ["users", "_sqlx_migrations"];

/// Apply pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!(
        database = "postgresql",
        migrations = MIGRATOR.iter().count(),
        "Database migrations completed"
    );
    Ok(())
}

/// Drop every table this service owns, then migrate from scratch.
///
/// All data is lost.
pub async fn migrate_fresh(pool: &PgPool) -> Result<(), MigrateError> {
    for statement in drop_statements() {
        sqlx::query(&statement).execute(pool).await?;
    }
    tracing::warn!(tables = ?OWNED_TABLES, "Dropped tables");

    migrate(pool).await
}

fn drop_statements() -> Vec<String> {
    OWNED_TABLES
        .iter()
        .map(|table| format!("DROP TABLE IF EXISTS {table} CASCADE"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_statements() {
        assert_eq!(
            drop_statements(),
            vec![
                "DROP TABLE IF EXISTS users CASCADE".to_string(),
                "DROP TABLE IF EXISTS _sqlx_migrations CASCADE".to_string(),
            ]
        );
    }

    #[test]
    fn test_migrator_embeds_users_table() {
        let descriptions: Vec<_> = MIGRATOR
            .iter()
            .map(|migration| migration.description.to_string())
            .collect();

        assert_eq!(descriptions, vec!["create users".to_string()]);
    }
}
