//! Extensions table.
//!
//! Policies, config maps and attachments share one table keyed by kind and name.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(EXTENSIONS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS extensions CASCADE;")
            .await?;
        Ok(())
    }
}

const EXTENSIONS_SQL: &str = r"
CREATE TABLE extensions (
    kind VARCHAR(64) NOT NULL,
    name VARCHAR(253) NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (kind, name)
);

-- Listing by kind in creation order
CREATE INDEX idx_extensions_kind_created ON extensions(kind, created_at);
";
