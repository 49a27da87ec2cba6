pub mod postgres;

use sqlx::PgPool;
use tracing::info;

use streamfleet_core::{FleetError, FleetResult};

/// 执行数据库迁移
pub async fn run_migrations(pool: &PgPool) -> FleetResult<()> {
    info!("开始执行数据库迁移");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| FleetError::DatabaseOperation(format!("数据库迁移失败: {e}")))?;
    info!("数据库迁移完成");
    Ok(())
}
