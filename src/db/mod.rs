//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// ユーザー管理
pub mod users;

/// ステーション管理
pub mod stations;

/// システム設定管理
pub mod settings;

/// ユーザー設定管理
pub mod user_settings;

/// データベースマイグレーション
pub mod migrations;

#[cfg(test)]
pub(crate) mod test_utils {
    use sqlx::SqlitePool;

    /// テスト用のインメモリSQLiteプールを作成し、マイグレーションを実行する
    pub async fn test_db_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }
}
