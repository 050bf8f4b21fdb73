//! Shared harness for the integration tests.
#![allow(dead_code)]

pub mod database;
pub mod fixtures;
pub mod mailer;

use actix_web::web::{self, Data};
use mailer::RecordingMailer;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use yamdb::email::SharedMailer;
use yamdb::token::TokenKeys;

pub const TEST_SECRET: &[u8] = b"yamdb-test-secret";

/// Everything a test app needs, held so tests can inspect state directly.
pub struct TestContext {
    pub db: DatabaseConnection,
    pub keys: Data<TokenKeys>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = database::setup_test_database()
            .await
            .expect("Failed to set up test database");
        Self {
            db,
            keys: Data::new(TokenKeys::new(TEST_SECRET, 60)),
            mailer: Arc::new(RecordingMailer::default()),
        }
    }

    /// Registers shared state and every route, the same way the server does.
    pub fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let db = Data::new(self.db.clone());
        let keys = self.keys.clone();
        let mailer: SharedMailer = self.mailer.clone();
        let mailer = Data::new(mailer);
        move |conf: &mut web::ServiceConfig| {
            conf.app_data(db).app_data(keys).app_data(mailer);
            yamdb::web::configure(conf);
        }
    }

    /// `Authorization` header value for a user.
    pub fn bearer(&self, user_id: i32) -> (String, String) {
        let token = self
            .keys
            .issue_token(user_id)
            .expect("Failed to issue test token");
        ("Authorization".to_owned(), format!("Bearer {}", token))
    }
}
