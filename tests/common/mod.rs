#![allow(dead_code)]

use std::sync::Arc;

use stable_auth::error::AppError;
use stable_auth::{AppState, InMemoryUserStore, PasswordScheme, Settings, UserRecord, UserStore};

pub const TEST_SECRET: &[u8] = b"test_secret_that_is_long_enough_for_hs256";

pub const VET_ID: i64 = 1;
pub const VET_EMAIL: &str = "vet@test.com";
pub const VET_PASSWORD: &str = "admin123";

pub const ADMIN_ID: i64 = 2;
pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const ADMIN_PASSWORD: &str = "root-password";

/// Cheap stand-in for Argon2 so lockout tests stay fast.
pub struct PlainScheme;

impl PasswordScheme for PlainScheme {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        Ok(format!("plain${}", plaintext))
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        stored_hash.strip_prefix("plain$") == Some(plaintext)
    }
}

pub fn settings() -> Settings {
    Settings::new_for_test().expect("Failed to load test config")
}

/// A store holding an active veterinarian and an active admin.
pub async fn seeded_store(scheme: &dyn PasswordScheme) -> Arc<InMemoryUserStore> {
    let store = Arc::new(InMemoryUserStore::new());
    store
        .insert(
            UserRecord::new(VET_ID, VET_EMAIL, scheme.hash(VET_PASSWORD).unwrap(), "veterinario")
                .with_display_name("Dra. Vet"),
        )
        .await;
    store
        .insert(UserRecord::new(
            ADMIN_ID,
            ADMIN_EMAIL,
            scheme.hash(ADMIN_PASSWORD).unwrap(),
            "admin",
        ))
        .await;
    store
}

pub async fn state_with(settings: Settings) -> (AppState, Arc<InMemoryUserStore>) {
    let store = seeded_store(&PlainScheme).await;
    let dyn_store: Arc<dyn UserStore> = store.clone();
    let state = AppState::with_scheme(settings, dyn_store, Arc::new(PlainScheme))
        .expect("Failed to build app state");
    (state, store)
}

pub async fn state() -> (AppState, Arc<InMemoryUserStore>) {
    state_with(settings()).await
}
