use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{EngineError, EngineResult};

/// A customer row as the directory stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_salt: String,
    pub password_hash: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub username: String,
    pub password: String,
    pub initial_balance: i64,
}

impl NewCustomer {
    /// Validate and salt the request into a storable record.
    pub fn into_record(self) -> EngineResult<UserRecord> {
        let username = normalize_username(&self.username);
        if username.is_empty() {
            return Err(EngineError::InvalidAccount("username is empty".to_string()));
        }
        if self.initial_balance < 0 {
            return Err(EngineError::InvalidAccount("negative balance".to_string()));
        }

        let digest = PasswordDigest::generate(&self.password);
        Ok(UserRecord {
            username,
            password_salt: digest.salt,
            password_hash: digest.hash,
            balance: self.initial_balance,
        })
    }
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

impl PasswordDigest {
    pub fn generate(password: &str) -> Self {
        let salt: [u8; 16] = rand::thread_rng().gen();
        let salt = hex::encode(salt);
        let hash = digest(&salt, password);
        Self { salt, hash }
    }

    /// Compares raw digest bytes in constant time. A stored hash that is
    /// not valid hex never matches.
    pub fn verify(record: &UserRecord, password: &str) -> bool {
        match hex::decode(&record.password_hash) {
            Ok(stored) => constant_time_eq::constant_time_eq(&digest_bytes(&record.password_salt, password), &stored),
            Err(_) => false,
        }
    }
}

fn digest_bytes(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn digest(salt: &str, password: &str) -> String {
    hex::encode(digest_bytes(salt, password))
}
