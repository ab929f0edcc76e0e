use chrono::Utc;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

use super::RegistryError;
use crate::storage::models::{UserRecord, UserSummary};
use crate::storage::JsonIndex;

/// First-run account, created only when no credential file exists yet.
/// Insecure until the password is changed.
pub const BOOTSTRAP_USERNAME: &str = "admin";
pub const BOOTSTRAP_PASSWORD: &str = "admin";

const SALT_LEN: usize = 16;
const SALT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Admin accounts persisted as `username -> UserRecord`.
pub struct CredentialStore {
    index: JsonIndex<UserRecord>,
    rng: SystemRandom,
}

impl CredentialStore {
    pub fn new(index: JsonIndex<UserRecord>) -> Self {
        Self {
            index,
            rng: SystemRandom::new(),
        }
    }

    /// Create the bootstrap account if the credential file does not exist.
    /// Returns whether it was created.
    pub fn bootstrap(&self) -> Result<bool, RegistryError> {
        if self.index.exists() {
            return Ok(false);
        }

        let record = self.new_record(BOOTSTRAP_PASSWORD, "system")?;
        self.index.insert(BOOTSTRAP_USERNAME, record)?;

        tracing::warn!(
            username = BOOTSTRAP_USERNAME,
            "Created default admin account; change its password immediately"
        );
        Ok(true)
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<bool, RegistryError> {
        self.bootstrap()?;

        Ok(match self.index.get(username)? {
            Some(record) => hash_password(password, &record.salt) == record.password_hash,
            None => false,
        })
    }

    pub fn create(
        &self,
        username: &str,
        password: &str,
        created_by: &str,
    ) -> Result<UserSummary, RegistryError> {
        let record = self.new_record(password, created_by)?;
        let summary = UserSummary::from_record(username, &record);

        if !self.index.insert_new(username, record)? {
            return Err(RegistryError::DuplicateUser(username.to_string()));
        }

        tracing::info!(username = %username, created_by = %created_by, "Created user");
        Ok(summary)
    }

    /// Replace the password after checking the old one. Salt and hash are both regenerated.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), RegistryError> {
        let record = self
            .index
            .get(username)?
            .ok_or_else(|| RegistryError::NotFound(format!("User not found: {username}")))?;

        if hash_password(old_password, &record.salt) != record.password_hash {
            return Err(RegistryError::Auth("Old password is incorrect".to_string()));
        }

        let salt = self.generate_salt()?;
        let password_hash = hash_password(new_password, &salt);
        self.index
            .update(username, |record| {
                record.salt = salt;
                record.password_hash = password_hash;
            })?
            .ok_or_else(|| RegistryError::NotFound(format!("User not found: {username}")))?;

        tracing::info!(username = %username, "Changed password");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<UserSummary>, RegistryError> {
        Ok(self
            .index
            .load()?
            .iter()
            .map(|(username, record)| UserSummary::from_record(username, record))
            .collect())
    }

    pub fn delete(&self, username: &str) -> Result<(), RegistryError> {
        self.index
            .remove(username)?
            .ok_or_else(|| RegistryError::NotFound(format!("User not found: {username}")))?;

        tracing::info!(username = %username, "Deleted user");
        Ok(())
    }

    fn new_record(&self, password: &str, created_by: &str) -> Result<UserRecord, RegistryError> {
        let salt = self.generate_salt()?;
        Ok(UserRecord {
            password_hash: hash_password(password, &salt),
            salt,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        })
    }

    fn generate_salt(&self) -> Result<String, RegistryError> {
        // Rejection sampling keeps every alphabet character equally likely.
        let limit = (256 / SALT_ALPHABET.len() * SALT_ALPHABET.len()) as u8;
        let mut salt = String::with_capacity(SALT_LEN);
        let mut buf = [0u8; 32];

        while salt.len() < SALT_LEN {
            self.rng
                .fill(&mut buf)
                .map_err(|_| RegistryError::Internal("failed to generate salt".to_string()))?;
            for &b in buf.iter().filter(|&&b| b < limit) {
                if salt.len() == SALT_LEN {
                    break;
                }
                salt.push(SALT_ALPHABET[b as usize % SALT_ALPHABET.len()] as char);
            }
        }

        Ok(salt)
    }
}

/// Lowercase hex SHA-256 of `password || salt`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(password.as_bytes());
    ctx.update(salt.as_bytes());
    ctx.finish()
        .as_ref()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let index = JsonIndex::open(dir.path().join("users.json")).unwrap();
        (dir, CredentialStore::new(index))
    }

    #[test]
    fn test_hash_password_known_digest() {
        // sha256("password" + "salt")
        assert_eq!(
            hash_password("password", "salt"),
            "7a37b85c8918eac19a9089c0fa5a2ab4dce3f90528dcdeec108b23ddf3607b99"
        );
    }

    #[test]
    fn test_generated_salts_are_alphanumeric_and_distinct() {
        let (_dir, store) = store();
        let a = store.generate_salt().unwrap();
        let b = store.generate_salt().unwrap();

        assert_eq!(a.len(), SALT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
