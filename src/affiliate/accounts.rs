//! Affiliate code generation and credential checks.
//!
//! Generated codes are persisted in a flat JSON file together with an argon2
//! hash of a one-time secret. The secret itself is returned once, at
//! generation time, and never stored.

use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::affiliate::AffiliateCode;
use crate::config::{AFFILIATE_PATH_PREFIX, GENERATED_SECRET_LENGTH};
use crate::error_handling::AffiliateError;

/// A registered affiliate code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateRecord {
    pub code: String,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

/// On-disk layout of the record file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    affiliates: Vec<AffiliateRecord>,
}

/// Result of a successful generation. `secret` is only available here.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAffiliate {
    pub code: AffiliateCode,
    pub secret: String,
    pub affiliate_url: String,
}

/// File-backed registry of generated affiliate codes.
pub struct AffiliateAccounts {
    path: PathBuf,
    public_base_url: String,
    reserved: Vec<String>,
    records: Mutex<Vec<AffiliateRecord>>,
}

impl AffiliateAccounts {
    /// Opens the record file at `path`, starting empty if it does not exist.
    ///
    /// `reserved` codes (e.g. the default code) can never be generated.
    pub async fn open(
        path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        reserved: Vec<String>,
    ) -> Result<Self, AffiliateError> {
        let path = path.into();
        let records = load_records(&path).await?;
        info!(
            "Loaded {} affiliate record(s) from {}",
            records.len(),
            path.display()
        );
        Ok(Self {
            path,
            public_base_url: public_base_url.into(),
            reserved,
            records: Mutex::new(records),
        })
    }

    /// Public landing URL for `code`.
    pub fn affiliate_url(&self, code: &str) -> String {
        format!(
            "{}{}{}",
            self.public_base_url.trim_end_matches('/'),
            AFFILIATE_PATH_PREFIX,
            code
        )
    }

    /// Registers `requested` and returns its one-time secret.
    ///
    /// Codes are unique case-insensitively. The record is written to disk
    /// before it becomes visible; a failed write leaves nothing registered.
    pub async fn generate(&self, requested: &str) -> Result<GeneratedAffiliate, AffiliateError> {
        let code = AffiliateCode::parse(requested)?;
        if self.is_taken(&self.records.lock().await, &code) {
            return Err(AffiliateError::CodeAlreadyExists(code.into_inner()));
        }

        // hashed outside the lock
        let secret = generate_secret();
        let secret_hash = hash_secret(secret.clone()).await?;

        let mut records = self.records.lock().await;
        if self.is_taken(&records, &code) {
            return Err(AffiliateError::CodeAlreadyExists(code.into_inner()));
        }
        let mut updated = records.clone();
        updated.push(AffiliateRecord {
            code: code.as_str().to_string(),
            secret_hash,
            created_at: Utc::now(),
        });
        save_records(&self.path, &updated).await?;
        *records = updated;

        info!("Generated affiliate code {}", code);
        Ok(GeneratedAffiliate {
            affiliate_url: self.affiliate_url(code.as_str()),
            code,
            secret,
        })
    }

    fn is_taken(&self, records: &[AffiliateRecord], code: &AffiliateCode) -> bool {
        self.reserved
            .iter()
            .map(String::as_str)
            .chain(records.iter().map(|r| r.code.as_str()))
            .any(|existing| existing.eq_ignore_ascii_case(code.as_str()))
    }

    /// Checks `secret` against the stored hash for `code`.
    pub async fn verify(&self, code: &str, secret: &str) -> Result<AffiliateRecord, AffiliateError> {
        let record = self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.code == code)
            .cloned()
            .ok_or_else(|| AffiliateError::InvalidCredentials(code.to_string()))?;

        let hash = record.secret_hash.clone();
        let secret = secret.to_string();
        let matches = tokio::task::spawn_blocking(move || -> Result<bool, AffiliateError> {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| AffiliateError::StoreFailure(format!("unreadable hash: {e}")))?;
            Ok(Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| AffiliateError::StoreFailure(format!("secret check aborted: {e}")))??;

        if !matches {
            return Err(AffiliateError::InvalidCredentials(code.to_string()));
        }
        Ok(record)
    }

    /// Whether `code` is registered (exact spelling).
    pub async fn contains(&self, code: &str) -> bool {
        self.records.lock().await.iter().any(|r| r.code == code)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

async fn hash_secret(secret: String) -> Result<String, AffiliateError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AffiliateError::StoreFailure(format!("salt encoding failed: {e}")))?;

    tokio::task::spawn_blocking(move || {
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AffiliateError::StoreFailure(format!("secret hashing failed: {e}")))
    })
    .await
    .map_err(|e| AffiliateError::StoreFailure(format!("secret hashing aborted: {e}")))?
}

async fn load_records(path: &Path) -> Result<Vec<AffiliateRecord>, AffiliateError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AffiliateError::StoreFailure(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: AccountsFile = serde_json::from_str(&content).map_err(|e| {
        AffiliateError::StoreFailure(format!("failed to parse {}: {e}", path.display()))
    })?;
    Ok(file.affiliates)
}

async fn save_records(path: &Path, records: &[AffiliateRecord]) -> Result<(), AffiliateError> {
    let file = AccountsFile {
        affiliates: records.to_vec(),
    };
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| AffiliateError::StoreFailure(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| {
            AffiliateError::StoreFailure(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    let write = async {
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await
    };
    write.await.map_err(|e| {
        warn!("Failed to persist affiliate records to {}: {}", path.display(), e);
        AffiliateError::StoreFailure(format!("failed to write {}: {e}", path.display()))
    })
}
