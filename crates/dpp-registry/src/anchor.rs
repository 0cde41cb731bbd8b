//! # Anchor Service
//!
//! Records a simulated ledger anchor for a passport. Each call derives fresh
//! identifiers, overwrites `blockchainIdentifiers`, and appends an
//! [`AnchorRecord`] to `anchorHistory` so that overwritten anchors remain
//! auditable.
//!
//! Anchoring is not idempotent unless the caller supplies an idempotency
//! key: a retry carrying a key already present in the history returns the
//! passport unchanged.

use std::sync::Arc;

use chrono::Utc;
use dpp_core::{derive_anchor_identifiers, AnchorRecord, Passport, PassportId, ValidationError};
use uuid::Uuid;

use crate::error::RegistryError;
use crate::store::PassportRepository;

/// Simulated anchoring against a named platform.
#[derive(Debug, Clone)]
pub struct AnchorService {
    repo: Arc<dyn PassportRepository>,
}

impl AnchorService {
    /// Anchor service over `repo`.
    pub fn new(repo: Arc<dyn PassportRepository>) -> Self {
        Self { repo }
    }

    /// Anchor `passport_id` on `platform`.
    ///
    /// Checks run in order: blank platform, blank id, unknown id, archived.
    pub fn anchor(
        &self,
        passport_id: &str,
        platform: &str,
        actor: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Passport, RegistryError> {
        let platform = platform.trim();
        if platform.is_empty() {
            return Err(ValidationError::MissingField("platform".to_string()).into());
        }
        let id = PassportId::new(passport_id)?;
        let key = idempotency_key.map(str::trim).filter(|k| !k.is_empty());

        let mut replayed = false;
        let passport = self.repo.try_update(&id, &mut |p| {
            if p.is_archived() {
                return Err(RegistryError::Archived(p.id.clone()));
            }
            if let Some(key) = key {
                if p.anchor_history
                    .iter()
                    .any(|r| r.idempotency_key.as_deref() == Some(key))
                {
                    replayed = true;
                    return Ok(());
                }
            }

            let now = Utc::now();
            let nonce = Uuid::new_v4();
            let ids = derive_anchor_identifiers(&p.id, platform, now, nonce.as_bytes());
            p.anchor_history.push(AnchorRecord {
                platform: ids.platform.clone(),
                anchor_transaction_hash: ids.anchor_transaction_hash.clone().unwrap_or_default(),
                contract_address: ids.contract_address.clone().unwrap_or_default(),
                token_id: ids.token_id.clone().unwrap_or_default(),
                anchored_at: now,
                anchored_by: actor.to_string(),
                idempotency_key: key.map(String::from),
            });
            p.blockchain_identifiers = Some(ids);
            p.touch(now);
            Ok(())
        })?;

        if replayed {
            tracing::info!(passport_id = %id, platform, "anchor replayed for idempotency key");
        } else {
            tracing::info!(
                passport_id = %id,
                platform,
                actor,
                anchors = passport.anchor_history.len(),
                "passport anchored"
            );
        }
        Ok(passport)
    }
}
