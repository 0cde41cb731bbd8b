//! # Passport Registry
//!
//! Create, read, update, archive and scan-recording over a
//! [`PassportRepository`]. Listing delegates to the [`DashboardAggregator`].
//!
//! Every mutation advances `metadata.lastUpdated` through
//! [`Passport::touch`] and runs inside [`PassportRepository::try_update`].

use std::sync::Arc;

use chrono::Utc;
use dpp_core::{apply_passport_patch, NewPassport, Passport, PassportId, PassportStatus, Regulation};
use serde_json::Value;

use crate::dashboard::{DashboardAggregator, DashboardMetrics, PassportFilter, PassportPage};
use crate::error::RegistryError;
use crate::store::PassportRepository;

/// Regulations every new passport starts with, each `pending_review`.
pub const DEFAULT_SKELETON: &[Regulation] = &[Regulation::Espr, Regulation::Eprel];

/// Passport lifecycle operations.
#[derive(Debug, Clone)]
pub struct PassportRegistry {
    repo: Arc<dyn PassportRepository>,
    skeleton: Vec<Regulation>,
    dashboard: DashboardAggregator,
}

impl PassportRegistry {
    /// Registry over `repo` with the default skeleton and dashboard policy.
    pub fn new(repo: Arc<dyn PassportRepository>) -> Self {
        Self {
            repo,
            skeleton: DEFAULT_SKELETON.to_vec(),
            dashboard: DashboardAggregator::default(),
        }
    }

    /// Replace the default compliance skeleton.
    pub fn with_skeleton(mut self, skeleton: Vec<Regulation>) -> Self {
        self.skeleton = skeleton;
        self
    }

    /// Replace the dashboard aggregator.
    pub fn with_dashboard(mut self, dashboard: DashboardAggregator) -> Self {
        self.dashboard = dashboard;
        self
    }

    /// The underlying repository.
    pub fn repository(&self) -> &Arc<dyn PassportRepository> {
        &self.repo
    }

    /// Look up a passport.
    pub fn get_by_id(&self, id: &str) -> Result<Passport, RegistryError> {
        let id = PassportId::new(id)?;
        self.repo
            .get(&id)
            .ok_or_else(|| RegistryError::passport_not_found(&id))
    }

    /// Filtered, sorted, paginated listing.
    pub fn list(&self, filter: &PassportFilter) -> PassportPage {
        self.dashboard.page(self.repo.list(), filter)
    }

    /// Summary metrics over the passports matching `filter`.
    pub fn metrics(&self, filter: &PassportFilter) -> DashboardMetrics {
        self.dashboard.metrics(&self.repo.list(), filter)
    }

    /// Create a draft passport with a server-assigned id.
    pub fn create(&self, input: NewPassport, actor: &str) -> Result<Passport, RegistryError> {
        let passport = input.into_passport(PassportId::generate(), &self.skeleton, Utc::now())?;
        self.repo.insert(passport.clone())?;
        tracing::info!(passport_id = %passport.id, actor, "passport created");
        Ok(passport)
    }

    /// Apply a JSON merge patch.
    pub fn update(&self, id: &str, patch: &Value, actor: &str) -> Result<Passport, RegistryError> {
        let id = PassportId::new(id)?;
        let updated = self.repo.try_update(&id, &mut |p| {
            *p = apply_passport_patch(p, patch, Utc::now())?;
            Ok(())
        })?;
        tracing::info!(passport_id = %id, actor, "passport updated");
        Ok(updated)
    }

    /// Soft-delete. Archiving an archived passport returns it unchanged.
    pub fn archive(&self, id: &str, actor: &str) -> Result<Passport, RegistryError> {
        let id = PassportId::new(id)?;
        let archived = self.repo.try_update(&id, &mut |p| {
            if !p.is_archived() {
                p.metadata.status = PassportStatus::Archived;
                p.touch(Utc::now());
            }
            Ok(())
        })?;
        tracing::info!(passport_id = %id, actor, "passport archived");
        Ok(archived)
    }

    /// Count one consumer scan.
    pub fn record_scan(&self, id: &str) -> Result<Passport, RegistryError> {
        let id = PassportId::new(id)?;
        self.repo.try_update(&id, &mut |p| {
            if p.is_archived() {
                return Err(RegistryError::Archived(p.id.clone()));
            }
            p.consumer_scans = p.consumer_scans.saturating_add(1);
            p.touch(Utc::now());
            Ok(())
        })
    }

    /// Insert pre-built passports, skipping ids that already exist.
    /// Returns the number inserted.
    pub fn load(&self, passports: Vec<Passport>) -> usize {
        let mut inserted = 0;
        for passport in passports {
            let id = passport.id.clone();
            match self.repo.insert(passport) {
                Ok(()) => inserted += 1,
                Err(e) => tracing::debug!(passport_id = %id, error = %e, "skipping passport"),
            }
        }
        inserted
    }
}
