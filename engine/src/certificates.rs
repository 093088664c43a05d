//! # Certificate Issuer
//!
//! Mints the unique, non-transferable-at-mint completion record for each
//! finished project and owns certificate storage exclusively. The engine
//! is the only caller; external readers reach certificates through the
//! engine's query surface.
//!
//! | Table        | Key         | Value                          |
//! |--------------|-------------|--------------------------------|
//! | certificates | `u64` id    | [`Certificate`], immutable     |
//! | by_owner     | `AccountId` | certificate ids, in mint order |
//!
//! Certificate ids are a global sequence starting at 1. The issuer also
//! guards one-mint-per-project on its own, independent of the engine's
//! completion gate.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use crate::types::{AccountId, Certificate};
use crate::Error;

#[derive(Debug, Default)]
pub struct CertificateIssuer {
    certificates: BTreeMap<u64, Certificate>,
    by_owner: BTreeMap<AccountId, Vec<u64>>,
    by_project: BTreeMap<u64, u64>,
    next_id: u64,
}

impl CertificateIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a certificate for `owner` and return its id.
    ///
    /// Fails with [`Error::MintFailure`] only on issuer-storage failure:
    /// a certificate already exists for the project, or the id sequence
    /// is exhausted. The caller treats that as fatal to the enclosing
    /// completion and commits nothing.
    pub fn mint(
        &mut self,
        owner: AccountId,
        project_id: u64,
        project_name: String,
        description: String,
        impact_value: u64,
        image_uri: String,
    ) -> Result<u64, Error> {
        if self.by_project.contains_key(&project_id) {
            return Err(Error::MintFailure(format!(
                "certificate already minted for project {project_id}"
            )));
        }
        let id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| Error::MintFailure("certificate id sequence exhausted".into()))?;
        self.next_id = id;

        let certificate = Certificate {
            id,
            owner: owner.clone(),
            project_id,
            project_name,
            description,
            impact_value,
            image_uri,
            issued_at: Utc::now(),
        };
        self.certificates.insert(id, certificate);
        self.by_owner.entry(owner.clone()).or_default().push(id);
        self.by_project.insert(project_id, id);

        info!(certificate_id = id, project_id, owner = %owner, "certificate minted");
        Ok(id)
    }

    /// Look up a certificate by its global id.
    pub fn get(&self, id: u64) -> Option<&Certificate> {
        self.certificates.get(&id)
    }

    /// All certificates owned by `owner`, in mint order.
    pub fn owned_by(&self, owner: &AccountId) -> Vec<&Certificate> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.certificates.get(id)).collect())
            .unwrap_or_default()
    }

    /// Total number of certificates ever minted.
    pub fn count(&self) -> u64 {
        self.certificates.len() as u64
    }
}
