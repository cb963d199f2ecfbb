//! Relationship engine
//!
//! Owns the invitation lifecycle (`pending -> accepted | declined`, or
//! removed outright) and derives the 3-bucket network distance for any
//! profile from the invitations sent to it. Distance is a pure function of
//! local history; whatever distance an upstream payload claims is ignored.

use std::sync::Arc;
use tracing::info;

use crate::ids;
use crate::model::{timestamp_or_epoch, Invitation, InvitationStatus, NetworkDistance};
use crate::store::{collections, Workspace};
use crate::types::{EngineError, Result};

pub struct RelationshipEngine {
    ws: Arc<Workspace>,
}

impl RelationshipEngine {
    pub fn new(ws: Arc<Workspace>) -> Self {
        Self { ws }
    }

    /// Send a new invitation. Always appends a fresh `pending` record;
    /// repeated sends to the same recipient are allowed, and the distance
    /// derivation resolves the ambiguity by most recent `sent_at`.
    pub async fn send(
        &self,
        recipient_id: &str,
        account_id: &str,
        message: &str,
    ) -> Result<Invitation> {
        if recipient_id.trim().is_empty() {
            return Err(EngineError::invalid("Recipient identifier is required"));
        }
        let invitation = Invitation::new(recipient_id, account_id, message);

        let _guard = self.ws.locks.invitations.lock().await;
        let mut sent: Vec<Invitation> = self.ws.typed_list(collections::INVITATIONS).await?;
        sent.push(invitation.clone());
        self.ws.put_typed_list(collections::INVITATIONS, &sent).await?;

        info!(
            invitation = %invitation.id,
            recipient = %invitation.recipient_id,
            "invitation sent"
        );
        Ok(invitation)
    }

    /// Transition an invitation to `accepted` or `declined`
    pub async fn resolve(
        &self,
        invitation_id: &str,
        status: InvitationStatus,
    ) -> Result<Invitation> {
        if status == InvitationStatus::Pending {
            return Err(EngineError::invalid("Invitations cannot be re-opened"));
        }

        let _guard = self.ws.locks.invitations.lock().await;
        let mut sent: Vec<Invitation> = self.ws.typed_list(collections::INVITATIONS).await?;
        let invitation = sent
            .iter_mut()
            .find(|i| i.id == invitation_id)
            .ok_or_else(|| EngineError::not_found("Invitation"))?;

        invitation.status = status;
        invitation.updated_at = Some(ids::now_iso());
        let updated = invitation.clone();
        self.ws.put_typed_list(collections::INVITATIONS, &sent).await?;

        info!(invitation = %updated.id, status = %updated.status, "invitation resolved");
        Ok(updated)
    }

    /// Delete an invitation outright, re-opening the recipient for a
    /// future send
    pub async fn remove(&self, invitation_id: &str) -> Result<Invitation> {
        let _guard = self.ws.locks.invitations.lock().await;
        let mut sent: Vec<Invitation> = self.ws.typed_list(collections::INVITATIONS).await?;
        let position = sent
            .iter()
            .position(|i| i.id == invitation_id)
            .ok_or_else(|| EngineError::not_found("Invitation"))?;

        let removed = sent.remove(position);
        self.ws.put_typed_list(collections::INVITATIONS, &sent).await?;

        info!(invitation = %removed.id, recipient = %removed.recipient_id, "invitation withdrawn");
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<Invitation>> {
        self.ws.typed_list(collections::INVITATIONS).await
    }

    pub async fn distance_for(&self, external_id: &str) -> Result<NetworkDistance> {
        let sent = self.list().await?;
        Ok(derive_distance(&sent, external_id))
    }
}

/// Distance from invitation history: the most recent invitation (by
/// `sent_at`, later list position breaking exact ties) to the given
/// recipient decides; `accepted` is first degree, `pending` second,
/// anything else third.
pub fn derive_distance(invitations: &[Invitation], external_id: &str) -> NetworkDistance {
    derive_distance_any(invitations, &[external_id])
}

/// Same derivation over several identifiers for one profile. A profile may
/// have been invited under its public identifier or its provider id; the
/// most recent invitation addressed to any of them decides.
pub fn derive_distance_any(invitations: &[Invitation], candidates: &[&str]) -> NetworkDistance {
    let latest = invitations
        .iter()
        .filter(|i| candidates.iter().any(|c| !c.is_empty() && *c == i.recipient_id))
        .max_by_key(|i| timestamp_or_epoch(Some(&i.sent_at)));

    match latest.map(|i| i.status) {
        Some(InvitationStatus::Accepted) => NetworkDistance::FirstDegree,
        Some(InvitationStatus::Pending) => NetworkDistance::SecondDegree,
        _ => NetworkDistance::ThirdDegree,
    }
}
