//! The access decision.
//!
//! [`decide`] is the pure rule; [`AccessEvaluator`] loads the permission set
//! it needs. Grants combine with OR: a role grant, a pole grant and an
//! explicit member grant are each sufficient on their own, and none takes
//! precedence over another.

use serde::Serialize;

use crate::{
  Error, Result,
  ids::{PoleId, ResourceId},
  permission::{Action, PermissionSet, PermissionStore},
  store::DocumentStore,
  subject::Subject,
};

/// Which rule allowed access, or that none did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "grant", rename_all = "snake_case")]
pub enum Decision {
  Superadmin,
  /// The set grants every member of the organization.
  AnyMember,
  Role,
  Pole { pole: PoleId },
  Member,
  Denied,
}

impl Decision {
  pub fn is_allowed(&self) -> bool { !matches!(self, Self::Denied) }
}

/// Decide whether `subject` is admitted by `set`.
///
/// Pole and member grants only reach subjects who belong to the
/// organization; an `etudiant` is admitted only by a role grant naming its
/// status.
pub fn decide(subject: &Subject, set: &PermissionSet) -> Decision {
  let status = subject.status;

  if subject.is_superadmin() {
    return Decision::Superadmin;
  }
  if set.any_member && status.is_member() {
    return Decision::AnyMember;
  }
  if set.allowed_roles.contains(&status) {
    return Decision::Role;
  }
  if !status.is_member() {
    return Decision::Denied;
  }
  if let Some(m) = subject
    .poles
    .iter()
    .find(|m| set.allowed_poles.contains(&m.pole_id))
  {
    return Decision::Pole { pole: m.pole_id.clone() };
  }
  if set.allowed_members.contains(&subject.id) {
    return Decision::Member;
  }
  Decision::Denied
}

pub struct AccessEvaluator<D> {
  permissions: PermissionStore<D>,
}

impl<D> Clone for AccessEvaluator<D> {
  fn clone(&self) -> Self { Self { permissions: self.permissions.clone() } }
}

impl<D: DocumentStore> AccessEvaluator<D> {
  pub fn new(permissions: PermissionStore<D>) -> Self { Self { permissions } }

  pub async fn explain(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> Result<Decision> {
    // Superadmins never need the store.
    if subject.is_superadmin() {
      return Ok(Decision::Superadmin);
    }
    let set = self.permissions.get(resource, action).await?;
    let decision = decide(subject, &set);
    tracing::debug!(subject = %subject.id, %resource, %action, ?decision, "access decided");
    Ok(decision)
  }

  /// Store failures are returned as errors; callers must treat them as a
  /// denial.
  pub async fn can_access(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> Result<bool> {
    Ok(self.explain(subject, resource, action).await?.is_allowed())
  }

  /// Fail-closed form of [`Self::can_access`].
  pub async fn is_allowed(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> bool {
    match self.can_access(subject, resource, action).await {
      Ok(allowed) => allowed,
      Err(e) => {
        tracing::warn!(subject = %subject.id, %resource, %action, error = %e, "access check failed; denying");
        false
      }
    }
  }

  /// `Ok(())` if allowed, [`Error::Forbidden`] if denied.
  pub async fn require(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> Result<()> {
    if self.can_access(subject, resource, action).await? {
      Ok(())
    } else {
      Err(Error::Forbidden { resource: resource.clone(), action })
    }
  }
}
