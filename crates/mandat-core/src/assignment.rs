//! Term-scoped assignment of poles and officer roles.
//!
//! The one structural invariant: within a term at most one subject holds the
//! presidency, whether through [`OfficerRole::President`] or through the
//! president pole. The other officer roles and the per-pole "responsable"
//! flag carry no uniqueness constraint.
//!
//! The roster scan and the write are tied by the roster version, and the pole
//! check by the pole list version. If another writer changed either in
//! between, the write is refused with [`Error::VersionConflict`] and nothing
//! is persisted.

use std::{collections::HashSet, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  ids::{SubjectId, TenantId},
  pole::PoleRegistry,
  role::{OfficerRole, Status},
  store::{DocumentStore, Guard, MemberDirectory, MemberPatch, Roster, UpdateOutcome, bounded},
  subject::{PoleMembership, Subject, Term},
};

/// A proposed term, pole set and officer role for one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
  #[serde(default)]
  pub term:         Option<Term>,
  #[serde(default)]
  pub poles:        Vec<PoleMembership>,
  #[serde(default)]
  pub officer_role: Option<OfficerRole>,
}

impl Assignment {
  pub fn claims_presidency(&self) -> bool {
    self.officer_role == Some(OfficerRole::President)
      || self.poles.iter().any(|m| m.pole_id.is_president_pole())
  }

  /// Blank term → no term, repeated poles collapsed (first wins), and the
  /// "responsable" flag dropped from officer poles.
  fn normalized(mut self) -> Self {
    self.term = self.term.and_then(|t| Term::new(t.as_str()));

    let mut seen = HashSet::new();
    self.poles.retain(|m| seen.insert(m.pole_id.clone()));
    for membership in &mut self.poles {
      if membership.pole_id.is_officer_pole() {
        membership.is_officer_of_pole = false;
      }
    }
    self
  }
}

/// The current president of `term` other than `except`, if any.
pub fn president_of<'a>(
  roster: &'a Roster,
  term: &Term,
  except: &SubjectId,
) -> Option<&'a Subject> {
  roster.members.iter().find(|m| {
    &m.id != except && m.effective_term() == Some(term) && m.holds_presidency()
  })
}

pub struct TermAssignmentValidator<D, M> {
  directory: Arc<M>,
  poles:     PoleRegistry<D, M>,
  tenant:    TenantId,
  timeout:   Duration,
}

impl<D, M> Clone for TermAssignmentValidator<D, M> {
  fn clone(&self) -> Self {
    Self {
      directory: Arc::clone(&self.directory),
      poles:     self.poles.clone(),
      tenant:    self.tenant.clone(),
      timeout:   self.timeout,
    }
  }
}

impl<D, M> TermAssignmentValidator<D, M>
where
  D: DocumentStore,
  M: MemberDirectory,
{
  pub fn new(
    directory: Arc<M>,
    poles: PoleRegistry<D, M>,
    tenant: TenantId,
    timeout: Duration,
  ) -> Self {
    Self { directory, poles, tenant, timeout }
  }

  async fn roster(&self) -> Result<Roster> {
    bounded(self.timeout, self.directory.list_members(&self.tenant)).await
  }

  fn scanned(&self, roster: &Roster) -> Guard {
    Guard::Roster { tenant: self.tenant.clone(), version: roster.version.clone() }
  }

  async fn update(
    &self,
    id: &SubjectId,
    patch: MemberPatch,
    guards: Vec<Guard>,
  ) -> Result<Subject> {
    let outcome = bounded(
      self.timeout,
      self.directory.update_member(&self.tenant, id, patch, guards),
    )
    .await?;
    match outcome {
      UpdateOutcome::Updated(subject) => Ok(subject),
      UpdateOutcome::NotFound => Err(Error::MemberNotFound(id.clone())),
      UpdateOutcome::Stale { key } => {
        tracing::warn!(tenant = %self.tenant, subject = %id, %key, "changed concurrently");
        Err(Error::VersionConflict(key))
      }
    }
  }

  fn find<'a>(roster: &'a Roster, id: &SubjectId) -> Result<&'a Subject> {
    roster.find(id).ok_or_else(|| Error::MemberNotFound(id.clone()))
  }

  /// Persist `assignment` for `subject_id`, refusing a second president in
  /// the same term.
  pub async fn assign(&self, subject_id: &SubjectId, assignment: Assignment) -> Result<Subject> {
    let assignment = assignment.normalized();
    let roster = self.roster().await?;
    let subject = Self::find(&roster, subject_id)?;
    if !subject.status.is_member() {
      return Err(Error::Validation(format!(
        "{subject_id} is not a member of the organization"
      )));
    }

    let pole_list = self
      .poles
      .check_known(assignment.poles.iter().map(|m| &m.pole_id))
      .await?;

    if assignment.claims_presidency()
      && let Some(term) = &assignment.term
      && let Some(holder) = president_of(&roster, term, subject_id)
    {
      tracing::warn!(
        tenant = %self.tenant, subject = %subject_id, %term, holder = %holder.id,
        "presidency already held for term"
      );
      return Err(Error::PresidentConflict { term: term.clone(), holder: holder.id.clone() });
    }

    let patch = MemberPatch {
      status:       None,
      poles:        Some(assignment.poles),
      officer_role: Some(assignment.officer_role),
      term:         Some(assignment.term),
    };
    let mut guards = vec![self.scanned(&roster)];
    guards.extend(pole_list);
    let updated = self.update(subject_id, patch, guards).await?;

    tracing::info!(
      tenant = %self.tenant,
      subject = %subject_id,
      term = ?updated.term,
      officer_role = ?updated.officer_role,
      poles = updated.poles.len(),
      "assignment saved"
    );
    Ok(updated)
  }

  /// Promote an `etudiant` to `member`. Members and admins are left as is.
  pub async fn admit(&self, subject_id: &SubjectId) -> Result<Subject> {
    let roster = self.roster().await?;
    let subject = Self::find(&roster, subject_id)?;
    if subject.is_superadmin() {
      return Err(Error::Validation(format!("{subject_id} is a superadmin")));
    }
    if subject.status.is_member() {
      return Ok(subject.clone());
    }

    let patch = MemberPatch { status: Some(Status::Member), ..MemberPatch::default() };
    let updated = self.update(subject_id, patch, vec![self.scanned(&roster)]).await?;
    tracing::info!(tenant = %self.tenant, subject = %subject_id, "member admitted");
    Ok(updated)
  }

  /// Downgrade a member or admin to `etudiant`, clearing poles, officer role
  /// and term.
  pub async fn remove_from_organization(&self, subject_id: &SubjectId) -> Result<Subject> {
    let roster = self.roster().await?;
    let subject = Self::find(&roster, subject_id)?;
    if subject.is_superadmin() {
      return Err(Error::Validation(format!(
        "{subject_id} is a superadmin and cannot be removed"
      )));
    }

    let patch = MemberPatch {
      status:       Some(Status::Etudiant),
      poles:        Some(Vec::new()),
      officer_role: Some(None),
      term:         Some(None),
    };
    let updated = self.update(subject_id, patch, vec![self.scanned(&roster)]).await?;
    tracing::info!(tenant = %self.tenant, subject = %subject_id, "member removed");
    Ok(updated)
  }
}
