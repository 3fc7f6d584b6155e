//! [`Organization`], the engine for one tenant.
//!
//! Bundles the permission store, access evaluator, pole registry and term
//! assignment validator over a shared pair of collaborators. Administrative
//! mutations take the acting subject and are gated by the evaluator: pole and
//! permission changes need `write` on the `admin` resource, member changes
//! need `write` on the `members` resource.

use std::{sync::Arc, time::Duration};

use crate::{
  Error, Result,
  access::{AccessEvaluator, Decision},
  assignment::{Assignment, TermAssignmentValidator},
  ids::{PoleId, ResourceId, SubjectId, TenantId},
  permission::{Action, Baseline, PermissionSet, PermissionStore},
  pole::{Pole, PoleRegistry},
  store::{DocumentStore, InsertOutcome, MemberDirectory, bounded},
  subject::Subject,
  term::TermNavigator,
};

#[derive(Debug, Clone)]
pub struct Settings {
  /// Upper bound on every collaborator call.
  pub store_timeout: Duration,
  pub baseline:      Baseline,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_timeout: Duration::from_secs(5),
      baseline:      Baseline::default(),
    }
  }
}

pub struct Organization<D, M> {
  tenant:      TenantId,
  directory:   Arc<M>,
  timeout:     Duration,
  permissions: PermissionStore<D>,
  access:      AccessEvaluator<D>,
  poles:       PoleRegistry<D, M>,
  terms:       TermAssignmentValidator<D, M>,
}

impl<D, M> Organization<D, M>
where
  D: DocumentStore,
  M: MemberDirectory,
{
  pub fn new(tenant: TenantId, documents: Arc<D>, directory: Arc<M>, settings: Settings) -> Self {
    let timeout = settings.store_timeout;
    let permissions =
      PermissionStore::new(Arc::clone(&documents), tenant.clone(), timeout, settings.baseline);
    let poles = PoleRegistry::new(
      Arc::clone(&documents),
      Arc::clone(&directory),
      tenant.clone(),
      timeout,
    );
    let terms = TermAssignmentValidator::new(
      Arc::clone(&directory),
      poles.clone(),
      tenant.clone(),
      timeout,
    );

    Self {
      access: AccessEvaluator::new(permissions.clone()),
      tenant,
      directory,
      timeout,
      permissions,
      poles,
      terms,
    }
  }

  pub fn tenant(&self) -> &TenantId { &self.tenant }

  // ── Access ────────────────────────────────────────────────────────────

  pub async fn can_access(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> Result<bool> {
    self.access.can_access(subject, resource, action).await
  }

  pub async fn explain(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> Result<Decision> {
    self.access.explain(subject, resource, action).await
  }

  pub async fn is_allowed(&self, subject: &Subject, resource: &ResourceId, action: Action) -> bool {
    self.access.is_allowed(subject, resource, action).await
  }

  pub async fn require(
    &self,
    subject: &Subject,
    resource: &ResourceId,
    action: Action,
  ) -> Result<()> {
    self.access.require(subject, resource, action).await
  }

  // ── Permissions ───────────────────────────────────────────────────────

  pub async fn get_permission(&self, resource: &ResourceId, action: Action) -> Result<PermissionSet> {
    self.permissions.get(resource, action).await
  }

  pub async fn set_permission(
    &self,
    actor: &Subject,
    resource: &ResourceId,
    action: Action,
    set: PermissionSet,
  ) -> Result<PermissionSet> {
    self.require(actor, &ResourceId::admin(), Action::Write).await?;
    self.permissions.set(resource, action, set).await
  }

  /// Save the read and write sets of `resource` together.
  pub async fn set_permission_pair(
    &self,
    actor: &Subject,
    resource: &ResourceId,
    read: PermissionSet,
    write: PermissionSet,
  ) -> Result<(PermissionSet, PermissionSet)> {
    self.require(actor, &ResourceId::admin(), Action::Write).await?;
    self.permissions.set_pair(resource, read, write).await
  }

  // ── Poles ─────────────────────────────────────────────────────────────

  pub async fn list_poles(&self) -> Result<Vec<Pole>> { self.poles.list().await }

  pub async fn add_pole(&self, actor: &Subject, name: &str) -> Result<Pole> {
    self.require(actor, &ResourceId::admin(), Action::Write).await?;
    self.poles.add(name).await
  }

  pub async fn rename_pole(&self, actor: &Subject, id: &PoleId, new_name: &str) -> Result<Pole> {
    self.require(actor, &ResourceId::admin(), Action::Write).await?;
    self.poles.rename(id, new_name).await
  }

  pub async fn remove_pole(&self, actor: &Subject, id: &PoleId) -> Result<()> {
    self.require(actor, &ResourceId::admin(), Action::Write).await?;
    self.poles.remove(id).await
  }

  // ── Members ───────────────────────────────────────────────────────────

  pub async fn members(&self) -> Result<Vec<Subject>> {
    let roster = bounded(self.timeout, self.directory.list_members(&self.tenant)).await?;
    Ok(roster.members)
  }

  pub async fn member(&self, id: &SubjectId) -> Result<Subject> {
    bounded(self.timeout, self.directory.get_member(&self.tenant, id))
      .await?
      .ok_or_else(|| Error::MemberNotFound(id.clone()))
  }

  /// Register `subject` unless a subject with the same id already exists.
  /// Returns whether it was inserted.
  pub async fn enroll(&self, subject: Subject) -> Result<bool> {
    let id = subject.id.clone();
    match bounded(self.timeout, self.directory.insert_member(&self.tenant, subject)).await? {
      InsertOutcome::Inserted => {
        tracing::info!(tenant = %self.tenant, subject = %id, "subject enrolled");
        Ok(true)
      }
      InsertOutcome::Exists => Ok(false),
    }
  }

  pub async fn assign_term_role(
    &self,
    actor: &Subject,
    subject_id: &SubjectId,
    assignment: Assignment,
  ) -> Result<Subject> {
    self.require(actor, &ResourceId::members(), Action::Write).await?;
    self.terms.assign(subject_id, assignment).await
  }

  pub async fn admit(&self, actor: &Subject, subject_id: &SubjectId) -> Result<Subject> {
    self.require(actor, &ResourceId::members(), Action::Write).await?;
    self.terms.admit(subject_id).await
  }

  pub async fn remove_from_organization(
    &self,
    actor: &Subject,
    subject_id: &SubjectId,
  ) -> Result<Subject> {
    self.require(actor, &ResourceId::members(), Action::Write).await?;
    self.terms.remove_from_organization(subject_id).await
  }

  // ── Terms ─────────────────────────────────────────────────────────────

  /// The current roster grouped by term, positioned on the latest term.
  pub async fn terms(&self) -> Result<TermNavigator> {
    Ok(TermNavigator::new(self.members().await?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    role::{OfficerRole, Status},
    subject::{PoleMembership, Term},
    testing::{MemoryStore, tenant},
  };

  fn organization(memory: &Arc<MemoryStore>) -> Organization<MemoryStore, MemoryStore> {
    Organization::new(tenant(), Arc::clone(memory), Arc::clone(memory), Settings::default())
  }

  fn roster() -> Arc<MemoryStore> {
    let memory = Arc::new(MemoryStore::default());
    memory.seed(Subject::new("root", Status::Superadmin));
    memory.seed(Subject::new("ada", Status::Admin));
    memory.seed(Subject::new("max", Status::Member));
    memory
  }

  #[tokio::test]
  async fn administration_is_gated_on_admin_write() {
    let memory = roster();
    let org = organization(&memory);
    let root = org.member(&"root".into()).await.unwrap();
    let ada = org.member(&"ada".into()).await.unwrap();

    // Nothing grants admins yet; only the superadmin bypass applies.
    let err = org.add_pole(&ada, "RH").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    org
      .set_permission(&root, &ResourceId::admin(), Action::Write, PermissionSet::roles([Status::Admin]))
      .await
      .unwrap();
    let rh = org.add_pole(&ada, "RH").await.unwrap();
    org.rename_pole(&ada, &rh.id, "Ressources humaines").await.unwrap();

    let max = org.member(&"max".into()).await.unwrap();
    let err = org.remove_pole(&max, &rh.id).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
    org.remove_pole(&ada, &rh.id).await.unwrap();
    assert!(org.list_poles().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn gate_fails_closed_when_store_is_down() {
    let memory = roster();
    let org = organization(&memory);
    let ada = org.member(&"ada".into()).await.unwrap();

    memory.fail_reads(true);
    let err = org.add_pole(&ada, "RH").await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));
  }

  #[tokio::test]
  async fn pole_grant_follows_assignment() {
    let memory = roster();
    let org = organization(&memory);
    let root = org.member(&"root".into()).await.unwrap();

    let quality = org.add_pole(&root, "Qualité").await.unwrap();
    let audits = ResourceId::new("audits");
    org
      .set_permission(&root, &audits, Action::Read, PermissionSet::poles([quality.id.clone()]))
      .await
      .unwrap();

    let max = org.member(&"max".into()).await.unwrap();
    assert!(!org.can_access(&max, &audits, Action::Read).await.unwrap());

    let assignment = Assignment {
      term: Term::new("2023-2024"),
      poles: vec![PoleMembership::new(quality.id.clone())],
      officer_role: None,
    };
    let max = org.assign_term_role(&root, &max.id, assignment).await.unwrap();
    assert!(org.can_access(&max, &audits, Action::Read).await.unwrap());

    let err = org.remove_pole(&root, &quality.id).await.unwrap_err();
    assert!(matches!(err, Error::InUse { .. }));
  }

  #[tokio::test]
  async fn enroll_is_idempotent() {
    let memory = roster();
    let org = organization(&memory);

    assert!(org.enroll(Subject::new("new", Status::Etudiant)).await.unwrap());
    assert!(!org.enroll(Subject::new("new", Status::Admin)).await.unwrap());
    assert_eq!(org.member(&"new".into()).await.unwrap().status, Status::Etudiant);
  }

  #[tokio::test]
  async fn concurrent_enrollments_insert_once() {
    let memory = roster();
    let org = organization(&memory);

    let (first, second) = tokio::join!(
      org.enroll(Subject::new("new", Status::Etudiant)),
      org.enroll(Subject::new("new", Status::Member)),
    );
    let inserted = [first.unwrap(), second.unwrap()];
    assert_eq!(inserted.iter().filter(|i| **i).count(), 1);

    let members = org.members().await.unwrap();
    assert_eq!(members.iter().filter(|m| m.id.as_str() == "new").count(), 1);
  }

  #[tokio::test]
  async fn terms_reflect_assignments() {
    let memory = roster();
    let org = organization(&memory);
    let root = org.member(&"root".into()).await.unwrap();

    let president = Assignment {
      term: Term::new("2022-2023"),
      officer_role: Some(OfficerRole::President),
      ..Assignment::default()
    };
    org.assign_term_role(&root, &"max".into(), president).await.unwrap();

    let nav = org.terms().await.unwrap();
    let labels: Vec<_> = nav.buckets().iter().map(|b| b.label()).collect();
    assert_eq!(labels, vec!["2022-2023", "no term"]);
    assert_eq!(nav.current().unwrap().label(), "2022-2023");
  }
}
