//! Save-commit pipeline.
//!
//! Turns a session's desired preparation into owned-spell mutations, one
//! class at a time. A class whose read, mutations or swap markers fail is
//! reported and skipped; the remaining classes still commit. After a class commits its consumed
//! swap windows are recorded and, under `notifyGM`, admitted violations are
//! sent to the GM.

mod error;
mod plan;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use spellbook_domain::{
    ritual_injections, Actor, ActorId, ClassIdentifier, ClassRules, EnforcementBehavior,
    Rejection, SpellUuid, SwapKind, SwapWindow, ViolationKind,
};
use spellbook_shared::{PrepNotification, PrepNotificationDetails};

use crate::entities::Spells;
use crate::infrastructure::app_settings::SpellbookSettings;
use crate::infrastructure::ports::{
    ActorRepo, EmbeddedDocument, EmbeddedPatch, NotificationPort, RepoError,
};
use crate::use_cases::lifecycle::LifecycleOps;

pub use error::CommitError;
pub use plan::{plan_class, ClassPlan, PlanInput};

/// A change that broke a rule but was admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedChange {
    pub uuid: SpellUuid,
    pub name: String,
    pub rejection: Rejection,
}

/// Desired end state of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCommit {
    pub class: ClassIdentifier,
    pub rules: ClassRules,
    pub spells: BTreeSet<SpellUuid>,
    pub cantrips: BTreeSet<SpellUuid>,
    /// Spellbook contents, for classes that keep one
    pub known: Option<Vec<SpellUuid>>,
    /// Windows a swap in this session used
    pub swaps: Vec<(SwapKind, SwapWindow)>,
    pub flagged: Vec<FlaggedChange>,
    pub spell_max: u32,
    pub cantrip_max: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub actor_id: ActorId,
    pub enforcement: EnforcementBehavior,
    pub classes: Vec<ClassCommit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFailure {
    pub class: ClassIdentifier,
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub committed: Vec<ClassIdentifier>,
    pub failed: Vec<ClassFailure>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub notifications: usize,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(
        &mut self,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        stage: &'static str,
        err: &dyn std::fmt::Display,
    ) {
        tracing::error!(
            actor_id = %actor_id,
            class_id = %class,
            stage,
            error = %err,
            "Commit failed for class"
        );
        self.failed.push(ClassFailure {
            class: class.clone(),
            stage,
            message: err.to_string(),
        });
    }
}

pub struct CommitPipeline {
    actors: Arc<dyn ActorRepo>,
    spells: Arc<Spells>,
    lifecycle: Arc<LifecycleOps>,
    notifications: Arc<dyn NotificationPort>,
}

impl CommitPipeline {
    pub fn new(
        actors: Arc<dyn ActorRepo>,
        spells: Arc<Spells>,
        lifecycle: Arc<LifecycleOps>,
        notifications: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            actors,
            spells,
            lifecycle,
            notifications,
        }
    }

    async fn fresh_actor(&self, actor_id: &ActorId) -> Result<Actor, CommitError> {
        self.actors
            .get(actor_id)
            .await?
            .ok_or(CommitError::ActorNotFound)
    }

    /// Commit every class of `request`.
    ///
    /// # Returns
    /// * `Ok(CommitReport)` - Per-class outcome; check `failed`
    /// * `Err(CommitError)` - The actor could not be read before the first class
    pub async fn execute(
        &self,
        request: &CommitRequest,
        settings: &SpellbookSettings,
    ) -> Result<CommitReport, CommitError> {
        let mut report = CommitReport::default();
        let mut first_read = Some(self.fresh_actor(&request.actor_id).await?);
        for commit in &request.classes {
            // Re-read between classes so each plan sees the previous writes
            let actor = match first_read.take() {
                Some(actor) => actor,
                None => match self.fresh_actor(&request.actor_id).await {
                    Ok(actor) => actor,
                    Err(err) => {
                        report.fail(&request.actor_id, &commit.class, "read", &err);
                        continue;
                    }
                },
            };
            let Some(class) = actor.class(&commit.class) else {
                tracing::warn!(actor_id = %actor.id, class_id = %commit.class, "Class left the actor, skipping");
                continue;
            };

            let wanted = commit
                .spells
                .iter()
                .chain(commit.cantrips.iter())
                .chain(commit.known.iter().flatten())
                .cloned();
            let docs = self.spells.fetch_many(wanted, settings.fetch_gate()).await.spells;
            let rituals: BTreeSet<SpellUuid> = match &commit.known {
                Some(known) => ritual_injections(
                    &commit.rules,
                    known.iter(),
                    |uuid| docs.get(uuid).is_some_and(|spell| spell.is_ritual()),
                    &commit.spells,
                )
                .into_iter()
                .collect(),
                None => BTreeSet::new(),
            };

            let plan = plan_class(&PlanInput {
                actor: &actor,
                class,
                rules: &commit.rules,
                spells: &commit.spells,
                cantrips: &commit.cantrips,
                rituals: &rituals,
                docs: &docs,
                delete_unprepared: settings.delete_unprepared_spells,
            });
            tracing::debug!(
                actor_id = %actor.id,
                class_id = %commit.class,
                create = plan.create.len(),
                update = plan.update.len(),
                delete = plan.delete.len(),
                "Planned class commit"
            );

            if let Err((stage, err)) = self.apply(&actor.id, &plan).await {
                report.fail(&actor.id, &commit.class, stage, &err);
                continue;
            }
            report.created += plan.create.len();
            report.updated += plan.update.len();
            report.deleted += plan.delete.len();

            if let Err(err) = self.consume_swaps(&actor.id, commit).await {
                // Mutations landed; the session stays dirty so a retry rewrites the marker
                report.fail(&actor.id, &commit.class, "swap-marker", &err);
                continue;
            }
            if request.enforcement == EnforcementBehavior::NotifyGm {
                report.notifications += self.notify(&actor, &class.name, commit).await;
            }
            tracing::info!(actor_id = %actor.id, class_id = %commit.class, "Class preparation saved");
            report.committed.push(commit.class.clone());
        }
        Ok(report)
    }

    async fn consume_swaps(
        &self,
        actor_id: &ActorId,
        commit: &ClassCommit,
    ) -> Result<(), RepoError> {
        for (kind, window) in &commit.swaps {
            self.lifecycle
                .consume(actor_id, &commit.class, *kind, window)
                .await?;
        }
        Ok(())
    }

    async fn apply(&self, actor_id: &ActorId, plan: &ClassPlan) -> Result<(), (&'static str, RepoError)> {
        if !plan.create.is_empty() {
            let documents = plan
                .create
                .iter()
                .cloned()
                .map(EmbeddedDocument::Spell)
                .collect();
            self.actors
                .create_embedded(actor_id, documents)
                .await
                .map_err(|err| ("create", err))?;
        }
        if !plan.update.is_empty() {
            let patches = plan
                .update
                .iter()
                .cloned()
                .map(EmbeddedPatch::Spell)
                .collect();
            self.actors
                .update_embedded(actor_id, patches)
                .await
                .map_err(|err| ("update", err))?;
        }
        if !plan.delete.is_empty() {
            self.actors
                .delete_embedded(actor_id, plan.delete.clone())
                .await
                .map_err(|err| ("delete", err))?;
        }
        Ok(())
    }

    /// One GM notice per violation kind. Returns how many were sent.
    async fn notify(&self, actor: &Actor, class_name: &str, commit: &ClassCommit) -> usize {
        let mut by_kind: BTreeMap<ViolationKind, Vec<&FlaggedChange>> = BTreeMap::new();
        for change in &commit.flagged {
            if let Some(kind) = change.rejection.violation() {
                by_kind.entry(kind).or_default().push(change);
            }
        }

        let mut sent = 0;
        for (kind, changes) in by_kind {
            let (current, max) = match changes.first().map(|change| &change.rejection) {
                Some(Rejection::AtMaximum {
                    kind: SwapKind::Cantrip,
                    ..
                }) => (Some(commit.cantrips.len() as u32), Some(commit.cantrip_max)),
                Some(Rejection::AtMaximum { .. }) => {
                    (Some(commit.spells.len() as u32), Some(commit.spell_max))
                }
                _ => (None, None),
            };
            let notification = PrepNotification {
                actor_id: actor.id.to_string(),
                class_id: commit.class.clone(),
                kind,
                details: PrepNotificationDetails {
                    actor_name: actor.name.clone(),
                    class_name: class_name.to_string(),
                    current,
                    max,
                    spells: changes.iter().map(|change| change.name.clone()).collect(),
                },
            };
            match self.notifications.notify_gm(notification).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    tracing::warn!(actor_id = %actor.id, class_id = %commit.class, error = %err, "GM notice failed")
                }
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ActorFlags;
    use crate::infrastructure::clock::SequenceRandom;
    use crate::infrastructure::memory::{InMemoryHost, PackSnapshot, WorldSnapshot};
    use crate::infrastructure::ports::{MockActorRepo, MockFlagRepo, PackInfo, PackKind};
    use spellbook_domain::{
        ActorItem, ItemId, OwnedSpell, PackId, PreparationMode, RuleSet, Spell, SpellLevel,
        SpellProgression, SpellProperty, SpellcastingClass,
    };
    use std::time::Duration;

    fn uuid(id: &str) -> SpellUuid {
        SpellUuid::new(format!("Compendium.dnd5e.spells.Item.{id}"))
    }

    fn owned(id: &str, class: &str, mode: PreparationMode, prepared: bool) -> ActorItem {
        ActorItem::Spell(OwnedSpell {
            id: ItemId::new(format!("item-{id}")),
            name: id.into(),
            level: SpellLevel::from(1),
            source_id: Some(uuid(id)),
            source_class: Some(ClassIdentifier::new(class)),
            preparation_mode: mode,
            prepared,
            source_item: None,
            ritual: false,
        })
    }

    fn wizard() -> SpellcastingClass {
        SpellcastingClass::new("wizard", "Wizard", 5).with_progression(SpellProgression::Full)
    }

    fn cleric() -> SpellcastingClass {
        SpellcastingClass::new("cleric", "Cleric", 5).with_progression(SpellProgression::Full)
    }

    fn pack() -> PackSnapshot {
        PackSnapshot {
            info: PackInfo {
                id: PackId::new("dnd5e.spells"),
                label: "Spells".into(),
                kind: PackKind::Item,
                package: "dnd5e".into(),
                folder: None,
            },
            spells: vec![
                Spell::new(uuid("r1"), "Detect Magic", 1).with_property(SpellProperty::Ritual),
                Spell::new(uuid("r2"), "Shield", 1),
                Spell::new(uuid("bless"), "Bless", 1),
            ],
            pages: vec![],
        }
    }

    fn pipeline(actors: Arc<dyn ActorRepo>, host: Arc<InMemoryHost>) -> CommitPipeline {
        let flags = Arc::new(ActorFlags::new(host.clone()));
        CommitPipeline::new(
            actors,
            Arc::new(Spells::new(host.clone(), Duration::from_secs(60))),
            Arc::new(LifecycleOps::new(flags, Arc::new(SequenceRandom::new()))),
            host,
        )
    }

    fn wizard_commit(rule_set: RuleSet) -> ClassCommit {
        ClassCommit {
            class: ClassIdentifier::new("wizard"),
            rules: ClassRules::defaults(rule_set, &wizard(), true),
            spells: [uuid("r2")].into_iter().collect(),
            cantrips: BTreeSet::new(),
            known: Some(vec![uuid("r1"), uuid("r2")]),
            swaps: vec![],
            flagged: vec![],
            spell_max: 8,
            cantrip_max: 4,
        }
    }

    #[tokio::test]
    async fn known_rituals_are_injected_then_removed() {
        let host = Arc::new(InMemoryHost::new(WorldSnapshot {
            actors: vec![Actor::new("w1", "Mialee")
                .with_class(wizard())
                .with_item(owned("r2", "wizard", PreparationMode::Prepared, true))],
            packs: vec![pack()],
            ..Default::default()
        }));
        let pipeline = pipeline(host.clone(), host.clone());
        let actor_id = ActorId::new("w1");
        let settings = SpellbookSettings::default();

        let modern = CommitRequest {
            actor_id: actor_id.clone(),
            enforcement: EnforcementBehavior::NotifyGm,
            classes: vec![wizard_commit(RuleSet::Modern)],
        };
        let report = pipeline.execute(&modern, &settings).await.unwrap();
        assert!(report.is_success());
        let actor = host.get(&actor_id).await.unwrap().unwrap();
        let wizard_id = ClassIdentifier::new("wizard");
        let r1 = actor.find_owned(&wizard_id, &uuid("r1")).unwrap();
        assert_eq!(r1.preparation_mode, PreparationMode::Ritual);
        assert!(!r1.prepared);
        let r2 = actor.find_owned(&wizard_id, &uuid("r2")).unwrap();
        assert_eq!(r2.preparation_mode, PreparationMode::Prepared);
        assert!(r2.prepared);

        let legacy = CommitRequest {
            classes: vec![wizard_commit(RuleSet::Legacy)],
            ..modern
        };
        pipeline.execute(&legacy, &settings).await.unwrap();
        let actor = host.get(&actor_id).await.unwrap().unwrap();
        assert!(actor.find_owned(&wizard_id, &uuid("r1")).is_none());
        assert!(actor.find_owned(&wizard_id, &uuid("r2")).is_some());
    }

    #[tokio::test]
    async fn failed_class_does_not_stop_others() {
        let host = Arc::new(InMemoryHost::new(WorldSnapshot {
            packs: vec![pack()],
            ..Default::default()
        }));
        let actor = Actor::new("m1", "Multi").with_class(wizard()).with_class(cleric());
        let mut actors = MockActorRepo::new();
        actors
            .expect_get()
            .returning(move |_| Ok(Some(actor.clone())));
        actors
            .expect_create_embedded()
            .withf(|_, docs| {
                docs.iter().any(|doc| {
                    matches!(doc, EmbeddedDocument::Spell(spell) if spell.source_class.as_str() == "cleric")
                })
            })
            .returning(|_, _| Err(RepoError::host("createEmbedded", "rejected by host")));
        actors
            .expect_create_embedded()
            .withf(|_, docs| {
                !docs.iter().any(|doc| {
                    matches!(doc, EmbeddedDocument::Spell(spell) if spell.source_class.as_str() == "cleric")
                })
            })
            .returning(|_, docs| Ok(docs.iter().map(|_| ItemId::new("new")).collect()));
        actors.expect_update_embedded().never();
        actors.expect_delete_embedded().never();

        let pipeline = pipeline(Arc::new(actors), host);
        let mut cleric_commit = wizard_commit(RuleSet::Legacy);
        cleric_commit.class = ClassIdentifier::new("cleric");
        cleric_commit.rules = ClassRules::defaults(RuleSet::Legacy, &cleric(), true);
        cleric_commit.spells = [uuid("bless")].into_iter().collect();
        cleric_commit.known = None;

        let report = pipeline
            .execute(
                &CommitRequest {
                    actor_id: ActorId::new("m1"),
                    enforcement: EnforcementBehavior::Enforced,
                    classes: vec![cleric_commit, wizard_commit(RuleSet::Legacy)],
                },
                &SpellbookSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(report.committed, vec![ClassIdentifier::new("wizard")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].class, ClassIdentifier::new("cleric"));
        assert_eq!(report.failed[0].stage, "create");
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn failed_swap_marker_does_not_stop_others() {
        let host = Arc::new(InMemoryHost::new(WorldSnapshot {
            actors: vec![Actor::new("m1", "Multi").with_class(wizard()).with_class(cleric())],
            packs: vec![pack()],
            ..Default::default()
        }));
        let mut flag_repo = MockFlagRepo::new();
        flag_repo.expect_get_flag().returning(|_, _, _| Ok(None));
        flag_repo
            .expect_set_flag()
            .withf(|_, _, _, value| value.get("cleric").is_some())
            .returning(|_, _, _, _| Err(RepoError::host("setFlag", "rejected by host")));
        flag_repo
            .expect_set_flag()
            .withf(|_, _, _, value| value.get("cleric").is_none())
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let flags = Arc::new(ActorFlags::new(Arc::new(flag_repo)));
        let pipeline = CommitPipeline::new(
            host.clone(),
            Arc::new(Spells::new(host.clone(), Duration::from_secs(60))),
            Arc::new(LifecycleOps::new(flags, Arc::new(SequenceRandom::new()))),
            host.clone(),
        );

        let rest = vec![(SwapKind::Spell, SwapWindow::OpenForLongRest("rest-1".into()))];
        let mut cleric_commit = wizard_commit(RuleSet::Legacy);
        cleric_commit.class = ClassIdentifier::new("cleric");
        cleric_commit.rules = ClassRules::defaults(RuleSet::Legacy, &cleric(), true);
        cleric_commit.spells = [uuid("bless")].into_iter().collect();
        cleric_commit.known = None;
        cleric_commit.swaps = rest.clone();
        let mut wizard = wizard_commit(RuleSet::Legacy);
        wizard.swaps = rest;

        let report = pipeline
            .execute(
                &CommitRequest {
                    actor_id: ActorId::new("m1"),
                    enforcement: EnforcementBehavior::Enforced,
                    classes: vec![cleric_commit, wizard],
                },
                &SpellbookSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(report.committed, vec![ClassIdentifier::new("wizard")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].class, ClassIdentifier::new("cleric"));
        assert_eq!(report.failed[0].stage, "swap-marker");
        // Cleric mutations still landed
        let actor = host.get(&ActorId::new("m1")).await.unwrap().unwrap();
        assert!(actor
            .find_owned(&ClassIdentifier::new("cleric"), &uuid("bless"))
            .is_some());
    }

    #[tokio::test]
    async fn notify_gm_sends_one_notice_per_kind() {
        let host = Arc::new(InMemoryHost::new(WorldSnapshot {
            actors: vec![Actor::new("c1", "Jozan").with_class(cleric())],
            packs: vec![pack()],
            ..Default::default()
        }));
        let pipeline = pipeline(host.clone(), host.clone());
        let mut commit = wizard_commit(RuleSet::Legacy);
        commit.class = ClassIdentifier::new("cleric");
        commit.rules = ClassRules::defaults(RuleSet::Legacy, &cleric(), true);
        commit.known = None;
        commit.spells = [uuid("bless"), uuid("r2")].into_iter().collect();
        commit.spell_max = 1;
        commit.flagged = vec![FlaggedChange {
            uuid: uuid("r2"),
            name: "Shield".into(),
            rejection: Rejection::AtMaximum {
                kind: SwapKind::Spell,
                current: 1,
                max: 1,
            },
        }];

        let report = pipeline
            .execute(
                &CommitRequest {
                    actor_id: ActorId::new("c1"),
                    enforcement: EnforcementBehavior::NotifyGm,
                    classes: vec![commit],
                },
                &SpellbookSettings::default(),
            )
            .await
            .unwrap();
        assert_eq!(report.notifications, 1);
        let sent = host.gm_notifications().await;
        assert_eq!(sent[0].kind, ViolationKind::Overmax);
        assert_eq!(sent[0].details.current, Some(2));
        assert_eq!(sent[0].details.max, Some(1));
        assert_eq!(sent[0].details.spells, vec!["Shield".to_string()]);
    }
}
