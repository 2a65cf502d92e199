//! Spellbook session - one actor's spellbook as the user edits it.
//!
//! The session holds the loaded context and the pending preparation state.
//! Toggles are checked against the class rules as they happen and only
//! reach the actor when the session is committed. Wizard copies, scroll
//! learning and loadout changes persist immediately.

mod context;
mod error;
mod view;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use spellbook_domain::{
    can_change_cantrip_status, can_change_spell_status, ActorId, CantripCheck, ClassIdentifier,
    ClassPending, CopyOptions, CopyOutcome, DomainError, ItemId, Loadout, LoadoutId,
    PendingState, Rejection, Spell, SpellCheck, SpellFilter, SpellUuid, SwapKind, Verdict,
};
use spellbook_shared::{Action, RenderPart, RenderRequest, UserNotice};

use crate::app::App;
use crate::use_cases::commit::{ClassCommit, CommitReport, CommitRequest, FlaggedChange};
use crate::use_cases::loadouts::LoadoutOps;
use crate::use_cases::scrolls::{ScrollError, ScrollUndo};
use crate::use_cases::wizard::WizardError;

pub use context::{ClassContext, Context};
pub use error::SpellbookError;
pub use view::{class_tab_id, level_name, wizardbook_tab_id};

use view::kind_of;

/// An open spellbook.
pub struct SpellbookState {
    app: Arc<App>,
    actor_id: ActorId,
    context: Context,
    pending: PendingState,
    /// Admitted rule violations, reported to the GM on commit
    flagged: BTreeMap<ClassIdentifier, Vec<FlaggedChange>>,
    filter: SpellFilter,
    active_tab: Option<String>,
    sidebar_collapsed: bool,
    collapsed_levels: BTreeSet<u8>,
    scroll_undo: Option<ScrollUndo>,
    notices: Vec<UserNotice>,
}

impl SpellbookState {
    /// Open the spellbook of `actor_id`.
    ///
    /// # Returns
    /// * `Ok(SpellbookState)` - Loaded with a fresh pending snapshot
    /// * `Err(SpellbookError::ActorNotFound)` - No such actor
    pub async fn open(app: Arc<App>, actor_id: ActorId) -> Result<Self, SpellbookError> {
        let mut context = Context::load(&app, &actor_id).await?;
        let pending = PendingState::open(&context.actor);
        let collapsed_levels = app
            .entities
            .flags
            .collapsed_levels()
            .await?
            .into_iter()
            .collect();
        let notices = std::mem::take(&mut context.notices);
        tracing::info!(
            actor_id = %actor_id,
            classes = context.classes.len(),
            rule_set = %context.rule_set,
            "Spellbook opened"
        );
        Ok(Self {
            app,
            actor_id,
            context,
            pending,
            flagged: BTreeMap::new(),
            filter: SpellFilter::default(),
            active_tab: None,
            sidebar_collapsed: false,
            collapsed_levels,
            scroll_undo: None,
            notices,
        })
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn pending(&self) -> &PendingState {
        &self.pending
    }

    /// Re-read everything from the host, dropping cached spellbooks and
    /// pack indexes first. Pending changes are kept.
    pub async fn reload(&mut self) -> Result<(), SpellbookError> {
        self.app.use_cases.wizard.invalidate(&self.actor_id).await;
        self.app.entities.spells.invalidate().await;
        self.refresh().await
    }

    /// Re-read the host after a change made through this session.
    async fn refresh(&mut self) -> Result<(), SpellbookError> {
        let context = Context::load(&self.app, &self.actor_id).await?;
        for class in context.classes.keys() {
            if self.pending.class(class).is_none() {
                self.pending.rebase_class(&context.actor, class);
            }
        }
        self.context = context;
        Ok(())
    }

    /// Mark a long rest and reload, opening the long-rest swap windows.
    pub async fn record_long_rest(&mut self) -> Result<(), SpellbookError> {
        self.app
            .use_cases
            .lifecycle
            .record_long_rest(&self.actor_id)
            .await?;
        self.refresh().await
    }

    // =========================================================================
    // Preparation
    // =========================================================================

    /// Check a toggle without applying it.
    pub fn evaluate(
        &self,
        class: &ClassIdentifier,
        uuid: &SpellUuid,
        checking: bool,
    ) -> Result<Verdict, SpellbookError> {
        let ctx = self.context.class(class)?;
        let doc = self.context.spell(uuid)?;
        Ok(self.verdict(ctx, doc, checking))
    }

    fn verdict(&self, ctx: &ClassContext, doc: &Spell, checking: bool) -> Verdict {
        let class = &ctx.class.identifier;
        let uuid = &doc.uuid;
        let mode = self
            .context
            .actor
            .find_owned(class, uuid)
            .map(|owned| owned.preparation_mode);
        let empty = ClassPending::default();
        let pending = self.pending.class(class).unwrap_or(&empty);

        let check = match kind_of(doc) {
            SwapKind::Cantrip => {
                let window = ctx.window(SwapKind::Cantrip);
                can_change_cantrip_status(&CantripCheck {
                    rules: &ctx.rules,
                    mode,
                    checking,
                    was_prepared: pending.was_prepared(SwapKind::Cantrip, uuid),
                    current_count: pending.count(SwapKind::Cantrip),
                    max_allowed: ctx.cantrip_max,
                    window: &window,
                    swaps_used: pending.swaps_used(SwapKind::Cantrip, Some(uuid)),
                    initial_selection: pending.initial_selection(SwapKind::Cantrip),
                })
            }
            SwapKind::Spell => {
                let window = ctx.window(SwapKind::Spell);
                can_change_spell_status(&SpellCheck {
                    rules: &ctx.rules,
                    mode,
                    checking,
                    was_prepared: pending.was_prepared(SwapKind::Spell, uuid),
                    current_prepared: pending.count(SwapKind::Spell),
                    max_prepared: ctx.spell_max,
                    window: &window,
                    swaps_used: pending.swaps_used(SwapKind::Spell, Some(uuid)),
                    initial_selection: pending.initial_selection(SwapKind::Spell),
                    in_spellbook: ctx.is_known(uuid),
                })
            }
        };
        Verdict::under(self.context.enforcement, check)
    }

    /// Shown and saved prepared state of a spell for a class.
    fn prepared_state(&self, class: &ClassIdentifier, doc: &Spell) -> (bool, bool) {
        let locked = self
            .context
            .actor
            .find_owned(class, &doc.uuid)
            .is_some_and(|owned| owned.preparation_mode.is_locked());
        if locked {
            return (true, true);
        }
        let kind = kind_of(doc);
        let pending = self.pending.class(class);
        (
            pending.is_some_and(|p| p.is_prepared(kind, &doc.uuid)),
            pending.is_some_and(|p| p.was_prepared(kind, &doc.uuid)),
        )
    }

    /// Check or uncheck a spell.
    ///
    /// # Returns
    /// * `Ok(Verdict::Rejected)` - Nothing changed; a notice says why
    /// * `Ok(Verdict::Flagged)` - Applied; the GM hears about it on commit
    /// * `Ok(Verdict::Allowed)` - Applied, or already in that state
    pub async fn toggle(
        &mut self,
        class: &ClassIdentifier,
        uuid: &SpellUuid,
        checked: bool,
    ) -> Result<Verdict, SpellbookError> {
        let (kind, name, current, verdict) = {
            let ctx = self.context.class(class)?;
            let doc = self.context.spell(uuid)?;
            let (current, _) = self.prepared_state(class, doc);
            (
                kind_of(doc),
                doc.name.clone(),
                current,
                self.verdict(ctx, doc, checked),
            )
        };
        if current == checked {
            return Ok(Verdict::Allowed);
        }

        match &verdict {
            Verdict::Rejected(rejection) => {
                tracing::debug!(actor_id = %self.actor_id, class_id = %class, uuid = %uuid, reason = %rejection, "Toggle rejected");
                self.notify(UserNotice::warn(format!("{name}: {rejection}")))
                    .await;
                return Ok(verdict);
            }
            Verdict::Flagged(rejection) => {
                self.notify(UserNotice::warn(format!(
                    "{name}: {rejection}. The GM will be notified."
                )))
                .await;
                let changes = self.flagged.entry(class.clone()).or_default();
                changes.retain(|change| &change.uuid != uuid);
                changes.push(FlaggedChange {
                    uuid: uuid.clone(),
                    name,
                    rejection: rejection.clone(),
                });
            }
            Verdict::Allowed => {}
        }

        if let Some(pending) = self.pending.class_mut(class) {
            pending.set(kind, uuid.clone(), checked);
        }
        Ok(verdict)
    }

    /// Drop every unsaved preparation change.
    pub fn reset(&mut self) {
        self.pending = PendingState::open(&self.context.actor);
        self.flagged.clear();
    }

    // =========================================================================
    // Wizard spellbook and scrolls
    // =========================================================================

    /// Copy a spell into a class's spellbook, using a free slot or a paid
    /// copy. A paid copy costs gold under `deductSpellLearningCost`.
    pub async fn learn_spell(
        &mut self,
        class: &ClassIdentifier,
        uuid: &SpellUuid,
        free: bool,
    ) -> Result<(), SpellbookError> {
        let rules = self.context.class(class)?.rules.clone();
        // Gold is only charged when the world deducts learning costs
        let options = if free {
            CopyOptions::free()
        } else {
            CopyOptions {
                pay_cost: self.context.settings.deduct_spell_learning_cost,
                ..CopyOptions::paid()
            }
        };
        let result = self
            .app
            .use_cases
            .wizard
            .copy_spell(
                &self.actor_id,
                class,
                &rules,
                uuid,
                options,
                &self.context.settings,
            )
            .await;
        match result {
            Ok(report) => {
                let notice = match report.outcome {
                    CopyOutcome::AlreadyKnown => {
                        UserNotice::info(format!("{} is already in the spellbook", report.spell.name))
                    }
                    CopyOutcome::Copied { gold_due, .. } if gold_due > 0 => UserNotice::info(
                        format!("Copied {} into the spellbook for {gold_due} gp", report.spell.name),
                    ),
                    CopyOutcome::Copied { .. } => {
                        UserNotice::info(format!("Copied {} into the spellbook", report.spell.name))
                    }
                };
                self.notify(notice).await;
            }
            Err(err) => match copy_refusal(&err) {
                Some(message) => {
                    self.notify(UserNotice::warn(message)).await;
                    return Ok(());
                }
                None => return Err(err.into()),
            },
        }
        self.refresh().await
    }

    /// Learn the spell of a scroll. The undo record is kept for
    /// [`Self::undo_scroll`].
    pub async fn learn_from_scroll(
        &mut self,
        class: &ClassIdentifier,
        scroll_id: &ItemId,
    ) -> Result<(), SpellbookError> {
        let rules = self.context.class(class)?.rules.clone();
        let result = self
            .app
            .use_cases
            .scrolls
            .learn(
                &self.actor_id,
                class,
                &rules,
                scroll_id,
                &self.context.settings,
            )
            .await;
        let learning = match result {
            Ok(Some(learning)) => learning,
            Ok(None) => return self.refresh().await,
            Err(ScrollError::Wizard(err)) => match copy_refusal(&err) {
                Some(message) => {
                    self.notify(UserNotice::warn(message)).await;
                    return Ok(());
                }
                None => return Err(ScrollError::Wizard(err).into()),
            },
            Err(err) => return Err(err.into()),
        };

        let name = learning.report.spell.name.clone();
        match learning.undo {
            Some(undo) => {
                self.scroll_undo = Some(undo);
                self.notify(UserNotice::info(format!("Learned {name} from the scroll")))
                    .await;
            }
            None => {
                self.notify(UserNotice::info(format!("{name} is already in the spellbook")))
                    .await;
            }
        }
        self.refresh().await
    }

    /// Revert the most recent scroll learning.
    pub async fn undo_scroll(&mut self) -> Result<(), SpellbookError> {
        let Some(undo) = self.scroll_undo.take() else {
            self.notify(UserNotice::info("Nothing to undo")).await;
            return Ok(());
        };
        let rules = self.context.class(&undo.class)?.rules.clone();
        self.app
            .use_cases
            .scrolls
            .undo(undo, &rules, &self.context.settings)
            .await?;
        self.notify(UserNotice::info("Scroll learning undone")).await;
        self.refresh().await
    }

    // =========================================================================
    // Loadouts
    // =========================================================================

    pub async fn loadouts(
        &self,
        class: Option<&ClassIdentifier>,
    ) -> Result<Vec<Loadout>, SpellbookError> {
        Ok(self
            .app
            .use_cases
            .loadouts
            .list(&self.actor_id, class)
            .await?)
    }

    /// Store the leveled spells currently shown as prepared.
    pub async fn save_loadout(
        &mut self,
        class: &ClassIdentifier,
        name: &str,
        description: &str,
    ) -> Result<Loadout, SpellbookError> {
        self.context.class(class)?;
        let spells: Vec<SpellUuid> = self
            .pending
            .class(class)
            .map(|pending| pending.effective(SwapKind::Spell).into_iter().collect())
            .unwrap_or_default();
        let loadout = self
            .app
            .use_cases
            .loadouts
            .save(&self.actor_id, class, name, description, spells)
            .await?;
        self.notify(UserNotice::info(format!("Saved loadout {}", loadout.name)))
            .await;
        Ok(loadout)
    }

    /// Make a loadout the pending preparation of its class.
    ///
    /// Swap windows do not apply; the prepared maximum does, under the
    /// enforcement behavior in force.
    pub async fn apply_loadout(&mut self, id: &LoadoutId) -> Result<Verdict, SpellbookError> {
        let loadout = self.app.use_cases.loadouts.get(&self.actor_id, id).await?;
        let class = loadout.class_identifier.clone();
        let (target, max) = {
            let ctx = self.context.class(&class)?;
            (
                LoadoutOps::apply_target(&loadout, &self.context.actor, ctx.known()),
                ctx.spell_max,
            )
        };

        let count = target.len() as u32;
        let verdict = if count > max {
            Verdict::under(
                self.context.enforcement,
                Err(Rejection::AtMaximum {
                    kind: SwapKind::Spell,
                    current: count,
                    max,
                }),
            )
        } else {
            Verdict::Allowed
        };
        match &verdict {
            Verdict::Rejected(rejection) => {
                self.notify(UserNotice::warn(format!("{}: {rejection}", loadout.name)))
                    .await;
                return Ok(verdict);
            }
            Verdict::Flagged(rejection) => {
                self.notify(UserNotice::warn(format!(
                    "{}: {rejection}. The GM will be notified.",
                    loadout.name
                )))
                .await;
                let changes = self.flagged.entry(class.clone()).or_default();
                for uuid in &target {
                    if changes.iter().any(|change| &change.uuid == uuid) {
                        continue;
                    }
                    let name = self
                        .context
                        .docs
                        .get(uuid)
                        .map_or_else(|| uuid.to_string(), |doc| doc.name.clone());
                    changes.push(FlaggedChange {
                        uuid: uuid.clone(),
                        name,
                        rejection: rejection.clone(),
                    });
                }
            }
            Verdict::Allowed => {}
        }

        if let Some(pending) = self.pending.class_mut(&class) {
            pending.replace_spells(&target);
        }
        tracing::info!(
            actor_id = %self.actor_id,
            class_id = %class,
            loadout_id = %id,
            spells = count,
            "Loadout applied"
        );
        self.notify(UserNotice::info(format!("Applied loadout {}", loadout.name)))
            .await;
        Ok(verdict)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Write the pending preparation to the actor.
    ///
    /// Classes fail independently; those that committed are re-snapshotted,
    /// the others keep their pending changes.
    pub async fn commit(&mut self) -> Result<CommitReport, SpellbookError> {
        self.refresh().await?;

        let mut classes = Vec::new();
        for (class, pending) in self.pending.classes() {
            let Some(ctx) = self.context.classes.get(class) else {
                continue;
            };
            let mut swaps = Vec::new();
            for kind in [SwapKind::Cantrip, SwapKind::Spell] {
                let window = ctx.window(kind);
                if pending.swaps_used(kind, None) > 0
                    && !pending.initial_selection(kind)
                    && window.is_open()
                {
                    swaps.push((kind, window));
                }
            }
            let flagged = self
                .flagged
                .get(class)
                .map(|changes| {
                    changes
                        .iter()
                        .filter(|change| still_pending(pending, &change.uuid))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            classes.push(ClassCommit {
                class: class.clone(),
                rules: ctx.rules.clone(),
                spells: pending.effective(SwapKind::Spell),
                cantrips: pending.effective(SwapKind::Cantrip),
                known: ctx.known().map(<[SpellUuid]>::to_vec),
                swaps,
                flagged,
                spell_max: ctx.spell_max,
                cantrip_max: ctx.cantrip_max,
            });
        }

        let request = CommitRequest {
            actor_id: self.actor_id.clone(),
            enforcement: self.context.enforcement,
            classes,
        };
        let report = self
            .app
            .use_cases
            .commit
            .execute(&request, &self.context.settings)
            .await?;

        self.refresh().await?;
        for class in &report.committed {
            self.pending.rebase_class(&self.context.actor, class);
            self.flagged.remove(class);
        }

        if report.is_success() {
            self.notify(UserNotice::info("Spellbook saved")).await;
        } else {
            let failed: Vec<String> = report
                .failed
                .iter()
                .map(|failure| failure.class.to_string())
                .collect();
            self.notify(UserNotice::error(format!(
                "Could not save {}",
                failed.join(", ")
            )))
            .await;
        }
        Ok(report)
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Handle one UI action and say what needs re-rendering.
    pub async fn dispatch(&mut self, action: Action) -> Result<RenderRequest, SpellbookError> {
        self.notices.clear();
        let render = match action {
            Action::ToggleSidebar => {
                self.sidebar_collapsed = !self.sidebar_collapsed;
                RenderRequest::parts([RenderPart::Sidebar])
            }
            Action::SelectTab { tab } => {
                self.active_tab = Some(tab);
                RenderRequest::parts([RenderPart::Tabs, RenderPart::SpellList, RenderPart::Footer])
            }
            Action::FilterSpells { filter } => {
                self.filter = filter;
                RenderRequest::parts([RenderPart::SpellList])
            }
            Action::ToggleLevel { level } => {
                if !self.collapsed_levels.remove(&level) {
                    self.collapsed_levels.insert(level);
                }
                let levels: Vec<u8> = self.collapsed_levels.iter().copied().collect();
                self.app
                    .entities
                    .flags
                    .set_collapsed_levels(&levels)
                    .await?;
                RenderRequest::parts([RenderPart::SpellList])
            }
            Action::TogglePrepare {
                class_identifier,
                uuid,
                checked,
            } => {
                self.toggle(&class_identifier, &uuid, checked).await?;
                RenderRequest::parts([RenderPart::SpellList, RenderPart::Footer])
            }
            Action::LearnSpell {
                class_identifier,
                uuid,
                free,
            } => {
                self.learn_spell(&class_identifier, &uuid, free).await?;
                RenderRequest::full()
            }
            Action::LearnFromScroll {
                class_identifier,
                scroll_item_id,
            } => {
                self.learn_from_scroll(&class_identifier, &scroll_item_id)
                    .await?;
                RenderRequest::full()
            }
            Action::UndoScrollLearning => {
                self.undo_scroll().await?;
                RenderRequest::full()
            }
            Action::SaveLoadout {
                class_identifier,
                name,
                description,
            } => {
                self.save_loadout(&class_identifier, &name, &description)
                    .await?;
                RenderRequest::parts([RenderPart::Footer])
            }
            Action::ApplyLoadout { id } => {
                self.apply_loadout(&id).await?;
                RenderRequest::parts([RenderPart::SpellList, RenderPart::Footer])
            }
            Action::RenameLoadout { id, name } => {
                self.app
                    .use_cases
                    .loadouts
                    .rename(&self.actor_id, &id, &name)
                    .await?;
                RenderRequest::parts([RenderPart::Footer])
            }
            Action::DeleteLoadout { id } => {
                self.app
                    .use_cases
                    .loadouts
                    .delete(&self.actor_id, &id)
                    .await?;
                RenderRequest::parts([RenderPart::Footer])
            }
            Action::Reset => {
                self.reset();
                RenderRequest::parts([RenderPart::SpellList, RenderPart::Footer])
            }
            Action::Refresh => {
                self.reload().await?;
                RenderRequest::full()
            }
        };
        Ok(render)
    }

    async fn notify(&mut self, notice: UserNotice) {
        self.app
            .repositories
            .notifications
            .user_notify(notice.clone())
            .await;
        self.notices.push(notice);
    }
}

fn still_pending(pending: &ClassPending, uuid: &SpellUuid) -> bool {
    [&pending.spells, &pending.cantrips]
        .iter()
        .any(|delta| delta.added.contains(uuid) || delta.removed.contains(uuid))
}

/// User-facing reason a copy was refused, for refusals that are not faults.
fn copy_refusal(err: &WizardError) -> Option<String> {
    if let Some((needed, available)) = err.insufficient_gold() {
        return Some(format!(
            "Not enough gold: copying costs {needed} gp, you have {available} gp"
        ));
    }
    match err {
        WizardError::Validation(
            err @ (DomainError::NoFreeSlots(_)
            | DomainError::NoSpellbook(_)
            | DomainError::CantripNotCopyable(_)),
        ) => Some(err.to_string()),
        _ => None,
    }
}
