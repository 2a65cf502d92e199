//! Everything a spellbook session reads from the host, loaded in one pass.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use spellbook_domain::{
    Actor, ActorId, ClassIdentifier, ClassRules, EnforcementBehavior, RuleSet, Spell,
    SpellUuid, SpellcastingClass, SwapKind, SwapWindow, WizardSpellbook,
};
use spellbook_shared::{LearnableScroll, UserNotice};

use crate::app::App;
use crate::infrastructure::app_settings::SpellbookSettings;
use crate::use_cases::lifecycle::ClassLifecycle;
use crate::use_cases::spell_list::ResolvedList;

use super::SpellbookError;

/// Per-class inputs of the projection.
#[derive(Debug, Clone)]
pub struct ClassContext {
    pub class: SpellcastingClass,
    pub rules: ClassRules,
    pub lifecycle: ClassLifecycle,
    pub book: Option<WizardSpellbook>,
    /// What the class tab offers
    pub list: ResolvedList,
    /// The full class list, for classes that copy spells from it
    pub learnable: Option<Arc<ResolvedList>>,
    pub spell_max: u32,
    pub cantrip_max: u32,
}

impl ClassContext {
    pub fn window(&self, kind: SwapKind) -> SwapWindow {
        let mode = match kind {
            SwapKind::Cantrip => self.rules.cantrip_swapping,
            SwapKind::Spell => self.rules.spell_swapping,
        };
        self.lifecycle
            .tracking
            .window(kind, mode, &self.lifecycle.lifecycle)
    }

    pub fn known(&self) -> Option<&[SpellUuid]> {
        self.book.as_ref().map(WizardSpellbook::known_spells)
    }

    pub fn is_known(&self, uuid: &SpellUuid) -> Option<bool> {
        self.book.as_ref().map(|book| book.is_known(uuid))
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    pub actor: Actor,
    pub settings: SpellbookSettings,
    pub rule_set: RuleSet,
    pub enforcement: EnforcementBehavior,
    pub classes: BTreeMap<ClassIdentifier, ClassContext>,
    pub docs: BTreeMap<SpellUuid, Spell>,
    pub scrolls: Vec<LearnableScroll>,
    /// Raised while loading, shown once
    pub notices: Vec<UserNotice>,
}

impl Context {
    /// Read actor, rules, lifecycle, spellbooks and lists, then fetch every
    /// spell document the tabs need.
    pub async fn load(app: &App, actor_id: &ActorId) -> Result<Self, SpellbookError> {
        let settings = app.entities.settings.load().await?;
        let actor = app
            .repositories
            .actor
            .get(actor_id)
            .await?
            .ok_or_else(|| SpellbookError::ActorNotFound(actor_id.clone()))?;

        let rules = app.use_cases.rules.resolve.execute(&actor, &settings).await?;
        let mut lifecycles = app.use_cases.lifecycle.load(&actor).await?;
        let scale_keys = settings.cantrip_scale_keys();

        let mut notices = Vec::new();
        let mut wanted: BTreeSet<SpellUuid> = actor
            .spells()
            .filter_map(|spell| spell.source_id.clone())
            .collect();
        let mut classes = BTreeMap::new();
        for class in actor.spellcasting_classes() {
            let Some(class_rules) = rules.class(&class.identifier).cloned() else {
                continue;
            };
            let book = if class_rules.uses_spellbook() {
                Some(
                    app.use_cases
                        .wizard
                        .load(&actor, &class.identifier, &class_rules, &settings)
                        .await?,
                )
            } else {
                None
            };
            let list = app
                .use_cases
                .spell_lists
                .resolve(
                    class,
                    &class_rules,
                    book.as_ref().map(WizardSpellbook::known_spells),
                    &settings,
                )
                .await?;
            let learnable = match book {
                Some(_) => Some(
                    app.use_cases
                        .spell_lists
                        .class_list(class, &class_rules, &settings)
                        .await?,
                ),
                None => None,
            };

            let no_list = learnable.as_ref().map_or(list.is_empty(), |l| l.is_empty());
            if no_list {
                notices.push(UserNotice::warn(format!(
                    "No spell list found for {}",
                    class.name
                )));
            }

            wanted.extend(list.spells.iter().cloned());
            if let Some(learnable) = &learnable {
                wanted.extend(learnable.spells.iter().cloned());
            }

            let spell_max = class_rules.max_prepared(class.max_prepared);
            let cantrip_max = class_rules.max_cantrips(class.scale_value(&scale_keys).unwrap_or(0));
            classes.insert(
                class.identifier.clone(),
                ClassContext {
                    class: class.clone(),
                    rules: class_rules,
                    lifecycle: lifecycles.remove(&class.identifier).unwrap_or_default(),
                    book,
                    list,
                    learnable,
                    spell_max,
                    cantrip_max,
                },
            );
        }

        let fetched = app
            .entities
            .spells
            .fetch_many(wanted, settings.fetch_gate())
            .await;
        let scrolls = app.use_cases.scrolls.scan(&actor, &rules, &settings).await?;
        tracing::debug!(
            actor_id = %actor.id,
            classes = classes.len(),
            spells = fetched.spells.len(),
            unresolved = fetched.unresolved.len(),
            "Spellbook context loaded"
        );

        Ok(Self {
            actor,
            settings,
            rule_set: rules.rule_set,
            enforcement: rules.enforcement,
            classes,
            docs: fetched.spells,
            scrolls,
            notices,
        })
    }

    pub fn class(&self, class: &ClassIdentifier) -> Result<&ClassContext, SpellbookError> {
        self.classes
            .get(class)
            .ok_or_else(|| SpellbookError::ClassNotFound(class.clone()))
    }

    pub fn spell(&self, uuid: &SpellUuid) -> Result<&Spell, SpellbookError> {
        self.docs
            .get(uuid)
            .ok_or_else(|| SpellbookError::SpellNotFound(uuid.clone()))
    }
}
