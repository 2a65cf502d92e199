//! Application state and composition.

use std::sync::Arc;

use crate::entities::{ActorFlags, Settings, Spells};
use crate::infrastructure::{
    app_settings::SpellbookSettings,
    clock::{SystemClock, SystemRandom},
    memory::InMemoryHost,
    ports::{
        ActorRepo, ClockPort, CompendiumRepo, FlagRepo, NotificationPort, RandomPort, RepoError,
        SettingsRepo,
    },
};
use crate::use_cases::{
    commit::CommitPipeline,
    lifecycle::LifecycleOps,
    loadouts::LoadoutOps,
    rules::{ConfigureRules, ResolveClassRules, RulesUseCases},
    scrolls::ScrollOps,
    spell_list::SpellListOps,
    wizard::WizardBooks,
};

/// Main application state.
///
/// Holds the host ports, the entity modules over them and all use cases.
/// Shared by every spellbook session as `Arc<App>`.
pub struct App {
    pub repositories: Repositories,
    pub entities: Entities,
    pub use_cases: UseCases,
}

/// Host ports, injected as trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub actor: Arc<dyn ActorRepo>,
    pub flag: Arc<dyn FlagRepo>,
    pub settings: Arc<dyn SettingsRepo>,
    pub compendium: Arc<dyn CompendiumRepo>,
    pub notifications: Arc<dyn NotificationPort>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
}

impl Repositories {
    /// Every port served by one in-memory host, with the system clock.
    pub fn in_memory(host: Arc<InMemoryHost>) -> Self {
        Self {
            actor: host.clone(),
            flag: host.clone(),
            settings: host.clone(),
            compendium: host.clone(),
            notifications: host,
            clock: Arc::new(SystemClock::new()),
            random: Arc::new(SystemRandom::new()),
        }
    }
}

/// Typed access over the ports.
pub struct Entities {
    pub flags: Arc<ActorFlags>,
    pub settings: Arc<Settings>,
    pub spells: Arc<Spells>,
}

/// Container for all use cases.
pub struct UseCases {
    pub rules: RulesUseCases,
    pub lifecycle: Arc<LifecycleOps>,
    pub spell_lists: Arc<SpellListOps>,
    pub wizard: Arc<WizardBooks>,
    pub scrolls: Arc<ScrollOps>,
    pub loadouts: Arc<LoadoutOps>,
    pub commit: Arc<CommitPipeline>,
}

impl App {
    /// Wire up every use case.
    ///
    /// `settings` only sizes the caches; sessions re-read settings on open.
    pub fn new(repos: Repositories, settings: &SpellbookSettings) -> Self {
        let ttl = settings.spell_list_cache_ttl();

        let flags = Arc::new(ActorFlags::new(repos.flag.clone()));
        let settings_entity = Arc::new(Settings::new(repos.settings.clone()));
        let spells = Arc::new(Spells::new(repos.compendium.clone(), ttl));

        let spell_lists = Arc::new(SpellListOps::new(repos.compendium.clone(), ttl));
        let rules = RulesUseCases::new(
            Arc::new(ResolveClassRules::new(flags.clone())),
            Arc::new(ConfigureRules::new(flags.clone(), spell_lists.clone())),
        );
        let lifecycle = Arc::new(LifecycleOps::new(flags.clone(), repos.random.clone()));
        let wizard = Arc::new(WizardBooks::new(
            repos.actor.clone(),
            flags.clone(),
            spells.clone(),
            repos.clock.clone(),
        ));
        let scrolls = Arc::new(ScrollOps::new(
            repos.actor.clone(),
            wizard.clone(),
            spells.clone(),
        ));
        let loadouts = Arc::new(LoadoutOps::new(
            flags.clone(),
            repos.clock.clone(),
            repos.random.clone(),
        ));
        let commit = Arc::new(CommitPipeline::new(
            repos.actor.clone(),
            spells.clone(),
            lifecycle.clone(),
            repos.notifications.clone(),
        ));

        Self {
            repositories: repos,
            entities: Entities {
                flags,
                settings: settings_entity,
                spells,
            },
            use_cases: UseCases {
                rules,
                lifecycle,
                spell_lists,
                wizard,
                scrolls,
                loadouts,
                commit,
            },
        }
    }

    /// Read settings through the settings port, then wire up.
    pub async fn bootstrap(repos: Repositories) -> Result<Self, RepoError> {
        let settings = Settings::new(repos.settings.clone()).load().await?;
        tracing::debug!(
            rule_set = %settings.spellcasting_rule_set,
            cache_ttl_secs = settings.spell_list_cache_ttl_secs,
            "Settings loaded"
        );
        Ok(Self::new(repos, &settings))
    }

    pub async fn in_memory(host: Arc<InMemoryHost>) -> Result<Self, RepoError> {
        Self::bootstrap(Repositories::in_memory(host)).await
    }
}
