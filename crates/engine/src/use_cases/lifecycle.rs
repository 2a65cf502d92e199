//! Class lifecycle: level-up baselines, long rests and consumed swap windows.

use std::collections::BTreeMap;
use std::sync::Arc;

use spellbook_domain::{
    Actor, ActorId, ClassIdentifier, Lifecycle, SwapKind, SwapTracking, SwapWindow,
};

use crate::entities::ActorFlags;
use crate::infrastructure::ports::{RandomPort, RepoError};

/// Lifecycle facts and consumed markers of one class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLifecycle {
    pub lifecycle: Lifecycle,
    pub tracking: SwapTracking,
}

/// Lifecycle operations.
pub struct LifecycleOps {
    flags: Arc<ActorFlags>,
    random: Arc<dyn RandomPort>,
}

impl LifecycleOps {
    pub fn new(flags: Arc<ActorFlags>, random: Arc<dyn RandomPort>) -> Self {
        Self { flags, random }
    }

    /// Read lifecycle state for every spellcasting class.
    ///
    /// A class seen for the first time has its current level stored as the
    /// baseline, so a level-up window only opens for levels gained later.
    pub async fn load(
        &self,
        actor: &Actor,
    ) -> Result<BTreeMap<ClassIdentifier, ClassLifecycle>, RepoError> {
        let mut baselines = self.flags.class_level_baselines(&actor.id).await?;
        let mut recorded = false;
        for class in actor.spellcasting_classes() {
            if !baselines.contains_key(class.identifier.as_str()) {
                baselines.insert(class.identifier.to_string(), class.level);
                recorded = true;
                tracing::debug!(
                    actor_id = %actor.id,
                    class_id = %class.identifier,
                    level = class.level,
                    "Recorded class level baseline"
                );
            }
        }
        if recorded {
            self.flags
                .set_class_level_baselines(&actor.id, &baselines)
                .await?;
        }

        let long_rest = self.flags.long_rest(&actor.id).await?;
        let mut classes = BTreeMap::new();
        for class in actor.spellcasting_classes() {
            let tracking = self.flags.swap_tracking(&actor.id, &class.identifier).await?;
            classes.insert(
                class.identifier.clone(),
                ClassLifecycle {
                    lifecycle: Lifecycle {
                        class_level: class.level,
                        baseline_level: baselines.get(class.identifier.as_str()).copied(),
                        long_rest: long_rest.clone(),
                    },
                    tracking,
                },
            );
        }
        Ok(classes)
    }

    /// Mark a long rest as completed. Opens a fresh long-rest window for
    /// every class.
    ///
    /// # Returns
    /// * `Ok(String)` - Id of the new rest
    pub async fn record_long_rest(&self, actor: &ActorId) -> Result<String, RepoError> {
        let rest_id = self.random.gen_uuid().to_string();
        self.flags.set_long_rest(actor, &rest_id).await?;
        tracing::info!(actor_id = %actor, rest_id = %rest_id, "Long rest recorded");
        Ok(rest_id)
    }

    /// Record that a swap used `window`.
    ///
    /// # Returns
    /// * `Ok(true)` - A new marker was written
    /// * `Ok(false)` - The window was closed or already consumed
    pub async fn consume(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
        kind: SwapKind,
        window: &SwapWindow,
    ) -> Result<bool, RepoError> {
        let mut tracking = self.flags.swap_tracking(actor, class).await?;
        if !tracking.consume(kind, window) {
            return Ok(false);
        }
        self.flags.set_swap_tracking(actor, class, &tracking).await?;
        tracing::info!(
            actor_id = %actor,
            class_id = %class,
            kind = %kind,
            window = ?window,
            "Swap window consumed"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SequenceRandom;
    use crate::infrastructure::memory::{InMemoryHost, WorldSnapshot};
    use spellbook_domain::{SpellProgression, SpellcastingClass, SwapMode};

    fn actor(level: u8) -> Actor {
        Actor::new("actor1", "Mialee").with_class(
            SpellcastingClass::new("wizard", "Wizard", level)
                .with_progression(SpellProgression::Full),
        )
    }

    fn ops(host: Arc<InMemoryHost>) -> LifecycleOps {
        LifecycleOps::new(
            Arc::new(ActorFlags::new(host)),
            Arc::new(SequenceRandom::new()),
        )
    }

    fn host() -> Arc<InMemoryHost> {
        Arc::new(InMemoryHost::new(WorldSnapshot {
            actors: vec![actor(4)],
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn first_detection_records_baseline() {
        let ops = ops(host());
        let wizard = ClassIdentifier::new("wizard");

        let classes = ops.load(&actor(4)).await.unwrap();
        assert_eq!(classes[&wizard].lifecycle.baseline_level, Some(4));
        assert!(!classes[&wizard].lifecycle.is_level_up());

        // Gaining a level later opens the level-up window
        let classes = ops.load(&actor(5)).await.unwrap();
        let life = &classes[&wizard];
        assert_eq!(life.lifecycle.level_up(), Some(5));
        assert_eq!(
            life.tracking
                .window(SwapKind::Cantrip, SwapMode::LevelUp, &life.lifecycle),
            SwapWindow::OpenForLevelUp(5)
        );
    }

    #[tokio::test]
    async fn long_rest_opens_window_until_consumed() {
        let ops = ops(host());
        let wizard = ClassIdentifier::new("wizard");
        let actor_id = ActorId::new("actor1");

        let rest = ops.record_long_rest(&actor_id).await.unwrap();
        let classes = ops.load(&actor(4)).await.unwrap();
        let life = &classes[&wizard];
        let window = life
            .tracking
            .window(SwapKind::Spell, SwapMode::LongRest, &life.lifecycle);
        assert_eq!(window, SwapWindow::OpenForLongRest(rest));

        assert!(ops
            .consume(&actor_id, &wizard, SwapKind::Spell, &window)
            .await
            .unwrap());
        assert!(!ops
            .consume(&actor_id, &wizard, SwapKind::Spell, &window)
            .await
            .unwrap());

        let classes = ops.load(&actor(4)).await.unwrap();
        let life = &classes[&wizard];
        assert_eq!(
            life.tracking
                .window(SwapKind::Spell, SwapMode::LongRest, &life.lifecycle),
            SwapWindow::Closed
        );
    }
}
