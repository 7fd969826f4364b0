//! Identity → running effect bookkeeping.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::instance::Instance;
use crate::effect::EffectId;

/// Summary of one running effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightEffect {
    /// Identity the effect was registered under, `None` when anonymous.
    pub id: Option<EffectId>,
    /// Debug rendering of the action whose reduction started it.
    pub started_by: String,
}

/// Every running instance, plus the identity index used for exclusivity.
///
/// At most one instance is indexed per identity. Instances stay in
/// `running` until their work is dropped, so cancelled instances that have
/// not yet observed the cancellation are still tracked.
#[derive(Default)]
pub(crate) struct EffectRegistry {
    next_serial: u64,
    running: BTreeMap<u64, Arc<Instance>>,
    by_id: HashMap<EffectId, u64>,
}

impl EffectRegistry {
    /// Registers a new instance. Returns it together with the instance it
    /// displaced under the same identity, which the caller must cancel.
    pub(crate) fn start(
        &mut self,
        id: Option<EffectId>,
        parent: Option<Arc<Instance>>,
        started_by: String,
    ) -> (Arc<Instance>, Option<Arc<Instance>>) {
        let serial = self.next_serial;
        self.next_serial += 1;

        let instance = Arc::new(Instance::new(serial, id.clone(), parent, started_by));
        let prior = id
            .and_then(|id| self.by_id.insert(id, serial))
            .and_then(|prior| self.running.get(&prior).cloned());
        self.running.insert(serial, Arc::clone(&instance));
        (instance, prior)
    }

    /// Unindexes `id` and returns its instance for cancellation.
    pub(crate) fn cancel(&mut self, id: &EffectId) -> Option<Arc<Instance>> {
        let serial = self.by_id.remove(id)?;
        self.running.get(&serial).cloned()
    }

    pub(crate) fn cancel_all(&mut self) -> Vec<Arc<Instance>> {
        self.by_id.clear();
        self.running.values().cloned().collect()
    }

    /// Forgets `instance` once its work has been dropped.
    pub(crate) fn complete(&mut self, instance: &Instance) {
        self.running.remove(&instance.serial());
        if let Some(id) = instance.id() {
            if self.by_id.get(id) == Some(&instance.serial()) {
                self.by_id.remove(id);
            }
        }
    }

    /// Running instances that have not been cancelled, oldest first.
    pub(crate) fn in_flight(&self) -> Vec<InFlightEffect> {
        self.running
            .values()
            .filter(|instance| !instance.is_cancelled())
            .map(|instance| InFlightEffect {
                id: instance.id().cloned(),
                started_by: instance.started_by().to_string(),
            })
            .collect()
    }

    pub(crate) fn in_flight_count(&self) -> usize {
        self.running
            .values()
            .filter(|instance| !instance.is_cancelled())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_identity_displaces_prior_instance() {
        let mut registry = EffectRegistry::default();
        let (first, prior) = registry.start(Some("search".into()), None, "Query(a)".into());
        assert!(prior.is_none());

        let (second, prior) = registry.start(Some("search".into()), None, "Query(ab)".into());
        let prior = prior.unwrap();
        assert_eq!(prior.serial(), first.serial());
        assert!(prior.cancel());

        assert_eq!(registry.in_flight().len(), 1);
        assert_eq!(registry.in_flight()[0].started_by, "Query(ab)");

        // The displaced instance finishing late must not unindex its successor.
        registry.complete(&first);
        assert_eq!(
            registry.cancel(&"search".into()).map(|i| i.serial()),
            Some(second.serial())
        );
    }

    #[test]
    fn complete_removes_every_trace() {
        let mut registry = EffectRegistry::default();
        let (instance, _) = registry.start(Some("timer".into()), None, "Start".into());
        registry.complete(&instance);
        assert_eq!(registry.in_flight_count(), 0);
        assert!(registry.cancel(&"timer".into()).is_none());
    }

    #[test]
    fn cancelled_instances_are_not_in_flight() {
        let mut registry = EffectRegistry::default();
        let (anonymous, _) = registry.start(None, None, "Load".into());
        registry.start(Some("timer".into()), None, "Start".into());

        anonymous.cancel();
        let in_flight = registry.in_flight();
        assert_eq!(in_flight.len(), 1);
        assert_eq!(in_flight[0].id, Some(EffectId::from("timer")));

        for instance in registry.cancel_all() {
            instance.cancel();
        }
        assert_eq!(registry.in_flight_count(), 0);
    }
}
