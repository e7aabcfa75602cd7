use std::collections::BTreeMap;

use log::{info, warn};

use crate::error::ThreadError;
use crate::host::{ActorWorld, Host, ThreadKey};
use crate::instance::{CreateRequest, Instance, ThreadRuntime};
use crate::settings::EngineSettings;

/// Live thread instances for one host session, keyed by owning key.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: BTreeMap<ThreadKey, Instance>,
    events: Vec<String>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        request: CreateRequest,
        host: &mut Host<'_>,
        settings: &EngineSettings,
    ) -> Result<(), ThreadError> {
        let key = request.key;
        if self.instances.contains_key(&key) {
            let err = ThreadError::AlreadyExists(key);
            warn!("{err}");
            self.events.push(format!("thread.create {key} rejected: exists"));
            return Err(err);
        }

        let instance = match Instance::build(request, host, settings) {
            Ok(instance) => instance,
            Err(err) => {
                warn!("thread {key}: {err}");
                self.events.push(format!("thread.create {key} failed: {err}"));
                return Err(err);
            }
        };
        let center = instance.center().anchor;
        self.instances.insert(key, instance);
        self.events.push(match center {
            Some(anchor) => format!("thread.create {key} anchor {anchor}"),
            None => format!("thread.create {key}"),
        });

        if settings.open_menu_on_create && !host.menu.is_open() {
            host.menu.show(key);
            self.events.push(format!("thread.{key}.menu open"));
        }
        Ok(())
    }

    pub fn lookup(&self, key: ThreadKey) -> Option<&Instance> {
        self.instances.get(&key)
    }

    pub fn lookup_mut(&mut self, key: ThreadKey) -> Option<&mut Instance> {
        self.instances.get_mut(&key)
    }

    pub fn contains(&self, key: ThreadKey) -> bool {
        self.instances.contains_key(&key)
    }

    /// Drop the instance owned by `key`. Returns whether one existed.
    pub fn destroy(&mut self, key: ThreadKey) -> bool {
        let removed = self.instances.remove(&key).is_some();
        if removed {
            self.events.push(format!("thread.destroy {key}"));
        }
        removed
    }

    /// Drop every instance whose owning key the world no longer recognises.
    pub fn prune(&mut self, world: &dyn ActorWorld) -> Vec<ThreadKey> {
        let stale: Vec<ThreadKey> = self
            .instances
            .keys()
            .copied()
            .filter(|key| !world.is_valid_key(*key))
            .collect();
        for key in &stale {
            self.instances.remove(key);
            info!("thread {key}: owner is gone, dropping instance");
            self.events.push(format!("thread.prune {key}"));
        }
        stale
    }

    pub fn clear(&mut self) {
        if !self.instances.is_empty() {
            self.events
                .push(format!("thread.clear {}", self.instances.len()));
        }
        self.instances.clear();
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ThreadKey> + '_ {
        self.instances.keys().copied()
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    pub fn runtime<'a, 'h>(
        &'a mut self,
        key: ThreadKey,
        host: &'a mut Host<'h>,
        settings: &'a EngineSettings,
    ) -> Option<ThreadRuntime<'a, 'h>> {
        let instance = self.instances.get_mut(&key)?;
        Some(ThreadRuntime::new(instance, host, settings, &mut self.events))
    }
}
