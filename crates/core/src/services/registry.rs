use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;

use crate::axis::LinearAxis;
use crate::models::traits::{LayerHandle, LayerRegistry};

/// In-process registry keeping a copy of every staged layer.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    next: AtomicU64,
    layers: Mutex<HashMap<LayerHandle, (String, LinearAxis)>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the layers currently registered.
    pub fn names(&self) -> Vec<String> {
        match self.layers.lock() {
            Ok(layers) => layers.values().map(|(name, _)| name.clone()).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .values()
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LayerRegistry for MemoryRegistry {
    fn register(&self, name: &str, axis: &LinearAxis) -> LayerHandle {
        let handle = LayerHandle(self.next.fetch_add(1, Ordering::Relaxed));
        let mut layers = self.layers.lock().unwrap_or_else(|p| p.into_inner());
        layers.insert(handle, (name.to_string(), axis.clone()));
        log::debug!("Registered layer '{}' as {:?}", name, handle);
        handle
    }

    fn unregister(&self, handle: LayerHandle) {
        let mut layers = self.layers.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((name, _)) = layers.remove(&handle) {
            log::debug!("Unregistered layer '{}'", name);
        }
    }
}

/// Registry for hosts with nothing to hand layers off to.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRegistry;

impl LayerRegistry for NullRegistry {
    fn register(&self, _name: &str, _axis: &LinearAxis) -> LayerHandle {
        LayerHandle(0)
    }

    fn unregister(&self, _handle: LayerHandle) {}
}

/// A layer registered for the lifetime of this guard.
///
/// Dropping the guard unregisters the layer, so an intermediate layer is
/// released on every exit path of the stage that created it.
pub struct StagedLayer<'r> {
    registry: &'r dyn LayerRegistry,
    handle: Option<LayerHandle>,
}

impl<'r> StagedLayer<'r> {
    pub fn stage(registry: &'r dyn LayerRegistry, name: &str, axis: &LinearAxis) -> Self {
        Self {
            registry,
            handle: Some(registry.register(name, axis)),
        }
    }

    pub fn handle(&self) -> Option<LayerHandle> {
        self.handle
    }

    /// Unregister now.
    pub fn release(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.registry.unregister(handle);
        }
    }
}

impl Drop for StagedLayer<'_> {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisOrigin;
    use crate::crs::Crs;
    use geo::{MultiLineString, line_string};

    fn axis() -> LinearAxis {
        LinearAxis {
            geometry: MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]]),
            crs: Crs::engineering(),
            origin: AxisOrigin::Dissolved,
        }
    }

    #[test]
    fn test_staged_layer_unregisters_on_drop() {
        let registry = MemoryRegistry::new();
        {
            let staged = StagedLayer::stage(&registry, "centerline", &axis());
            assert!(staged.handle().is_some());
            assert_eq!(registry.names(), vec!["centerline".to_string()]);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_is_idempotent_with_drop() {
        let registry = MemoryRegistry::new();
        let staged = StagedLayer::stage(&registry, "merged", &axis());
        staged.release();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handles_are_distinct() {
        let registry = MemoryRegistry::new();
        let a = registry.register("a", &axis());
        let b = registry.register("b", &axis());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        registry.unregister(a);
        assert_eq!(registry.names(), vec!["b".to_string()]);
    }
}
