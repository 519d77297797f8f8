use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::error::{LayeredMapError, Result};

/// One mapping of a [`LayeredMap`]. Layers are shared, not copied: a write
/// made through any handle is visible to every holder of the same layer.
///
/// Do not hold a `borrow_mut()` on a layer across a call into a map that
/// contains it. Lookups and writes borrow the layer and panic on conflict.
pub type Layer<K, V> = Rc<RefCell<IndexMap<K, V>>>;

/// An ordered stack of mappings presented as a single mapping.
///
/// `layers[0]` is the innermost layer. Reads scan from the innermost layer
/// outwards and return the first hit; writes and deletes only ever touch the
/// innermost layer.
///
/// Layers are `Rc<RefCell<_>>`, so a `LayeredMap` is neither `Send` nor
/// `Sync`. Sharing layers across threads needs a different container.
#[derive(Debug)]
pub struct LayeredMap<K, V> {
    layers: Vec<Layer<K, V>>,
}

impl<K, V> Clone for LayeredMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
        }
    }
}

impl<K: Hash + Eq, V> Default for LayeredMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> LayeredMap<K, V> {
    pub fn new() -> Self {
        Self::from_layers(Vec::new())
    }

    /// Builds a map over `layers`, innermost first. An empty list gets one
    /// fresh layer so writes always have a target.
    pub fn from_layers(layers: Vec<Layer<K, V>>) -> Self {
        if layers.is_empty() {
            return Self {
                layers: vec![Self::share(IndexMap::new())],
            };
        }
        Self { layers }
    }

    /// Wraps a plain map into a layer that can be handed to several maps.
    pub fn share(map: IndexMap<K, V>) -> Layer<K, V> {
        Rc::new(RefCell::new(map))
    }

    pub fn layers(&self) -> &[Layer<K, V>] {
        &self.layers
    }

    pub fn innermost(&self) -> &Layer<K, V> {
        &self.layers[0]
    }

    /// Value of the innermost layer holding `key`.
    pub fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
        V: Clone,
    {
        self.find(key).ok_or_else(|| {
            debug!("{key:?} missing from all {} layers", self.layers.len());
            LayeredMapError::NotFound {
                key: format!("{key:?}"),
            }
        })
    }

    pub fn find<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.layers
            .iter()
            .find_map(|layer| layer.borrow().get(key).cloned())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.layers
            .iter()
            .any(|layer| layer.borrow().contains_key(key))
    }

    /// Writes into the innermost layer, returning the value it replaced there.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.innermost().borrow_mut().insert(key, value)
    }

    /// Removes `key` from the innermost layer. Fails when the key lives only
    /// in outer layers, even though `get` can see it.
    pub fn delete<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let removed = self.innermost().borrow_mut().shift_remove(key);
        removed.ok_or_else(|| {
            debug!("refusing to delete {key:?}: not in the innermost layer");
            LayeredMapError::KeyNotInInnermost {
                key: format!("{key:?}"),
            }
        })
    }

    /// Empties the innermost layer. Outer layers keep their entries.
    pub fn clear(&mut self) {
        self.innermost().borrow_mut().clear();
    }

    /// Number of distinct keys across all layers.
    pub fn len(&self) -> usize {
        self.with_view(|view| view.len())
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.borrow().is_empty())
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.with_view(|view| view.into_keys().cloned().collect())
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.with_view(|view| view.into_values().cloned().collect())
    }

    /// Flattened copy of the visible entries.
    pub fn to_map(&self) -> IndexMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.with_view(|view| {
            view.into_iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
    }

    /// A new map with a fresh, empty innermost layer in front of the
    /// current ones. `self` keeps writing to its own innermost layer.
    pub fn new_child(&self) -> Self {
        self.new_child_with(Self::share(IndexMap::new()))
    }

    pub fn new_child_with(&self, layer: Layer<K, V>) -> Self {
        let mut layers = Vec::with_capacity(self.layers.len() + 1);
        layers.push(layer);
        layers.extend(self.layers.iter().cloned());
        trace!("pushed layer, depth {}", layers.len());
        Self { layers }
    }

    /// The map without its innermost layer.
    pub fn parent(&self) -> Result<Self> {
        if self.layers.len() <= 1 {
            debug!("no parent: only one layer left");
            return Err(LayeredMapError::NoParent);
        }
        trace!("popped layer, depth {}", self.layers.len() - 1);
        Ok(Self {
            layers: self.layers[1..].to_vec(),
        })
    }

    /// Runs `f` against a child map that is dropped afterwards.
    pub fn scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let mut child = self.new_child();
        f(&mut child)
    }

    // Outermost layer first, so keys keep the position they had in the
    // outermost layer that holds them while inner values overwrite.
    fn with_view<R>(&self, f: impl FnOnce(IndexMap<&K, &V>) -> R) -> R {
        let borrowed: Vec<_> = self.layers.iter().map(|layer| layer.borrow()).collect();
        let mut view = IndexMap::new();
        for layer in borrowed.iter().rev() {
            for (key, value) in layer.iter() {
                view.insert(key, value);
            }
        }
        f(view)
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for LayeredMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_layers(vec![Self::share(iter.into_iter().collect())])
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Display for LayeredMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LayeredMap(")?;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match layer.try_borrow() {
                Ok(map) => write!(f, "{:?}", *map)?,
                Err(_) => f.write_str("<borrowed>")?,
            }
        }
        f.write_str(")")
    }
}
