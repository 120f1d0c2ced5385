//! Layers and the keymap that stacks them.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::domain::key::Key;
use crate::domain::matrix::MATRIX_KEYS;

static EMPTY: Key = Key::Empty;

/// Errors detected while assembling a keymap.
#[derive(Debug, Error, PartialEq)]
pub enum KeymapError {
    /// A keymap needs at least the default layer.
    #[error("keymap has no layers")]
    NoLayers,

    /// A layer key points past the last layer.
    #[error("layer {layer} position {position} switches to missing layer {target}")]
    MissingLayer {
        layer: usize,
        position: usize,
        target: usize,
    },
}

/// One full set of bindings, indexed by matrix position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    keys: Vec<Key>,
}

impl Layer {
    pub fn new(keys: [Key; MATRIX_KEYS]) -> Self {
        Self {
            keys: Vec::from(keys),
        }
    }

    /// A layer with every position unbound.
    pub fn empty() -> Self {
        Self {
            keys: vec![Key::Empty; MATRIX_KEYS],
        }
    }

    /// Returns a copy of this layer with `position` bound to `key`.
    ///
    /// Out-of-range positions are ignored.
    pub fn with(mut self, position: usize, key: Key) -> Self {
        if let Some(slot) = self.keys.get_mut(position) {
            *slot = key;
        }
        self
    }

    /// Binding at `position`; [`Key::Empty`] when unbound or out of range.
    pub fn key(&self, position: usize) -> &Key {
        self.keys.get(position).unwrap_or(&EMPTY)
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &Key)> {
        self.keys.iter().enumerate()
    }
}

/// The ordered stack of layers.  Layer 0 is the default.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    layers: Vec<Layer>,
}

impl Keymap {
    /// Assembles a keymap, checking that every layer key has a target.
    ///
    /// # Errors
    ///
    /// Returns [`KeymapError`] when `layers` is empty or a layer key refers to
    /// a layer that does not exist.
    pub fn new(layers: Vec<Layer>) -> Result<Self, KeymapError> {
        if layers.is_empty() {
            return Err(KeymapError::NoLayers);
        }

        for (index, layer) in layers.iter().enumerate() {
            for (position, key) in layer.iter() {
                let mut missing = None;
                key.walk(&mut |k| {
                    if let Key::Layer { layer: target, .. } = k {
                        if *target >= layers.len() {
                            missing = Some(*target);
                        }
                    }
                });
                if let Some(target) = missing {
                    return Err(KeymapError::MissingLayer {
                        layer: index,
                        position,
                        target,
                    });
                }
            }
        }

        Ok(Self { layers })
    }

    /// Binding at `position` on `layer`; [`Key::Empty`] when either is out of range.
    pub fn key_at(&self, layer: usize, position: usize) -> &Key {
        self.layers
            .get(layer)
            .map_or(&EMPTY, |l| l.key(position))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Every destination id named by a device-switch key, sorted.
    pub fn destinations(&self) -> BTreeSet<&str> {
        let mut ids = BTreeSet::new();
        for layer in &self.layers {
            for (_, key) in layer.iter() {
                key.walk(&mut |k| {
                    if let Key::Device(id) = k {
                        ids.insert(id.as_str());
                    }
                });
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::hid::HidKeyCode;

    #[test]
    fn test_empty_keymap_is_rejected() {
        assert_eq!(Keymap::new(Vec::new()), Err(KeymapError::NoLayers));
    }

    #[test]
    fn test_layer_key_to_missing_layer_is_rejected() {
        // Arrange
        let layer = Layer::empty().with(5, Key::layer(3, true));

        // Act
        let result = Keymap::new(vec![layer]);

        // Assert
        assert_eq!(
            result,
            Err(KeymapError::MissingLayer {
                layer: 0,
                position: 5,
                target: 3
            })
        );
    }

    #[test]
    fn test_key_at_out_of_range_is_empty() {
        // Arrange
        let keymap = Keymap::new(vec![
            Layer::empty().with(0, Key::desktop(HidKeyCode::KeyA))
        ])
        .expect("valid keymap");

        // Assert
        assert_eq!(keymap.key_at(0, 0), &Key::desktop(HidKeyCode::KeyA));
        assert!(keymap.key_at(0, MATRIX_KEYS).is_empty());
        assert!(keymap.key_at(7, 0).is_empty());
    }

    #[test]
    fn test_destinations_include_nested_device_keys() {
        // Arrange
        let layer = Layer::empty()
            .with(1, Key::device("b"))
            .with(2, Key::sequence([Key::device("a"), Key::device("b")]));
        let keymap = Keymap::new(vec![layer]).expect("valid keymap");

        // Act
        let ids: Vec<&str> = keymap.destinations().into_iter().collect();

        // Assert
        assert_eq!(ids, vec!["a", "b"]);
    }
}
