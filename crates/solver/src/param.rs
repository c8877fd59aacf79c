//! Parameter arena.
//!
//! Every scalar degree of freedom lives here. Geometry and constraints hold
//! [`ParamId`] handles, so two parameters with equal values stay distinct and
//! the constraint graph is keyed on handle identity.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::geometry::Point;

new_key_type! {
    pub struct ParamId;
}

/// A single scalar parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub value: f64,
    pub name: Option<String>,
    /// Fixed parameters are known constants: constraints read them but the
    /// solvers never move them.
    pub fixed: bool,
}

/// Owns all parameter values of a system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamStore {
    params: SlotMap<ParamId, Param>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an anonymous free parameter.
    pub fn add(&mut self, value: f64) -> ParamId {
        self.params.insert(Param {
            value,
            name: None,
            fixed: false,
        })
    }

    /// Add a named free parameter.
    pub fn add_named(&mut self, name: &str, value: f64) -> ParamId {
        self.params.insert(Param {
            value,
            name: Some(name.to_string()),
            fixed: false,
        })
    }

    /// Add a parameter that the solvers treat as a constant.
    pub fn add_fixed(&mut self, value: f64) -> ParamId {
        self.params.insert(Param {
            value,
            name: None,
            fixed: true,
        })
    }

    /// Add a free point, one parameter per coordinate.
    pub fn add_point(&mut self, x: f64, y: f64) -> Point {
        Point {
            x: self.add(x),
            y: self.add(y),
        }
    }

    pub fn contains(&self, id: ParamId) -> bool {
        self.params.contains_key(id)
    }

    pub fn get(&self, id: ParamId) -> Option<&Param> {
        self.params.get(id)
    }

    /// Current value of a parameter. Unknown handles read as 0.0.
    pub fn value(&self, id: ParamId) -> f64 {
        self.params.get(id).map_or(0.0, |p| p.value)
    }

    /// Overwrite a parameter's value. Returns false for an unknown handle.
    pub fn set_value(&mut self, id: ParamId, value: f64) -> bool {
        match self.params.get_mut(id) {
            Some(p) => {
                p.value = value;
                true
            }
            None => false,
        }
    }

    pub fn is_fixed(&self, id: ParamId) -> bool {
        self.params.get(id).is_some_and(|p| p.fixed)
    }

    /// Mark a parameter as fixed or free. Returns false for an unknown handle.
    pub fn set_fixed(&mut self, id: ParamId, fixed: bool) -> bool {
        match self.params.get_mut(id) {
            Some(p) => {
                p.fixed = fixed;
                true
            }
            None => false,
        }
    }

    /// Current coordinates of a point.
    pub fn point(&self, p: &Point) -> (f64, f64) {
        (self.value(p.x), self.value(p.y))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &Param)> {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values_are_distinct_params() {
        let mut store = ParamStore::new();
        let a = store.add(1.0);
        let b = store.add(1.0);
        assert_ne!(a, b);
        assert_eq!(store.value(a), store.value(b));
    }

    #[test]
    fn test_set_and_fix() {
        let mut store = ParamStore::new();
        let a = store.add_named("width", 3.0);
        assert!(store.set_value(a, 4.5));
        assert_eq!(store.value(a), 4.5);
        assert!(!store.is_fixed(a));
        store.set_fixed(a, true);
        assert!(store.is_fixed(a));
        assert_eq!(store.get(a).and_then(|p| p.name.as_deref()), Some("width"));
    }

    #[test]
    fn test_add_point() {
        let mut store = ParamStore::new();
        let p = store.add_point(2.0, -1.0);
        assert_eq!(store.point(&p), (2.0, -1.0));
        assert_eq!(store.len(), 2);
    }
}
