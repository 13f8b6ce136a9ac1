//! Detector class vocabulary and the reconciler that merges related classes.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tracker::Detection;

/// Mapping from class id to class name, as published by the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassVocabulary {
    names: BTreeMap<u32, String>,
}

impl ClassVocabulary {
    pub fn new(names: BTreeMap<u32, String>) -> Self {
        Self { names }
    }

    /// Build from names listed in id order (`0, 1, 2, ...`).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id as u32, name.into()))
                .collect(),
        }
    }

    pub fn name(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.names.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Names of the canonical class and the classes folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub canonical: String,
    pub equivalents: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            canonical: "player".to_string(),
            equivalents: vec!["goalkeeper".to_string(), "referee".to_string()],
        }
    }
}

/// Rewrites equivalent class ids to the canonical id. Stateless once built.
#[derive(Debug, Clone, Default)]
pub struct ClassReconciler {
    target: Option<u32>,
    merged: HashSet<u32>,
}

impl ClassReconciler {
    /// Resolve names against the vocabulary.
    ///
    /// If the canonical class is absent the reconciler is a no-op. Equivalent
    /// names missing from the vocabulary are skipped.
    pub fn new(vocabulary: &ClassVocabulary, config: &ReconcileConfig) -> Self {
        let Some(target) = vocabulary.id_of(&config.canonical) else {
            debug!(canonical = %config.canonical, "canonical class not in vocabulary, reconciliation disabled");
            return Self::default();
        };
        let merged = config
            .equivalents
            .iter()
            .filter_map(|name| vocabulary.id_of(name))
            .filter(|id| *id != target)
            .collect();
        Self {
            target: Some(target),
            merged,
        }
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn reconcile_id(&self, class_id: u32) -> u32 {
        match self.target {
            Some(target) if self.merged.contains(&class_id) => target,
            _ => class_id,
        }
    }

    pub fn reconcile(&self, detection: &Detection) -> Detection {
        Detection {
            class_id: self.reconcile_id(detection.class_id),
            ..detection.clone()
        }
    }

    pub fn reconcile_all(&self, detections: &mut [Detection]) {
        for det in detections.iter_mut() {
            det.class_id = self.reconcile_id(det.class_id);
        }
    }
}
