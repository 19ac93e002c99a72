//! Insertion-ordered scene collection.

use crate::model::element::{Category, ElementId, SceneElement};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Per-category element counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub birds: usize,
    pub clouds: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Bird => self.birds,
            Category::Cloud => self.clouds,
        }
    }

    pub fn set(&mut self, category: Category, count: usize) {
        match category {
            Category::Bird => self.birds = count,
            Category::Cloud => self.clouds = count,
        }
    }

    pub fn total(&self) -> usize {
        self.birds + self.clouds
    }
}

/// Rejected insert of an element whose id is already in the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneInsertError {
    pub id: ElementId,
}

impl Display for SceneInsertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "element id already present in scene: {}", self.id)
    }
}

impl Error for SceneInsertError {}

/// Ordered collection of scene elements with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    elements: Vec<SceneElement>,
    ids: HashSet<ElementId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scene keeping the first occurrence of every id.
    ///
    /// Returns the scene and the number of dropped duplicates.
    pub fn from_elements(elements: impl IntoIterator<Item = SceneElement>) -> (Self, usize) {
        let mut scene = Self::new();
        let mut dropped = 0;
        for element in elements {
            if scene.push(element).is_err() {
                dropped += 1;
            }
        }
        (scene, dropped)
    }

    /// Appends one element at the end of the scene.
    pub fn push(&mut self, element: SceneElement) -> Result<(), SceneInsertError> {
        if !self.ids.insert(element.id) {
            return Err(SceneInsertError { id: element.id });
        }
        self.elements.push(element);
        Ok(())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneElement> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[SceneElement] {
        &self.elements
    }

    /// Elements of one category, in scene order.
    pub fn of_category(&self, category: Category) -> Vec<SceneElement> {
        self.elements
            .iter()
            .filter(|element| element.category() == category)
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> CategoryCounts {
        count_by_category(&self.elements)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.ids.clear();
    }

    pub fn into_elements(self) -> Vec<SceneElement> {
        self.elements
    }
}

/// Splits elements into `(birds, clouds)` preserving relative order.
pub fn partition_by_category(elements: &[SceneElement]) -> (Vec<SceneElement>, Vec<SceneElement>) {
    elements
        .iter()
        .cloned()
        .partition(|element| element.category() == Category::Bird)
}

pub fn count_by_category(elements: &[SceneElement]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for element in elements {
        match element.category() {
            Category::Bird => counts.birds += 1,
            Category::Cloud => counts.clouds += 1,
        }
    }
    counts
}
