use std::collections::BTreeSet;

use crate::shared::constants::PERSON_CLASS_ID;

use super::detection::Detection;

/// The set of class ids a run keeps; everything else is dropped before
/// rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassFilter {
    classes: BTreeSet<usize>,
}

impl ClassFilter {
    pub fn new(classes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Keeps people only.
    pub fn person() -> Self {
        Self::new([PERSON_CLASS_ID])
    }

    pub fn accepts(&self, class_id: usize) -> bool {
        self.classes.contains(&class_id)
    }

    /// Target class ids in ascending order.
    pub fn classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.classes.iter().copied()
    }

    pub fn retain(&self, detections: &mut Vec<Detection>) {
        detections.retain(|d| self.accepts(d.class_id));
    }
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self::person()
    }
}
