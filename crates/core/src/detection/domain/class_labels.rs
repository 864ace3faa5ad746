use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::shared::constants::{PERSON_CLASS_ID, PERSON_CLASS_NAME};

use super::class_filter::ClassFilter;

/// The 80 COCO class names in YOLO label order.
pub const COCO_CLASS_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Class id to display name mapping of a detection model.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassLabels {
    names: BTreeMap<usize, String>,
    from_model: bool,
}

impl ClassLabels {
    /// COCO names, assumed when a model carries no label map.
    pub fn coco() -> Self {
        Self {
            names: COCO_CLASS_NAMES
                .iter()
                .enumerate()
                .map(|(id, name)| (id, name.to_string()))
                .collect(),
            from_model: false,
        }
    }

    /// Parses the `names` metadata entry written by Ultralytics ONNX
    /// exports, e.g. `{0: 'person', 1: 'bicycle'}`.
    pub fn from_model_metadata(raw: &str) -> Option<Self> {
        let names = parse_names_dict(raw)?;
        if names.is_empty() {
            return None;
        }
        Some(Self {
            names,
            from_model: true,
        })
    }

    /// Whether the mapping came from the model rather than the COCO default.
    pub fn is_from_model(&self) -> bool {
        self.from_model
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for `class_id`, or `class <id>` when unknown.
    pub fn name(&self, class_id: usize) -> Cow<'_, str> {
        match self.names.get(&class_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("class {class_id}")),
        }
    }

    /// Checks that every target class exists and that the person id
    /// really names people.
    pub fn validate(&self, filter: &ClassFilter) -> Result<(), String> {
        for class_id in filter.classes() {
            let Some(name) = self.names.get(&class_id) else {
                return Err(format!(
                    "model has no class {class_id} ({} classes known)",
                    self.names.len()
                ));
            };
            if class_id == PERSON_CLASS_ID && name != PERSON_CLASS_NAME {
                return Err(format!(
                    "model labels class {class_id} as '{name}', expected '{PERSON_CLASS_NAME}'"
                ));
            }
        }
        Ok(())
    }
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self::coco()
    }
}

/// Parses a Python dict literal of `int: str` pairs.
fn parse_names_dict(raw: &str) -> Option<BTreeMap<usize, String>> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut names = BTreeMap::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(char::is_ascii_digit) {
            key.push(c);
        }
        let id: usize = key.parse().ok()?;

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next()? != ':' {
            return None;
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;
        let mut name = String::new();
        loop {
            match chars.next()? {
                '\\' => name.push(chars.next()?),
                c if c == quote => break,
                c => name.push(c),
            }
        }
        names.insert(id, name);
    }

    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_defaults() {
        let labels = ClassLabels::coco();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels.name(0), "person");
        assert_eq!(labels.name(79), "toothbrush");
        assert!(!labels.is_from_model());
    }

    #[test]
    fn test_unknown_class_name() {
        assert_eq!(ClassLabels::coco().name(80), "class 80");
    }

    #[test]
    fn test_parses_ultralytics_metadata() {
        let labels =
            ClassLabels::from_model_metadata("{0: 'person', 1: 'bicycle', 11: 'stop sign'}")
                .unwrap();
        assert!(labels.is_from_model());
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.name(0), "person");
        assert_eq!(labels.name(11), "stop sign");
    }

    #[test]
    fn test_parses_double_quoted_and_escaped_names() {
        let labels =
            ClassLabels::from_model_metadata(r#"{0: "driver's seat", 1: 'it\'s'}"#).unwrap();
        assert_eq!(labels.name(0), "driver's seat");
        assert_eq!(labels.name(1), "it's");
    }

    #[test]
    fn test_rejects_malformed_metadata() {
        assert!(ClassLabels::from_model_metadata("person, bicycle").is_none());
        assert!(ClassLabels::from_model_metadata("{0: person}").is_none());
        assert!(ClassLabels::from_model_metadata("{0: 'person'").is_none());
        assert!(ClassLabels::from_model_metadata("{}").is_none());
    }

    #[test]
    fn test_validate_accepts_coco_person() {
        assert!(ClassLabels::coco().validate(&ClassFilter::person()).is_ok());
    }

    #[test]
    fn test_validate_rejects_relabelled_person_class() {
        let labels = ClassLabels::from_model_metadata("{0: 'face', 1: 'person'}").unwrap();
        let err = labels.validate(&ClassFilter::person()).unwrap_err();
        assert!(err.contains("'face'"));
    }

    #[test]
    fn test_validate_rejects_missing_class() {
        let labels = ClassLabels::from_model_metadata("{0: 'person'}").unwrap();
        assert!(labels.validate(&ClassFilter::new([0, 5])).is_err());
    }
}
