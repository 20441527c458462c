use std::collections::HashSet;

use crate::ParameterDescriptor;

pub type TemplateId = String;

/// Alternate-format converter a template offers for uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterOption {
    pub id: String,
    pub label: String,
}

/// Pre-installed data a template can draw an input file from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSourceOption {
    pub id: String,
    pub label: String,
}

/// One accepted input file type of the current project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputTemplate {
    pub id: TemplateId,
    pub label: String,
    pub format: Option<String>,
    pub forced_filename: Option<String>,
    pub forced_extension: Option<String>,
    pub parameters: ParameterDescriptor,
    pub converters: Vec<ConverterOption>,
    pub input_sources: Vec<InputSourceOption>,
    pub accepts_archive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a desired input type first")]
    NoTemplateSelected,
    #[error("Select a valid input type first (unknown type {0:?})")]
    NoSuchTemplate(TemplateId),
    #[error("Please specify a filename")]
    EmptyFilename,
    #[error("Nothing to submit: provide a file, URL, text or input source")]
    EmptySource,
    #[error("No project ID specified")]
    EmptyProjectName,
}

/// Entries for the type-selection control.
///
/// Ordered alphabetically by label (case-insensitive); templates sharing a
/// label keep their registry order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectableList {
    pub entries: Vec<(TemplateId, String)>,
    /// Set when the registry holds exactly one template.
    pub preselect: Option<TemplateId>,
}

impl SelectableList {
    /// A leading "select a filetype" entry is shown unless a template is preselected.
    pub fn needs_placeholder(&self) -> bool {
        self.preselect.is_none()
    }
}

/// Deduplicated set of input templates for one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateRegistry {
    templates: Vec<InputTemplate>,
}

impl TemplateRegistry {
    /// Builds a registry from raw template input, keeping the first template
    /// seen for each id.
    pub fn from_raw(raw: impl IntoIterator<Item = InputTemplate>) -> Self {
        let mut seen = HashSet::new();
        let templates = raw
            .into_iter()
            .filter(|template| seen.insert(template.id.clone()))
            .collect();
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputTemplate> {
        self.templates.iter()
    }

    pub fn lookup(&self, id: &str) -> Option<&InputTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    pub fn selectable_list(&self) -> SelectableList {
        let mut entries: Vec<(TemplateId, String)> = self
            .templates
            .iter()
            .map(|template| (template.id.clone(), template.label.clone()))
            .collect();
        // Stable sort: equal labels stay in first-seen order.
        entries.sort_by_cached_key(|(_, label)| label.to_lowercase());

        let preselect = match self.templates.as_slice() {
            [only] => Some(only.id.clone()),
            _ => None,
        };
        SelectableList { entries, preselect }
    }

    /// Applies the template's naming constraints to `raw_filename`.
    ///
    /// A forced filename replaces the input; a forced extension is appended
    /// unless the input already ends in it (compared case-insensitively).
    pub fn validate_and_normalize_filename(
        &self,
        raw_filename: &str,
        template_id: &str,
    ) -> Result<String, ValidationError> {
        let template = self
            .lookup(template_id)
            .ok_or_else(|| ValidationError::NoSuchTemplate(template_id.to_string()))?;

        if let Some(forced) = template.forced_filename.as_deref() {
            return Ok(forced.to_string());
        }
        if raw_filename.is_empty() {
            return Err(ValidationError::EmptyFilename);
        }
        match template.forced_extension.as_deref() {
            Some(extension) if !extension.is_empty() => {
                if has_extension(raw_filename, extension) {
                    Ok(raw_filename.to_string())
                } else {
                    Ok(format!("{raw_filename}.{extension}"))
                }
            }
            _ => Ok(raw_filename.to_string()),
        }
    }
}

fn has_extension(filename: &str, extension: &str) -> bool {
    let suffix = format!(".{extension}");
    let wanted = suffix.chars().count();
    let skip = filename.chars().count().saturating_sub(wanted);
    let tail: String = filename.chars().skip(skip).collect();
    tail.to_lowercase() == suffix.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str, label: &str) -> InputTemplate {
        InputTemplate {
            id: id.to_string(),
            label: label.to_string(),
            ..InputTemplate::default()
        }
    }

    #[test]
    fn short_filename_gets_extension() {
        let mut t = template("plain", "Plain");
        t.forced_extension = Some("txt".to_string());
        let registry = TemplateRegistry::from_raw([t]);
        assert_eq!(
            registry.validate_and_normalize_filename("a", "plain").unwrap(),
            "a.txt"
        );
    }

    #[test]
    fn equal_labels_keep_registry_order() {
        let registry = TemplateRegistry::from_raw([
            template("second", "Text"),
            template("first", "text"),
            template("alpha", "Alpha"),
        ]);
        let ids: Vec<_> = registry
            .selectable_list()
            .entries
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["alpha", "second", "first"]);
    }
}
