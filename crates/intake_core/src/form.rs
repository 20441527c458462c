//! Parameter form rendering.
//!
//! A template's parameter descriptor (or the error-annotated fragment the
//! server returned for a rejected file) is passed through the session's
//! shared [`FormTransform`] and decorated with converter and archive
//! affordances.

use std::sync::Arc;

use quick_xml::escape::escape;

use crate::{ParameterDescriptor, ParameterField, ParameterKind, TemplateId, TemplateRegistry};

pub const ARCHIVE_NOTICE: &str = "For easy mass upload, this input type also accepts \
<strong>archives</strong> (<tt>zip, tar.gz, tar.bz2</tt>) containing multiple files of \
exactly this specific type.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceId {
    Upload,
    UrlUpload,
    Editor,
    InputSource,
}

impl SurfaceId {
    pub const ALL: [SurfaceId; 4] = [
        SurfaceId::Upload,
        SurfaceId::UrlUpload,
        SurfaceId::Editor,
        SurfaceId::InputSource,
    ];

    /// Converters apply to transferred files only.
    pub fn converters_enabled(self) -> bool {
        matches!(self, SurfaceId::Upload | SurfaceId::UrlUpload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Error: selected type is invalid")]
    InvalidTemplate,
    #[error("The parameter form is not available yet, please wait for the page to finish loading")]
    TransformUnavailable,
}

/// The shared structural transform turning parameter descriptors into form
/// markup. Loaded once per session from the service's parameter stylesheet;
/// its presence gates rendering, while the markup itself comes from
/// [`FormTransform::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTransform {
    stylesheet: Arc<str>,
}

impl FormTransform {
    pub fn from_stylesheet(stylesheet: impl Into<Arc<str>>) -> Self {
        Self {
            stylesheet: stylesheet.into(),
        }
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Renders `descriptor` with the built-in field markup. The stylesheet
    /// text is kept as fetched and is not evaluated.
    pub fn apply(&self, descriptor: &ParameterDescriptor) -> String {
        let mut markup = String::new();
        for field in &descriptor.fields {
            render_field(&mut markup, field);
        }
        markup
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedForm {
    pub markup: String,
    pub field_count: usize,
}

/// Renders the parameter form for `template_id`.
///
/// An empty id yields an empty form. `error_override` replaces the
/// template's own descriptor, so rejected fields show their server error.
pub fn render_parameter_form(
    registry: &TemplateRegistry,
    transform: Option<&FormTransform>,
    template_id: &str,
    enable_converters: bool,
    error_override: Option<&ParameterDescriptor>,
) -> Result<RenderedForm, RenderError> {
    if template_id.is_empty() {
        return Ok(RenderedForm::default());
    }
    let template = registry
        .lookup(template_id)
        .ok_or(RenderError::InvalidTemplate)?;
    let transform = transform.ok_or(RenderError::TransformUnavailable)?;

    let descriptor = error_override.unwrap_or(&template.parameters);
    let mut markup = transform.apply(descriptor);

    if enable_converters && !template.converters.is_empty() {
        let mut control = String::from(
            "<div class=\"converter\">Automatic conversion from other format? \
<select name=\"converter\"><option value=\"\" selected=\"selected\">No</option>",
        );
        for converter in &template.converters {
            control.push_str(&format!(
                "<option value=\"{}\">{}</option>",
                escape(converter.id.as_str()),
                escape(converter.label.as_str())
            ));
        }
        control.push_str("</select></div>");
        markup.insert_str(0, &control);
    }
    if template.accepts_archive {
        markup.insert_str(0, &format!("<div class=\"archive-notice\">{ARCHIVE_NOTICE}</div>"));
    }

    Ok(RenderedForm {
        markup,
        field_count: descriptor.len(),
    })
}

/// State of one form area the user fills in before submitting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormSurface {
    pub template_id: Option<TemplateId>,
    pub markup: String,
    pub field_count: usize,
    /// Inline error shown on the surface itself.
    pub error: Option<String>,
    /// Filename the editor must use, from the selected template.
    pub forced_filename: Option<String>,
    /// Filename of a submission rejected for parameter errors; reused when the
    /// user resubmits without naming a file.
    pub retry_filename: Option<String>,
}

impl FormSurface {
    pub fn has_parameters(&self) -> bool {
        self.field_count > 0
    }

    pub(crate) fn clear_errors(&mut self) {
        self.error = None;
    }

    pub(crate) fn show(&mut self, rendered: Result<RenderedForm, RenderError>) {
        self.clear_errors();
        match rendered {
            Ok(form) => {
                self.markup = form.markup;
                self.field_count = form.field_count;
            }
            Err(RenderError::InvalidTemplate) => {
                self.markup.clear();
                self.field_count = 0;
                self.error = Some(RenderError::InvalidTemplate.to_string());
            }
            Err(err @ RenderError::TransformUnavailable) => {
                // Leave the previous form in place.
                self.error = Some(err.to_string());
            }
        }
    }
}

fn render_field(out: &mut String, field: &ParameterField) {
    let id = escape(field.id.as_str());
    let value = field.value.as_deref().unwrap_or("");
    let class = if field.error.is_some() {
        "parameter has-error"
    } else {
        "parameter"
    };
    out.push_str(&format!("<div class=\"{class}\" id=\"parameter-{id}\">"));
    out.push_str(&format!(
        "<label for=\"{id}\">{}{}</label>",
        escape(field.name.as_str()),
        if field.required { " *" } else { "" }
    ));

    match &field.kind {
        ParameterKind::Boolean => {
            let checked = matches!(value, "1" | "true" | "yes" | "True");
            out.push_str(&format!(
                "<input type=\"checkbox\" name=\"{id}\" id=\"{id}\" value=\"1\"{} />",
                if checked { " checked=\"checked\"" } else { "" }
            ));
        }
        ParameterKind::Text => {
            out.push_str(&format!(
                "<textarea name=\"{id}\" id=\"{id}\">{}</textarea>",
                escape(value)
            ));
        }
        ParameterKind::Integer => {
            out.push_str(&format!(
                "<input type=\"number\" step=\"1\" name=\"{id}\" id=\"{id}\" value=\"{}\" />",
                escape(value)
            ));
        }
        ParameterKind::Float => {
            out.push_str(&format!(
                "<input type=\"number\" step=\"any\" name=\"{id}\" id=\"{id}\" value=\"{}\" />",
                escape(value)
            ));
        }
        ParameterKind::Choice => {
            out.push_str(&format!(
                "<select name=\"{id}\" id=\"{id}\"{}>",
                if field.multi { " multiple=\"multiple\"" } else { "" }
            ));
            for choice in &field.choices {
                let selected = choice.selected || field.value.as_deref() == Some(&choice.id);
                out.push_str(&format!(
                    "<option value=\"{}\"{}>{}</option>",
                    escape(choice.id.as_str()),
                    if selected { " selected=\"selected\"" } else { "" },
                    escape(choice.label.as_str())
                ));
            }
            out.push_str("</select>");
        }
        ParameterKind::Static => {
            out.push_str(&format!("<span class=\"static\">{}</span>", escape(value)));
        }
        ParameterKind::String | ParameterKind::Other(_) => {
            out.push_str(&format!(
                "<input type=\"text\" name=\"{id}\" id=\"{id}\" value=\"{}\" />",
                escape(value)
            ));
        }
    }

    if !field.description.is_empty() {
        out.push_str(&format!(
            "<span class=\"description\">{}</span>",
            escape(field.description.as_str())
        ));
    }
    if let Some(error) = &field.error {
        out.push_str(&format!("<div class=\"error\">{}</div>", escape(error.as_str())));
    }
    out.push_str("</div>");
}
