//! Decoding of service responses into core types.
//!
//! Every response passes through one of the `decode_*` functions here, so
//! callers only ever see tagged core values, never raw XML or JSON.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use serde_json::Value;

use intake_core::{
    ConverterOption, FileError, FileErrorKind, FormTransform, InputSourceOption, InputTemplate,
    LogEntry, ParameterChoice, ParameterDescriptor, ParameterField, ParameterKind,
    ProjectSnapshot, ProjectStatus, SnapshotFile, StatusCode, UploadBatch, UploadRecord,
    UploadResponse,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed xml: {0}")]
    Xml(String),
    #[error("malformed json: {0}")]
    Json(String),
    #[error("response has no <{0}> element")]
    MissingElement(&'static str),
    #[error("interface data does not list any input templates")]
    MissingTemplates,
    /// The service answered with an error message instead of a result.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Default)]
struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
    text: String,
    /// False when the element was still open at the end of input.
    closed: bool,
}

impl XmlNode {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Depth-first search for the first element called `name`.
    fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    fn root_element(&self) -> Option<&XmlNode> {
        self.children.first()
    }

    fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Builds an element tree from `input`. Elements still open at the end of
/// input are closed there; the service emits truncated documents on fatal
/// upload errors.
fn parse_xml(input: &str) -> Result<XmlNode, DecodeError> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack = vec![XmlNode::default()];
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(open_element(&start)),
            Ok(Event::Empty(start)) => {
                let mut node = open_element(&start);
                node.closed = true;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                // Stray end tags are ignored.
                if let Some(depth) = stack.iter().rposition(|node| node.name == name) {
                    stack[depth].closed = true;
                    while depth > 0 && stack.len() > depth {
                        close_element(&mut stack);
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&value);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(DecodeError::Xml(err.to_string())),
        }
    }
    while stack.len() > 1 {
        close_element(&mut stack);
    }
    Ok(stack.pop().unwrap_or_default())
}

fn open_element(start: &BytesStart<'_>) -> XmlNode {
    let attributes = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();
    XmlNode {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        ..XmlNode::default()
    }
}

fn close_element(stack: &mut Vec<XmlNode>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(node) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True" | "yes"))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Decodes an upload result document (`<clamupload>`).
///
/// A truncated `<upload>` record is only tolerated when it already carries an
/// error or a `<valid>yes</valid>` verdict; otherwise the whole document is
/// rejected so nothing from it reaches the manifest.
pub fn decode_upload_xml(xml: &str) -> Result<UploadBatch, DecodeError> {
    let document = parse_xml(xml)?;
    let root = document
        .find("clamupload")
        .ok_or(DecodeError::MissingElement("clamupload"))?;

    let mut batch = UploadBatch::default();
    for node in &root.children {
        match node.name.as_str() {
            "upload" => {
                let record = decode_record(node);
                if !node.closed && !has_verdict(node, &record) {
                    return Err(DecodeError::Xml(format!(
                        "upload record for {:?} ends before its result",
                        record.filename
                    )));
                }
                batch.records.push(record);
            }
            "error" => batch.errors.push(decode_file_error(node)),
            _ => {}
        }
    }
    Ok(batch)
}

fn decode_record(node: &XmlNode) -> UploadRecord {
    let mut record = UploadRecord {
        template_id: node.attr("inputtemplate").unwrap_or_default().to_string(),
        filename: node.attr("filename").unwrap_or_default().to_string(),
        template_label: node.attr("templatelabel").unwrap_or_default().to_string(),
        format: non_empty(node.attr("format")),
        source: non_empty(node.attr("source")),
        ..UploadRecord::default()
    };
    for child in &node.children {
        match child.name.as_str() {
            "parameters" => {
                record.parameters_errored = flag(child.attr("errors"));
                record.parameters = Some(decode_parameter_list(child));
            }
            "error" => record.errors.push(decode_file_error(child)),
            "valid" if child.text() == "no" && record.errors.is_empty() => {
                record.errors.push(FileError {
                    kind: FileErrorKind::Validation,
                    message: format!(
                        "The file {} did not validate, it is not in the proper expected format.",
                        record.filename
                    ),
                });
            }
            _ => {}
        }
    }
    record
}

fn has_verdict(node: &XmlNode, record: &UploadRecord) -> bool {
    !record.errors.is_empty()
        || record.parameters_errored
        || node.elements("valid").any(|valid| valid.text() == "yes")
}

fn decode_file_error(node: &XmlNode) -> FileError {
    let message = match node.text() {
        "" => "The server reported an error without details".to_string(),
        text => text.to_string(),
    };
    FileError {
        kind: FileErrorKind::from_declared(node.attr("type")),
        message,
    }
}

/// Decodes a parameter descriptor document (`<parameters>` with one element
/// per field, optionally grouped).
pub fn decode_parameters(xml: &str) -> Result<ParameterDescriptor, DecodeError> {
    if xml.trim().is_empty() {
        return Ok(ParameterDescriptor::default());
    }
    let document = parse_xml(xml)?;
    let list = document.find("parameters").unwrap_or(&document);
    Ok(decode_parameter_list(list))
}

fn decode_parameter_list(node: &XmlNode) -> ParameterDescriptor {
    let mut fields = Vec::new();
    collect_fields(node, &mut fields);
    ParameterDescriptor::new(fields)
}

fn collect_fields(node: &XmlNode, fields: &mut Vec<ParameterField>) {
    for child in &node.children {
        if child.name == "parametergroup" {
            collect_fields(child, fields);
        } else if child.name.ends_with("Parameter") {
            if let Some(field) = decode_field(child) {
                fields.push(field);
            }
        }
    }
}

fn decode_field(node: &XmlNode) -> Option<ParameterField> {
    let id = non_empty(node.attr("id"))?;
    let mut field = ParameterField::new(ParameterKind::from_tag(&node.name), id);
    if let Some(name) = non_empty(node.attr("name")) {
        field.name = name;
    }
    field.description = node.attr("description").unwrap_or_default().to_string();
    field.value = node.attr("value").map(str::to_string);
    field.error = non_empty(node.attr("error"));
    field.multi = flag(node.attr("multi"));
    field.required = flag(node.attr("required"));
    field.choices = node
        .elements("choice")
        .map(|choice| ParameterChoice {
            id: choice.attr("id").unwrap_or_default().to_string(),
            label: choice.text().to_string(),
            selected: flag(choice.attr("selected")),
        })
        .collect();
    Some(field)
}

#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    #[serde(default)]
    isarchive: Value,
    #[serde(default)]
    xml: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes the JSON envelope returned by the direct upload endpoint.
///
/// The embedded `xml` is tried as base64 first and used verbatim otherwise.
/// Error envelopes are sometimes written in relaxed object notation
/// (`{success: false, error: '...'}`), which is accepted too.
pub fn decode_uploader_envelope(body: &str) -> Result<UploadResponse, DecodeError> {
    let envelope = match serde_json::from_str::<UploadEnvelope>(body) {
        Ok(envelope) => envelope,
        Err(err) => UploadEnvelope {
            isarchive: Value::Null,
            xml: None,
            error: Some(relaxed_error_message(body).ok_or(DecodeError::Json(err.to_string()))?),
        },
    };

    if truthy(&envelope.isarchive) {
        return Ok(UploadResponse::Archive);
    }
    if let Some(xml) = envelope.xml.filter(|xml| !xml.trim().is_empty()) {
        return decode_upload_xml(&embedded_xml(&xml)).map(UploadResponse::Files);
    }
    match non_empty(envelope.error.as_deref()) {
        // Fatal upload errors arrive as an XML fragment in the message.
        Some(message) if message.contains("<clamupload") => {
            decode_upload_xml(&message).map(UploadResponse::Files)
        }
        Some(message) => Err(DecodeError::Rejected(message)),
        None => Err(DecodeError::MissingElement("clamupload")),
    }
}

fn embedded_xml(xml: &str) -> String {
    STANDARD
        .decode(xml.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|decoded| decoded.trim_start().starts_with('<'))
        .unwrap_or_else(|| xml.to_string())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty() && text != "false" && text != "0",
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn relaxed_error_message(body: &str) -> Option<String> {
    let key = body.find("error")?;
    let rest = body[key + "error".len()..]
        .trim_start_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
        .strip_prefix(':')?
        .trim_start();
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = &rest[1..];
    let end = inner.rfind(quote)?;
    Some(inner[..end].to_string())
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    statuscode: i64,
    #[serde(default)]
    statusmsg: Option<String>,
    #[serde(default)]
    completion: Value,
    #[serde(default)]
    statuslog: Vec<Vec<Value>>,
}

/// Decodes a status poll response. The service lists log entries newest
/// first; the decoded log is in chronological order.
pub fn decode_status(body: &str) -> Result<ProjectStatus, DecodeError> {
    let payload: StatusPayload =
        serde_json::from_str(body).map_err(|err| DecodeError::Json(err.to_string()))?;
    let log = payload
        .statuslog
        .iter()
        .rev()
        .filter_map(|entry| {
            let message = entry.first()?.as_str()?.trim().to_string();
            let timestamp = entry
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(LogEntry { message, timestamp })
        })
        .collect();
    Ok(ProjectStatus {
        code: StatusCode::from_code(payload.statuscode),
        message: non_empty(payload.statusmsg.as_deref()),
        completion: percent(&payload.completion),
        log,
    })
}

fn percent(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    };
    raw.map(|n| n.clamp(0.0, 100.0) as u8).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct RawOption {
    id: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    acceptarchive: Value,
    #[serde(default)]
    parametersxml: String,
    #[serde(default)]
    converters: Vec<RawOption>,
    #[serde(default)]
    inputsources: Vec<RawOption>,
}

impl RawTemplate {
    fn into_template(self) -> Result<InputTemplate, DecodeError> {
        Ok(InputTemplate {
            parameters: decode_parameters(&self.parametersxml)?,
            label: if self.label.is_empty() {
                self.id.clone()
            } else {
                self.label
            },
            id: self.id,
            format: non_empty(self.format.as_deref()),
            forced_filename: non_empty(self.filename.as_deref()),
            forced_extension: non_empty(self.extension.as_deref())
                .map(|ext| ext.trim_start_matches('.').to_string()),
            converters: self
                .converters
                .into_iter()
                .map(|option| ConverterOption {
                    id: option.id,
                    label: option.label,
                })
                .collect(),
            input_sources: self
                .inputsources
                .into_iter()
                .map(|option| InputSourceOption {
                    id: option.id,
                    label: option.label,
                })
                .collect(),
            accepts_archive: truthy(&self.acceptarchive),
        })
    }
}

/// Extracts the raw template list from the interface data script
/// (`systemid = '...'; baseurl = '...'; inputtemplates = [ ... ];`).
/// Duplicates are kept; the registry removes them.
pub fn decode_interface_data(script: &str) -> Result<Vec<InputTemplate>, DecodeError> {
    let key = script
        .find("inputtemplates")
        .ok_or(DecodeError::MissingTemplates)?;
    let rest = &script[key..];
    let open = rest.find('[').ok_or(DecodeError::MissingTemplates)?;
    let close = rest.rfind(']').ok_or(DecodeError::MissingTemplates)?;
    if close < open {
        return Err(DecodeError::MissingTemplates);
    }
    let raw: Vec<RawTemplate> = serde_json::from_str(&rest[open..=close])
        .map_err(|err| DecodeError::Json(err.to_string()))?;
    raw.into_iter().map(RawTemplate::into_template).collect()
}

/// Decodes the project page: current status and the listed input files.
pub fn decode_project(xml: &str) -> Result<ProjectSnapshot, DecodeError> {
    let document = parse_xml(xml)?;
    let root = document
        .root_element()
        .ok_or(DecodeError::MissingElement("clam"))?;
    let status_node = root
        .elements("status")
        .next()
        .ok_or(DecodeError::MissingElement("status"))?;

    let code = status_node
        .attr("code")
        .and_then(|code| code.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let status = ProjectStatus {
        code: StatusCode::from_code(code),
        message: non_empty(status_node.attr("message")),
        completion: status_node
            .attr("completion")
            .map(|raw| percent(&Value::String(raw.to_string())))
            .unwrap_or(0),
        log: Vec::new(),
    };

    let input_files = root
        .elements("input")
        .flat_map(|input| input.elements("file"))
        .filter_map(|file| {
            let filename = file
                .elements("name")
                .next()
                .and_then(|name| non_empty(Some(name.text())))
                .or_else(|| non_empty(file.attr("name")))?;
            Some(SnapshotFile {
                filename,
                template_id: non_empty(file.attr("template")),
                format: non_empty(file.attr("format")),
            })
        })
        .collect();

    Ok(ProjectSnapshot {
        status,
        input_files,
    })
}

/// Checks that `body` is a stylesheet document and wraps it as the shared
/// form transform.
pub fn decode_stylesheet(body: &str) -> Result<FormTransform, DecodeError> {
    let document = parse_xml(body)?;
    let is_stylesheet = document.root_element().is_some_and(|root| {
        let local = root.name.rsplit(':').next().unwrap_or(&root.name);
        local == "stylesheet" || local == "transform"
    });
    if !is_stylesheet {
        return Err(DecodeError::MissingElement("xsl:stylesheet"));
    }
    Ok(FormTransform::from_stylesheet(body))
}
