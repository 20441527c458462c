/// Kind of a metadata parameter, named after the server's element tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    Boolean,
    String,
    Text,
    Integer,
    Float,
    Choice,
    Static,
    /// A tag this client has no dedicated rendering for; shown as a text input.
    Other(String),
}

impl ParameterKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "BooleanParameter" => Self::Boolean,
            "StringParameter" => Self::String,
            "TextParameter" => Self::Text,
            "IntegerParameter" => Self::Integer,
            "FloatParameter" => Self::Float,
            "ChoiceParameter" => Self::Choice,
            "StaticParameter" => Self::Static,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterChoice {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

/// One metadata field, optionally carrying a value and a server validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterField {
    pub kind: ParameterKind,
    pub id: String,
    pub name: String,
    pub description: String,
    pub value: Option<String>,
    pub error: Option<String>,
    pub choices: Vec<ParameterChoice>,
    pub multi: bool,
    pub required: bool,
}

impl ParameterField {
    pub fn new(kind: ParameterKind, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            kind,
            name: id.clone(),
            id,
            description: String::new(),
            value: None,
            error: None,
            choices: Vec::new(),
            multi: false,
            required: false,
        }
    }
}

/// Template-specific metadata schema, or the error-annotated copy of it the
/// server sends back after a rejected submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterDescriptor {
    pub fields: Vec<ParameterField>,
}

impl ParameterDescriptor {
    pub fn new(fields: Vec<ParameterField>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, id: &str) -> Option<&ParameterField> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|field| field.error.is_some())
    }
}
