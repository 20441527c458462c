use intake_core::{InputTemplate, TemplateRegistry, ValidationError};

fn template(id: &str, label: &str) -> InputTemplate {
    InputTemplate {
        id: id.to_string(),
        label: label.to_string(),
        ..InputTemplate::default()
    }
}

fn with_extension(id: &str, extension: &str) -> InputTemplate {
    InputTemplate {
        forced_extension: Some(extension.to_string()),
        ..template(id, "Plain text")
    }
}

fn with_filename(id: &str, filename: &str) -> InputTemplate {
    InputTemplate {
        forced_filename: Some(filename.to_string()),
        ..template(id, "Metadata")
    }
}

#[test]
fn forced_extension_is_appended_once() {
    let registry = TemplateRegistry::from_raw([with_extension("plaintext", "txt")]);

    let normalize = |raw: &str| registry.validate_and_normalize_filename(raw, "plaintext");
    assert_eq!(normalize("document").unwrap(), "document.txt");
    assert_eq!(normalize("document.TXT").unwrap(), "document.TXT");
    assert_eq!(normalize("document.csv").unwrap(), "document.csv.txt");
}

#[test]
fn normalization_is_deterministic() {
    let registry = TemplateRegistry::from_raw([with_extension("plaintext", "txt")]);
    let first = registry.validate_and_normalize_filename("notes", "plaintext");
    let second = registry.validate_and_normalize_filename("notes", "plaintext");
    assert_eq!(first, second);

    // Feeding the result back in is stable.
    let again = registry
        .validate_and_normalize_filename(&first.unwrap(), "plaintext")
        .unwrap();
    assert_eq!(again, "notes.txt");
}

#[test]
fn forced_filename_overrides_any_input() {
    let registry = TemplateRegistry::from_raw([with_filename("meta", "metadata.xml")]);
    for raw in ["whatever.txt", "metadata", "", "METADATA.XML"] {
        assert_eq!(
            registry.validate_and_normalize_filename(raw, "meta").unwrap(),
            "metadata.xml"
        );
    }
}

#[test]
fn no_constraints_leaves_filename_unchanged() {
    let registry = TemplateRegistry::from_raw([template("any", "Anything")]);
    assert_eq!(
        registry.validate_and_normalize_filename("data.tsv", "any").unwrap(),
        "data.tsv"
    );
}

#[test]
fn unknown_template_and_empty_filename_are_rejected() {
    let registry = TemplateRegistry::from_raw([with_extension("plaintext", "txt")]);
    assert_eq!(
        registry.validate_and_normalize_filename("a.txt", "missing"),
        Err(ValidationError::NoSuchTemplate("missing".to_string()))
    );
    assert_eq!(
        registry.validate_and_normalize_filename("", "plaintext"),
        Err(ValidationError::EmptyFilename)
    );
}

#[test]
fn duplicate_ids_collapse_to_first_seen() {
    let registry = TemplateRegistry::from_raw([
        template("plaintext", "Plain text"),
        template("folia", "FoLiA XML"),
        template("plaintext", "Plain text (other profile)"),
    ]);

    let list = registry.selectable_list();
    let plaintext: Vec<_> = list
        .entries
        .iter()
        .filter(|(id, _)| id == "plaintext")
        .collect();
    assert_eq!(plaintext.len(), 1);
    assert_eq!(plaintext[0].1, "Plain text");
    assert_eq!(registry.len(), 2);
}

#[test]
fn selectable_list_is_sorted_by_label() {
    let registry = TemplateRegistry::from_raw([
        template("z", "zeta"),
        template("a", "Alpha"),
        template("m", "mu"),
    ]);
    let list = registry.selectable_list();
    let labels: Vec<_> = list.entries.iter().map(|(_, label)| label.as_str()).collect();
    assert_eq!(labels, vec!["Alpha", "mu", "zeta"]);
    assert!(list.needs_placeholder());
    assert_eq!(list.preselect, None);
}

#[test]
fn single_template_is_preselected() {
    let registry = TemplateRegistry::from_raw([
        template("plaintext", "Plain text"),
        template("plaintext", "Plain text"),
    ]);
    let list = registry.selectable_list();
    assert_eq!(list.preselect.as_deref(), Some("plaintext"));
    assert!(!list.needs_placeholder());
}

#[test]
fn lookup_finds_by_id() {
    let registry = TemplateRegistry::from_raw([template("plaintext", "Plain text")]);
    assert_eq!(registry.lookup("plaintext").unwrap().label, "Plain text");
    assert!(registry.lookup("folia").is_none());
}
