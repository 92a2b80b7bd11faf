use serde::{Deserialize, Serialize};

/// One selectable answer for a select or radio question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerOption {
    pub value: String,
    pub text: String,
}

/// A form question the engine could not answer from the applicant profile.
///
/// `index` is the control's position in the page-wide control enumeration at
/// detection time. It is only meaningful while the page keeps the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedQuestion {
    pub index: usize,
    pub field_type: String,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub question: String,
    pub options: Vec<AnswerOption>,
    pub required: bool,
    pub selector: String,
}

/// Snapshot of one interactive element, as read from the live DOM.
///
/// The browser collects everything the detector needs up front so the
/// classification itself runs without touching the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FormControl {
    pub index: usize,
    /// Lower-case tag name: `input`, `textarea` or `select`.
    pub tag: String,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub value: String,
    pub checked: bool,
    pub required: bool,
    pub placeholder: String,
    pub class_name: String,
    /// Inside nav/header/search containers.
    pub in_navigation: bool,
    /// Inside a form-like container (form, role=form, application classes).
    pub in_form: bool,
    /// Inside footer/aside/sidebar containers.
    pub in_non_form_area: bool,
    pub label_for_text: Option<String>,
    pub wrapping_label_text: Option<String>,
    pub legend_text: Option<String>,
    pub preceding_text: Option<String>,
    pub parent_text: Option<String>,
    /// Select options with a non-empty value.
    pub options: Vec<AnswerOption>,
    /// Radio only: label-for text, else adjacent text node, else parent text.
    pub option_label: Option<String>,
}
