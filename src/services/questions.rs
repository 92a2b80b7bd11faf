//! Classifies a snapshot of form controls into questions the applicant
//! still has to answer.
//!
//! The classifier is a pure function of the snapshot. It never touches the
//! page, so the same input always yields the same questions.

use std::collections::HashSet;

use crate::models::question::{AnswerOption, DetectedQuestion, FormControl};

/// Concepts the engine fills from the profile. Questions mentioning them are
/// only surfaced when the control is required.
const PROFILE_CONCEPTS: &[&str] = &[
    "email",
    "name",
    "phone",
    "address",
    "city",
    "zip",
    "state",
    "country",
    "linkedin",
    "github",
    "portfolio",
    "website",
    "cover letter",
    "resume",
    "cv",
];

const MIN_QUESTION_CHARS: usize = 6;
const MAX_QUESTION_CHARS: usize = 199;

/// Questions among `controls` that need user input, in document order.
pub fn detect_questions(controls: &[FormControl]) -> Vec<DetectedQuestion> {
    let mut seen_groups = HashSet::new();
    let mut questions = Vec::new();

    for control in controls {
        let question = match control.input_type.as_str() {
            "radio" => {
                if control.name.is_empty() || !seen_groups.insert(control.name.as_str()) {
                    continue;
                }
                radio_group_question(control, controls)
            }
            "checkbox" => continue,
            _ => single_control_question(control),
        };
        if let Some(q) = question {
            questions.push(q);
        }
    }

    questions
}

fn radio_group_question(first: &FormControl, controls: &[FormControl]) -> Option<DetectedQuestion> {
    let group: Vec<&FormControl> = controls
        .iter()
        .filter(|c| c.input_type == "radio" && c.name == first.name)
        .collect();
    if group.iter().any(|c| c.checked) {
        return None;
    }

    let text = first_text([
        first.label_for_text.as_deref(),
        first.legend_text.as_deref(),
        first.preceding_text.as_deref().filter(|t| is_nearby_text(t)),
    ])?;

    let options = group
        .iter()
        .map(|c| AnswerOption {
            value: c.value.clone(),
            text: c
                .option_label
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(&c.value)
                .to_string(),
        })
        .collect();

    reportable(&text, first.required).then(|| DetectedQuestion {
        index: first.index,
        field_type: "input".to_string(),
        input_type: "radio".to_string(),
        name: first.name.clone(),
        id: first.id.clone(),
        question: text,
        options,
        required: first.required,
        selector: format!("input[type=\"radio\"][name=\"{}\"]", first.name),
    })
}

fn single_control_question(control: &FormControl) -> Option<DetectedQuestion> {
    if !control.value.trim().is_empty() || is_search_or_navigation(control) {
        return None;
    }
    if !control.in_form && control.in_non_form_area {
        return None;
    }

    let placeholder = Some(control.placeholder.as_str()).filter(|p| {
        let lower = p.to_lowercase();
        !lower.contains("search") && !lower.contains("find")
    });
    let text = first_text([
        control.label_for_text.as_deref(),
        control.wrapping_label_text.as_deref(),
        control.legend_text.as_deref(),
        control.preceding_text.as_deref().filter(|t| is_nearby_text(t)),
        control.parent_text.as_deref(),
        placeholder,
    ])?;

    if !reportable(&text, control.required) {
        return None;
    }

    let selector = if !control.id.is_empty() {
        format!("#{}", control.id)
    } else if !control.name.is_empty() {
        format!("[name=\"{}\"]", control.name)
    } else {
        String::new()
    };

    Some(DetectedQuestion {
        index: control.index,
        field_type: control.tag.clone(),
        input_type: if control.input_type.is_empty() {
            "text".to_string()
        } else {
            control.input_type.clone()
        },
        name: control.name.clone(),
        id: control.id.clone(),
        question: text,
        options: control.options.clone(),
        required: control.required,
        selector,
    })
}

/// First candidate that is non-blank after trimming.
fn first_text<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Text taken from a neighbouring element is only trusted at label length.
fn is_nearby_text(text: &str) -> bool {
    let len = text.trim().chars().count();
    len > 3 && len < 200
}

fn is_search_or_navigation(control: &FormControl) -> bool {
    control.input_type == "search"
        || control.in_navigation
        || [
            &control.name,
            &control.id,
            &control.placeholder,
            &control.class_name,
        ]
        .iter()
        .any(|v| v.to_lowercase().contains("search"))
}

fn is_search_phrase(lower: &str) -> bool {
    lower == "search" || lower == "find" || lower.contains("search for")
}

fn mentions_profile_concept(lower: &str) -> bool {
    PROFILE_CONCEPTS.iter().any(|c| lower.contains(c))
}

fn reportable(text: &str, required: bool) -> bool {
    let len = text.chars().count();
    let lower = text.to_lowercase();
    (MIN_QUESTION_CHARS..=MAX_QUESTION_CHARS).contains(&len)
        && !is_search_phrase(&lower)
        && (required || !mentions_profile_concept(&lower))
}
