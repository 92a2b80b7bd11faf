use strum::{AsRefStr, Display};

use crate::models::application::{non_blank, ApplicationProfile};

/// How to find an element on the page. Strategies are tried in order and the
/// first one that acts on an element wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    /// A visible button or link whose text contains the string.
    ButtonText(&'static str),
    /// Submit the page's first form directly.
    FormSubmit,
}

/// Profile fields the engine fills without asking the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum KnownField {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Location,
    LinkedIn,
    Github,
    Portfolio,
    CoverLetter,
}

impl KnownField {
    pub fn locators(self) -> &'static [Locator] {
        use Locator::Css;
        match self {
            Self::FirstName => &[
                Css("input[name=\"firstName\"]"),
                Css("input[name=\"first_name\"]"),
                Css("input[id*=\"first\"]"),
                Css("input[id*=\"firstName\"]"),
                Css("input[placeholder*=\"First\"]"),
                Css("#first-name"),
                Css("#firstName"),
            ],
            Self::LastName => &[
                Css("input[name=\"lastName\"]"),
                Css("input[name=\"last_name\"]"),
                Css("input[id*=\"last\"]"),
                Css("input[id*=\"lastName\"]"),
                Css("input[placeholder*=\"Last\"]"),
                Css("#last-name"),
                Css("#lastName"),
            ],
            Self::FullName => &[
                Css("input[name=\"name\"]"),
                Css("input[name=\"full_name\"]"),
                Css("input[name=\"fullName\"]"),
                Css("input[id*=\"name\"]"),
                Css("input[placeholder*=\"Name\"]"),
                Css("#name"),
                Css("#full-name"),
            ],
            Self::Email => &[
                Css("input[type=\"email\"]"),
                Css("input[name=\"email\"]"),
                Css("input[name=\"emailAddress\"]"),
                Css("input[id*=\"email\"]"),
                Css("input[placeholder*=\"Email\"]"),
                Css("#email"),
            ],
            Self::Phone => &[
                Css("input[type=\"tel\"]"),
                Css("input[name=\"phone\"]"),
                Css("input[name=\"phone_number\"]"),
                Css("input[name=\"phoneNumber\"]"),
                Css("input[id*=\"phone\"]"),
                Css("input[placeholder*=\"Phone\"]"),
                Css("#phone"),
            ],
            Self::Location => &[
                Css("input[name=\"location\"]"),
                Css("input[name=\"city\"]"),
                Css("input[name=\"address\"]"),
                Css("input[id*=\"location\"]"),
                Css("input[id*=\"city\"]"),
                Css("input[placeholder*=\"Location\"]"),
                Css("#location"),
            ],
            Self::LinkedIn => &[
                Css("input[name=\"linkedin\"]"),
                Css("input[name=\"linkedIn\"]"),
                Css("input[name=\"linkedin_url\"]"),
                Css("input[id*=\"linkedin\"]"),
                Css("input[placeholder*=\"LinkedIn\"]"),
                Css("#linkedin"),
            ],
            Self::Github => &[
                Css("input[name=\"github\"]"),
                Css("input[name=\"github_url\"]"),
                Css("input[id*=\"github\"]"),
                Css("input[placeholder*=\"GitHub\"]"),
                Css("#github"),
            ],
            Self::Portfolio => &[
                Css("input[name=\"portfolio\"]"),
                Css("input[name=\"portfolio_url\"]"),
                Css("input[name=\"website\"]"),
                Css("input[id*=\"portfolio\"]"),
                Css("input[placeholder*=\"Portfolio\"]"),
                Css("#portfolio"),
            ],
            Self::CoverLetter => &[
                Css("textarea[name=\"coverLetter\"]"),
                Css("textarea[name=\"cover_letter\"]"),
                Css("textarea[name=\"coverLetterText\"]"),
                Css("textarea[id*=\"cover\"]"),
                Css("textarea[placeholder*=\"Cover\"]"),
                Css("#cover-letter"),
                Css("textarea"),
            ],
        }
    }
}

/// A value to put into the page and where to look for its control.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: KnownField,
    pub value: String,
}

impl FieldSpec {
    pub fn locators(&self) -> &'static [Locator] {
        self.field.locators()
    }
}

/// Fields to fill for `profile`, in fill order. Blank values are left out.
/// Full name is only used when no first name can be derived.
pub fn field_specs(profile: &ApplicationProfile) -> Vec<FieldSpec> {
    let first_name = profile.first_name();
    let last_name = profile.last_name();
    let full_name = if first_name.is_none() {
        non_blank(Some(profile.full_name.as_str())).map(str::to_string)
    } else {
        None
    };

    let candidates = [
        (KnownField::FirstName, first_name),
        (KnownField::LastName, last_name),
        (KnownField::FullName, full_name),
        (KnownField::Email, non_blank(Some(profile.email.as_str())).map(str::to_string)),
        (KnownField::Phone, non_blank(Some(profile.phone.as_str())).map(str::to_string)),
        (KnownField::Location, owned(profile.location.as_deref())),
        (KnownField::LinkedIn, owned(profile.linked_in.as_deref())),
        (KnownField::Github, owned(profile.github.as_deref())),
        (KnownField::Portfolio, owned(profile.portfolio.as_deref())),
        (KnownField::CoverLetter, owned(profile.cover_letter.as_deref())),
    ];

    candidates
        .into_iter()
        .filter_map(|(field, value)| value.map(|value| FieldSpec { field, value }))
        .collect()
}

fn owned(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

/// Submit strategies, most specific first.
pub const SUBMIT_STRATEGIES: &[Locator] = &[
    Locator::Css("button[type=\"submit\"]"),
    Locator::Css("input[type=\"submit\"]"),
    Locator::Css("button[id*=\"submit\"]"),
    Locator::Css("button[id*=\"apply\"]"),
    Locator::Css("button[class*=\"submit\"]"),
    Locator::Css("button[class*=\"apply\"]"),
    Locator::Css("[data-testid*=\"submit\"]"),
    Locator::Css("[data-testid*=\"apply\"]"),
    Locator::ButtonText("Submit"),
    Locator::ButtonText("Apply"),
    Locator::ButtonText("Send"),
    Locator::FormSubmit,
];

/// Apply buttons on a job board listing.
pub const APPLY_LINK_STRATEGIES: &[Locator] = &[
    Locator::Css("a[href*=\"apply\"]"),
    Locator::Css("a[href*=\"application\"]"),
    Locator::Css("a[href*=\"careers\"]"),
    Locator::Css("[data-testid*=\"apply\"]"),
    Locator::Css("[data-automation-id*=\"apply\"]"),
    Locator::Css(".apply-button"),
    Locator::Css(".apply-link"),
    Locator::Css("#apply-button"),
    Locator::Css("#apply-link"),
    Locator::ButtonText("Easy Apply"),
    Locator::ButtonText("Apply"),
];

/// File inputs a resume can be attached to.
pub const RESUME_INPUTS: &[&str] = &[
    "input[type=\"file\"]",
    "input[name*=\"resume\"]",
    "input[name*=\"cv\"]",
    "input[id*=\"resume\"]",
    "input[id*=\"cv\"]",
    "input[accept*=\"pdf\"]",
    "input[accept*=\"doc\"]",
];

/// Body phrases that suggest the application went through.
pub const CONFIRMATION_PHRASES: &[&str] = &[
    "thank you",
    "application received",
    "application submitted",
    "successfully applied",
    "confirmation",
    "your application has been",
    "we have received your application",
];

pub fn looks_confirmed(body_text: &str) -> bool {
    let lower = body_text.to_lowercase();
    CONFIRMATION_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(specs: &[FieldSpec]) -> Vec<KnownField> {
        specs.iter().map(|s| s.field).collect()
    }

    #[test]
    fn test_split_name_skips_full_name() {
        let profile = ApplicationProfile {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: " ".to_string(),
            ..Default::default()
        };
        let specs = field_specs(&profile);
        assert_eq!(
            fields(&specs),
            vec![KnownField::FirstName, KnownField::LastName, KnownField::Email]
        );
        assert_eq!(specs[0].value, "Ada");
        assert_eq!(specs[1].value, "Lovelace");
    }

    #[test]
    fn test_optional_fields_included_when_present() {
        let profile = ApplicationProfile {
            full_name: "Cher".to_string(),
            linked_in: Some("https://linkedin.com/in/cher".to_string()),
            github: Some("".to_string()),
            cover_letter: Some("Dear hiring manager".to_string()),
            ..Default::default()
        };
        assert_eq!(
            fields(&field_specs(&profile)),
            vec![KnownField::FirstName, KnownField::LinkedIn, KnownField::CoverLetter]
        );
    }

    #[test]
    fn test_cover_letter_falls_back_to_any_textarea() {
        let locators = KnownField::CoverLetter.locators();
        assert_eq!(locators.last(), Some(&Locator::Css("textarea")));
    }

    #[test]
    fn test_submit_strategies_end_with_form_submit() {
        assert_eq!(SUBMIT_STRATEGIES.first(), Some(&Locator::Css("button[type=\"submit\"]")));
        assert_eq!(SUBMIT_STRATEGIES.last(), Some(&Locator::FormSubmit));
    }

    #[test]
    fn test_confirmation_phrases() {
        assert!(looks_confirmed("Thank you for applying!"));
        assert!(!looks_confirmed("Please complete all required fields"));
    }

    #[test]
    fn test_field_names_are_snake_case() {
        assert_eq!(KnownField::LinkedIn.to_string(), "linked_in");
        assert_eq!(KnownField::CoverLetter.as_ref(), "cover_letter");
    }
}
