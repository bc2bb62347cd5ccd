//! Booking Validation
//!
//! Turns a [`BookingDraft`] into a [`ValidatedBooking`] without touching storage. Every
//! rule is checked so callers can show the full list, while `first` carries the single
//! message to surface when only one fits.

use std::fmt;

use jiff::{SignedDuration, Timestamp};
use lettre::Address;
use thiserror::Error;
use url::Url;

use crate::domain::{
    availability::slots::{MAX_DURATION_MINUTES, MIN_DURATION_MINUTES, TimeRange},
    bookings::{
        data::{BookingDraft, ContactDraft},
        records::ProjectDetails,
        status::BookingKind,
    },
    clients::{data::ClientContact, records::ClientUuid},
    providers::records::ProviderUuid,
};

pub const MAX_NAME_CHARS: usize = 120;
pub const MAX_PHONE_CHARS: usize = 32;
pub const MAX_LONG_TEXT_CHARS: usize = 2000;
pub const MAX_SHORT_TEXT_CHARS: usize = 200;
pub const MAX_PRICE: u64 = 10_000_000;
pub const MAX_REFERENCE_PHOTOS: usize = 10;

/// One broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", first.message)]
pub struct ValidationError {
    pub first: Violation,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        let first = violations.first()?.clone();

        Some(Self { first, violations })
    }
}

/// Who the booking is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientReference {
    Existing(ClientUuid),
    Contact(ClientContact),
}

/// A booking request that passed every rule, with free text sanitised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub provider_uuid: ProviderUuid,
    pub client: ClientReference,
    pub range: TimeRange,
    pub duration_minutes: u32,
    pub kind: BookingKind,
    pub price: u64,
    /// Zero when the request named no deposit.
    pub deposit_amount: u64,
    pub project: ProjectDetails,
}

/// Validate `draft` against `now`.
///
/// # Errors
///
/// Returns every violated rule, first one singled out.
pub fn validate(draft: BookingDraft, now: Timestamp) -> Result<ValidatedBooking, ValidationError> {
    let mut violations = Vec::new();

    if draft.provider_uuid.is_none() {
        violations.push(Violation::new("provider_uuid", "a provider is required"));
    }

    let client = validate_client(draft.client_uuid, draft.client, &mut violations);
    let range = validate_range(draft.starts_at, draft.duration_minutes, now, &mut violations);

    if draft.kind.is_none() {
        violations.push(Violation::new("kind", "a booking kind is required"));
    }

    let pricing = validate_pricing(draft.price, draft.deposit_amount, &mut violations);

    let project = ProjectDetails {
        description: bounded_text(
            "description",
            draft.description.as_deref(),
            MAX_LONG_TEXT_CHARS,
            &mut violations,
        ),
        zone: bounded_text("zone", draft.zone.as_deref(), MAX_SHORT_TEXT_CHARS, &mut violations),
        size: bounded_text("size", draft.size.as_deref(), MAX_SHORT_TEXT_CHARS, &mut violations),
        style: bounded_text("style", draft.style.as_deref(), MAX_SHORT_TEXT_CHARS, &mut violations),
        reference_photos: validate_photos(draft.reference_photos, &mut violations),
        notes: bounded_text(
            "notes",
            draft.notes.as_deref(),
            MAX_LONG_TEXT_CHARS,
            &mut violations,
        ),
    };

    if let Some(error) = ValidationError::from_violations(violations) {
        return Err(error);
    }

    match (draft.provider_uuid, client, range, draft.kind, pricing) {
        (
            Some(provider_uuid),
            Some(client),
            Some((range, duration_minutes)),
            Some(kind),
            Some((price, deposit_amount)),
        ) => Ok(ValidatedBooking {
            provider_uuid,
            client,
            range,
            duration_minutes,
            kind,
            price,
            deposit_amount,
            project,
        }),
        _ => Err(single("booking", "the booking request is incomplete")),
    }
}

fn validate_range(
    starts_at: Option<Timestamp>,
    duration_minutes: Option<i64>,
    now: Timestamp,
    violations: &mut Vec<Violation>,
) -> Option<(TimeRange, u32)> {
    let starts_at = match starts_at {
        Some(starts_at) if starts_at > now => Some(starts_at),
        Some(_) => {
            violations.push(Violation::new(
                "starts_at",
                "the booking date must be in the future",
            ));
            None
        }
        None => {
            violations.push(Violation::new("starts_at", "a start time is required"));
            None
        }
    };

    let duration_minutes = match duration_minutes.map(u32::try_from) {
        Some(Ok(minutes)) if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) => {
            Some(minutes)
        }
        Some(_) => {
            violations.push(Violation::new(
                "duration_minutes",
                format!(
                    "the duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
                ),
            ));
            None
        }
        None => {
            violations.push(Violation::new("duration_minutes", "a duration is required"));
            None
        }
    };

    let (starts_at, duration_minutes) = (starts_at?, duration_minutes?);

    match starts_at.checked_add(SignedDuration::from_mins(i64::from(duration_minutes))) {
        Ok(ends_at) => Some((TimeRange::new(starts_at, ends_at), duration_minutes)),
        Err(error) => {
            violations.push(Violation::new("starts_at", error.to_string()));
            None
        }
    }
}

fn validate_pricing(
    price: Option<i64>,
    deposit_amount: Option<i64>,
    violations: &mut Vec<Violation>,
) -> Option<(u64, u64)> {
    let price = match price.map(u64::try_from) {
        Some(Ok(price)) if (1..=MAX_PRICE).contains(&price) => Some(price),
        Some(_) => {
            violations.push(Violation::new(
                "price",
                format!("the price must be between 1 and {MAX_PRICE}"),
            ));
            None
        }
        None => {
            violations.push(Violation::new("price", "a price is required"));
            None
        }
    };

    let deposit_amount = match deposit_amount.map(u64::try_from) {
        None => Some(0),
        Some(Ok(deposit)) if price.is_none_or(|price| deposit <= price) => Some(deposit),
        Some(Ok(_)) => {
            violations.push(Violation::new(
                "deposit_amount",
                "the deposit cannot exceed the price",
            ));
            None
        }
        Some(Err(_)) => {
            violations.push(Violation::new(
                "deposit_amount",
                "the deposit cannot be negative",
            ));
            None
        }
    };

    Some((price?, deposit_amount?))
}

fn single(field: &str, message: impl Into<String>) -> ValidationError {
    let violation = Violation::new(field, message);

    ValidationError {
        first: violation.clone(),
        violations: vec![violation],
    }
}

fn validate_client(
    client_uuid: Option<ClientUuid>,
    contact: Option<ContactDraft>,
    violations: &mut Vec<Violation>,
) -> Option<ClientReference> {
    match (client_uuid, contact) {
        (Some(_), Some(_)) => {
            violations.push(Violation::new(
                "client",
                "give either an existing client or contact details, not both",
            ));
            None
        }
        (Some(uuid), None) => Some(ClientReference::Existing(uuid)),
        (None, None) => {
            violations.push(Violation::new("client", "client details are required"));
            None
        }
        (None, Some(contact)) => {
            let before = violations.len();

            let email = contact.email.trim().to_string();

            if email.parse::<Address>().is_err() {
                violations.push(Violation::new(
                    "client.email",
                    "the email address is not valid",
                ));
            }

            let name = strip_markup(&contact.name);

            if name.is_empty() {
                violations.push(Violation::new("client.name", "a name is required"));
            } else if name.chars().count() > MAX_NAME_CHARS {
                violations.push(Violation::new(
                    "client.name",
                    format!("the name must be at most {MAX_NAME_CHARS} characters"),
                ));
            }

            let phone = bounded_text(
                "client.phone",
                contact.phone.as_deref(),
                MAX_PHONE_CHARS,
                violations,
            );

            (violations.len() == before).then_some(ClientReference::Contact(ClientContact {
                email,
                name,
                phone,
            }))
        }
    }
}

fn bounded_text(
    field: &str,
    value: Option<&str>,
    max_chars: usize,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    let text = strip_markup(value?);

    if text.is_empty() {
        return None;
    }

    if text.chars().count() > max_chars {
        violations.push(Violation::new(
            field,
            format!("must be at most {max_chars} characters"),
        ));

        return None;
    }

    Some(text)
}

fn validate_photos(photos: Vec<String>, violations: &mut Vec<Violation>) -> Vec<String> {
    if photos.len() > MAX_REFERENCE_PHOTOS {
        violations.push(Violation::new(
            "reference_photos",
            format!("at most {MAX_REFERENCE_PHOTOS} reference photos are allowed"),
        ));

        return Vec::new();
    }

    let mut accepted = Vec::with_capacity(photos.len());

    for (index, photo) in photos.into_iter().enumerate() {
        let photo = photo.trim();

        match Url::parse(photo) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
                accepted.push(url.to_string());
            }
            _ => violations.push(Violation::new(
                format!("reference_photos[{index}]"),
                "must be an absolute http or https URL",
            )),
        }
    }

    accepted
}

/// Remove markup from user text and trim it. Content of `script` and `style`
/// elements is dropped along with the tags.
///
/// Passes repeat until nothing more is removed, so tags split around inner tags
/// (`<<b>script>`) cannot reassemble once the inner ones are gone.
pub fn strip_markup(input: &str) -> String {
    let mut current = strip_tags(input);

    loop {
        let next = strip_tags(&current);

        if next == current {
            return next.trim().to_string();
        }

        current = next;
    }
}

fn strip_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some((text, after_open)) = rest.split_once('<') {
        output.push_str(text);

        if !after_open.starts_with(|c: char| c.is_ascii_alphabetic() || c == '/' || c == '!') {
            output.push('<');
            rest = after_open;
            continue;
        }

        let Some((tag, after_tag)) = after_open.split_once('>') else {
            rest = "";
            break;
        };

        rest = match tag_name(tag).as_str() {
            name @ ("script" | "style") if !tag.starts_with('/') => skip_element(after_tag, name),
            _ => after_tag,
        };
    }

    output.push_str(rest);

    output
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn skip_element<'a>(content: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");

    content
        .to_ascii_lowercase()
        .find(&closing)
        .and_then(|index| content.get(index..))
        .and_then(|closing_tag| closing_tag.split_once('>'))
        .map_or("", |(_, after)| after)
}
