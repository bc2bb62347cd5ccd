//! Message templates.
//!
//! Every user-supplied value is HTML-escaped before it reaches the HTML body; the plain
//! text body carries it verbatim.

use std::fmt::Write as _;

use jiff::{Timestamp, tz::TimeZone};

use crate::domain::{
    bookings::records::BookingRecord, clients::records::ClientRecord,
    providers::records::ProviderRecord,
};

use super::mailer::Email;

/// Everything a booking message talks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingNotice {
    pub booking: BookingRecord,
    pub provider: ProviderRecord,
    pub client: ClientRecord,
}

/// Renders the four booking messages in the studio's time zone and currency.
#[derive(Debug, Clone)]
pub struct Templates {
    time_zone: TimeZone,
    currency: String,
}

impl Templates {
    #[must_use]
    pub fn new(time_zone: TimeZone, currency: impl Into<String>) -> Self {
        Self {
            time_zone,
            currency: currency.into(),
        }
    }

    /// Tells the provider a booking was confirmed.
    pub fn provider_alert(&self, notice: &BookingNotice) -> Email {
        let BookingNotice {
            booking,
            provider,
            client,
        } = notice;

        let when = self.local_time(booking.starts_at);
        let deposit = self.amount(booking.deposit_amount);

        let mut text = format!(
            "New confirmed booking\n\nClient: {} <{}>\nWhen: {when}\nDuration: {} minutes\nKind: {}\nDeposit paid: {deposit}\n",
            client.name, client.email, booking.duration_minutes, booking.kind,
        );

        if let Some(phone) = &client.phone {
            let _ = writeln!(text, "Phone: {phone}");
        }

        for (label, value) in project_lines(booking) {
            let _ = writeln!(text, "{label}: {value}");
        }

        let mut rows = vec![
            ("Client", escape_html(&client.name)),
            ("Email", escape_html(&client.email)),
            ("When", when.clone()),
            ("Duration", format!("{} minutes", booking.duration_minutes)),
            ("Kind", booking.kind.to_string()),
            ("Deposit paid", deposit),
        ];

        if let Some(phone) = &client.phone {
            rows.push(("Phone", escape_html(phone)));
        }

        rows.extend(
            project_lines(booking)
                .into_iter()
                .map(|(label, value)| (label, escape_html(value))),
        );

        Email {
            to: provider.email.clone(),
            subject: format!("New booking: {} on {when}", client.name),
            html: page("New confirmed booking", &table(&rows)),
            text,
            reply_to: Some(client.email.clone()),
        }
    }

    /// Tells the client their booking is confirmed.
    pub fn client_confirmation(&self, notice: &BookingNotice) -> Email {
        let BookingNotice {
            booking,
            provider,
            client,
        } = notice;

        let when = self.local_time(booking.starts_at);
        let deposit = self.amount(booking.deposit_amount);
        let remaining = self.amount(booking.price.saturating_sub(booking.deposit_amount));

        let text = format!(
            "Hi {},\n\nYour appointment with {} on {when} is confirmed.\nDeposit received: {deposit}\nRemaining on the day: {remaining}\n\nReply to this email if anything changes.\n",
            client.name, provider.name,
        );

        let body = format!(
            "<p>Hi {},</p><p>Your appointment with <strong>{}</strong> on <strong>{when}</strong> is confirmed.</p>{}<p>Reply to this email if anything changes.</p>",
            escape_html(&client.name),
            escape_html(&provider.name),
            table(&[
                ("Deposit received", deposit),
                ("Remaining on the day", remaining)
            ]),
        );

        Email {
            to: client.email.clone(),
            subject: format!("Your booking with {} is confirmed", provider.name),
            html: page("Booking confirmed", &body),
            text,
            reply_to: Some(provider.email.clone()),
        }
    }

    /// Day-before reminder to the client.
    pub fn reminder(&self, notice: &BookingNotice) -> Email {
        let BookingNotice {
            booking,
            provider,
            client,
        } = notice;

        let when = self.local_time(booking.starts_at);

        let text = format!(
            "Hi {},\n\nA reminder that your appointment with {} is tomorrow, {when}.\nPlease eat beforehand and get a good night's sleep.\n",
            client.name, provider.name,
        );

        let body = format!(
            "<p>Hi {},</p><p>A reminder that your appointment with <strong>{}</strong> is tomorrow, <strong>{when}</strong>.</p><p>Please eat beforehand and get a good night's sleep.</p>",
            escape_html(&client.name),
            escape_html(&provider.name),
        );

        Email {
            to: client.email.clone(),
            subject: format!("Reminder: your appointment with {} tomorrow", provider.name),
            html: page("See you tomorrow", &body),
            text,
            reply_to: Some(provider.email.clone()),
        }
    }

    /// Post-session request for a review.
    pub fn review_request(&self, notice: &BookingNotice) -> Email {
        let BookingNotice {
            provider, client, ..
        } = notice;

        let text = format!(
            "Hi {},\n\nThank you for your session with {}. We would love to hear how it went, just reply to this email.\n",
            client.name, provider.name,
        );

        let body = format!(
            "<p>Hi {},</p><p>Thank you for your session with <strong>{}</strong>. We would love to hear how it went, just reply to this email.</p>",
            escape_html(&client.name),
            escape_html(&provider.name),
        );

        Email {
            to: client.email.clone(),
            subject: format!("How was your session with {}?", provider.name),
            html: page("Thank you", &body),
            text,
            reply_to: Some(provider.email.clone()),
        }
    }

    fn local_time(&self, at: Timestamp) -> String {
        at.to_zoned(self.time_zone.clone())
            .strftime("%A %-d %B %Y, %H:%M")
            .to_string()
    }

    fn amount(&self, minor: u64) -> String {
        format!(
            "{}.{:02} {}",
            minor / 100,
            minor % 100,
            self.currency.to_uppercase()
        )
    }
}

fn project_lines(booking: &BookingRecord) -> Vec<(&'static str, &str)> {
    let project = &booking.project;

    [
        ("Description", project.description.as_deref()),
        ("Zone", project.zone.as_deref()),
        ("Size", project.size.as_deref()),
        ("Style", project.style.as_deref()),
        ("Notes", project.notes.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| Some((label, value?)))
    .chain(
        project
            .reference_photos
            .iter()
            .map(|url| ("Reference", url.as_str())),
    )
    .collect()
}

fn table(rows: &[(&str, String)]) -> String {
    let mut html = String::from("<table>");

    for (label, value) in rows {
        let _ = write!(html, "<tr><th align=\"left\">{label}</th><td>{value}</td></tr>");
    }

    html.push_str("</table>");
    html
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><title>{title}</title></head><body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\"><div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\"><h2>{title}</h2>{body}</div></body></html>"
    )
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }

    escaped
}
