// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text message bodies for notification tasks.
//!
//! Placeholders are written `{name}` and filled from the task's variables.
//! Unknown placeholders are left as written.

use std::collections::BTreeMap;

use meetlr_core::TaskKind;

fn template_for(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::ConfirmationEmail => {
            "Hi {attendee_name},\n\nYour booking \"{title}\" is confirmed for {start_time} until {end_time}."
        }
        TaskKind::ReminderEmail => {
            "Hi {attendee_name},\n\nA reminder that \"{title}\" starts at {start_time}."
        }
        TaskKind::FollowUpEmail => {
            "Hi {attendee_name},\n\nThanks for attending \"{title}\". We hope it went well."
        }
        TaskKind::CancellationEmail => {
            "Hi {attendee_name},\n\nYour booking \"{title}\" on {start_time} has been cancelled."
        }
        TaskKind::RescheduleEmail => {
            "Hi {attendee_name},\n\n\"{title}\" has moved from {old_start_time} to {start_time}."
        }
        TaskKind::SmsNotification | TaskKind::WhatsAppNotification => {
            "Reminder: {title} at {start_time}"
        }
        TaskKind::SlotInvitationEmail => {
            "A slot for \"{title}\" at {start_time} is held for you until {expires_at}."
        }
        TaskKind::VideoMeetingCreate
        | TaskKind::VideoMeetingDelete
        | TaskKind::CalendarEventCreate
        | TaskKind::CalendarEventDelete
        | TaskKind::RefundPayment => "{title}",
    }
}

fn substitute(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match variables.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render the message body for `kind`.
pub fn render_body(kind: TaskKind, variables: &BTreeMap<String, String>) -> String {
    let mut body = substitute(template_for(kind), variables);
    if let Some(reason) = variables.get("reason") {
        body.push_str("\n\nReason: ");
        body.push_str(reason);
    }
    if kind != TaskKind::CancellationEmail
        && let Some(url) = variables.get("meeting_url")
    {
        body.push_str("\n\nJoin: ");
        body.push_str(url);
    }
    body
}
