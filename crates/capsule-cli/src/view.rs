//! Plain-text rendering of evaluator output.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use capsule_core::format::{format_date, format_datetime, status_message, time_remaining};
use capsule_core::{Classification, Status};
use capsule_types::api::CapsuleResponse;
use capsule_types::models::PublicCapsule;

use crate::actions::{Card, Listing, Revealed};

const UNTITLED: &str = "(untitled)";

pub fn render_listing(listing: &Listing, now: DateTime<Utc>, logged_in: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== Other people's capsules ==");
    if listing.public.is_empty() {
        if listing.total_public > 0 {
            let _ = writeln!(
                out,
                "Page {} is past the end; there are {} page(s).",
                listing.page, listing.total_pages
            );
        } else {
            let _ = writeln!(out, "No public capsules yet...");
        }
    }
    for card in &listing.public {
        out.push_str(&render_public_card(card, now));
    }
    if listing.total_public > u64::from(listing.page_size) {
        let _ = writeln!(
            out,
            "Page {} of {} (use --page N)",
            listing.page, listing.total_pages
        );
    }

    if !logged_in {
        let _ = writeln!(out, "\nLog in to see and create your own capsules.");
        return out;
    }

    let _ = writeln!(out, "\n== My capsules ==");
    if listing.mine.is_empty() {
        let _ = writeln!(out, "You haven't made any capsules yet. Create one with `capsule create`.");
    }
    for card in &listing.mine {
        out.push_str(&render_owned_card(card, now));
    }
    out
}

fn render_public_card(card: &Card<PublicCapsule>, now: DateTime<Utc>) -> String {
    let c = &card.capsule;
    let date_line = if c.is_opened {
        "Opened".to_string()
    } else {
        opens_line(c.open_at, card.class, now)
    };
    format!(
        "[{:<6}] Secret capsule by {}\n         {} | {}\n",
        card.class.status.label(),
        c.author,
        date_line,
        status_message(card.class.status, card.class.feed),
    )
}

fn render_owned_card(card: &Card<CapsuleResponse>, now: DateTime<Utc>) -> String {
    let c = &card.capsule;
    let date_line = match c.opened_at {
        Some(at) => format!("Opened: {}", format_datetime(at)),
        None => opens_line(c.open_at, card.class, now),
    };

    let mut actions = Vec::new();
    if card.class.can_open {
        actions.push("open");
    }
    if card.class.can_delete {
        actions.push("delete");
    }

    let mut out = format!(
        "[{:<6}] {}  ({})\n         {} | {}\n",
        card.class.status.label(),
        c.title.as_deref().unwrap_or(UNTITLED),
        c.id,
        date_line,
        status_message(card.class.status, card.class.feed),
    );
    if !actions.is_empty() {
        let _ = writeln!(out, "         actions: {}", actions.join(", "));
    }
    out
}

fn opens_line(open_at: DateTime<Utc>, class: Classification, now: DateTime<Utc>) -> String {
    match (class.status, time_remaining(open_at, now)) {
        (Status::Sealed, Some(left)) => format!("Opens: {} (in {})", format_date(open_at), left),
        _ => format!("Opens: {}", format_date(open_at)),
    }
}

pub fn render_revealed(revealed: &Revealed) -> String {
    let c = &revealed.capsule;
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", c.title.as_deref().unwrap_or(UNTITLED));
    let _ = writeln!(out, "{}", revealed.message);
    let _ = write!(out, "\nSealed: {}", format_date(c.created_at));
    if let Some(at) = c.opened_at {
        let _ = write!(out, " | Opened: {}", format_datetime(at));
    }
    if revealed.already_opened {
        let _ = write!(out, " (previously opened)");
    }
    out.push('\n');
    out
}

pub fn render_created(capsule: &CapsuleResponse) -> String {
    format!(
        "Sealed capsule {} until {}.\n",
        capsule.id,
        format_datetime(capsule.open_at)
    )
}
