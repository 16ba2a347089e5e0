//! Booking comment stored on the scheduled event.
//!
//! The comment carries the session title and the payment transaction ID so a
//! cancellation notice can point at the payment to refund.

const TRANSACTION_TITLE: &str = "Transaction ID: ";

/// Compose the comment attached to a booking.
pub fn format_event_comment(transaction_id: &str, session_title: &str) -> String {
    format!("{}\n{}{}", session_title, TRANSACTION_TITLE, transaction_id)
}

/// Last transaction ID mentioned in the comment, or an empty string.
pub fn transaction_id_from_comment(comment: &str) -> String {
    comment
        .match_indices(TRANSACTION_TITLE)
        .filter_map(|(index, _)| {
            let id: String = comment[index + TRANSACTION_TITLE.len()..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            (!id.is_empty()).then_some(id)
        })
        .last()
        .unwrap_or_default()
}

/// Session title, i.e. everything before the first transaction marker.
pub fn session_title_from_comment(comment: &str) -> &str {
    comment
        .split(TRANSACTION_TITLE)
        .next()
        .unwrap_or_default()
        .trim()
}
