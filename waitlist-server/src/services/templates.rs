//! Guest message templates
//!
//! Template storage and formatting is this core's responsibility;
//! delivery is the gateway's. Variables: guest name, party size,
//! restaurant name, grace-period minutes, wait time.

/// Check-in confirmation with the quoted wait bracket
pub fn check_in(
    guest_name: &str,
    party_size: i64,
    restaurant_name: &str,
    range_low: i64,
    range_high: i64,
) -> String {
    format!(
        "Hi {guest_name}! You're on the list at {restaurant_name} for {party_size}. \
         Current wait is about {range_low}-{range_high} minutes. We'll text you when \
         your table is ready."
    )
}

/// Table-ready notification, opens the grace period
pub fn table_ready(guest_name: &str, restaurant_name: &str, grace_min: i64) -> String {
    format!(
        "{guest_name}, your table at {restaurant_name} is ready! Reply Y to confirm \
         or N to cancel. Please arrive within {grace_min} minutes."
    )
}

/// Follow-up reminder, mid grace period
pub fn reminder(guest_name: &str, restaurant_name: &str) -> String {
    format!(
        "{guest_name}, just a reminder — your table at {restaurant_name} is still \
         being held. Reply Y to confirm or N to cancel."
    )
}

/// Cancellation notice
pub fn cancelled(guest_name: &str, restaurant_name: &str) -> String {
    format!(
        "{guest_name}, your spot at {restaurant_name} has been cancelled. \
         Text or see the host to rejoin the list."
    )
}

/// Unrecognized reply re-prompt; no state change
pub fn reprompt(restaurant_name: &str) -> String {
    format!(
        "Sorry, we didn't catch that. Reply Y to confirm your table at \
         {restaurant_name} or N to cancel."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_mentions_bracket() {
        let body = check_in("Ana", 4, "Perch", 10, 20);
        assert!(body.contains("Ana"));
        assert!(body.contains("10-20 minutes"));
        assert!(body.contains("for 4"));
    }

    #[test]
    fn test_table_ready_mentions_grace() {
        let body = table_ready("Ana", "Perch", 20);
        assert!(body.contains("within 20 minutes"));
        assert!(body.contains("Reply Y"));
    }

    #[test]
    fn test_reprompt_offers_both_replies() {
        let body = reprompt("Perch");
        assert!(body.contains('Y'));
        assert!(body.contains('N'));
    }
}
