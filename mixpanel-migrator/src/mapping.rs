use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

pub const BANNER_CLICK_EVENT: &str = "Leland+ Banner Click";
pub const DEFAULT_BANNER_CLICK: &str = "leland_plus_banner--click";

// Existing PostHog dashboards are keyed on these names, don't edit them in place
static EVENT_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Apply page
        ("typeformSubmissionError", "applicant_apply--typeform_submission_error"),
        ("completedApplicantTypeform", "applicant_apply--typeform_submission_success"),
        // Auth
        ("applicantSignUp", "applicant_sign_up"),
        // Messages
        ("firstMessageSent", "first_message_send"),
        // Sessions
        ("coachingSessionScheduled", "coaching_session_scheduled"),
        ("introCallScheduled", "intro_call_scheduled"),
        // Subscriptions
        ("subscriptionStarted", "manage_subscription--subscription_start"),
        ("subscriptionCanceled", "manage_subscription--subscription_cancel"),
        // Purchases
        ("purchase", "purchase_complete"),
        ("completeGuestCheckout", "checkout--guest_checkout_complete"),
        ("completeGuestSignup", "checkout--guest_signup_complete"),
        // Event cards
        ("Click Event Card Register - Navigate to Luma", "event_card--navigate_to_luma_click"),
        ("EventCard Click", "event_card--click"),
        // Vouches
        ("Vouch Modal Open", "vouch_modal--open"),
        ("Vouch Modal Submit", "vouch_modal--submit"),
        ("Vouch Outcome Submit", "vouch_outcome_step--submit"),
        // Events page
        ("EventsPage - click - Class", "events_page--class_card_click"),
        // Coaches
        ("viewedIntroVideo", "coach_profile--intro_video_view"),
        ("viewedCoachProfile", "coach_profile--view"),
        ("clickedMessageCoach", "coach_message_cta--message_coach_click"),
        ("coachMessageCTA - messaged coach", "coach_message_cta--message_coach_success"),
        // Schedule modal
        ("SCHEDULE_MODAL_EVENTS.STEP_CHANGE", "schedule_modal--step_change"),
        ("SCHEDULE_MODAL_EVENTS.CLOSE", "schedule_modal--close"),
        // Search
        ("clickedSRPPackage", "srp--leland_package_click"),
        ("SRP - click - Search Bar", "srp--search_bar_focus"),
        ("SRP - filter - Search Bar", "srp--search_bar_filter"),
        ("SRP - click - Featured Filter", "srp--featured_filter_click"),
        ("SRP - click - Booked Coach", "srp--booked_coach_click"),
        ("Cohort Banner Click", "srp--cohort_banner_click"),
        ("SRP - click - Class", "srp--class_click"),
        ("SRP - click - Leland Package", "srp--leland_package_click"),
        ("SRP - click - View more packages", "srp--view_more_packages_click"),
        ("SRP - click - Offering Package", "srp--offering_package_click"),
        ("SRP - click - Sort", "srp--coach_filter_section_sort"),
        ("SRP - click - Coach Card", "srp--coach_card_click"),
        ("SRP - click - Coach Pagination", "srp--coach_pagination_click"),
        (
            "SRP - click - Talk to a Team Member button",
            "srp--talk_to_a_team_member_button_click",
        ),
        // Classes
        ("Enroll Free Event", "free_event--enroll"),
        ("Unenroll Free Event", "free_event--unenroll"),
        // Meetings
        ("coachingSessionAttended", "meeting--coaching_session_attend"),
        // Bootcamps
        ("Bootcamp Card Click", "bootcamp_card--click"),
        // Articles
        ("Article - Subscribe", "article_page--email_list_subscribe"),
        ("Article - Schedule a strategy call", "article_page--schedule_call_button_click"),
        ("Event Banner Click", "article_page--event_banner_click"),
        // Page views
        ("pageView", "$pageview"),
    ])
});

/// Maps a Mixpanel event name onto the PostHog name, looking at the event's properties for
/// the one event whose name depends on where it was fired from. Unknown names pass through.
pub fn map_event_name(event: &str, properties: &Map<String, Value>) -> String {
    match event {
        // Mixpanel's autotrack page view
        "$mp_web_page_view" => "$pageview".to_string(),
        BANNER_CLICK_EVENT => banner_click_name(properties.get("source")).to_string(),
        _ => EVENT_NAMES
            .get(event)
            .map_or_else(|| event.to_string(), |mapped| mapped.to_string()),
    }
}

fn banner_click_name(source: Option<&Value>) -> &'static str {
    let Some(Value::String(source)) = source else {
        return DEFAULT_BANNER_CLICK;
    };
    match source.to_lowercase().as_str() {
        "srp" => "srp--leland_plus_banner_click",
        "article" => "article_page--leland_plus_banner_click",
        "post_checkout" => "post_checkout--leland_plus_banner_click",
        _ => DEFAULT_BANNER_CLICK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_table_lookup() {
        let empty = Map::new();
        assert_eq!(map_event_name("purchase", &empty), "purchase_complete");
        assert_eq!(
            map_event_name("SRP - click - Coach Card", &empty),
            "srp--coach_card_click"
        );
        assert_eq!(map_event_name("pageView", &empty), "$pageview");
        assert_eq!(map_event_name("$mp_web_page_view", &empty), "$pageview");
    }

    #[test]
    fn test_unknown_names_pass_through() {
        let empty = Map::new();
        assert_eq!(map_event_name("Something New", &empty), "Something New");
        assert_eq!(map_event_name("$pageview", &empty), "$pageview");
        // Lookup is exact, not case-insensitive
        assert_eq!(map_event_name("Purchase", &empty), "Purchase");
    }

    #[test]
    fn test_banner_click_by_source() {
        let cases = [
            (json!({"source": "SRP"}), "srp--leland_plus_banner_click"),
            (json!({"source": "srp"}), "srp--leland_plus_banner_click"),
            (json!({"source": "Article"}), "article_page--leland_plus_banner_click"),
            (
                json!({"source": "POST_CHECKOUT"}),
                "post_checkout--leland_plus_banner_click",
            ),
            (json!({"source": "homepage"}), DEFAULT_BANNER_CLICK),
            (json!({"source": 3}), DEFAULT_BANNER_CLICK),
            (json!({}), DEFAULT_BANNER_CLICK),
        ];
        for (properties, expected) in cases {
            assert_eq!(
                map_event_name(BANNER_CLICK_EVENT, &props(properties.clone())),
                expected,
                "{properties}"
            );
        }
    }

    #[test]
    fn test_table_values_are_not_sources() {
        // Mapping is applied once; no destination name should map further
        for mapped in EVENT_NAMES.values() {
            assert!(
                !EVENT_NAMES.contains_key(mapped),
                "{mapped} would be remapped"
            );
        }
    }
}
