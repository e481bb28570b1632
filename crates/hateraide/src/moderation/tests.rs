use crate::content::{Feed, Reply};
use crate::moderation::{
    ActionLayer, ActionType, AnalysisPayload, DecisionSource, HIDDEN_REASON, ModerationAction,
    ModerationStore, ResolveIterExt, STATUS_DEFAULT, STATUS_PRELOADED, Sentiment, StaticFacts,
    Verdict, resolve, resolve_all, resolve_decision, static_default,
};
use chrono::{Datelike, Timelike};
use url::Url;

const FEED_JSON: &str = include_str!("mock_feed.json");
const ANALYSIS_JSON: &str = include_str!("reply_analyzer_results.json");

fn feed() -> Feed {
    serde_json::from_str(FEED_JSON).expect("failed to parse feed")
}

fn payload() -> AnalysisPayload {
    serde_json::from_str(ANALYSIS_JSON).expect("failed to parse analysis payload")
}

fn reply<'a>(feed: &'a Feed, id: &str) -> &'a Reply {
    feed.replies().find(|r| r.id == id).expect("reply in fixture")
}

fn loaded_store() -> ModerationStore<()> {
    let store = ModerationStore::new(
        (),
        Url::parse("http://localhost:8000/reply_analyzer_results.json").unwrap(),
        Url::parse("http://localhost:8000/api/moderation-actions").unwrap(),
    );
    store.register_content(feed().replies());
    store.load_preloaded(&payload());
    store
}

fn live(id: &str, action_type: ActionType, reason: &str) -> ModerationAction {
    ModerationAction {
        item_id: id.into(),
        action_type,
        reason: reason.into(),
        sentiment: Sentiment::Harmful,
        decided_at: "2025-06-14T10:30:00.000001".into(),
        status: "applied".into(),
    }
}

#[test]
fn test_parse_feed_fixture() {
    let feed = feed();
    assert_eq!(feed.posts.len(), 2);
    assert_eq!(feed.replies().count(), 7);
    assert_eq!(reply(&feed, "r1").sentiment, Sentiment::Harmful);
    assert_eq!(reply(&feed, "r3").sentiment, Sentiment::InJest);
    // unrecognised and missing labels read as unknown
    assert_eq!(reply(&feed, "r6").sentiment, Sentiment::Unknown);
    assert_eq!(reply(&feed, "r7").sentiment, Sentiment::Unknown);
    assert!(reply(&feed, "r4").hidden);
    assert_eq!(feed.post("p2").unwrap().replies.len(), 3);
}

#[test]
fn test_preloaded_only_harmful_and_unfriendly() {
    let preloaded = payload().preloaded_actions();
    let mut ids: Vec<_> = preloaded.keys().map(|k| k.as_str()).collect();
    ids.sort();
    assert_eq!(ids, ["r2", "r5"]);

    let r2 = &preloaded["r2"];
    assert_eq!(r2.action_type, ActionType::Blur);
    assert_eq!(r2.reason, "Dismissive comment about the artist's work");
    assert_eq!(r2.status, STATUS_PRELOADED);

    let r5 = &preloaded["r5"];
    assert_eq!(r5.action_type, ActionType::Hide);
    assert_eq!(r5.reason, "Content flagged as harmful");
    assert_eq!(r5.decided_at, "2025-06-14T10:21:45.532118");
}

#[test]
fn test_classifier_hide_flag_does_not_add_actions() {
    // the label alone decides; a hide recommendation on a friendly reply is ignored
    let payload: AnalysisPayload = serde_json::from_str(
        r#"{"reply_analyzer_results": {"reply_analyses": [
            {"reply_id": "r8", "analysis_result": {"sentiment": "friendly", "should_hide": true}},
            {"reply_id": "r9", "analysis_result": {"sentiment": "unfriendly", "should_hide": true}}
        ]}}"#,
    )
    .unwrap();
    let preloaded = payload.preloaded_actions();
    assert!(!preloaded.contains_key("r8"));
    assert_eq!(preloaded["r9"].action_type, ActionType::Blur);
}

#[test]
fn test_important_authors_from_payload() {
    let store = loaded_store();
    assert!(store.is_author_important("r6"));
    assert!(!store.is_author_important("r2"));
}

#[test]
fn test_live_beats_preloaded() {
    let mut preloaded = ActionLayer::new();
    preloaded.insert(
        "r2".into(),
        ModerationAction::synthesize("r2", Sentiment::Unfriendly, None, "", "preloaded").unwrap(),
    );
    let mut live_layer = ActionLayer::new();
    live_layer.insert("r2".into(), live("r2", ActionType::Blur, "from the push channel"));

    let decision = resolve_decision("r2", &live_layer, &preloaded).unwrap();
    assert_eq!(decision.source, DecisionSource::Live);
    // the whole action comes from one layer
    assert_eq!(decision.action, live_layer["r2"]);
}

#[test]
fn test_sentiment_severity_order() {
    use Sentiment::*;
    assert!(Harmful.severity() > Unfriendly.severity());
    assert!(Unfriendly.severity() > Friendly.severity());
    assert_eq!(Friendly.severity(), InJest.severity());
    assert!(InJest.severity() > Unknown.severity());

    // the default policy only acts on the two most severe labels
    let mut acted: Vec<_> = [Unknown, InJest, Friendly, Unfriendly, Harmful]
        .into_iter()
        .filter_map(|s| s.default_action().map(|a| (s.severity(), a)))
        .collect();
    acted.sort_by_key(|(rank, _)| *rank);
    assert_eq!(
        acted,
        [
            (Unfriendly.severity(), ActionType::Blur),
            (Harmful.severity(), ActionType::Hide)
        ]
    );
}

#[test]
fn test_default_synthesis_per_sentiment() {
    let empty = ActionLayer::new();
    let facts = |sentiment| StaticFacts {
        id: "x".into(),
        sentiment: Some(sentiment),
        hidden: false,
        timestamp: None,
    };

    let harmful = resolve(&facts(Sentiment::Harmful), &empty, &empty).unwrap();
    assert_eq!(harmful.action_type, ActionType::Hide);
    assert_eq!(harmful.status, STATUS_DEFAULT);

    let unfriendly = resolve(&facts(Sentiment::Unfriendly), &empty, &empty).unwrap();
    assert_eq!(unfriendly.action_type, ActionType::Blur);

    for sentiment in [Sentiment::Friendly, Sentiment::InJest, Sentiment::Unknown] {
        assert!(resolve(&facts(sentiment), &empty, &empty).is_none(), "{sentiment}");
        assert!(static_default(&facts(sentiment)).is_none());
    }
}

#[test]
fn test_hidden_overrides_every_layer() {
    let feed = feed();
    let r4 = reply(&feed, "r4");
    let mut live_layer = ActionLayer::new();
    live_layer.insert("r4".into(), live("r4", ActionType::Blur, "live"));

    let decision = resolve_decision(r4, &live_layer, &ActionLayer::new()).unwrap();
    assert_eq!(decision.source, DecisionSource::Hidden);
    assert_eq!(decision.action.action_type, ActionType::Hide);
    assert_eq!(decision.action.reason, HIDDEN_REASON);
}

#[test]
fn test_static_harmful_hides() {
    let store = loaded_store();
    let action = store.get("r1").unwrap();
    assert_eq!(action.action_type, ActionType::Hide);
    assert_eq!(action.sentiment, Sentiment::Harmful);
    assert_eq!(store.decision("r1").unwrap().source, DecisionSource::StaticDefault);

    let at = action.decided_at_utc().unwrap();
    assert_eq!((at.year(), at.hour(), at.minute()), (2025, 10, 20));
}

#[test]
fn test_preloaded_unfriendly_blurs() {
    let store = loaded_store();
    let decision = store.decision("r2").unwrap();
    assert_eq!(decision.source, DecisionSource::Preloaded);
    assert_eq!(decision.action.action_type, ActionType::Blur);
}

#[test]
fn test_live_update_after_preload() {
    let store = loaded_store();
    assert_eq!(store.get("r2").unwrap().action_type, ActionType::Blur);

    store.apply_live(live("r2", ActionType::Hide, "Escalated by moderator"));
    let decision = store.decision("r2").unwrap();
    assert_eq!(decision.source, DecisionSource::Live);
    assert_eq!(decision.action.action_type, ActionType::Hide);
    assert_eq!(decision.action.reason, "Escalated by moderator");
}

#[test]
fn test_repeat_live_update_same_state() {
    let store = loaded_store();
    let update = live("r3", ActionType::Blur, "Reported");
    store.apply_live(update.clone());
    let once = store.decisions();
    store.apply_live(update);
    assert_eq!(store.decisions(), once);
    assert_eq!(store.live_len(), 1);
}

#[test]
fn test_preloaded_beats_static_label() {
    let store = loaded_store();
    // r5 carries a static unfriendly label but the analysis says harmful
    let decision = store.decision("r5").unwrap();
    assert_eq!(decision.source, DecisionSource::Preloaded);
    assert_eq!(decision.action.action_type, ActionType::Hide);
}

#[test]
fn test_decisions_cover_moderated_items_only() {
    let store = loaded_store();
    let decisions = store.decisions();
    let ids: Vec<_> = decisions.keys().map(|k| k.as_str()).collect();
    assert_eq!(ids, ["r1", "r2", "r4", "r5"]);
}

#[test]
fn test_reload_replaces_preloaded_layer() {
    let store = loaded_store();
    let before = store.decisions();
    store.load_preloaded(&AnalysisPayload::default());
    assert!(store.get("r2").is_none());
    assert_ne!(store.decisions(), before);
}

#[test]
fn test_resolve_all_and_iter_ext() {
    let feed = feed();
    let replies: Vec<Reply> = feed.replies().cloned().collect();
    let preloaded = payload().preloaded_actions();
    let live_layer = ActionLayer::new();

    let resolved = resolve_all(&replies, &live_layer, &preloaded);
    assert_eq!(resolved.len(), replies.len());
    let moderated = resolved.iter().filter(|(_, a)| a.is_some()).count();
    assert_eq!(moderated, 4);

    let visible: Vec<_> = replies
        .iter()
        .filter_hidden(&live_layer, &preloaded)
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(visible, ["r2", "r3", "r6", "r7"]);

    let verdicts: Vec<_> = replies
        .iter()
        .with_decisions(&live_layer, &preloaded)
        .map(|(r, a)| (r.id.as_str(), Verdict::of(a.as_ref()).is_moderated()))
        .collect();
    assert_eq!(verdicts[0], ("r1", true));
    assert_eq!(verdicts[2], ("r3", false));
}

#[test]
fn test_wire_shape_of_live_action() {
    let raw = r#"{
        "reply_id": "r9",
        "action_type": "blur",
        "reason": "Content flagged as unfriendly",
        "sentiment": "unfriendly",
        "timestamp": "2025-06-14T10:22:31.123456",
        "status": "applied"
    }"#;
    let action: ModerationAction = serde_json::from_str(raw).unwrap();
    assert_eq!(action.item_id, "r9");
    assert_eq!(action.decided_at, "2025-06-14T10:22:31.123456");

    let value = serde_json::to_value(&action).unwrap();
    assert_eq!(value["reply_id"], "r9");
    assert_eq!(value["timestamp"], "2025-06-14T10:22:31.123456");
}
