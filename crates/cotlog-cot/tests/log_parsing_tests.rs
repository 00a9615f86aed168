//! Tokenizing and two-tier parsing of realistic, partly damaged logs

use cotlog_cot::{
    count_events, serialize_event, strip_control_chars, tokenize, FallbackExtractor, ParseOutcome,
    Provenance,
};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<event version="2.0" uid="ANDROID-12345678" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="h-e">
    <point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="5.0"/>
    <detail>
        <contact callsign="Delta-5" endpoint="10.0.0.5:4242"/>
        <__group name="Red" role="Team Lead"/>
        <track speed="25.0" course="180.0"/>
    </detail>
</event>
<event version="2.0" uid="TEST-2" type="a-f-G" time="2024-01-15T10:31:00Z" start="2024-01-15T10:31:00Z" stale="2024-01-15T10:36:00Z" how="h-e">
    <point lat="0.0" lon="0.0" hae="0.0"/>
    <detail>
        <remarks>Fuel: 40% & falling</remarks>
    </detail>
</event>
<event version="2.0" uid="TEST-3" type="a-f-G" time="2024-01-15T10:32:00Z"#;

#[test]
fn test_feed_tokenizes_into_complete_events() {
    let fragments: Vec<_> = tokenize(FEED.as_bytes()).collect();
    assert_eq!(fragments.len(), 2);
    assert_eq!(count_events(FEED.as_bytes()), 2);
    assert!(String::from_utf8_lossy(fragments[0].as_bytes()).contains("ANDROID-12345678"));
    assert!(String::from_utf8_lossy(fragments[1].as_bytes()).contains("TEST-2"));
}

#[test]
fn test_strict_then_fallback() {
    let fallback = FallbackExtractor::default();
    let outcomes: Vec<_> = tokenize(FEED.as_bytes())
        .map(|f| {
            let text = String::from_utf8_lossy(&f.complete_trimmed()).into_owned();
            ParseOutcome::tolerant(&text, &fallback)
        })
        .collect();

    assert_eq!(outcomes[0].provenance(), Some(Provenance::Strict));
    assert_eq!(outcomes[1].provenance(), Some(Provenance::Fallback));

    match &outcomes[0] {
        ParseOutcome::Parsed(event) => {
            let detail = event.child("detail").unwrap();
            assert_eq!(
                detail.child("contact").unwrap().attr("callsign"),
                Some("Delta-5")
            );
            assert_eq!(detail.child("__group").unwrap().attr("role"), Some("Team Lead"));
            assert_eq!(detail.child("track").unwrap().attr("course"), Some("180.0"));
        }
        other => panic!("expected strict parse, got {:?}", other),
    }

    match &outcomes[1] {
        ParseOutcome::Recovered(record) => {
            assert_eq!(record.get("uid"), Some("TEST-2"));
            assert_eq!(record.get("remarks_Fuel"), Some("40% & falling"));
        }
        other => panic!("expected recovery, got {:?}", other),
    }
}

#[test]
fn test_strict_only_reports_failure() {
    let failed = tokenize(FEED.as_bytes())
        .map(|f| ParseOutcome::strict(&f.complete()))
        .filter(|o| matches!(o, ParseOutcome::Failed(_)))
        .count();
    assert_eq!(failed, 1);
}

#[test]
fn test_control_characters_only_break_strict_parse() {
    let damaged = "<event uid=\"CTRL-1\">\u{2}<detail><contact callsign=\"Kilo\"/></detail></event>";
    assert!(matches!(
        ParseOutcome::strict(damaged.as_bytes()),
        ParseOutcome::Failed(_)
    ));

    let cleaned = strip_control_chars(damaged);
    assert!(matches!(
        ParseOutcome::strict(cleaned.as_bytes()),
        ParseOutcome::Parsed(_)
    ));
}

#[test]
fn test_roundtrip_serialization() {
    let fragment = tokenize(FEED.as_bytes()).next().unwrap();
    let event = match ParseOutcome::strict(&fragment.complete()) {
        ParseOutcome::Parsed(event) => event,
        other => panic!("expected strict parse, got {:?}", other),
    };

    let serialized = serialize_event(&event);
    let reparsed = match ParseOutcome::strict(serialized.as_bytes()) {
        ParseOutcome::Parsed(event) => event,
        other => panic!("expected strict reparse, got {:?}", other),
    };

    assert_eq!(event, reparsed);
}
