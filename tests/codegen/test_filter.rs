use fsb::core::codegen::generate_filter_function;
use fsb::{LoadedFlow, Trigger};

fn squash(text: &str) -> String {
    text.split_whitespace().collect()
}

fn assert_contains_squashed(body: &str, expected: &str) {
    assert!(
        squash(body).contains(&squash(expected)),
        "expected:\n{}\nin:\n{}",
        expected,
        body
    );
}

#[test]
fn test_event_without_actions() {
    let body = generate_filter_function(&[Trigger::new("push")]);
    assert_contains_squashed(
        &body,
        r#"if (req.headers['x-github-event'] === "push") { return true; }"#,
    );
    assert!(!body.contains("switch"));
}

#[test]
fn test_event_with_single_action() {
    let body = generate_filter_function(&[Trigger::with_actions("issue_comment", ["created"])]);
    assert_contains_squashed(
        &body,
        r#"if (req.headers['x-github-event'] === "issue_comment") {
             switch (req.body.action) {
               case "created":
                 return true;
             }
           }"#,
    );
}

#[test]
fn test_event_with_multiple_actions() {
    let body = generate_filter_function(&[Trigger::with_actions(
        "pull_request",
        ["opened", "synchronize"],
    )]);
    assert_contains_squashed(
        &body,
        r#"switch (req.body.action) { case "opened": case "synchronize": return true; }"#,
    );
}

#[test]
fn test_multiple_events_keep_order() {
    let body = generate_filter_function(&[
        Trigger::new("push"),
        Trigger::with_actions("issues", ["opened"]),
        Trigger::new("release"),
    ]);
    let push = body.find(r#"=== "push""#).unwrap();
    let issues = body.find(r#"=== "issues""#).unwrap();
    let release = body.find(r#"=== "release""#).unwrap();
    assert!(push < issues && issues < release);
    assert!(squash(&body).ends_with(&squash("return false; };")));
}

#[test]
fn test_function_shape() {
    let body = generate_filter_function(&[Trigger::new("push")]);
    assert!(body.starts_with("const filterEvent = (req) => {"));
    assert_eq!(body.matches("return false;").count(), 1);
}

/// Reads the generated `if`/`case` chain back into (event, actions) gates.
/// `None` actions means the event returns true unconditionally.
fn read_gates(body: &str) -> Vec<(String, Option<Vec<String>>)> {
    let mut gates: Vec<(String, Option<Vec<String>>)> = Vec::new();
    for line in body.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("if (req.headers['x-github-event'] === ") {
            let literal = rest.strip_suffix(") {").unwrap();
            gates.push((serde_json::from_str(literal).unwrap(), None));
        } else if line.starts_with("switch (req.body.action)") {
            gates.last_mut().unwrap().1 = Some(Vec::new());
        } else if let Some(rest) = line.strip_prefix("case ") {
            let literal = rest.strip_suffix(':').unwrap();
            let actions = gates.last_mut().unwrap().1.as_mut().unwrap();
            actions.push(serde_json::from_str(literal).unwrap());
        }
    }
    gates
}

fn filter_accepts(gates: &[(String, Option<Vec<String>>)], event: &str, action: Option<&str>) -> bool {
    gates.iter().any(|(gate_event, actions)| {
        gate_event == event
            && match actions {
                None => true,
                Some(actions) => action.is_some_and(|a| actions.iter().any(|x| x == a)),
            }
    })
}

#[test]
fn test_filter_agrees_with_flow_triggers() {
    let flow = LoadedFlow {
        name: "triage.yml".to_string(),
        triggers: vec![
            Trigger::with_actions("issues", ["opened", "labeled"]),
            Trigger::new("push"),
            Trigger::with_actions("pull_request", ["synchronize"]),
        ],
        steps: Vec::new(),
    };
    let gates = read_gates(&generate_filter_function(&flow.triggers));
    assert_eq!(gates.len(), 3);

    for event in ["issues", "push", "pull_request", "release"] {
        for action in [None, Some("opened"), Some("labeled"), Some("synchronize"), Some("closed")] {
            assert_eq!(
                filter_accepts(&gates, event, action),
                flow.accepts(event, action),
                "{} {:?}",
                event,
                action
            );
        }
    }
    assert!(flow.accepts("push", Some("anything")));
    assert!(!flow.accepts("issues", None));
    assert!(!flow.accepts("release", None));
}
