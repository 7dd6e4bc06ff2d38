use fsb::core::codegen::{generate_entrypoint, input_env_key, EntrypointOptions};
use fsb::{LoadedFlow, LoadedStep, Trigger};
use indexmap::IndexMap;

fn step(name: &str, source: &str, inputs: &[(&str, &str)]) -> LoadedStep {
    LoadedStep {
        name: name.to_string(),
        source_code: source.to_string(),
        inputs: inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<IndexMap<_, _>>(),
    }
}

fn flow(steps: Vec<LoadedStep>) -> LoadedFlow {
    LoadedFlow {
        name: "cloud.yaml".to_string(),
        triggers: vec![Trigger::with_actions("issue_comment", ["created"])],
        steps,
    }
}

fn generate(flow: &LoadedFlow) -> String {
    generate_entrypoint("testSecret", "testToken", flow, &EntrypointOptions::default())
}

#[test]
fn test_secret_placeholder_becomes_token() {
    let flow = flow(vec![step(
        "echo-timer-0",
        "module.exports = 1;",
        &[
            ("my cool token", "${{ secrets.GITHUB_TOKEN }}"),
            ("token", "${{secrets.GITHUB_TOKEN}}"),
        ],
    )]);
    let body = generate(&flow);
    assert!(body.contains(r#"process.env.INPUT_MY_COOL_TOKEN = "testToken";"#));
    assert!(body.contains(r#"process.env.INPUT_TOKEN = "testToken";"#));
    assert!(!body.contains("secrets.GITHUB_TOKEN"));
}

#[test]
fn test_hyphenated_inputs_use_bracket_access() {
    let flow = flow(vec![step(
        "label-0",
        "module.exports = 1;",
        &[
            ("repo-token", "${{ secrets.GITHUB_TOKEN }}"),
            ("sync-labels", "true"),
            ("token", "${{ secrets.GITHUB_TOKEN }}"),
        ],
    )]);
    let body = generate(&flow);
    assert!(body.contains(r#"process.env["INPUT_REPO-TOKEN"] = "testToken";"#));
    assert!(body.contains(r#"process.env["INPUT_SYNC-LABELS"] = "true";"#));
    assert!(body.contains(r#"process.env.INPUT_TOKEN = "testToken";"#));
    assert!(!body.contains("process.env.INPUT_REPO-TOKEN"));
    assert!(!body.contains("process.env.INPUT_SYNC-LABELS"));
}

#[test]
fn test_plain_inputs_pass_through() {
    let flow = flow(vec![step(
        "echo-timer-0",
        "module.exports = 1;",
        &[("greeting", "Hello \"world\""), ("retries", "3")],
    )]);
    let body = generate(&flow);
    assert!(body.contains(r#"process.env.INPUT_GREETING = "Hello \"world\"";"#));
    assert!(body.contains(r#"process.env.INPUT_RETRIES = "3";"#));
}

#[test]
fn test_handler_checks_run_before_steps() {
    let first = step("job-0", "one();", &[]);
    let body = generate(&flow(vec![first.clone()]));

    let signature = body.find("x-hub-signature").unwrap();
    let filter = body.find("if (!filterEvent(req))").unwrap();
    let actor = body.find("ignoredActors.includes(actor)").unwrap();
    let event_file = body.find("GITHUB_EVENT_PATH").unwrap();
    let step_call = body
        .find(&format!("await require(\"../{}\")", first.filename()))
        .unwrap();
    assert!(signature < filter && filter < actor && actor < event_file && event_file < step_call);

    assert!(body.contains(r#"const secret = "testSecret";"#));
    assert!(body.contains(r#"const ignoredActors = ["github-actions[bot]"];"#));
    assert!(body.contains(r#"const eventFile = "/tmp/eventPayload.json";"#));
    assert!(body.contains("status: 401"));
    assert!(body.contains("status: 500"));
}

#[test]
fn test_steps_run_in_order() {
    let a = step("build-0", "a();", &[]);
    let b = step("build-1", "b();", &[]);
    let c = step("deploy-0", "c();", &[]);
    let body = generate(&flow(vec![a.clone(), b.clone(), c.clone()]));

    let positions: Vec<usize> = [&a, &b, &c]
        .iter()
        .map(|s| body.find(&format!("await require(\"../{}\")", s.filename())).unwrap())
        .collect();
    assert!(positions[0] < positions[1] && positions[1] < positions[2]);
}

#[test]
fn test_repeated_step_source_is_reloaded_each_time() {
    let first = step("job-0", "same();", &[("n", "1")]);
    let second = step("job-1", "same();", &[("n", "2")]);
    assert_eq!(first.filename(), second.filename());

    let body = generate(&flow(vec![first.clone(), second]));
    let module = format!("\"../{}\"", first.filename());
    assert_eq!(body.matches(&format!("await require({})", module)).count(), 2);
    assert_eq!(
        body.matches(&format!("delete require.cache[require.resolve({})]", module))
            .count(),
        2
    );
    let one = body.find(r#"process.env.INPUT_N = "1";"#).unwrap();
    let two = body.find(r#"process.env.INPUT_N = "2";"#).unwrap();
    assert!(one < two);
}

#[test]
fn test_ignored_actors_are_configurable() {
    let options = EntrypointOptions {
        ignored_actors: vec!["dependabot[bot]".to_string(), "me".to_string()],
        ..EntrypointOptions::default()
    };
    let body = generate_entrypoint("s", "t", &flow(vec![]), &options);
    assert!(body.contains(r#"const ignoredActors = ["dependabot[bot]", "me"];"#));
}

#[test]
fn test_input_env_key() {
    assert_eq!(input_env_key("my_token"), "INPUT_MY_TOKEN");
    assert_eq!(input_env_key("who to greet"), "INPUT_WHO_TO_GREET");
}
