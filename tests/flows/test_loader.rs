mod support;

use fsb::core::flows::{GithubContentSource, Loader, LoaderSettings, RepoCoordinate};
use fsb::core::types::ErrorCategory;
use fsb::Trigger;
use std::sync::Arc;
use support::{contents_path, mount_action, mount_listing, mount_workflow, node_action, WORKFLOWS_PATH};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLOUD_WORKFLOW: &str = r#"
name: cloud
on:
  issue_comment:
    types: [created]
jobs:
  echo-timer:
    runs-on: ubuntu-latest
    steps:
      - uses: thepwagner/echo-timer@v1
        with:
          token: ${{ secrets.GITHUB_TOKEN }}
          greeting: Hello
          retries: 3
"#;

const SHELL_WORKFLOW: &str = r#"
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - run: make test
"#;

fn loader(server: &MockServer) -> Loader {
    let source = GithubContentSource::new(&server.uri(), Some("test-token")).unwrap();
    Loader::new(Arc::new(source), LoaderSettings::default())
}

fn repo() -> RepoCoordinate {
    RepoCoordinate::new("octo", "cat")
}

async fn mount_echo_timer(server: &MockServer, expected: u64) {
    mount_action(
        server,
        "thepwagner",
        "echo-timer",
        "v1",
        &node_action("dist/index.js"),
        Some(("dist/index.js", "module.exports = 1;")),
        expected,
    )
    .await;
}

#[tokio::test]
async fn test_loads_convertible_workflow() {
    let server = MockServer::start().await;
    mount_listing(&server, "octo", "cat", &["cloud.yaml"]).await;
    mount_workflow(&server, "octo", "cat", "cloud.yaml", CLOUD_WORKFLOW).await;
    mount_echo_timer(&server, 1).await;

    let flows = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(flows.len(), 1);
    let flow = &flows[0];
    assert_eq!(flow.name, "cloud.yaml");
    assert_eq!(
        flow.triggers,
        vec![Trigger::with_actions("issue_comment", ["created"])]
    );
    assert_eq!(flow.steps.len(), 1);
    let step = &flow.steps[0];
    assert_eq!(step.name, "echo-timer-0");
    assert_eq!(step.source_code, "module.exports = 1;");
    let inputs: Vec<(&str, &str)> = step
        .inputs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert_eq!(
        inputs,
        vec![
            ("token", "${{ secrets.GITHUB_TOKEN }}"),
            ("greeting", "Hello"),
            ("retries", "3"),
        ]
    );
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let server = MockServer::start().await;
    mount_listing(&server, "octo", "cat", &[]).await;

    loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let auth = requests[0].headers.get("authorization").unwrap();
    assert_eq!(auth.to_str().unwrap(), "Bearer test-token");
}

#[tokio::test]
async fn test_ineligible_workflow_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, "octo", "cat", &["build.yml", "cloud.yaml", "README.md"]).await;
    mount_workflow(&server, "octo", "cat", "build.yml", SHELL_WORKFLOW).await;
    mount_workflow(&server, "octo", "cat", "cloud.yaml", CLOUD_WORKFLOW).await;
    mount_echo_timer(&server, 1).await;

    let flows = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<&str> = flows.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["cloud.yaml"]);
}

#[tokio::test]
async fn test_one_bad_step_skips_whole_workflow() {
    let server = MockServer::start().await;
    let mixed = r#"
on: push
jobs:
  first:
    steps:
      - uses: thepwagner/echo-timer@v1
  second:
    steps:
      - uses: thepwagner/echo-timer@v1
      - run: echo done
"#;
    mount_listing(&server, "octo", "cat", &["mixed.yml"]).await;
    mount_workflow(&server, "octo", "cat", "mixed.yml", mixed).await;
    mount_echo_timer(&server, 1).await;

    let flows = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(flows.is_empty());
}

#[tokio::test]
async fn test_unsupported_interpolation_skips_workflow() {
    let server = MockServer::start().await;
    let templated = r#"
on: issues
jobs:
  greet:
    steps:
      - uses: thepwagner/echo-timer@v1
        with:
          issue: ${{ github.event.issue.number }}
"#;
    mount_listing(&server, "octo", "cat", &["templated.yml"]).await;
    mount_workflow(&server, "octo", "cat", "templated.yml", templated).await;
    mount_echo_timer(&server, 1).await;

    let flows = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(flows.is_empty());
}

#[tokio::test]
async fn test_job_without_steps_skips_workflow() {
    let server = MockServer::start().await;
    let reusable = r#"
on: push
jobs:
  call:
    uses: octo/cat/.github/workflows/x.yml@main
"#;
    let partly_reusable = r#"
on: push
jobs:
  echo:
    steps:
      - uses: thepwagner/echo-timer@v1
  call:
    uses: octo/cat/.github/workflows/x.yml@main
"#;
    let empty = "on: push\njobs: {}\n";
    mount_listing(&server, "octo", "cat", &["empty.yml", "partly.yml", "reusable.yml"]).await;
    mount_workflow(&server, "octo", "cat", "reusable.yml", reusable).await;
    mount_workflow(&server, "octo", "cat", "partly.yml", partly_reusable).await;
    mount_workflow(&server, "octo", "cat", "empty.yml", empty).await;
    mount_echo_timer(&server, 1).await;

    let flows = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(flows.is_empty());
}

#[tokio::test]
async fn test_action_metadata_is_shared_across_workflows() {
    let server = MockServer::start().await;
    mount_listing(&server, "octo", "cat", &["a.yml", "b.yml"]).await;
    mount_workflow(&server, "octo", "cat", "a.yml", CLOUD_WORKFLOW).await;
    mount_workflow(&server, "octo", "cat", "b.yml", CLOUD_WORKFLOW).await;
    mount_echo_timer(&server, 1).await;

    let loader = loader(&server);
    let flows = loader
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(flows.len(), 2);
    assert_eq!(loader.resolver().cached_len().await, 1);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(contents_path("octo", "cat", WORKFLOWS_PATH)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::FetchError);
    assert_eq!(err.context.get("repo"), Some(&"octo/cat".to_string()));
}

#[tokio::test]
async fn test_malformed_workflow_is_fatal() {
    let server = MockServer::start().await;
    mount_listing(&server, "octo", "cat", &["broken.yml", "cloud.yaml"]).await;
    mount_workflow(&server, "octo", "cat", "broken.yml", "jobs: [unclosed").await;
    mount_workflow(&server, "octo", "cat", "cloud.yaml", CLOUD_WORKFLOW).await;

    let err = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::DecodeError);
    assert_eq!(
        err.context.get("workflow"),
        Some(&format!("{}/broken.yml", WORKFLOWS_PATH))
    );
}

#[tokio::test]
async fn test_unrecognized_trigger_shape_is_error() {
    let server = MockServer::start().await;
    let odd = r#"
on: 42
jobs:
  greet:
    steps:
      - uses: thepwagner/echo-timer@v1
"#;
    mount_listing(&server, "octo", "cat", &["odd.yml"]).await;
    mount_workflow(&server, "octo", "cat", "odd.yml", odd).await;
    mount_echo_timer(&server, 1).await;

    let err = loader(&server)
        .load(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::UnrecognizedShapeError);
}

#[tokio::test]
async fn test_cancelled_load_makes_no_requests() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = loader(&server).load(&repo(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(server.received_requests().await.unwrap().is_empty());
}
