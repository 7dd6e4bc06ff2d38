mod support;

use fsb::core::flows::{parse_action_reference, GithubContentSource, Loader, LoaderSettings};
use fsb::ActionReference;
use std::sync::Arc;
use support::{mount_action, node_action};
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

#[test]
fn test_parse_published_action_references() {
    let cases = [
        ("thepwagner/echo-timer@v1", ("thepwagner", "echo-timer", "v1")),
        ("actions/checkout@v2.3.4", ("actions", "checkout", "v2.3.4")),
        ("octo-org/some-action@main", ("octo-org", "some-action", "main")),
        (
            "thepwagner/echo-timer@0123abcDEF",
            ("thepwagner", "echo-timer", "0123abcDEF"),
        ),
    ];
    for (uses, (owner, repo, git_ref)) in cases {
        assert_eq!(
            parse_action_reference(uses),
            Some(ActionReference {
                owner: owner.to_string(),
                repo: repo.to_string(),
                git_ref: git_ref.to_string(),
            }),
            "{uses}"
        );
    }
}

#[test]
fn test_reject_other_reference_forms() {
    for uses in [
        "",
        "./.github/actions/local",
        "docker://alpine:3.12",
        "actions/checkout",
        "actions/aws/ec2@v1",
        "Actions/Checkout@v1",
        "octo/cat@feature/branch",
        "octo/cat@",
    ] {
        assert_eq!(parse_action_reference(uses), None, "{uses:?}");
    }
}

#[tokio::test]
async fn test_step_eligibility_probe() {
    let server = MockServer::start().await;
    mount_action(
        &server,
        "thepwagner",
        "echo-timer",
        "v1",
        &node_action("dist/index.js"),
        Some(("dist/index.js", "module.exports = 1;")),
        1,
    )
    .await;
    mount_action(
        &server,
        "octo",
        "composite",
        "v1",
        "runs:\n  using: composite\n  steps: []\n",
        None,
        1,
    )
    .await;

    let source = GithubContentSource::new(&server.uri(), None).unwrap();
    let loader = Loader::new(Arc::new(source), LoaderSettings::default());
    let cancel = CancellationToken::new();

    assert!(loader
        .is_eligible_step("thepwagner/echo-timer@v1", &cancel)
        .await
        .unwrap());
    assert!(loader
        .is_eligible_step("thepwagner/echo-timer@v1", &cancel)
        .await
        .unwrap());
    assert!(!loader.is_eligible_step("octo/composite@v1", &cancel).await.unwrap());
    assert!(!loader.is_eligible_step("./local", &cancel).await.unwrap());
}
