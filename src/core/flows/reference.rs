use fsb_types::ActionReference;
use regex::Regex;
use std::sync::OnceLock;

fn uses_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z-]+)/([a-z-]+)@([A-Za-z0-9.\-]+)$").expect("static uses pattern")
    })
}

/// Parse a step `uses:` value of the form `owner/repo@ref`.
///
/// Returns `None` for anything else (local `./path` actions, docker
/// references, nested action paths, empty strings). That is an expected
/// outcome, not an error.
pub fn parse_action_reference(uses: &str) -> Option<ActionReference> {
    let captures = uses_pattern().captures(uses.trim())?;
    Some(ActionReference {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        git_ref: captures[3].to_string(),
    })
}
