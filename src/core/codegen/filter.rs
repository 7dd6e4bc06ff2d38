use super::js_string;
use fsb_types::Trigger;
use std::fmt::Write;

/// Name of the generated gating function.
pub const FILTER_FUNCTION: &str = "filterEvent";

/// Emit a `filterEvent(req)` function accepting exactly the given triggers.
///
/// Triggers and their actions are emitted in input order, without dedup.
pub fn generate_filter_function(triggers: &[Trigger]) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "const {} = (req) => {{", FILTER_FUNCTION);
    for trigger in triggers {
        let _ = writeln!(
            s,
            "  if (req.headers['x-github-event'] === {}) {{",
            js_string(&trigger.event)
        );
        if trigger.actions.is_empty() {
            s.push_str("    return true;\n");
        } else {
            s.push_str("    switch (req.body.action) {\n");
            for action in &trigger.actions {
                let _ = writeln!(s, "      case {}:", js_string(action));
            }
            s.push_str("        return true;\n");
            s.push_str("    }\n");
        }
        s.push_str("  }\n");
    }
    s.push_str("  return false;\n");
    s.push_str("};\n");
    s
}
