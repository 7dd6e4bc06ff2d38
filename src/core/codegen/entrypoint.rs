use super::filter::{generate_filter_function, FILTER_FUNCTION};
use super::js_string;
use crate::core::config::CodegenConfig;
use crate::core::flows::is_secret_placeholder;
use fsb_types::{LoadedFlow, LoadedStep};
use std::fmt::Write;

/// Step modules sit at the archive root, one level above the function directory.
const STEP_MODULE_DIR: &str = "..";

/// Tunables of the generated handler that are not part of the flow itself.
#[derive(Debug, Clone)]
pub struct EntrypointOptions {
    /// Events sent by these actors are acknowledged and ignored.
    pub ignored_actors: Vec<String>,
    /// Where the inbound payload is written for steps to read.
    pub event_path: String,
    /// Input value replaced by the bearer token.
    pub secret_placeholder: String,
}

impl Default for EntrypointOptions {
    fn default() -> Self {
        Self::from(&CodegenConfig::default())
    }
}

impl From<&CodegenConfig> for EntrypointOptions {
    fn from(config: &CodegenConfig) -> Self {
        Self {
            ignored_actors: config.ignored_actors.clone(),
            event_path: config.event_path.clone(),
            secret_placeholder: config.secret_placeholder.clone(),
        }
    }
}

/// Environment variable a step reads its input from, e.g. `my_token` -> `INPUT_MY_TOKEN`.
pub fn input_env_key(input: &str) -> String {
    format!("INPUT_{}", input.trim().replace(' ', "_").to_uppercase())
}

/// Emit the complete handler module for `flow`.
///
/// The handler verifies the webhook signature, applies the trigger filter,
/// drops events from ignored actors, writes the payload to disk and then
/// runs every step in order. A throwing step becomes a 500 response.
pub fn generate_entrypoint(
    secret: &str,
    token: &str,
    flow: &LoadedFlow,
    options: &EntrypointOptions,
) -> String {
    let mut s = String::new();
    s.push_str("const fs = require('fs');\n");
    s.push_str("const verify = require('@octokit/webhooks/verify');\n\n");
    let _ = writeln!(s, "// Generated from {}", flow.name);
    let _ = writeln!(s, "const secret = {};", js_string(secret));
    let _ = writeln!(s, "const ignoredActors = [{}];\n", js_list(&options.ignored_actors));
    s.push_str(&generate_filter_function(&flow.triggers));
    s.push('\n');

    s.push_str("module.exports = async function (context, req) {\n");
    s.push_str("  try {\n");
    s.push_str("    if (!verify(secret, req.body, req.headers['x-hub-signature'])) {\n");
    respond(&mut s, 401, "Signature failed");
    s.push_str("    }\n\n");

    let _ = writeln!(s, "    if (!{}(req)) {{", FILTER_FUNCTION);
    respond(&mut s, 200, "ignored event");
    s.push_str("    }\n\n");

    s.push_str("    const actor = req.body && req.body.sender ? req.body.sender.login : undefined;\n");
    s.push_str("    if (ignoredActors.includes(actor)) {\n");
    respond(&mut s, 200, "ignored actor");
    s.push_str("    }\n\n");

    let _ = writeln!(s, "    const eventFile = {};", js_string(&options.event_path));
    s.push_str("    fs.writeFileSync(eventFile, JSON.stringify(req.body));\n");
    s.push_str("    process.env.GITHUB_EVENT_PATH = eventFile;\n");
    s.push_str("    context.log('wrote event JSON, invoking steps');\n");

    for step in &flow.steps {
        s.push('\n');
        write_step(&mut s, step, token, &options.secret_placeholder);
    }

    s.push('\n');
    respond_done(&mut s, 200, "workflow complete");
    s.push_str("  } catch (e) {\n");
    s.push_str("    context.log(e);\n");
    s.push_str("    context.log(e.stack);\n");
    s.push_str("    context.res = {\n");
    s.push_str("      status: 500,\n");
    s.push_str("      body: e.message,\n");
    s.push_str("    };\n");
    s.push_str("  }\n");
    s.push_str("};\n");
    s
}

fn write_step(s: &mut String, step: &LoadedStep, token: &str, placeholder: &str) {
    let _ = writeln!(s, "    // {}", step.name);
    for (input, value) in &step.inputs {
        let value = if is_secret_placeholder(value, placeholder) {
            token
        } else {
            value.as_str()
        };
        let _ = writeln!(
            s,
            "    {} = {};",
            env_target(&input_env_key(input)),
            js_string(value)
        );
    }
    let module = js_string(&format!("{}/{}", STEP_MODULE_DIR, step.filename()));
    let _ = writeln!(s, "    delete require.cache[require.resolve({})];", module);
    let _ = writeln!(s, "    await require({});", module);
    let _ = writeln!(s, "    context.log({});", js_string(&format!("step {} complete", step.name)));
}

/// `process.env.KEY` when KEY is a plain identifier, bracket access otherwise.
fn env_target(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if identifier {
        format!("process.env.{}", key)
    } else {
        format!("process.env[{}]", js_string(key))
    }
}

fn respond(s: &mut String, status: u16, body: &str) {
    let _ = writeln!(
        s,
        "      context.res = {{ status: {}, body: {} }};",
        status,
        js_string(body)
    );
    s.push_str("      return;\n");
}

fn respond_done(s: &mut String, status: u16, body: &str) {
    let _ = writeln!(
        s,
        "    context.res = {{ status: {}, body: {} }};",
        status,
        js_string(body)
    );
}

fn js_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| js_string(value))
        .collect::<Vec<_>>()
        .join(", ")
}
