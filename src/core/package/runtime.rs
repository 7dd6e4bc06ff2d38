//! Fixed files the function host expects next to the handler.

/// HTTP trigger bindings for the generated function.
pub const FUNCTION_BINDINGS: &str = r#"{
  "bindings": [
    {
      "authLevel": "anonymous",
      "type": "httpTrigger",
      "direction": "in",
      "name": "req",
      "methods": [
        "get",
        "post"
      ]
    },
    {
      "type": "http",
      "direction": "out",
      "name": "res"
    }
  ]
}"#;

pub const PROXIES_CONFIG: &str = r#"{
  "$schema": "http://json.schemastore.org/proxies",
  "proxies": {}
}"#;

pub const FUNC_IGNORE: &str = "*.js.map
*.ts
.git*
.vscode
local.settings.json
test
tsconfig.json";
