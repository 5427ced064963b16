use serde_json::{json, Value};

/// Built-in configuration the public `config.yml` is merged over.
pub fn default_config() -> Value {
    json!({
        "app": {
            "title": "RepurAgent",
            "logo_path": "images/logo.png"
        },
        "server": {
            "host": "127.0.0.1",
            "port": 8502
        },
        "episodic": {
            "enabled": true
        },
        "ui": {
            "title_max_chars": 30,
            "history_limit": 200
        }
    })
}
