use clap::Parser;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "datastream-relay",
    about = "Relays chat completions to the AI SDK data stream protocol"
)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "RELAY_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: String,

    /// Credential for the upstream completion service.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of an OpenAI-compatible chat completions API.
    #[arg(
        long,
        env = "UPSTREAM_BASE_URL",
        default_value = "https://api.groq.com/openai/v1"
    )]
    pub base_url: String,

    #[arg(long, env = "UPSTREAM_MODEL", default_value = "llama-3.1-70b-versatile")]
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_setting_has_a_flag() {
        let config = Config::try_parse_from([
            "datastream-relay",
            "--api-key",
            "gsk_test",
            "--listen",
            "127.0.0.1:8000",
            "--base-url",
            "https://api.groq.com/openai/v1",
            "--model",
            "llama-3.1-70b-versatile",
        ])
        .expect("config should parse");

        assert_eq!(config.api_key, "gsk_test");
        assert_eq!(config.listen, "127.0.0.1:8000");
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.model, "llama-3.1-70b-versatile");
    }

    #[test]
    fn declared_defaults() {
        let command = Config::command();
        let default_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .map(|arg| arg.get_default_values().to_vec())
                .unwrap()
        };

        assert_eq!(default_of("listen"), ["127.0.0.1:8000"]);
        assert_eq!(default_of("base_url"), ["https://api.groq.com/openai/v1"]);
        assert_eq!(default_of("model"), ["llama-3.1-70b-versatile"]);
        assert!(default_of("api_key").is_empty());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "datastream-relay",
            "--api-key",
            "k",
            "--listen",
            "0.0.0.0:9000",
            "--model",
            "llama-3.3-70b-versatile",
        ])
        .expect("config should parse");

        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.model, "llama-3.3-70b-versatile");
    }
}
