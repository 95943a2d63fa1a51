//! Gateway configuration
//!
//! All values are fixed at deployment time. A configuration is normally read
//! from a TOML file; every field has a default so a partial file (or none at
//! all) yields a working setup against the public conference mapper.
//!
//! ```toml
//! gateway_user = "jigasi"
//! directory_url = "https://api.jitsi.net/conferenceMapper"
//! origin_numbers = ["18572707025"]
//! inbound_call_limit_secs = 300
//!
//! [prompts]
//! meeting_id = "Please enter the meeting eye dee and press pound"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, Result};
use crate::types::Voice;

/// Number of keys collected by the in-call mute prompts.
pub const MUTE_INPUT_LENGTH: usize = 2;

/// Main gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Maximum duration of a dial-in call
    pub inbound_call_limit_secs: u64,
    /// Maximum duration of a dial-out call
    pub outbound_call_limit_secs: u64,
    /// Voice used for every spoken prompt
    pub voice: String,
    /// Identity of the media-mixing gateway; calls from it are dial-outs
    pub gateway_user: String,
    /// Base URL of the conference directory
    pub directory_url: String,
    /// Meeting-id prompts played without input before the call is dropped
    pub max_no_input_prompts: u32,
    /// Per-attempt timeout for directory requests
    pub lookup_timeout_secs: u64,
    /// How long the meeting-id and password prompts wait for input
    pub input_timeout_ms: u64,
    /// How often the in-call prompts remind the caller of their mute state
    pub reprompt_interval_secs: u64,
    /// Call timeout advertised to the gateway when bridging
    pub gateway_call_timeout_secs: u64,
    /// Caller ids available for dial-out, first one is the fallback
    pub origin_numbers: Vec<String>,
    /// Key that ends variable-length input
    pub input_terminator: char,
    /// Key sequence that toggles mute during a call
    pub mute_toggle_sequence: String,
    /// Spoken texts
    pub prompts: Prompts,
    /// Logging output
    pub logging: LogSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            inbound_call_limit_secs: 5 * 60,
            outbound_call_limit_secs: 5 * 60,
            voice: "en-US-Female".to_string(),
            gateway_user: "jigasi".to_string(),
            directory_url: "https://api.jitsi.net/conferenceMapper".to_string(),
            max_no_input_prompts: 5,
            lookup_timeout_secs: 3,
            input_timeout_ms: 10_000,
            reprompt_interval_secs: 300,
            gateway_call_timeout_secs: 1800,
            origin_numbers: vec!["18572707025".to_string()],
            input_terminator: '#',
            mute_toggle_sequence: "*6".to_string(),
            prompts: Prompts::default(),
            logging: LogSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(text)
            .map_err(|e| GatewayError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make sessions misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        if self.origin_numbers.is_empty() {
            return Err(GatewayError::config("origin_numbers must not be empty"));
        }
        if self.directory_url.trim().is_empty() {
            return Err(GatewayError::config("directory_url must not be empty"));
        }
        if self.gateway_user.trim().is_empty() {
            return Err(GatewayError::config("gateway_user must not be empty"));
        }
        if self.mute_toggle_sequence.chars().count() != MUTE_INPUT_LENGTH {
            return Err(GatewayError::config(format!(
                "mute_toggle_sequence must be {} keys long",
                MUTE_INPUT_LENGTH
            )));
        }
        let zero_durations = [
            ("inbound_call_limit_secs", self.inbound_call_limit_secs),
            ("outbound_call_limit_secs", self.outbound_call_limit_secs),
            ("lookup_timeout_secs", self.lookup_timeout_secs),
            ("input_timeout_ms", self.input_timeout_ms),
            ("reprompt_interval_secs", self.reprompt_interval_secs),
        ];
        for (name, value) in zero_durations {
            if value == 0 {
                return Err(GatewayError::config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }

    pub fn voice(&self) -> Voice {
        Voice::new(self.voice.clone())
    }

    pub fn inbound_call_limit(&self) -> Duration {
        Duration::from_secs(self.inbound_call_limit_secs)
    }

    pub fn outbound_call_limit(&self) -> Duration {
        Duration::from_secs(self.outbound_call_limit_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    pub fn reprompt_interval(&self) -> Duration {
        Duration::from_secs(self.reprompt_interval_secs)
    }
}

/// Texts spoken to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub meeting_id: String,
    pub password: String,
    pub unknown_conference: String,
    pub lookup_error: String,
    pub no_input: String,
    pub connecting: String,
    pub connection_error: String,
    pub muted: String,
    pub unmuted: String,
    pub time_limit: String,
    /// Dial-out notice; `{number}` and `{minutes}` are substituted
    pub outbound_notice: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            meeting_id: "Please enter the meeting eye dee and press pound".to_string(),
            password: "If your conference included a password please enter it now, \
                followed by pound. Just press pound to enter the conference with out a password"
                .to_string(),
            unknown_conference: "You have specified an unknown conference number.".to_string(),
            lookup_error:
                "Something went wrong confirming your conference number, please try again."
                    .to_string(),
            no_input: "We did not receive any input, please try again later.".to_string(),
            connecting: "Connecting you to your conference, please wait.".to_string(),
            connection_error: "Error connecting your conference, please try again.".to_string(),
            muted: "You are muted, press star 6 to un mute".to_string(),
            unmuted: "You are un muted, press star 6 to mute".to_string(),
            time_limit: "Time limit exceeded. Thank you for trying out our service.".to_string(),
            outbound_notice:
                "Calling {number}. Your call will be automatically ended in {minutes} minutes."
                    .to_string(),
        }
    }
}

impl Prompts {
    /// Render the dial-out notice, reading the destination digit by digit
    pub fn render_outbound_notice(&self, destination: &str, limit: Duration) -> String {
        let spoken: Vec<String> = destination
            .chars()
            .filter(|c| c.is_ascii_digit())
            .map(|c| c.to_string())
            .collect();
        let minutes = limit.as_secs() / 60;
        self.outbound_notice
            .replace("{number}", &spoken.join(" "))
            .replace("{minutes}", &minutes.to_string())
    }
}

/// Logging section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    pub file_info: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.lookup_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_no_input_prompts, 5);
    }

    #[test]
    fn partial_file_overrides_selected_fields() {
        let config = GatewayConfig::from_toml_str(
            r#"
            gateway_user = "bridge"
            origin_numbers = ["442071838750", "18572707025"]
            input_terminator = "*"

            [prompts]
            muted = "Muted."
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway_user, "bridge");
        assert_eq!(config.origin_numbers.len(), 2);
        assert_eq!(config.input_terminator, '*');
        assert_eq!(config.prompts.muted, "Muted.");
        assert_eq!(config.prompts.unmuted, Prompts::default().unmuted);
    }

    #[test]
    fn rejects_empty_origin_list() {
        let err = GatewayConfig::from_toml_str("origin_numbers = []").unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[test]
    fn rejects_toggle_sequence_of_wrong_length() {
        let config = GatewayConfig {
            mute_toggle_sequence: "*66".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_lookup_timeout() {
        let config = GatewayConfig {
            lookup_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn outbound_notice_reads_digits() {
        let prompts = Prompts::default();
        let text = prompts.render_outbound_notice("+1 857-270", Duration::from_secs(300));
        assert_eq!(
            text,
            "Calling 1 8 5 7 2 7 0. Your call will be automatically ended in 5 minutes."
        );
    }
}
