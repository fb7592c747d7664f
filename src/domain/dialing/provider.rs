//! Provider (trunk) definitions that route rules hand outbound calls to
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel technology used to reach a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderProtocol {
    Sip,
    Iax2,
    Local,
}

impl fmt::Display for ProviderProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderProtocol::Sip => "SIP",
            ProviderProtocol::Iax2 => "IAX2",
            ProviderProtocol::Local => "Local",
        };
        f.write_str(name)
    }
}

/// A provider outbound calls can be routed through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDefinition {
    pub name: String,
    pub protocol: ProviderProtocol,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,

    // Number formatting
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub strip_prefix: bool,
    #[serde(default)]
    pub add_prefix: Option<String>,
}

impl ProviderDefinition {
    /// Create a new SIP provider
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: ProviderProtocol::Sip,
            host: String::new(),
            port: None,
            prefix: None,
            strip_prefix: false,
            add_prefix: None,
        }
    }

    pub fn with_protocol(mut self, protocol: ProviderProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Strip `prefix` from dialed numbers that start with it
    pub fn stripping(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self.strip_prefix = true;
        self
    }

    /// Prepend `prefix` to every dialed number
    pub fn prepending(mut self, prefix: impl Into<String>) -> Self {
        self.add_prefix = Some(prefix.into());
        self
    }

    /// Format a dialed number for this provider
    pub fn format_number(&self, number: &str) -> String {
        let mut formatted = number;

        if self.strip_prefix {
            if let Some(prefix) = self.prefix.as_deref() {
                formatted = formatted.strip_prefix(prefix).unwrap_or(formatted);
            }
        }

        match self.add_prefix.as_deref() {
            Some(add_prefix) => format!("{}{}", add_prefix, formatted),
            None => formatted.to_string(),
        }
    }

    /// Channel string to dial `number` through this provider,
    /// e.g. `SIP/trunk.example.com:5060/15551234`
    pub fn dial_string(&self, number: &str) -> String {
        let number = self.format_number(number);
        let target = if self.host.is_empty() {
            self.name.as_str()
        } else {
            self.host.as_str()
        };

        match self.port {
            Some(port) => format!("{}/{}:{}/{}", self.protocol, target, port, number),
            None => format!("{}/{}/{}", self.protocol, target, number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        let provider = ProviderDefinition::new("voip_ms").stripping("9").prepending("1");
        assert_eq!(provider.format_number("95551234"), "15551234");
        assert_eq!(provider.format_number("5551234"), "15551234");

        let plain = ProviderDefinition::new("plain");
        assert_eq!(plain.format_number("0123"), "0123");
    }

    #[test]
    fn test_dial_string() {
        let provider = ProviderDefinition::new("voip_ms")
            .with_host("chicago.voip.ms", Some(5060))
            .stripping("9");
        assert_eq!(provider.dial_string("95551234"), "SIP/chicago.voip.ms:5060/5551234");

        let local = ProviderDefinition::new("operators").with_protocol(ProviderProtocol::Local);
        assert_eq!(local.dial_string("100"), "Local/operators/100");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let provider: ProviderDefinition = toml::from_str(
            r#"
            name = "backup"
            protocol = "iax2"
            host = "iax.example.com"
            add_prefix = "+"
            "#,
        )
        .unwrap();

        assert_eq!(provider.protocol, ProviderProtocol::Iax2);
        assert_eq!(provider.port, None);
        assert_eq!(provider.dial_string("4155551234"), "IAX2/iax.example.com/+4155551234");
    }
}
