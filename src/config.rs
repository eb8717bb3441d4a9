use std::env;
use std::fmt;
use std::time::Duration;

use crate::models::is_email_like;

pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

/// Client-credentials triple registered for the application in the tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// When the mailer asks the token endpoint for a new access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Reuse the token until `now + refresh_skew` reaches its expiry.
    CacheUntilExpiry { refresh_skew: Duration },
    /// Fetch a fresh token before every request.
    FetchPerRequest,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        TokenPolicy::CacheUntilExpiry {
            refresh_skew: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub sender_address: String,
    pub sender_name: Option<String>,
    pub scopes: Vec<String>,
    pub save_to_sent_items: bool,
    pub request_timeout: Duration,
    pub token_policy: TokenPolicy,
    pub authority_url: String,
    pub graph_url: String,
    pub log_payloads: bool,
}

impl Config {
    pub fn new(credentials: Credentials, sender_address: impl Into<String>) -> Self {
        Self {
            credentials,
            sender_address: sender_address.into(),
            sender_name: None,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            save_to_sent_items: true,
            request_timeout: Duration::from_secs(30),
            token_policy: TokenPolicy::default(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            log_payloads: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(var))
        };

        let credentials = Credentials::new(
            required("AZURE_TENANT_ID")?,
            required("OAUTH_CLIENT_ID")?,
            required("OAUTH_CLIENT_SECRET")?,
        );

        let mut config = Config::new(credentials, required("MAIL_FROM")?);
        config.sender_name = lookup("MAIL_FROM_NAME").filter(|s| !s.is_empty());

        if let Some(scopes) = lookup("OAUTH_SCOPES") {
            config.scopes = scopes.split_whitespace().map(String::from).collect();
        }
        if let Some(value) = lookup("MAIL_SAVE_TO_SENT_ITEMS") {
            config.save_to_sent_items = parse_bool("MAIL_SAVE_TO_SENT_ITEMS", &value)?;
        }
        if let Some(value) = lookup("MAIL_REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout =
                Duration::from_secs(parse_u64("MAIL_REQUEST_TIMEOUT_SECONDS", &value)?);
        }
        if let Some(value) = lookup("MAIL_LOG_PAYLOADS") {
            config.log_payloads = parse_bool("MAIL_LOG_PAYLOADS", &value)?;
        }

        let refresh_skew = match lookup("MAIL_TOKEN_REFRESH_SKEW_SECONDS") {
            Some(value) => Duration::from_secs(parse_u64("MAIL_TOKEN_REFRESH_SKEW_SECONDS", &value)?),
            None => Duration::from_secs(5),
        };
        config.token_policy = match lookup("MAIL_TOKEN_POLICY").as_deref() {
            None | Some("cache") => TokenPolicy::CacheUntilExpiry { refresh_skew },
            Some("per-request") => TokenPolicy::FetchPerRequest,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "MAIL_TOKEN_POLICY",
                    value: other.to_string(),
                })
            }
        };

        Ok(config)
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_save_to_sent_items(mut self, save: bool) -> Self {
        self.save_to_sent_items = save;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Point the token and Graph calls at different hosts (sovereign clouds, test servers).
    pub fn with_endpoints(
        mut self,
        authority_url: impl Into<String>,
        graph_url: impl Into<String>,
    ) -> Self {
        self.authority_url = authority_url.into();
        self.graph_url = graph_url.into();
        self
    }

    pub fn with_log_payloads(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("tenant_id", &self.credentials.tenant_id),
            ("client_id", &self.credentials.client_id),
            ("client_secret", &self.credentials.client_secret),
            ("sender_address", &self.sender_address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(field));
            }
        }

        if !is_email_like(&self.sender_address) {
            return Err(ConfigError::InvalidSender(self.sender_address.clone()));
        }

        if self.scopes.is_empty() {
            return Err(ConfigError::Empty("scopes"));
        }
        if let Some(index) = self.scopes.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::BlankScope(index));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Empty("request_timeout"));
        }

        for url in [&self.authority_url, &self.graph_url] {
            url::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        }

        Ok(())
    }

    /// OAuth2 v2.0 token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.credentials.tenant_id
        )
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("Sender address is not a valid email address: {0}")]
    InvalidSender(String),
    #[error("Scope at index {0} is an empty string")]
    BlankScope(usize),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> Config {
        Config::new(
            Credentials::new("tenant-123", "client-456", "secret-789"),
            "sender@contoso.com",
        )
    }

    #[test]
    fn test_defaults() {
        let config = test_config();
        assert_eq!(config.scopes, vec![DEFAULT_SCOPE.to_string()]);
        assert!(config.save_to_sent_items);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.token_policy, TokenPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_url() {
        let config = test_config().with_endpoints("http://localhost:9000/", "http://localhost:9001");
        assert_eq!(
            config.token_url(),
            "http://localhost:9000/tenant-123/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = test_config();
        config.credentials.client_secret = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Empty("client_secret"))
        ));
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut config = test_config();
        config.sender_address = "not-an-address".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSender(_))
        ));
    }

    #[test]
    fn test_blank_scope_rejected() {
        let config = test_config().with_scopes(vec!["Mail.Send".to_string(), " ".to_string()]);
        assert!(matches!(config.validate(), Err(ConfigError::BlankScope(1))));

        let config = test_config().with_scopes(vec![]);
        assert!(matches!(config.validate(), Err(ConfigError::Empty("scopes"))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", test_config().credentials);
        assert!(rendered.contains("tenant-123"));
        assert!(!rendered.contains("secret-789"));
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("AZURE_TENANT_ID", "tenant-123"),
        ("OAUTH_CLIENT_ID", "client-456"),
        ("OAUTH_CLIENT_SECRET", "secret-789"),
        ("MAIL_FROM", "sender@contoso.com"),
    ];

    fn with_required(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        REQUIRED.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn test_from_lookup_required_only() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).expect("Should load config");
        assert_eq!(config.credentials, Credentials::new("tenant-123", "client-456", "secret-789"));
        assert_eq!(config.sender_address, "sender@contoso.com");
        assert_eq!(config.sender_name, None);
        assert_eq!(config.scopes, vec![DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.token_policy, TokenPolicy::default());
    }

    #[test]
    fn test_from_lookup_missing_var() {
        let vars = [
            ("AZURE_TENANT_ID", "tenant-123"),
            ("OAUTH_CLIENT_ID", "client-456"),
            ("MAIL_FROM", "sender@contoso.com"),
        ];
        assert!(matches!(
            Config::from_lookup(lookup_from(&vars)),
            Err(ConfigError::MissingVar("OAUTH_CLIENT_SECRET"))
        ));

        let blank_sender: Vec<_> = REQUIRED
            .iter()
            .map(|&(k, v)| if k == "MAIL_FROM" { (k, "") } else { (k, v) })
            .collect();
        assert!(matches!(
            Config::from_lookup(lookup_from(&blank_sender)),
            Err(ConfigError::MissingVar("MAIL_FROM"))
        ));
    }

    #[test]
    fn test_from_lookup_optional_values() {
        let vars = with_required(&[
            ("MAIL_FROM_NAME", "Ops Robot"),
            ("OAUTH_SCOPES", "Mail.Send   Mail.ReadWrite"),
            ("MAIL_SAVE_TO_SENT_ITEMS", "false"),
            ("MAIL_REQUEST_TIMEOUT_SECONDS", "12"),
            ("MAIL_LOG_PAYLOADS", "yes"),
            ("MAIL_TOKEN_POLICY", "per-request"),
        ]);
        let config = Config::from_lookup(lookup_from(&vars)).expect("Should load config");

        assert_eq!(config.sender_name.as_deref(), Some("Ops Robot"));
        assert_eq!(
            config.scopes,
            vec!["Mail.Send".to_string(), "Mail.ReadWrite".to_string()]
        );
        assert!(!config.save_to_sent_items);
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert!(config.log_payloads);
        assert_eq!(config.token_policy, TokenPolicy::FetchPerRequest);
    }

    #[test]
    fn test_from_lookup_cache_policy_skew() {
        let vars = with_required(&[
            ("MAIL_TOKEN_POLICY", "cache"),
            ("MAIL_TOKEN_REFRESH_SKEW_SECONDS", "60"),
        ]);
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(
            config.token_policy,
            TokenPolicy::CacheUntilExpiry {
                refresh_skew: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        let vars = with_required(&[("MAIL_TOKEN_POLICY", "sometimes")]);
        assert!(matches!(
            Config::from_lookup(lookup_from(&vars)),
            Err(ConfigError::InvalidValue { var: "MAIL_TOKEN_POLICY", .. })
        ));

        let vars = with_required(&[("MAIL_REQUEST_TIMEOUT_SECONDS", "thirty")]);
        assert!(matches!(
            Config::from_lookup(lookup_from(&vars)),
            Err(ConfigError::InvalidValue { var: "MAIL_REQUEST_TIMEOUT_SECONDS", .. })
        ));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
