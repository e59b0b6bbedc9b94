use std::time::Duration;

/// Where broadcasts are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastAdapterKind {
    /// POST to an external broadcast endpoint.
    Http,
    /// Deliver to the in-process pub/sub node.
    Embedded,
}

/// cable-rpc configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    pub broadcast_adapter: BroadcastAdapterKind,
    /// Endpoint for the HTTP broadcast adapter.
    pub broadcast_url: String,
    /// Optional bearer token sent with every broadcast.
    pub broadcast_secret: Option<String>,
    pub broadcast_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a variable is set to an invalid
    /// value.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

        let broadcast_adapter = match var("BROADCAST_ADAPTER").as_deref() {
            None | Some("http") => BroadcastAdapterKind::Http,
            Some("embedded") => BroadcastAdapterKind::Embedded,
            Some(other) => {
                panic!("BROADCAST_ADAPTER must be \"http\" or \"embedded\", got {other:?}")
            }
        };

        Self {
            port: parsed_var(&var, "PORT").unwrap_or(50051),
            broadcast_adapter,
            broadcast_url: var("BROADCAST_URL")
                .unwrap_or_else(|| "http://localhost:8090/_broadcast".to_string()),
            broadcast_secret: var("BROADCAST_SECRET"),
            broadcast_timeout: Duration::from_millis(
                parsed_var(&var, "BROADCAST_TIMEOUT_MS").unwrap_or(5000),
            ),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    var(name).map(|v| {
        v.parse()
            .unwrap_or_else(|_| panic!("{name} env var is invalid: {v:?}"))
    })
}
