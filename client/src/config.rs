//! Client configuration
//!
//! Configuration is loaded from environment variables. Defaults target a
//! local backend on port 4999 (the development setup).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for the persistence and control endpoints
    pub api_base_url: String,
    /// WebSocket URL for the frame channel
    pub channel_url: String,
    /// Timeout applied to every persistence/control request
    pub request_timeout: Duration,

    /// Overlay geometry configuration
    pub overlay: OverlayConfig,

    /// Viewport configuration (drag bounds)
    pub viewport: ViewportConfig,

    /// Session state file configuration
    pub session: SessionFileConfig,
}

/// Overlay geometry constraints
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Minimum widget dimensions (width, height) in pixels
    pub min_size: (u32, u32),
    /// Maximum widget dimensions (width, height) in pixels
    pub max_size: (u32, u32),
}

/// Viewport rectangle the overlay widgets are bounded within
#[derive(Debug, Clone)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

/// Where the session context (user, rtsp url, sid) is persisted across runs
#[derive(Debug, Clone)]
pub struct SessionFileConfig {
    pub state_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:4999".to_string(),
            channel_url: "ws://127.0.0.1:4999/frames".to_string(),
            request_timeout: Duration::from_secs(10),
            overlay: OverlayConfig::default(),
            viewport: ViewportConfig::default(),
            session: SessionFileConfig::default(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_size: (100, 100),
            max_size: (300, 300),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("framecast-session.json"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("FRAMECAST_API_URL")
            && !url.is_empty()
        {
            config.api_base_url = url;
        }
        if let Ok(url) = env::var("FRAMECAST_CHANNEL_URL")
            && !url.is_empty()
        {
            config.channel_url = url;
        }
        if let Ok(val) = env::var("FRAMECAST_REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        // Overlay geometry
        if let Ok(val) = env::var("FRAMECAST_OVERLAY_MIN_PX")
            && let Ok(px) = val.parse()
        {
            config.overlay.min_size = (px, px);
        }
        if let Ok(val) = env::var("FRAMECAST_OVERLAY_MAX_PX")
            && let Ok(px) = val.parse()
        {
            config.overlay.max_size = (px, px);
        }

        // Viewport
        if let Ok(val) = env::var("FRAMECAST_VIEWPORT_WIDTH")
            && let Ok(w) = val.parse()
        {
            config.viewport.width = w;
        }
        if let Ok(val) = env::var("FRAMECAST_VIEWPORT_HEIGHT")
            && let Ok(h) = val.parse()
        {
            config.viewport.height = h;
        }

        // Session state file
        if let Ok(path) = env::var("FRAMECAST_SESSION_FILE")
            && !path.is_empty()
        {
            config.session.state_path = PathBuf::from(path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://127.0.0.1:4999");
        assert_eq!(config.channel_url, "ws://127.0.0.1:4999/frames");
        assert_eq!(config.overlay.min_size, (100, 100));
        assert_eq!(config.overlay.max_size, (300, 300));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_from_env() {
        // This test doesn't set env vars, so it should return defaults
        let config = Config::from_env();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
    }
}
