use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Runtime platform hosting the capture flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

/// Capability flags resolved once per platform and threaded through as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlatformCapabilities {
    /// Storage accepts direct presigned writes from this platform
    pub supports_direct_upload: bool,
    /// Camera access must be granted explicitly before scanning
    pub requires_explicit_permission: bool,
    /// A generic "choose file" action is not routed to a disambiguation menu
    pub needs_source_chooser: bool,
    /// Stream resolution/focus hints improve decoding on this platform
    pub tuned_stream_hints: bool,
}

impl Platform {
    pub fn capabilities(self) -> PlatformCapabilities {
        match self {
            // WebView sandbox blocks cross-origin PUTs to storage
            Platform::Ios => PlatformCapabilities {
                supports_direct_upload: false,
                requires_explicit_permission: false,
                needs_source_chooser: false,
                tuned_stream_hints: false,
            },
            Platform::Android => PlatformCapabilities {
                supports_direct_upload: true,
                requires_explicit_permission: true,
                needs_source_chooser: true,
                tuned_stream_hints: true,
            },
            Platform::Web => PlatformCapabilities {
                supports_direct_upload: true,
                requires_explicit_permission: false,
                needs_source_chooser: false,
                tuned_stream_hints: false,
            },
        }
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            _ => Err(anyhow::anyhow!("Invalid platform: {}", s)),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Platform::Ios => write!(f, "ios"),
            Platform::Android => write!(f, "android"),
            Platform::Web => write!(f, "web"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("Android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!(" WEB ".parse::<Platform>().unwrap(), Platform::Web);
        assert!("windows".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_display_round_trips() {
        for platform in [Platform::Ios, Platform::Android, Platform::Web] {
            assert_eq!(platform.to_string().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn test_ios_uses_proxied_upload() {
        let caps = Platform::Ios.capabilities();
        assert!(!caps.supports_direct_upload);
        assert!(!caps.requires_explicit_permission);
        assert!(!caps.needs_source_chooser);
    }

    #[test]
    fn test_android_needs_permission_and_chooser() {
        let caps = Platform::Android.capabilities();
        assert!(caps.supports_direct_upload);
        assert!(caps.requires_explicit_permission);
        assert!(caps.needs_source_chooser);
        assert!(caps.tuned_stream_hints);
    }

    #[test]
    fn test_web_goes_direct_without_chooser() {
        let caps = Platform::Web.capabilities();
        assert!(caps.supports_direct_upload);
        assert!(!caps.needs_source_chooser);
        assert!(!caps.tuned_stream_hints);
    }
}
