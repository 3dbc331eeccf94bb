//! One-shot user location with a city-center fallback.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::GeoPoint;

/// Istanbul city center, used whenever no position is available
pub const ISTANBUL_CENTER: GeoPoint = GeoPoint::new(41.0082, 28.9784);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location is not supported on this device")]
    Unsupported,

    #[error("permission to read the location was denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("no position within {0:?}")]
    Timeout(Duration),
}

/// Source of the device position
pub trait LocationProvider: Send + Sync {
    fn current_position(
        &self,
        options: &LocationOptions,
    ) -> impl Future<Output = Result<GeoPoint, LocationError>> + Send;
}

/// Provider that always reports the same point
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPoint);

impl LocationProvider for FixedLocation {
    async fn current_position(&self, _options: &LocationOptions) -> Result<GeoPoint, LocationError> {
        Ok(self.0)
    }
}

/// Provider for environments without positioning
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl LocationProvider for Unsupported {
    async fn current_position(&self, _options: &LocationOptions) -> Result<GeoPoint, LocationError> {
        Err(LocationError::Unsupported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    Device,
    Fallback,
}

/// Position used for ranking, with the reason when it is the fallback
#[derive(Debug, Clone, PartialEq)]
pub struct UserPosition {
    pub coords: GeoPoint,
    pub source: PositionSource,
    pub reason: Option<String>,
}

impl UserPosition {
    pub fn device(coords: GeoPoint) -> Self {
        Self {
            coords,
            source: PositionSource::Device,
            reason: None,
        }
    }

    pub fn fallback(coords: GeoPoint, reason: impl Into<String>) -> Self {
        Self {
            coords,
            source: PositionSource::Fallback,
            reason: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == PositionSource::Fallback
    }
}

/// Ask the provider once, bounded by `options.timeout`. Any failure yields
/// `fallback` together with a readable reason.
pub async fn locate<P: LocationProvider>(
    provider: &P,
    options: &LocationOptions,
    fallback: GeoPoint,
) -> UserPosition {
    let result = match tokio::time::timeout(options.timeout, provider.current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(options.timeout)),
    };

    let result = result.and_then(|p| {
        GeoPoint::checked(p.lat, p.lon)
            .ok_or_else(|| LocationError::Unavailable(format!("invalid coordinates {}, {}", p.lat, p.lon)))
    });

    match result {
        Ok(coords) => {
            debug!("Device position {}, {}", coords.lat, coords.lon);
            UserPosition::device(coords)
        }
        Err(e) => {
            warn!("Location unavailable ({}), using city center", e);
            UserPosition::fallback(fallback, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Denied;

    impl LocationProvider for Denied {
        async fn current_position(&self, _: &LocationOptions) -> Result<GeoPoint, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    struct Silent;

    impl LocationProvider for Silent {
        async fn current_position(&self, _: &LocationOptions) -> Result<GeoPoint, LocationError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_fixed_location_is_used() {
        let kadikoy = GeoPoint::new(40.9903, 29.0290);
        let position = locate(&FixedLocation(kadikoy), &LocationOptions::default(), ISTANBUL_CENTER).await;
        assert_eq!(position, UserPosition::device(kadikoy));
        assert!(!position.is_fallback());
    }

    #[tokio::test]
    async fn test_unsupported_falls_back_with_reason() {
        let position = locate(&Unsupported, &LocationOptions::default(), ISTANBUL_CENTER).await;
        assert!(position.is_fallback());
        assert_eq!(position.coords, ISTANBUL_CENTER);
        assert_eq!(
            position.reason.as_deref(),
            Some("location is not supported on this device")
        );
    }

    #[tokio::test]
    async fn test_denied_falls_back() {
        let position = locate(&Denied, &LocationOptions::default(), ISTANBUL_CENTER).await;
        assert!(position.is_fallback());
        assert!(position.reason.unwrap().contains("denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_provider_times_out() {
        let options = LocationOptions::default();
        let started = tokio::time::Instant::now();
        let position = locate(&Silent, &options, ISTANBUL_CENTER).await;
        assert!(position.is_fallback());
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(position.reason.unwrap().starts_with("no position within"));
    }

    #[tokio::test]
    async fn test_invalid_device_coordinates_fall_back() {
        let bogus = FixedLocation(GeoPoint::new(f64::NAN, 29.0));
        let position = locate(&bogus, &LocationOptions::default(), ISTANBUL_CENTER).await;
        assert!(position.is_fallback());
    }
}
