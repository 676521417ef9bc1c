//! Conversions from configuration sections to engine primitives

use convergent_common::resilience::{RateLimiterConfig, RetryProfile, RetryProfiles};
use convergent_domain::{ProfileConfig, RateLimitConfig, RetryConfig};

pub fn rate_limiter_config(config: &RateLimitConfig) -> RateLimiterConfig {
    RateLimiterConfig {
        default_budget: config.default_budget,
        interval: config.interval(),
        max_wait: config.max_wait(),
        overrides: config.overrides.clone(),
    }
}

pub fn retry_profile(config: &ProfileConfig) -> RetryProfile {
    RetryProfile::new(config.interval(), config.deadline())
}

pub fn retry_profiles(config: &RetryConfig) -> RetryProfiles {
    RetryProfiles {
        short_read: retry_profile(&config.short_read),
        write: retry_profile(&config.write),
        long_converge: retry_profile(&config.long_converge),
    }
}
