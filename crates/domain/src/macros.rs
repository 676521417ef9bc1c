//! Macro for implementing Display and FromStr for state enums
//!
//! Status-like enums are rendered in logs and parsed from configuration. This
//! macro gives them one consistent lowercase spelling in both directions.
//!
//! # Example
//!
//! ```rust
//! use convergent_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ResourceState {
//!     Creating,
//!     Running,
//!     Deleting,
//! }
//!
//! impl_domain_status_conversions!(ResourceState {
//!     Creating => "creating",
//!     Running => "running",
//!     Deleting => "deleting",
//! });
//!
//! assert_eq!(ResourceState::Running.to_string(), "running");
//! assert_eq!("DELETING".parse::<ResourceState>(), Ok(ResourceState::Deleting));
//! ```

/// Implements Display and FromStr traits for state enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase string
///   representations
///
/// Parsing is case-insensitive; unknown strings produce an error naming the
/// enum.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
