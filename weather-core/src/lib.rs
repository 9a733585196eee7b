//! Core library for the weather notification service.
//!
//! This crate defines:
//! - Request validation and the provider's wire types
//! - The cached, retrying WeatherStack client and its error taxonomy
//! - Subscription dispatch to a mail collaborator
//! - Configuration handling
//!
//! It is used by `weather-cli`, but can also be embedded by other binaries or services.

pub mod cache;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod mail;
pub mod model;
pub mod provider;
pub mod request;
pub mod retry;
pub mod subscription;

pub use client::{WeatherClient, WeatherClientConfig};
pub use config::Config;
pub use dispatcher::{DispatchError, DispatchReport, NotificationDispatcher};
pub use error::{TransportError, WeatherError};
pub use mail::{Mailer, WeatherEmail};
pub use model::{WeatherCondition, WeatherLocation, WeatherResponse};
pub use provider::WeatherProvider;
pub use request::{Language, Units, ValidationError, WeatherRequest};
pub use retry::RetryPolicy;
pub use subscription::{Subscription, SubscriptionStore, SubscriptionUpdate};
