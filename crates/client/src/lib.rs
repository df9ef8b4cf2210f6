//! Async REST client for the consultancy CRM API.
//!
//! - [`client`] — generic CRUD over any [`crm_core::Resource`], auth and dashboard
//! - [`api`] — the narrow traits the console layer depends on
//! - [`push`] — push channel sources (server-sent events, in-process broadcast)

pub mod api;
pub mod client;
pub mod push;

pub use api::{AuthApi, NotificationApi};
pub use client::ApiClient;
pub use push::{ChannelPushSource, PushSource, PushStream, SsePushSource};
