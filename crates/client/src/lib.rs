//! Storepanel Client - form sessions for the panel's editable records.
//!
//! Two forms share one lifecycle (load, edit, submit):
//! - [`ProductForm`] - an administrator edits a product's name, description,
//!   price, quantity and image
//! - [`ProfileForm`] - a user views and updates their phone, date of birth
//!   and avatar
//!
//! # Architecture
//!
//! - [`config`] - origin, storage location and token key, loaded once
//! - [`storage`] - persistent key/value storage holding the bearer token
//! - [`api`] - REST client that attaches the bearer token to every request
//! - [`preview`] - image selection and display URLs
//! - [`notify`] / [`navigate`] - toasts and post-submit navigation
//! - [`forms`] - the two form sessions
//!
//! Nothing in this crate renders anything. A UI (or the CLI) binds to the form
//! state, a [`Notifier`](notify::Notifier) and a [`Navigator`](navigate::Navigator).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod forms;
pub mod navigate;
pub mod notify;
pub mod preview;
pub mod storage;

pub use api::{ApiClient, ApiError, MultipartPayload, PayloadField};
pub use config::{ClientConfig, ConfigError, RedirectConfig};
pub use forms::{
    FormContext, FormError, FormStatus, ProductFields, ProductForm, ProfileFields, ProfileForm,
};
pub use navigate::{Navigator, PendingRedirect, RouteLog, TracingNavigator};
pub use notify::{Notifier, Toast, ToastLevel, ToastLog, TracingNotifier};
pub use preview::{Preview, SelectedFile, SelectionError};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError, TokenStore};
