//! Mail rendering and delivery.
//!
//! The notification pipeline is split into two halves: [`render`] performs
//! single-field mail-merge on a message template, and [`MailTransport`]
//! hands the rendered message to a provider. [`HttpMailer`] is the HTTP
//! provider implementation; tests substitute their own transports.

mod delivery;
mod template;

pub use delivery::{DeliveryReceipt, HttpMailer, MailTransport};
pub use template::{
    MailContent, early_access_invite, launch_announcement, placeholder_fields, render,
};
