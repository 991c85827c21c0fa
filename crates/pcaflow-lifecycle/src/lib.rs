//! pcaflow lifecycle: blocking create, read, update and delete for
//! certificate authorities hosted by a remote PKI provider, root
//! self-signing, and one-way certificate attachment.

pub mod attachment;
pub mod config;
pub mod manager;
pub mod poller;
pub mod retry;
pub mod self_sign;

pub use attachment::CertificateAttachmentManager;
pub use config::LifecycleConfig;
pub use manager::CertificateAuthorityManager;
pub use poller::{ActivationPoller, PollOutcome};
pub use self_sign::RootSelfSigner;
