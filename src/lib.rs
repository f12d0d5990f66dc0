//! Deckhand - setup wizard engine for an agent runtime
//!
//! Walks an operator through provisioning an agent service on the local
//! machine or a remote host over SSH, then keeps it maintained.
//!
//! ## Pieces
//!
//! - **Wizard:** step table, pure forward/back navigation and presets
//! - **Canonical config:** one backend-facing record synthesized from the wizard state,
//!   reconciled structurally against what is already installed
//! - **Remote sessions:** bounded connectivity tests, classified SSH errors and a
//!   serialized tunnel lifecycle
//! - **Install runs:** a phased sequence with per-phase failure policy
//!
//! ## Quick Start
//!
//! ```bash
//! # Where does this wizard state stand?
//! deckhand steps --state wizard.toml
//!
//! # Rehearse an install with a failing skill
//! deckhand rehearse --state wizard.toml --fail install_skill:github=404
//! ```

pub mod backend;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod install;
pub mod logging;
pub mod maintenance;
pub mod remote;
pub mod utils;
pub mod wizard;

// Re-export commonly used types
pub use error::{DeckhandError, ErrorCode};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
