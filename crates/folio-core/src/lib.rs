//! folio-core: portfolio chat core library (config, portfolio store, conversation sessions, prompt builder).
//!
//! The gateway binary and the provider client both build on these types so the
//! HTTP surface and the outbound call stay decoupled from the domain model.

mod config;
mod conversation;
mod error;
mod portfolio;
mod prompt;

pub use config::GatewayConfig;
pub use conversation::{ConversationBuffer, Message, Role, SessionStore};
pub use error::CoreError;
pub use portfolio::{
    ContactInfo, EducationEntry, ExperienceEntry, PersonalInfo, PortfolioDocument, PortfolioStore,
    SectionEntry,
};
pub use prompt::build_system_prompt;
