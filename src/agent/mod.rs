//! The two cooperating agents: one bound to the product page, one running
//! downloads in the background.

pub mod background;
pub mod page_agent;

pub use background::BackgroundAgent;
pub use page_agent::PageAgent;
