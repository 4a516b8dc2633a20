//! Companion persona - system prompt and history formatting.
//!
//! ```text
//! Persona { name }
//!   ↓  system_prompt(mood)
//! identity text + format rules + mood tone guide
//!   ↓  build_messages(history, prompt)
//! [system, user/assistant history..., user prompt]
//! ```

pub mod prompt;

pub use prompt::{build_messages, mood_tone, Persona};
