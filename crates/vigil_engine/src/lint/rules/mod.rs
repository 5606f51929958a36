//! All built-in lint rule implementations.

mod max_line_length;
mod no_tabs;
mod trailing_whitespace;

pub use max_line_length::MaxLineLength;
pub use no_tabs::NoTabs;
pub use trailing_whitespace::TrailingWhitespace;

use vigil_config::EngineConfig;

use crate::lint::LintEngine;

/// Registers the built-in lint rules with the engine.
pub fn register_builtin_rules(engine: &mut LintEngine, config: &EngineConfig) {
    engine.register(Box::new(TrailingWhitespace));
    engine.register(Box::new(MaxLineLength::new(config.max_line_length)));
    engine.register(Box::new(NoTabs));
}
