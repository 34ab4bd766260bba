//! Game build configuration.
//!
//! Schema resolution depends on which engine variant produced a resource.
//! The configuration is an explicit value passed to every read, default
//! construction and conversion call; nothing in this crate consults global
//! state.

/// Engine variant a resource was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Engine {
    /// Original releases (BG1, BG2, IWD, PST).
    #[default]
    Classic,
    /// Enhanced Edition builds, which extend the opcode range and give
    /// several reserved fields a meaning.
    Enhanced,
}

/// Configuration threaded into schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GameConfig {
    pub engine: Engine,
}

impl GameConfig {
    /// Configuration for the original engine releases.
    pub const fn classic() -> Self {
        Self {
            engine: Engine::Classic,
        }
    }

    /// Configuration for Enhanced Edition builds.
    pub const fn enhanced() -> Self {
        Self {
            engine: Engine::Enhanced,
        }
    }

    /// Returns true for Enhanced Edition builds.
    pub fn is_enhanced(&self) -> bool {
        self.engine == Engine::Enhanced
    }

    /// Highest effect opcode the engine understands.
    pub fn max_opcode(&self) -> u32 {
        match self.engine {
            Engine::Classic => crate::limits::MAX_OPCODE_CLASSIC,
            Engine::Enhanced => crate::limits::MAX_OPCODE_ENHANCED,
        }
    }
}
