//! Error types for the panel controller.

/// Result type alias for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that can occur while negotiating panel refresh features.
///
/// None of these are fatal: the worst case is a stale refresh rate or TE2
/// timing until the next successful update.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// No auto-frame-insertion payload exists for this combination.
    ///
    /// The offending register write is skipped; the rest of the batch is sent.
    #[error("Unsupported configuration: vrefresh {vrefresh}Hz, idle {idle_vrefresh}Hz (auto: {auto})")]
    ConfigurationUnsupported {
        /// Target refresh rate.
        vrefresh: u32,
        /// Idle refresh rate (0 = disabled).
        idle_vrefresh: u32,
        /// Whether automatic frame insertion was requested.
        auto: bool,
    },

    /// The timing source is not ready yet; default timing is used instead.
    #[error("TE2 timing source not ready")]
    TimingSourceUnavailable,

    /// The timing source failed; the TE2 update was aborted.
    #[error("Failed to get current TE2 timing")]
    TimingSource,

    /// Sending commands to the panel failed.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The operation needs state that is not there (e.g. no current mode).
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// No mode with this name exists in the mode table.
    #[error("Unknown panel mode: {0}")]
    UnknownMode(String),
}
